use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder description used when the provider returns no weather entries.
pub const NO_DESCRIPTION: &str = "No description";

const ICON_URL_BASE: &str = "https://openweathermap.org/img/wn";

/// One geocoding match for a typed city query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySuggestion {
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl CitySuggestion {
    /// Identity of the suggestion. Names collide across countries, coordinates don't.
    /// Integral coordinates keep their fraction, `51.0` rather than `51`.
    pub fn id(&self) -> String {
        format!("{:?}-{:?}", self.lat, self.lon)
    }

    /// "London, GB"
    pub fn label(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

/// Current conditions for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// City name as resolved by the provider, not as typed.
    pub city_name: String,
    pub temperature: f64,
    pub description: String,
    pub icon: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_deref()
            .filter(|icon| !icon.is_empty())
            .map(|icon| format!("{ICON_URL_BASE}/{icon}@2x.png"))
    }
}
