use crate::{CitySuggestion, WeatherApiError, WeatherSnapshot};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// Maximum number of suggestions requested per query.
pub const SUGGESTION_LIMIT: usize = 5;

/// City-name autocomplete.
#[async_trait]
pub trait GeocodingClient: Send + Sync + Debug {
    /// An empty query yields no suggestions and performs no I/O.
    async fn fetch_suggestions(
        &self,
        query: &str,
    ) -> Result<Vec<CitySuggestion>, WeatherApiError>;
}

/// Current conditions for a city.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    /// An empty city name fails with `WeatherApiError::Unknown` and performs no I/O.
    async fn fetch_weather(&self, city_name: &str) -> Result<WeatherSnapshot, WeatherApiError>;
}
