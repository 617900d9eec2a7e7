use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;

use crate::{
    CitySuggestion, Config, WeatherApiError, WeatherSnapshot,
    config::{DEFAULT_BASE_URL, DEFAULT_UNITS},
    model::NO_DESCRIPTION,
};

use super::{GeocodingClient, SUGGESTION_LIMIT, WeatherClient};

const GEOCODING_PATH: &str = "/geo/1.0/direct";
const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// OpenWeather access for both the geocoding and the current-conditions endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    units: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            units: DEFAULT_UNITS.to_string(),
            http,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?;
        Ok(Self::new(api_key.to_owned())?
            .with_base_url(&config.base_url)
            .with_units(&config.units))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = units.to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, WeatherApiError> {
        let url = format!("{}{}", self.base_url, path);

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(WeatherApiError::from_reqwest)?;

        let status = res.status();
        let body = res.text().await.map_err(WeatherApiError::from_reqwest)?;

        if status != StatusCode::OK {
            tracing::debug!(%url, %status, body = %truncate_body(&body), "OpenWeather request failed");
            return Err(WeatherApiError::Server { status_code: status.as_u16() });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    #[serde(default)]
    dt: Option<i64>,
    main: OwMain,
    weather: Vec<OwWeather>,
}

impl From<OwCurrentResponse> for WeatherSnapshot {
    fn from(parsed: OwCurrentResponse) -> Self {
        let observed_at = parsed.dt.and_then(unix_to_utc).unwrap_or_else(Utc::now);

        let (description, icon) = match parsed.weather.into_iter().next() {
            Some(w) => (w.description, Some(w.icon)),
            None => (NO_DESCRIPTION.to_string(), None),
        };

        WeatherSnapshot {
            city_name: parsed.name,
            temperature: parsed.main.temp,
            description,
            icon,
            observed_at,
        }
    }
}

#[async_trait]
impl GeocodingClient for OpenWeatherProvider {
    async fn fetch_suggestions(
        &self,
        query: &str,
    ) -> Result<Vec<CitySuggestion>, WeatherApiError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(query, "fetching city suggestions");
        let limit = SUGGESTION_LIMIT.to_string();
        self.get_json(GEOCODING_PATH, &[("q", query), ("limit", limit.as_str())])
            .await
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherProvider {
    async fn fetch_weather(&self, city_name: &str) -> Result<WeatherSnapshot, WeatherApiError> {
        if city_name.is_empty() {
            return Err(WeatherApiError::unknown("unsupported URL: empty city name"));
        }

        tracing::debug!(city = city_name, "fetching current weather");
        let parsed: OwCurrentResponse = self
            .get_json(
                CURRENT_WEATHER_PATH,
                &[("q", city_name), ("units", self.units.as_str())],
            )
            .await?;

        Ok(parsed.into())
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> &str {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{any, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenWeatherProvider {
        OpenWeatherProvider::new("TEST_KEY".to_string())
            .expect("client builds")
            .with_base_url(&server.uri())
    }

    async fn server_expecting_no_calls() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn empty_query_yields_no_suggestions_without_io() {
        let server = server_expecting_no_calls().await;

        let suggestions = provider(&server).fetch_suggestions("").await.expect("empty is ok");

        assert!(suggestions.is_empty());
        server.verify().await;
    }

    #[tokio::test]
    async fn empty_city_is_unknown_error_without_io() {
        let server = server_expecting_no_calls().await;

        let err = provider(&server).fetch_weather("").await.unwrap_err();

        assert!(matches!(err, WeatherApiError::Unknown(_)));
        assert!(err.to_string().starts_with("Something went wrong: "));
        server.verify().await;
    }

    #[tokio::test]
    async fn suggestions_are_decoded_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "Lon"))
            .and(query_param("limit", "5"))
            .and(query_param("appid", "TEST_KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "London", "lat": 51.5, "lon": -0.12, "country": "GB", "state": null},
                {"name": "London", "lat": 42.98, "lon": -81.24, "country": "CA", "state": "Ontario"},
                {"name": "Londrina", "lat": -23.3, "lon": -51.16, "country": "BR"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let suggestions = provider(&server).fetch_suggestions("Lon").await.expect("ok");

        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0].id(), "51.5--0.12");
        assert_eq!(suggestions[1].state.as_deref(), Some("Ontario"));
        assert_eq!(suggestions[1].country, "CA");
        assert_eq!(suggestions[2].name, "Londrina");
        assert_eq!(suggestions[2].state, None);
    }

    #[tokio::test]
    async fn one_bad_record_fails_the_whole_response() {
        let server = MockServer::start().await;
        Mock::given(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "London", "lat": 51.5, "lon": -0.12, "country": "GB"},
                {"name": "Nowhere", "lat": "north", "lon": 0.0, "country": "XX"}
            ])))
            .mount(&server)
            .await;

        let err = provider(&server).fetch_suggestions("Lon").await.unwrap_err();

        assert!(matches!(err, WeatherApiError::Decoding(_)));
    }

    #[tokio::test]
    async fn non_200_status_maps_to_server_error() {
        for status in [201_u16, 401, 404, 429, 500, 503] {
            let server = MockServer::start().await;
            Mock::given(any())
                .respond_with(ResponseTemplate::new(status).set_body_string("{}"))
                .mount(&server)
                .await;
            let provider = provider(&server);

            let err = provider.fetch_suggestions("Lon").await.unwrap_err();
            assert!(matches!(err, WeatherApiError::Server { status_code } if status_code == status));
            assert!(err.to_string().contains(&status.to_string()));

            let err = provider.fetch_weather("London").await.unwrap_err();
            assert!(matches!(err, WeatherApiError::Server { status_code } if status_code == status));
        }
    }

    #[tokio::test]
    async fn weather_is_requested_in_metric_and_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "São Paulo"))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "TEST_KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "São Paulo",
                "dt": 1_700_000_000,
                "main": {"temp": 24.6},
                "weather": [{"description": "few clouds", "icon": "02d"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let snapshot = provider(&server).fetch_weather("São Paulo").await.expect("ok");

        assert_eq!(snapshot.city_name, "São Paulo");
        assert_eq!(snapshot.temperature, 24.6);
        assert_eq!(snapshot.description, "few clouds");
        assert_eq!(snapshot.icon.as_deref(), Some("02d"));
        assert_eq!(snapshot.observed_at.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn empty_weather_array_uses_placeholder() {
        let server = MockServer::start().await;
        Mock::given(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "London",
                "main": {"temp": 11.0},
                "weather": []
            })))
            .mount(&server)
            .await;

        let snapshot = provider(&server).fetch_weather("London").await.expect("ok");

        assert_eq!(snapshot.description, NO_DESCRIPTION);
        assert_eq!(snapshot.icon, None);
        assert_eq!(snapshot.icon_url(), None);
    }

    #[tokio::test]
    async fn weather_schema_mismatch_is_decoding_error() {
        let server = MockServer::start().await;
        Mock::given(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = provider(&server).fetch_weather("London").await.unwrap_err();

        assert!(matches!(err, WeatherApiError::Decoding(_)));
        assert_eq!(err.to_string(), "Could not read the data. Please try again.");
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let provider = OpenWeatherProvider::new("TEST_KEY".to_string())
            .expect("client builds")
            .with_base_url("http://127.0.0.1:1");

        let err = provider.fetch_suggestions("Lon").await.unwrap_err();

        assert!(matches!(err, WeatherApiError::Network(_)));
    }

    #[tokio::test]
    async fn malformed_base_url_is_unknown_error() {
        let provider = OpenWeatherProvider::new("TEST_KEY".to_string())
            .expect("client builds")
            .with_base_url("not a url");

        let err = provider.fetch_weather("London").await.unwrap_err();

        assert!(matches!(err, WeatherApiError::Unknown(_)));
    }

    #[test]
    fn from_config_requires_api_key() {
        let err = OpenWeatherProvider::from_config(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let cut = truncate_body(&body);
        assert!(cut.len() <= 200);
        assert!(body.starts_with(cut));
    }
}
