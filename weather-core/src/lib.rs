//! Core library for the `weather` app.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - OpenWeather geocoding and current-weather clients
//! - The persisted search history
//! - `WeatherCoordinator`, the observable state a front-end renders
//!
//! It is used by `weather-cli`, but can also be driven by any other front-end.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod history;
pub mod model;
pub mod provider;

pub use config::Config;
pub use coordinator::{CoordinatorState, WeatherCoordinator};
pub use error::WeatherApiError;
pub use history::SearchHistoryStore;
pub use model::{CitySuggestion, WeatherSnapshot};
pub use provider::{GeocodingClient, OpenWeatherProvider, WeatherClient};
