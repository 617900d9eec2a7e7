//! Failure taxonomy shared by the geocoding and weather clients.
//!
//! The `Display` form of every variant is the message shown to the user,
//! so the coordinator can surface `err.to_string()` directly.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum WeatherApiError {
    /// DNS, connect, timeout or body read failure.
    #[error("Network connection failed. Please check your internet.")]
    Network(#[source] BoxError),

    /// Payload did not match the expected schema.
    #[error("Could not read the data. Please try again.")]
    Decoding(#[source] BoxError),

    /// Any HTTP status other than 200.
    #[error("Server returned error {status_code}.")]
    Server { status_code: u16 },

    #[error("Something went wrong: {0}")]
    Unknown(anyhow::Error),
}

impl WeatherApiError {
    /// Classify a transport-level failure from the HTTP client.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decoding(Box::new(err))
        } else if err.is_builder() {
            Self::Unknown(anyhow::Error::new(err))
        } else {
            Self::Network(Box::new(err))
        }
    }

    pub fn unknown(msg: impl std::fmt::Display) -> Self {
        Self::Unknown(anyhow::anyhow!("{msg}"))
    }

    /// Short machine-friendly kind, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Decoding(_) => "decoding",
            Self::Server { .. } => "server",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl From<serde_json::Error> for WeatherApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decoding(Box::new(err))
    }
}
