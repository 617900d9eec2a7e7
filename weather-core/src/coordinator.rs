//! Stateful coordinator between the presentation layer and the API clients.
//!
//! The presentation layer only reads [`CoordinatorState`] (via [`WeatherCoordinator::state`]
//! or a [`watch::Receiver`] from [`WeatherCoordinator::subscribe`]) and calls the
//! operations below. Every mutation goes through one `watch::Sender`, so observers
//! always see a whole state.
//!
//! Each flow (suggestions, weather) carries a monotonically increasing request
//! token. A completion whose token is no longer the latest one for its flow is
//! dropped, so a slow response can never overwrite a newer one.

use anyhow::Result;
use parking_lot::Mutex;
use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    CitySuggestion, Config, GeocodingClient, SearchHistoryStore, WeatherApiError, WeatherClient,
    WeatherSnapshot, history, provider::OpenWeatherProvider,
};

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinatorState {
    pub suggestions: Vec<CitySuggestion>,
    /// True only while a weather request is in flight.
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub show_alert: bool,
    pub weather: Option<WeatherSnapshot>,
    pub history: HashSet<String>,
}

impl CoordinatorState {
    pub fn sorted_history(&self) -> Vec<String> {
        history::sorted_names(&self.history)
    }

    fn set_error(&mut self, err: &WeatherApiError) {
        self.error_message = Some(err.to_string());
        self.show_alert = true;
    }
}

#[derive(Clone)]
pub struct WeatherCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    geocoder: Arc<dyn GeocodingClient>,
    weather: Arc<dyn WeatherClient>,
    history: Mutex<SearchHistoryStore>,
    state: watch::Sender<CoordinatorState>,
    suggestion_seq: AtomicU64,
    weather_seq: AtomicU64,
    debounce: Duration,
    suggestion_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for WeatherCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherCoordinator")
            .field("geocoder", &self.inner.geocoder)
            .field("weather", &self.inner.weather)
            .field("debounce", &self.inner.debounce)
            .finish_non_exhaustive()
    }
}

impl WeatherCoordinator {
    pub fn new(
        geocoder: Arc<dyn GeocodingClient>,
        weather: Arc<dyn WeatherClient>,
        history: SearchHistoryStore,
        debounce: Duration,
    ) -> Self {
        let initial = CoordinatorState { history: history.entries().clone(), ..Default::default() };
        let (state, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                geocoder,
                weather,
                history: Mutex::new(history),
                state,
                suggestion_seq: AtomicU64::new(0),
                weather_seq: AtomicU64::new(0),
                debounce,
                suggestion_task: Mutex::new(None),
            }),
        }
    }

    /// Wire up OpenWeather clients and the on-disk history described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = Arc::new(OpenWeatherProvider::from_config(config)?);

        let history = match config.history_file_path() {
            Ok(path) => SearchHistoryStore::new(path),
            Err(err) => {
                tracing::warn!("search history will not be persisted: {err:#}");
                SearchHistoryStore::in_memory()
            }
        };

        let coordinator =
            Self::new(provider.clone(), provider, history, config.debounce());
        coordinator.load_history();
        Ok(coordinator)
    }

    /// Current state snapshot.
    pub fn state(&self) -> CoordinatorState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    /// Refresh suggestions for `query`.
    ///
    /// Waits for the configured debounce first; if another suggestion request
    /// was issued meanwhile, returns without any network I/O.
    pub async fn fetch_suggestions(&self, query: &str) {
        let token = self.next_suggestion_token();
        self.run_suggestions(token, query).await;
    }

    /// Run the suggestion flow in the background, aborting the previous
    /// background request if it is still pending.
    pub fn spawn_suggestions(&self, query: impl Into<String>) {
        let query = query.into();
        let token = self.next_suggestion_token();
        let this = self.clone();
        let handle = tokio::spawn(async move { this.run_suggestions(token, &query).await });

        if let Some(previous) = self.inner.suggestion_task.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Drop the suggestion list, e.g. once the user picked one. Pending
    /// suggestion requests are superseded.
    pub fn clear_suggestions(&self) {
        self.next_suggestion_token();
        if let Some(previous) = self.inner.suggestion_task.lock().take() {
            previous.abort();
        }
        self.update(|state| state.suggestions.clear());
    }

    /// Fetch current conditions for `city` and record it in the history on success.
    pub async fn fetch_weather(&self, city: &str) {
        let token = self.inner.weather_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let _loading = LoadingGuard { inner: &self.inner, token };

        self.update(|state| {
            state.is_loading = true;
            state.error_message = None;
            state.show_alert = false;
        });

        let result = self.inner.weather.fetch_weather(city).await;

        if !self.is_current_weather(token) {
            tracing::debug!(city, "discarding superseded weather response");
            return;
        }

        match result {
            Ok(snapshot) => {
                tracing::info!(city = %snapshot.city_name, "weather updated");
                self.update(|state| {
                    state.is_loading = false;
                    state.weather = Some(snapshot);
                });
                self.record_history(city).await;
            }
            Err(err) => {
                tracing::warn!(city, kind = err.kind(), "weather request failed: {err:?}");
                self.update(|state| {
                    state.is_loading = false;
                    state.set_error(&err);
                });
            }
        }
    }

    /// Reload the history from the store.
    pub fn load_history(&self) {
        let history = self.inner.history.lock().load();
        self.update(|state| state.history = history);
    }

    pub fn remove_history(&self, name: &str) {
        let history = self.inner.history.lock().remove(name);
        self.update(|state| state.history = history);
    }

    /// Acknowledge the current error.
    pub fn dismiss_error(&self) {
        self.update(|state| {
            state.error_message = None;
            state.show_alert = false;
        });
    }

    /// Insert `city` into the store off the async workers; the store writes to disk.
    async fn record_history(&self, city: &str) {
        let inner = Arc::clone(&self.inner);
        let city = city.to_string();
        let inserted =
            tokio::task::spawn_blocking(move || inner.history.lock().insert(&city)).await;

        match inserted {
            Ok(history) => self.update(|state| state.history = history),
            Err(err) => tracing::warn!("failed to record search history: {err}"),
        }
    }

    fn next_suggestion_token(&self) -> u64 {
        self.inner.suggestion_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current_suggestion(&self, token: u64) -> bool {
        self.inner.suggestion_seq.load(Ordering::SeqCst) == token
    }

    fn is_current_weather(&self, token: u64) -> bool {
        self.inner.weather_seq.load(Ordering::SeqCst) == token
    }

    async fn run_suggestions(&self, token: u64, query: &str) {
        if query.is_empty() {
            self.update(|state| state.suggestions.clear());
            return;
        }

        if !self.inner.debounce.is_zero() {
            tokio::time::sleep(self.inner.debounce).await;
            if !self.is_current_suggestion(token) {
                return;
            }
        }

        let result = self.inner.geocoder.fetch_suggestions(query).await;

        if !self.is_current_suggestion(token) {
            tracing::debug!(query, "discarding superseded suggestions");
            return;
        }

        match result {
            Ok(suggestions) => self.update(|state| state.suggestions = suggestions),
            Err(err) => {
                tracing::warn!(query, kind = err.kind(), "suggestion request failed: {err:?}");
                self.update(|state| state.set_error(&err));
            }
        }
    }

    fn update(&self, f: impl FnOnce(&mut CoordinatorState)) {
        self.inner.state.send_modify(f);
    }
}

/// Clears `is_loading` if a weather request is dropped before it completes.
struct LoadingGuard<'a> {
    inner: &'a Inner,
    token: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.inner.weather_seq.load(Ordering::SeqCst) != self.token {
            return;
        }
        self.inner.state.send_if_modified(|state| {
            let was_loading = state.is_loading;
            state.is_loading = false;
            was_loading
        });
    }
}
