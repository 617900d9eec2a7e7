use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::Password;
use weather_core::{Config, SearchHistoryStore, WeatherCoordinator, history};

use crate::{interactive, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather lookup by city")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure {
        /// Key to store; prompted for when absent.
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Interactive search with city suggestions and history.
    Search,

    /// Show current weather for a city.
    Show {
        /// City name, e.g. "London" or "London,GB".
        city: String,
    },

    /// List or edit the search history.
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
}

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    /// Remove one city from the history.
    Remove { city: String },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Configure { .. } => "configure",
            Command::Search => "search",
            Command::Show { .. } => "show",
            Command::History { .. } => "history",
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        tracing::debug!(command = self.command.name(), "dispatching command");

        match self.command {
            Command::Configure { api_key } => {
                let api_key = match api_key {
                    Some(key) => key,
                    None => Password::new("OpenWeather API key:")
                        .without_confirmation()
                        .prompt()
                        .context("Failed to read API key")?,
                };
                if api_key.trim().is_empty() {
                    bail!("API key must not be empty");
                }
                config.set_api_key(api_key.trim().to_string());
                config.save()?;
                println!("Saved configuration to {}", Config::config_file_path()?.display());
            }
            Command::Search => {
                let coordinator = WeatherCoordinator::from_config(&prompt_config(config))?;
                interactive::run(&coordinator).await?;
            }
            Command::Show { city } => {
                let coordinator = WeatherCoordinator::from_config(&config)?;
                coordinator.fetch_weather(&city).await;
                let state = coordinator.state();
                if let Some(message) = state.error_message {
                    bail!(message);
                }
                render::print_state(&state);
            }
            Command::History { action } => {
                let names = edit_history(&config, action)?;
                render::print_history(&names);
            }
        }

        Ok(())
    }
}

/// Suggestions are looked up once per entered line, not per keystroke, so
/// the interactive screen runs without a debounce.
fn prompt_config(mut config: Config) -> Config {
    config.debounce_ms = 0;
    config
}

/// Apply `action` to the persisted history and return the remaining names.
/// Works without an API key: no request is made.
fn edit_history(config: &Config, action: Option<HistoryAction>) -> anyhow::Result<Vec<String>> {
    let mut store = SearchHistoryStore::new(config.history_file_path()?);
    let mut entries = store.load();

    if let Some(HistoryAction::Remove { city }) = action {
        if !entries.contains(&city) {
            bail!("'{city}' is not in the search history");
        }
        entries = store.remove(&city);
    }

    Ok(history::sorted_names(&entries))
}
