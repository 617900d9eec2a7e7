//! Interactive search screen: type a city, pick a suggestion, see the weather.

use std::fmt;

use inquire::{Select, Text};
use weather_core::{CitySuggestion, WeatherCoordinator};

use crate::render;

enum MenuItem {
    NewSearch,
    Recent(String),
    RemoveRecent,
    Quit,
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::NewSearch => f.write_str("New search"),
            MenuItem::Recent(name) => write!(f, "Search again: {name}"),
            MenuItem::RemoveRecent => f.write_str("Remove a recent search"),
            MenuItem::Quit => f.write_str("Quit"),
        }
    }
}

enum Pick {
    Suggestion(CitySuggestion),
    AsTyped(String),
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pick::Suggestion(city) => match &city.state {
                Some(state) => write!(f, "{} ({state})", city.label()),
                None => f.write_str(&city.label()),
            },
            Pick::AsTyped(text) => write!(f, "Search \"{text}\" as typed"),
        }
    }
}

pub async fn run(coordinator: &WeatherCoordinator) -> anyhow::Result<()> {
    loop {
        let state = coordinator.state();
        let mut items = vec![MenuItem::NewSearch];
        items.extend(state.sorted_history().into_iter().map(MenuItem::Recent));
        if !state.history.is_empty() {
            items.push(MenuItem::RemoveRecent);
        }
        items.push(MenuItem::Quit);

        let Some(choice) = Select::new("Weather", items).prompt_skippable()? else {
            return Ok(());
        };

        let city = match choice {
            MenuItem::NewSearch => match search_city(coordinator).await? {
                Some(city) => city,
                None => continue,
            },
            MenuItem::Recent(name) => name,
            MenuItem::RemoveRecent => {
                let recent = state.sorted_history();
                if let Some(name) = Select::new("Remove", recent).prompt_skippable()? {
                    coordinator.remove_history(&name);
                }
                continue;
            }
            MenuItem::Quit => return Ok(()),
        };

        coordinator.fetch_weather(&city).await;
        show_outcome(coordinator);
    }
}

/// Ask for a city name and let the user pick one of the suggestions.
async fn search_city(coordinator: &WeatherCoordinator) -> anyhow::Result<Option<String>> {
    let Some(text) = Text::new("City:").prompt_skippable()? else {
        return Ok(None);
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        return Ok(None);
    }

    coordinator.fetch_suggestions(&text).await;
    let state = coordinator.state();
    if let Some(message) = &state.error_message {
        render::print_error(message);
        coordinator.dismiss_error();
    }

    let mut picks: Vec<Pick> = state.suggestions.into_iter().map(Pick::Suggestion).collect();
    picks.push(Pick::AsTyped(text));

    let picked = Select::new("Did you mean", picks).prompt_skippable()?;
    coordinator.clear_suggestions();

    Ok(picked.map(|pick| match pick {
        Pick::Suggestion(city) => city.name,
        Pick::AsTyped(text) => text,
    }))
}

fn show_outcome(coordinator: &WeatherCoordinator) {
    let state = coordinator.state();
    match &state.error_message {
        Some(message) => {
            render::print_error(message);
            coordinator.dismiss_error();
        }
        None => render::print_state(&state),
    }
}
