//! Persisted set of previously searched city names.
//!
//! The history is one entry in a small JSON key-value file. Persistence is
//! best-effort: failures are logged and the in-memory set stays authoritative
//! for the rest of the session.

use serde_json::{Map, Value};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

/// Key under which the history list is stored.
pub const HISTORY_KEY: &str = "SearchHistory";

#[derive(Debug, Default)]
pub struct SearchHistoryStore {
    path: Option<PathBuf>,
    entries: HashSet<String>,
}

impl SearchHistoryStore {
    /// Store backed by the file at `path`. Nothing is read until `load`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()), entries: HashSet::new() }
    }

    /// Store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &HashSet<String> {
        &self.entries
    }

    /// Reload the persisted set. Missing or malformed data yields an empty set.
    pub fn load(&mut self) -> HashSet<String> {
        let loaded = match &self.path {
            Some(path) => read_history(path),
            None => self.entries.clone(),
        };
        self.entries = loaded;
        self.entries.clone()
    }

    /// Replace the persisted set with `entries`.
    pub fn save(&mut self, entries: HashSet<String>) {
        self.entries = entries;
        self.persist();
    }

    /// Add `name` after percent-decoding it. Empty names are ignored.
    pub fn insert(&mut self, name: &str) -> HashSet<String> {
        let decoded = decode_name(name);
        if decoded.is_empty() {
            return self.entries.clone();
        }
        if self.entries.insert(decoded) {
            self.persist();
        }
        self.entries.clone()
    }

    pub fn remove(&mut self, name: &str) -> HashSet<String> {
        if self.entries.remove(name) {
            self.persist();
        }
        self.entries.clone()
    }

    fn persist(&self) {
        let Some(path) = &self.path else { return };
        if let Err(err) = write_history(path, &self.entries) {
            tracing::warn!(path = %path.display(), "failed to persist search history: {err:#}");
        }
    }
}

/// History names in display order (case-insensitive).
pub fn sorted_names(entries: &HashSet<String>) -> Vec<String> {
    let mut items: Vec<String> = entries.iter().cloned().collect();
    items.sort_by_key(|name| name.to_lowercase());
    items
}

fn decode_name(name: &str) -> String {
    match urlencoding::decode(name) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => name.to_string(),
    }
}

fn read_history(path: &Path) -> HashSet<String> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), "failed to read search history: {err}");
            }
            return HashSet::new();
        }
    };

    let mut store: Map<String, Value> = match serde_json::from_str(&contents) {
        Ok(store) => store,
        Err(err) => {
            tracing::warn!(path = %path.display(), "ignoring malformed search history: {err}");
            return HashSet::new();
        }
    };

    match store.remove(HISTORY_KEY).map(serde_json::from_value::<Vec<String>>) {
        Some(Ok(items)) => items.into_iter().filter(|name| !name.is_empty()).collect(),
        Some(Err(err)) => {
            tracing::warn!(path = %path.display(), "ignoring malformed search history: {err}");
            HashSet::new()
        }
        None => HashSet::new(),
    }
}

fn write_history(path: &Path, entries: &HashSet<String>) -> anyhow::Result<()> {
    use anyhow::Context;

    // Keep any other keys already stored in the file.
    let mut store: Map<String, Value> = fs::read_to_string(path)
        .ok()
        .and_then(|contents| serde_json::from_str(&contents).ok())
        .unwrap_or_default();

    let items: Vec<&String> = entries.iter().collect();
    store.insert(HISTORY_KEY.to_string(), serde_json::to_value(items)?);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create history directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(&store).context("Failed to serialize history")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write history file: {}", path.display()))?;

    Ok(())
}
