//
// Copyright (c) 2024 Nathan Fiedler
//
use crate::Error;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

///
/// Runtime configuration, normally read from the environment (and any
/// `.env` file loaded beforehand).
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// SQLite database file (`USERS_DB_PATH`); in-memory when unset.
    pub database_path: Option<PathBuf>,
    /// Quiet period before a search query takes effect (`SEARCH_DEBOUNCE_MS`).
    pub search_debounce: Duration,
    /// Upper bound on a single add, update, or delete (`OPERATION_TIMEOUT_MS`).
    pub operation_timeout: Duration,
    /// Wait on a locked database file (`DB_BUSY_TIMEOUT_MS`).
    pub busy_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            search_debounce: Duration::from_millis(300),
            operation_timeout: Duration::from_millis(5_000),
            busy_timeout: Duration::from_millis(2_000),
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    ///
    /// Read settings using the given lookup function, falling back to the
    /// defaults for anything unset or empty.
    ///
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Ok(Self {
            database_path: get("USERS_DB_PATH").map(PathBuf::from),
            search_debounce: millis(get("SEARCH_DEBOUNCE_MS"), "SEARCH_DEBOUNCE_MS")?
                .unwrap_or(defaults.search_debounce),
            operation_timeout: millis(get("OPERATION_TIMEOUT_MS"), "OPERATION_TIMEOUT_MS")?
                .unwrap_or(defaults.operation_timeout),
            busy_timeout: millis(get("DB_BUSY_TIMEOUT_MS"), "DB_BUSY_TIMEOUT_MS")?
                .unwrap_or(defaults.busy_timeout),
        })
    }
}

fn millis(value: Option<String>, key: &str) -> Result<Option<Duration>, Error> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| Error::InvalidSetting(key.to_owned(), raw)),
    }
}
