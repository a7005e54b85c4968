//
// Copyright (c) 2024 Nathan Fiedler
//
use crate::domain::validation::ValidationError;

pub mod data;
pub mod domain;
pub mod presentation;
pub mod settings;

///
/// This type represents various errors that can occur within this crate.
///
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error occurred during an SQL related operation.
    #[error("SQL error: {0}")]
    SQLError(#[from] rusqlite::Error),
    /// Error occurred while (de)serializing JSON.
    #[error("JSON error: {0}")]
    JSONError(#[from] serde_json::Error),
    /// User record failed validation before reaching the store.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Store rejected a write because the email is already taken.
    #[error("duplicate email: {0}")]
    DuplicateEmail(String),
    /// A user with the same email was found before attempting the insert.
    #[error("a user with email {0} already exists")]
    UserAlreadyExists(String),
    /// User record for given identifier was not found.
    #[error("no such user: {0}")]
    UserNotFound(i64),
    /// Something happened when operating on the database.
    #[error("error resulting from database operation")]
    Database,
    /// A configuration value could not be understood.
    #[error("invalid setting {0}: {1}")]
    InvalidSetting(String, String),
    /// Operation did not complete within the allotted time.
    #[error("operation timed out")]
    TimedOut,
    /// An unexpected error occurred that would otherwise have been a panic.
    #[error("something bad happened: {0}")]
    InternalError(String),
}
