//
// Copyright (c) 2024 Nathan Fiedler
//
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// User entity.
///
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// Identifier assigned by the store, zero until the record is persisted.
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Unique across all user records.
    pub email: String,
    pub phone: String,
    /// Date of birth in `YYYY-MM-DD` form.
    pub dob: String,
    pub address: String,
}

impl User {
    /// First and last name separated by a space.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    ///
    /// Return `true` if the first name, last name, or email contains the
    /// given needle, which must already be in lowercase.
    ///
    pub fn matches_query(&self, needle: &str) -> bool {
        self.first_name.to_lowercase().contains(needle)
            || self.last_name.to_lowercase().contains(needle)
            || self.email.to_lowercase().contains(needle)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User({}, {})", self.id, self.email)
    }
}

///
/// Criteria for narrowing a list of users. Blank criteria are ignored and
/// every remaining criterion must match.
///
/// Names match by case-insensitive prefix of the trimmed value, email by
/// case-insensitive substring, and phone by prefix.
///
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl UserFilter {
    /// Filter on the first name alone.
    pub fn by_first_name<S: Into<String>>(first_name: S) -> Self {
        Self {
            first_name: Some(first_name.into()),
            ..Default::default()
        }
    }

    /// Return `true` if no criterion would narrow the list.
    pub fn is_empty(&self) -> bool {
        [&self.first_name, &self.last_name, &self.email, &self.phone]
            .iter()
            .all(|c| criterion(c).is_none())
    }

    /// Return `true` if the user satisfies every non-blank criterion.
    pub fn matches(&self, user: &User) -> bool {
        if let Some(term) = criterion(&self.first_name) {
            if !user.first_name.trim().to_lowercase().starts_with(&term.to_lowercase()) {
                return false;
            }
        }
        if let Some(term) = criterion(&self.last_name) {
            if !user.last_name.trim().to_lowercase().starts_with(&term.to_lowercase()) {
                return false;
            }
        }
        if let Some(term) = criterion(&self.email) {
            if !user.email.trim().to_lowercase().contains(&term.to_lowercase()) {
                return false;
            }
        }
        if let Some(term) = criterion(&self.phone) {
            if !user.phone.trim().starts_with(term) {
                return false;
            }
        }
        true
    }

    /// Produce the users that satisfy this filter, preserving order.
    pub fn apply(&self, users: &[User]) -> Vec<User> {
        if self.is_empty() {
            return users.to_vec();
        }
        users.iter().filter(|u| self.matches(u)).cloned().collect()
    }
}

// trimmed criterion, or None if absent or blank
fn criterion(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

///
/// State of an asynchronous read or write as seen by the presentation
/// layer.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Operation is still in progress.
    Loading,
    /// Operation completed and produced a value.
    Success(T),
    /// Operation failed with the given user-facing message.
    Error(String),
}

impl<T> Outcome<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Outcome::Loading)
    }

    /// The successful value, if any.
    pub fn success(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// The error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Outcome::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl<T> From<anyhow::Result<T>> for Outcome<T> {
    fn from(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Error(err.to_string()),
        }
    }
}
