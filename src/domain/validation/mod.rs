//
// Copyright (c) 2024 Nathan Fiedler
//
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

mod strategy;

pub use strategy::{UserValidation, ValidationStrategy};

///
/// Reasons a user record is rejected before reaching the store.
///
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("First name cannot be empty")]
    FirstNameBlank,
    #[error("Last name cannot be empty")]
    LastNameBlank,
    #[error("Email cannot be empty")]
    EmailBlank,
    #[error("Invalid email address")]
    EmailMalformed,
    #[error("Phone number cannot be empty")]
    PhoneBlank,
    #[error("Invalid phone number")]
    PhoneMalformed,
    #[error("Date of birth cannot be empty")]
    DobBlank,
    #[error("Invalid date of birth, expected YYYY-MM-DD")]
    DobMalformed,
    #[error("Date of birth cannot be in the future")]
    DobInFuture,
}

/// Outcome of validating a user record.
pub type ValidationResult = Result<(), ValidationError>;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9+._%\-]{1,256}@[a-zA-Z0-9][a-zA-Z0-9\-]{0,64}(\.[a-zA-Z0-9][a-zA-Z0-9\-]{0,25})+$",
    )
    .expect("valid regex")
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[1-9][0-9]{1,14}$").expect("valid regex"));

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{4})-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])$").expect("valid regex")
});

/// Return `true` if the value is empty or only whitespace.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Return `true` if the value looks like `local@domain.tld`.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

///
/// Return `true` for an optional leading `+` followed by 2 to 15 digits,
/// the first of which is not zero.
///
pub fn is_valid_phone(value: &str) -> bool {
    PHONE_RE.is_match(value)
}

/// Return `true` if the (trimmed) value is a real calendar date in
/// `YYYY-MM-DD` form.
pub fn is_valid_date(value: &str) -> bool {
    parse_date(value).is_some()
}

///
/// Parse a `YYYY-MM-DD` date after trimming surrounding whitespace,
/// rejecting days that do not exist in the given month and year.
///
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(value.trim())?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    if day > days_in_month(year, month) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Gregorian leap year rule.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}
