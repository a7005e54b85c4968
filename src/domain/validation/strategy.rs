//
// Copyright (c) 2024 Nathan Fiedler
//
use super::{is_blank, is_valid_email, is_valid_phone, parse_date, ValidationError, ValidationResult};
use crate::domain::entities::User;
use chrono::NaiveDate;

///
/// Decides whether a user record may be written to the store.
///
pub trait ValidationStrategy: Send + Sync {
    /// Return the first rule the user violates, if any.
    fn validate(&self, user: &User) -> ValidationResult;
}

///
/// Field rules for user records, checked in a fixed order so that only the
/// most important problem is reported.
///
#[derive(Clone, Debug, Default)]
pub struct UserValidation {
    // when unset the local clock decides what "today" is
    today: Option<NaiveDate>,
}

impl UserValidation {
    pub fn new() -> Self {
        Self { today: None }
    }

    /// Validate against a fixed current date.
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

impl ValidationStrategy for UserValidation {
    fn validate(&self, user: &User) -> ValidationResult {
        if is_blank(&user.first_name) {
            return Err(ValidationError::FirstNameBlank);
        }
        if is_blank(&user.last_name) {
            return Err(ValidationError::LastNameBlank);
        }
        if is_blank(&user.email) {
            return Err(ValidationError::EmailBlank);
        }
        if !is_valid_email(&user.email) {
            return Err(ValidationError::EmailMalformed);
        }
        if is_blank(&user.phone) {
            return Err(ValidationError::PhoneBlank);
        }
        if !is_valid_phone(&user.phone) {
            return Err(ValidationError::PhoneMalformed);
        }
        if is_blank(&user.dob) {
            return Err(ValidationError::DobBlank);
        }
        match parse_date(&user.dob) {
            None => Err(ValidationError::DobMalformed),
            Some(dob) if dob > self.today() => Err(ValidationError::DobInFuture),
            Some(_) => Ok(()),
        }
    }
}
