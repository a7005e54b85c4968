//
// Copyright (c) 2024 Nathan Fiedler
//
use crate::domain::entities::User;
use crate::domain::repositories::UserRepository;
use crate::domain::validation::ValidationStrategy;
use anyhow::Error;
use std::cmp;
use std::fmt;
use std::sync::Arc;

///
/// Use case to validate a user and replace the stored record having the
/// same identifier.
///
pub struct UpdateUser {
    records: Arc<dyn UserRepository>,
    validator: Arc<dyn ValidationStrategy>,
}

impl UpdateUser {
    pub fn new(records: Arc<dyn UserRepository>, validator: Arc<dyn ValidationStrategy>) -> Self {
        Self { records, validator }
    }
}

impl super::UseCase<User, Params> for UpdateUser {
    fn call(&self, params: Params) -> Result<User, Error> {
        let user = params.user;
        self.validator
            .validate(&user)
            .map_err(crate::Error::Validation)?;
        // transient records cannot exist in the store
        if user.id <= 0 {
            return Err(crate::Error::UserNotFound(user.id).into());
        }
        self.records.update_user(user.clone())?;
        Ok(user)
    }
}

#[derive(Clone)]
pub struct Params {
    /// Replacement values, including the identifier of the stored record.
    pub user: User,
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Params(user: {})", self.user.id)
    }
}

impl cmp::PartialEq for Params {
    fn eq(&self, other: &Self) -> bool {
        self.user == other.user
    }
}

impl cmp::Eq for Params {}
