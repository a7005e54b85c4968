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
/// Use case to validate a new user and add it to the repository.
///
/// Returns the user with the identifier assigned by the store.
///
pub struct AddUser {
    records: Arc<dyn UserRepository>,
    validator: Arc<dyn ValidationStrategy>,
}

impl AddUser {
    pub fn new(records: Arc<dyn UserRepository>, validator: Arc<dyn ValidationStrategy>) -> Self {
        Self { records, validator }
    }
}

impl super::UseCase<User, Params> for AddUser {
    fn call(&self, params: Params) -> Result<User, Error> {
        let user = params.user;
        self.validator
            .validate(&user)
            .map_err(crate::Error::Validation)?;
        if self.records.get_user_by_email(&user.email)?.is_some() {
            return Err(crate::Error::UserAlreadyExists(user.email).into());
        }
        let id = self.records.insert_user(user.clone())?;
        Ok(User { id, ..user })
    }
}

#[derive(Clone)]
pub struct Params {
    /// New user, the identifier is ignored.
    pub user: User,
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Params(email: {})", self.user.email)
    }
}

impl cmp::PartialEq for Params {
    fn eq(&self, other: &Self) -> bool {
        self.user == other.user
    }
}

impl cmp::Eq for Params {}
