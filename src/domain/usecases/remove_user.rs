//
// Copyright (c) 2024 Nathan Fiedler
//
use crate::domain::repositories::UserRepository;
use anyhow::Error;
use std::cmp;
use std::fmt;
use std::sync::Arc;

///
/// Use case to remove a user record from the repository. No validation is
/// performed; a missing record is reported as an error.
///
pub struct RemoveUser {
    records: Arc<dyn UserRepository>,
}

impl RemoveUser {
    pub fn new(records: Arc<dyn UserRepository>) -> Self {
        Self { records }
    }
}

impl super::UseCase<(), Params> for RemoveUser {
    fn call(&self, params: Params) -> Result<(), Error> {
        self.records.delete_user(params.user_id)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct Params {
    /// Identifier of user to be removed.
    pub user_id: i64,
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Params(user: {})", self.user_id)
    }
}

impl cmp::PartialEq for Params {
    fn eq(&self, other: &Self) -> bool {
        self.user_id == other.user_id
    }
}

impl cmp::Eq for Params {}
