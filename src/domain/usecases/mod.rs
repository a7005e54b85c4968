//
// Copyright (c) 2024 Nathan Fiedler
//
use anyhow::Error;

pub mod add_user;
pub mod fetch_user;
pub mod remove_user;
pub mod update_user;

/// `UseCase` is the interface by which all use cases are invoked.
pub trait UseCase<Type, Params> {
    fn call(&self, params: Params) -> Result<Type, Error>;
}
