//
// Copyright (c) 2024 Nathan Fiedler
//
use crate::data::sources::UserDataSource;
use crate::domain::entities::User;
use crate::domain::repositories::{UserFeed, UserRepository};
use crate::Error;
use std::sync::Arc;

///
/// Default implementation of the user repository.
///
pub struct UserRepositoryImpl {
    datasource: Arc<dyn UserDataSource>,
}

impl UserRepositoryImpl {
    pub fn new(datasource: Arc<dyn UserDataSource>) -> Self {
        Self { datasource }
    }
}

impl UserRepository for UserRepositoryImpl {
    fn all_users(&self) -> UserFeed {
        UserFeed::new(self.datasource.subscribe())
    }

    fn search_users(&self, query: &str) -> UserFeed {
        UserFeed::filtered(self.datasource.subscribe(), query)
    }

    fn count_users(&self) -> Result<u32, Error> {
        self.datasource.count_users()
    }

    fn get_user(&self, user_id: i64) -> Result<User, Error> {
        self.datasource.get_user(user_id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.datasource.get_user_by_email(email)
    }

    fn insert_user(&self, user: User) -> Result<i64, Error> {
        self.datasource.insert_user(user)
    }

    fn update_user(&self, user: User) -> Result<(), Error> {
        self.datasource.update_user(user)
    }

    fn delete_user(&self, user_id: i64) -> Result<(), Error> {
        self.datasource.delete_user(user_id)
    }
}
