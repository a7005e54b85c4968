//
// Copyright (c) 2024 Nathan Fiedler
//
use crate::domain::entities::User;
use crate::Error;
#[cfg(test)]
use mockall::{automock, predicate::*};
use std::sync::Arc;
use tokio::sync::watch;

///
/// Repository for user records.
///
#[cfg_attr(test, automock)]
pub trait UserRepository: Send + Sync {
    /// Continuous view of every user record.
    fn all_users(&self) -> UserFeed;

    ///
    /// Continuous view of the users whose first name, last name, or email
    /// contains the query, ignoring case. A blank query yields every user.
    ///
    fn search_users(&self, query: &str) -> UserFeed;

    /// Return the number of user records.
    fn count_users(&self) -> Result<u32, Error>;

    /// Retrieve the user record with the given identifier.
    fn get_user(&self, user_id: i64) -> Result<User, Error>;

    /// Retrieve the user record with the given email, if any.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    /// Insert a new user and return the identifier assigned by the store.
    fn insert_user(&self, user: User) -> Result<i64, Error>;

    /// Replace every field of the user record having the same identifier.
    fn update_user(&self, user: User) -> Result<(), Error>;

    /// Delete the user record with the given identifier.
    fn delete_user(&self, user_id: i64) -> Result<(), Error>;
}

///
/// Subscription to the set of user records held by the store, optionally
/// narrowed by a search query. The current set is available immediately
/// and every later change can be awaited.
///
#[derive(Clone, Debug)]
pub struct UserFeed {
    receiver: watch::Receiver<Arc<Vec<User>>>,
    // lowercase needle, None for the unfiltered feed
    query: Option<String>,
}

impl UserFeed {
    /// Feed of every user record.
    pub fn new(receiver: watch::Receiver<Arc<Vec<User>>>) -> Self {
        Self {
            receiver,
            query: None,
        }
    }

    /// Feed narrowed to users matching the query; blank means unfiltered.
    pub fn filtered(receiver: watch::Receiver<Arc<Vec<User>>>, query: &str) -> Self {
        let query = query.trim();
        let query = if query.is_empty() {
            None
        } else {
            Some(query.to_lowercase())
        };
        Self { receiver, query }
    }

    /// The search needle, if this feed is filtered.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Return the latest record set and mark it as seen.
    pub fn current(&mut self) -> Vec<User> {
        let users = Arc::clone(&self.receiver.borrow_and_update());
        match &self.query {
            None => users.as_ref().clone(),
            Some(needle) => users
                .iter()
                .filter(|u| u.matches_query(needle))
                .cloned()
                .collect(),
        }
    }

    /// Wait until the store publishes a record set not yet seen.
    pub async fn changed(&mut self) -> Result<(), Error> {
        self.receiver
            .changed()
            .await
            .map_err(|_| Error::InternalError("user feed closed".into()))
    }
}
