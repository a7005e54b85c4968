//
// Copyright (c) 2024 Nathan Fiedler
//
use crate::domain::entities::User;
use crate::Error;
#[cfg(test)]
use mockall::{automock, predicate::*};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

mod sqlite;

///
/// Data source for user records.
///
#[cfg_attr(test, automock)]
pub trait UserDataSource: Send + Sync {
    ///
    /// Receive the full set of user records, ordered by identifier. A new
    /// set is published after every successful write.
    ///
    fn subscribe(&self) -> watch::Receiver<Arc<Vec<User>>>;

    /// Return the number of user records.
    fn count_users(&self) -> Result<u32, Error>;

    /// Retrieve the user record with the given identifier.
    fn get_user(&self, user_id: i64) -> Result<User, Error>;

    /// Retrieve the user record with the given email, if any.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    ///
    /// Insert the user, ignoring its identifier, and return the identifier
    /// assigned by the store. Fails with `DuplicateEmail` if the email is
    /// already present.
    ///
    fn insert_user(&self, user: User) -> Result<i64, Error>;

    ///
    /// Replace the record with the same identifier. Fails with
    /// `UserNotFound` if there is no such record.
    ///
    fn update_user(&self, user: User) -> Result<(), Error>;

    ///
    /// Delete the user record with the given identifier. Fails with
    /// `UserNotFound` if there is no such record.
    ///
    fn delete_user(&self, user_id: i64) -> Result<(), Error>;
}

///
/// Type for creating the desired type of data source.
///
#[derive(Clone, Debug)]
pub enum DataSourceType {
    /// SQLite resident in memory, not persistent.
    SqliteMemory,
    /// SQLite stored persistently to the given file path.
    SqliteFile(PathBuf),
}

///
/// Construct a data source appropriate for the given type. The busy
/// timeout bounds how long a file-backed store waits on a locked database.
///
pub fn build_data_source(
    dstype: DataSourceType,
    busy_timeout: Duration,
) -> Result<Arc<dyn UserDataSource>, Error> {
    match dstype {
        DataSourceType::SqliteMemory => {
            let source: Arc<dyn UserDataSource> =
                Arc::new(sqlite::SQLiteUserDataSource::new_in_memory()?);
            Ok(source)
        }
        DataSourceType::SqliteFile(path) => {
            let source: Arc<dyn UserDataSource> =
                Arc::new(sqlite::SQLiteUserDataSource::new(path, busy_timeout)?);
            Ok(source)
        }
    }
}
