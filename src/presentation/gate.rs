//
// Copyright (c) 2024 Nathan Fiedler
//
use crate::domain::entities::User;
use crate::domain::repositories::{UserFeed, UserRepository};
use crate::Error;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const PENDING: u8 = 0;
const WRITING: u8 = 1;
const ABANDONED: u8 = 2;

///
/// Settles, exactly once, the race between a job reaching its write and the
/// caller giving up on it. Whichever side moves first wins: once writing has
/// begun the job cannot be abandoned, and once abandoned it cannot write.
///
#[derive(Debug, Default)]
pub struct WriteGate(AtomicU8);

impl WriteGate {
    /// Claim the right to write; `false` if the job was abandoned.
    pub fn begin_write(&self) -> bool {
        match self
            .0
            .compare_exchange(PENDING, WRITING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(state) => state == WRITING,
        }
    }

    /// Abandon the job; `false` if it has already begun writing.
    pub fn abandon(&self) -> bool {
        match self
            .0
            .compare_exchange(PENDING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(state) => state == ABANDONED,
        }
    }
}

///
/// Repository that passes reads through and lets writes reach the wrapped
/// repository only while the gate allows it.
///
pub struct GatedRepository {
    inner: Arc<dyn UserRepository>,
    gate: Arc<WriteGate>,
}

impl GatedRepository {
    pub fn new(inner: Arc<dyn UserRepository>, gate: Arc<WriteGate>) -> Self {
        Self { inner, gate }
    }

    fn check(&self) -> Result<(), Error> {
        if self.gate.begin_write() {
            Ok(())
        } else {
            Err(Error::TimedOut)
        }
    }
}

impl UserRepository for GatedRepository {
    fn all_users(&self) -> UserFeed {
        self.inner.all_users()
    }

    fn search_users(&self, query: &str) -> UserFeed {
        self.inner.search_users(query)
    }

    fn count_users(&self) -> Result<u32, Error> {
        self.inner.count_users()
    }

    fn get_user(&self, user_id: i64) -> Result<User, Error> {
        self.inner.get_user(user_id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.inner.get_user_by_email(email)
    }

    fn insert_user(&self, user: User) -> Result<i64, Error> {
        self.check()?;
        self.inner.insert_user(user)
    }

    fn update_user(&self, user: User) -> Result<(), Error> {
        self.check()?;
        self.inner.update_user(user)
    }

    fn delete_user(&self, user_id: i64) -> Result<(), Error> {
        self.check()?;
        self.inner.delete_user(user_id)
    }
}
