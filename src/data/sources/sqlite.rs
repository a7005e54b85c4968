//
// Copyright (c) 2024 Nathan Fiedler
//
use crate::data::sources::UserDataSource;
use crate::domain::entities::User;
use crate::Error;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

/// Schema version written to `PRAGMA user_version` once migrations finish.
const SCHEMA_VERSION: i32 = 3;

const SELECT_USER: &str =
    "SELECT id, first_name, last_name, email, phone, dob, address FROM users";

///
/// Data source implementation backed by an SQLite database.
///
pub struct SQLiteUserDataSource {
    // database connection, also serializes every statement
    conn: Arc<Mutex<Connection>>,
    // latest full set of records
    feed: watch::Sender<Arc<Vec<User>>>,
}

impl SQLiteUserDataSource {
    /// Construct an SQLite-based data source that will be stored at the given path.
    pub fn new<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self, Error> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::with_connection(conn)
    }

    /// Construct an SQLite-based data source that will be memory resident.
    pub fn new_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, Error> {
        migrate(&conn)?;
        let users = load_users(&conn)?;
        let (feed, _) = watch::channel(Arc::new(users));
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            feed,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.conn
            .lock()
            .map_err(|_| Error::InternalError("database lock poisoned".into()))
    }

    // Publish the current records while the caller still holds the lock so
    // that subscribers observe writes in the order they happened.
    fn publish(&self, db: &Connection) -> Result<(), Error> {
        let users = load_users(db)?;
        self.feed.send_replace(Arc::new(users));
        Ok(())
    }
}

impl UserDataSource for SQLiteUserDataSource {
    fn subscribe(&self) -> watch::Receiver<Arc<Vec<User>>> {
        self.feed.subscribe()
    }

    fn count_users(&self) -> Result<u32, Error> {
        let db = self.lock()?;
        let mut stmt = db.prepare("SELECT COUNT(*) FROM users")?;
        let mut rows = stmt.query([])?;
        if let Some(row) = rows.next()? {
            Ok(row.get(0)?)
        } else {
            // mysterious failure
            Err(Error::Database)
        }
    }

    fn get_user(&self, user_id: i64) -> Result<User, Error> {
        let db = self.lock()?;
        let mut stmt = db.prepare(&format!("{} WHERE id = ?", SELECT_USER))?;
        stmt.query_row([user_id], row_to_user)
            .optional()?
            .ok_or(Error::UserNotFound(user_id))
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let db = self.lock()?;
        let mut stmt = db.prepare(&format!("{} WHERE email = ? LIMIT 1", SELECT_USER))?;
        Ok(stmt.query_row([email], row_to_user).optional()?)
    }

    fn insert_user(&self, user: User) -> Result<i64, Error> {
        let db = self.lock()?;
        let result = db.execute(
            "INSERT INTO users (first_name, last_name, email, phone, dob, address)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                user.first_name,
                user.last_name,
                user.email,
                user.phone,
                user.dob,
                user.address
            ],
        );
        match result {
            Ok(1) => (),
            // mysterious failure
            Ok(_) => return Err(Error::Database),
            Err(err) if is_unique_violation(&err) => return Err(Error::DuplicateEmail(user.email)),
            Err(err) => return Err(err.into()),
        }
        let user_id = db.last_insert_rowid();
        debug!("inserted user {} with email {}", user_id, user.email);
        self.publish(&db)?;
        Ok(user_id)
    }

    fn update_user(&self, user: User) -> Result<(), Error> {
        let db = self.lock()?;
        let result = db.execute(
            "UPDATE users SET first_name = ?, last_name = ?, email = ?, phone = ?,
             dob = ?, address = ? WHERE id = ?",
            params![
                user.first_name,
                user.last_name,
                user.email,
                user.phone,
                user.dob,
                user.address,
                user.id
            ],
        );
        match result {
            Ok(0) => return Err(Error::UserNotFound(user.id)),
            Ok(_) => (),
            Err(err) if is_unique_violation(&err) => return Err(Error::DuplicateEmail(user.email)),
            Err(err) => return Err(err.into()),
        }
        debug!("updated user {}", user.id);
        self.publish(&db)
    }

    fn delete_user(&self, user_id: i64) -> Result<(), Error> {
        let db = self.lock()?;
        if db.execute("DELETE FROM users WHERE id = ?", [user_id])? == 0 {
            return Err(Error::UserNotFound(user_id));
        }
        debug!("deleted user {}", user_id);
        self.publish(&db)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        dob: row.get(5)?,
        address: row.get(6)?,
    })
}

fn load_users(conn: &Connection) -> rusqlite::Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_USER))?;
    let rows = stmt.query_map([], row_to_user)?;
    rows.collect()
}

//
// Bring the database schema up to date, one version at a time, within a
// single transaction.
//
fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version >= SCHEMA_VERSION {
        return Ok(());
    }
    let tx = conn.unchecked_transaction()?;
    if version < 1 {
        debug!("creating users table");
        tx.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL DEFAULT ''
            )",
            (),
        )?;
    }
    if version < 2 {
        // keep the oldest record for each email before enforcing uniqueness
        debug!("adding unique email index");
        tx.execute_batch(
            "DELETE FROM users WHERE id NOT IN (SELECT MIN(id) FROM users GROUP BY email);
             CREATE UNIQUE INDEX IF NOT EXISTS index_users_email ON users (email);",
        )?;
    }
    if version < 3 {
        debug!("adding date of birth and address columns");
        tx.execute_batch(
            "ALTER TABLE users ADD COLUMN dob TEXT NOT NULL DEFAULT '';
             ALTER TABLE users ADD COLUMN address TEXT NOT NULL DEFAULT '';",
        )?;
    }
    tx.execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
    tx.commit()
}
