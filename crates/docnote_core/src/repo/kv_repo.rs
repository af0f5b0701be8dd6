//! Key-value repository contract and SQLite implementation.
//!
//! # Invariants
//! - `put` is an upsert; the last write for a key wins.
//! - `SqliteKvStore` only wraps connections whose schema is fully migrated.
//! - `ScopedKvStore` never reads or writes a key outside its scope.

use crate::db::migrations::{current_version, latest_version};
use crate::db::{open_db, open_db_in_memory, DbError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for key-value persistence.
#[derive(Debug)]
pub enum RepoError {
    InvalidKey(String),
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey(key) => write!(f, "invalid storage key: `{key}`"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidKey(_) => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// String key-value persistence used for comments and resolution flags.
pub trait KvStore {
    fn get(&self, key: &str) -> RepoResult<Option<String>>;
    fn put(&self, key: &str, value: &str) -> RepoResult<()>;
    /// Returns whether a value existed.
    fn delete(&self, key: &str) -> RepoResult<bool>;
}

impl<T: KvStore + ?Sized> KvStore for &T {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> RepoResult<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &str) -> RepoResult<bool> {
        (**self).delete(key)
    }
}

/// SQLite-backed key-value store owning its connection.
#[derive(Debug)]
pub struct SqliteKvStore {
    conn: Connection,
}

impl SqliteKvStore {
    /// Wraps an already migrated connection.
    ///
    /// # Errors
    /// - `DbError::SchemaNotReady` when migrations have not been applied.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        let version = current_version(&conn)?;
        let required = latest_version();
        if version < required {
            return Err(DbError::SchemaNotReady {
                db_version: version,
                required,
            }
            .into());
        }
        Ok(Self { conn })
    }

    /// Opens (or creates) a store file at `path`.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        let key = normalize_key(key)?;
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> RepoResult<()> {
        let key = normalize_key(key)?;
        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at;",
            params![key, value, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> RepoResult<bool> {
        let key = normalize_key(key)?;
        let changed = self
            .conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", params![key])?;
        Ok(changed > 0)
    }
}

/// `KvStore` view that namespaces every key under one document scope.
///
/// Keys are stored as `<scope>/<key>`, so several documents can share one
/// database file without overwriting each other.
#[derive(Debug)]
pub struct ScopedKvStore<S> {
    inner: S,
    prefix: String,
}

impl<S: KvStore> ScopedKvStore<S> {
    /// # Errors
    /// - `InvalidKey` for blank scopes.
    pub fn new(inner: S, scope: &str) -> RepoResult<Self> {
        let scope = normalize_key(scope)?;
        Ok(Self {
            prefix: format!("{scope}/"),
            inner,
        })
    }

    pub fn scope(&self) -> &str {
        self.prefix.trim_end_matches('/')
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn scoped_key(&self, key: &str) -> RepoResult<String> {
        let key = normalize_key(key)?;
        Ok(format!("{}{}", self.prefix, key))
    }
}

impl<S: KvStore> KvStore for ScopedKvStore<S> {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        self.inner.get(&self.scoped_key(key)?)
    }

    fn put(&self, key: &str, value: &str) -> RepoResult<()> {
        self.inner.put(&self.scoped_key(key)?, value)
    }

    fn delete(&self, key: &str) -> RepoResult<bool> {
        self.inner.delete(&self.scoped_key(key)?)
    }
}

fn normalize_key(key: &str) -> RepoResult<&str> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(RepoError::InvalidKey(key.to_string()));
    }
    Ok(trimmed)
}
