//! JSON key/value store over `SQLite`

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::DbPool;
use crate::{Error, Result};

/// Typed accessor for JSON values stored under named keys
#[derive(Clone)]
pub struct KvStore {
    pool: DbPool,
}

impl KvStore {
    /// Create a new key/value store over the pool
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Read and deserialize the value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails or the stored JSON does
    /// not deserialize to `T`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let result: rusqlite::Result<String> = conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
        );

        match result {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::Database(e.to_string())),
        }
    }

    /// Serialize and store `value` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the database operation fails
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;
        let json = serde_json::to_string(value)?;

        conn.execute(
            r"
            INSERT INTO kv_store (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            ",
            rusqlite::params![key, json],
        )?;

        Ok(())
    }
}
