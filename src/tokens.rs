//! Persistence for the bearer and refresh credentials.
//!
//! These two values are the only state that outlives the process. They live
//! in a key-value area under the fixed keys [AUTH_TOKEN_KEY] and
//! [REFRESH_TOKEN_KEY].

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use rusqlite::{Connection, OptionalExtension, params};

use crate::Error;

/// The key for the bearer credential sent with every request.
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// The key for the credential used to obtain a new bearer token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// A key-value area for persisted credentials.
pub trait TokenStore: Send + Sync {
    /// Get the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), Error>;

    /// The bearer credential, if one is stored.
    fn auth_token(&self) -> Result<Option<String>, Error> {
        self.get(AUTH_TOKEN_KEY)
    }

    /// Remove both credentials.
    fn clear_credentials(&self) -> Result<(), Error> {
        self.remove(AUTH_TOKEN_KEY)?;
        self.remove(REFRESH_TOKEN_KEY)
    }
}

/// Keeps credentials in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `auth_token`.
    pub fn with_auth_token(auth_token: &str) -> Self {
        let store = Self::new();
        store
            .values()
            .insert(AUTH_TOKEN_KEY.to_owned(), auth_token.to_owned());
        store
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.values().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.values().remove(key);
        Ok(())
    }
}

/// Keeps credentials in a SQLite database so they survive restarts.
#[derive(Debug)]
pub struct SqliteTokenStore {
    connection: Mutex<Connection>,
}

impl SqliteTokenStore {
    /// Create a store backed by `connection`, creating the table if needed.
    ///
    /// # Errors
    /// Returns an error if the table cannot be created.
    pub fn new(connection: Connection) -> Result<Self, Error> {
        create_key_value_table(&connection)?;

        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn create_key_value_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS key_value (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

impl TokenStore for SqliteTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let value = self
            .connection()
            .query_row(
                "SELECT value FROM key_value WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.connection().execute(
            "INSERT INTO key_value (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.connection()
            .execute("DELETE FROM key_value WHERE key = ?1", params![key])?;

        Ok(())
    }
}


#[cfg(test)]
mod token_store_tests {
    use rusqlite::Connection;

    use super::{
        AUTH_TOKEN_KEY, MemoryTokenStore, REFRESH_TOKEN_KEY, SqliteTokenStore, TokenStore,
    };

    fn get_sqlite_store() -> SqliteTokenStore {
        let connection = Connection::open_in_memory().unwrap();
        SqliteTokenStore::new(connection).unwrap()
    }

    fn assert_round_trips_and_clears(store: &dyn TokenStore) {
        assert_eq!(store.auth_token().unwrap(), None);

        store.set(AUTH_TOKEN_KEY, "first").unwrap();
        store.set(AUTH_TOKEN_KEY, "second").unwrap();
        store.set(REFRESH_TOKEN_KEY, "refresh").unwrap();

        assert_eq!(store.auth_token().unwrap(), Some("second".to_owned()));
        assert_eq!(
            store.get(REFRESH_TOKEN_KEY).unwrap(),
            Some("refresh".to_owned())
        );

        store.clear_credentials().unwrap();

        assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn memory_store_overwrites_and_clears() {
        assert_round_trips_and_clears(&MemoryTokenStore::new());
    }

    #[test]
    fn sqlite_store_overwrites_and_clears() {
        assert_round_trips_and_clears(&get_sqlite_store());
    }

    #[test]
    fn removing_missing_key_is_ok() {
        let store = get_sqlite_store();

        assert!(store.remove(REFRESH_TOKEN_KEY).is_ok());
    }

    #[test]
    fn memory_store_can_start_signed_in() {
        let store = MemoryTokenStore::with_auth_token("abc");

        assert_eq!(store.auth_token().unwrap(), Some("abc".to_owned()));
    }
}
