//! SQLite-backed reminder storage.
//!
//! Each reminder is one row keyed by its id, holding the JSON-encoded
//! configuration. Runtime state is never stored.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection};

use super::data_dir;
use super::store::ReminderStore;
use crate::error::{CoreError, StorageError};
use crate::reminder::{ReminderConfig, ReminderId};

/// SQLite database holding reminder configurations.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the database at `<data_dir>/remindroom.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("remindroom.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reminders (
                id          TEXT PRIMARY KEY,
                body        TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reminders_updated_at ON reminders(updated_at);",
        )?;
        Ok(())
    }

    /// Load one stored reminder configuration.
    pub fn load(&self, id: ReminderId) -> Result<Option<ReminderConfig>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM reminders WHERE id = ?1")?;
        let result = stmt.query_row(params![id.to_string()], |row| row.get::<_, String>(0));
        match result {
            Ok(body) => decode(&id.to_string(), &body).map(Some),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load every stored reminder, oldest change first.
    pub fn load_all(&self) -> Result<Vec<ReminderConfig>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, body FROM reminders ORDER BY updated_at, id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut configs = Vec::new();
        for row in rows {
            let (id, body) = row?;
            configs.push(decode(&id, &body)?);
        }
        Ok(configs)
    }

    pub fn count(&self) -> Result<u64, StorageError> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM reminders", [], |row| row.get::<_, u64>(0))?;
        Ok(n)
    }
}

fn decode(id: &str, body: &str) -> Result<ReminderConfig, StorageError> {
    serde_json::from_str(body).map_err(|e| StorageError::Corrupt {
        id: id.to_string(),
        message: e.to_string(),
    })
}

impl ReminderStore for SqliteStore {
    fn save(&mut self, config: &ReminderConfig) -> Result<(), StorageError> {
        let body = serde_json::to_string(config).map_err(|e| StorageError::Corrupt {
            id: config.id.to_string(),
            message: e.to_string(),
        })?;
        self.conn.execute(
            "INSERT OR REPLACE INTO reminders (id, body, updated_at) VALUES (?1, ?2, ?3)",
            params![config.id.to_string(), body, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn delete(&mut self, id: ReminderId) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM reminders WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::ReminderDefaults;

    #[test]
    fn save_load_delete() {
        let mut db = SqliteStore::open_memory().unwrap();
        let mut cfg = ReminderConfig::from_defaults(&ReminderDefaults::default());
        assert!(db.load(cfg.id).unwrap().is_none());

        db.save(&cfg).unwrap();
        cfg.name = "Eyes".into();
        db.save(&cfg).unwrap();
        assert_eq!(db.count().unwrap(), 1);
        assert_eq!(db.load(cfg.id).unwrap(), Some(cfg.clone()));

        db.delete(cfg.id).unwrap();
        db.delete(cfg.id).unwrap();
        assert!(db.load_all().unwrap().is_empty());
    }

    #[test]
    fn corrupt_body_is_reported() {
        let db = SqliteStore::open_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO reminders (id, body, updated_at) VALUES ('x', 'not json', '')",
                [],
            )
            .unwrap();
        let err = db.load_all().unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.db");
        let mut db = SqliteStore::open_at(&path).unwrap();
        let cfg = ReminderConfig::from_defaults(&ReminderDefaults::default());
        db.save(&cfg).unwrap();
        drop(db);

        let reopened = SqliteStore::open_at(&path).unwrap();
        assert_eq!(reopened.load_all().unwrap(), vec![cfg]);
    }
}
