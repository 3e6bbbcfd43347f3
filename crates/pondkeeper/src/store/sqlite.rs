//! `SQLite`-backed key-value store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{migrations, KeyValueStore};
use crate::error::{Error, Result};

const MEMORY_PATH: &str = ":memory:";

/// Key-value store persisted in a `SQLite` database.
///
/// The database is opened on first use, not at construction time, so building
/// a store never fails. Opening creates parent directories and the schema.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file, or `:memory:`.
    path: PathBuf,
    /// Lazily opened connection.
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Create a store for the database at `path`.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            conn: Mutex::new(None),
        }
    }

    /// Create a store backed by a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MEMORY_PATH)
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }

    fn open_connection(&self) -> Result<Connection> {
        if !self.is_in_memory() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
            }
        }

        debug!("Opening database at {}", self.path.display());
        let conn = Connection::open(&self.path).map_err(|source| Error::DatabaseOpen {
            path: self.path.clone(),
            source,
        })?;

        if !self.is_in_memory() {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        }

        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", self.path.display());
        Ok(conn)
    }

    /// Run `f` against the connection, opening it first if needed.
    async fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send,
        R: Send,
    {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.open_connection()?);
        }
        let Some(conn) = guard.as_ref() else {
            return Err(Error::internal("database connection missing after open"));
        };
        f(conn)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or queried.
    pub async fn stats(&self) -> Result<StoreStats> {
        let keys = self
            .with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
                let keys = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await?;

        let db_size_bytes = if self.is_in_memory() {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StoreStats {
            keys,
            db_size_bytes,
        })
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let text: Option<String> = self
            .with_conn(|conn| {
                Ok(conn
                    .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                        row.get(0)
                    })
                    .optional()?)
            })
            .await?;

        debug!(key, found = text.is_some(), "kv get");
        match text {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.with_conn(|conn| {
            conn.execute(
                r"
                INSERT INTO kv (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE
                SET value = excluded.value, updated_at = datetime('now')
                ",
                params![key, text],
            )?;
            Ok(())
        })
        .await?;

        debug!(key, bytes = text.len(), "kv set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let affected = self
            .with_conn(|conn| Ok(conn.execute("DELETE FROM kv WHERE key = ?1", [key])?))
            .await?;

        debug!(key, affected, "kv delete");
        Ok(())
    }
}

/// Statistics about the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Keys currently present, sorted.
    pub keys: Vec<String>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_db_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "pondkeeper_{tag}_test_{}.db",
            std::process::id()
        ))
    }

    fn cleanup(path: &Path) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = SqliteStore::in_memory();
        assert!(store.get("tables").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = SqliteStore::in_memory();
        let value = json!([{"id": "1", "number": 1, "capacity": 4, "status": "empty"}]);

        store.set("tables", &value).await.unwrap();
        assert_eq!(store.get("tables").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = SqliteStore::in_memory();
        store.set("users", &json!([1, 2, 3])).await.unwrap();
        store.set("users", &json!([4])).await.unwrap();

        assert_eq!(store.get("users").await.unwrap(), Some(json!([4])));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SqliteStore::in_memory();
        store.set("menu_items", &json!([])).await.unwrap();
        store.delete("menu_items").await.unwrap();
        assert!(store.get("menu_items").await.unwrap().is_none());

        // Deleting again is fine.
        store.delete("menu_items").await.unwrap();
    }

    #[tokio::test]
    async fn test_unicode_value() {
        let store = SqliteStore::in_memory();
        let value = json!({"name": "Es Teh Manis 🍵", "note": "pedas sekali"});
        store.set("note", &value).await.unwrap();
        assert_eq!(store.get("note").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_construction_does_not_open() {
        let path = std::env::temp_dir().join(format!(
            "pondkeeper_lazy_test_{}/nested/venue.db",
            std::process::id()
        ));
        let store = SqliteStore::new(&path);
        assert!(!path.exists());

        store.get("tables").await.unwrap();
        assert!(path.exists());

        drop(store);
        if let Some(root) = path.parent().and_then(Path::parent) {
            let _ = std::fs::remove_dir_all(root);
        }
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let path = temp_db_path("persist");
        cleanup(&path);

        let store = SqliteStore::new(&path);
        store.set("tables", &json!([{"number": 7}])).await.unwrap();
        drop(store);

        let reopened = SqliteStore::new(&path);
        assert_eq!(
            reopened.get("tables").await.unwrap(),
            Some(json!([{"number": 7}]))
        );
        assert_eq!(reopened.path(), path);

        drop(reopened);
        cleanup(&path);
    }

    #[tokio::test]
    async fn test_open_failure_is_storage_error() {
        let store = SqliteStore::new("/proc/pondkeeper-cannot-exist/venue.db");
        let err = store.get("tables").await.unwrap_err();
        assert!(err.is_storage_error());
    }

    #[tokio::test]
    async fn test_stats() {
        let store = SqliteStore::in_memory();
        store.set("users", &json!([])).await.unwrap();
        store.set("tables", &json!([])).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.keys, vec!["tables".to_string(), "users".to_string()]);
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[tokio::test]
    async fn test_stats_db_size() {
        let path = temp_db_path("size");
        cleanup(&path);

        let store = SqliteStore::new(&path);
        store.set("tables", &json!([])).await.unwrap();
        assert!(store.stats().await.unwrap().db_size_bytes > 0);

        drop(store);
        cleanup(&path);
    }
}
