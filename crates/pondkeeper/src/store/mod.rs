//! Local key-value persistence.
//!
//! Every entity collection lives under one logical key (see [`EntityKey`]) as
//! a single JSON document. The [`KeyValueStore`] trait is the only seam between
//! the repositories and the storage engine:
//!
//! - [`SqliteStore`]: a `SQLite` file (or `:memory:`), opened lazily
//! - [`MemoryStore`]: a plain map, for tests and throwaway sessions

pub mod memory;
pub mod migrations;
pub mod schema;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, StoreStats};

/// Asynchronous get/set/delete over a single key namespace.
///
/// Each call is atomic on its own; nothing spans multiple keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &Value) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// A store shared between repositories and services.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// The logical keys that hold entity collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// Dining tables.
    Tables,
    /// Orders and payments.
    Transactions,
    /// Menu items.
    MenuItems,
    /// Staff and owner accounts.
    Users,
}

impl EntityKey {
    /// All entity keys, in backup order.
    pub const ALL: [EntityKey; 4] = [
        EntityKey::Tables,
        EntityKey::Transactions,
        EntityKey::MenuItems,
        EntityKey::Users,
    ];

    /// The storage key string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tables => "tables",
            Self::Transactions => "transactions",
            Self::MenuItems => "menu_items",
            Self::Users => "users",
        }
    }

    /// Parse a storage key string.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_key_strings() {
        assert_eq!(EntityKey::Tables.as_str(), "tables");
        assert_eq!(EntityKey::Transactions.as_str(), "transactions");
        assert_eq!(EntityKey::MenuItems.as_str(), "menu_items");
        assert_eq!(EntityKey::Users.as_str(), "users");
    }

    #[test]
    fn test_entity_key_from_key() {
        for key in EntityKey::ALL {
            assert_eq!(EntityKey::from_key(key.as_str()), Some(key));
        }
        assert_eq!(EntityKey::from_key("orders"), None);
    }

    #[test]
    fn test_entity_key_display() {
        assert_eq!(EntityKey::MenuItems.to_string(), "menu_items");
    }
}
