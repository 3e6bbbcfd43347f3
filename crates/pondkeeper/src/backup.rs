//! JSON backup and restore of the whole local state.
//!
//! A backup file carries every entity collection under `idb` and the
//! connection settings under `localStorage`:
//!
//! ```json
//! {
//!   "version": 1,
//!   "timestamp": "2026-03-14T10:00:00.000Z",
//!   "idb": { "tables": [...], "transactions": [...], "menu_items": [...], "users": [...] },
//!   "localStorage": { "supabase_url": null, "neon_connection_string": "postgres://..." }
//! }
//! ```
//!
//! Restoring overwrites each key present in the file outright. Everything is
//! validated before the first write, but a storage failure halfway through is
//! not rolled back.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::model::{AppUser, MenuItem, Record, Table, TransactionRecord};
use crate::repo::tables::check_unique_numbers;
use crate::repo::users::check_unique_usernames;
use crate::repo::decode;
use crate::store::{EntityKey, SharedStore};

/// Newest backup format this build understands.
pub const BACKUP_VERSION: u64 = 1;

/// The backup file envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupPayload {
    /// Format version.
    pub version: u64,
    /// When the backup was taken, ISO-8601.
    pub timestamp: String,
    /// Stored value per entity key; `null` for keys never written.
    #[serde(rename = "idb")]
    pub entities: Map<String, Value>,
    /// Setting values by name; `null` for unset ones.
    #[serde(rename = "localStorage")]
    pub settings: Map<String, Value>,
}

/// What a restore changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Keys overwritten with a value from the file.
    pub restored: Vec<String>,
    /// Keys deleted because the file held `null` for them.
    pub cleared: Vec<String>,
    /// Settings after the restore; the caller decides where to persist them.
    pub settings: Settings,
}

/// Exports and imports backup files against one store and one set of
/// settings.
#[derive(Debug)]
pub struct BackupService {
    store: SharedStore,
    settings: Settings,
}

impl BackupService {
    /// Create a service over `store`, starting from `settings`.
    #[must_use]
    pub fn new(store: SharedStore, settings: Settings) -> Self {
        Self { store, settings }
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Collect every entity key and setting into a payload.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a key cannot be read.
    pub async fn export(&self) -> Result<BackupPayload> {
        let mut entities = Map::new();
        for key in EntityKey::ALL {
            let value = self.store.get(key.as_str()).await?.unwrap_or(Value::Null);
            entities.insert(key.as_str().to_string(), value);
        }

        let settings = Settings::NAMES
            .iter()
            .map(|name| {
                let value = self
                    .settings
                    .get(name)
                    .map_or(Value::Null, |v| Value::String(v.to_string()));
                ((*name).to_string(), value)
            })
            .collect();

        Ok(BackupPayload {
            version: BACKUP_VERSION,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entities,
            settings,
        })
    }

    /// Export as pretty-printed JSON text.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error.
    pub async fn export_json(&self) -> Result<String> {
        let payload = self.export().await?;
        let text = serde_json::to_string_pretty(&payload)?;
        info!(bytes = text.len(), "backup exported");
        Ok(text)
    }

    /// Restore from backup JSON text.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the text is not a backup object, its
    /// version is newer than [`BACKUP_VERSION`], or any collection or setting
    /// in it is malformed; nothing is written in that case. A storage error
    /// part way through leaves the keys written so far in place.
    pub async fn import_json(&mut self, text: &str) -> Result<RestoreSummary> {
        let parsed: Value = serde_json::from_str(text)
            .map_err(|e| Error::validation(format!("backup is not valid JSON: {e}")))?;
        let Value::Object(root) = parsed else {
            return Err(Error::validation("backup must be a JSON object"));
        };

        check_version(root.get("version"))?;
        let entities = section(&root, "idb")?;
        let local = section(&root, "localStorage")?;

        for (key, value) in &entities {
            match EntityKey::from_key(key) {
                Some(entity) => validate_entity(entity, value)?,
                None => warn!(key = %key, "unknown key in backup, restoring as-is"),
            }
        }

        let mut settings = self.settings.clone();
        for (name, value) in &local {
            let value = value.as_str().map(str::to_string);
            if !settings.set(name, value) {
                warn!(name = %name, "unknown setting in backup, skipped");
            }
        }
        settings
            .validate()
            .map_err(|e| Error::validation(format!("backup settings: {e}")))?;

        let mut summary = RestoreSummary::default();
        for (key, value) in entities {
            if value.is_null() {
                self.store.delete(&key).await?;
                summary.cleared.push(key);
            } else {
                self.store.set(&key, &value).await?;
                summary.restored.push(key);
            }
        }

        self.settings = settings;
        summary.settings = self.settings.clone();
        info!(
            restored = summary.restored.len(),
            cleared = summary.cleared.len(),
            "backup imported"
        );
        Ok(summary)
    }
}

fn check_version(version: Option<&Value>) -> Result<()> {
    let version = match version {
        None | Some(Value::Null) => return Ok(()),
        Some(v) => v
            .as_u64()
            .ok_or_else(|| Error::validation(format!("backup version is not a number: {v}")))?,
    };
    if version > BACKUP_VERSION {
        return Err(Error::validation(format!(
            "backup version {version} is newer than supported version {BACKUP_VERSION}"
        )));
    }
    Ok(())
}

fn section(root: &Map<String, Value>, name: &str) -> Result<Map<String, Value>> {
    match root.get(name) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(Error::validation(format!(
            "backup section {name} must be an object"
        ))),
    }
}

fn validate_entity(key: EntityKey, value: &Value) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    let collection_check = |result: Result<()>| {
        result.map_err(|e| Error::validation(format!("backup {key}: {e}")))
    };
    match key {
        EntityKey::Tables => {
            collection_check(check_unique_numbers(&validate_records::<Table>(value)?))
        }
        EntityKey::Transactions => validate_records::<TransactionRecord>(value).map(drop),
        EntityKey::MenuItems => validate_records::<MenuItem>(value).map(drop),
        EntityKey::Users => {
            collection_check(check_unique_usernames(&validate_records::<AppUser>(value)?))
        }
    }
}

fn validate_records<T: Record>(value: &Value) -> Result<Vec<T>> {
    let records = decode::<T>(value.clone())?;
    for record in &records {
        record
            .check()
            .map_err(|e| Error::validation(format!("backup {}: {e}", T::KEY)))?;
    }
    Ok(records)
}
