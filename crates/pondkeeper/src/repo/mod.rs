//! Entity repositories.
//!
//! Every collection is stored as one JSON array under its [`EntityKey`].
//! [`Collection`] wraps the read-modify-write cycle over that array and holds
//! an async lock for the duration, so concurrent mutations through the same
//! repository never overwrite each other.
//!
//! [`EntityKey`]: crate::store::EntityKey

pub mod menu;
pub mod tables;
pub mod transactions;
pub mod users;

use std::marker::PhantomData;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::Record;
use crate::store::SharedStore;

pub use menu::MenuRepository;
pub use tables::TableRepository;
pub use transactions::TransactionRepository;
pub use users::UserRepository;

/// Typed access to one stored record list.
#[derive(Debug)]
pub struct Collection<T: Record> {
    store: SharedStore,
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Collection<T> {
    /// Create a collection over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    /// Read the whole list in stored order. A missing key reads as empty.
    ///
    /// # Errors
    ///
    /// Returns a storage error, or a validation error if the stored value is
    /// not a list of `T`.
    pub async fn load(&self) -> Result<Vec<T>> {
        let Some(value) = self.store.get(T::KEY.as_str()).await? else {
            return Ok(Vec::new());
        };
        let records = decode::<T>(value)?;
        debug!(key = T::KEY.as_str(), count = records.len(), "loaded collection");
        Ok(records)
    }

    /// Replace the whole list.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any record is invalid, or a storage error.
    pub async fn save(&self, records: &[T]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(records).await
    }

    /// Run `f` over the list under the write lock and persist the result.
    ///
    /// Nothing is written if `f` fails.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or a load/store error.
    pub async fn modify<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>) -> Result<R> + Send,
        R: Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let out = f(&mut records)?;
        self.write(&records).await?;
        Ok(out)
    }

    /// Fetch one record by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no record has that id.
    pub async fn get(&self, id: &str) -> Result<T> {
        self.load()
            .await?
            .into_iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| Error::not_found(T::ENTITY, id))
    }

    /// Replace the record with the same id, or append it.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the record is invalid, or a storage error.
    pub async fn upsert(&self, record: T) -> Result<T> {
        record.check()?;
        self.modify(|records| {
            match records.iter_mut().find(|r| r.id() == record.id()) {
                Some(slot) => *slot = record.clone(),
                None => records.push(record.clone()),
            }
            Ok(record)
        })
        .await
    }

    /// Apply `f` to the record with `id` and persist it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or the error from `f`
    /// or from the record's own checks; nothing is written in that case.
    pub async fn update<F>(&self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut T) -> Result<()> + Send,
    {
        self.modify(|records| {
            let slot = records
                .iter_mut()
                .find(|r| r.id() == id)
                .ok_or_else(|| Error::not_found(T::ENTITY, id))?;
            let mut updated = slot.clone();
            f(&mut updated)?;
            updated.check()?;
            *slot = updated.clone();
            Ok(updated)
        })
        .await
    }

    /// Delete the record with `id`, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub async fn remove(&self, id: &str) -> Result<T> {
        self.modify(|records| {
            let index = records
                .iter()
                .position(|r| r.id() == id)
                .ok_or_else(|| Error::not_found(T::ENTITY, id))?;
            Ok(records.remove(index))
        })
        .await
    }

    async fn write(&self, records: &[T]) -> Result<()> {
        for record in records {
            record.check()?;
        }
        let value = serde_json::to_value(records)?;
        self.store.set(T::KEY.as_str(), &value).await?;
        debug!(key = T::KEY.as_str(), count = records.len(), "saved collection");
        Ok(())
    }
}

/// Decode a stored value as a list of `T`.
///
/// # Errors
///
/// Returns a validation error naming the collection if the value does not fit.
pub fn decode<T: Record>(value: Value) -> Result<Vec<T>> {
    serde_json::from_value(value)
        .map_err(|e| Error::validation(format!("malformed {} data: {e}", T::KEY)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{demo_menu, MenuItem, Table};
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn collection<T: Record>() -> (SharedStore, Collection<T>) {
        let store: SharedStore = Arc::new(MemoryStore::new());
        (store.clone(), Collection::new(store))
    }

    #[tokio::test]
    async fn test_missing_key_loads_empty() {
        let (_, tables) = collection::<Table>();
        assert!(tables.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_load_preserves_order() {
        let (_, menu) = collection::<MenuItem>();
        let mut items = demo_menu();
        items.reverse();
        menu.save(&items).await.unwrap();

        let loaded = menu.load().await.unwrap();
        assert_eq!(loaded, items);
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let (_, tables) = collection::<Table>();
        let first = tables.upsert(Table::new(1, 4).unwrap()).await.unwrap();
        tables.upsert(Table::new(2, 2).unwrap()).await.unwrap();

        let mut changed = first.clone();
        changed.capacity = 6;
        tables.upsert(changed).await.unwrap();

        let loaded = tables.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, first.id);
        assert_eq!(loaded[0].capacity, 6);
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_record() {
        let (store, tables) = collection::<Table>();
        let mut table = Table::new(1, 4).unwrap();
        table.capacity = 0;
        assert!(tables.upsert(table).await.is_err());
        assert!(store.get("tables").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_failure_writes_nothing() {
        let (_, tables) = collection::<Table>();
        let table = tables.upsert(Table::new(1, 4).unwrap()).await.unwrap();

        let result = tables
            .update(&table.id, |t| {
                t.capacity = 10;
                Err(Error::validation("nope"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(tables.get(&table.id).await.unwrap().capacity, 4);
    }

    #[tokio::test]
    async fn test_missing_id_is_not_found() {
        let (_, tables) = collection::<Table>();
        assert!(tables.get("nope").await.unwrap_err().is_not_found());
        assert!(tables.remove("nope").await.unwrap_err().is_not_found());
        assert!(tables
            .update("nope", |_| Ok(()))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_value_is_validation_error() {
        let (store, tables) = collection::<Table>();
        store.set("tables", &json!({"not": "a list"})).await.unwrap();
        let err = tables.load().await.unwrap_err();
        assert!(err.is_validation_error());
        assert!(err.to_string().contains("tables"));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_keep_every_record() {
        let (_, tables) = collection::<Table>();
        let tables = Arc::new(tables);

        let mut handles = Vec::new();
        for number in 1..=20 {
            let tables = tables.clone();
            handles.push(tokio::spawn(async move {
                tables.upsert(Table::new(number, 4).unwrap()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(tables.load().await.unwrap().len(), 20);
    }
}
