//! The venue: one store and the repositories over it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::backup::BackupService;
use crate::config::{SeedConfig, Settings};
use crate::error::Result;
use crate::model::{NewOrder, TransactionRecord};
use crate::repo::{MenuRepository, TableRepository, TransactionRepository, UserRepository};
use crate::sql::SqlExporter;
use crate::store::{MemoryStore, SharedStore};

/// Counts of records created by [`Venue::seed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Accounts created.
    pub users: usize,
    /// Menu items created.
    pub menu_items: usize,
}

/// Everything the app manages, over one shared store.
///
/// Each repository is created once here, so every mutation of a collection
/// made through the same `Venue` goes through that collection's write lock.
#[derive(Debug)]
pub struct Venue {
    store: SharedStore,
    tables: TableRepository,
    menu: MenuRepository,
    transactions: TransactionRepository,
    users: UserRepository,
}

impl Venue {
    /// Build a venue over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            tables: TableRepository::new(store.clone()),
            menu: MenuRepository::new(store.clone()),
            transactions: TransactionRepository::new(store.clone()),
            users: UserRepository::new(store.clone()),
            store,
        }
    }

    /// A venue that forgets everything when dropped.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Dining tables.
    #[must_use]
    pub fn tables(&self) -> &TableRepository {
        &self.tables
    }

    /// Menu items.
    #[must_use]
    pub fn menu(&self) -> &MenuRepository {
        &self.menu
    }

    /// Orders.
    #[must_use]
    pub fn transactions(&self) -> &TransactionRepository {
        &self.transactions
    }

    /// Accounts.
    #[must_use]
    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    /// Place an order against this venue's menu.
    ///
    /// # Errors
    ///
    /// See [`TransactionRepository::create`].
    pub async fn place_order(
        &self,
        order: NewOrder,
        now: DateTime<Utc>,
    ) -> Result<TransactionRecord> {
        self.transactions.create(order, &self.menu, now).await
    }

    /// Create the demo accounts and menu that `seed` asks for, where missing.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn seed(&self, seed: &SeedConfig, now: DateTime<Utc>) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        if seed.demo_users {
            report.users = self.users.ensure_seed_users(now).await?;
        }
        if seed.demo_menu {
            report.menu_items = self.menu.seed_demo().await?;
        }
        debug!(?report, "seed finished");
        Ok(report)
    }

    /// A backup service over this venue's store.
    #[must_use]
    pub fn backup(&self, settings: Settings) -> BackupService {
        BackupService::new(self.store.clone(), settings)
    }

    /// A SQL exporter over this venue's store.
    #[must_use]
    pub fn sql_exporter(&self) -> SqlExporter {
        SqlExporter::new(self.store.clone())
    }
}
