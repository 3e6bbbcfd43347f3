//! Entity types.
//!
//! Each entity is stored as a list under its own [`EntityKey`]; the JSON field
//! names match the ones written by earlier versions of the venue app so old
//! backups load unchanged.

pub mod menu;
pub mod table;
pub mod transaction;
pub mod user;

use serde::{de::DeserializeOwned, Serialize};

use crate::store::EntityKey;

pub use menu::{demo_menu, MenuCategory, MenuItem, MenuItemUpdate, NewMenuItem};
pub use table::{Reservation, Table, TableStatus};
pub use transaction::{
    compute_total, MenuItemRef, NewOrder, OrderKind, OrderLine, PaymentMethod, PaymentStatus,
    TransactionRecord,
};
pub use user::{hash_password, seed_users, AppUser, NewUser, Role, UserUpdate};

/// A record that lives in one entity collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The key the collection is stored under.
    const KEY: EntityKey;

    /// Human-readable entity name for error messages.
    const ENTITY: &'static str;

    /// The record's id.
    fn id(&self) -> &str;

    /// Check invariants before the record is written.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the record is inconsistent.
    fn check(&self) -> crate::Result<()> {
        Ok(())
    }
}

/// Generate a fresh record id.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Trim `value` and reject it if empty.
pub(crate) fn required_text(field: &str, value: &str) -> crate::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::Error::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}
