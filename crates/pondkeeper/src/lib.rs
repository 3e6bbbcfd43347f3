//! `pondkeeper` - Local-first point-of-sale for a fishing-pond restaurant
//!
//! This library keeps dining tables, the menu, orders and staff accounts in a
//! local key-value store, and moves that data out again as JSON backups or
//! PostgreSQL scripts.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod report;
pub mod repo;
pub mod sql;
pub mod store;
pub mod venue;

pub use backup::{BackupPayload, BackupService, RestoreSummary};
pub use config::{Config, Settings};
pub use error::{Error, ErrorKind, Result};
pub use logging::init_logging;
pub use sql::SqlExporter;
pub use store::{EntityKey, KeyValueStore, MemoryStore, SharedStore, SqliteStore, StoreStats};
pub use venue::{SeedReport, Venue};
