//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Subcommand, ValueEnum};

use crate::model::{MenuCategory, OrderKind, PaymentMethod, PaymentStatus, Role};

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Dining table commands. Tables are addressed by number.
#[derive(Debug, Subcommand)]
pub enum TableCommand {
    /// List tables
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Add an empty table
    Add {
        /// Table number (defaults to the highest number + 1)
        #[arg(short, long)]
        number: Option<u32>,

        /// Number of seats
        #[arg(long, default_value = "4")]
        capacity: u32,
    },

    /// Change the number of seats
    Capacity {
        /// Table number
        number: u32,

        /// New number of seats
        capacity: u32,
    },

    /// Reserve a table
    Reserve {
        /// Table number
        number: u32,

        /// Name the reservation is under
        #[arg(long)]
        name: String,

        /// Party size
        #[arg(short, long)]
        people: u32,

        /// Day of the visit (dd/mm/yyyy or yyyy-mm-dd)
        #[arg(short, long, value_parser = parse_date)]
        date: NaiveDate,

        /// Arrival time (HH:MM)
        #[arg(short, long, value_parser = parse_time)]
        time: NaiveTime,
    },

    /// Cancel a reservation
    Cancel {
        /// Table number
        number: u32,
    },

    /// Seat guests at a table
    Occupy {
        /// Table number
        number: u32,

        /// Customer name
        #[arg(long)]
        name: String,
    },

    /// Free a table after the guests leave
    Finish {
        /// Table number
        number: u32,
    },

    /// Delete a table
    Remove {
        /// Table number
        number: u32,
    },
}

/// Menu commands.
#[derive(Debug, Subcommand)]
pub enum MenuCommand {
    /// List menu items
    List {
        /// Include inactive items
        #[arg(short, long)]
        all: bool,

        /// Only items of this category
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Add a menu item
    Add {
        /// Display name
        #[arg(long)]
        name: String,

        /// Price in rupiah
        #[arg(short, long)]
        price: u64,

        /// Menu section
        #[arg(long, value_enum)]
        category: CategoryArg,

        /// Add the item as not orderable
        #[arg(long)]
        inactive: bool,
    },

    /// Change a menu item
    Update {
        /// Item id
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New price
        #[arg(short, long)]
        price: Option<u64>,

        /// New category
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,

        /// Whether the item can be ordered
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a menu item
    Remove {
        /// Item id
        id: String,
    },

    /// Fill an empty menu with the starter items
    Seed,
}

/// User account commands.
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List accounts
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Add an account
    Add {
        /// Display name
        #[arg(long)]
        name: String,

        /// Login name
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short, long)]
        password: String,

        /// Access level
        #[arg(short, long, value_enum, default_value = "staff")]
        role: RoleArg,
    },

    /// Change an account
    Update {
        /// Account id
        id: String,

        /// New display name
        #[arg(long)]
        name: Option<String>,

        /// New login name
        #[arg(short, long)]
        username: Option<String>,

        /// New password
        #[arg(short, long)]
        password: Option<String>,

        /// New access level
        #[arg(short, long, value_enum)]
        role: Option<RoleArg>,
    },

    /// Delete an account
    Remove {
        /// Account id
        id: String,
    },

    /// Create the default owner and staff accounts if there are no users
    Seed,
}

/// Login command arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Login name (case-insensitive)
    pub username: String,

    /// Password
    #[arg(short, long)]
    pub password: String,
}

/// Order commands.
#[derive(Debug, Subcommand)]
pub enum OrderCommand {
    /// List orders, newest first
    List {
        /// Only orders with this payment status
        #[arg(short, long, value_enum)]
        status: Option<StatusArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Place an order
    New {
        /// Dine-in or takeaway
        #[arg(short, long, value_enum, default_value = "dine-in")]
        kind: KindArg,

        /// Table number (dine-in only)
        #[arg(short, long)]
        table: Option<u32>,

        /// Customer name
        #[arg(long)]
        customer: String,

        /// Menu item as ID or ID:QTY; repeat for more items
        #[arg(short, long = "item", value_parser = parse_item, required = true)]
        items: Vec<(String, u32)>,

        /// Username of the account taking the order; its role is recorded
        #[arg(long, value_name = "USERNAME")]
        by: Option<String>,
    },

    /// Mark an order paid
    Pay {
        /// Order id
        id: String,

        /// Payment method
        #[arg(short, long, value_enum)]
        method: MethodArg,
    },

    /// Set the payment status of an order
    Status {
        /// Order id
        id: String,

        /// New status
        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Delete an order
    Remove {
        /// Order id
        id: String,
    },
}

/// Backup commands.
#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    /// Write a JSON backup of all data and settings
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Restore a JSON backup, overwriting the collections it contains
    Import {
        /// Backup file
        file: PathBuf,

        /// Do not write restored settings back to the configuration file
        #[arg(long)]
        no_save_settings: bool,
    },
}

/// SQL export commands.
#[derive(Debug, Subcommand)]
pub enum SqlCommand {
    /// Print the PostgreSQL schema
    Schema,

    /// Print the data as insert statements
    Inserts {
        /// Print parameterized statements and their values as JSON
        #[arg(long)]
        params: bool,
    },

    /// Print a complete transactional script
    Export {
        /// Leave out the schema
        #[arg(long)]
        no_schema: bool,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a shell script that pipes the export into psql
    Psql {
        /// Connection string (defaults to the configured Neon connection)
        #[arg(long)]
        connection: Option<String>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Report commands.
#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Show paid and pending totals
    Summary {
        /// Only orders placed on this day (yyyy-mm-dd, UTC)
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Write orders as CSV
    Csv {
        /// Only orders placed on this day (yyyy-mm-dd, UTC)
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Menu category argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    /// Dishes
    Food,
    /// Drinks
    Drink,
    /// Fishing packages
    Package,
}

impl From<CategoryArg> for MenuCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Food => Self::Food,
            CategoryArg::Drink => Self::Drink,
            CategoryArg::Package => Self::Package,
        }
    }
}

/// Role argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// Full access
    Owner,
    /// Floor staff
    Staff,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Owner => Self::Owner,
            RoleArg::Staff => Self::Staff,
        }
    }
}

/// Order kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Served at a table
    DineIn,
    /// Packed to go
    Takeaway,
}

impl From<KindArg> for OrderKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::DineIn => Self::DineIn,
            KindArg::Takeaway => Self::Takeaway,
        }
    }
}

/// Payment method argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    /// Cash
    Cash,
    /// QRIS scan
    Qris,
    /// Bank transfer
    Transfer,
}

impl From<MethodArg> for PaymentMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Cash => Self::Cash,
            MethodArg::Qris => Self::Qris,
            MethodArg::Transfer => Self::Transfer,
        }
    }
}

/// Payment status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Not paid yet
    Pending,
    /// Settled
    Paid,
}

impl From<StatusArg> for PaymentStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => Self::Pending,
            StatusArg::Paid => Self::Paid,
        }
    }
}

/// Output format for list commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .map_err(|_| format!("invalid date {s:?}, expected yyyy-mm-dd or dd/mm/yyyy"))
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| format!("invalid time {s:?}, expected HH:MM"))
}

fn parse_item(s: &str) -> Result<(String, u32), String> {
    match s.rsplit_once(':') {
        Some((id, qty)) => {
            let qty = qty
                .parse::<u32>()
                .map_err(|_| format!("invalid quantity in {s:?}"))?;
            if id.is_empty() {
                return Err(format!("missing item id in {s:?}"));
            }
            Ok((id.to_string(), qty))
        }
        None if s.is_empty() => Err("missing item id".to_string()),
        None => Ok((s.to_string(), 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_conversions() {
        assert_eq!(MenuCategory::from(CategoryArg::Package), MenuCategory::Package);
        assert_eq!(Role::from(RoleArg::Owner), Role::Owner);
        assert_eq!(OrderKind::from(KindArg::DineIn), OrderKind::DineIn);
        assert_eq!(PaymentMethod::from(MethodArg::Qris), PaymentMethod::Qris);
        assert_eq!(PaymentStatus::from(StatusArg::Paid), PaymentStatus::Paid);
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        assert_eq!(parse_date("2026-03-14").unwrap(), expected);
        assert_eq!(parse_date("14/03/2026").unwrap(), expected);
        assert!(parse_date("tomorrow").is_err());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(
            parse_time("19:30").unwrap(),
            NaiveTime::from_hms_opt(19, 30, 0).unwrap()
        );
        assert!(parse_time("7pm").is_err());
    }

    #[test]
    fn test_parse_item() {
        assert_eq!(parse_item("abc").unwrap(), ("abc".to_string(), 1));
        assert_eq!(parse_item("abc:3").unwrap(), ("abc".to_string(), 3));
        assert!(parse_item("abc:x").is_err());
        assert!(parse_item(":2").is_err());
        assert!(parse_item("").is_err());
    }

    #[test]
    fn test_status_command_debug() {
        let cmd = StatusCommand { json: true };
        assert!(format!("{cmd:?}").contains("json"));
    }
}
