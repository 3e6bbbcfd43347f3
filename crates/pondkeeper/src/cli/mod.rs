//! Command-line interface for pondkeeper.
//!
//! This module provides the CLI structure for the `pondk` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    BackupCommand, CategoryArg, ConfigCommand, KindArg, LoginCommand, MenuCommand, MethodArg,
    OrderCommand, OutputFormat, ReportCommand, RoleArg, SqlCommand, StatusArg, StatusCommand,
    TableCommand, UserCommand,
};

/// pondk - Run the tables, menu and orders of a fishing-pond restaurant
///
/// Keeps everything in a local database and exports it as JSON backups or
/// PostgreSQL scripts.
#[derive(Debug, Parser)]
#[command(name = "pondk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show database location and record counts
    Status(StatusCommand),

    /// Manage dining tables
    #[command(subcommand)]
    Table(TableCommand),

    /// Manage the menu
    #[command(subcommand)]
    Menu(MenuCommand),

    /// Manage staff and owner accounts
    #[command(subcommand)]
    User(UserCommand),

    /// Check a username and password
    Login(LoginCommand),

    /// Place and settle orders
    #[command(subcommand)]
    Order(OrderCommand),

    /// Export or restore JSON backups
    #[command(subcommand)]
    Backup(BackupCommand),

    /// Export data as PostgreSQL
    #[command(subcommand)]
    Sql(SqlCommand),

    /// Sales reports
    #[command(subcommand)]
    Report(ReportCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
