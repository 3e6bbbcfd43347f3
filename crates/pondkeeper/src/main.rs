//! `pondk` - CLI for pondkeeper
//!
//! This binary runs the tables, menu, orders and accounts of the restaurant
//! from the command line, and exports the data as backups or PostgreSQL.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use serde_json::json;
use tracing::{debug, info};

use pondkeeper::cli::{
    BackupCommand, Cli, Command, ConfigCommand, MenuCommand, OrderCommand, OutputFormat,
    ReportCommand, SqlCommand, TableCommand, UserCommand,
};
use pondkeeper::model::{
    AppUser, MenuCategory, MenuItem, MenuItemUpdate, NewMenuItem, NewOrder, NewUser, PaymentStatus,
    Reservation, Table, TransactionRecord, UserUpdate,
};
use pondkeeper::report::{self, format_rupiah, Summary};
use pondkeeper::{init_logging, Config, SharedStore, SqliteStore, Venue};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Config commands work even when the database does not
    let command = match cli.command {
        Command::Config(config_cmd) => return handle_config(cli.config, config_cmd),
        command => command,
    };

    let config = Config::load_from(cli.config.clone())?;
    let sqlite = Arc::new(SqliteStore::new(config.database_path()));
    let store: SharedStore = sqlite.clone();
    let venue = Venue::new(store);

    let seeded = venue.seed(&config.seed, Utc::now()).await?;
    if seeded.users > 0 || seeded.menu_items > 0 {
        info!(
            users = seeded.users,
            menu_items = seeded.menu_items,
            "seeded demo data"
        );
    }

    match command {
        Command::Status(status_cmd) => handle_status(&venue, &sqlite, status_cmd.json).await,
        Command::Table(table_cmd) => handle_table(&venue, table_cmd).await,
        Command::Menu(menu_cmd) => handle_menu(&venue, menu_cmd).await,
        Command::User(user_cmd) => handle_user(&venue, user_cmd).await,
        Command::Login(login_cmd) => {
            let user = venue
                .users()
                .authenticate(&login_cmd.username, &login_cmd.password)
                .await?;
            println!("Logged in as {} ({})", user.name, user.role);
            Ok(())
        }
        Command::Order(order_cmd) => handle_order(&venue, order_cmd).await,
        Command::Backup(backup_cmd) => {
            handle_backup(&venue, config, cli.config.as_deref(), backup_cmd).await
        }
        Command::Sql(sql_cmd) => handle_sql(&venue, &config, sql_cmd).await,
        Command::Report(report_cmd) => handle_report(&venue, report_cmd).await,
        Command::Config(_) => unreachable!("handled before the store is opened"),
    }
}

/// Write `text` to `output`, or to stdout when no path is given.
fn write_output(output: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

async fn handle_status(venue: &Venue, sqlite: &SqliteStore, json: bool) -> anyhow::Result<()> {
    let stats = sqlite.stats().await?;
    let tables = venue.tables().list().await?.len();
    let menu_items = venue.menu().list().await?.len();
    let transactions = venue.transactions().list().await?;
    let pending = transactions
        .iter()
        .filter(|t| t.status == PaymentStatus::Pending)
        .count();
    let users = venue.users().list().await?.len();

    if json {
        let status = json!({
            "database_path": sqlite.path(),
            "db_size_bytes": stats.db_size_bytes,
            "keys": stats.keys,
            "tables": tables,
            "menu_items": menu_items,
            "transactions": transactions.len(),
            "pending": pending,
            "users": users,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("pondk status");
        println!("------------");
        println!("Database:      {}", sqlite.path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Tables:        {tables}");
        println!("Menu items:    {menu_items}");
        println!("Orders:        {} ({pending} pending)", transactions.len());
        println!("Users:         {users}");
    }
    Ok(())
}

fn print_tables(tables: &[Table]) {
    if tables.is_empty() {
        println!("No tables.");
        return;
    }
    for table in tables {
        let mut line = format!(
            "#{:<3} {:>2} seats  {:<9}",
            table.number,
            table.capacity,
            table.status.as_str()
        );
        if let Some(name) = &table.customer_name {
            line.push_str(&format!("  {name}"));
        }
        if let (Some(date), Some(time)) = (table.reservation_date, table.reservation_time) {
            line.push_str(&format!(
                "  {} {}",
                date.format("%Y-%m-%d"),
                time.format("%H:%M")
            ));
        }
        if let Some(people) = table.reservation_people {
            line.push_str(&format!(" ({people} people)"));
        }
        println!("{line}");
    }
}

async fn handle_table(venue: &Venue, cmd: TableCommand) -> anyhow::Result<()> {
    let tables = venue.tables();
    let changed = match cmd {
        TableCommand::List { format } => {
            let list = tables.list().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&list)?),
                OutputFormat::Plain => print_tables(&list),
            }
            return Ok(());
        }
        TableCommand::Add { number, capacity } => tables.create(number, capacity).await?,
        TableCommand::Capacity { number, capacity } => {
            tables.set_capacity(number, capacity).await?
        }
        TableCommand::Reserve {
            number,
            name,
            people,
            date,
            time,
        } => {
            tables
                .reserve(
                    number,
                    Reservation {
                        customer_name: name,
                        people,
                        date,
                        time,
                    },
                )
                .await?
        }
        TableCommand::Cancel { number } => tables.cancel_reservation(number).await?,
        TableCommand::Occupy { number, name } => {
            tables.occupy(number, &name, Utc::now()).await?
        }
        TableCommand::Finish { number } => tables.finish(number).await?,
        TableCommand::Remove { number } => {
            let removed = tables.remove(number).await?;
            println!("Removed table #{}", removed.number);
            return Ok(());
        }
    };
    print_tables(std::slice::from_ref(&changed));
    Ok(())
}

fn print_menu(items: &[MenuItem]) {
    if items.is_empty() {
        println!("No menu items.");
        return;
    }
    for item in items {
        println!(
            "{}  {:<8} {:<28} {:>12}{}",
            item.id,
            item.category.as_str(),
            item.name,
            format_rupiah(item.price),
            if item.active { "" } else { "  (inactive)" }
        );
    }
}

async fn handle_menu(venue: &Venue, cmd: MenuCommand) -> anyhow::Result<()> {
    let menu = venue.menu();
    match cmd {
        MenuCommand::List {
            all,
            category,
            format,
        } => {
            let mut items = if all {
                menu.list().await?
            } else {
                menu.active().await?
            };
            if let Some(category) = category {
                let category: MenuCategory = category.into();
                items.retain(|item| item.category == category);
            }
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
                OutputFormat::Plain => print_menu(&items),
            }
        }
        MenuCommand::Add {
            name,
            price,
            category,
            inactive,
        } => {
            let item = menu
                .create(NewMenuItem {
                    name,
                    price,
                    category: category.into(),
                    active: !inactive,
                })
                .await?;
            print_menu(std::slice::from_ref(&item));
        }
        MenuCommand::Update {
            id,
            name,
            price,
            category,
            active,
        } => {
            let item = menu
                .update(
                    &id,
                    MenuItemUpdate {
                        name,
                        price,
                        category: category.map(Into::into),
                        active,
                    },
                )
                .await?;
            print_menu(std::slice::from_ref(&item));
        }
        MenuCommand::Remove { id } => {
            let item = menu.remove(&id).await?;
            println!("Removed {}", item.name);
        }
        MenuCommand::Seed => {
            let added = menu.seed_demo().await?;
            if added == 0 {
                println!("Menu already has items; nothing added.");
            } else {
                println!("Added {added} menu items.");
            }
        }
    }
    Ok(())
}

/// Account fields safe to show; the password hash stays out of listings.
fn user_json(user: &AppUser) -> serde_json::Value {
    json!({
        "id": user.id,
        "name": user.name,
        "username": user.username,
        "role": user.role.as_str(),
        "createdAt": user.created_at,
    })
}

fn print_users(users: &[AppUser]) {
    if users.is_empty() {
        println!("No users.");
        return;
    }
    for user in users {
        println!(
            "{}  {:<16} {:<6} {}",
            user.id, user.username, user.role, user.name
        );
    }
}

async fn handle_user(venue: &Venue, cmd: UserCommand) -> anyhow::Result<()> {
    let users = venue.users();
    match cmd {
        UserCommand::List { format } => {
            let list = users.list().await?;
            match format {
                OutputFormat::Json => {
                    let values: Vec<_> = list.iter().map(user_json).collect();
                    println!("{}", serde_json::to_string_pretty(&values)?);
                }
                OutputFormat::Plain => print_users(&list),
            }
        }
        UserCommand::Add {
            name,
            username,
            password,
            role,
        } => {
            let user = users
                .create(
                    NewUser {
                        name,
                        username,
                        password,
                        role: role.into(),
                    },
                    Utc::now(),
                )
                .await?;
            print_users(std::slice::from_ref(&user));
        }
        UserCommand::Update {
            id,
            name,
            username,
            password,
            role,
        } => {
            let user = users
                .update(
                    &id,
                    UserUpdate {
                        name,
                        username,
                        password,
                        role: role.map(Into::into),
                    },
                )
                .await?;
            print_users(std::slice::from_ref(&user));
        }
        UserCommand::Remove { id } => {
            let user = users.remove(&id).await?;
            println!("Removed {}", user.username);
        }
        UserCommand::Seed => {
            let added = users.ensure_seed_users(Utc::now()).await?;
            println!("Created {added} accounts.");
        }
    }
    Ok(())
}

fn print_orders(records: &[TransactionRecord]) {
    if records.is_empty() {
        println!("No orders.");
        return;
    }
    for record in records {
        let place = record
            .table_number
            .map_or_else(|| "takeaway".to_string(), |n| format!("table #{n}"));
        let method = record
            .payment_method
            .map_or(String::new(), |m| format!(" via {m}"));
        let operator = record
            .operator_role
            .map_or(String::new(), |r| format!(" by {r}"));
        println!(
            "{}  {}  {:<10} {:<16} {:>12}  {}{}{}",
            record.id,
            record.timestamp.format("%Y-%m-%d %H:%M"),
            place,
            record.customer_name,
            format_rupiah(record.total_amount),
            record.status.as_str(),
            method,
            operator
        );
        for line in &record.items {
            println!("      {} x {}", line.quantity, line.menu_item.name);
        }
    }
}

async fn handle_order(venue: &Venue, cmd: OrderCommand) -> anyhow::Result<()> {
    let transactions = venue.transactions();
    let changed = match cmd {
        OrderCommand::List { status, format } => {
            let mut list = transactions.list().await?;
            if let Some(status) = status {
                let status: PaymentStatus = status.into();
                list.retain(|r| r.status == status);
            }
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&list)?),
                OutputFormat::Plain => print_orders(&list),
            }
            return Ok(());
        }
        OrderCommand::New {
            kind,
            table,
            customer,
            items,
            by,
        } => {
            let operator_role = match by {
                Some(username) => Some(
                    venue
                        .users()
                        .find_by_username(&username)
                        .await?
                        .with_context(|| format!("no account named {username}"))?
                        .role,
                ),
                None => None,
            };
            venue
                .place_order(
                    NewOrder {
                        kind: kind.into(),
                        table_number: table,
                        customer_name: customer,
                        items,
                        operator_role,
                    },
                    Utc::now(),
                )
                .await?
        }
        OrderCommand::Pay { id, method } => transactions.pay(&id, method.into()).await?,
        OrderCommand::Status { id, status } => transactions.set_status(&id, status.into()).await?,
        OrderCommand::Remove { id } => {
            let removed = transactions.remove(&id).await?;
            println!("Removed order {}", removed.id);
            return Ok(());
        }
    };
    print_orders(std::slice::from_ref(&changed));
    Ok(())
}

async fn handle_backup(
    venue: &Venue,
    mut config: Config,
    config_path: Option<&Path>,
    cmd: BackupCommand,
) -> anyhow::Result<()> {
    match cmd {
        BackupCommand::Export { output } => {
            let text = venue.backup(config.settings.clone()).export_json().await?;
            write_output(output.as_deref(), &text)?;
        }
        BackupCommand::Import {
            file,
            no_save_settings,
        } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let mut service = venue.backup(config.settings.clone());
            let summary = service.import_json(&text).await?;

            println!("Restored: {}", summary.restored.join(", "));
            if !summary.cleared.is_empty() {
                println!("Cleared:  {}", summary.cleared.join(", "));
            }

            if !no_save_settings && summary.settings != config.settings {
                config.settings = summary.settings;
                let path = config_path.map_or_else(Config::default_config_path, PathBuf::from);
                config.save_to(&path)?;
                println!("Saved settings to {}", path.display());
            }
        }
    }
    Ok(())
}

async fn handle_sql(venue: &Venue, config: &Config, cmd: SqlCommand) -> anyhow::Result<()> {
    let exporter = venue.sql_exporter();
    match cmd {
        SqlCommand::Schema => println!("{}", exporter.generate_create_table_sql()),
        SqlCommand::Inserts { params } => {
            if params {
                let statements: Vec<_> = exporter
                    .insert_statements()
                    .await?
                    .iter()
                    .map(|s| {
                        json!({
                            "sql": s.sql,
                            "params": s.params.iter().map(|p| p.literal()).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&statements)?);
            } else {
                println!("{}", exporter.generate_insert_sql().await?);
            }
        }
        SqlCommand::Export { no_schema, output } => {
            let include_schema = config.export.include_schema && !no_schema;
            let sql = exporter.export_sql(include_schema).await?;
            write_output(output.as_deref(), &sql)?;
        }
        SqlCommand::Psql { connection, output } => {
            let connection = connection.or_else(|| config.settings.neon_connection_string.clone());
            if connection.is_none() {
                debug!("no connection string configured; emitting bare SQL");
            }
            let script = exporter.export_psql_script(connection.as_deref()).await?;
            write_output(output.as_deref(), &script)?;
        }
    }
    Ok(())
}

async fn orders_for(
    venue: &Venue,
    date: Option<NaiveDate>,
) -> anyhow::Result<Vec<TransactionRecord>> {
    let all = venue.transactions().list().await?;
    Ok(match date {
        Some(date) => report::on_date(&all, date),
        None => all,
    })
}

async fn handle_report(venue: &Venue, cmd: ReportCommand) -> anyhow::Result<()> {
    match cmd {
        ReportCommand::Summary { date, json } => {
            let summary = Summary::from_transactions(&orders_for(venue, date).await?);
            if json {
                let by_method: serde_json::Map<_, _> = summary
                    .by_method
                    .iter()
                    .map(|(method, total)| (method.as_str().to_string(), json!(total)))
                    .collect();
                let value = json!({
                    "count": summary.count,
                    "paidCount": summary.paid_count,
                    "paidTotal": summary.paid_total,
                    "pendingCount": summary.pending_count,
                    "pendingTotal": summary.pending_total,
                    "byMethod": by_method,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                match date {
                    Some(date) => println!("Sales for {}", date.format("%Y-%m-%d")),
                    None => println!("Sales, all time"),
                }
                println!("----------------");
                println!("Orders:   {}", summary.count);
                println!(
                    "Paid:     {} ({})",
                    summary.paid_count,
                    format_rupiah(summary.paid_total)
                );
                println!(
                    "Pending:  {} ({})",
                    summary.pending_count,
                    format_rupiah(summary.pending_total)
                );
                for (method, total) in &summary.by_method {
                    println!("  {:<9} {}", method.as_str(), format_rupiah(*total));
                }
            }
        }
        ReportCommand::Csv { date, output } => {
            let csv = report::to_csv(&orders_for(venue, date).await?)?;
            write_output(output.as_deref(), &csv)?;
        }
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                let show = |value: Option<&str>| value.unwrap_or("(not set)").to_string();
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Settings]");
                for name in pondkeeper::Settings::NAMES {
                    println!("  {name:<24} {}", show(config.settings.get(name)));
                }
                println!();
                println!("[Export]");
                println!("  Include schema:     {}", config.export.include_schema);
                println!();
                println!("[Seed]");
                println!("  Demo users:         {}", config.seed.demo_users);
                println!("  Demo menu:          {}", config.seed.demo_menu);
            }
        }
        ConfigCommand::Path => {
            println!(
                "{}",
                config_path
                    .unwrap_or_else(Config::default_config_path)
                    .display()
            );
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
