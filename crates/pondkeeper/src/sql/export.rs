//! Export of the local collections as PostgreSQL statements.

use tracing::info;
use uuid::Uuid;

use super::{schema::SCHEMA, SqlValue, Statement};
use crate::error::Result;
use crate::model::{MenuItem, Table, TransactionRecord};
use crate::repo::{MenuRepository, TableRepository, TransactionRepository};
use crate::store::SharedStore;

const TABLE_COLUMNS: [&str; 9] = [
    "id",
    "number",
    "capacity",
    "status",
    "customer_name",
    "occupied_since",
    "reservation_date",
    "reservation_time",
    "reservation_people",
];

const MENU_COLUMNS: [&str; 5] = ["id", "name", "price", "category", "is_active"];

const TRANSACTION_COLUMNS: [&str; 8] = [
    "id",
    "kind",
    "table_number",
    "customer_name",
    "total_amount",
    "status",
    "payment_method",
    "created_at",
];

const ITEM_COLUMNS: [&str; 7] = [
    "id",
    "transaction_id",
    "menu_item_id",
    "name",
    "unit_price",
    "quantity",
    "total_price",
];

/// Stable UUID for a record id.
///
/// UUID ids are used as they are. Older ids (timestamps, small integers) are
/// mapped to a name-based UUID derived from the entity and the id, so the same
/// record always exports under the same key.
#[must_use]
pub fn record_uuid(entity: &str, id: &str) -> Uuid {
    Uuid::parse_str(id).unwrap_or_else(|_| {
        Uuid::new_v5(
            &Uuid::NAMESPACE_URL,
            format!("pondkeeper:{entity}:{id}").as_bytes(),
        )
    })
}

/// Upsert for one dining table, keyed by table number.
#[must_use]
pub fn table_statement(table: &Table) -> Statement {
    Statement::insert(
        "dining_tables",
        &TABLE_COLUMNS,
        vec![
            record_uuid("table", &table.id).into(),
            table.number.into(),
            table.capacity.into(),
            table.status.as_str().into(),
            table.customer_name.clone().into(),
            table.occupied_since.into(),
            table.reservation_date.into(),
            table.reservation_time.into(),
            table.reservation_people.into(),
        ],
    )
    .on_conflict_update("number", &TABLE_COLUMNS[2..])
}

/// Insert for one menu item.
///
/// # Errors
///
/// Returns a validation error if the price does not fit in a `bigint`.
pub fn menu_statement(item: &MenuItem) -> Result<Statement> {
    Ok(Statement::insert(
        "menu_items",
        &MENU_COLUMNS,
        vec![
            record_uuid("menu_item", &item.id).into(),
            item.name.as_str().into(),
            SqlValue::int(item.price)?,
            item.category.as_str().into(),
            item.active.into(),
        ],
    ))
}

/// Insert for one order followed by one insert per line.
///
/// # Errors
///
/// Returns a validation error if an amount does not fit in a `bigint`.
pub fn transaction_statements(record: &TransactionRecord) -> Result<Vec<Statement>> {
    let transaction_id = record_uuid("transaction", &record.id);
    let mut statements = Vec::with_capacity(record.items.len() + 1);

    statements.push(Statement::insert(
        "transactions",
        &TRANSACTION_COLUMNS,
        vec![
            transaction_id.into(),
            record.kind.as_str().into(),
            record.table_number.into(),
            record.customer_name.as_str().into(),
            SqlValue::int(record.total_amount)?,
            record.status.as_str().into(),
            record.payment_method.map(|m| m.as_str()).into(),
            record.timestamp.into(),
        ],
    ));

    for (index, line) in record.items.iter().enumerate() {
        let line_id = Uuid::new_v5(
            &transaction_id,
            format!("line:{index}:{}", line.menu_item.id).as_bytes(),
        );
        statements.push(Statement::insert(
            "transaction_items",
            &ITEM_COLUMNS,
            vec![
                line_id.into(),
                transaction_id.into(),
                record_uuid("menu_item", &line.menu_item.id).into(),
                line.menu_item.name.as_str().into(),
                SqlValue::int(line.menu_item.price)?,
                line.quantity.into(),
                SqlValue::int(line.subtotal()?)?,
            ],
        ));
    }
    Ok(statements)
}

/// Wrap `sql` in a shell here-document piped to `psql`.
///
/// Without a connection string the SQL is returned unchanged. The
/// here-document delimiter is quoted, so the shell expands nothing inside it,
/// and it is chosen so that no line of `sql` ends the document early.
#[must_use]
pub fn psql_script(sql: &str, connection: Option<&str>) -> String {
    let Some(connection) = connection.filter(|c| !c.trim().is_empty()) else {
        return sql.to_string();
    };

    let mut delimiter = "SQL".to_string();
    let mut suffix = 0_u32;
    while sql.lines().any(|line| line == delimiter) {
        suffix += 1;
        delimiter = format!("SQL_{suffix}");
    }

    let quoted = connection.replace('\'', r"'\''");
    format!("cat <<'{delimiter}' | psql '{quoted}'\n{sql}\n{delimiter}")
}

/// Reads the live collections and renders them as SQL.
#[derive(Debug)]
pub struct SqlExporter {
    tables: TableRepository,
    menu: MenuRepository,
    transactions: TransactionRepository,
}

impl SqlExporter {
    /// Create an exporter over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            tables: TableRepository::new(store.clone()),
            menu: MenuRepository::new(store.clone()),
            transactions: TransactionRepository::new(store),
        }
    }

    /// The schema script. Identical on every call.
    #[must_use]
    pub fn generate_create_table_sql(&self) -> &'static str {
        SCHEMA
    }

    /// One parameterized statement per table, menu item, order and order
    /// line, in that order.
    ///
    /// # Errors
    ///
    /// Returns a storage, decoding or range error.
    pub async fn insert_statements(&self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        for table in self.tables.load().await? {
            statements.push(table_statement(&table));
        }
        for item in self.menu.load().await? {
            statements.push(menu_statement(&item)?);
        }
        for record in self.transactions.load().await? {
            statements.extend(transaction_statements(&record)?);
        }
        Ok(statements)
    }

    /// The data statements rendered as text, one per line.
    ///
    /// # Errors
    ///
    /// Returns a storage, decoding or range error.
    pub async fn generate_insert_sql(&self) -> Result<String> {
        let rendered = self
            .insert_statements()
            .await?
            .iter()
            .map(Statement::render)
            .collect::<Result<Vec<_>>>()?;
        Ok(rendered.join("\n"))
    }

    /// A complete script: `begin;`, optionally the schema, the data, `commit;`.
    ///
    /// # Errors
    ///
    /// Returns a storage, decoding or range error.
    pub async fn export_sql(&self, include_schema: bool) -> Result<String> {
        let statements = self.insert_statements().await?;

        let mut lines = Vec::with_capacity(statements.len() + 3);
        lines.push("begin;".to_string());
        if include_schema {
            lines.push(SCHEMA.to_string());
        }
        for statement in &statements {
            lines.push(statement.render()?);
        }
        lines.push("commit;".to_string());

        info!(statements = statements.len(), include_schema, "sql exported");
        Ok(lines.join("\n"))
    }

    /// The full script with schema, piped to `psql` when a connection string
    /// is given.
    ///
    /// # Errors
    ///
    /// Returns a storage, decoding or range error.
    pub async fn export_psql_script(&self, connection: Option<&str>) -> Result<String> {
        let sql = self.export_sql(true).await?;
        Ok(psql_script(&sql, connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MenuItemRef, OrderKind, OrderLine, PaymentMethod};
    use crate::store::MemoryStore;
    use chrono::Utc;
    use std::sync::Arc;

    fn exporter() -> (SharedStore, SqlExporter) {
        let store: SharedStore = Arc::new(MemoryStore::new());
        (store.clone(), SqlExporter::new(store))
    }

    #[test]
    fn test_record_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(record_uuid("table", &id.to_string()), id);

        let legacy = record_uuid("table", "1712345678901");
        assert_eq!(legacy, record_uuid("table", "1712345678901"));
        assert_ne!(legacy, record_uuid("menu_item", "1712345678901"));
    }

    #[test]
    fn test_schema_stable() {
        let (_, exporter) = exporter();
        assert_eq!(
            exporter.generate_create_table_sql(),
            exporter.generate_create_table_sql()
        );
    }

    #[tokio::test]
    async fn test_two_tables_two_upserts() {
        let (store, exporter) = exporter();
        let tables = TableRepository::new(store);
        tables.create(Some(1), 4).await.unwrap();
        tables.create(Some(2), 2).await.unwrap();

        let sql = exporter.export_sql(false).await.unwrap();
        let upserts: Vec<&str> = sql
            .lines()
            .filter(|l| l.starts_with("insert into dining_tables"))
            .collect();
        assert_eq!(upserts.len(), 2);
        assert!(upserts
            .iter()
            .all(|l| l.contains("on conflict (number) do update")));
        assert!(sql.starts_with("begin;\n"));
        assert!(sql.ends_with("\ncommit;"));
        assert!(!sql.contains("create table"));
    }

    #[tokio::test]
    async fn test_customer_name_is_quoted() {
        let (store, exporter) = exporter();
        let tables = TableRepository::new(store);
        tables.create(Some(3), 4).await.unwrap();
        tables.occupy(3, "O'Brien's", Utc::now()).await.unwrap();

        let sql = exporter.generate_insert_sql().await.unwrap();
        assert!(sql.contains("'O''Brien''s'"));
        assert!(sql.contains("'occupied'"));
    }

    #[test]
    fn test_empty_table_nulls() {
        let table = Table::new(1, 4).unwrap();
        let sql = table_statement(&table).render().unwrap();
        assert!(sql.contains(", 1, 4, 'empty', NULL, NULL, NULL, NULL, NULL)"));
    }

    #[test]
    fn test_transaction_with_lines() {
        let record = TransactionRecord::new(
            OrderKind::DineIn,
            Some(3),
            "Budi",
            vec![OrderLine {
                menu_item: MenuItemRef {
                    id: "2".to_string(),
                    name: "Ayam Bakar".to_string(),
                    price: 35_000,
                },
                quantity: 2,
            }],
            Utc::now(),
        )
        .unwrap();

        let statements = transaction_statements(&record).unwrap();
        assert_eq!(statements.len(), 2);
        let header = statements[0].render().unwrap();
        assert!(header.starts_with("insert into transactions"));
        assert!(header.contains("'dine_in', 3, 'Budi', 70000, 'pending', NULL"));

        let line = statements[1].render().unwrap();
        let tx_id = record_uuid("transaction", &record.id).to_string();
        assert!(line.contains(&tx_id));
        assert!(line.contains("'Ayam Bakar', 35000, 2, 70000);"));
    }

    #[test]
    fn test_paid_method_rendered() {
        let mut record = TransactionRecord::new(
            OrderKind::Takeaway,
            None,
            "Rina",
            vec![OrderLine {
                menu_item: MenuItemRef {
                    id: "5".to_string(),
                    name: "Es Teh Manis".to_string(),
                    price: 8_000,
                },
                quantity: 1,
            }],
            Utc::now(),
        )
        .unwrap();
        record.payment_method = Some(PaymentMethod::Cash);
        let header = transaction_statements(&record).unwrap()[0].render().unwrap();
        assert!(header.contains("'takeaway', NULL, 'Rina', 8000, 'pending', 'cash'"));
    }

    #[test]
    fn test_psql_script() {
        let sql = "begin;\ncommit;";
        assert_eq!(psql_script(sql, None), sql);
        assert_eq!(psql_script(sql, Some("  ")), sql);
        assert_eq!(
            psql_script(sql, Some("postgres://u:p@h/db")),
            "cat <<'SQL' | psql 'postgres://u:p@h/db'\nbegin;\ncommit;\nSQL"
        );
    }

    #[test]
    fn test_psql_script_quotes_connection() {
        let script = psql_script("select 1;", Some("postgres://u:it's@h/db"));
        assert!(script.contains(r"psql 'postgres://u:it'\''s@h/db'"));
    }

    #[test]
    fn test_psql_script_avoids_delimiter_collision() {
        let sql = "begin;\nSQL\nSQL_1\ncommit;";
        let script = psql_script(sql, Some("postgres://h/db"));
        assert!(script.starts_with("cat <<'SQL_2' |"));
        assert!(script.ends_with("\nSQL_2"));
    }

    #[tokio::test]
    async fn test_psql_script_includes_schema() {
        let (_, exporter) = exporter();
        let script = exporter
            .export_psql_script(Some("postgres://h/db"))
            .await
            .unwrap();
        assert!(script.contains("create table if not exists dining_tables"));
    }
}
