//! SQL generation for moving local data into PostgreSQL.
//!
//! Statements are built with `$n` placeholders and a list of typed
//! [`SqlValue`]s. A text dump is produced by [`Statement::render`], which is
//! the only place values are turned into SQL literals.

pub mod export;
pub mod schema;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};

pub use export::{psql_script, record_uuid, SqlExporter};
pub use schema::SCHEMA;

/// A typed statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// `NULL`.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Quoted string.
    Text(String),
    /// Quoted UUID.
    Uuid(Uuid),
    /// Quoted `YYYY-MM-DD`.
    Date(NaiveDate),
    /// Quoted `HH:MM:SS`.
    Time(NaiveTime),
    /// Quoted RFC 3339 timestamp.
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Integer parameter from an unsigned amount.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the value does not fit in a `bigint`.
    pub fn int(value: u64) -> Result<Self> {
        i64::try_from(value)
            .map(Self::Int)
            .map_err(|_| Error::validation(format!("{value} does not fit in a bigint")))
    }

    /// The value as a SQL literal.
    #[must_use]
    pub fn literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Text(s) => quote_text(s),
            Self::Uuid(u) => quote_text(&u.to_string()),
            Self::Date(d) => quote_text(&d.format("%Y-%m-%d").to_string()),
            Self::Time(t) => quote_text(&t.format("%H:%M:%S").to_string()),
            Self::Timestamp(ts) => quote_text(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u32> for SqlValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Uuid> for SqlValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveTime> for SqlValue {
    fn from(value: NaiveTime) -> Self {
        Self::Time(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Quote `text` as a SQL string literal, doubling embedded single quotes.
#[must_use]
pub fn quote_text(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// A statement with `$1..$n` placeholders and their values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// SQL text with placeholders.
    pub sql: String,
    /// Values for `$1..$n`, in order.
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// `insert into <table> (<columns>) values ($1, ..., $n)`.
    #[must_use]
    pub fn insert(table: &str, columns: &[&str], params: Vec<SqlValue>) -> Self {
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
        Self {
            sql: format!(
                "insert into {table} ({}) values ({})",
                columns.join(", "),
                placeholders.join(", ")
            ),
            params,
        }
    }

    /// Append `on conflict (<key>) do update set c = excluded.c, ...`.
    #[must_use]
    pub fn on_conflict_update(mut self, key: &str, columns: &[&str]) -> Self {
        let sets: Vec<String> = columns
            .iter()
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        self.sql = format!(
            "{} on conflict ({key}) do update set {}",
            self.sql,
            sets.join(", ")
        );
        self
    }

    /// Inline every parameter as a literal and terminate with `;`.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a placeholder has no matching parameter.
    pub fn render(&self) -> Result<String> {
        let mut out = String::with_capacity(self.sql.len() + 16 * self.params.len());
        let mut chars = self.sql.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' || !chars.peek().is_some_and(char::is_ascii_digit) {
                out.push(c);
                continue;
            }
            let mut index = 0_usize;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                index = index * 10 + d as usize;
                chars.next();
            }
            let value = index
                .checked_sub(1)
                .and_then(|i| self.params.get(i))
                .ok_or_else(|| {
                    Error::internal(format!("no parameter for ${index} in: {}", self.sql))
                })?;
            out.push_str(&value.literal());
        }

        out.push(';');
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_text_doubles_quotes() {
        assert_eq!(quote_text("O'Brien's"), "'O''Brien''s'");
        assert_eq!(SqlValue::from("O'Brien's").literal(), "'O''Brien''s'");
    }

    #[test]
    fn test_literals() {
        assert_eq!(SqlValue::Null.literal(), "NULL");
        assert_eq!(SqlValue::from(None::<String>).literal(), "NULL");
        assert_eq!(SqlValue::from(true).literal(), "true");
        assert_eq!(SqlValue::from(7_u32).literal(), "7");
        assert_eq!(
            SqlValue::from(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()).literal(),
            "'2026-03-14'"
        );
        assert_eq!(
            SqlValue::from(NaiveTime::from_hms_opt(19, 30, 0).unwrap()).literal(),
            "'19:30:00'"
        );
    }

    #[test]
    fn test_int_range() {
        assert_eq!(SqlValue::int(25_000).unwrap(), SqlValue::Int(25_000));
        assert!(SqlValue::int(u64::MAX).is_err());
    }

    #[test]
    fn test_insert_and_render() {
        let stmt = Statement::insert(
            "menu_items",
            &["name", "price", "is_active"],
            vec!["Kopi 'Tubruk'".into(), SqlValue::Int(12_000), true.into()],
        );
        assert_eq!(
            stmt.sql,
            "insert into menu_items (name, price, is_active) values ($1, $2, $3)"
        );
        assert_eq!(
            stmt.render().unwrap(),
            "insert into menu_items (name, price, is_active) values ('Kopi ''Tubruk''', 12000, true);"
        );
    }

    #[test]
    fn test_rendered_value_is_not_reparsed() {
        let stmt = Statement::insert("t", &["a", "b"], vec!["$2".into(), "x".into()]);
        assert_eq!(stmt.render().unwrap(), "insert into t (a, b) values ('$2', 'x');");
    }

    #[test]
    fn test_on_conflict_update() {
        let stmt = Statement::insert(
            "dining_tables",
            &["number", "capacity"],
            vec![1_u32.into(), 4_u32.into()],
        )
        .on_conflict_update("number", &["capacity"]);
        assert!(stmt
            .sql
            .ends_with("on conflict (number) do update set capacity = excluded.capacity"));
    }

    #[test]
    fn test_render_missing_parameter() {
        let stmt = Statement {
            sql: "select $1, $2".to_string(),
            params: vec![SqlValue::Int(1)],
        };
        assert!(stmt.render().is_err());
    }

    #[test]
    fn test_ten_or_more_placeholders() {
        let columns: Vec<String> = (0..11).map(|i| format!("c{i}")).collect();
        let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
        let params = (0..11_u32).map(SqlValue::from).collect();
        let rendered = Statement::insert("t", &columns, params).render().unwrap();
        assert!(rendered.ends_with("values (0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10);"));
    }
}
