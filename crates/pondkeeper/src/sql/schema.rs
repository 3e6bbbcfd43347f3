//! PostgreSQL schema for the exported data.

/// Schema for the five exported tables.
///
/// Ids are UUIDs; enumerated columns are constrained to the values the app
/// writes. `transaction_items.menu_item_id` is not a foreign key because
/// orders outlive the menu items they reference.
pub const SCHEMA: &str = r"-- pondkeeper schema

create extension if not exists pgcrypto;

create table if not exists users (
  id uuid primary key default gen_random_uuid(),
  name varchar(100) not null,
  username varchar(50) unique not null,
  password_hash char(64) not null,
  role varchar(10) not null default 'staff' check (role in ('owner', 'staff')),
  created_at timestamptz not null default now()
);

create table if not exists dining_tables (
  id uuid primary key default gen_random_uuid(),
  number integer unique not null check (number > 0),
  capacity integer not null default 4 check (capacity > 0),
  status varchar(10) not null default 'empty' check (status in ('empty', 'occupied', 'reserved')),
  customer_name varchar(100),
  occupied_since timestamptz,
  reservation_date date,
  reservation_time time,
  reservation_people integer check (reservation_people > 0),
  check (status = 'empty' or customer_name is not null)
);

create table if not exists menu_items (
  id uuid primary key default gen_random_uuid(),
  name varchar(100) not null,
  price bigint not null check (price >= 0),
  category varchar(10) not null check (category in ('food', 'drink', 'package')),
  is_active boolean not null default true
);

create table if not exists transactions (
  id uuid primary key default gen_random_uuid(),
  kind varchar(10) not null check (kind in ('dine_in', 'takeaway')),
  table_number integer check (table_number > 0),
  customer_name varchar(100) not null,
  total_amount bigint not null check (total_amount >= 0),
  status varchar(10) not null default 'pending' check (status in ('pending', 'paid')),
  payment_method varchar(10) check (payment_method in ('cash', 'qris', 'transfer')),
  created_at timestamptz not null default now(),
  check ((kind = 'dine_in') = (table_number is not null))
);

create table if not exists transaction_items (
  id uuid primary key default gen_random_uuid(),
  transaction_id uuid not null references transactions(id) on delete cascade,
  menu_item_id uuid not null,
  name varchar(100) not null,
  unit_price bigint not null check (unit_price >= 0),
  quantity integer not null check (quantity > 0),
  total_price bigint not null check (total_price >= 0)
);

create index if not exists idx_dining_tables_status on dining_tables(status);
create index if not exists idx_menu_items_category on menu_items(category);
create index if not exists idx_transactions_status on transactions(status);
create index if not exists idx_transactions_table_number on transactions(table_number);
create index if not exists idx_transaction_items_transaction_id on transaction_items(transaction_id);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_tables() {
        for table in [
            "users",
            "dining_tables",
            "menu_items",
            "transactions",
            "transaction_items",
        ] {
            assert!(
                SCHEMA.contains(&format!("create table if not exists {table} (")),
                "{table}"
            );
        }
        assert_eq!(SCHEMA.matches("create index").count(), 5);
    }

    #[test]
    fn test_schema_statements_end_with_semicolon() {
        let statements = SCHEMA
            .lines()
            .filter(|l| l.starts_with("create "))
            .count();
        assert_eq!(statements, 11);
        assert_eq!(SCHEMA.matches(");\n").count() + SCHEMA.matches("pgcrypto;").count(), 11);
    }
}
