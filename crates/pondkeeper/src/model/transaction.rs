//! Orders and their payment state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, required_text, Record, Role};
use crate::error::{Error, Result};
use crate::store::EntityKey;

/// Where the order is eaten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Served at a table.
    DineIn,
    /// Packed to go.
    Takeaway,
}

impl OrderKind {
    /// The stored string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DineIn => "dine_in",
            Self::Takeaway => "takeaway",
        }
    }
}

/// Whether the bill is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Not paid yet.
    #[default]
    Pending,
    /// Settled.
    Paid,
}

impl PaymentStatus {
    /// The stored string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            other => Err(Error::validation(format!("unknown payment status: {other}"))),
        }
    }
}

/// How the bill was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash at the counter.
    Cash,
    /// QRIS code scan.
    Qris,
    /// Bank transfer.
    Transfer,
}

impl PaymentMethod {
    /// The stored string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Qris => "qris",
            Self::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "qris" => Ok(Self::Qris),
            "transfer" => Ok(Self::Transfer),
            other => Err(Error::validation(format!("unknown payment method: {other}"))),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a menu item at the time it was ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemRef {
    /// Menu item id.
    pub id: String,
    /// Name when ordered.
    pub name: String,
    /// Unit price when ordered.
    pub price: u64,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// What was ordered.
    pub menu_item: MenuItemRef,
    /// How many.
    pub quantity: u32,
}

impl OrderLine {
    /// Price times quantity.
    ///
    /// # Errors
    ///
    /// Returns a validation error on overflow.
    pub fn subtotal(&self) -> Result<u64> {
        self.menu_item
            .price
            .checked_mul(u64::from(self.quantity))
            .ok_or_else(|| Error::validation(format!("subtotal overflow for {}", self.menu_item.name)))
    }
}

/// Sum of all line subtotals.
///
/// # Errors
///
/// Returns a validation error on overflow.
pub fn compute_total(lines: &[OrderLine]) -> Result<u64> {
    lines.iter().try_fold(0_u64, |acc, line| {
        acc.checked_add(line.subtotal()?)
            .ok_or_else(|| Error::validation("order total overflow"))
    })
}

/// A recorded order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Record id.
    pub id: String,
    /// Dine-in or takeaway.
    pub kind: OrderKind,
    /// Table number for dine-in orders. Soft reference by number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<u32>,
    /// Who ordered.
    pub customer_name: String,
    /// Ordered lines, in the order they were added.
    pub items: Vec<OrderLine>,
    /// Sum of line subtotals.
    pub total_amount: u64,
    /// When the order was placed.
    pub timestamp: DateTime<Utc>,
    /// Payment state.
    pub status: PaymentStatus,
    /// Payment method, once chosen.
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// Role of the account that took the order, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_role: Option<Role>,
}

impl Record for TransactionRecord {
    const KEY: EntityKey = EntityKey::Transactions;
    const ENTITY: &'static str = "transaction";

    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self) -> Result<()> {
        self.validate()
    }
}

/// An order to be placed. Items are `(menu item id, quantity)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// Dine-in or takeaway.
    pub kind: OrderKind,
    /// Required for dine-in.
    pub table_number: Option<u32>,
    /// Who ordered.
    pub customer_name: String,
    /// Menu item ids and quantities.
    pub items: Vec<(String, u32)>,
    /// Role of the account taking the order.
    pub operator_role: Option<Role>,
}

impl TransactionRecord {
    /// Build a pending order with a fresh id and a computed total.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the order is inconsistent.
    pub fn new(
        kind: OrderKind,
        table_number: Option<u32>,
        customer_name: &str,
        items: Vec<OrderLine>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut record = Self {
            id: new_id(),
            kind,
            table_number,
            customer_name: required_text("customer name", customer_name)?,
            items,
            total_amount: 0,
            timestamp: now,
            status: PaymentStatus::Pending,
            payment_method: None,
            operator_role: None,
        };
        record.recompute_total()?;
        record.validate()?;
        Ok(record)
    }

    /// Replace `total_amount` with the sum of the lines.
    ///
    /// # Errors
    ///
    /// Returns a validation error on overflow.
    pub fn recompute_total(&mut self) -> Result<()> {
        self.total_amount = compute_total(&self.items)?;
        Ok(())
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Check the record invariants.
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first broken invariant.
    pub fn validate(&self) -> Result<()> {
        if self.customer_name.trim().is_empty() {
            return Err(Error::validation("customer name is required"));
        }
        if self.items.is_empty() {
            return Err(Error::validation("an order needs at least one item"));
        }
        if let Some(line) = self.items.iter().find(|l| l.quantity == 0) {
            return Err(Error::validation(format!(
                "quantity for {} must be positive",
                line.menu_item.name
            )));
        }
        match (self.kind, self.table_number) {
            (OrderKind::DineIn, None) => {
                return Err(Error::validation("dine-in orders need a table number"));
            }
            (OrderKind::DineIn, Some(0)) => {
                return Err(Error::validation("table number must be a positive number"));
            }
            (OrderKind::Takeaway, Some(_)) => {
                return Err(Error::validation("takeaway orders have no table"));
            }
            _ => {}
        }
        if self.total_amount != compute_total(&self.items)? {
            return Err(Error::validation("total amount does not match the items"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, price: u64, quantity: u32) -> OrderLine {
        OrderLine {
            menu_item: MenuItemRef {
                id: name.to_lowercase(),
                name: name.to_string(),
                price,
            },
            quantity,
        }
    }

    #[test]
    fn test_compute_total() {
        let lines = vec![line("Ayam Bakar", 35_000, 2), line("Es Jeruk", 10_000, 3)];
        assert_eq!(compute_total(&lines).unwrap(), 100_000);
        assert_eq!(compute_total(&[]).unwrap(), 0);
    }

    #[test]
    fn test_compute_total_overflow() {
        let lines = vec![line("Gold", u64::MAX, 2)];
        assert!(compute_total(&lines).unwrap_err().is_validation_error());
    }

    #[test]
    fn test_new_computes_total() {
        let record = TransactionRecord::new(
            OrderKind::Takeaway,
            None,
            "Rina",
            vec![line("Pecel Lele", 20_000, 2)],
            Utc::now(),
        )
        .unwrap();
        assert_eq!(record.total_amount, 40_000);
        assert_eq!(record.status, PaymentStatus::Pending);
        assert!(record.payment_method.is_none());
        assert_eq!(record.item_count(), 2);
    }

    #[test]
    fn test_dine_in_requires_table() {
        let err = TransactionRecord::new(
            OrderKind::DineIn,
            None,
            "Rina",
            vec![line("Pecel Lele", 20_000, 1)],
            Utc::now(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("table number"));
    }

    #[test]
    fn test_takeaway_rejects_table() {
        assert!(TransactionRecord::new(
            OrderKind::Takeaway,
            Some(2),
            "Rina",
            vec![line("Pecel Lele", 20_000, 1)],
            Utc::now(),
        )
        .is_err());
    }

    #[test]
    fn test_empty_order_rejected() {
        assert!(
            TransactionRecord::new(OrderKind::Takeaway, None, "Rina", vec![], Utc::now()).is_err()
        );
    }

    #[test]
    fn test_validate_detects_tampered_total() {
        let mut record = TransactionRecord::new(
            OrderKind::DineIn,
            Some(3),
            "Budi",
            vec![line("Kopi Tubruk", 12_000, 1)],
            Utc::now(),
        )
        .unwrap();
        record.total_amount = 1;
        assert!(record.validate().is_err());
        record.recompute_total().unwrap();
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_serialized_shape() {
        let record = TransactionRecord::new(
            OrderKind::DineIn,
            Some(3),
            "Budi",
            vec![line("Kopi Tubruk", 12_000, 1)],
            Utc::now(),
        )
        .unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "dine_in");
        assert_eq!(json["tableNumber"], 3);
        assert_eq!(json["items"][0]["menuItem"]["price"], 12_000);
        assert_eq!(json["totalAmount"], 12_000);
        assert!(json["paymentMethod"].is_null());
        assert!(json.get("operatorRole").is_none());
    }

    #[test]
    fn test_operator_role_kept() {
        let mut record = TransactionRecord::new(
            OrderKind::Takeaway,
            None,
            "Rina",
            vec![line("Es Teh", 5_000, 1)],
            Utc::now(),
        )
        .unwrap();
        record.operator_role = Some(Role::Staff);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["operatorRole"], "staff");

        let back: TransactionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.operator_role, Some(Role::Staff));
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("QRIS".parse::<PaymentMethod>().unwrap(), PaymentMethod::Qris);
        assert_eq!("paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert!("card".parse::<PaymentMethod>().is_err());
    }
}
