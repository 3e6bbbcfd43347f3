//! Order repository.

use chrono::{DateTime, Utc};
use tracing::info;

use super::{Collection, MenuRepository};
use crate::error::{Error, Result};
use crate::model::{
    MenuItemRef, NewOrder, OrderLine, PaymentMethod, PaymentStatus, TransactionRecord,
};
use crate::store::SharedStore;

/// Orders, addressed by id.
#[derive(Debug)]
pub struct TransactionRepository {
    records: Collection<TransactionRecord>,
}

impl TransactionRepository {
    /// Create a repository over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            records: Collection::new(store),
        }
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn list(&self) -> Result<Vec<TransactionRecord>> {
        let mut records = self.records.load().await?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    /// The order with id `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such order.
    pub async fn get(&self, id: &str) -> Result<TransactionRecord> {
        self.records.get(id).await
    }

    /// Place an order against the current menu.
    ///
    /// Items are resolved by id among active menu items; repeated ids are
    /// merged into one line. Names and prices are copied into the order so
    /// later menu changes do not alter it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown menu item and a validation
    /// error for an inactive item, a zero quantity or an inconsistent order.
    pub async fn create(
        &self,
        order: NewOrder,
        menu: &MenuRepository,
        now: DateTime<Utc>,
    ) -> Result<TransactionRecord> {
        let lines = resolve_lines(&order.items, menu).await?;
        let mut record = TransactionRecord::new(
            order.kind,
            order.table_number,
            &order.customer_name,
            lines,
            now,
        )?;
        record.operator_role = order.operator_role;
        let record = self.records.upsert(record).await?;

        info!(
            id = %record.id,
            kind = record.kind.as_str(),
            table = ?record.table_number,
            total = record.total_amount,
            "order placed"
        );
        Ok(record)
    }

    /// Change the payment status of an order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such order.
    pub async fn set_status(&self, id: &str, status: PaymentStatus) -> Result<TransactionRecord> {
        let record = self
            .records
            .update(id, |r| {
                r.status = status;
                Ok(())
            })
            .await?;
        info!(id, status = status.as_str(), "order status changed");
        Ok(record)
    }

    /// Set or clear the payment method of an order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such order.
    pub async fn set_payment_method(
        &self,
        id: &str,
        method: Option<PaymentMethod>,
    ) -> Result<TransactionRecord> {
        let record = self
            .records
            .update(id, |r| {
                r.payment_method = method;
                Ok(())
            })
            .await?;
        info!(id, method = ?method, "order payment method changed");
        Ok(record)
    }

    /// Mark an order paid with `method`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such order.
    pub async fn pay(&self, id: &str, method: PaymentMethod) -> Result<TransactionRecord> {
        let record = self
            .records
            .update(id, |r| {
                r.status = PaymentStatus::Paid;
                r.payment_method = Some(method);
                Ok(())
            })
            .await?;
        info!(id, method = method.as_str(), total = record.total_amount, "order paid");
        Ok(record)
    }

    /// Replace or append a whole record. The total is recomputed from the
    /// lines before writing.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the record is inconsistent.
    pub async fn upsert(&self, mut record: TransactionRecord) -> Result<TransactionRecord> {
        record.recompute_total()?;
        self.records.upsert(record).await
    }

    /// Delete an order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such order.
    pub async fn remove(&self, id: &str) -> Result<TransactionRecord> {
        let record = self.records.remove(id).await?;
        info!(id, "order removed");
        Ok(record)
    }

    /// Every order in stored order.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn load(&self) -> Result<Vec<TransactionRecord>> {
        self.records.load().await
    }

    /// Replace every order, recomputing each total.
    ///
    /// # Errors
    ///
    /// Returns a validation or storage error.
    pub async fn save(&self, records: &[TransactionRecord]) -> Result<()> {
        let mut records = records.to_vec();
        for record in &mut records {
            record.recompute_total()?;
        }
        self.records.save(&records).await
    }
}

async fn resolve_lines(items: &[(String, u32)], menu: &MenuRepository) -> Result<Vec<OrderLine>> {
    let catalog = menu.list().await?;
    let mut lines: Vec<OrderLine> = Vec::with_capacity(items.len());

    for (id, quantity) in items {
        if *quantity == 0 {
            return Err(Error::validation(format!(
                "quantity for menu item {id} must be positive"
            )));
        }
        if let Some(line) = lines.iter_mut().find(|l| &l.menu_item.id == id) {
            line.quantity = line
                .quantity
                .checked_add(*quantity)
                .ok_or_else(|| Error::validation("quantity overflow"))?;
            continue;
        }

        let item = catalog
            .iter()
            .find(|i| &i.id == id)
            .ok_or_else(|| Error::not_found("menu item", id.clone()))?;
        if !item.active {
            return Err(Error::validation(format!(
                "{} is not available right now",
                item.name
            )));
        }
        lines.push(OrderLine {
            menu_item: MenuItemRef {
                id: item.id.clone(),
                name: item.name.clone(),
                price: item.price,
            },
            quantity: *quantity,
        });
    }
    Ok(lines)
}
