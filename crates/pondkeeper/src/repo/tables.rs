//! Dining table repository.

use chrono::{DateTime, Utc};
use tracing::info;

use super::Collection;
use crate::error::{Error, Result};
use crate::model::{Reservation, Table};
use crate::store::SharedStore;

/// Tables, addressed by their number.
#[derive(Debug)]
pub struct TableRepository {
    records: Collection<Table>,
}

impl TableRepository {
    /// Create a repository over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            records: Collection::new(store),
        }
    }

    /// All tables, ordered by number.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn list(&self) -> Result<Vec<Table>> {
        let mut tables = self.records.load().await?;
        tables.sort_by_key(|t| t.number);
        Ok(tables)
    }

    /// The table with record id `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such table.
    pub async fn get(&self, id: &str) -> Result<Table> {
        self.records.get(id).await
    }

    /// The table with number `number`, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn find_by_number(&self, number: u32) -> Result<Option<Table>> {
        Ok(self
            .records
            .load()
            .await?
            .into_iter()
            .find(|t| t.number == number))
    }

    /// Add an empty table. Without a number, the next free one (highest + 1)
    /// is used.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the number is taken or an argument is
    /// zero.
    pub async fn create(&self, number: Option<u32>, capacity: u32) -> Result<Table> {
        let table = self
            .records
            .modify(|tables| {
                let number = match number {
                    Some(n) => n,
                    None => next_number(tables)?,
                };
                if tables.iter().any(|t| t.number == number) {
                    return Err(Error::validation(format!(
                        "table number {number} already exists"
                    )));
                }
                let table = Table::new(number, capacity)?;
                tables.push(table.clone());
                Ok(table)
            })
            .await?;

        info!(number = table.number, capacity, "table added");
        Ok(table)
    }

    /// Change the number of seats of table `number`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or a validation error.
    pub async fn set_capacity(&self, number: u32, capacity: u32) -> Result<Table> {
        let table = self
            .transition(number, |t| t.set_capacity(capacity))
            .await?;
        info!(number, capacity, "table capacity changed");
        Ok(table)
    }

    /// Reserve table `number`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or a validation error.
    pub async fn reserve(&self, number: u32, reservation: Reservation) -> Result<Table> {
        let table = self.transition(number, |t| t.reserve(reservation)).await?;
        info!(number, customer = ?table.customer_name, "table reserved");
        Ok(table)
    }

    /// Cancel the reservation on table `number`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or a validation error.
    pub async fn cancel_reservation(&self, number: u32) -> Result<Table> {
        let table = self.transition(number, Table::cancel_reservation).await?;
        info!(number, "reservation cancelled");
        Ok(table)
    }

    /// Seat `customer_name` at table `number`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or a validation error.
    pub async fn occupy(
        &self,
        number: u32,
        customer_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Table> {
        let table = self
            .transition(number, |t| t.occupy(customer_name, now))
            .await?;
        info!(number, customer = customer_name, "table occupied");
        Ok(table)
    }

    /// Free table `number` after the guests leave.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or a validation error.
    pub async fn finish(&self, number: u32) -> Result<Table> {
        let table = self.transition(number, Table::finish).await?;
        info!(number, "table finished");
        Ok(table)
    }

    /// Delete table `number`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such table.
    pub async fn remove(&self, number: u32) -> Result<Table> {
        let table = self
            .records
            .modify(|tables| {
                let index = tables
                    .iter()
                    .position(|t| t.number == number)
                    .ok_or_else(|| Error::not_found("table", number.to_string()))?;
                Ok(tables.remove(index))
            })
            .await?;
        info!(number, "table removed");
        Ok(table)
    }

    /// Replace or append a whole record, keyed by id.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the record is invalid or its number is
    /// used by another table.
    pub async fn upsert(&self, table: Table) -> Result<Table> {
        table.validate()?;
        self.records
            .modify(|tables| {
                if tables
                    .iter()
                    .any(|t| t.number == table.number && t.id != table.id)
                {
                    return Err(Error::validation(format!(
                        "table number {} already exists",
                        table.number
                    )));
                }
                match tables.iter_mut().find(|t| t.id == table.id) {
                    Some(slot) => *slot = table.clone(),
                    None => tables.push(table.clone()),
                }
                Ok(table)
            })
            .await
    }

    /// All tables in stored order.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn load(&self) -> Result<Vec<Table>> {
        self.records.load().await
    }

    /// Replace every table.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a record is invalid or two tables share a
    /// number.
    pub async fn save(&self, tables: &[Table]) -> Result<()> {
        check_unique_numbers(tables)?;
        self.records.save(tables).await
    }

    async fn transition<F>(&self, number: u32, f: F) -> Result<Table>
    where
        F: FnOnce(&mut Table) -> Result<()> + Send,
    {
        self.records
            .modify(|tables| {
                let slot = tables
                    .iter_mut()
                    .find(|t| t.number == number)
                    .ok_or_else(|| Error::not_found("table", number.to_string()))?;
                let mut updated = slot.clone();
                f(&mut updated)?;
                updated.validate()?;
                *slot = updated.clone();
                Ok(updated)
            })
            .await
    }
}

fn next_number(tables: &[Table]) -> Result<u32> {
    tables
        .iter()
        .map(|t| t.number)
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| Error::validation("no table numbers left"))
}

/// Check that no two tables share a number.
///
/// # Errors
///
/// Returns a validation error naming the first repeated number.
pub fn check_unique_numbers(tables: &[Table]) -> Result<()> {
    let mut numbers: Vec<u32> = tables.iter().map(|t| t.number).collect();
    numbers.sort_unstable();
    if let Some(pair) = numbers.windows(2).find(|w| w[0] == w[1]) {
        return Err(Error::validation(format!(
            "table number {} appears twice",
            pair[0]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableStatus;
    use crate::store::MemoryStore;
    use chrono::{NaiveDate, NaiveTime};
    use std::sync::Arc;

    fn repo() -> TableRepository {
        TableRepository::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_assigns_next_number() {
        let repo = repo();
        assert_eq!(repo.create(None, 4).await.unwrap().number, 1);
        assert_eq!(repo.create(Some(7), 2).await.unwrap().number, 7);
        assert_eq!(repo.create(None, 6).await.unwrap().number, 8);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_number() {
        let repo = repo();
        repo.create(Some(3), 4).await.unwrap();
        let err = repo.create(Some(3), 2).await.unwrap_err();
        assert!(err.is_validation_error());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_occupy_finish_scenario() {
        let repo = repo();
        repo.create(Some(3), 4).await.unwrap();

        let table = repo.occupy(3, "Budi", Utc::now()).await.unwrap();
        assert_eq!(table.status, TableStatus::Occupied);
        assert_eq!(table.customer_name.as_deref(), Some("Budi"));

        repo.finish(3).await.unwrap();
        let table = repo.find_by_number(3).await.unwrap().unwrap();
        assert_eq!(table.status, TableStatus::Empty);
        assert!(table.customer_name.is_none());
        assert!(table.occupied_since.is_none());
    }

    #[tokio::test]
    async fn test_reserve_and_cancel() {
        let repo = repo();
        repo.create(Some(1), 6).await.unwrap();
        let reservation = Reservation {
            customer_name: "Siti".to_string(),
            people: 5,
            date: NaiveDate::from_ymd_opt(2026, 8, 17).unwrap(),
            time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        };
        let table = repo.reserve(1, reservation).await.unwrap();
        assert_eq!(table.status, TableStatus::Reserved);

        let table = repo.cancel_reservation(1).await.unwrap();
        assert_eq!(table.status, TableStatus::Empty);
        assert!(table.reservation_date.is_none());
    }

    #[tokio::test]
    async fn test_failed_transition_is_not_saved() {
        let repo = repo();
        repo.create(Some(1), 4).await.unwrap();
        assert!(repo.finish(1).await.is_err());
        assert!(repo.set_capacity(1, 0).await.is_err());
        assert_eq!(repo.find_by_number(1).await.unwrap().unwrap().capacity, 4);
    }

    #[tokio::test]
    async fn test_unknown_number_is_not_found() {
        let repo = repo();
        assert!(repo.finish(9).await.unwrap_err().is_not_found());
        assert!(repo.remove(9).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_sorted_load_in_stored_order() {
        let repo = repo();
        repo.create(Some(5), 4).await.unwrap();
        repo.create(Some(2), 4).await.unwrap();

        let listed: Vec<u32> = repo.list().await.unwrap().iter().map(|t| t.number).collect();
        let loaded: Vec<u32> = repo.load().await.unwrap().iter().map(|t| t.number).collect();
        assert_eq!(listed, vec![2, 5]);
        assert_eq!(loaded, vec![5, 2]);
    }

    #[tokio::test]
    async fn test_save_rejects_duplicate_numbers() {
        let repo = repo();
        let tables = vec![Table::new(1, 4).unwrap(), Table::new(1, 2).unwrap()];
        assert!(repo.save(&tables).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_rejects_number_clash() {
        let repo = repo();
        repo.create(Some(1), 4).await.unwrap();
        let mut other = repo.create(Some(2), 4).await.unwrap();
        other.number = 1;
        assert!(repo.upsert(other).await.is_err());
    }

    #[tokio::test]
    async fn test_remove() {
        let repo = repo();
        repo.create(Some(1), 4).await.unwrap();
        let removed = repo.remove(1).await.unwrap();
        assert_eq!(removed.number, 1);
        assert!(repo.find_by_number(1).await.unwrap().is_none());
    }
}
