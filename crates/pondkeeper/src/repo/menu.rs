//! Menu repository.

use tracing::info;

use super::Collection;
use crate::error::Result;
use crate::model::{demo_menu, MenuCategory, MenuItem, MenuItemUpdate, NewMenuItem};
use crate::store::SharedStore;

/// Menu items, addressed by id.
#[derive(Debug)]
pub struct MenuRepository {
    records: Collection<MenuItem>,
}

impl MenuRepository {
    /// Create a repository over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            records: Collection::new(store),
        }
    }

    /// Every item, active or not, in stored order.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn list(&self) -> Result<Vec<MenuItem>> {
        self.records.load().await
    }

    /// Items that can currently be ordered.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn active(&self) -> Result<Vec<MenuItem>> {
        let mut items = self.records.load().await?;
        items.retain(|i| i.active);
        Ok(items)
    }

    /// Active items of one category.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn by_category(&self, category: MenuCategory) -> Result<Vec<MenuItem>> {
        let mut items = self.active().await?;
        items.retain(|i| i.category == category);
        Ok(items)
    }

    /// The item with id `id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if there is no such item.
    pub async fn get(&self, id: &str) -> Result<MenuItem> {
        self.records.get(id).await
    }

    /// Add an item.
    ///
    /// # Errors
    ///
    /// Returns a validation or storage error.
    pub async fn create(&self, input: NewMenuItem) -> Result<MenuItem> {
        let item = self.records.upsert(MenuItem::new(input)?).await?;
        info!(id = %item.id, name = %item.name, price = item.price, "menu item added");
        Ok(item)
    }

    /// Change fields of an existing item.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] or a validation error.
    pub async fn update(&self, id: &str, update: MenuItemUpdate) -> Result<MenuItem> {
        let item = self.records.update(id, |item| item.apply(update)).await?;
        info!(id, name = %item.name, "menu item updated");
        Ok(item)
    }

    /// Replace or append a whole record.
    ///
    /// # Errors
    ///
    /// Returns a validation or storage error.
    pub async fn upsert(&self, item: MenuItem) -> Result<MenuItem> {
        self.records.upsert(item).await
    }

    /// Delete an item. Past orders keep their own snapshot of it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if there is no such item.
    pub async fn remove(&self, id: &str) -> Result<MenuItem> {
        let item = self.records.remove(id).await?;
        info!(id, name = %item.name, "menu item removed");
        Ok(item)
    }

    /// Fill an empty menu with the starter items. Returns how many were added.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn seed_demo(&self) -> Result<usize> {
        let added = self
            .records
            .modify(|items| {
                if !items.is_empty() {
                    return Ok(0);
                }
                *items = demo_menu();
                Ok(items.len())
            })
            .await?;
        if added > 0 {
            info!(count = added, "seeded demo menu");
        }
        Ok(added)
    }

    /// Every item in stored order.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn load(&self) -> Result<Vec<MenuItem>> {
        self.records.load().await
    }

    /// Replace every item.
    ///
    /// # Errors
    ///
    /// Returns a validation or storage error.
    pub async fn save(&self, items: &[MenuItem]) -> Result<()> {
        self.records.save(items).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn repo() -> MenuRepository {
        MenuRepository::new(Arc::new(MemoryStore::new()))
    }

    fn coffee() -> NewMenuItem {
        NewMenuItem {
            name: "Kopi Susu".to_string(),
            price: 15_000,
            category: MenuCategory::Drink,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = repo();
        let item = repo.create(coffee()).await.unwrap();
        assert_eq!(repo.get(&item.id).await.unwrap(), item);
    }

    #[tokio::test]
    async fn test_seed_demo_only_when_empty() {
        let fresh = repo();
        let other = repo();
        assert_eq!(fresh.seed_demo().await.unwrap(), 9);
        assert_eq!(fresh.seed_demo().await.unwrap(), 0);
        assert_eq!(fresh.list().await.unwrap().len(), 9);

        other.create(coffee()).await.unwrap();
        assert_eq!(other.seed_demo().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_active_and_by_category() {
        let repo = repo();
        repo.seed_demo().await.unwrap();
        let first = repo.list().await.unwrap().remove(0);
        repo.update(
            &first.id,
            MenuItemUpdate {
                active: Some(false),
                ..MenuItemUpdate::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(repo.active().await.unwrap().len(), 8);
        assert_eq!(repo.by_category(MenuCategory::Food).await.unwrap().len(), 3);
        assert_eq!(repo.by_category(MenuCategory::Package).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let repo = repo();
        let item = repo.create(coffee()).await.unwrap();
        let updated = repo
            .update(
                &item.id,
                MenuItemUpdate {
                    price: Some(17_000),
                    ..MenuItemUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, 17_000);

        repo.remove(&item.id).await.unwrap();
        assert!(repo.get(&item.id).await.unwrap_err().is_not_found());
    }
}
