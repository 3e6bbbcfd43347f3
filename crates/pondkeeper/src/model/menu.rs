//! Menu items.

use serde::{Deserialize, Serialize};

use super::{new_id, required_text, Record};
use crate::error::{Error, Result};
use crate::store::EntityKey;

/// Menu section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuCategory {
    /// Dishes.
    #[serde(alias = "makanan")]
    Food,
    /// Drinks.
    #[serde(alias = "minuman")]
    Drink,
    /// Fishing packages sold by the hour.
    #[serde(alias = "paket_mancing")]
    Package,
}

impl MenuCategory {
    /// All categories, in menu order.
    pub const ALL: [MenuCategory; 3] = [Self::Food, Self::Drink, Self::Package];

    /// The stored string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Drink => "drink",
            Self::Package => "package",
        }
    }
}

impl std::fmt::Display for MenuCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MenuCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "food" | "makanan" => Ok(Self::Food),
            "drink" | "minuman" => Ok(Self::Drink),
            "package" | "paket_mancing" => Ok(Self::Package),
            other => Err(Error::validation(format!("unknown menu category: {other}"))),
        }
    }
}

fn default_active() -> bool {
    true
}

/// A sellable item. Prices are whole rupiah.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Record id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: u64,
    /// Menu section.
    pub category: MenuCategory,
    /// Inactive items stay on record but cannot be ordered.
    #[serde(rename = "is_active", default = "default_active")]
    pub active: bool,
}

impl Record for MenuItem {
    const KEY: EntityKey = EntityKey::MenuItems;
    const ENTITY: &'static str = "menu item";

    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("menu item name is required"));
        }
        Ok(())
    }
}

/// Input for a new menu item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMenuItem {
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: u64,
    /// Menu section.
    pub category: MenuCategory,
    /// Whether the item can be ordered.
    pub active: bool,
}

/// Partial update of a menu item; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuItemUpdate {
    /// New name.
    pub name: Option<String>,
    /// New price.
    pub price: Option<u64>,
    /// New section.
    pub category: Option<MenuCategory>,
    /// New active flag.
    pub active: Option<bool>,
}

impl MenuItem {
    /// Build a menu item with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is blank.
    pub fn new(input: NewMenuItem) -> Result<Self> {
        Ok(Self {
            id: new_id(),
            name: required_text("menu item name", &input.name)?,
            price: input.price,
            category: input.category,
            active: input.active,
        })
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the new name is blank; the item is left
    /// untouched in that case.
    pub fn apply(&mut self, update: MenuItemUpdate) -> Result<()> {
        let name = match update.name {
            Some(name) => Some(required_text("menu item name", &name)?),
            None => None,
        };
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        Ok(())
    }
}

/// The starter menu of the venue.
#[must_use]
pub fn demo_menu() -> Vec<MenuItem> {
    [
        ("Nasi Gudeg", 25_000, MenuCategory::Food),
        ("Ayam Bakar", 35_000, MenuCategory::Food),
        ("Pecel Lele", 20_000, MenuCategory::Food),
        ("Ikan Bakar", 45_000, MenuCategory::Food),
        ("Es Teh Manis", 8_000, MenuCategory::Drink),
        ("Es Jeruk", 10_000, MenuCategory::Drink),
        ("Kopi Tubruk", 12_000, MenuCategory::Drink),
        ("Paket Mancing 1 Jam", 15_000, MenuCategory::Package),
        ("Paket Mancing 3 Jam", 40_000, MenuCategory::Package),
    ]
    .into_iter()
    .map(|(name, price, category)| MenuItem {
        id: new_id(),
        name: name.to_string(),
        price,
        category,
        active: true,
    })
    .collect()
}
