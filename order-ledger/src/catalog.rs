//! Menu catalog
//!
//! An ordered, read-only list of dishes. A catalog is fixed for the
//! process lifetime; the ledger only reads it to validate and price
//! selections.

use crate::{types::MenuItem, Error, Result};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Built-in menu, in display order
const BUILTIN_MENU: &[(&str, u32)] = &[
    ("Chicken donne Biryani", 159),
    ("Kushka / Biriyani Rice (Chicken)", 89),
    ("Phulka", 13),
    ("Butter Phulka", 18),
    ("Chicken Ghee Roast (Dry)", 199),
    ("Chicken Chilli (Dry)", 169),
    ("Chicken Curry", 159),
    ("Anda Tikka Masala (2 Eggs)", 89),
    ("Anda Tikka Masala (4 Eggs)", 119),
    ("Afghani Egg Curry (2 Eggs)", 89),
    ("Afghani Egg Curry (4 Eggs)", 119),
    ("Egg Masala (2 Eggs)", 89),
    ("Egg Masala (4 Eggs)", 119),
    ("Egg Bhurji Gravy (2 Eggs)", 89),
    ("Egg Bhurji Gravy (4 Eggs)", 119),
    ("Boiled Egg", 10),
    ("Paneer Chilli (Dry)", 169),
    ("Palak Paneer", 169),
    ("Shahi Paneer", 169),
];

/// Ordered list of purchasable dishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<MenuItem>,
}

impl Catalog {
    /// Build a catalog from configured entries
    ///
    /// Names must be non-empty and unique, prices non-negative.
    pub fn new(items: Vec<MenuItem>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(items.len());

        for item in &items {
            if item.name.trim().is_empty() {
                return Err(Error::Config("Menu item with empty name".to_string()));
            }
            if item.price < Decimal::ZERO {
                return Err(Error::Config(format!(
                    "Menu item '{}' has negative price {}",
                    item.name, item.price
                )));
            }
            if !seen.insert(item.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate menu item '{}'",
                    item.name
                )));
            }
        }

        Ok(Self { items })
    }

    /// The standard 19-dish menu
    pub fn builtin() -> Self {
        Self {
            items: BUILTIN_MENU
                .iter()
                .map(|(name, price)| MenuItem::new(*name, *price))
                .collect(),
        }
    }

    /// Entries in display order
    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// Find an entry by exact name
    pub fn find(&self, name: &str) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog has no entries
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
