//! Core types for the order ledger
//!
//! All types serialize to the JSON snapshot kept under the storage key.
//! Field names are camelCase, so payloads written by the earlier browser
//! front end (`flatNumber`, `orders`, `date`) still load:
//! - missing ids are assigned on load
//! - a missing or zero `quantity` reads as 1
//! - `date` is accepted for `createdAt`
//!
//! Money is `Decimal`. Every price seen so far is a whole rupee amount,
//! but nothing here assumes it.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable customer identifier (UUIDv7, time-ordered)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(Uuid);

impl CustomerId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CustomerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable line item identifier (UUIDv7, time-ordered)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemId(Uuid);

impl LineItemId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LineItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for LineItemId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered quantity, always at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// The default quantity of a new line item
    pub const ONE: Self = Self(1);

    /// Validate a requested quantity; `None` for anything below 1
    pub fn new(value: i64) -> Option<Self> {
        u32::try_from(value).ok().filter(|v| *v >= 1).map(Self)
    }

    /// Numeric value
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // null, 0 and out-of-range values were rendered as 1 by the old front end
        let raw = Option::<u64>::deserialize(deserializer)?;
        Ok(raw
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v >= 1)
            .map(Self)
            .unwrap_or(Self::ONE))
    }
}

/// RFC 3339 timestamp; anything else (e.g. a stored "Invalid Date") reads as now
fn created_at_or_now<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<DateTime<Utc>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(DateTime::<FixedOffset>::parse_from_rfc3339) {
        Some(Ok(parsed)) => Ok(parsed.with_timezone(&Utc)),
        _ => {
            tracing::warn!(value = ?raw, "Unreadable creation date, using load time");
            Ok(Utc::now())
        }
    }
}

/// Catalog entry: a dish and its price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Dish name, unique within a catalog
    pub name: String,

    /// Unit price
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl MenuItem {
    /// Create a catalog entry
    pub fn new(name: impl Into<String>, price: impl Into<Decimal>) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
        }
    }
}

/// One ordered dish within a customer's order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Stable id
    #[serde(default)]
    pub id: LineItemId,

    /// Dish name; empty while nothing is selected
    #[serde(default)]
    pub name: String,

    /// Unit price copied from the catalog at selection time
    #[serde(default, with = "rust_decimal::serde::float")]
    pub price: Decimal,

    /// Ordered quantity
    #[serde(default)]
    pub quantity: Quantity,
}

impl LineItem {
    /// Unselected line: no dish, zero price, quantity 1
    pub fn empty() -> Self {
        Self {
            id: LineItemId::new(),
            name: String::new(),
            price: Decimal::ZERO,
            quantity: Quantity::ONE,
        }
    }

    /// Whether a dish has been picked
    pub fn is_selected(&self) -> bool {
        !self.name.is_empty()
    }

    /// price × quantity
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity.get())
    }
}

/// One flat's open order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Stable id
    #[serde(default)]
    pub id: CustomerId,

    /// Flat number as entered by the operator
    pub flat_number: String,

    /// Line items in insertion order
    #[serde(default)]
    pub orders: Vec<LineItem>,

    /// Creation time, set once
    #[serde(default = "Utc::now", alias = "date", deserialize_with = "created_at_or_now")]
    pub created_at: DateTime<Utc>,

    /// Free-text order time
    #[serde(default)]
    pub order_time: String,

    /// Free-text delivery time
    #[serde(default)]
    pub delivery_time: String,

    /// Free-text review comments
    #[serde(default)]
    pub review_comments: String,
}

impl Customer {
    /// New customer with no orders, created now
    pub fn new(flat_number: impl Into<String>) -> Self {
        Self {
            id: CustomerId::new(),
            flat_number: flat_number.into(),
            orders: Vec::new(),
            created_at: Utc::now(),
            order_time: String::new(),
            delivery_time: String::new(),
            review_comments: String::new(),
        }
    }

    /// Σ(price × quantity) over all line items; zero when empty
    pub fn total(&self) -> Decimal {
        self.orders.iter().map(LineItem::line_total).sum()
    }

    /// Look up a line item by id
    pub fn line_item(&self, id: LineItemId) -> Option<&LineItem> {
        self.orders.iter().find(|item| item.id == id)
    }

    pub(crate) fn line_item_mut(&mut self, id: LineItemId) -> Option<&mut LineItem> {
        self.orders.iter_mut().find(|item| item.id == id)
    }
}
