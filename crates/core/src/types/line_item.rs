//! Cart line items and the cart collection.

use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A product as presented by an add-to-cart control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: String,
}

/// One product entry in the cart with its quantity.
///
/// Field names match the persisted layout (`price`, `image`), so carts
/// written by earlier versions of the storefront script still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: ProductId,
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: Price,
    pub image: String,
    pub quantity: NonZeroU32,
}

impl LineItem {
    /// Create a line item holding a single unit of `product`.
    #[must_use]
    pub fn from_product(product: NewProduct) -> Self {
        Self {
            id: product.id,
            name: product.name,
            unit_price: product.price,
            image: product.image,
            quantity: NonZeroU32::MIN,
        }
    }

    /// Unit price multiplied by quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.amount() * Decimal::from(self.quantity.get())
    }
}

/// The ordered collection of line items for the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Consumes the cart and returns its line items.
    #[must_use]
    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct line items (not units).
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.items.iter()
    }

    /// Find the line item for `id`.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Sum of quantities across all line items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Sum of `unit_price * quantity` across all line items.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Add one unit of `product`.
    ///
    /// An existing entry keeps its name, price and image; only the quantity
    /// changes.
    pub fn add(&mut self, product: NewProduct) {
        if let Some(existing) = self.items.iter_mut().find(|item| item.id == product.id) {
            existing.quantity = existing.quantity.saturating_add(1);
        } else {
            self.items.push(LineItem::from_product(product));
        }
    }

    /// Remove every entry for `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.id != id);
        self.items.len() != before
    }

    /// Set the quantity of the entry for `id`. Returns `false` if there is no
    /// such entry.
    pub fn set_quantity(&mut self, id: &ProductId, quantity: NonZeroU32) -> bool {
        match self.items.iter_mut().find(|item| &item.id == id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl From<Vec<LineItem>> for Cart {
    fn from(items: Vec<LineItem>) -> Self {
        Self { items }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, price: i64) -> NewProduct {
        NewProduct {
            id: ProductId::parse(id).unwrap(),
            name: format!("Product {id}"),
            price: Price::new(Decimal::from(price)).unwrap(),
            image: format!("images/{id}.jpg"),
        }
    }

    #[test]
    fn test_add_appends_with_quantity_one() {
        let mut cart = Cart::new();
        cart.add(product("sofa-1", 500));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity.get(), 1);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_add_existing_keeps_first_written_fields() {
        let mut cart = Cart::new();
        cart.add(product("sofa-1", 500));

        let mut repriced = product("sofa-1", 900);
        repriced.name = "Renamed".to_string();
        cart.add(repriced);

        let item = cart.get(&ProductId::parse("sofa-1").unwrap()).unwrap();
        assert_eq!(item.quantity.get(), 2);
        assert_eq!(item.name, "Product sofa-1");
        assert_eq!(item.unit_price.amount(), Decimal::from(500));
    }

    #[test]
    fn test_remove_reports_whether_anything_matched() {
        let mut cart = Cart::new();
        cart.add(product("sofa-1", 500));

        assert!(!cart.remove(&ProductId::parse("lamp-2").unwrap()));
        assert!(cart.remove(&ProductId::parse("sofa-1").unwrap()));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_drops_duplicate_entries() {
        let item = LineItem::from_product(product("sofa-1", 500));
        let mut cart = Cart::from(vec![item.clone(), item]);

        cart.remove(&ProductId::parse("sofa-1").unwrap());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_subtotal_and_count() {
        let mut cart = Cart::new();
        cart.add(product("sofa-1", 500));
        cart.add(product("lamp-2", 50));
        cart.add(product("sofa-1", 500));

        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.subtotal(), Decimal::from(1050));
    }

    #[test]
    fn test_persisted_field_names() {
        let mut cart = Cart::new();
        cart.add(product("sofa-1", 500));

        let json: serde_json::Value = serde_json::to_value(&cart).unwrap();
        let entry = &json[0];
        assert_eq!(entry["id"], "sofa-1");
        assert_eq!(entry["name"], "Product sofa-1");
        assert_eq!(entry["image"], "images/sofa-1.jpg");
        assert_eq!(entry["quantity"], 1);
        assert!(entry.get("price").is_some());
    }

    #[test]
    fn test_zero_quantity_does_not_deserialize() {
        let raw = r#"[{"id":"a","name":"A","price":1,"image":"","quantity":0}]"#;
        assert!(serde_json::from_str::<Cart>(raw).is_err());
    }
}
