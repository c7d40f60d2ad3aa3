//! Integration tests for cart store behaviour.
//!
//! These run the store against in-memory storage, the same backend the
//! storefront snapshots a browser session into.

#![allow(clippy::unwrap_used)]

use furnilux_core::{
    CART_STORAGE_KEY, Cart, CartStore, CartTotals, DISCOUNT_RATE, MemoryStorage, NewProduct, Price,
    ProductId, SessionStorage,
};
use rust_decimal::Decimal;

fn product(id: &str, price: i64) -> NewProduct {
    NewProduct {
        id: ProductId::parse(id).unwrap(),
        name: format!("Product {id}"),
        price: Price::new(Decimal::from(price)).unwrap(),
        image: format!("images/{id}.jpg"),
    }
}

fn id(raw: &str) -> ProductId {
    ProductId::parse(raw).unwrap()
}

fn store_with(products: &[(&str, i64)]) -> CartStore<MemoryStorage> {
    let mut store = CartStore::new(MemoryStorage::new());
    for (raw, price) in products {
        store.add_item(product(raw, *price)).unwrap();
    }
    store
}

// =============================================================================
// Counting
// =============================================================================

#[test]
fn test_count_equals_number_of_adds_with_distinct_ids() {
    let ids = ["a", "b", "c", "d", "e"];
    let mut store = CartStore::new(MemoryStorage::new());
    for (n, raw) in ids.iter().enumerate() {
        store.add_item(product(raw, 10)).unwrap();
        assert_eq!(store.get_cart_count().unwrap(), n as u64 + 1);
    }
    assert_eq!(store.get_cart().unwrap().len(), ids.len());
}

#[test]
fn test_repeated_adds_increment_quantity() {
    let store = store_with(&[("a", 10), ("a", 10), ("b", 10)]);

    assert_eq!(store.get_cart_count().unwrap(), 3);
    let cart = store.get_cart().unwrap();
    assert_eq!(cart.len(), 2);
    assert_eq!(cart.get(&id("a")).unwrap().quantity.get(), 2);
}

// =============================================================================
// Removal and quantity updates
// =============================================================================

#[test]
fn test_removed_id_never_remains() {
    let cases: [&[(&str, i64)]; 3] = [&[], &[("a", 1)], &[("a", 1), ("a", 1), ("b", 2)]];
    for products in cases {
        let mut store = store_with(products);
        store.remove_item(&id("a")).unwrap();
        assert!(store.get_cart().unwrap().get(&id("a")).is_none());
    }
}

#[test]
fn test_update_to_zero_matches_remove() {
    let mut updated = store_with(&[("a", 5), ("b", 7)]);
    let mut removed = store_with(&[("a", 5), ("b", 7)]);

    updated.update_quantity(&id("a"), 0).unwrap();
    removed.remove_item(&id("a")).unwrap();

    assert_eq!(updated.get_cart().unwrap(), removed.get_cart().unwrap());
}

#[test]
fn test_update_of_missing_id_leaves_cart_unchanged() {
    let mut store = store_with(&[("a", 5)]);
    let before = store.get_cart().unwrap();

    store.update_quantity(&id("ghost"), 5).unwrap();

    assert_eq!(store.get_cart().unwrap(), before);
}

#[test]
fn test_clear_empties_cart() {
    let mut store = store_with(&[("a", 5), ("b", 7), ("b", 7)]);
    store.clear_cart().unwrap();

    assert!(store.get_cart().unwrap().is_empty());
    assert_eq!(store.get_cart_count().unwrap(), 0);
    assert!(store.storage().get(CART_STORAGE_KEY).is_none());
}

// =============================================================================
// Totals
// =============================================================================

#[test]
fn test_totals_hold_for_every_cart_state() {
    let mut store = CartStore::new(MemoryStorage::new());
    let steps: [fn(&mut CartStore<MemoryStorage>) -> Option<Cart>; 5] = [
        |_| Some(Cart::new()),
        |s| s.add_item(product("a", 120)).ok(),
        |s| s.add_item(product("b", 33)).ok(),
        |s| s.update_quantity(&id("a"), 4).ok(),
        |s| s.remove_item(&id("b")).ok(),
    ];

    for step in steps {
        assert!(step(&mut store).is_some());
        let subtotal = store.get_subtotal().unwrap();
        let discount = store.get_discount().unwrap();
        assert_eq!(discount, subtotal * DISCOUNT_RATE);
        assert_eq!(store.get_total().unwrap(), subtotal - discount);
    }
}

#[test]
fn test_empty_cart_totals_are_zero() {
    let store = CartStore::new(MemoryStorage::new());
    assert_eq!(
        store.get_totals().unwrap(),
        CartTotals {
            subtotal: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    );
}

#[test]
fn test_sofa_and_lamp_scenario() {
    let store = store_with(&[("sofa-1", 500), ("lamp-2", 50), ("sofa-1", 500)]);

    let cart = store.get_cart().unwrap();
    let lines: Vec<_> = cart
        .iter()
        .map(|item| (item.id.as_str(), item.quantity.get()))
        .collect();
    assert_eq!(lines, vec![("sofa-1", 2), ("lamp-2", 1)]);

    assert_eq!(store.get_subtotal().unwrap(), Decimal::from(1050));
    assert_eq!(store.get_discount().unwrap(), Decimal::from(315));
    assert_eq!(store.get_total().unwrap(), Decimal::from(735));
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_save_then_get_round_trips() {
    let mut source = store_with(&[("sofa-1", 500), ("lamp-2", 50), ("sofa-1", 500)]);
    source.update_quantity(&id("lamp-2"), 7).unwrap();
    let cart = source.get_cart().unwrap();

    let mut store = CartStore::new(MemoryStorage::new());
    store.save_cart(&cart).unwrap();

    assert_eq!(store.get_cart().unwrap(), cart);
}

#[test]
fn test_persisted_layout_is_readable_json() {
    let store = store_with(&[("sofa-1", 500)]);
    let raw = store.storage().get(CART_STORAGE_KEY).unwrap();

    let value: serde_json::Value = serde_json::from_str(raw).unwrap();
    let line = &value[0];
    assert_eq!(line["id"], "sofa-1");
    assert_eq!(line["name"], "Product sofa-1");
    assert_eq!(line["image"], "images/sofa-1.jpg");
    assert_eq!(line["quantity"], 1);
}

#[test]
fn test_corrupt_storage_reads_as_empty_cart() {
    let mut storage = MemoryStorage::new();
    storage
        .set_item(CART_STORAGE_KEY, "{not json".to_string())
        .unwrap();
    let store = CartStore::new(storage);

    assert_eq!(store.get_cart().unwrap(), Cart::new());
    assert_eq!(store.get_cart_count().unwrap(), 0);
}
