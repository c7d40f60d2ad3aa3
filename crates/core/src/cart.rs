//! Cart store backed by session storage.
//!
//! The persisted JSON under [`CART_STORAGE_KEY`] is the single source of
//! truth. Every operation reads it fresh and nothing is cached between calls,
//! so two stores over the same backend always agree.
//!
//! Mutations notify a [`CartObserver`] with the new item count after the
//! write succeeds. The storefront attaches a
//! [`BadgeUpdater`](crate::badge::BadgeUpdater) this way.

use std::num::NonZeroU32;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::storage::{SessionStorage, StorageError};
use crate::types::{Cart, NewProduct, ProductId};

/// Storage key holding the serialized cart.
pub const CART_STORAGE_KEY: &str = "furnilux_cart";

/// Promotional discount applied to every cart (30%).
pub const DISCOUNT_RATE: Decimal = Decimal::from_parts(30, 0, 0, false, 2);

/// Receives the cart's item count after every persisted change.
pub trait CartObserver {
    fn cart_changed(&mut self, count: u64);
}

impl<O: CartObserver + ?Sized> CartObserver for &mut O {
    fn cart_changed(&mut self, count: u64) {
        (**self).cart_changed(count);
    }
}

/// Observer that ignores every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObserver;

impl CartObserver for NoObserver {
    fn cart_changed(&mut self, _count: u64) {}
}

/// Subtotal, discount and total computed from one read of the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl CartTotals {
    /// Compute totals for `cart` with the fixed [`DISCOUNT_RATE`].
    #[must_use]
    pub fn for_cart(cart: &Cart) -> Self {
        let subtotal = cart.subtotal();
        let discount = subtotal * DISCOUNT_RATE;
        Self {
            subtotal,
            discount,
            total: subtotal - discount,
        }
    }
}

/// CRUD over the session cart.
///
/// # Example
///
/// ```
/// use furnilux_core::{CartStore, MemoryStorage, NewProduct, Price, ProductId};
/// use rust_decimal::Decimal;
///
/// let mut store = CartStore::new(MemoryStorage::new());
/// store.add_item(NewProduct {
///     id: ProductId::parse("sofa-1").unwrap(),
///     name: "Velvet Sofa".to_string(),
///     price: Price::new(Decimal::from(500)).unwrap(),
///     image: "images/sofa.jpg".to_string(),
/// }).unwrap();
///
/// assert_eq!(store.get_cart_count().unwrap(), 1);
/// assert_eq!(store.get_total().unwrap(), Decimal::from(350));
/// ```
#[derive(Debug)]
pub struct CartStore<S, O = NoObserver> {
    storage: S,
    observer: O,
}

impl<S: SessionStorage> CartStore<S> {
    /// Create a store over `storage` with no observer attached.
    pub const fn new(storage: S) -> Self {
        Self {
            storage,
            observer: NoObserver,
        }
    }
}

impl<S: SessionStorage, O: CartObserver> CartStore<S, O> {
    /// Attach an observer, replacing the current one.
    pub fn with_observer<P: CartObserver>(self, observer: P) -> CartStore<S, P> {
        CartStore {
            storage: self.storage,
            observer,
        }
    }

    /// Get a reference to the storage backend.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Get a reference to the attached observer.
    pub const fn observer(&self) -> &O {
        &self.observer
    }

    /// Consumes the store and returns its backend and observer.
    pub fn into_parts(self) -> (S, O) {
        (self.storage, self.observer)
    }

    /// Load the persisted cart.
    ///
    /// Missing or unparseable data yields an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend read fails.
    pub fn get_cart(&self) -> Result<Cart, StorageError> {
        let Some(raw) = self.storage.get_item(CART_STORAGE_KEY)? else {
            return Ok(Cart::new());
        };

        match serde_json::from_str(&raw) {
            Ok(cart) => Ok(cart),
            Err(e) => {
                warn!(error = %e, "Discarding malformed cart data");
                Ok(Cart::new())
            }
        }
    }

    /// Persist `cart` and notify the observer.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    pub fn save_cart(&mut self, cart: &Cart) -> Result<(), StorageError> {
        let raw = serde_json::to_string(cart)?;
        self.storage.set_item(CART_STORAGE_KEY, raw)?;
        debug!(lines = cart.len(), "Cart saved");
        self.refresh_observer()
    }

    /// Add one unit of `product`.
    ///
    /// An existing entry for the same id is incremented; its name, price and
    /// image are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn add_item(&mut self, product: NewProduct) -> Result<Cart, StorageError> {
        let mut cart = self.get_cart()?;
        cart.add(product);
        self.save_cart(&cart)?;
        Ok(cart)
    }

    /// Remove the entry for `id`. Persists even when nothing matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn remove_item(&mut self, id: &ProductId) -> Result<Cart, StorageError> {
        let mut cart = self.get_cart()?;
        cart.remove(id);
        self.save_cart(&cart)?;
        Ok(cart)
    }

    /// Set the quantity for `id`.
    ///
    /// A quantity of zero or less removes the entry. For an id that is not in
    /// the cart the current cart is returned without writing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn update_quantity(&mut self, id: &ProductId, quantity: i64) -> Result<Cart, StorageError> {
        let clamped = u32::try_from(quantity.max(0)).unwrap_or(u32::MAX);
        let Some(quantity) = NonZeroU32::new(clamped) else {
            return self.remove_item(id);
        };

        let mut cart = self.get_cart()?;
        if cart.set_quantity(id, quantity) {
            self.save_cart(&cart)?;
        } else {
            debug!(product_id = %id, "Quantity update for product not in cart");
        }
        Ok(cart)
    }

    /// Total number of units in the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn get_cart_count(&self) -> Result<u64, StorageError> {
        Ok(self.get_cart()?.item_count())
    }

    /// Sum of `unit_price * quantity` over all entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn get_subtotal(&self) -> Result<Decimal, StorageError> {
        Ok(self.get_cart()?.subtotal())
    }

    /// Discount at [`DISCOUNT_RATE`] of the subtotal.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn get_discount(&self) -> Result<Decimal, StorageError> {
        Ok(self.get_subtotal()? * DISCOUNT_RATE)
    }

    /// Subtotal minus discount.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn get_total(&self) -> Result<Decimal, StorageError> {
        Ok(self.get_subtotal()? - self.get_discount()?)
    }

    /// All three amounts from a single read.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn get_totals(&self) -> Result<CartTotals, StorageError> {
        Ok(CartTotals::for_cart(&self.get_cart()?))
    }

    /// Delete the persisted cart and notify the observer.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn clear_cart(&mut self) -> Result<(), StorageError> {
        self.storage.remove_item(CART_STORAGE_KEY)?;
        debug!("Cart cleared");
        self.refresh_observer()
    }

    fn refresh_observer(&mut self) -> Result<(), StorageError> {
        let count = self.get_cart_count()?;
        self.observer.cart_changed(count);
        Ok(())
    }
}
