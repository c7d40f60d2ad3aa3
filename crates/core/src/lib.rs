//! FurniLux Core - session-scoped shopping cart.
//!
//! This crate holds the cart logic used by the storefront:
//! - [`cart`] - `CartStore`, CRUD and totals over the persisted cart
//! - [`storage`] - the `SessionStorage` seam and an in-memory backend
//! - [`badge`] - cart count badge rendering
//! - [`notification`] - the timed "added to cart" notification
//! - [`trigger`] - the add-to-cart entry point tying the pieces together
//!
//! # Architecture
//!
//! The core crate has no HTTP, no async and no global state. Storage, the
//! clock and rendering surfaces are injected, so everything here runs the
//! same against the browser session in production and plain memory in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod badge;
pub mod cart;
pub mod clock;
pub mod notification;
pub mod storage;
pub mod trigger;
pub mod types;

pub use badge::{Badge, BadgeUpdater, CountDisplays};
pub use cart::{CART_STORAGE_KEY, CartObserver, CartStore, CartTotals, DISCOUNT_RATE, NoObserver};
pub use clock::{Clock, ManualClock, SystemClock};
pub use notification::{
    Notification, NotificationId, NotificationPhase, NotificationPresenter, NotificationState,
    NotificationSurface, NotificationTiming, SurfaceError,
};
pub use storage::{MemoryStorage, SessionStorage, StorageError};
pub use trigger::{add_to_cart, added_message};
pub use types::*;
