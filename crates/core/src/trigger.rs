//! The add-to-cart entry point wired to product buttons.

use crate::cart::{CartObserver, CartStore};
use crate::clock::Clock;
use crate::notification::{NotificationPresenter, NotificationSurface};
use crate::storage::{SessionStorage, StorageError};
use crate::types::{Cart, NewProduct};

/// Confirmation text shown after `name` is added.
#[must_use]
pub fn added_message(name: &str) -> String {
    format!("{name} added to cart!")
}

/// Add one unit of `product` and confirm it with a notification.
///
/// The notification is only shown once the cart has been persisted; a
/// storage failure returns early and nothing is displayed.
///
/// # Errors
///
/// Returns an error if the cart could not be read or written.
pub fn add_to_cart<S, O, C, N>(
    store: &mut CartStore<S, O>,
    presenter: &mut NotificationPresenter<C, N>,
    product: NewProduct,
) -> Result<Cart, StorageError>
where
    S: SessionStorage,
    O: CartObserver,
    C: Clock,
    N: NotificationSurface,
{
    let message = added_message(&product.name);
    let cart = store.add_item(product)?;
    presenter.show(message);
    Ok(cart)
}
