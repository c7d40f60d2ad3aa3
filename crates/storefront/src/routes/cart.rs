//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart lives in the browser session: each handler takes a
//! [`SessionSnapshot`], runs the core cart operations synchronously against
//! it, and flushes the changed keys back before responding.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use furnilux_core::{
    BadgeUpdater, Cart, CartStore, CartTotals, Clock, LineItem, NewProduct, NotificationPresenter,
    NotificationState, Price, ProductId, SessionStorage, StorageError, add_to_cart,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::session_storage::{NOTIFICATION_STATE_KEY, SessionSnapshot};
use crate::state::AppState;
use crate::surfaces::{CountSwap, NotificationSlot, NotificationView, OobCountDisplays};

/// Event htmx listeners use to refresh cart-dependent fragments.
const CART_UPDATED_TRIGGER: (&str, &str) = ("HX-Trigger", "cart-updated");

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: String,
    pub name: String,
    pub image: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub discount: String,
    pub total: String,
    pub item_count: u64,
}

// =============================================================================
// Type Conversions
// =============================================================================

/// Format an amount as a price string.
fn format_price(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

impl From<&LineItem> for CartItemView {
    fn from(item: &LineItem) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            image: item.image.clone(),
            quantity: item.quantity.get(),
            price: format_price(item.unit_price.amount()),
            line_price: format_price(item.line_total()),
        }
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let totals = CartTotals::for_cart(cart);
        Self {
            items: cart.iter().map(CartItemView::from).collect(),
            subtotal: format_price(totals.subtotal),
            discount: format_price(totals.discount),
            total: format_price(totals.total),
            item_count: cart.item_count(),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Cart store over the request's session snapshot, refreshing the badge.
type SessionCart = CartStore<SessionSnapshot, BadgeUpdater<OobCountDisplays>>;

/// Load the session snapshot with the configured quota.
async fn open_snapshot(state: &AppState, session: &Session) -> Result<SessionSnapshot> {
    Ok(SessionSnapshot::load(session, state.config().storage_quota_bytes).await?)
}

/// Run a cart mutation and persist the result.
///
/// Returns the resulting cart and the badge swaps produced by the mutation.
async fn mutate_cart(
    state: &AppState,
    session: &Session,
    op: impl FnOnce(&mut SessionCart) -> std::result::Result<Cart, StorageError>,
) -> Result<(Cart, Vec<CountSwap>)> {
    let snapshot = open_snapshot(state, session).await?;
    let mut store =
        CartStore::new(snapshot).with_observer(BadgeUpdater::new(OobCountDisplays::default()));

    let cart = op(&mut store)?;

    let (snapshot, badges) = store.into_parts();
    snapshot.flush(session).await?;
    Ok((cart, badges.into_displays().into_swaps()))
}

/// Read the saved notification state; corrupt or missing data starts fresh.
fn load_notification_state(storage: &impl SessionStorage) -> Result<NotificationState> {
    let Some(raw) = storage.get_item(NOTIFICATION_STATE_KEY)? else {
        return Ok(NotificationState::default());
    };
    Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Discarding malformed notification state");
        NotificationState::default()
    }))
}

fn save_notification_state(
    storage: &mut impl SessionStorage,
    notification_state: &NotificationState,
) -> std::result::Result<(), StorageError> {
    let raw = serde_json::to_string(notification_state)?;
    storage.set_item(NOTIFICATION_STATE_KEY, raw)
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data, posted by product buttons.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub id: String,
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub image: String,
}

impl AddToCartForm {
    fn into_product(self) -> Result<NewProduct> {
        let id = ProductId::parse(&self.id).map_err(|e| AppError::BadRequest(e.to_string()))?;
        let amount = Decimal::from_str(self.price.trim())
            .map_err(|_| AppError::BadRequest(format!("invalid price: {}", self.price)))?;
        let price = Price::new(amount).map_err(|e| AppError::BadRequest(e.to_string()))?;

        Ok(NewProduct {
            id,
            name: self.name,
            price,
            image: self.image,
        })
    }
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub id: String,
    pub quantity: String,
}

impl UpdateCartForm {
    /// Requested quantity. Zero or less removes the item.
    fn quantity(&self) -> Result<i64> {
        self.quantity
            .trim()
            .parse()
            .map_err(|_| AppError::BadRequest(format!("invalid quantity: {}", self.quantity)))
    }
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub id: String,
}

fn parse_id(raw: &str) -> Result<ProductId> {
    ProductId::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub badge: CountSwap,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    pub badges: Vec<CountSwap>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub badges: Vec<CountSwap>,
}

/// Response to an add: badge swaps plus the notification slot.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_added.html")]
pub struct CartAddedTemplate {
    pub badges: Vec<CountSwap>,
    pub notification: Option<NotificationView>,
}

/// Notification slot fragment template (polled by HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/notification.html")]
pub struct NotificationTemplate {
    pub notification: Option<NotificationView>,
    pub oob: bool,
}

fn items_response(cart: &Cart, badges: Vec<CountSwap>) -> Response {
    (
        AppendHeaders([CART_UPDATED_TRIGGER]),
        CartItemsTemplate {
            cart: CartView::from(cart),
            badges,
        },
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<CartShowTemplate> {
    let store = CartStore::new(open_snapshot(&state, &session).await?);
    let cart = store.get_cart()?;

    let mut updater = BadgeUpdater::new(OobCountDisplays::default());
    updater.refresh(cart.item_count());
    let badge = updater
        .into_displays()
        .into_swaps()
        .pop()
        .ok_or_else(|| AppError::Internal("no count display located".to_string()))?;

    Ok(CartShowTemplate {
        cart: CartView::from(&cart),
        badge,
    })
}

/// Add one unit of a product to the cart (HTMX).
///
/// Responds with out-of-band swaps for every count display and for the
/// notification slot, replacing any notification still showing.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product = form.into_product()?;
    add_breadcrumb("cart", "Added item to cart", Some(&[("product_id", product.id.as_str())]));

    let snapshot = open_snapshot(&state, &session).await?;
    let notification_state = load_notification_state(&snapshot)?;

    let mut store =
        CartStore::new(snapshot).with_observer(BadgeUpdater::new(OobCountDisplays::default()));
    let mut presenter = NotificationPresenter::new(state.clock(), NotificationSlot::default())
        .with_timing(state.notification_timing())
        .with_state(notification_state);

    let cart = add_to_cart(&mut store, &mut presenter, product)?;
    let notification = NotificationView::current(&presenter, state.clock().now());
    tracing::info!(lines = cart.len(), count = cart.item_count(), "Item added to cart");

    let (notification_state, _) = presenter.into_parts();
    let (mut snapshot, badges) = store.into_parts();
    save_notification_state(&mut snapshot, &notification_state)?;
    snapshot.flush(&session).await?;

    Ok((
        AppendHeaders([CART_UPDATED_TRIGGER]),
        CartAddedTemplate {
            badges: badges.into_displays().into_swaps(),
            notification,
        },
    )
        .into_response())
}

/// Update cart item quantity (HTMX).
///
/// A quantity of zero or less removes the item.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let id = parse_id(&form.id)?;
    let quantity = form.quantity()?;
    let (cart, badges) =
        mutate_cart(&state, &session, |store| store.update_quantity(&id, quantity)).await?;
    Ok(items_response(&cart, badges))
}

/// Remove item from cart (HTMX).
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let id = parse_id(&form.id)?;
    let (cart, badges) = mutate_cart(&state, &session, |store| store.remove_item(&id)).await?;
    Ok(items_response(&cart, badges))
}

/// Empty the cart (HTMX).
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Response> {
    let (cart, badges) = mutate_cart(&state, &session, |store| {
        store.clear_cart()?;
        Ok(Cart::new())
    })
    .await?;
    Ok(items_response(&cart, badges))
}

/// Get cart count badge (HTMX).
///
/// Requested once on page load to bring every count display up to date.
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> Result<CartCountTemplate> {
    let store = CartStore::new(open_snapshot(&state, &session).await?);

    let mut updater = BadgeUpdater::new(OobCountDisplays::default());
    updater.refresh(store.get_cart_count()?);

    Ok(CartCountTemplate {
        badges: updater.into_displays().into_swaps(),
    })
}

/// Advance the notification timer and render the slot (HTMX poll).
#[instrument(skip(state, session))]
pub async fn notification(
    State(state): State<AppState>,
    session: Session,
) -> Result<NotificationTemplate> {
    let mut snapshot = open_snapshot(&state, &session).await?;
    let notification_state = load_notification_state(&snapshot)?;

    let mut presenter = NotificationPresenter::new(state.clock(), NotificationSlot::default())
        .with_timing(state.notification_timing())
        .with_state(notification_state);
    presenter.tick();
    let view = NotificationView::current(&presenter, state.clock().now());

    let (notification_state, slot) = presenter.into_parts();
    if let Some((id, phase)) = slot.last_change() {
        tracing::debug!(notification_id = %id, ?phase, "Notification advanced");
        save_notification_state(&mut snapshot, &notification_state)?;
        snapshot.flush(&session).await?;
    }

    Ok(NotificationTemplate {
        notification: view,
        oob: false,
    })
}
