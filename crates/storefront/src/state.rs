//! Application state shared across handlers.

use std::sync::Arc;

use furnilux_core::{Clock, NotificationTiming, SystemClock};

use crate::config::StorefrontConfig;
use crate::middleware::SessionLocks;

/// Clock shared by all requests.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// configuration, the notification clock and the per-session locks.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    clock: SharedClock,
    timing: NotificationTiming,
    session_locks: SessionLocks,
}

impl AppState {
    /// Create a new application state using wall-clock time.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a new application state with an explicit clock.
    #[must_use]
    pub fn with_clock(config: StorefrontConfig, clock: SharedClock) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                clock,
                timing: NotificationTiming::default(),
                session_locks: SessionLocks::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the clock driving notifications.
    #[must_use]
    pub fn clock(&self) -> &SharedClock {
        &self.inner.clock
    }

    /// Get the notification display timing.
    #[must_use]
    pub fn notification_timing(&self) -> NotificationTiming {
        self.inner.timing
    }

    /// Locks serializing requests within one session.
    #[must_use]
    pub fn session_locks(&self) -> &SessionLocks {
        &self.inner.session_locks
    }
}
