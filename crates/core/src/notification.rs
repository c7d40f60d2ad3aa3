//! Transient "added to cart" notification.
//!
//! A notification moves through `Hidden → Visible → Exiting → Removed`. It is
//! visible for [`NotificationTiming::display`], then plays an exit transition
//! for [`NotificationTiming::exit`], then is removed from the surface. At most
//! one notification is current; showing a new one removes the previous one
//! immediately.
//!
//! The presenter does not own a timer. Callers drive it with
//! [`NotificationPresenter::tick`], and the injected [`Clock`] decides which
//! phase has been reached. [`NotificationState`] is serializable so a
//! presenter can be rebuilt from session storage between ticks.

use core::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::clock::Clock;

/// Default time a notification stays fully visible.
pub const DEFAULT_DISPLAY_MS: i64 = 2000;

/// Default duration of the exit transition.
pub const DEFAULT_EXIT_MS: i64 = 300;

/// Identifier of a shown notification, unique within one presenter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(u64);

impl NotificationId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle phase of a single notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPhase {
    Hidden,
    Visible,
    Exiting,
    Removed,
}

/// Display window and exit transition lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationTiming {
    pub display: TimeDelta,
    pub exit: TimeDelta,
}

impl Default for NotificationTiming {
    fn default() -> Self {
        Self {
            display: TimeDelta::milliseconds(DEFAULT_DISPLAY_MS),
            exit: TimeDelta::milliseconds(DEFAULT_EXIT_MS),
        }
    }
}

/// A notification and where it is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub shown_at: DateTime<Utc>,
    pub phase: NotificationPhase,
}

impl Notification {
    /// When the exit transition starts.
    #[must_use]
    pub fn exit_at(&self, timing: &NotificationTiming) -> DateTime<Utc> {
        self.shown_at + timing.display
    }

    /// When the notification is removed.
    #[must_use]
    pub fn removed_at(&self, timing: &NotificationTiming) -> DateTime<Utc> {
        self.shown_at + timing.display + timing.exit
    }

    /// The next instant at which this notification changes phase.
    #[must_use]
    pub fn next_transition(&self, timing: &NotificationTiming) -> Option<DateTime<Utc>> {
        match self.phase {
            NotificationPhase::Visible => Some(self.exit_at(timing)),
            NotificationPhase::Exiting => Some(self.removed_at(timing)),
            NotificationPhase::Hidden | NotificationPhase::Removed => None,
        }
    }
}

/// Persistable presenter state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationState {
    next_id: u64,
    current: Option<Notification>,
}

impl NotificationState {
    /// The notification currently on screen, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }
}

/// Errors raised by a rendering surface.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// There is nothing to render into.
    #[error("no rendering surface available")]
    Unavailable,

    /// The surface refused the operation.
    #[error("surface rejected notification {id}: {reason}")]
    Rejected { id: NotificationId, reason: String },
}

/// Where notifications are drawn.
pub trait NotificationSurface {
    /// Append the notification and start its enter transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification could not be displayed.
    fn mount(&mut self, notification: &Notification) -> Result<(), SurfaceError>;

    /// Start the exit transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface no longer holds the notification.
    fn begin_exit(&mut self, notification: &Notification) -> Result<(), SurfaceError>;

    /// Remove the notification from the surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface no longer holds the notification.
    fn unmount(&mut self, notification: &Notification) -> Result<(), SurfaceError>;
}

impl<S: NotificationSurface + ?Sized> NotificationSurface for &mut S {
    fn mount(&mut self, notification: &Notification) -> Result<(), SurfaceError> {
        (**self).mount(notification)
    }

    fn begin_exit(&mut self, notification: &Notification) -> Result<(), SurfaceError> {
        (**self).begin_exit(notification)
    }

    fn unmount(&mut self, notification: &Notification) -> Result<(), SurfaceError> {
        (**self).unmount(notification)
    }
}

/// Shows one notification at a time and advances it on [`tick`](Self::tick).
#[derive(Debug)]
pub struct NotificationPresenter<C, S> {
    clock: C,
    surface: S,
    timing: NotificationTiming,
    state: NotificationState,
}

impl<C: Clock, S: NotificationSurface> NotificationPresenter<C, S> {
    /// Create a presenter with default timing and no notification shown.
    pub fn new(clock: C, surface: S) -> Self {
        Self {
            clock,
            surface,
            timing: NotificationTiming::default(),
            state: NotificationState::default(),
        }
    }

    #[must_use]
    pub fn with_timing(mut self, timing: NotificationTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Resume from a previously saved state.
    #[must_use]
    pub fn with_state(mut self, state: NotificationState) -> Self {
        self.state = state;
        self
    }

    /// Show `message`, removing any notification still on screen.
    ///
    /// Surface failures are logged; the returned id is valid either way and
    /// reports [`NotificationPhase::Removed`] if the mount failed.
    pub fn show(&mut self, message: impl Into<String>) -> NotificationId {
        if let Some(mut previous) = self.state.current.take() {
            self.remove(&mut previous);
        }

        let id = NotificationId(self.state.next_id);
        self.state.next_id += 1;

        let mut notification = Notification {
            id,
            message: message.into(),
            shown_at: self.clock.now(),
            phase: NotificationPhase::Hidden,
        };

        match self.surface.mount(&notification) {
            Ok(()) => {
                notification.phase = NotificationPhase::Visible;
                self.state.current = Some(notification);
            }
            Err(e) => warn!(notification_id = %id, error = %e, "Failed to show notification"),
        }

        id
    }

    /// Advance the current notification to the phase the clock has reached.
    ///
    /// Returns the phase after advancing, or `None` if nothing was current.
    pub fn tick(&mut self) -> Option<NotificationPhase> {
        let mut notification = self.state.current.take()?;
        let now = self.clock.now();

        if notification.phase == NotificationPhase::Visible && now >= notification.exit_at(&self.timing) {
            if let Err(e) = self.surface.begin_exit(&notification) {
                warn!(notification_id = %notification.id, error = %e, "Failed to start notification exit");
            }
            notification.phase = NotificationPhase::Exiting;
        }

        if notification.phase == NotificationPhase::Exiting
            && now >= notification.removed_at(&self.timing)
        {
            self.remove(&mut notification);
            return Some(NotificationPhase::Removed);
        }

        let phase = notification.phase;
        self.state.current = Some(notification);
        Some(phase)
    }

    /// Phase of the notification with `id`.
    #[must_use]
    pub fn phase_of(&self, id: NotificationId) -> NotificationPhase {
        match &self.state.current {
            Some(current) if current.id == id => current.phase,
            _ if id.0 < self.state.next_id => NotificationPhase::Removed,
            _ => NotificationPhase::Hidden,
        }
    }

    #[must_use]
    pub const fn current(&self) -> Option<&Notification> {
        self.state.current.as_ref()
    }

    /// When the current notification next changes phase.
    #[must_use]
    pub fn next_transition(&self) -> Option<DateTime<Utc>> {
        self.state
            .current
            .as_ref()
            .and_then(|n| n.next_transition(&self.timing))
    }

    #[must_use]
    pub const fn timing(&self) -> &NotificationTiming {
        &self.timing
    }

    #[must_use]
    pub const fn surface(&self) -> &S {
        &self.surface
    }

    /// Consumes the presenter and returns its state and surface.
    pub fn into_parts(self) -> (NotificationState, S) {
        (self.state, self.surface)
    }

    fn remove(&mut self, notification: &mut Notification) {
        if let Err(e) = self.surface.unmount(notification) {
            warn!(notification_id = %notification.id, error = %e, "Failed to remove notification");
        }
        notification.phase = NotificationPhase::Removed;
    }
}
