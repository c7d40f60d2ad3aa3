//! htmx rendering surfaces for the badge and the notification.
//!
//! Neither surface touches the page directly. They collect what should be
//! drawn, and the route handlers render it as out-of-band swaps in the
//! response.

use chrono::{DateTime, Utc};
use furnilux_core::{
    Badge, Clock, CountDisplays, Notification, NotificationId, NotificationPhase,
    NotificationPresenter, NotificationSurface, SurfaceError,
};

/// CSS selector matching every cart count display on the page.
pub const COUNT_DISPLAY_SELECTOR: &str = ".cart-count";

/// One badge update, rendered as `hx-swap-oob="outerHTML:{selector}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountSwap {
    pub selector: &'static str,
    pub text: String,
    pub visible: bool,
}

/// Count displays addressed through htmx out-of-band swaps.
///
/// The selector is resolved in the browser when the swap lands, so displays
/// added after page load are covered.
#[derive(Debug, Default)]
pub struct OobCountDisplays {
    swaps: Vec<CountSwap>,
}

impl OobCountDisplays {
    #[must_use]
    pub fn into_swaps(self) -> Vec<CountSwap> {
        self.swaps
    }
}

impl CountDisplays for OobCountDisplays {
    type Element = &'static str;

    fn locate(&mut self) -> Vec<Self::Element> {
        vec![COUNT_DISPLAY_SELECTOR]
    }

    fn render(&mut self, element: &Self::Element, badge: &Badge) {
        // A later refresh in the same request supersedes earlier ones.
        self.swaps.retain(|swap| swap.selector != *element);
        self.swaps.push(CountSwap {
            selector: element,
            text: badge.text.clone(),
            visible: badge.visible,
        });
    }
}

/// The single `#cart-notification` slot.
///
/// Records the last change made to the slot during a request. Mounting a new
/// notification replaces the slot's content, which discards whatever was
/// there before.
#[derive(Debug, Default)]
pub struct NotificationSlot {
    last: Option<(NotificationId, NotificationPhase)>,
}

impl NotificationSlot {
    /// The last notification drawn into the slot and the phase it was put in.
    #[must_use]
    pub const fn last_change(&self) -> Option<(NotificationId, NotificationPhase)> {
        self.last
    }
}

impl NotificationSurface for NotificationSlot {
    fn mount(&mut self, notification: &Notification) -> Result<(), SurfaceError> {
        self.last = Some((notification.id, NotificationPhase::Visible));
        Ok(())
    }

    fn begin_exit(&mut self, notification: &Notification) -> Result<(), SurfaceError> {
        self.last = Some((notification.id, NotificationPhase::Exiting));
        Ok(())
    }

    fn unmount(&mut self, notification: &Notification) -> Result<(), SurfaceError> {
        self.last = Some((notification.id, NotificationPhase::Removed));
        Ok(())
    }
}

/// Template data for the notification slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationView {
    pub id: u64,
    pub message: String,
    pub exiting: bool,
    /// Milliseconds until the browser should ask for the next phase.
    pub poll_after_ms: i64,
}

impl NotificationView {
    /// View of the presenter's current notification at `now`, or `None` when
    /// the slot should be empty.
    #[must_use]
    pub fn current<C, S>(
        presenter: &NotificationPresenter<C, S>,
        now: DateTime<Utc>,
    ) -> Option<Self>
    where
        C: Clock,
        S: NotificationSurface,
    {
        let notification = presenter.current()?;
        let next = presenter.next_transition()?;
        Some(Self {
            id: notification.id.as_u64(),
            message: notification.message.clone(),
            exiting: notification.phase == NotificationPhase::Exiting,
            poll_after_ms: (next - now).num_milliseconds().max(0),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use furnilux_core::{BadgeUpdater, ManualClock};

    use super::*;

    #[test]
    fn test_badge_refresh_targets_all_count_displays() {
        let mut updater = BadgeUpdater::new(OobCountDisplays::default());
        assert_eq!(updater.refresh(0), 1);
        updater.refresh(4);

        let swaps = updater.into_displays().into_swaps();
        assert_eq!(
            swaps,
            vec![CountSwap {
                selector: ".cart-count",
                text: "4".to_string(),
                visible: true,
            }]
        );
    }

    #[test]
    fn test_notification_view_tracks_phase_and_delay() {
        let clock = ManualClock::default();
        let mut slot = NotificationSlot::default();
        let mut presenter = NotificationPresenter::new(clock.clone(), &mut slot);

        presenter.show("Sofa added to cart!");
        let view = NotificationView::current(&presenter, clock.now()).unwrap();
        assert!(!view.exiting);
        assert_eq!(view.poll_after_ms, 2000);

        clock.advance_ms(2100);
        presenter.tick();
        let view = NotificationView::current(&presenter, clock.now()).unwrap();
        assert!(view.exiting);
        assert_eq!(view.poll_after_ms, 200);

        clock.advance_ms(200);
        presenter.tick();
        assert!(NotificationView::current(&presenter, clock.now()).is_none());
        drop(presenter);
        assert_eq!(slot.last_change().unwrap().1, NotificationPhase::Removed);
    }
}
