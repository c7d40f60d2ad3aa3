//! Cart count badge.
//!
//! [`BadgeUpdater`] writes the current item count to every count display on
//! the page. Displays are located anew on each refresh so ones inserted
//! after page load are picked up.

use crate::cart::CartObserver;

/// What a count display should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub count: u64,
    pub text: String,
    pub visible: bool,
}

impl Badge {
    /// Badge for `count` items; hidden when the cart is empty.
    #[must_use]
    pub fn for_count(count: u64) -> Self {
        Self {
            count,
            text: count.to_string(),
            visible: count > 0,
        }
    }
}

/// The page's set of count displays.
pub trait CountDisplays {
    type Element;

    /// Find every count display present right now.
    fn locate(&mut self) -> Vec<Self::Element>;

    /// Write `badge` to one display.
    fn render(&mut self, element: &Self::Element, badge: &Badge);
}

/// Reflects the cart count onto all count displays.
#[derive(Debug)]
pub struct BadgeUpdater<D> {
    displays: D,
}

impl<D: CountDisplays> BadgeUpdater<D> {
    pub const fn new(displays: D) -> Self {
        Self { displays }
    }

    /// Render `count` to every display. Returns how many were updated.
    pub fn refresh(&mut self, count: u64) -> usize {
        let badge = Badge::for_count(count);
        let elements = self.displays.locate();
        for element in &elements {
            self.displays.render(element, &badge);
        }
        tracing::trace!(count, displays = elements.len(), "Badge refreshed");
        elements.len()
    }

    #[must_use]
    pub const fn displays(&self) -> &D {
        &self.displays
    }

    pub const fn displays_mut(&mut self) -> &mut D {
        &mut self.displays
    }

    pub fn into_displays(self) -> D {
        self.displays
    }
}

impl<D: CountDisplays> CartObserver for BadgeUpdater<D> {
    fn cart_changed(&mut self, count: u64) {
        self.refresh(count);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    /// Page stub: a map of element id to (text, visible).
    #[derive(Default)]
    struct Page {
        displays: BTreeMap<&'static str, (String, bool)>,
    }

    impl CountDisplays for Page {
        type Element = &'static str;

        fn locate(&mut self) -> Vec<Self::Element> {
            self.displays.keys().copied().collect()
        }

        fn render(&mut self, element: &Self::Element, badge: &Badge) {
            self.displays
                .insert(*element, (badge.text.clone(), badge.visible));
        }
    }

    #[test]
    fn test_badge_hidden_at_zero() {
        let badge = Badge::for_count(0);
        assert_eq!(badge.text, "0");
        assert!(!badge.visible);
        assert!(Badge::for_count(3).visible);
    }

    #[test]
    fn test_refresh_with_no_displays_is_noop() {
        let mut updater = BadgeUpdater::new(Page::default());
        assert_eq!(updater.refresh(4), 0);
    }

    #[test]
    fn test_refresh_updates_every_display() {
        let mut page = Page::default();
        page.displays.insert("header", (String::new(), false));
        page.displays.insert("mobile-nav", (String::new(), false));

        let mut updater = BadgeUpdater::new(page);
        assert_eq!(updater.refresh(3), 2);

        let page = updater.into_displays();
        assert!(page.displays.values().all(|(t, v)| t == "3" && *v));
    }

    #[test]
    fn test_refresh_finds_displays_added_later() {
        let mut updater = BadgeUpdater::new(Page::default());
        assert_eq!(updater.refresh(1), 0);

        updater
            .displays_mut()
            .displays
            .insert("drawer", (String::new(), true));
        assert_eq!(updater.refresh(0), 1);
        assert_eq!(
            updater.displays().displays.get("drawer"),
            Some(&("0".to_string(), false))
        );
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let mut page = Page::default();
        page.displays.insert("header", (String::new(), false));
        let mut updater = BadgeUpdater::new(page);

        updater.refresh(2);
        let first = updater.displays().displays.clone();
        updater.refresh(2);
        assert_eq!(updater.displays().displays, first);
    }
}
