// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred-work bookkeeping.
//!
//! The engine is single-threaded and cooperative: work that must not run
//! reentrantly (scroll-to-row against possibly-stale layout) or that should
//! coalesce across a burst of events (display-order sorting, size
//! recalculation) is recorded here and drained once per host frame tick via
//! [`crate::Engine::flush_deferred`]. A stale entry reads fresh state at
//! flush time and degrades to a no-op when its precondition no longer holds.

use bitflags::bitflags;

use crate::scroller::ScrollDestination;

/// Debounce window for display-order sorting after the last scroll event.
pub(crate) const SORT_DEBOUNCE_MS: u64 = 20;

bitflags! {
    /// Pending deferred work.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub(crate) struct Pending: u8 {
        /// Reorder physical children to match visual order (debounced).
        const SORT_DISPLAY_ORDER = 1 << 0;
        /// A scroll-to-row/spacer request awaiting fresh layout.
        const SCROLL_TO_ROW = 1 << 1;
        /// Sections/scrollbars need a size recalculation pass.
        const RECALCULATE_SIZES = 1 << 2;
    }
}

/// A parked vertical scroll request. Only the most recent one is kept.
///
/// `row` is `-1` when the request targets only the spacer above the first
/// row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PendingRowScroll {
    pub(crate) row: i64,
    pub(crate) destination: ScrollDestination,
    pub(crate) padding: f64,
    /// Also bring the row's spacer into view.
    pub(crate) include_spacer: bool,
}

/// The deferred-work set drained by the host tick.
#[derive(Debug, Default)]
pub(crate) struct DeferredSet {
    pending: Pending,
    sort_due_at: u64,
    row_scroll: Option<PendingRowScroll>,
}

impl DeferredSet {
    /// Schedules (or re-debounces) the display-order sort.
    pub(crate) fn schedule_sort(&mut self, now_ms: u64) {
        self.pending.insert(Pending::SORT_DISPLAY_ORDER);
        self.sort_due_at = now_ms + SORT_DEBOUNCE_MS;
    }

    pub(crate) fn schedule_row_scroll(&mut self, scroll: PendingRowScroll) {
        self.pending.insert(Pending::SCROLL_TO_ROW);
        self.row_scroll = Some(scroll);
    }

    pub(crate) fn schedule_recalculate(&mut self) {
        self.pending.insert(Pending::RECALCULATE_SIZES);
    }

    /// Takes the recalculation flag if set.
    pub(crate) fn take_recalculate(&mut self) -> bool {
        let due = self.pending.contains(Pending::RECALCULATE_SIZES);
        self.pending.remove(Pending::RECALCULATE_SIZES);
        due
    }

    /// Takes the parked scroll request if one is pending.
    pub(crate) fn take_row_scroll(&mut self) -> Option<PendingRowScroll> {
        if !self.pending.contains(Pending::SCROLL_TO_ROW) {
            return None;
        }
        self.pending.remove(Pending::SCROLL_TO_ROW);
        self.row_scroll.take()
    }

    /// Takes the sort flag if its debounce window has elapsed.
    pub(crate) fn take_sort(&mut self, now_ms: u64) -> bool {
        if !self.pending.contains(Pending::SORT_DISPLAY_ORDER) || now_ms < self.sort_due_at {
            return false;
        }
        self.pending.remove(Pending::SORT_DISPLAY_ORDER);
        true
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_waits_for_debounce_window() {
        let mut d = DeferredSet::default();
        d.schedule_sort(100);
        assert!(!d.take_sort(110));
        assert!(d.take_sort(120));
        assert!(!d.take_sort(200));
    }

    #[test]
    fn repeated_scrolls_push_the_deadline_out() {
        let mut d = DeferredSet::default();
        d.schedule_sort(100);
        d.schedule_sort(115);
        assert!(!d.take_sort(120));
        assert!(d.take_sort(135));
    }

    #[test]
    fn last_row_scroll_wins() {
        let mut d = DeferredSet::default();
        d.schedule_row_scroll(PendingRowScroll {
            row: 5,
            destination: ScrollDestination::Start,
            padding: 0.0,
            include_spacer: false,
        });
        d.schedule_row_scroll(PendingRowScroll {
            row: 9,
            destination: ScrollDestination::End,
            padding: 2.0,
            include_spacer: true,
        });
        let taken = d.take_row_scroll().unwrap();
        assert_eq!(taken.row, 9);
        assert!(d.take_row_scroll().is_none());
        assert!(d.is_empty());
    }
}
