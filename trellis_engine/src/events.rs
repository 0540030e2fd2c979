// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Events the engine queues for the host.
//!
//! The engine never holds host callbacks. Mutations and scroll ticks push
//! [`EngineEvent`]s into an internal queue the host drains with
//! [`crate::Engine::drain_events`]; this keeps ownership one-directional and
//! makes event delivery reentrancy-free.

use alloc::collections::VecDeque;

use trellis_range::Range;

/// A notification queued by the engine for its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The window of visible logical rows changed (by scrolling, resizing,
    /// or row mutations). Carries the new window.
    RowVisibilityChange {
        /// First visible logical row index.
        start: usize,
        /// Number of visible rows.
        count: usize,
    },
    /// A scroll position changed on either axis.
    Scroll,
    /// A spacer entered or left the visible viewport.
    SpacerVisibilityChange {
        /// The spacer's anchor row index (`-1` is above the first row).
        row: i64,
        /// Whether the spacer is now at least partially visible.
        visible: bool,
    },
}

/// Queue of pending events, drained by the host.
#[derive(Debug, Default)]
pub(crate) struct EventSink {
    queue: VecDeque<EngineEvent>,
    last_visible: Option<Range>,
}

impl EventSink {
    pub(crate) fn push(&mut self, event: EngineEvent) {
        self.queue.push_back(event);
    }

    /// Queues a `RowVisibilityChange` only when the window actually moved.
    pub(crate) fn push_row_visibility(&mut self, visible: Range) {
        if self.last_visible == Some(visible) {
            return;
        }
        self.last_visible = Some(visible);
        self.queue.push_back(EngineEvent::RowVisibilityChange {
            start: visible.start(),
            count: visible.length(),
        });
    }

    pub(crate) fn pop(&mut self) -> Option<EngineEvent> {
        self.queue.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_visibility_deduplicates_unchanged_windows() {
        let mut sink = EventSink::default();
        sink.push_row_visibility(Range::between(5, 15));
        sink.push_row_visibility(Range::between(5, 15));
        sink.push_row_visibility(Range::between(6, 16));

        assert_eq!(
            sink.pop(),
            Some(EngineEvent::RowVisibilityChange { start: 5, count: 10 })
        );
        assert_eq!(
            sink.pop(),
            Some(EngineEvent::RowVisibilityChange { start: 6, count: 10 })
        );
        assert_eq!(sink.pop(), None);
    }

    #[test]
    fn scroll_events_are_not_deduplicated() {
        let mut sink = EventSink::default();
        sink.push(EngineEvent::Scroll);
        sink.push(EngineEvent::Scroll);
        assert_eq!(sink.pop(), Some(EngineEvent::Scroll));
        assert_eq!(sink.pop(), Some(EngineEvent::Scroll));
        assert_eq!(sink.pop(), None);
    }
}
