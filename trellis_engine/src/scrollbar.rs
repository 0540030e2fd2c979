// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scrollbar state for one axis.

/// Virtual scrollbar state for one axis.
///
/// `scroll_size` is the virtual extent of the content, `offset_size` the
/// extent of the window onto it. The position is clamped into
/// `[0, max(0, scroll_size - offset_size)]` on every write, matching how a
/// browser scrollbar silently clamps out-of-range assignments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scrollbar {
    scroll_pos: f64,
    offset_size: f64,
    scroll_size: f64,
    thickness: f64,
    locked: bool,
}

impl Default for Scrollbar {
    fn default() -> Self {
        Self {
            scroll_pos: 0.0,
            offset_size: 0.0,
            scroll_size: 0.0,
            thickness: 16.0,
            locked: false,
        }
    }
}

impl Scrollbar {
    /// Current scroll position.
    #[must_use]
    pub fn scroll_pos(&self) -> f64 {
        self.scroll_pos
    }

    /// Window extent along this axis.
    #[must_use]
    pub fn offset_size(&self) -> f64 {
        self.offset_size
    }

    /// Virtual content extent along this axis.
    #[must_use]
    pub fn scroll_size(&self) -> f64 {
        self.scroll_size
    }

    /// Thickness of the scrollbar widget across this axis.
    #[must_use]
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// Whether input-driven scrolling is ignored on this axis.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Locks or unlocks input-driven scrolling. Programmatic scrolls are
    /// unaffected.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Sets the thickness of the scrollbar widget.
    pub fn set_thickness(&mut self, thickness: f64) {
        debug_assert!(thickness >= 0.0, "scrollbar thickness must not be negative");
        self.thickness = thickness.max(0.0);
    }

    /// Sets the position, clamped into the valid span. Returns the clamped
    /// position actually applied.
    pub fn set_scroll_pos(&mut self, pos: f64) -> f64 {
        debug_assert!(pos.is_finite(), "scroll position must be finite");
        let max = (self.scroll_size - self.offset_size).max(0.0);
        self.scroll_pos = if pos.is_finite() { pos.clamp(0.0, max) } else { 0.0 };
        self.scroll_pos
    }

    /// Adjusts the position by a delta, clamped. Returns the applied position.
    pub fn scroll_by(&mut self, delta: f64) -> f64 {
        self.set_scroll_pos(self.scroll_pos + delta)
    }

    /// Sets the window extent and re-clamps the position.
    pub fn set_offset_size(&mut self, size: f64) {
        debug_assert!(size.is_finite(), "offset size must be finite");
        self.offset_size = size.max(0.0);
        self.set_scroll_pos(self.scroll_pos);
    }

    /// Sets the virtual content extent and re-clamps the position.
    pub fn set_scroll_size(&mut self, size: f64) {
        debug_assert!(size.is_finite(), "scroll size must be finite");
        self.scroll_size = size.max(0.0);
        self.set_scroll_pos(self.scroll_pos);
    }

    /// Whether the content overflows the window on this axis.
    #[must_use]
    pub fn shows_scroll_handle(&self) -> bool {
        self.scroll_size > self.offset_size
    }
}
