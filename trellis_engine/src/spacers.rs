// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spacers: out-of-band rows anchored below a logical row index.
//!
//! A spacer occupies vertical space between two data rows without being a
//! data row itself. Each spacer has an independent height, a content node,
//! and a decoration node that overlays the anchor row and the spacer
//! together. Spacers are folded into every position and scroll-size
//! calculation the body makes; the primitive that makes this tractable is
//! [`SpacerSet::heights_sum_between_px`], which converts between pixel spans
//! and spacer pixel occupancy under a per-boundary inclusion policy.
//!
//! [`SpacerSet`] owns the spacer bookkeeping and per-spacer geometry. The
//! scroll-position and row-offset compensation that a resize causes is
//! coordinated by the owning
//! [`ScrollingSection`](crate::scrolling_section::ScrollingSection), which
//! has access to the pooled rows and the scrollbars.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use core::fmt;

use kurbo::Size;
use smallvec::SmallVec;
use trellis_surface::{NodeId, Surface};

use crate::events::EventSink;
use crate::tracker::PositionTracker;
use crate::updater::{NullUpdater, SpacerRef, SpacerUpdater};
use crate::EngineEvent;

/// Policy for counting a spacer that straddles a pixel-range boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpacerInclusion {
    /// Count the whole spacer.
    Complete,
    /// Count only the part inside the range.
    Partial,
    /// Do not count the spacer at all.
    None,
}

/// Node handles and layout constants a spacer mutation needs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SpacerGeometry {
    /// The body section's root node; spacer content nodes live under it.
    pub(crate) body_root: NodeId,
    /// The decoration container node.
    pub(crate) deco_root: NodeId,
    /// Current horizontal scroll position; spacers are pinned to it.
    pub(crate) scroll_left: f64,
    /// Current full row width in pixels.
    pub(crate) row_width: f64,
    /// The body's default row height; decorations extend this far above the
    /// spacer to cover the anchor row.
    pub(crate) default_row_height: f64,
}

#[derive(Debug)]
struct Spacer {
    node: NodeId,
    deco: NodeId,
    height: f64,
    top: f64,
    visible: bool,
}

/// The body's collection of spacers, keyed by anchor row index.
///
/// Anchor `-1` denotes "above the first row"; all other anchors are logical
/// row indices. At most one spacer exists per anchor.
pub struct SpacerSet {
    spacers: BTreeMap<i64, Spacer>,
    updater: Box<dyn SpacerUpdater>,
}

impl fmt::Debug for SpacerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpacerSet")
            .field("spacers", &self.spacers)
            .finish_non_exhaustive()
    }
}

impl Default for SpacerSet {
    fn default() -> Self {
        Self {
            spacers: BTreeMap::new(),
            updater: Box::new(NullUpdater),
        }
    }
}

impl SpacerSet {
    /// Whether a spacer exists at `row`.
    #[must_use]
    pub fn exists(&self, row: i64) -> bool {
        self.spacers.contains_key(&row)
    }

    /// The number of spacers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.spacers.len()
    }

    /// The height of the spacer at `row`, or 0 if there is none.
    #[must_use]
    pub fn height_of(&self, row: i64) -> f64 {
        self.spacers.get(&row).map_or(0.0, |s| s.height)
    }

    /// The recorded top position of the spacer at `row`.
    #[must_use]
    pub fn top_of(&self, row: i64) -> Option<f64> {
        self.spacers.get(&row).map(|s| s.top)
    }

    /// Anchor rows in ascending order.
    pub fn rows(&self) -> impl Iterator<Item = i64> + '_ {
        self.spacers.keys().copied()
    }

    /// The sum of all spacer heights.
    #[must_use]
    pub fn heights_sum(&self) -> f64 {
        self.spacers.values().map(|s| s.height).sum()
    }

    /// The sum of spacer heights for anchors strictly below `logical_index`.
    #[must_use]
    pub fn heights_sum_until_index(&self, logical_index: i64) -> f64 {
        self.spacers
            .range(..logical_index)
            .map(|(_, s)| s.height)
            .sum()
    }

    /// The sum of spacer heights for anchors at or above `logical_index`.
    #[must_use]
    pub fn heights_sum_from_index(&self, logical_index: i64) -> f64 {
        self.spacers
            .range(logical_index..)
            .map(|(_, s)| s.height)
            .sum()
    }

    /// Spacer pixels between the top of the body and `px`, counting spacers
    /// straddling either end fractionally.
    #[must_use]
    pub fn heights_sum_until_px(&self, px: f64) -> f64 {
        self.heights_sum_between_px(0.0, SpacerInclusion::Partial, px, SpacerInclusion::Partial)
    }

    /// The amount of pixels occupied by spacers between two pixel points.
    ///
    /// A spacer lying fully inside the span always counts fully; a spacer
    /// straddling `range_top` is counted per `top_inclusion`, one straddling
    /// `range_bottom` per `bottom_inclusion`. When a single spacer covers the
    /// whole span, the top inclusion wins.
    #[must_use]
    pub fn heights_sum_between_px(
        &self,
        range_top: f64,
        top_inclusion: SpacerInclusion,
        range_bottom: f64,
        bottom_inclusion: SpacerInclusion,
    ) -> f64 {
        debug_assert!(
            range_top <= range_bottom,
            "range top must not exceed range bottom"
        );

        let mut heights = 0.0;

        for spacer in self.spacers.values() {
            let top = spacer.top;
            let height = spacer.height;
            let bottom = top + height;

            let top_above = top < range_top;
            let top_inside = range_top <= top && top <= range_bottom;
            let bottom_inside = range_top <= bottom && bottom <= range_bottom;
            let bottom_below = range_bottom < bottom;

            if bottom < range_top {
                // Entirely above the span.
                continue;
            }
            if range_bottom < top {
                // Spacers are ordered by position; nothing further overlaps.
                return heights;
            }

            if top_above && bottom_inside {
                match top_inclusion {
                    SpacerInclusion::Partial => heights += bottom - range_top,
                    SpacerInclusion::Complete => heights += height,
                    SpacerInclusion::None => {}
                }
            } else if top_above && bottom_below {
                // One spacer swallows the whole span; the top inclusion has
                // the honor of resolving the conflict.
                return match top_inclusion {
                    SpacerInclusion::None => 0.0,
                    SpacerInclusion::Complete => height,
                    SpacerInclusion::Partial => range_bottom - range_top,
                };
            } else if top_inside && bottom_inside {
                heights += height;
            } else if top_inside && bottom_below {
                match bottom_inclusion {
                    SpacerInclusion::Partial => heights += range_bottom - top,
                    SpacerInclusion::Complete => heights += height,
                    SpacerInclusion::None => {}
                }
                return heights;
            } else {
                debug_assert!(false, "unaccounted-for spacer overlap case");
            }
        }

        heights
    }

    /// Replaces the spacer updater, destroying all current content through
    /// the old updater and re-initializing it through the new one.
    pub(crate) fn set_updater(&mut self, updater: Box<dyn SpacerUpdater>) {
        let refs: SmallVec<[SpacerRef; 4]> = self
            .spacers
            .iter()
            .map(|(row, s)| SpacerRef {
                row: *row,
                node: s.node,
                height: s.height,
            })
            .collect();
        for r in &refs {
            self.updater.destroy(*r);
        }
        self.updater = updater;
        for r in &refs {
            self.updater.init(*r);
        }
    }

    /// Creates the nodes for a new spacer at `row` with zero height,
    /// positioned at `anchor_top`. The caller applies the real height (and
    /// its compensation) afterwards, then calls [`Self::init_content`].
    pub(crate) fn insert<S: Surface>(
        &mut self,
        surface: &mut S,
        tracker: &mut PositionTracker,
        geo: SpacerGeometry,
        row: i64,
        anchor_top: f64,
    ) {
        debug_assert!(!self.exists(row), "spacer already exists at row {row}");

        let end = surface.child_count(geo.body_root);
        let node = surface.create_child(geo.body_root, end);
        let deco_end = surface.child_count(geo.deco_root);
        let deco = surface.create_child(geo.deco_root, deco_end);

        tracker.set(surface, node, geo.scroll_left, anchor_top);
        tracker.set(surface, deco, 0.0, anchor_top - geo.default_row_height);
        surface.set_extent(node, Size::new(geo.row_width, 0.0));
        surface.set_extent(deco, Size::new(geo.row_width, geo.default_row_height));

        self.spacers.insert(
            row,
            Spacer {
                node,
                deco,
                height: 0.0,
                top: anchor_top,
                visible: true,
            },
        );
    }

    /// Applies a new height to the spacer at `row`: node extents, decoration
    /// geometry, and the positions of every spacer below it. Returns the
    /// height delta; the caller owns the row-offset and scroll compensation.
    pub(crate) fn set_height_local<S: Surface>(
        &mut self,
        surface: &mut S,
        tracker: &mut PositionTracker,
        geo: SpacerGeometry,
        row: i64,
        height: f64,
    ) -> f64 {
        debug_assert!(height >= 0.0, "spacer height must be >= 0 (was {height})");

        let Some(spacer) = self.spacers.get_mut(&row) else {
            debug_assert!(false, "resizing a spacer that does not exist at row {row}");
            log::warn!("skipping resize of missing spacer at row {row}");
            return 0.0;
        };

        let height_diff = height - spacer.height.max(0.0);
        spacer.height = height;
        surface.set_extent(spacer.node, Size::new(geo.row_width, height));
        surface.set_extent(
            spacer.deco,
            Size::new(geo.row_width, height + geo.default_row_height),
        );

        self.shift_positions_after_row(surface, tracker, geo, row, height_diff);
        height_diff
    }

    /// Moves every spacer anchored strictly after `row` by `diff_px`.
    pub(crate) fn shift_positions_after_row<S: Surface>(
        &mut self,
        surface: &mut S,
        tracker: &mut PositionTracker,
        geo: SpacerGeometry,
        row: i64,
        diff_px: f64,
    ) {
        if diff_px == 0.0 {
            return;
        }
        for spacer in self.spacers.range_mut((row + 1)..).map(|(_, s)| s) {
            spacer.top += diff_px;
            tracker.set(surface, spacer.node, geo.scroll_left, spacer.top);
            tracker.set(
                surface,
                spacer.deco,
                0.0,
                spacer.top - geo.default_row_height,
            );
        }
    }

    /// Shifts spacers anchored at or after `index` by `delta` rows, moving
    /// both their anchor indices and their pixel positions.
    pub(crate) fn shift_by_rows<S: Surface>(
        &mut self,
        surface: &mut S,
        tracker: &mut PositionTracker,
        geo: SpacerGeometry,
        index: i64,
        delta: i64,
    ) {
        if delta == 0 {
            return;
        }
        #[expect(
            clippy::cast_precision_loss,
            reason = "row deltas are small viewport-scale numbers"
        )]
        let px_diff = delta as f64 * geo.default_row_height;

        let keys: SmallVec<[i64; 4]> = self.spacers.range(index..).map(|(k, _)| *k).collect();
        let mut moved: SmallVec<[(i64, Spacer); 4]> = SmallVec::new();
        for k in keys {
            if let Some(spacer) = self.spacers.remove(&k) {
                moved.push((k, spacer));
            }
        }
        for (row, mut spacer) in moved {
            spacer.top += px_diff;
            tracker.set(surface, spacer.node, geo.scroll_left, spacer.top);
            tracker.set(
                surface,
                spacer.deco,
                0.0,
                spacer.top - geo.default_row_height,
            );
            let previous = self.spacers.insert(row + delta, spacer);
            debug_assert!(
                previous.is_none(),
                "spacer shift collided at row {}",
                row + delta
            );
        }
    }

    /// Anchor rows inside `[start, end)`, ascending.
    pub(crate) fn rows_in_range(&self, start: i64, end: i64) -> SmallVec<[i64; 4]> {
        self.spacers.range(start..end).map(|(k, _)| *k).collect()
    }

    /// The content node of the spacer at `row`.
    pub(crate) fn node_of(&self, row: i64) -> Option<NodeId> {
        self.spacers.get(&row).map(|s| s.node)
    }

    /// Marks the spacer at `row` visible without an intersection check.
    pub(crate) fn show<S: Surface>(&mut self, surface: &mut S, row: i64) {
        if let Some(spacer) = self.spacers.get_mut(&row) {
            if !spacer.visible {
                spacer.visible = true;
                surface.set_hidden(spacer.node, false);
                surface.set_hidden(spacer.deco, false);
            }
        }
    }

    /// Moves every spacer intersecting or below `from_px` by `px_diff`
    /// pixels and `row_diff` anchor rows. Used when whole screenfuls of rows
    /// appear or vanish above the viewport and everything below must follow.
    pub(crate) fn shift_after_px<S: Surface>(
        &mut self,
        surface: &mut S,
        tracker: &mut PositionTracker,
        geo: SpacerGeometry,
        from_px: f64,
        px_diff: f64,
        row_diff: i64,
    ) {
        let keys: SmallVec<[i64; 4]> = self
            .spacers
            .iter()
            .filter(|(_, s)| s.top + s.height > from_px)
            .map(|(k, _)| *k)
            .collect();
        let mut moved: SmallVec<[(i64, Spacer); 4]> = SmallVec::new();
        for k in keys {
            if let Some(spacer) = self.spacers.remove(&k) {
                moved.push((k, spacer));
            }
        }
        for (row, mut spacer) in moved {
            spacer.top += px_diff;
            tracker.set(surface, spacer.node, geo.scroll_left, spacer.top);
            tracker.set(
                surface,
                spacer.deco,
                0.0,
                spacer.top - geo.default_row_height,
            );
            let previous = self.spacers.insert(row + row_diff, spacer);
            debug_assert!(
                previous.is_none(),
                "spacer shift collided at row {}",
                row + row_diff
            );
        }
    }

    /// Removes the spacer's nodes and bookkeeping. Content destruction and
    /// height compensation must have happened already.
    pub(crate) fn discard<S: Surface>(
        &mut self,
        surface: &mut S,
        tracker: &mut PositionTracker,
        row: i64,
    ) {
        if let Some(spacer) = self.spacers.remove(&row) {
            tracker.remove(spacer.node);
            tracker.remove(spacer.deco);
            surface.remove_node(spacer.node);
            surface.remove_node(spacer.deco);
        }
    }

    /// Runs the updater's `init` for the spacer at `row`.
    pub(crate) fn init_content(&mut self, row: i64) {
        if let Some(spacer) = self.spacers.get(&row) {
            self.updater.init(SpacerRef {
                row,
                node: spacer.node,
                height: spacer.height,
            });
        }
    }

    /// Runs the updater's `update` for the spacer at `row`.
    pub(crate) fn update_content(&mut self, row: i64) {
        if let Some(spacer) = self.spacers.get(&row) {
            self.updater.update(SpacerRef {
                row,
                node: spacer.node,
                height: spacer.height,
            });
        }
    }

    /// Runs the updater's `destroy` for the spacer at `row`.
    pub(crate) fn destroy_content(&mut self, row: i64) {
        if let Some(spacer) = self.spacers.get(&row) {
            self.updater.destroy(SpacerRef {
                row,
                node: spacer.node,
                height: spacer.height,
            });
        }
    }

    /// Re-pins every spacer to the current horizontal scroll position.
    pub(crate) fn reposition_horizontal<S: Surface>(
        &mut self,
        surface: &mut S,
        tracker: &mut PositionTracker,
        scroll_left: f64,
    ) {
        for spacer in self.spacers.values() {
            tracker.set(surface, spacer.node, scroll_left, spacer.top);
        }
    }

    /// Applies the current row width to every spacer node.
    pub(crate) fn reapply_widths<S: Surface>(&mut self, surface: &mut S, geo: SpacerGeometry) {
        for spacer in self.spacers.values() {
            surface.set_extent(spacer.node, Size::new(geo.row_width, spacer.height));
            surface.set_extent(
                spacer.deco,
                Size::new(geo.row_width, spacer.height + geo.default_row_height),
            );
        }
    }

    /// Shows or hides each spacer based on viewport intersection, queueing a
    /// visibility event for each transition.
    pub(crate) fn update_visibility<S: Surface>(
        &mut self,
        surface: &mut S,
        viewport_top: f64,
        viewport_bottom: f64,
        events: &mut EventSink,
    ) {
        for (row, spacer) in &mut self.spacers {
            let bottom = spacer.top + spacer.height;
            let visible = spacer.top < viewport_bottom && viewport_top < bottom;
            if visible != spacer.visible {
                spacer.visible = visible;
                surface.set_hidden(spacer.node, !visible);
                surface.set_hidden(spacer.deco, !visible);
                events.push(EngineEvent::SpacerVisibilityChange { row: *row, visible });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_surface::TestSurface;

    fn geo(surface: &mut TestSurface) -> SpacerGeometry {
        let root = surface.root();
        let body_root = surface.create_child(root, 0);
        let deco_root = surface.create_child(root, 1);
        SpacerGeometry {
            body_root,
            deco_root,
            scroll_left: 0.0,
            row_width: 300.0,
            default_row_height: 20.0,
        }
    }

    /// Builds a set with spacers of `height` at the given (row, top) pairs.
    fn set_with(
        surface: &mut TestSurface,
        tracker: &mut PositionTracker,
        geo: SpacerGeometry,
        spacers: &[(i64, f64, f64)],
    ) -> SpacerSet {
        let mut set = SpacerSet::default();
        for (row, top, height) in spacers {
            set.insert(surface, tracker, geo, *row, *top);
            set.set_height_local(surface, tracker, geo, *row, *height);
        }
        set
    }

    #[test]
    fn basic_bookkeeping() {
        let mut surface = TestSurface::default();
        let mut tracker = PositionTracker::default();
        let geo = geo(&mut surface);
        let set = set_with(
            &mut surface,
            &mut tracker,
            geo,
            &[(3, 80.0, 50.0), (10, 260.0, 30.0)],
        );

        assert!(set.exists(3));
        assert!(!set.exists(4));
        assert_eq!(set.height_of(3), 50.0);
        assert_eq!(set.height_of(4), 0.0);
        assert_eq!(set.heights_sum(), 80.0);
        assert_eq!(set.heights_sum_until_index(10), 50.0);
        assert_eq!(set.heights_sum_until_index(11), 80.0);
        assert_eq!(set.heights_sum_from_index(10), 30.0);
    }

    #[test]
    fn resize_shifts_later_spacers_only() {
        let mut surface = TestSurface::default();
        let mut tracker = PositionTracker::default();
        let geo = geo(&mut surface);
        let mut set = set_with(
            &mut surface,
            &mut tracker,
            geo,
            &[(3, 80.0, 50.0), (10, 260.0, 30.0)],
        );

        let diff = set.set_height_local(&mut surface, &mut tracker, geo, 3, 70.0);
        assert_eq!(diff, 20.0);
        assert_eq!(set.top_of(3), Some(80.0));
        assert_eq!(set.top_of(10), Some(280.0));
    }

    #[test]
    fn sum_between_partial_boundaries() {
        let mut surface = TestSurface::default();
        let mut tracker = PositionTracker::default();
        let geo = geo(&mut surface);
        // Spacer occupies [100, 150).
        let set = set_with(&mut surface, &mut tracker, geo, &[(5, 100.0, 50.0)]);

        // Fully inside.
        assert_eq!(
            set.heights_sum_between_px(0.0, SpacerInclusion::Partial, 200.0, SpacerInclusion::Partial),
            50.0
        );
        // Straddles the bottom boundary.
        assert_eq!(
            set.heights_sum_between_px(0.0, SpacerInclusion::Partial, 120.0, SpacerInclusion::Partial),
            20.0
        );
        assert_eq!(
            set.heights_sum_between_px(0.0, SpacerInclusion::Partial, 120.0, SpacerInclusion::Complete),
            50.0
        );
        assert_eq!(
            set.heights_sum_between_px(0.0, SpacerInclusion::Partial, 120.0, SpacerInclusion::None),
            0.0
        );
        // Straddles the top boundary.
        assert_eq!(
            set.heights_sum_between_px(130.0, SpacerInclusion::Partial, 200.0, SpacerInclusion::Partial),
            20.0
        );
        assert_eq!(
            set.heights_sum_between_px(130.0, SpacerInclusion::Complete, 200.0, SpacerInclusion::Partial),
            50.0
        );
        assert_eq!(
            set.heights_sum_between_px(130.0, SpacerInclusion::None, 200.0, SpacerInclusion::Partial),
            0.0
        );
    }

    #[test]
    fn sum_when_one_spacer_swallows_the_span() {
        let mut surface = TestSurface::default();
        let mut tracker = PositionTracker::default();
        let geo = geo(&mut surface);
        let set = set_with(&mut surface, &mut tracker, geo, &[(5, 100.0, 50.0)]);

        // Span [110, 140) lies inside the spacer; the top inclusion decides.
        assert_eq!(
            set.heights_sum_between_px(110.0, SpacerInclusion::Partial, 140.0, SpacerInclusion::None),
            30.0
        );
        assert_eq!(
            set.heights_sum_between_px(110.0, SpacerInclusion::Complete, 140.0, SpacerInclusion::None),
            50.0
        );
        assert_eq!(
            set.heights_sum_between_px(110.0, SpacerInclusion::None, 140.0, SpacerInclusion::Complete),
            0.0
        );
    }

    #[test]
    fn shift_by_rows_moves_anchor_and_position() {
        let mut surface = TestSurface::default();
        let mut tracker = PositionTracker::default();
        let geo = geo(&mut surface);
        let mut set = set_with(
            &mut surface,
            &mut tracker,
            geo,
            &[(3, 80.0, 50.0), (10, 260.0, 30.0)],
        );

        // Two rows inserted at index 5: the row-3 spacer stays put.
        set.shift_by_rows(&mut surface, &mut tracker, geo, 5, 2);
        assert!(set.exists(3));
        assert!(set.exists(12));
        assert!(!set.exists(10));
        assert_eq!(set.top_of(3), Some(80.0));
        assert_eq!(set.top_of(12), Some(300.0));
    }

    #[test]
    fn discard_removes_nodes() {
        let mut surface = TestSurface::default();
        let mut tracker = PositionTracker::default();
        let geo = geo(&mut surface);
        let mut set = set_with(&mut surface, &mut tracker, geo, &[(3, 80.0, 50.0)]);

        assert_eq!(surface.child_count(geo.body_root), 1);
        set.discard(&mut surface, &mut tracker, 3);
        assert!(!set.exists(3));
        assert_eq!(surface.child_count(geo.body_root), 0);
        assert_eq!(surface.child_count(geo.deco_root), 0);
    }

    #[test]
    fn visibility_transitions_queue_events() {
        let mut surface = TestSurface::default();
        let mut tracker = PositionTracker::default();
        let geo = geo(&mut surface);
        let mut set = set_with(&mut surface, &mut tracker, geo, &[(5, 100.0, 50.0)]);
        let mut events = EventSink::default();

        // Viewport below the spacer: it transitions to hidden.
        set.update_visibility(&mut surface, 300.0, 500.0, &mut events);
        assert_eq!(
            events.pop(),
            Some(EngineEvent::SpacerVisibilityChange {
                row: 5,
                visible: false
            })
        );
        // Unchanged on a repeat pass.
        set.update_visibility(&mut surface, 300.0, 500.0, &mut events);
        assert_eq!(events.pop(), None);

        // Scrolled back up: visible again.
        set.update_visibility(&mut surface, 80.0, 280.0, &mut events);
        assert_eq!(
            events.pop(),
            Some(EngineEvent::SpacerVisibilityChange {
                row: 5,
                visible: true
            })
        );
    }
}
