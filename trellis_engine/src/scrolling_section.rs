// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The body: a virtualized row section backed by a bounded row pool.
//!
//! Only enough rows to cover the viewport (plus one) are ever materialized.
//! As the viewport scrolls, rows that leave it on one side are moved to the
//! other side and rebound to new logical indices, so the pool window slides
//! over the logical row range without creating or destroying nodes.
//!
//! Three coordinate systems meet here. A *logical* index addresses a row in
//! the data set. A *visual* index addresses a slot in the on-screen window;
//! the pool is kept spatially contiguous, so
//! `logical == top_row_logical_index + visual` always holds. The *physical*
//! order of nodes under the section root is unrelated to either and is
//! periodically normalized by [`ScrollingSection::sort_display_order`].

use alloc::vec::Vec;

use alloc::boxed::Box;
use alloc::format;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use trellis_range::Range;
use trellis_surface::{NodeId, Surface};

use crate::error::{EngineError, Result};
use crate::events::EventSink;
use crate::section::{RowSection, SectionCore, SectionCtx, SectionRow};
use crate::spacers::{SpacerGeometry, SpacerSet};
use crate::updater::{RowUpdater, SpacerUpdater};

#[expect(
    clippy::cast_precision_loss,
    reason = "row counts stay far below the f64 integer limit"
)]
fn rows_to_px(rows: usize, row_height: f64) -> f64 {
    rows as f64 * row_height
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "non-negative pixel offsets divided by a >= 1px row height"
)]
fn px_to_rows_floor(px: f64, row_height: f64) -> usize {
    (px.max(0.0) / row_height) as usize
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "non-negative pixel offsets divided by a >= 1px row height"
)]
fn px_to_rows_ceil(px: f64, row_height: f64) -> usize {
    (px.max(0.0) / row_height).ceil() as usize
}

#[expect(
    clippy::cast_possible_wrap,
    reason = "logical row indices stay far below i64::MAX"
)]
fn spacer_anchor(logical: usize) -> i64 {
    logical as i64
}

/// The scrolling body section.
pub struct ScrollingSection {
    core: SectionCore,
    /// Pooled rows in visual order. Invariant: the pool covers the logical
    /// rows `top_row_logical_index .. top_row_logical_index + rows.len()`.
    rows: Vec<SectionRow>,
    top_row_logical_index: usize,
    spacers: SpacerSet,
    deco_root: Option<NodeId>,
    /// The body's synced scroll offsets. These trail the scrollbars; they
    /// only change when [`Self::set_body_scroll_position`] runs.
    scroll_top: f64,
    scroll_left: f64,
    /// The pixel height available to the body between header and footer.
    height_of_section: f64,
}

impl core::fmt::Debug for ScrollingSection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScrollingSection")
            .field("row_count", &self.core.row_count())
            .field("pool", &self.rows.len())
            .field("top_row_logical_index", &self.top_row_logical_index)
            .field("spacers", &self.spacers)
            .field("scroll_top", &self.scroll_top)
            .field("scroll_left", &self.scroll_left)
            .finish_non_exhaustive()
    }
}

impl Default for ScrollingSection {
    fn default() -> Self {
        Self {
            core: SectionCore::default(),
            rows: Vec::new(),
            top_row_logical_index: 0,
            spacers: SpacerSet::default(),
            deco_root: None,
            scroll_top: 0.0,
            scroll_left: 0.0,
            height_of_section: 0.0,
        }
    }
}

impl RowSection for ScrollingSection {
    fn row_count(&self) -> usize {
        self.core.row_count()
    }

    fn materialized_row_count(&self) -> usize {
        self.rows.len()
    }

    fn default_row_height(&self) -> f64 {
        self.core.default_row_height()
    }

    fn section_height(&self) -> f64 {
        self.height_of_section
    }
}

impl ScrollingSection {
    /// The logical index of the topmost pooled row.
    #[must_use]
    pub fn top_row_logical_index(&self) -> usize {
        self.top_row_logical_index
    }

    /// The logical rows currently covered by the pool.
    #[must_use]
    pub fn visible_row_range(&self) -> Range {
        Range::with_length(self.top_row_logical_index, self.rows.len())
    }

    /// Read access to the spacer collection.
    #[must_use]
    pub fn spacers(&self) -> &SpacerSet {
        &self.spacers
    }

    /// The full scrollable height: all logical rows plus all spacers.
    #[must_use]
    pub fn scroll_height(&self) -> f64 {
        self.core.total_row_height() + self.spacers.heights_sum()
    }

    /// The correct top position for a row at `logical_index`, whether or not
    /// one is materialized there.
    #[must_use]
    pub fn row_top(&self, logical_index: usize) -> f64 {
        self.spacers
            .heights_sum_until_index(spacer_anchor(logical_index))
            + rows_to_px(logical_index, self.core.default_row_height())
    }

    /// How many pooled rows the current section height calls for.
    #[must_use]
    pub fn max_row_capacity(&self) -> usize {
        px_to_rows_ceil(self.height_of_section, self.core.default_row_height()) + 1
    }

    pub(crate) fn set_section_height(&mut self, height: f64) {
        self.height_of_section = height.max(0.0);
    }

    pub(crate) fn set_updater(&mut self, updater: Box<dyn RowUpdater>) {
        self.core.set_updater(updater);
    }

    pub(crate) fn set_spacer_updater(&mut self, updater: Box<dyn SpacerUpdater>) {
        self.spacers.set_updater(updater);
    }

    fn geometry<S: Surface>(&self, ctx: &SectionCtx<'_, S>) -> SpacerGeometry {
        SpacerGeometry {
            body_root: self.core.root(),
            deco_root: self.deco_root.unwrap_or(self.core.root()),
            scroll_left: self.scroll_left,
            row_width: ctx.columns.row_width().max(0.0),
            default_row_height: self.core.default_row_height(),
        }
    }

    fn fire_visibility(&self, events: &mut EventSink) {
        events.push_row_visibility(self.visible_row_range());
    }

    // ---------------------------------------------------------------------
    // Attach / detach

    /// Creates the body root and the spacer decoration container, then fills
    /// the pool.
    pub(crate) fn attach<S: Surface>(&mut self, ctx: &mut SectionCtx<'_, S>, child_index: usize) {
        debug_assert!(self.rows.is_empty(), "attach with rows already materialized");
        let engine_root = ctx.surface.root();
        let root = ctx.surface.create_child(engine_root, child_index);
        let deco_end = ctx.surface.child_count(engine_root);
        let deco = ctx.surface.create_child(engine_root, deco_end);
        self.core.set_root(Some(root));
        self.deco_root = Some(deco);
        self.set_body_scroll_position(ctx, 0.0, 0.0);
        self.verify_row_pool(ctx);
    }

    /// Tears down pooled rows, spacers, and the section roots.
    pub(crate) fn detach<S: Surface>(&mut self, ctx: &mut SectionCtx<'_, S>) {
        let top = self.top_row_logical_index;
        for (i, row) in core::mem::take(&mut self.rows).into_iter().enumerate() {
            self.core.detach_row(ctx, &row, top + i);
        }
        let anchors: Vec<i64> = self.spacers.rows().collect();
        for row in anchors {
            self.spacers.destroy_content(row);
            self.spacers.discard(ctx.surface, ctx.tracker, row);
        }
        if self.core.is_attached() {
            ctx.tracker.remove(self.core.root());
            ctx.surface.remove_node(self.core.root());
        }
        if let Some(deco) = self.deco_root.take() {
            ctx.tracker.remove(deco);
            ctx.surface.remove_node(deco);
        }
        self.core.set_root(None);
        self.top_row_logical_index = 0;
        self.scroll_top = 0.0;
        self.scroll_left = 0.0;
    }

    pub(crate) fn is_materialized(&self) -> bool {
        self.core.is_attached()
    }

    pub(crate) fn root(&self) -> NodeId {
        self.core.root()
    }

    // ---------------------------------------------------------------------
    // Scroll synchronization

    /// Moves the body and decoration containers to reflect a scroll offset.
    pub(crate) fn set_body_scroll_position<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        scroll_left: f64,
        scroll_top: f64,
    ) {
        self.scroll_left = scroll_left;
        self.scroll_top = scroll_top;
        if self.core.is_attached() {
            ctx.tracker
                .set(ctx.surface, self.core.root(), -scroll_left, -scroll_top);
        }
        if let Some(deco) = self.deco_root {
            ctx.tracker.set(ctx.surface, deco, 0.0, -scroll_top);
        }
    }

    /// Slides the pool window to cover the viewport after a vertical scroll.
    /// Returns whether any rows were moved; the caller should then schedule
    /// a display-order sort.
    pub(crate) fn update_rows_on_scroll<S: Surface>(&mut self, ctx: &mut SectionCtx<'_, S>) -> bool {
        if self.rows.is_empty() {
            return false;
        }

        let drh = self.core.default_row_height();
        let top_spacer_anchor = spacer_anchor(self.top_row_logical_index) - 1;
        // A spacer directly above the pool window counts as the topmost
        // element; the next row begins below it.
        let (top_element_position, next_row_bottom_offset) =
            match self.spacers.top_of(top_spacer_anchor) {
                Some(top) => (top, self.spacers.height_of(top_spacer_anchor) + drh),
                None => (ctx.tracker.top(self.rows[0].node), drh),
            };

        let scroll_top = self.scroll_top;
        let viewport_offset = top_element_position - scroll_top;
        let mut rows_were_moved = false;

        if viewport_offset > 0.0 {
            // Empty room on top: move rows from the bottom of the pool up.
            let row_px = self.row_heights_sum_between_px(scroll_top, top_element_position);
            let original_rows_to_move = px_to_rows_ceil(row_px, drh);
            let rows_to_move = original_rows_to_move.min(self.rows.len());

            let end = self.rows.len();
            let start = end - rows_to_move;
            let logical_index = self.logical_row_index_at(scroll_top);

            self.move_and_update_rows(ctx, Range::between(start, end), 0, logical_index);
            self.top_row_logical_index = logical_index;
            rows_were_moved = true;
        } else if viewport_offset + next_row_bottom_offset <= 0.0 {
            // The viewport has been scrolled past the topmost pooled row.
            let row_px = self.row_heights_sum_between_px(top_element_position, scroll_top);
            let original_rows_to_move = px_to_rows_floor(row_px, drh);
            let mut rows_to_move = original_rows_to_move.min(self.rows.len());

            let row_count = self.core.row_count();
            let logical_index = if rows_to_move < self.rows.len() {
                // Scrolled so little that the moved rows continue the pool.
                self.top_row_logical_index + self.rows.len()
            } else {
                // The whole pool moves; derive the window from the scroll
                // position instead.
                self.logical_row_index_at(scroll_top)
            };

            let target_visual_index = self.rows.len();

            // Don't move rows over the data boundary.
            let mut a_row_was_left_behind = false;
            if logical_index + rows_to_move > row_count {
                rows_to_move = rows_to_move.saturating_sub(1);
                a_row_was_left_behind = true;
            }
            // Spacers on the last rows can let the viewport scroll beyond
            // the row content.
            rows_to_move = rows_to_move.min(row_count.saturating_sub(logical_index));

            self.move_and_update_rows(
                ctx,
                Range::with_length(0, rows_to_move),
                target_visual_index,
                logical_index,
            );

            if a_row_was_left_behind {
                // Keep the pool spatially contiguous: the one row that was
                // not moved still belongs at the top of the window, counted
                // backwards from the end of the data.
                let top_logical_index = row_count - self.rows.len();
                self.move_and_update_rows(ctx, Range::with_only(0), 0, top_logical_index);
            }

            let naive_new_logical_index = self.top_row_logical_index + original_rows_to_move;
            let max_logical_index = row_count - self.rows.len();
            self.top_row_logical_index = naive_new_logical_index.min(max_logical_index);
            rows_were_moved = true;
        }

        if rows_were_moved {
            self.fire_visibility(ctx.events);
        }
        rows_were_moved
    }

    /// Row pixels (spacer pixels excluded) between two positions.
    fn row_heights_sum_between_px(&self, y1: f64, y2: f64) -> f64 {
        debug_assert!(y1 <= y2, "y1 must not exceed y2");
        let spacer_px = self.spacers.heights_sum_between_px(
            y1,
            crate::spacers::SpacerInclusion::Partial,
            y2,
            crate::spacers::SpacerInclusion::Partial,
        );
        (y2 - y1) - spacer_px
    }

    /// The logical index of the row at pixel position `px`.
    fn logical_row_index_at(&self, px: f64) -> usize {
        let row_px = px - self.spacers.heights_sum_until_px(px);
        px_to_rows_floor(row_px, self.core.default_row_height())
    }

    // ---------------------------------------------------------------------
    // Pool maintenance

    /// Moves pooled rows to a new place in the visual order, rebinds them to
    /// new logical indices, and repositions them.
    fn move_and_update_rows<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        visual_source_range: Range,
        visual_target_index: usize,
        logical_target_index: usize,
    ) {
        if visual_source_range.is_empty() {
            return;
        }

        debug_assert!(
            visual_target_index <= self.rows.len(),
            "visual target outside of the pool"
        );
        debug_assert!(
            logical_target_index + visual_source_range.length() <= self.core.row_count(),
            "logical target leads outside of the data range"
        );

        // Removing a range shifts everything after it, so a forward move
        // lands earlier than the nominal target.
        let adjusted_visual_target = if visual_source_range.start() < visual_target_index {
            visual_target_index - visual_source_range.length()
        } else {
            visual_target_index
        };

        if visual_source_range.start() != adjusted_visual_target {
            let moved: Vec<SectionRow> = self
                .rows
                .drain(visual_source_range.start()..visual_source_range.end())
                .collect();
            for (offset, row) in moved.into_iter().enumerate() {
                self.rows.insert(adjusted_visual_target + offset, row);
            }
        }

        let drh = self.core.default_row_height();
        let mut new_row_top = self.row_top(logical_target_index);
        for i in 0..visual_source_range.length() {
            let visual = adjusted_visual_target + i;
            let logical = logical_target_index + i;
            self.core.run_update(&self.rows[visual], logical);
            let node = self.rows[visual].node;
            ctx.tracker.set(ctx.surface, node, 0.0, new_row_top);
            new_row_top += drh + self.spacers.height_of(spacer_anchor(logical));
        }
    }

    /// Adds pooled rows at `index` while capacity remains, repositioning the
    /// rows at and after `index`. Assumes `index` is simultaneously the
    /// visual and the logical index. Returns how many rows were added.
    fn fill_pool_if_needed<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        index: usize,
        number_of_rows: usize,
    ) -> usize {
        let still_fit = self.max_row_capacity().saturating_sub(self.rows.len());
        let needed = number_of_rows.min(still_fit);
        if needed == 0 {
            return 0;
        }

        for k in 0..needed {
            let row = self.core.create_row_node(ctx, index + k);
            self.core.run_attach(&row, index + k);
            self.rows.insert(index + k, row);
        }

        let drh = self.core.default_row_height();
        let mut y = rows_to_px(index, drh)
            + self.spacers.heights_sum_until_index(spacer_anchor(index));
        for i in index..self.rows.len() {
            let node = self.rows[i].node;
            ctx.tracker.set(ctx.surface, node, 0.0, y);
            y += drh + self.spacers.height_of(spacer_anchor(i));
        }
        needed
    }

    /// Ensures the pool size is `min(capacity, row_count)`, growing or
    /// shrinking as needed. Called whenever the body height or the default
    /// row height changes.
    pub(crate) fn verify_row_pool<S: Surface>(&mut self, ctx: &mut SectionCtx<'_, S>) {
        if !ctx.attached || !self.core.is_attached() {
            return;
        }

        let needed = self.max_row_capacity().min(self.core.row_count());

        if needed > self.rows.len() {
            let diff = needed - self.rows.len();
            let index = self.rows.len();
            let next_last_logical_index = if self.rows.is_empty() {
                0
            } else {
                self.top_row_logical_index + self.rows.len()
            };

            let content_will_fit = next_last_logical_index < self.core.row_count() - diff;
            if content_will_fit {
                let added = self.fill_pool_if_needed(ctx, index, diff);
                // The fill assumed visual == logical; move the new rows to
                // their actual window positions.
                self.move_and_update_rows(
                    ctx,
                    Range::with_length(index, added),
                    index,
                    next_last_logical_index,
                );
            } else {
                // Scrolled so far down that appending would materialize
                // rows past the data. Scroll to the top, fill, and scroll
                // back; the scrollbar clamp resolves any overflow.
                let old_scroll_top = ctx.vertical.scroll_pos();
                ctx.vertical.set_scroll_pos(0.0);
                self.set_body_scroll_position(ctx, self.scroll_left, 0.0);
                self.update_rows_on_scroll(ctx);
                self.fill_pool_if_needed(ctx, index, diff);
                let restored = ctx.vertical.set_scroll_pos(old_scroll_top);
                self.set_body_scroll_position(ctx, self.scroll_left, restored);
                self.update_rows_on_scroll(ctx);
            }
            self.fire_visibility(ctx.events);
        } else if needed < self.rows.len() {
            let diff = self.rows.len() - needed;
            for _ in 0..diff {
                if let Some(row) = self.rows.pop() {
                    let logical = self.top_row_logical_index + self.rows.len();
                    self.core.detach_row(ctx, &row, logical);
                }
            }

            // Trimming from the bottom while scrolled to the end can leave a
            // gap below; relocate the first row to the end if it has gone
            // further above the viewport than one row height.
            if !self.rows.is_empty() {
                let first_row_top = ctx.tracker.top(self.rows[0].node);
                let first_row_min_top = self.scroll_top - self.core.default_row_height();
                if first_row_top < first_row_min_top {
                    let new_logical_index = self.top_row_logical_index + self.rows.len();
                    self.move_and_update_rows(
                        ctx,
                        Range::with_only(0),
                        self.rows.len(),
                        new_logical_index,
                    );
                    self.top_row_logical_index += 1;
                }
            }
            self.fire_visibility(ctx.events);
        }
    }

    // ---------------------------------------------------------------------
    // Row mutation

    /// Inserts `count` logical rows before `index`.
    pub(crate) fn insert_rows<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        index: usize,
        count: usize,
    ) -> Result<()> {
        self.core.check_insert_range(index, count)?;
        self.core.add_rows(count);
        if ctx.attached && self.core.is_attached() {
            self.paint_insert_rows(ctx, index, count);
        }
        Ok(())
    }

    fn paint_insert_rows<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        index: usize,
        number_of_rows: usize,
    ) {
        let geo = self.geometry(ctx);
        self.spacers.shift_by_rows(
            ctx.surface,
            ctx.tracker,
            geo,
            spacer_anchor(index),
            spacer_anchor(number_of_rows),
        );

        let added = self.fill_pool_if_needed(ctx, index, number_of_rows);

        // The row count changed, so the scroll size did too.
        ctx.vertical.set_scroll_size(self.scroll_height());

        let drh = self.core.default_row_height();
        let scroll_top = ctx.vertical.scroll_pos();
        let added_above_viewport = rows_to_px(index, drh) < scroll_top;
        let added_below_viewport = rows_to_px(index, drh) > scroll_top + self.height_of_section;

        if added_above_viewport {
            // Adjust the virtual viewport without re-evaluating any rows.
            self.move_viewport_and_content(ctx, rows_to_px(number_of_rows, drh));
            self.top_row_logical_index += number_of_rows;
        } else if added_below_viewport {
            // Nothing visible changes; the scrollbars already know.
        } else {
            // Rows appeared inside the viewport.
            let unupdated_logical_start = index + added;
            let visual_offset = self.top_row_logical_index;

            let rows_still_needed = number_of_rows - added;
            if rows_still_needed > 0 {
                let unupdated_visual = self.convert_to_visual(Range::with_length(
                    unupdated_logical_start,
                    rows_still_needed,
                ));
                let end = self.rows.len();
                let start = end - unupdated_visual.length();
                let visual_target_index = unupdated_logical_start - visual_offset;
                self.move_and_update_rows(
                    ctx,
                    Range::between(start, end),
                    visual_target_index,
                    unupdated_logical_start,
                );

                // Move the rows below the inserted block to their places.
                let moved = end - start;
                let mut row_top = rows_to_px(unupdated_logical_start + moved, drh);
                let mut logical_cursor = unupdated_logical_start;
                for i in (visual_target_index + moved)..self.rows.len() {
                    row_top += self.spacers.height_of(spacer_anchor(logical_cursor));
                    logical_cursor += 1;
                    let node = self.rows[i].node;
                    ctx.tracker.set(ctx.surface, node, 0.0, row_top);
                    row_top += drh;
                }
            }

            self.fire_visibility(ctx.events);
            self.sort_display_order(ctx);
        }
    }

    /// Removes `count` logical rows starting at `index`.
    pub(crate) fn remove_rows<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        index: usize,
        count: usize,
    ) -> Result<()> {
        self.core.check_existing_range(index, count)?;
        self.core.subtract_rows(count);
        if ctx.attached && self.core.is_attached() {
            self.paint_remove_rows(ctx, index, count);
        }
        Ok(())
    }

    fn paint_remove_rows<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        index: usize,
        number_of_rows: usize,
    ) {
        let drh = self.core.default_row_height();
        let viewport_range = self.visible_row_range();
        let removed_range = Range::with_length(index, number_of_rows);

        // Removing the spacers first corrects scroll size and row offsets
        // right away.
        self.paint_remove_spacers(ctx, removed_range);

        let (removed_above, removed_logical_inside, _) =
            removed_range.partition_with(viewport_range);
        let removed_visual_inside = self.convert_to_visual(removed_logical_inside);

        // Scroll adjustment: rows removed above only need the scrollbar
        // moved up by their height; removing the first visible rows instead
        // snaps the scroll position to the very top.
        let first_visual_row_is_removed =
            !removed_visual_inside.is_empty() && removed_visual_inside.start() == 0;

        if !removed_above.is_empty() || first_visual_row_is_removed {
            let y_delta = rows_to_px(removed_above.length(), drh);
            let first_logical_row_height = drh;
            let removal_scrolls_to_show_first_logical_row =
                ctx.vertical.scroll_pos() - y_delta < first_logical_row_height;

            if removed_visual_inside.is_empty()
                && (!removal_scrolls_to_show_first_logical_row || !first_visual_row_is_removed)
            {
                self.move_viewport_and_content(ctx, -y_delta);
            } else if removal_scrolls_to_show_first_logical_row {
                let scroll_pos = ctx.vertical.scroll_pos();
                self.move_viewport_and_content(ctx, -scroll_pos);
            }
        }

        if !removed_visual_inside.is_empty() {
            let mut pool_count = self.rows.len();
            // The logical count has already been decremented.
            let rows_left = self.core.row_count();

            if rows_left < pool_count {
                let pool_rows_to_remove = pool_count - rows_left;
                for _ in 0..pool_rows_to_remove {
                    let row = self.rows.remove(removed_visual_inside.start());
                    self.core.detach_row(ctx, &row, index);
                }
                pool_count -= pool_rows_to_remove;

                // With nothing left to scroll by, make sure the viewport
                // shows whatever is left above.
                self.set_body_scroll_position(ctx, self.scroll_left, 0.0);
                self.top_row_logical_index = 0;

                // Fill any holes left in the middle; visual == logical here.
                let dirty_rows_start = removed_logical_inside.start();
                let mut y = self.row_top(dirty_rows_start);
                for i in dirty_rows_start..pool_count {
                    let node = self.rows[i].node;
                    ctx.tracker.set(ctx.surface, node, 0.0, y);
                    y += drh + self.spacers.height_of(spacer_anchor(i));
                }

                // Rows that appeared into the viewport from below.
                let rows_to_update = number_of_rows - pool_rows_to_remove;
                let start = pool_count.saturating_sub(rows_to_update);
                for i in start..pool_count {
                    self.core.run_update(&self.rows[i], i);
                }
            } else {
                // The pool size is unchanged; rows are recycled instead.
                let content_bottom = rows_to_px(rows_left, drh);
                let viewport_bottom = self.scroll_top + self.height_of_section;

                if viewport_bottom <= content_bottom {
                    // Middle of the data: recycled rows go to the bottom.
                    self.paint_remove_rows_at_middle(
                        ctx,
                        removed_logical_inside,
                        removed_visual_inside,
                        0,
                    );
                } else if removed_visual_inside.contains(0)
                    && number_of_rows >= self.rows.len()
                {
                    // The viewport is pushed up more than a screenful, so a
                    // plain scroll-up renders everything correctly.
                    let left = ctx.horizontal.scroll_pos();
                    let top = content_bottom - rows_to_px(self.rows.len(), drh);
                    self.set_body_scroll_position(ctx, left, top);

                    let all_pool_rows = Range::with_length(0, self.rows.len());
                    let logical_target_index = rows_left - all_pool_rows.length();
                    self.move_and_update_rows(ctx, all_pool_rows, 0, logical_target_index);
                    self.top_row_logical_index = self
                        .top_row_logical_index
                        .saturating_sub(removed_logical_inside.length());
                } else if content_bottom + rows_to_px(number_of_rows, drh) - viewport_bottom < drh
                {
                    // End of the data: recycled rows go to the top.
                    self.paint_remove_rows_at_bottom(
                        ctx,
                        removed_logical_inside,
                        removed_visual_inside,
                    );
                    self.top_row_logical_index = self
                        .top_row_logical_index
                        .saturating_sub(removed_logical_inside.length());
                } else {
                    // A combination: scroll up AND reveal rows below.
                    //
                    // Step 1: move the vacated rows to the bottom of the
                    // pool without re-rendering anything yet.
                    let mut new_top =
                        ctx.tracker.top(self.rows[removed_visual_inside.start()].node);
                    for _ in 0..removed_visual_inside.length() {
                        let row = self.rows.remove(removed_visual_inside.start());
                        self.rows.push(row);
                    }
                    for i in removed_visual_inside.start()..pool_count {
                        let node = self.rows[i].node;
                        ctx.tracker.set(ctx.surface, node, 0.0, new_top);
                        new_top += drh
                            + self.spacers.height_of(spacer_anchor(
                                i + removed_logical_inside.start(),
                            ));
                    }

                    // Step 2: scroll manually, with an immediate sync.
                    let new_scroll_top = content_bottom - self.height_of_section;
                    let clamped = ctx.vertical.set_scroll_pos(new_scroll_top);
                    self.set_body_scroll_position(ctx, self.scroll_left, clamped);
                    self.update_rows_on_scroll(ctx);

                    // The bottommost row belongs above the window; scrolling
                    // up doesn't handle that for us.
                    self.move_and_update_rows(
                        ctx,
                        Range::with_only(pool_count - 1),
                        0,
                        self.top_row_logical_index.saturating_sub(1),
                    );
                    self.top_row_logical_index =
                        self.top_row_logical_index.saturating_sub(1);

                    // Step 3: refresh the remaining recycled rows in place.
                    let rows_scrolled =
                        px_to_rows_ceil(viewport_bottom - content_bottom, drh);
                    let start = pool_count
                        .saturating_sub(removed_visual_inside.length() - rows_scrolled.min(removed_visual_inside.length()));
                    let visual_refresh_range = Range::between(start, pool_count);
                    let logical_target_index = self.top_row_logical_index + start;
                    self.move_and_update_rows(
                        ctx,
                        visual_refresh_range,
                        start,
                        logical_target_index,
                    );
                }
            }

            self.fire_visibility(ctx.events);
            self.sort_display_order(ctx);
        }

        self.top_row_logical_index = self
            .top_row_logical_index
            .saturating_sub(removed_above.length());

        // Shrinking must precede this, or the scroll clamp fights it.
        ctx.vertical.set_scroll_size(self.scroll_height());
    }

    fn paint_remove_rows_at_middle<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        removed_logical_inside: Range,
        removed_visual_inside: Range,
        logical_offset: usize,
    ) {
        let pool_count = self.rows.len();
        let drh = self.core.default_row_height();

        let last_logical = self.top_row_logical_index + pool_count - 1;
        let logical_target_index =
            last_logical - (removed_visual_inside.length() - 1) + logical_offset;
        self.move_and_update_rows(
            ctx,
            removed_visual_inside,
            pool_count,
            logical_target_index,
        );

        // Close the gap the vacated rows left behind.
        let mut row_top = self.row_top(removed_logical_inside.start() + logical_offset);
        for i in removed_visual_inside.start()..pool_count - removed_visual_inside.length() {
            let node = self.rows[i].node;
            ctx.tracker.set(ctx.surface, node, 0.0, row_top);
            row_top += drh
                + self
                    .spacers
                    .height_of(spacer_anchor(i + removed_logical_inside.start()));
        }
    }

    fn paint_remove_rows_at_bottom<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        removed_logical_inside: Range,
        removed_visual_inside: Range,
    ) {
        let drh = self.core.default_row_height();

        let logical_target_index = self
            .top_row_logical_index
            .saturating_sub(removed_visual_inside.length());
        self.move_and_update_rows(ctx, removed_visual_inside, 0, logical_target_index);

        // Close the gap below the relocated rows.
        let first_updated_index = removed_visual_inside.end();
        let mut row_top = self.row_top(removed_logical_inside.start());
        for (offset, i) in (first_updated_index..self.rows.len()).enumerate() {
            let node = self.rows[i].node;
            ctx.tracker.set(ctx.surface, node, 0.0, row_top);
            row_top += drh
                + self
                    .spacers
                    .height_of(spacer_anchor(first_updated_index + offset));
        }
    }

    /// Rebinds the logical rows in the given range that are materialized.
    pub(crate) fn refresh_rows<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        index: usize,
        count: usize,
    ) -> Result<()> {
        self.core.check_existing_range(index, count)?;
        if !ctx.attached || !self.core.is_attached() || ctx.columns.column_count() == 0 {
            return Ok(());
        }
        let visual = self.convert_to_visual(Range::with_length(index, count));
        for v in visual.start()..visual.end() {
            self.core
                .run_update(&self.rows[v], self.top_row_logical_index + v);
        }
        Ok(())
    }

    /// Converts a logical row range to the matching visual range, truncated
    /// to the pool window.
    fn convert_to_visual(&self, logical_range: Range) -> Range {
        if logical_range.is_empty() || self.rows.is_empty() {
            return Range::EMPTY;
        }
        let window = Range::with_length(self.top_row_logical_index, self.max_row_capacity());
        let (_, inside, _) = logical_range.partition_with(window);
        #[expect(
            clippy::cast_possible_wrap,
            reason = "logical row indices stay far below i64::MAX"
        )]
        inside.offset_by(-(self.top_row_logical_index as i64))
    }

    // ---------------------------------------------------------------------
    // Viewport moves

    /// Adjusts the scroll position while taking the rows and spacers along,
    /// snapped to whole row heights. A positive delta moves everything down.
    pub(crate) fn move_viewport_and_content<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        y_delta: f64,
    ) {
        if y_delta == 0.0 {
            return;
        }

        let new_top = self.scroll_top + y_delta;
        ctx.vertical.set_scroll_pos(new_top);

        let drh = self.core.default_row_height();
        let row_px_delta = y_delta - (y_delta % drh);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "whole-row deltas are small viewport-scale numbers"
        )]
        let row_index_delta = (y_delta / drh) as i64;
        if row_px_delta != 0.0 {
            let geo = self.geometry(ctx);
            self.spacers.shift_after_px(
                ctx.surface,
                ctx.tracker,
                geo,
                self.scroll_top,
                row_px_delta,
                row_index_delta,
            );
            for row in &self.rows {
                let top = ctx.tracker.top(row.node);
                ctx.tracker.set(ctx.surface, row.node, 0.0, top + row_px_delta);
            }
        }

        self.set_body_scroll_position(ctx, self.scroll_left, new_top);
    }

    /// Moves the materialized rows below logical `row` by `diff` pixels.
    pub(crate) fn shift_row_positions<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        row: i64,
        diff: f64,
    ) {
        let visible = self.visible_row_range();
        let from = if row < spacer_anchor(visible.start()) {
            0
        } else if row >= spacer_anchor(visible.end().saturating_sub(1)) {
            self.rows.len()
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "row is inside the visible window here"
            )]
            let v = (row - spacer_anchor(visible.start())) as usize;
            v + 1
        };
        for pooled in &self.rows[from..] {
            let top = ctx.tracker.top(pooled.node);
            ctx.tracker.set(ctx.surface, pooled.node, 0.0, top + diff);
        }
    }

    // ---------------------------------------------------------------------
    // Spacers

    /// Sets, resizes, or removes (negative height) the spacer at `row`.
    /// Anchor `-1` opens a spacer above the first row.
    pub(crate) fn set_spacer<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        row: i64,
        height: f64,
    ) -> Result<()> {
        let row_count = self.core.row_count();
        if row < -1 || row >= spacer_anchor(row_count) {
            return Err(EngineError::InvalidArgument(format!(
                "invalid row index: {row}, while the body only has {row_count} rows."
            )));
        }

        if height >= 0.0 {
            if self.spacers.exists(row) {
                self.apply_spacer_height(ctx, row, height);
                self.spacers.update_content(row);
            } else if height > 0.0 {
                let anchor_top = self.spacer_top_for(row);
                let geo = self.geometry(ctx);
                self.spacers
                    .insert(ctx.surface, ctx.tracker, geo, row, anchor_top);
                self.apply_spacer_height(ctx, row, height);
                self.spacers.init_content(row);
            }
        } else if self.spacers.exists(row) {
            self.spacers.destroy_content(row);
            self.apply_spacer_height(ctx, row, 0.0);
            self.spacers.discard(ctx.surface, ctx.tracker, row);
        }

        self.update_spacer_visibility(ctx);
        Ok(())
    }

    /// The pixel position at which a spacer anchored to `row` begins.
    fn spacer_top_for(&self, row: i64) -> f64 {
        let drh = self.core.default_row_height();
        #[expect(
            clippy::cast_precision_loss,
            reason = "row counts stay far below the f64 integer limit"
        )]
        let base = row as f64 * drh;
        self.spacers.heights_sum_until_index(row) + base + drh
    }

    /// Applies a new spacer height, compensating scroll size, scroll
    /// position, and row offsets so the viewport appears stationary.
    fn apply_spacer_height<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        row: i64,
        height: f64,
    ) {
        let old_height = self.spacers.height_of(row);
        let growing = height > old_height;

        // Grow the scroll size before moving anything, shrink it after; the
        // scroll position clamp must never see a transiently small range.
        if growing {
            ctx.vertical
                .set_scroll_size(ctx.vertical.scroll_size() + (height - old_height));
        }

        let geo = self.geometry(ctx);
        let height_diff =
            self.spacers
                .set_height_local(ctx.surface, ctx.tracker, geo, row, height);

        let top_logical = spacer_anchor(self.top_row_logical_index);
        // Opening a spacer above row 0 while at the very top grows the page
        // downwards; the viewport must not follow it.
        let opened_at_top = growing && row == -1 && top_logical == 0;

        if row < top_logical && !opened_at_top {
            // The spacer is above the pool window: everything materialized
            // moves together with the viewport.
            for pooled in &self.rows {
                let top = ctx.tracker.top(pooled.node);
                ctx.tracker
                    .set(ctx.surface, pooled.node, 0.0, top + height_diff);
            }

            let spacer_top = self.spacers.top_of(row).unwrap_or(0.0);
            let mut move_diff = height_diff;
            if !growing && self.scroll_top > spacer_top {
                // Shrinking with the viewport top inside the spacer: don't
                // scroll above the spacer's top edge.
                move_diff = height_diff.max(spacer_top - self.scroll_top);
            }
            let new_top = self.scroll_top + move_diff;
            self.set_body_scroll_position(ctx, self.scroll_left, new_top);
            ctx.vertical.scroll_by(move_diff);
        } else {
            self.shift_row_positions(ctx, row, height_diff);
        }

        if !growing {
            ctx.vertical
                .set_scroll_size(ctx.vertical.scroll_size() + height_diff);
        }
    }

    /// Removes every spacer anchored inside `removed_range` and re-anchors
    /// the ones below.
    fn paint_remove_spacers<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        removed_range: Range,
    ) {
        let start = spacer_anchor(removed_range.start());
        let end = spacer_anchor(removed_range.end());
        for row in self.spacers.rows_in_range(start, end) {
            self.spacers.destroy_content(row);
            self.apply_spacer_height(ctx, row, 0.0);
            self.spacers.discard(ctx.surface, ctx.tracker, row);
        }
        let geo = self.geometry(ctx);
        self.spacers.shift_by_rows(
            ctx.surface,
            ctx.tracker,
            geo,
            end,
            -spacer_anchor(removed_range.length()),
        );
    }

    /// Re-pins spacers horizontally after a horizontal scroll.
    pub(crate) fn reposition_spacers<S: Surface>(&mut self, ctx: &mut SectionCtx<'_, S>) {
        self.spacers
            .reposition_horizontal(ctx.surface, ctx.tracker, self.scroll_left);
    }

    /// Reapplies the current row width to every spacer.
    pub(crate) fn reapply_spacer_widths<S: Surface>(&mut self, ctx: &mut SectionCtx<'_, S>) {
        let geo = self.geometry(ctx);
        self.spacers.reapply_widths(ctx.surface, geo);
    }

    /// Shows or hides spacers based on viewport intersection.
    pub(crate) fn update_spacer_visibility<S: Surface>(&mut self, ctx: &mut SectionCtx<'_, S>) {
        self.spacers.update_visibility(
            ctx.surface,
            self.scroll_top,
            self.scroll_top + self.height_of_section,
            ctx.events,
        );
    }

    // ---------------------------------------------------------------------
    // Display order

    /// Normalizes the physical child order under the body root to match the
    /// visual order, interleaving in-window spacers below their anchor rows.
    /// Out-of-window spacers are hidden and parked at the end.
    pub(crate) fn sort_display_order<S: Surface>(&mut self, ctx: &mut SectionCtx<'_, S>) {
        if !self.core.is_attached() {
            return;
        }

        let window_start = spacer_anchor(self.top_row_logical_index) - 1;
        let window_end = spacer_anchor(self.top_row_logical_index + self.rows.len());

        let mut order: Vec<NodeId> =
            Vec::with_capacity(self.rows.len() + self.spacers.count());

        // A spacer rendered above the window whose anchor row is not shown.
        if let Some(node) = self.spacers.node_of(window_start) {
            order.push(node);
            self.spacers.show(ctx.surface, window_start);
        }
        for (i, row) in self.rows.iter().enumerate() {
            order.push(row.node);
            let anchor = spacer_anchor(self.top_row_logical_index + i);
            if let Some(node) = self.spacers.node_of(anchor) {
                order.push(node);
                self.spacers.show(ctx.surface, anchor);
            }
        }

        // Spacers that were not reordered are out of view.
        let parked: Vec<i64> = self
            .spacers
            .rows()
            .filter(|r| *r < window_start || *r >= window_end)
            .collect();
        for row in parked {
            if let Some(node) = self.spacers.node_of(row) {
                order.push(node);
                ctx.surface.set_hidden(node, true);
            }
        }

        ctx.surface.reorder_children(self.core.root(), &order);
    }

    // ---------------------------------------------------------------------
    // Heights

    pub(crate) fn set_default_row_height<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        px: f64,
    ) -> Result<()> {
        self.core.set_default_row_height(px)?;
        self.reapply_default_row_heights(ctx);
        Ok(())
    }

    pub(crate) fn autodetect_row_height<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
    ) -> bool {
        if self.core.autodetect_row_height(ctx.surface) {
            self.reapply_default_row_heights(ctx);
            true
        } else {
            false
        }
    }

    /// Reapplies the row height to all pooled rows, keeps the scroll handle
    /// at the same relative position, and re-verifies the pool size.
    fn reapply_default_row_heights<S: Surface>(&mut self, ctx: &mut SectionCtx<'_, S>) {
        if self.rows.is_empty() {
            return;
        }
        let drh = self.core.default_row_height();

        let rows = core::mem::take(&mut self.rows);
        self.core.reapply_row_heights(ctx, &rows, drh);
        for (i, row) in rows.iter().enumerate() {
            let logical = self.top_row_logical_index + i;
            ctx.tracker
                .set(ctx.surface, row.node, 0.0, rows_to_px(logical, drh));
        }
        self.rows = rows;

        // Keep the handle at the same ratio of the (new) scroll range. The
        // ratio uses the full scroll size, not the max position, so the top
        // row aligns with the new position.
        let old_size = ctx.vertical.scroll_size();
        let scroll_ratio = if old_size > 0.0 {
            ctx.vertical.scroll_pos() / old_size
        } else {
            0.0
        };
        ctx.vertical.set_scroll_size(self.scroll_height());
        let new_pos = ctx
            .vertical
            .set_scroll_pos(rows_to_px(self.core.row_count(), drh) * scroll_ratio);
        let scroll_left = ctx.horizontal.scroll_pos();
        self.set_body_scroll_position(ctx, scroll_left, new_pos);
        self.update_rows_on_scroll(ctx);

        self.verify_row_pool(ctx);

        if let Some(first) = self.rows.first() {
            let top = ctx.tracker.top(first.node);
            self.top_row_logical_index = px_to_rows_floor(top, drh);
        }
    }

    // ---------------------------------------------------------------------
    // Columns

    pub(crate) fn paint_insert_columns<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        offset: usize,
        count: usize,
        frozen: bool,
    ) {
        let top = self.top_row_logical_index;
        let mut rows = core::mem::take(&mut self.rows);
        self.core
            .paint_insert_cells(ctx, &mut rows, |visual| top + visual, offset, count, frozen);
        self.rows = rows;
        self.reapply_spacer_widths(ctx);
    }

    pub(crate) fn paint_remove_columns<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        offset: usize,
        count: usize,
    ) {
        let mut rows = core::mem::take(&mut self.rows);
        self.core.paint_remove_cells(ctx, &mut rows, offset, count);
        self.rows = rows;
        self.reapply_spacer_widths(ctx);
    }

    pub(crate) fn set_column_frozen<S: Surface>(
        &self,
        ctx: &mut SectionCtx<'_, S>,
        column: usize,
        frozen: bool,
    ) {
        self.core.set_column_frozen(ctx, &self.rows, column, frozen);
    }

    pub(crate) fn set_column_last_frozen<S: Surface>(
        &self,
        ctx: &mut SectionCtx<'_, S>,
        column: usize,
        last_frozen: bool,
    ) {
        self.core
            .set_column_last_frozen(ctx, &self.rows, column, last_frozen);
    }

    pub(crate) fn update_freeze_position<S: Surface>(
        &self,
        ctx: &mut SectionCtx<'_, S>,
        column: usize,
        scroll_left: f64,
    ) {
        self.core
            .update_freeze_position(ctx, &self.rows, column, scroll_left);
    }

    pub(crate) fn reapply_column_widths<S: Surface>(&mut self, ctx: &mut SectionCtx<'_, S>) {
        let rows = core::mem::take(&mut self.rows);
        self.core.reapply_column_widths(ctx, &rows);
        self.rows = rows;
        self.reapply_spacer_widths(ctx);
    }

    pub(crate) fn measure_min_cell_width<S: Surface>(
        &self,
        ctx: &mut SectionCtx<'_, S>,
        column: usize,
    ) -> f64 {
        self.core.measure_min_cell_width(ctx, &self.rows, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::ColumnConfig;
    use crate::scrollbar::Scrollbar;
    use crate::tracker::PositionTracker;
    use crate::EngineEvent;
    use trellis_surface::TestSurface;

    const ROW_HEIGHT: f64 = 20.0;

    struct Fixture {
        surface: TestSurface,
        tracker: PositionTracker,
        columns: ColumnConfig,
        vertical: Scrollbar,
        horizontal: Scrollbar,
        events: EventSink,
    }

    impl Fixture {
        fn new(column_count: usize) -> Self {
            let mut columns = ColumnConfig::default();
            if column_count > 0 {
                columns.insert(0, column_count).unwrap();
            }
            Self {
                surface: TestSurface::default(),
                tracker: PositionTracker::default(),
                columns,
                vertical: Scrollbar::default(),
                horizontal: Scrollbar::default(),
                events: EventSink::default(),
            }
        }

        fn ctx(&mut self) -> SectionCtx<'_, TestSurface> {
            SectionCtx {
                surface: &mut self.surface,
                tracker: &mut self.tracker,
                columns: &self.columns,
                vertical: &mut self.vertical,
                horizontal: &mut self.horizontal,
                events: &mut self.events,
                attached: true,
            }
        }

        /// Moves the scrollbar and runs the body's scroll sync, the way the
        /// engine does it on a scroll event.
        fn scroll_to(&mut self, body: &mut ScrollingSection, pos: f64) {
            let clamped = self.vertical.set_scroll_pos(pos);
            let left = body.scroll_left;
            body.set_body_scroll_position(&mut self.ctx(), left, clamped);
            body.update_rows_on_scroll(&mut self.ctx());
        }
    }

    /// An attached body with `rows` logical rows, a 200px tall viewport, and
    /// one column.
    fn body_with_rows(fx: &mut Fixture, rows: usize) -> ScrollingSection {
        let mut body = ScrollingSection::default();
        body.core.set_default_row_height(ROW_HEIGHT).unwrap();
        body.set_section_height(200.0);
        fx.vertical.set_offset_size(200.0);
        body.attach(&mut fx.ctx(), 0);
        if rows > 0 {
            body.insert_rows(&mut fx.ctx(), 0, rows).unwrap();
        }
        body
    }

    #[test]
    fn pool_is_bounded_by_capacity() {
        let mut fx = Fixture::new(1);
        let body = body_with_rows(&mut fx, 1000);

        // 200px viewport at 20px rows: ten rows fit, plus one for overlap.
        assert_eq!(body.max_row_capacity(), 11);
        assert_eq!(body.materialized_row_count(), 11);
        assert_eq!(body.row_count(), 1000);
        assert_eq!(body.top_row_logical_index(), 0);
        assert_eq!(fx.vertical.scroll_size(), 20_000.0);
    }

    #[test]
    fn small_data_set_is_fully_materialized() {
        let mut fx = Fixture::new(1);
        let body = body_with_rows(&mut fx, 4);
        assert_eq!(body.materialized_row_count(), 4);
    }

    #[test]
    fn scrolling_slides_the_pool_window() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 1000);

        fx.scroll_to(&mut body, 400.0);
        assert_eq!(body.top_row_logical_index(), 20);
        assert_eq!(body.materialized_row_count(), 11);
        // The window's top row sits exactly at the scroll position.
        assert_eq!(body.row_top(20), 400.0);

        fx.scroll_to(&mut body, 0.0);
        assert_eq!(body.top_row_logical_index(), 0);
    }

    #[test]
    fn scrolling_to_the_end_clamps_the_window() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 100);

        fx.scroll_to(&mut body, f64::MAX);
        let visible = body.visible_row_range();
        assert_eq!(visible.end(), 100);
        assert_eq!(visible.length(), body.materialized_row_count());
    }

    #[test]
    fn scroll_emits_row_visibility_events() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 1000);
        while fx.events.pop().is_some() {}

        fx.scroll_to(&mut body, 400.0);
        assert_eq!(
            fx.events.pop(),
            Some(EngineEvent::RowVisibilityChange {
                start: 20,
                count: 11
            })
        );
    }

    #[test]
    fn insert_above_viewport_compensates_scroll_position() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 1000);
        fx.scroll_to(&mut body, 400.0);

        body.insert_rows(&mut fx.ctx(), 0, 5).unwrap();
        assert_eq!(body.row_count(), 1005);
        // The viewport still shows the same rows, now five indices later.
        assert_eq!(body.top_row_logical_index(), 25);
        assert_eq!(fx.vertical.scroll_pos(), 500.0);
    }

    #[test]
    fn insert_below_viewport_only_grows_the_scroll_size() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 100);

        body.insert_rows(&mut fx.ctx(), 100, 50).unwrap();
        assert_eq!(body.top_row_logical_index(), 0);
        assert_eq!(fx.vertical.scroll_pos(), 0.0);
        assert_eq!(fx.vertical.scroll_size(), 3000.0);
    }

    #[test]
    fn remove_above_viewport_compensates_scroll_position() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 1000);
        fx.scroll_to(&mut body, 400.0);

        body.remove_rows(&mut fx.ctx(), 0, 10).unwrap();
        assert_eq!(body.row_count(), 990);
        assert_eq!(body.top_row_logical_index(), 10);
        assert_eq!(fx.vertical.scroll_pos(), 200.0);
    }

    #[test]
    fn remove_shrinking_below_pool_size_snaps_to_top() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 100);
        body.remove_rows(&mut fx.ctx(), 0, 95).unwrap();
        assert_eq!(body.row_count(), 5);
        assert_eq!(body.top_row_logical_index(), 0);
        assert_eq!(body.materialized_row_count(), 5);
    }

    #[test]
    fn row_validation_matches_the_data_range() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 10);
        assert!(matches!(
            body.insert_rows(&mut fx.ctx(), 11, 1),
            Err(EngineError::OutOfRange(_))
        ));
        assert!(matches!(
            body.remove_rows(&mut fx.ctx(), 5, 6),
            Err(EngineError::OutOfRange(_))
        ));
        assert!(matches!(
            body.remove_rows(&mut fx.ctx(), 0, 0),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn spacer_opens_below_its_anchor_row() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 1000);

        body.set_spacer(&mut fx.ctx(), 3, 50.0).unwrap();
        assert_eq!(body.spacers().height_of(3), 50.0);
        assert_eq!(body.spacers().top_of(3), Some(80.0));
        // Rows after the anchor shift down.
        assert_eq!(body.row_top(4), 130.0);
        assert_eq!(fx.vertical.scroll_size(), 20_050.0);
    }

    #[test]
    fn spacer_rejects_out_of_range_anchor() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 10);
        assert!(matches!(
            body.set_spacer(&mut fx.ctx(), 10, 50.0),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            body.set_spacer(&mut fx.ctx(), -2, 50.0),
            Err(EngineError::InvalidArgument(_))
        ));
        // -1 is a valid anchor: the spacer opens above the first row.
        body.set_spacer(&mut fx.ctx(), -1, 30.0).unwrap();
        assert_eq!(body.spacers().top_of(-1), Some(0.0));
    }

    #[test]
    fn negative_height_removes_the_spacer() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 1000);

        body.set_spacer(&mut fx.ctx(), 3, 50.0).unwrap();
        body.set_spacer(&mut fx.ctx(), 3, -1.0).unwrap();
        assert!(!body.spacers().exists(3));
        assert_eq!(fx.vertical.scroll_size(), 20_000.0);
        assert_eq!(body.row_top(4), 80.0);
    }

    #[test]
    fn spacer_above_viewport_keeps_the_view_stationary() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 1000);
        fx.scroll_to(&mut body, 400.0);
        assert_eq!(body.top_row_logical_index(), 20);

        body.set_spacer(&mut fx.ctx(), 5, 60.0).unwrap();
        // The scroll position follows the content downwards.
        assert_eq!(fx.vertical.scroll_pos(), 460.0);
        assert_eq!(body.top_row_logical_index(), 20);
    }

    #[test]
    fn spacer_oscillation_is_scroll_size_neutral() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 1000);
        let baseline = fx.vertical.scroll_size();

        for _ in 0..10 {
            body.set_spacer(&mut fx.ctx(), 7, 120.0).unwrap();
            body.set_spacer(&mut fx.ctx(), 7, -1.0).unwrap();
        }
        assert_eq!(fx.vertical.scroll_size(), baseline);
    }

    #[test]
    fn removing_rows_removes_their_spacers() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 100);
        body.set_spacer(&mut fx.ctx(), 3, 50.0).unwrap();
        body.set_spacer(&mut fx.ctx(), 8, 30.0).unwrap();

        body.remove_rows(&mut fx.ctx(), 2, 3).unwrap();
        assert!(!body.spacers().exists(3));
        // The row-8 spacer re-anchors three rows up.
        assert!(body.spacers().exists(5));
        assert_eq!(body.spacers().count(), 1);
    }

    #[test]
    fn pool_grows_and_shrinks_with_section_height() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 1000);
        assert_eq!(body.materialized_row_count(), 11);

        body.set_section_height(400.0);
        fx.vertical.set_offset_size(400.0);
        body.verify_row_pool(&mut fx.ctx());
        assert_eq!(body.materialized_row_count(), 21);

        body.set_section_height(100.0);
        fx.vertical.set_offset_size(100.0);
        body.verify_row_pool(&mut fx.ctx());
        assert_eq!(body.materialized_row_count(), 6);
    }

    #[test]
    fn display_order_interleaves_visible_spacers() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 100);
        body.set_spacer(&mut fx.ctx(), 2, 40.0).unwrap();
        body.sort_display_order(&mut fx.ctx());

        let children = fx.surface.children(body.root());
        let spacer_node = body.spacers().node_of(2).unwrap();
        let spacer_pos = children.iter().position(|n| *n == spacer_node).unwrap();
        let row_2_pos = children
            .iter()
            .position(|n| *n == body.rows[2].node)
            .unwrap();
        assert_eq!(spacer_pos, row_2_pos + 1);
    }

    #[test]
    fn logical_index_equals_top_plus_visual() {
        let mut fx = Fixture::new(1);
        let mut body = body_with_rows(&mut fx, 1000);

        for pos in [0.0, 137.0, 4000.0, 19_999.0] {
            fx.scroll_to(&mut body, pos);
            let top = body.top_row_logical_index();
            for (visual, _) in body.rows.iter().enumerate() {
                let expected_top = body.row_top(top + visual);
                let node = body.rows[visual].node;
                assert_eq!(fx.tracker.top(node), expected_top);
            }
        }
    }
}
