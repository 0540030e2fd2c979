// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared row-section machinery.
//!
//! A table has three sections: header, body, footer. The header and footer
//! are [`StaticSection`](crate::static_section::StaticSection)s, where
//! logical, physical, and visual indices coincide; the body is a
//! [`ScrollingSection`](crate::scrolling_section::ScrollingSection) with a
//! bounded row pool. Rather than an inheritance tower, the common pieces
//! (logical row count, cell creation, frozen-state propagation, default row
//! height and its autodetection, updater plumbing) live in [`SectionCore`],
//! which both section types embed; [`RowSection`] is the read-side interface
//! they share.
//!
//! Sections never hold a reference to their owner. Every mutating operation
//! takes a [`SectionCtx`], a narrow bundle of the collaborators the engine
//! facade lends out for the duration of the call.

use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Size;
use trellis_surface::{FrozenKind, NodeId, Surface};

use crate::columns::{ColumnConfig, WIDTH_MEASUREMENT_EPSILON};
use crate::error::{EngineError, Result};
use crate::events::EventSink;
use crate::scrollbar::Scrollbar;
use crate::tracker::PositionTracker;
use crate::updater::{NullUpdater, RowRef, RowUpdater};

/// Row height used before autodetection or an explicit setting.
pub(crate) const INITIAL_DEFAULT_ROW_HEIGHT: f64 = 20.0;

/// Read-side interface common to all row sections.
pub trait RowSection {
    /// The logical row count of this section.
    fn row_count(&self) -> usize;

    /// The number of rows currently materialized on the surface.
    fn materialized_row_count(&self) -> usize;

    /// The default (and for pooled rows, uniform) row height in pixels.
    fn default_row_height(&self) -> f64;

    /// The pixel height this section occupies.
    fn section_height(&self) -> f64;
}

/// The collaborators a section operation may touch, lent by the facade.
pub(crate) struct SectionCtx<'a, S: Surface> {
    pub(crate) surface: &'a mut S,
    pub(crate) tracker: &'a mut PositionTracker,
    pub(crate) columns: &'a ColumnConfig,
    pub(crate) vertical: &'a mut Scrollbar,
    pub(crate) horizontal: &'a mut Scrollbar,
    pub(crate) events: &'a mut EventSink,
    /// Whether the engine is attached to a live surface. Detached sections
    /// update bookkeeping only; rows materialize lazily on attach.
    pub(crate) attached: bool,
}

impl<S: Surface> fmt::Debug for SectionCtx<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionCtx")
            .field("attached", &self.attached)
            .finish_non_exhaustive()
    }
}

/// One materialized row: its node and its cell nodes in column order.
#[derive(Debug, Clone)]
pub(crate) struct SectionRow {
    pub(crate) node: NodeId,
    pub(crate) cells: Vec<NodeId>,
}

/// State and helpers shared by every section implementation.
pub(crate) struct SectionCore {
    root: Option<NodeId>,
    row_count: usize,
    default_row_height: f64,
    autodetect_height: bool,
    updater: Box<dyn RowUpdater>,
}

impl fmt::Debug for SectionCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionCore")
            .field("root", &self.root)
            .field("row_count", &self.row_count)
            .field("default_row_height", &self.default_row_height)
            .field("autodetect_height", &self.autodetect_height)
            .finish_non_exhaustive()
    }
}

impl Default for SectionCore {
    fn default() -> Self {
        Self {
            root: None,
            row_count: 0,
            default_row_height: INITIAL_DEFAULT_ROW_HEIGHT,
            autodetect_height: true,
            updater: Box::new(NullUpdater),
        }
    }
}

impl SectionCore {
    pub(crate) fn row_count(&self) -> usize {
        self.row_count
    }

    pub(crate) fn add_rows(&mut self, count: usize) {
        self.row_count += count;
    }

    pub(crate) fn subtract_rows(&mut self, count: usize) {
        debug_assert!(count <= self.row_count, "removing more rows than exist");
        self.row_count -= count;
    }

    pub(crate) fn default_row_height(&self) -> f64 {
        self.default_row_height
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.root.is_some()
    }

    /// The section's root node. Only valid while attached.
    pub(crate) fn root(&self) -> NodeId {
        debug_assert!(self.root.is_some(), "section root used while detached");
        self.root.unwrap_or(NodeId::from_raw(0))
    }

    pub(crate) fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    pub(crate) fn set_updater(&mut self, updater: Box<dyn RowUpdater>) {
        self.updater = updater;
    }

    /// Pins the default row height, disabling autodetection.
    pub(crate) fn set_default_row_height(&mut self, px: f64) -> Result<()> {
        if !(px >= 1.0) || !px.is_finite() {
            return Err(EngineError::InvalidArgument(format!(
                "height must be positive. {px} was given."
            )));
        }
        self.autodetect_height = false;
        self.default_row_height = px;
        Ok(())
    }

    /// Probes the surface for the natural row height. Results below 1px are
    /// ignored: layouts producing near-zero rows would explode the pool size.
    /// Returns whether the height changed.
    pub(crate) fn autodetect_row_height<S: Surface>(&mut self, surface: &mut S) -> bool {
        if !self.autodetect_height {
            return false;
        }
        let probed = surface.probe_row_height();
        if probed >= 1.0 && probed.is_finite() {
            self.autodetect_height = false;
            let changed = probed != self.default_row_height;
            self.default_row_height = probed;
            changed
        } else {
            false
        }
    }

    /// `default_row_height * row_count`, the section height ignoring spacers.
    pub(crate) fn total_row_height(&self) -> f64 {
        #[expect(
            clippy::cast_precision_loss,
            reason = "row counts stay far below the f64 integer limit"
        )]
        {
            self.default_row_height * self.row_count as f64
        }
    }

    pub(crate) fn check_insert_range(&self, index: usize, count: usize) -> Result<()> {
        if index > self.row_count {
            return Err(EngineError::OutOfRange(format!(
                "the given index ({index}) was outside of the current number of rows (0..{})",
                self.row_count
            )));
        }
        if count < 1 {
            return Err(EngineError::InvalidArgument(format!(
                "number of rows must be 1 or greater (was {count})"
            )));
        }
        Ok(())
    }

    pub(crate) fn check_existing_range(&self, index: usize, count: usize) -> Result<()> {
        if count < 1 {
            return Err(EngineError::InvalidArgument(format!(
                "number of rows must be 1 or greater (was {count})"
            )));
        }
        if index + count > self.row_count {
            return Err(EngineError::OutOfRange(format!(
                "the given row range ({index}..{}) was outside of the current number of rows ({})",
                index + count,
                self.row_count
            )));
        }
        Ok(())
    }

    /// Creates a row node with one cell per column at physical position
    /// `physical_index` under the section root. Cells get the calculated
    /// column widths and the default row height; frozen cells are pinned at
    /// the current horizontal scroll position.
    pub(crate) fn create_row_node<S: Surface>(
        &self,
        ctx: &mut SectionCtx<'_, S>,
        physical_index: usize,
    ) -> SectionRow {
        let root = self.root();
        let node = ctx.surface.create_child(root, physical_index);
        let frozen_count = ctx.columns.frozen_column_count();
        let scroll_left = ctx.horizontal.scroll_pos();

        let mut cells = Vec::with_capacity(ctx.columns.column_count());
        for col in 0..ctx.columns.column_count() {
            let cell = ctx.surface.create_child(node, col);
            let width = ctx.columns.calculated_width(col).max(0.0);
            ctx.surface
                .set_extent(cell, Size::new(width, self.default_row_height));
            if col < frozen_count {
                let kind = if col == frozen_count - 1 {
                    FrozenKind::LastFrozen
                } else {
                    FrozenKind::Frozen
                };
                ctx.surface.set_frozen(cell, kind);
                ctx.tracker.set(ctx.surface, cell, scroll_left, 0.0);
            }
            cells.push(cell);
        }
        ctx.surface
            .set_extent(node, Size::new(ctx.columns.row_width(), self.default_row_height));
        SectionRow { node, cells }
    }

    /// Runs the full attach contract for a freshly created row.
    pub(crate) fn run_attach(&mut self, row: &SectionRow, logical_index: usize) {
        let row_ref = RowRef {
            logical_index,
            row: row.node,
            cells: &row.cells,
        };
        self.updater.pre_attach(row_ref);
        self.updater.post_attach(row_ref);
        self.updater.update(row_ref);
    }

    /// Runs the updater's rebind for an already attached row.
    pub(crate) fn run_update(&mut self, row: &SectionRow, logical_index: usize) {
        self.updater.update(RowRef {
            logical_index,
            row: row.node,
            cells: &row.cells,
        });
    }

    /// Detaches a row: `pre_detach`, node removal, `post_detach`, and
    /// position-bookkeeping cleanup.
    pub(crate) fn detach_row<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        row: &SectionRow,
        logical_index: usize,
    ) {
        let row_ref = RowRef {
            logical_index,
            row: row.node,
            cells: &row.cells,
        };
        self.updater.pre_detach(row_ref);
        for cell in &row.cells {
            ctx.tracker.remove(*cell);
        }
        ctx.tracker.remove(row.node);
        ctx.surface.remove_node(row.node);
        self.updater.post_detach(row_ref);
    }

    /// Inserts cells for newly added columns into every materialized row.
    pub(crate) fn paint_insert_cells<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        rows: &mut [SectionRow],
        logical_of: impl Fn(usize) -> usize,
        offset: usize,
        count: usize,
        frozen: bool,
    ) {
        let scroll_left = ctx.horizontal.scroll_pos();
        for (visual, row) in rows.iter_mut().enumerate() {
            for col in offset..offset + count {
                let cell = ctx.surface.create_child(row.node, col);
                let width = ctx.columns.calculated_width(col).max(0.0);
                ctx.surface
                    .set_extent(cell, Size::new(width, self.default_row_height));
                if frozen {
                    ctx.surface.set_frozen(cell, FrozenKind::Frozen);
                    ctx.tracker.set(ctx.surface, cell, scroll_left, 0.0);
                }
                row.cells.insert(col, cell);
            }
            self.run_update(row, logical_of(visual));
        }
        self.reapply_row_widths(ctx, rows);
    }

    /// Removes cells for removed columns from every materialized row.
    pub(crate) fn paint_remove_cells<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        rows: &mut [SectionRow],
        offset: usize,
        count: usize,
    ) {
        for row in rows.iter_mut() {
            for cell in row.cells.drain(offset..offset + count) {
                ctx.tracker.remove(cell);
                ctx.surface.remove_node(cell);
            }
        }
        self.reapply_row_widths(ctx, rows);
    }

    /// Toggles frozen state for one column's cells across `rows`.
    pub(crate) fn set_column_frozen<S: Surface>(
        &self,
        ctx: &mut SectionCtx<'_, S>,
        rows: &[SectionRow],
        column: usize,
        frozen: bool,
    ) {
        let scroll_left = ctx.horizontal.scroll_pos();
        for row in rows {
            let Some(cell) = row.cells.get(column) else {
                continue;
            };
            if frozen {
                ctx.surface.set_frozen(*cell, FrozenKind::Frozen);
                ctx.tracker.set(ctx.surface, *cell, scroll_left, 0.0);
            } else {
                ctx.surface.set_frozen(*cell, FrozenKind::None);
                ctx.tracker.set(ctx.surface, *cell, 0.0, 0.0);
            }
        }
    }

    /// Marks or clears the last-frozen boundary marker on one column.
    pub(crate) fn set_column_last_frozen<S: Surface>(
        &self,
        ctx: &mut SectionCtx<'_, S>,
        rows: &[SectionRow],
        column: usize,
        last_frozen: bool,
    ) {
        let scroll_left = ctx.horizontal.scroll_pos();
        for row in rows {
            let Some(cell) = row.cells.get(column) else {
                continue;
            };
            if last_frozen {
                ctx.surface.set_frozen(*cell, FrozenKind::LastFrozen);
                ctx.tracker.set(ctx.surface, *cell, scroll_left, 0.0);
            } else {
                ctx.surface.set_frozen(*cell, FrozenKind::None);
                ctx.tracker.set(ctx.surface, *cell, 0.0, 0.0);
            }
        }
    }

    /// Re-pins one frozen column's cells at a new horizontal scroll offset.
    pub(crate) fn update_freeze_position<S: Surface>(
        &self,
        ctx: &mut SectionCtx<'_, S>,
        rows: &[SectionRow],
        column: usize,
        scroll_left: f64,
    ) {
        for row in rows {
            if let Some(cell) = row.cells.get(column) {
                ctx.tracker.set(ctx.surface, *cell, scroll_left, 0.0);
            }
        }
    }

    /// Reapplies calculated column widths to every cell, then row widths.
    pub(crate) fn reapply_column_widths<S: Surface>(
        &self,
        ctx: &mut SectionCtx<'_, S>,
        rows: &[SectionRow],
    ) {
        for row in rows {
            for (col, cell) in row.cells.iter().enumerate() {
                let width = ctx.columns.calculated_width(col).max(0.0);
                ctx.surface
                    .set_extent(*cell, Size::new(width, self.default_row_height));
            }
        }
        self.reapply_row_widths(ctx, rows);
    }

    /// Applies the total column width to each row node.
    pub(crate) fn reapply_row_widths<S: Surface>(
        &self,
        ctx: &mut SectionCtx<'_, S>,
        rows: &[SectionRow],
    ) {
        let row_width = ctx.columns.row_width();
        if row_width < 0.0 {
            return;
        }
        for row in rows {
            ctx.surface
                .set_extent(row.node, Size::new(row_width, self.default_row_height));
        }
    }

    /// Applies a row height to every cell of every materialized row.
    pub(crate) fn reapply_row_heights<S: Surface>(
        &self,
        ctx: &mut SectionCtx<'_, S>,
        rows: &[SectionRow],
        height: f64,
    ) {
        debug_assert!(height >= 0.0, "row height must not be negative");
        for row in rows {
            for (col, cell) in row.cells.iter().enumerate() {
                let width = ctx.columns.calculated_width(col).max(0.0);
                ctx.surface.set_extent(*cell, Size::new(width, height));
            }
            ctx.surface
                .set_extent(row.node, Size::new(ctx.columns.row_width(), height));
        }
    }

    /// The widest content-driven minimum cell width in `column` across the
    /// given rows, with the sub-pixel measurement compensation applied.
    /// Returns 0 when no cell is materialized in that column.
    pub(crate) fn measure_min_cell_width<S: Surface>(
        &self,
        ctx: &mut SectionCtx<'_, S>,
        rows: &[SectionRow],
        column: usize,
    ) -> f64 {
        let mut min_cell_width: f64 = 0.0;
        for row in rows {
            if let Some(cell) = row.cells.get(column) {
                let required = ctx.surface.measure_intrinsic(*cell).width;
                min_cell_width = min_cell_width.max(required + WIDTH_MEASUREMENT_EPSILON);
            }
        }
        min_cell_width
    }
}
