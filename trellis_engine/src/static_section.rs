// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Header and footer sections.
//!
//! Static sections materialize every logical row, so the logical, physical,
//! and visual coordinate systems coincide and no row pool is needed. Their
//! height participates in the engine's vertical layout: growing the header
//! pushes the body down and shrinks the space the vertical scrollbar covers.

use alloc::boxed::Box;
use alloc::vec::Vec;

use trellis_surface::Surface;

use crate::error::Result;
use crate::section::{RowSection, SectionCore, SectionCtx, SectionRow};
use crate::updater::RowUpdater;

/// A fully materialized row section (header or footer).
#[derive(Debug, Default)]
pub struct StaticSection {
    core: SectionCore,
    rows: Vec<SectionRow>,
    height: f64,
}

impl RowSection for StaticSection {
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
        self.height
    }
}

impl StaticSection {
    pub(crate) fn set_updater(&mut self, updater: Box<dyn RowUpdater>) {
        self.core.set_updater(updater);
    }

    /// Inserts `count` logical rows before `index`, materializing them when
    /// attached. Returns whether the section height changed.
    pub(crate) fn insert_rows<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        index: usize,
        count: usize,
    ) -> Result<bool> {
        self.core.check_insert_range(index, count)?;
        let was_empty = self.core.row_count() == 0;
        self.core.add_rows(count);

        if ctx.attached && self.core.is_attached() {
            for i in index..index + count {
                let row = self.core.create_row_node(ctx, i);
                self.core.run_attach(&row, i);
                self.rows.insert(i, row);
            }
            // The first rows provide the surface the column widths were
            // waiting for.
            if was_empty {
                self.core.reapply_column_widths(ctx, &self.rows);
            }
        }
        Ok(self.recalculate_height())
    }

    /// Removes `count` logical rows starting at `index`. The vertical scroll
    /// position is preserved across the mutation. Returns whether the
    /// section height changed.
    pub(crate) fn remove_rows<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        index: usize,
        count: usize,
    ) -> Result<bool> {
        self.core.check_existing_range(index, count)?;
        let scroll_pos = ctx.vertical.scroll_pos();
        self.core.subtract_rows(count);

        if ctx.attached && self.core.is_attached() {
            for row in self.rows.drain(index..index + count).collect::<Vec<_>>() {
                self.core.detach_row(ctx, &row, index);
            }
        }
        let changed = self.recalculate_height();
        ctx.vertical.set_scroll_pos(scroll_pos);
        Ok(changed)
    }

    /// Rebinds the given logical rows through the updater. A no-op while
    /// detached or while the grid has no columns.
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
        for i in index..index + count {
            let row = self.rows[i].clone();
            self.core.run_update(&row, i);
        }
        Ok(())
    }

    pub(crate) fn set_default_row_height<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        px: f64,
    ) -> Result<bool> {
        self.core.set_default_row_height(px)?;
        self.core
            .reapply_row_heights(ctx, &self.rows, self.core.default_row_height());
        Ok(self.recalculate_height())
    }

    /// Probes the natural row height on attach. Returns whether the section
    /// height changed.
    pub(crate) fn autodetect_row_height<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
    ) -> bool {
        if self.core.autodetect_row_height(ctx.surface) {
            self.core
                .reapply_row_heights(ctx, &self.rows, self.core.default_row_height());
            self.recalculate_height()
        } else {
            false
        }
    }

    /// Materializes all logical rows under a fresh section root.
    pub(crate) fn attach<S: Surface>(&mut self, ctx: &mut SectionCtx<'_, S>, child_index: usize) {
        debug_assert!(self.rows.is_empty(), "attach with rows already materialized");
        let root = ctx.surface.create_child(ctx.surface.root(), child_index);
        self.core.set_root(Some(root));
        for i in 0..self.core.row_count() {
            let row = self.core.create_row_node(ctx, i);
            self.core.run_attach(&row, i);
            self.rows.push(row);
        }
        self.recalculate_height();
    }

    /// Tears down the materialized rows and the section root.
    pub(crate) fn detach<S: Surface>(&mut self, ctx: &mut SectionCtx<'_, S>) {
        for (i, row) in core::mem::take(&mut self.rows).into_iter().enumerate() {
            self.core.detach_row(ctx, &row, i);
        }
        if self.core.is_attached() {
            ctx.surface.remove_node(self.core.root());
        }
        self.core.set_root(None);
        self.height = 0.0;
    }

    pub(crate) fn root(&self) -> trellis_surface::NodeId {
        self.core.root()
    }

    pub(crate) fn is_materialized(&self) -> bool {
        self.core.is_attached()
    }

    pub(crate) fn paint_insert_columns<S: Surface>(
        &mut self,
        ctx: &mut SectionCtx<'_, S>,
        offset: usize,
        count: usize,
        frozen: bool,
    ) {
        let mut rows = core::mem::take(&mut self.rows);
        self.core
            .paint_insert_cells(ctx, &mut rows, |visual| visual, offset, count, frozen);
        self.rows = rows;
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

    pub(crate) fn reapply_column_widths<S: Surface>(&self, ctx: &mut SectionCtx<'_, S>) {
        self.core.reapply_column_widths(ctx, &self.rows);
    }

    pub(crate) fn measure_min_cell_width<S: Surface>(
        &self,
        ctx: &mut SectionCtx<'_, S>,
        column: usize,
    ) -> f64 {
        self.core.measure_min_cell_width(ctx, &self.rows, column)
    }

    /// The row at a visual index, which for static sections is also the
    /// logical index.
    #[cfg(test)]
    pub(crate) fn row(&self, visual_index: usize) -> Option<&SectionRow> {
        self.rows.get(visual_index)
    }

    fn recalculate_height(&mut self) -> bool {
        let new_height = self.core.total_row_height();
        let changed = new_height != self.height;
        self.height = new_height;
        changed
    }
}
