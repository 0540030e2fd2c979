// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The engine facade.
//!
//! [`Engine`] owns every component by value: the surface, the three row
//! sections, the column configuration, both scrollbars, the position
//! tracker, the event queue, and the deferred-work set. Components never
//! hold a back-reference to it; each operation lends them a
//! [`SectionCtx`] for its duration and reads returned effect values to
//! decide what to propagate.
//!
//! The engine is single-threaded and cooperative. Input arrives through the
//! `handle_*` methods with a host-supplied millisecond clock; work that must
//! coalesce (display-order sorting, size recalculation) or must not run
//! reentrantly (scroll-to-row) is parked in a [`DeferredSet`] and drained by
//! [`Engine::flush_deferred`] once per frame tick.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use smallvec::SmallVec;
use trellis_range::Range;
use trellis_surface::{DeltaUnit, EventKind, SubscriptionId, Surface, TouchMove, WheelDelta};

use crate::columns::ColumnConfig;
use crate::deferred::{DeferredSet, PendingRowScroll};
use crate::error::{EngineError, Result};
use crate::events::{EngineEvent, EventSink};
use crate::scrollbar::Scrollbar;
use crate::scroller::{self, ScrollDestination, ViewportInputs};
use crate::scrolling_section::ScrollingSection;
use crate::section::{RowSection, SectionCtx};
use crate::static_section::StaticSection;
use crate::tracker::PositionTracker;
use crate::updater::{RowUpdater, SpacerUpdater};

/// Body row count shown while in [`HeightMode::Row`] before one is set.
const DEFAULT_HEIGHT_BY_ROWS: f64 = 10.0;

#[expect(
    clippy::cast_possible_wrap,
    reason = "row indices stay far below i64::MAX"
)]
fn signed(index: usize) -> i64 {
    index as i64
}

/// One of the three row sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// The fully materialized section above the body.
    Header,
    /// The virtualized, scrollable section.
    Body,
    /// The fully materialized section below the body.
    Footer,
}

/// How the engine's overall height is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeightMode {
    /// The host dictates the height through [`Engine::set_height`] and
    /// resize events.
    #[default]
    Css,
    /// The engine sizes itself so the body shows
    /// [`Engine::height_by_rows`] rows.
    Row,
}

/// A scroll axis, for the per-axis lock switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAxis {
    /// Left-right.
    Horizontal,
    /// Up-down.
    Vertical,
}

/// The virtualized table-rendering engine.
///
/// See the [crate docs](crate) for an overview and a usage example.
pub struct Engine<S: Surface> {
    surface: S,
    tracker: PositionTracker,
    columns: ColumnConfig,
    header: StaticSection,
    body: ScrollingSection,
    footer: StaticSection,
    vertical: Scrollbar,
    horizontal: Scrollbar,
    events: EventSink,
    deferred: DeferredSet,
    subscriptions: SmallVec<[SubscriptionId; 3]>,
    attached: bool,
    width_of_engine: f64,
    height_of_engine: f64,
    height_mode: HeightMode,
    height_by_rows: f64,
    /// Height last requested by the host, reapplied when switching back to
    /// [`HeightMode::Css`].
    height_by_host: f64,
    last_scroll_top: f64,
    last_scroll_left: f64,
    /// Most recent host clock reading, for scheduling debounced work from
    /// paths that have no timestamp of their own.
    now_ms: u64,
}

impl<S: Surface> fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("attached", &self.attached)
            .field("width_of_engine", &self.width_of_engine)
            .field("height_of_engine", &self.height_of_engine)
            .field("height_mode", &self.height_mode)
            .finish_non_exhaustive()
    }
}

/// The facade's fields, borrow-split so sections can run against a
/// [`SectionCtx`] while remaining mutable themselves.
struct EngineParts<'a, S: Surface> {
    ctx: SectionCtx<'a, S>,
    header: &'a mut StaticSection,
    body: &'a mut ScrollingSection,
    footer: &'a mut StaticSection,
    deferred: &'a mut DeferredSet,
}

impl<S: Surface> Engine<S> {
    /// Creates a detached engine over `surface`, sized to its viewport.
    pub fn new(surface: S) -> Self {
        let viewport = surface.viewport_size();
        Self {
            surface,
            tracker: PositionTracker::default(),
            columns: ColumnConfig::default(),
            header: StaticSection::default(),
            body: ScrollingSection::default(),
            footer: StaticSection::default(),
            vertical: Scrollbar::default(),
            horizontal: Scrollbar::default(),
            events: EventSink::default(),
            deferred: DeferredSet::default(),
            subscriptions: SmallVec::new(),
            attached: false,
            width_of_engine: viewport.width.max(0.0),
            height_of_engine: viewport.height.max(0.0),
            height_mode: HeightMode::default(),
            height_by_rows: DEFAULT_HEIGHT_BY_ROWS,
            height_by_host: viewport.height.max(0.0),
            last_scroll_top: 0.0,
            last_scroll_left: 0.0,
            now_ms: 0,
        }
    }

    fn parts(&mut self) -> EngineParts<'_, S> {
        let Self {
            surface,
            tracker,
            columns,
            header,
            body,
            footer,
            vertical,
            horizontal,
            events,
            deferred,
            attached,
            ..
        } = self;
        EngineParts {
            ctx: SectionCtx {
                surface,
                tracker,
                columns,
                vertical,
                horizontal,
                events,
                attached: *attached,
            },
            header,
            body,
            footer,
            deferred,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle

    /// Whether the engine currently drives a live surface.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Attaches to the surface: subscribes to input, materializes all
    /// sections, autodetects row heights, resolves column measurements
    /// latched while detached, and sizes everything.
    pub fn attach(&mut self) {
        if self.attached {
            return;
        }
        self.attached = true;
        for kind in [EventKind::Scroll, EventKind::Wheel, EventKind::Touch] {
            let subscription = self.surface.subscribe(kind);
            self.subscriptions.push(subscription);
        }

        let viewport = self.surface.viewport_size();
        self.width_of_engine = viewport.width.max(0.0);
        if self.height_mode == HeightMode::Css {
            self.height_of_engine = viewport.height.max(0.0);
            self.height_by_host = self.height_of_engine;
        }

        let had_pending_measurements = !self.columns.pending_measurements().is_empty();
        {
            let mut p = self.parts();
            p.header.attach(&mut p.ctx, 0);
            p.header.autodetect_row_height(&mut p.ctx);
            p.body.attach(&mut p.ctx, 1);
            p.body.autodetect_row_height(&mut p.ctx);
            let footer_index = p.ctx.surface.child_count(p.ctx.surface.root());
            p.footer.attach(&mut p.ctx, footer_index);
            p.footer.autodetect_row_height(&mut p.ctx);
        }

        self.flush_column_measurements();
        if had_pending_measurements {
            let mut p = self.parts();
            p.header.reapply_column_widths(&mut p.ctx);
            p.body.reapply_column_widths(&mut p.ctx);
            p.footer.reapply_column_widths(&mut p.ctx);
        }

        self.apply_height_by_rows();
        self.recalculate_element_sizes();
        self.events.push_row_visibility(self.visible_row_range());
    }

    /// Detaches from the surface: unsubscribes and tears down every
    /// materialized node. Row counts, column widths, and the frozen boundary
    /// survive for a later re-attach; spacers and the scroll position do not.
    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        for subscription in core::mem::take(&mut self.subscriptions) {
            self.surface.unsubscribe(subscription);
        }
        {
            let mut p = self.parts();
            p.header.detach(&mut p.ctx);
            p.body.detach(&mut p.ctx);
            p.footer.detach(&mut p.ctx);
        }
        self.attached = false;
        self.last_scroll_top = 0.0;
        self.last_scroll_left = 0.0;
        self.vertical.set_scroll_pos(0.0);
        self.horizontal.set_scroll_pos(0.0);
    }

    /// The surface the engine drives.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the surface, for host-side configuration.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    // -----------------------------------------------------------------------
    // Section access

    /// Read access to the header section.
    #[must_use]
    pub fn header(&self) -> &StaticSection {
        &self.header
    }

    /// Read access to the body section.
    #[must_use]
    pub fn body(&self) -> &ScrollingSection {
        &self.body
    }

    /// Read access to the footer section.
    #[must_use]
    pub fn footer(&self) -> &StaticSection {
        &self.footer
    }

    /// The logical row count of a section.
    #[must_use]
    pub fn row_count(&self, section: SectionKind) -> usize {
        match section {
            SectionKind::Header => self.header.row_count(),
            SectionKind::Body => self.body.row_count(),
            SectionKind::Footer => self.footer.row_count(),
        }
    }

    /// Installs the updater that binds data into a section's rows.
    pub fn set_row_updater(&mut self, section: SectionKind, updater: Box<dyn RowUpdater>) {
        match section {
            SectionKind::Header => self.header.set_updater(updater),
            SectionKind::Body => self.body.set_updater(updater),
            SectionKind::Footer => self.footer.set_updater(updater),
        }
    }

    /// Installs the updater that manages spacer content.
    pub fn set_spacer_updater(&mut self, updater: Box<dyn SpacerUpdater>) {
        self.body.set_spacer_updater(updater);
    }

    // -----------------------------------------------------------------------
    // Row mutation

    /// Inserts `count` logical rows before `index` in a section. While
    /// detached only the bookkeeping changes; rows materialize on attach.
    pub fn insert_rows(&mut self, section: SectionKind, index: usize, count: usize) -> Result<()> {
        match section {
            SectionKind::Header => {
                let changed = {
                    let mut p = self.parts();
                    p.header.insert_rows(&mut p.ctx, index, count)?
                };
                if changed {
                    self.static_section_height_changed();
                }
            }
            SectionKind::Footer => {
                let changed = {
                    let mut p = self.parts();
                    p.footer.insert_rows(&mut p.ctx, index, count)?
                };
                if changed {
                    self.static_section_height_changed();
                }
            }
            SectionKind::Body => {
                {
                    let mut p = self.parts();
                    p.body.insert_rows(&mut p.ctx, index, count)?;
                }
                self.recalculate_element_sizes();
            }
        }
        Ok(())
    }

    /// Removes `count` logical rows starting at `index` from a section.
    pub fn remove_rows(&mut self, section: SectionKind, index: usize, count: usize) -> Result<()> {
        match section {
            SectionKind::Header => {
                let changed = {
                    let mut p = self.parts();
                    p.header.remove_rows(&mut p.ctx, index, count)?
                };
                if changed {
                    self.static_section_height_changed();
                }
            }
            SectionKind::Footer => {
                let changed = {
                    let mut p = self.parts();
                    p.footer.remove_rows(&mut p.ctx, index, count)?
                };
                if changed {
                    self.static_section_height_changed();
                }
            }
            SectionKind::Body => {
                {
                    let mut p = self.parts();
                    p.body.remove_rows(&mut p.ctx, index, count)?;
                }
                self.recalculate_element_sizes();
            }
        }
        Ok(())
    }

    /// Rebinds the given logical rows through the section's updater.
    pub fn refresh_rows(&mut self, section: SectionKind, index: usize, count: usize) -> Result<()> {
        let mut p = self.parts();
        match section {
            SectionKind::Header => p.header.refresh_rows(&mut p.ctx, index, count),
            SectionKind::Body => p.body.refresh_rows(&mut p.ctx, index, count),
            SectionKind::Footer => p.footer.refresh_rows(&mut p.ctx, index, count),
        }
    }

    /// A static-section height change ripples into the overall layout.
    fn static_section_height_changed(&mut self) {
        self.apply_height_by_rows();
        self.recalculate_element_sizes();
    }

    // -----------------------------------------------------------------------
    // Row heights

    /// The default row height of a section.
    #[must_use]
    pub fn default_row_height(&self, section: SectionKind) -> f64 {
        match section {
            SectionKind::Header => self.header.default_row_height(),
            SectionKind::Body => self.body.default_row_height(),
            SectionKind::Footer => self.footer.default_row_height(),
        }
    }

    /// Pins a section's default row height, disabling autodetection.
    pub fn set_default_row_height(&mut self, section: SectionKind, px: f64) -> Result<()> {
        match section {
            SectionKind::Header => {
                let changed = {
                    let mut p = self.parts();
                    p.header.set_default_row_height(&mut p.ctx, px)?
                };
                if changed {
                    self.static_section_height_changed();
                }
            }
            SectionKind::Footer => {
                let changed = {
                    let mut p = self.parts();
                    p.footer.set_default_row_height(&mut p.ctx, px)?
                };
                if changed {
                    self.static_section_height_changed();
                }
            }
            SectionKind::Body => {
                {
                    let mut p = self.parts();
                    p.body.set_default_row_height(&mut p.ctx, px)?;
                }
                self.apply_height_by_rows();
                self.recalculate_element_sizes();
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Spacers

    /// Opens, resizes, or removes (negative height) the spacer anchored
    /// below logical `row`. Anchor `-1` opens a spacer above the first row.
    ///
    /// Spacers carry surface content, so this requires an attached engine.
    pub fn set_spacer(&mut self, row: i64, height: f64) -> Result<()> {
        if !self.attached {
            return Err(EngineError::IllegalState(format!(
                "cannot set a spacer at row {row} while detached"
            )));
        }
        {
            let mut p = self.parts();
            p.body.set_spacer(&mut p.ctx, row, height)?;
        }
        self.recalculate_element_sizes();
        Ok(())
    }

    /// The height of the spacer at `row`, or 0 when none is open.
    #[must_use]
    pub fn spacer_height(&self, row: i64) -> f64 {
        self.body.spacers().height_of(row)
    }

    // -----------------------------------------------------------------------
    // Columns

    /// The number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.column_count()
    }

    /// The number of frozen columns.
    #[must_use]
    pub fn frozen_column_count(&self) -> usize {
        self.columns.frozen_column_count()
    }

    /// The width a column actually occupies.
    #[must_use]
    pub fn column_width(&self, index: usize) -> f64 {
        self.columns.calculated_width(index)
    }

    /// Inserts `count` columns before `index` into every section.
    ///
    /// When the body is horizontally scrolled past the insertion point, the
    /// scroll position is compensated by the inserted width so the content
    /// in view does not shift.
    pub fn insert_columns(&mut self, index: usize, count: usize) -> Result<()> {
        let frozen = self.columns.insert(index, count)?;
        if !self.attached {
            return Ok(());
        }

        let inserted_width = self.columns.widths_sum(Range::with_length(index, count));
        let left_of_insertion =
            self.columns.widths_sum(Range::between(0, index)) - self.columns.frozen_pixels();
        {
            let mut p = self.parts();
            p.header.paint_insert_columns(&mut p.ctx, index, count, frozen);
            p.body.paint_insert_columns(&mut p.ctx, index, count, frozen);
            p.footer.paint_insert_columns(&mut p.ctx, index, count, frozen);
        }
        if frozen {
            self.reapply_frozen_markers();
        }
        self.recalculate_element_sizes();
        if !frozen && self.horizontal.scroll_pos() > left_of_insertion {
            let pos = self.horizontal.scroll_pos();
            self.horizontal.set_scroll_pos(pos + inserted_width);
            self.synchronize_scroll();
        }
        Ok(())
    }

    /// Removes the columns in `[index, index + count)` from every section,
    /// adjusting the frozen boundary and compensating the horizontal scroll
    /// position by the removed width (never below zero).
    pub fn remove_columns(&mut self, index: usize, count: usize) -> Result<()> {
        self.columns.check_column_range(index, count)?;
        let removed_width = self.columns.widths_sum(Range::with_length(index, count));
        let left_of_removal =
            self.columns.widths_sum(Range::between(0, index)) - self.columns.frozen_pixels();
        let frozen_before = self.columns.frozen_column_count();
        self.columns.remove(index, count)?;
        if !self.attached {
            return Ok(());
        }

        {
            let mut p = self.parts();
            p.header.paint_remove_columns(&mut p.ctx, index, count);
            p.body.paint_remove_columns(&mut p.ctx, index, count);
            p.footer.paint_remove_columns(&mut p.ctx, index, count);
        }
        if self.columns.frozen_column_count() != frozen_before {
            self.reapply_frozen_markers();
        }
        if self.horizontal.scroll_pos() > left_of_removal.max(0.0) {
            let pos = self.horizontal.scroll_pos();
            self.horizontal.set_scroll_pos((pos - removed_width).max(0.0));
        }
        self.recalculate_element_sizes();
        self.synchronize_scroll();
        Ok(())
    }

    /// Moves the frozen-column boundary and repins the affected cells.
    pub fn set_frozen_column_count(&mut self, count: usize) -> Result<()> {
        let Some(change) = self.columns.set_frozen_count(count)? else {
            return Ok(());
        };
        if !self.attached {
            return Ok(());
        }
        let freezing = change.freezing();
        let affected = change.affected();
        {
            let mut p = self.parts();
            for column in affected.start()..affected.end() {
                p.header.set_column_frozen(&mut p.ctx, column, freezing);
                p.body.set_column_frozen(&mut p.ctx, column, freezing);
                p.footer.set_column_frozen(&mut p.ctx, column, freezing);
            }
        }
        self.reapply_frozen_markers();
        self.recalculate_element_sizes();
        self.synchronize_scroll();
        Ok(())
    }

    /// Sets one column's defined width. Negative puts the column into
    /// "size to content" mode.
    pub fn set_column_width(&mut self, index: usize, width: f64) -> Result<()> {
        self.set_column_widths(&[(index, width)])
    }

    /// Sets defined widths for several columns at once. All indices are
    /// validated before anything is applied.
    pub fn set_column_widths(&mut self, widths: &[(usize, f64)]) -> Result<()> {
        self.columns.set_widths(widths)?;
        if self.attached {
            self.flush_column_measurements();
            {
                let mut p = self.parts();
                p.header.reapply_column_widths(&mut p.ctx);
                p.body.reapply_column_widths(&mut p.ctx);
                p.footer.reapply_column_widths(&mut p.ctx);
            }
            self.recalculate_element_sizes();
        }
        Ok(())
    }

    /// The content-driven minimum width of a column: the widest required
    /// cell width across header, body, and footer.
    pub fn min_cell_width(&mut self, column: usize) -> Result<f64> {
        self.columns.check_column_index(column)?;
        let mut p = self.parts();
        let width = p
            .header
            .measure_min_cell_width(&mut p.ctx, column)
            .max(p.body.measure_min_cell_width(&mut p.ctx, column))
            .max(p.footer.measure_min_cell_width(&mut p.ctx, column));
        Ok(width)
    }

    /// Resolves every latched auto-width measurement against the
    /// materialized cells.
    fn flush_column_measurements(&mut self) {
        for column in self.columns.pending_measurements() {
            let width = {
                let mut p = self.parts();
                p.header
                    .measure_min_cell_width(&mut p.ctx, column)
                    .max(p.body.measure_min_cell_width(&mut p.ctx, column))
                    .max(p.footer.measure_min_cell_width(&mut p.ctx, column))
            };
            self.columns.apply_measured_width(column, width);
        }
    }

    /// Restores the plain-frozen/last-frozen distinction after the boundary
    /// or the column set changed.
    fn reapply_frozen_markers(&mut self) {
        let frozen_count = self.columns.frozen_column_count();
        if frozen_count == 0 {
            return;
        }
        let mut p = self.parts();
        for column in 0..frozen_count {
            if column == frozen_count - 1 {
                p.header.set_column_last_frozen(&mut p.ctx, column, true);
                p.body.set_column_last_frozen(&mut p.ctx, column, true);
                p.footer.set_column_last_frozen(&mut p.ctx, column, true);
            } else {
                p.header.set_column_frozen(&mut p.ctx, column, true);
                p.body.set_column_frozen(&mut p.ctx, column, true);
                p.footer.set_column_frozen(&mut p.ctx, column, true);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Sizing

    /// The width without the vertical scrollbar, when one is showing.
    #[must_use]
    pub fn inner_width(&self) -> f64 {
        if self.vertical.shows_scroll_handle() {
            (self.width_of_engine - self.vertical.thickness()).max(0.0)
        } else {
            self.width_of_engine
        }
    }

    /// Sets the engine's overall width in pixels.
    pub fn set_width(&mut self, px: f64) {
        self.width_of_engine = px.max(0.0);
        self.recalculate_element_sizes();
    }

    /// Sets the engine's overall height in pixels. In [`HeightMode::Row`]
    /// the value is remembered and applied when the mode switches back.
    pub fn set_height(&mut self, px: f64) {
        self.height_by_host = px.max(0.0);
        if self.height_mode == HeightMode::Css {
            self.set_height_internal(px);
        }
    }

    fn set_height_internal(&mut self, px: f64) {
        let rows_before = self.body.materialized_row_count();
        self.height_of_engine = px.max(0.0);
        self.recalculate_element_sizes();
        if rows_before != self.body.materialized_row_count() {
            self.events.push_row_visibility(self.visible_row_range());
        }
    }

    /// The current height mode.
    #[must_use]
    pub fn height_mode(&self) -> HeightMode {
        self.height_mode
    }

    /// Switches how the overall height is determined, applying whichever
    /// value the new mode remembers.
    pub fn set_height_mode(&mut self, mode: HeightMode) {
        if mode == self.height_mode {
            return;
        }
        self.height_mode = mode;
        match mode {
            HeightMode::Css => self.set_height_internal(self.height_by_host),
            HeightMode::Row => self.apply_height_by_rows(),
        }
    }

    /// The number of body rows the engine sizes itself for while in
    /// [`HeightMode::Row`].
    #[must_use]
    pub fn height_by_rows(&self) -> f64 {
        self.height_by_rows
    }

    /// Sets the number of body rows to show while in [`HeightMode::Row`].
    /// Fractional values are allowed.
    pub fn set_height_by_rows(&mut self, rows: f64) -> Result<()> {
        if rows.is_nan() {
            return Err(EngineError::InvalidArgument(format!(
                "the number of rows must not be NaN (was {rows})"
            )));
        }
        if !rows.is_finite() {
            return Err(EngineError::InvalidArgument(format!(
                "the number of rows must be finite (was {rows})"
            )));
        }
        if rows <= 0.0 {
            return Err(EngineError::InvalidArgument(format!(
                "the number of rows must be a positive number (was {rows})"
            )));
        }
        self.height_by_rows = rows;
        self.apply_height_by_rows();
        Ok(())
    }

    fn apply_height_by_rows(&mut self) {
        if self.height_mode != HeightMode::Row {
            return;
        }
        let scrollbar = if self.horizontal.shows_scroll_handle() {
            self.horizontal.thickness()
        } else {
            0.0
        };
        let total = self.header.section_height()
            + self.body.default_row_height() * self.height_by_rows
            + self.footer.section_height()
            + scrollbar;
        self.set_height_internal(total);
    }

    /// Recomputes section heights, scrollbar geometry, the body pool size,
    /// and spacer widths, in that order. A no-op while detached.
    pub fn recalculate_element_sizes(&mut self) {
        if !self.attached {
            return;
        }
        let inputs = ViewportInputs {
            width_of_engine: self.width_of_engine,
            height_of_engine: self.height_of_engine,
            header_height: self.header.section_height(),
            footer_height: self.footer.section_height(),
            scroll_content_height: self.body.scroll_height(),
        };
        scroller::recalculate_virtual_viewport(
            inputs,
            &self.columns,
            &mut self.vertical,
            &mut self.horizontal,
        );
        self.body.set_section_height(self.vertical.offset_size());
        let mut p = self.parts();
        p.body.verify_row_pool(&mut p.ctx);
        p.body.reapply_spacer_widths(&mut p.ctx);
        p.body.update_spacer_visibility(&mut p.ctx);
    }

    // -----------------------------------------------------------------------
    // Scrolling

    /// The vertical scroll offset.
    #[must_use]
    pub fn scroll_top(&self) -> f64 {
        self.vertical.scroll_pos()
    }

    /// Scrolls vertically to `px`, clamped into the scrollable span.
    /// Programmatic scrolling ignores the axis lock.
    pub fn set_scroll_top(&mut self, px: f64) {
        self.vertical.set_scroll_pos(px);
        self.synchronize_scroll();
    }

    /// The horizontal scroll offset, in unfrozen-content pixels.
    #[must_use]
    pub fn scroll_left(&self) -> f64 {
        self.horizontal.scroll_pos()
    }

    /// Scrolls horizontally to `px`, clamped into the scrollable span.
    /// Programmatic scrolling ignores the axis lock.
    pub fn set_scroll_left(&mut self, px: f64) {
        self.horizontal.set_scroll_pos(px);
        self.synchronize_scroll();
    }

    /// The virtual scroll width: the summed width of the unfrozen columns.
    #[must_use]
    pub fn scroll_width(&self) -> f64 {
        self.horizontal.scroll_size()
    }

    /// The virtual scroll height: all logical body rows plus all spacers.
    #[must_use]
    pub fn scroll_height(&self) -> f64 {
        self.vertical.scroll_size()
    }

    /// Locks or unlocks input-driven scrolling on one axis.
    pub fn set_scroll_locked(&mut self, axis: ScrollAxis, locked: bool) {
        match axis {
            ScrollAxis::Horizontal => self.horizontal.set_locked(locked),
            ScrollAxis::Vertical => self.vertical.set_locked(locked),
        }
    }

    /// Whether input-driven scrolling is locked on an axis.
    #[must_use]
    pub fn is_scroll_locked(&self, axis: ScrollAxis) -> bool {
        match axis {
            ScrollAxis::Horizontal => self.horizontal.is_locked(),
            ScrollAxis::Vertical => self.vertical.is_locked(),
        }
    }

    /// The logical index range of the rows currently covered by the body
    /// pool.
    #[must_use]
    pub fn visible_row_range(&self) -> Range {
        if self.body.materialized_row_count() > 0 {
            self.body.visible_row_range()
        } else {
            Range::EMPTY
        }
    }

    /// The maximum number of body rows that can be on screen at once.
    #[must_use]
    pub fn max_visible_row_count(&self) -> usize {
        self.body.max_row_capacity()
    }

    /// Reconciles everything that depends on the scrollbar positions:
    /// frozen-cell pinning and header/footer translation when `scroll_left`
    /// moved, then the body pool, then spacer visibility.
    fn synchronize_scroll(&mut self) {
        if !self.attached {
            return;
        }
        let scroll_left = self.horizontal.scroll_pos();
        let scroll_top = self.vertical.scroll_pos();
        let left_changed = scroll_left != self.last_scroll_left;
        let top_changed = scroll_top != self.last_scroll_top;
        if !left_changed && !top_changed {
            return;
        }
        self.last_scroll_left = scroll_left;
        self.last_scroll_top = scroll_top;

        let now_ms = self.now_ms;
        let mut p = self.parts();
        if left_changed {
            for column in 0..p.ctx.columns.frozen_column_count() {
                p.header.update_freeze_position(&mut p.ctx, column, scroll_left);
                p.body.update_freeze_position(&mut p.ctx, column, scroll_left);
                p.footer.update_freeze_position(&mut p.ctx, column, scroll_left);
            }
            if p.header.is_materialized() {
                let root = p.header.root();
                p.ctx.tracker.set(p.ctx.surface, root, -scroll_left, 0.0);
            }
            if p.footer.is_materialized() {
                let root = p.footer.root();
                p.ctx.tracker.set(p.ctx.surface, root, -scroll_left, 0.0);
            }
        }
        p.body.set_body_scroll_position(&mut p.ctx, scroll_left, scroll_top);
        if left_changed {
            p.body.reposition_spacers(&mut p.ctx);
        }
        if top_changed {
            if p.body.update_rows_on_scroll(&mut p.ctx) {
                p.deferred.schedule_sort(now_ms);
            }
            p.body.update_spacer_visibility(&mut p.ctx);
        }
        p.ctx.events.push(EngineEvent::Scroll);
    }

    // -----------------------------------------------------------------------
    // Input

    /// Applies a scrollbar-driven position change. Ignored while the axis
    /// is locked.
    pub fn handle_scrollbar_scroll(&mut self, axis: ScrollAxis, pos: f64, now_ms: u64) {
        self.now_ms = now_ms;
        let scrollbar = match axis {
            ScrollAxis::Horizontal => &mut self.horizontal,
            ScrollAxis::Vertical => &mut self.vertical,
        };
        if scrollbar.is_locked() {
            return;
        }
        scrollbar.set_scroll_pos(pos);
        self.synchronize_scroll();
    }

    /// Applies a normalized wheel event. Line-unit deltas are scaled by the
    /// body's default row height; events outside the body do not scroll.
    pub fn handle_wheel(&mut self, delta: WheelDelta, now_ms: u64) {
        self.now_ms = now_ms;
        if !delta.within_body {
            return;
        }
        let factor = match delta.unit {
            DeltaUnit::Pixel => 1.0,
            DeltaUnit::Line => self.body.default_row_height(),
        };
        if !self.horizontal.is_locked() {
            self.horizontal.scroll_by(delta.delta_x * factor);
        }
        if !self.vertical.is_locked() {
            self.vertical.scroll_by(delta.delta_y * factor);
        }
        self.synchronize_scroll();
    }

    /// Applies a touch-drag step. Content follows the finger, so the scroll
    /// position moves opposite to the drag.
    pub fn handle_touch_move(&mut self, touch: TouchMove, now_ms: u64) {
        self.now_ms = now_ms;
        if !self.horizontal.is_locked() {
            self.horizontal.scroll_by(-touch.dx);
        }
        if !self.vertical.is_locked() {
            self.vertical.scroll_by(-touch.dy);
        }
        self.synchronize_scroll();
    }

    /// Notes that the host's viewport changed; the size recalculation runs
    /// at the next [`Self::flush_deferred`].
    pub fn handle_resize(&mut self) {
        self.deferred.schedule_recalculate();
    }

    // -----------------------------------------------------------------------
    // Scroll-to

    /// Scrolls horizontally so the column at `index` is visible with
    /// `padding` pixels toward `destination`. Frozen columns are always
    /// visible and cannot be scrolled to.
    pub fn scroll_to_column(
        &mut self,
        index: usize,
        destination: ScrollDestination,
        padding: f64,
    ) -> Result<()> {
        scroller::validate_destination(destination, padding)?;
        self.columns.check_column_index(index)?;
        if index < self.columns.frozen_column_count() {
            return Err(EngineError::InvalidArgument(format!(
                "the given column index ({index}) is frozen"
            )));
        }

        // Frozen columns are treated as not there at all: both the target
        // and the viewport are expressed in unfrozen-content pixels, which
        // is also the horizontal scrollbar's coordinate space.
        let frozen_pixels = self.columns.frozen_pixels();
        let target_start = self.columns.widths_sum(Range::between(0, index)) - frozen_pixels;
        let target_end = target_start + self.columns.calculated_width(index).max(0.0);
        let viewport_start = self.horizontal.scroll_pos();
        let viewport_end = viewport_start + self.inner_width() - frozen_pixels;

        let pos = scroller::scroll_pos_for(
            destination,
            target_start,
            target_end,
            viewport_start,
            viewport_end,
            padding,
        );
        self.horizontal.set_scroll_pos(pos);
        self.synchronize_scroll();
        Ok(())
    }

    /// Scrolls vertically so the logical body row at `row` is visible with
    /// `padding` pixels toward `destination`. The scroll runs at the next
    /// [`Self::flush_deferred`], against the layout current at that time;
    /// only the most recent request is kept.
    pub fn scroll_to_row(
        &mut self,
        row: usize,
        destination: ScrollDestination,
        padding: f64,
    ) -> Result<()> {
        scroller::validate_destination(destination, padding)?;
        self.check_body_row(signed(row))?;
        self.deferred.schedule_row_scroll(PendingRowScroll {
            row: signed(row),
            destination,
            padding,
            include_spacer: false,
        });
        Ok(())
    }

    /// Scrolls vertically so the spacer anchored at `row` is visible.
    /// Unlike [`Self::scroll_to_row`] this runs immediately: a spacer's
    /// position is fully known without a layout pass.
    pub fn scroll_to_spacer(
        &mut self,
        row: i64,
        destination: ScrollDestination,
        padding: f64,
    ) -> Result<()> {
        scroller::validate_destination(destination, padding)?;
        let Some(target_start) = self.body.spacers().top_of(row) else {
            return Err(EngineError::IllegalState(format!(
                "no spacer open at index {row}"
            )));
        };
        let target_end = target_start + self.body.spacers().height_of(row);
        let viewport_start = self.vertical.scroll_pos();
        let viewport_end = viewport_start + self.body.section_height();

        let pos = scroller::scroll_pos_for(
            destination,
            target_start,
            target_end,
            viewport_start,
            viewport_end,
            padding,
        );
        self.vertical.set_scroll_pos(pos);
        self.synchronize_scroll();
        Ok(())
    }

    /// Scrolls vertically to a row together with the spacer below it, as
    /// one combined target span. `row` may be `-1` when a spacer is open
    /// above the first row. Runs at the next [`Self::flush_deferred`].
    pub fn scroll_to_row_and_spacer(
        &mut self,
        row: i64,
        destination: ScrollDestination,
        padding: f64,
    ) -> Result<()> {
        scroller::validate_destination(destination, padding)?;
        if row != -1 {
            self.check_body_row(row)?;
        } else if !self.body.spacers().exists(-1) {
            return Err(EngineError::InvalidArgument(String::from(
                "cannot scroll to row index -1, as there is no spacer open at that index",
            )));
        }
        self.deferred.schedule_row_scroll(PendingRowScroll {
            row,
            destination,
            padding,
            include_spacer: true,
        });
        Ok(())
    }

    fn check_body_row(&self, row: i64) -> Result<()> {
        if row < 0 || row >= signed(self.body.row_count()) {
            return Err(EngineError::OutOfRange(format!(
                "the given row index ({row}) does not exist"
            )));
        }
        Ok(())
    }

    /// Executes a parked vertical scroll request against the current
    /// layout. Requests whose target no longer exists degrade to a no-op.
    fn run_row_scroll(&mut self, request: PendingRowScroll) {
        if !self.attached || request.row >= signed(self.body.row_count()) {
            return;
        }

        let row_span = if request.row >= 0 {
            #[expect(clippy::cast_sign_loss, reason = "non-negative by the guard above")]
            let top = self.body.row_top(request.row as usize).floor();
            Some((top, top + self.body.default_row_height().ceil()))
        } else {
            None
        };
        let spacer_span = if request.include_spacer {
            self.body.spacers().top_of(request.row).map(|top| {
                let start = top.floor();
                (start, start + self.body.spacers().height_of(request.row).ceil())
            })
        } else {
            None
        };
        let (target_start, target_end) = match (row_span, spacer_span) {
            (Some(r), Some(s)) => (r.0.min(s.0), r.1.max(s.1)),
            (Some(r), None) => r,
            (None, Some(s)) => s,
            // Row -1 with its spacer gone in the meantime.
            (None, None) => return,
        };

        let viewport_start = self.vertical.scroll_pos();
        let viewport_end = viewport_start + self.body.section_height();
        let pos = scroller::scroll_pos_for(
            request.destination,
            target_start,
            target_end,
            viewport_start,
            viewport_end,
            request.padding,
        );
        self.vertical.set_scroll_pos(pos);
        self.synchronize_scroll();
    }

    // -----------------------------------------------------------------------
    // Host tick

    /// Drains the deferred-work set: size recalculation, the parked
    /// scroll-to-row request, then the debounced display-order sort.
    pub fn flush_deferred(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
        if self.deferred.take_recalculate() {
            let viewport = self.surface.viewport_size();
            self.width_of_engine = viewport.width.max(0.0);
            if self.height_mode == HeightMode::Css {
                self.height_of_engine = viewport.height.max(0.0);
                self.height_by_host = self.height_of_engine;
            }
            self.recalculate_element_sizes();
        }
        if let Some(request) = self.deferred.take_row_scroll() {
            self.run_row_scroll(request);
        }
        if self.deferred.take_sort(now_ms) {
            let mut p = self.parts();
            p.body.sort_display_order(&mut p.ctx);
        }
    }

    /// Takes every queued [`EngineEvent`], oldest first.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        let mut drained = Vec::new();
        while let Some(event) = self.events.pop() {
            drained.push(event);
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::SORT_DEBOUNCE_MS;
    use kurbo::Size;
    use trellis_surface::TestSurface;

    const ROW_HEIGHT: f64 = 20.0;

    // 400x240 viewport, no header/footer rows: with overflowing content the
    // vertical scrollbar shows, the body covers all 240px, and the pool
    // holds ceil(240 / 20) + 1 = 13 rows.
    fn engine_with(rows: usize, columns: usize) -> Engine<TestSurface> {
        let mut engine = Engine::new(TestSurface::new(Size::new(400.0, 240.0)));
        if columns > 0 {
            engine.insert_columns(0, columns).unwrap();
        }
        if rows > 0 {
            engine.insert_rows(SectionKind::Body, 0, rows).unwrap();
        }
        engine.attach();
        engine.drain_events();
        engine
    }

    #[test]
    fn attach_materializes_a_bounded_pool() {
        let engine = engine_with(1000, 3);
        assert_eq!(engine.row_count(SectionKind::Body), 1000);
        assert_eq!(engine.body().materialized_row_count(), 13);
        assert_eq!(engine.max_visible_row_count(), 13);
        assert_eq!(engine.scroll_height(), 20_000.0);
        assert_eq!(engine.visible_row_range(), Range::between(0, 13));
    }

    #[test]
    fn attach_subscribes_and_detach_unsubscribes() {
        let mut engine = engine_with(10, 1);
        assert_eq!(engine.surface().subscribed_kinds().len(), 3);
        engine.detach();
        assert!(engine.surface().subscribed_kinds().is_empty());
        assert_eq!(engine.body().materialized_row_count(), 0);
        // Logical state survives.
        assert_eq!(engine.row_count(SectionKind::Body), 10);
    }

    #[test]
    fn reattach_restores_the_pool() {
        let mut engine = engine_with(1000, 2);
        engine.detach();
        engine.attach();
        assert_eq!(engine.body().materialized_row_count(), 13);
        assert_eq!(engine.visible_row_range(), Range::between(0, 13));
    }

    #[test]
    fn detached_mutations_are_bookkeeping_only() {
        let mut engine = Engine::new(TestSurface::new(Size::new(400.0, 240.0)));
        engine.insert_columns(0, 2).unwrap();
        engine.insert_rows(SectionKind::Body, 0, 500).unwrap();
        engine.insert_rows(SectionKind::Header, 0, 1).unwrap();
        assert_eq!(engine.row_count(SectionKind::Body), 500);
        assert_eq!(engine.row_count(SectionKind::Header), 1);
        assert_eq!(engine.body().materialized_row_count(), 0);

        engine.attach();
        assert!(engine.body().materialized_row_count() > 0);
        assert_eq!(engine.header().materialized_row_count(), 1);
    }

    #[test]
    fn header_shrinks_the_body_viewport() {
        let mut engine = engine_with(1000, 2);
        engine.insert_rows(SectionKind::Header, 0, 2).unwrap();
        // 240 - 2 * 20 = 200 px of body -> pool of ceil(200 / 20) + 1.
        assert_eq!(engine.body().materialized_row_count(), 11);
        assert_eq!(engine.header().section_height(), 40.0);
    }

    #[test]
    fn scrollbar_scroll_slides_the_window() {
        let mut engine = engine_with(1000, 3);
        engine.handle_scrollbar_scroll(ScrollAxis::Vertical, 400.0, 0);
        assert_eq!(engine.scroll_top(), 400.0);
        assert_eq!(engine.visible_row_range().start(), 20);

        let events = engine.drain_events();
        assert!(events.contains(&EngineEvent::Scroll));
        assert!(events.contains(&EngineEvent::RowVisibilityChange { start: 20, count: 13 }));
    }

    #[test]
    fn scroll_schedules_a_debounced_sort() {
        let mut engine = engine_with(1000, 1);
        let before = engine.surface().mutation_count();
        engine.handle_scrollbar_scroll(ScrollAxis::Vertical, 400.0, 100);
        // Inside the debounce window nothing reorders yet.
        engine.flush_deferred(100 + SORT_DEBOUNCE_MS - 1);
        let mid = engine.surface().mutation_count();
        engine.flush_deferred(100 + SORT_DEBOUNCE_MS);
        assert!(engine.surface().mutation_count() > mid);
        assert!(mid > before);
    }

    #[test]
    fn wheel_line_deltas_scale_by_row_height() {
        let mut engine = engine_with(1000, 1);
        engine.handle_wheel(
            WheelDelta {
                delta_x: 0.0,
                delta_y: 3.0,
                unit: DeltaUnit::Line,
                within_body: true,
            },
            0,
        );
        assert_eq!(engine.scroll_top(), 3.0 * ROW_HEIGHT);

        engine.handle_wheel(
            WheelDelta {
                delta_x: 0.0,
                delta_y: 3.0,
                unit: DeltaUnit::Line,
                within_body: false,
            },
            0,
        );
        assert_eq!(engine.scroll_top(), 3.0 * ROW_HEIGHT);
    }

    #[test]
    fn touch_drag_moves_content_with_the_finger() {
        let mut engine = engine_with(1000, 1);
        engine.handle_touch_move(TouchMove { dx: 0.0, dy: -50.0 }, 0);
        assert_eq!(engine.scroll_top(), 50.0);
    }

    #[test]
    fn locked_axis_ignores_input_but_honors_programmatic_scrolls() {
        let mut engine = engine_with(1000, 1);
        engine.set_scroll_locked(ScrollAxis::Vertical, true);

        engine.handle_scrollbar_scroll(ScrollAxis::Vertical, 100.0, 0);
        engine.handle_wheel(
            WheelDelta {
                delta_x: 0.0,
                delta_y: 100.0,
                unit: DeltaUnit::Pixel,
                within_body: true,
            },
            0,
        );
        assert_eq!(engine.scroll_top(), 0.0);

        engine.set_scroll_top(100.0);
        assert_eq!(engine.scroll_top(), 100.0);
        assert!(engine.is_scroll_locked(ScrollAxis::Vertical));
    }

    #[test]
    fn scroll_to_row_runs_at_flush_time() {
        let mut engine = engine_with(1000, 2);
        engine
            .scroll_to_row(500, ScrollDestination::Start, 0.0)
            .unwrap();
        assert_eq!(engine.scroll_top(), 0.0);

        engine.flush_deferred(0);
        assert_eq!(engine.scroll_top(), 500.0 * ROW_HEIGHT);
        assert_eq!(engine.visible_row_range().start(), 500);
    }

    #[test]
    fn only_the_last_scroll_to_row_request_survives() {
        let mut engine = engine_with(1000, 1);
        engine.scroll_to_row(100, ScrollDestination::Start, 0.0).unwrap();
        engine.scroll_to_row(700, ScrollDestination::Start, 0.0).unwrap();
        engine.flush_deferred(0);
        assert_eq!(engine.scroll_top(), 700.0 * ROW_HEIGHT);
    }

    #[test]
    fn stale_scroll_to_row_degrades_to_a_noop() {
        let mut engine = engine_with(1000, 1);
        engine.scroll_to_row(900, ScrollDestination::Start, 0.0).unwrap();
        engine.remove_rows(SectionKind::Body, 500, 500).unwrap();
        engine.flush_deferred(0);
        assert_eq!(engine.scroll_top(), 0.0);
    }

    #[test]
    fn scroll_to_row_validates_the_index() {
        let mut engine = engine_with(10, 1);
        assert!(matches!(
            engine.scroll_to_row(10, ScrollDestination::Any, 0.0),
            Err(EngineError::OutOfRange(_))
        ));
        assert!(matches!(
            engine.scroll_to_row(5, ScrollDestination::Middle, 10.0),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn scroll_to_row_any_is_a_noop_when_visible() {
        let mut engine = engine_with(1000, 1);
        engine.set_scroll_top(100.0);
        engine.scroll_to_row(7, ScrollDestination::Any, 0.0).unwrap();
        engine.flush_deferred(0);
        assert_eq!(engine.scroll_top(), 100.0);
    }

    #[test]
    fn scroll_to_spacer_is_immediate() {
        let mut engine = engine_with(1000, 1);
        engine.set_spacer(100, 75.0).unwrap();
        engine
            .scroll_to_spacer(100, ScrollDestination::Start, 0.0)
            .unwrap();
        // The spacer opens below row 100: 101 * 20 = 2020.
        assert_eq!(engine.scroll_top(), 2020.0);

        assert!(matches!(
            engine.scroll_to_spacer(5, ScrollDestination::Start, 0.0),
            Err(EngineError::IllegalState(_))
        ));
    }

    #[test]
    fn scroll_to_row_and_spacer_covers_the_combined_span() {
        let mut engine = engine_with(1000, 1);
        engine.set_spacer(100, 75.0).unwrap();
        engine
            .scroll_to_row_and_spacer(100, ScrollDestination::End, 0.0)
            .unwrap();
        engine.flush_deferred(0);
        // Combined span [2000, 2095); End puts its bottom at the viewport
        // bottom: 2095 - 240 = 1855.
        assert_eq!(engine.scroll_top(), 1855.0);
    }

    #[test]
    fn scroll_to_row_and_spacer_rejects_minus_one_without_a_spacer() {
        let mut engine = engine_with(10, 1);
        assert!(matches!(
            engine.scroll_to_row_and_spacer(-1, ScrollDestination::Any, 0.0),
            Err(EngineError::InvalidArgument(_))
        ));
        engine.set_spacer(-1, 30.0).unwrap();
        engine
            .scroll_to_row_and_spacer(-1, ScrollDestination::Any, 0.0)
            .unwrap();
    }

    #[test]
    fn scroll_to_column_excludes_frozen_pixels() {
        let mut engine = engine_with(100, 8);
        engine.set_frozen_column_count(2).unwrap();
        // Unfrozen content: 6 columns of 100px; inner width 384, viewport
        // for unfrozen content 384 - 200 = 184.
        engine
            .scroll_to_column(7, ScrollDestination::Start, 0.0)
            .unwrap();
        // Column 7 starts at 700 - 200 = 500 unfrozen px; max scroll is
        // 600 - 184 = 416, so the position clamps there.
        assert_eq!(engine.scroll_left(), 416.0);

        assert!(matches!(
            engine.scroll_to_column(1, ScrollDestination::Start, 0.0),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.scroll_to_column(99, ScrollDestination::Start, 0.0),
            Err(EngineError::OutOfRange(_))
        ));
    }

    #[test]
    fn frozen_cells_stay_pinned_while_scrolling_horizontally() {
        let mut engine = engine_with(50, 8);
        engine.set_frozen_column_count(1).unwrap();
        engine.set_scroll_left(100.0);

        let row = engine.body().visible_row_range().start();
        assert_eq!(row, 0);
        // The body root translates by -100; the frozen cell is pinned at
        // +100 inside it, leaving it stationary on screen.
        let body_root = engine.surface().children(engine.surface().root())[1];
        assert_eq!(engine.surface().node(body_root).offset.x, -100.0);
        let first_row = engine.surface().children(body_root)[0];
        let frozen_cell = engine.surface().children(first_row)[0];
        assert_eq!(engine.surface().node(frozen_cell).offset.x, 100.0);
    }

    #[test]
    fn insert_columns_past_scroll_point_compensates() {
        let mut engine = engine_with(50, 8);
        engine.set_scroll_left(300.0);
        engine.insert_columns(0, 1).unwrap();
        assert_eq!(engine.scroll_left(), 400.0);
        assert_eq!(engine.column_count(), 9);
    }

    #[test]
    fn remove_columns_past_scroll_point_compensates() {
        let mut engine = engine_with(50, 8);
        engine.set_scroll_left(300.0);
        engine.remove_columns(0, 2).unwrap();
        assert_eq!(engine.scroll_left(), 100.0);
        assert_eq!(engine.column_count(), 6);
    }

    #[test]
    fn set_column_width_applies_to_cells() {
        let mut engine = engine_with(10, 3);
        engine.set_column_width(1, 150.0).unwrap();
        assert_eq!(engine.column_width(1), 150.0);
        assert_eq!(engine.scroll_width(), 350.0);

        let body_root = engine.surface().children(engine.surface().root())[1];
        let first_row = engine.surface().children(body_root)[0];
        let cell = engine.surface().children(first_row)[1];
        assert_eq!(engine.surface().node(cell).extent.width, 150.0);
    }

    #[test]
    fn auto_width_measures_across_sections() {
        let mut engine = engine_with(10, 2);
        engine.insert_rows(SectionKind::Header, 0, 1).unwrap();
        let header_cell = {
            let header_root = engine.surface().children(engine.surface().root())[0];
            let row = engine.surface().children(header_root)[0];
            engine.surface().children(row)[0]
        };
        engine
            .surface_mut()
            .set_intrinsic(header_cell, Size::new(250.0, 20.0));

        engine.set_column_width(0, -1.0).unwrap();
        assert_eq!(
            engine.column_width(0),
            250.0 + crate::columns::WIDTH_MEASUREMENT_EPSILON
        );
    }

    #[test]
    fn height_by_rows_sizes_the_body() {
        let mut engine = engine_with(1000, 2);
        engine.set_height_mode(HeightMode::Row);
        engine.set_height_by_rows(5.0).unwrap();
        // 5 rows of 20px, no header/footer, no horizontal overflow.
        assert_eq!(engine.body().section_height(), 100.0);
        assert_eq!(engine.body().materialized_row_count(), 6);

        engine.set_height_mode(HeightMode::Css);
        assert_eq!(engine.body().section_height(), 240.0);
    }

    #[test]
    fn height_by_rows_rejects_bad_values() {
        let mut engine = engine_with(10, 1);
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                engine.set_height_by_rows(bad),
                Err(EngineError::InvalidArgument(_))
            ));
        }
        assert_eq!(engine.height_by_rows(), DEFAULT_HEIGHT_BY_ROWS);
    }

    #[test]
    fn resize_recalculates_at_flush_time() {
        let mut engine = engine_with(1000, 2);
        engine.surface_mut().set_viewport_size(Size::new(400.0, 440.0));
        engine.handle_resize();
        assert_eq!(engine.body().materialized_row_count(), 13);

        engine.flush_deferred(0);
        assert_eq!(engine.body().materialized_row_count(), 23);
        assert!(engine
            .drain_events()
            .contains(&EngineEvent::RowVisibilityChange { start: 0, count: 23 }));
    }

    #[test]
    fn shrinking_the_viewport_shrinks_the_pool() {
        let mut engine = engine_with(1000, 2);
        engine.set_height(100.0);
        assert_eq!(engine.body().materialized_row_count(), 6);
    }

    #[test]
    fn spacer_heights_flow_into_the_scroll_size() {
        let mut engine = engine_with(1000, 1);
        engine.set_spacer(10, 50.0).unwrap();
        assert_eq!(engine.scroll_height(), 20_050.0);
        assert_eq!(engine.spacer_height(10), 50.0);

        engine.set_spacer(10, -1.0).unwrap();
        assert_eq!(engine.scroll_height(), 20_000.0);
        assert_eq!(engine.spacer_height(10), 0.0);
    }

    #[test]
    fn spacer_sums_fold_into_row_positions() {
        let mut engine = engine_with(100, 1);
        engine.set_spacer(10, 50.0).unwrap();
        assert_eq!(engine.body().spacers().heights_sum_until_index(20), 50.0);
        assert_eq!(engine.scroll_height(), 100.0 * ROW_HEIGHT + 50.0);
    }

    #[test]
    fn freezing_while_scrolled_pins_at_the_current_position() {
        let mut engine = engine_with(50, 5);
        engine.set_scroll_left(100.0);
        engine.set_frozen_column_count(2).unwrap();

        let body_root = engine.surface().children(engine.surface().root())[1];
        let first_row = engine.surface().children(body_root)[0];
        let cells = engine.surface().children(first_row).to_vec();
        assert_eq!(engine.surface().node(cells[0]).offset.x, 100.0);
        assert_eq!(engine.surface().node(cells[1]).offset.x, 100.0);
        assert_eq!(engine.surface().node(cells[2]).offset.x, 0.0);
    }

    #[test]
    fn spacers_require_an_attached_engine() {
        let mut engine = Engine::new(TestSurface::new(Size::new(400.0, 240.0)));
        engine.insert_columns(0, 1).unwrap();
        engine.insert_rows(SectionKind::Body, 0, 10).unwrap();
        assert!(matches!(
            engine.set_spacer(3, 40.0),
            Err(EngineError::IllegalState(_))
        ));
    }

    #[test]
    fn repeated_recalculation_settles() {
        let mut engine = engine_with(1000, 3);
        engine.recalculate_element_sizes();
        let settled = engine.surface().mutation_count();
        engine.recalculate_element_sizes();
        engine.recalculate_element_sizes();
        assert_eq!(engine.surface().mutation_count(), settled);
    }

    #[test]
    fn empty_engine_reports_an_empty_visible_range() {
        let engine = engine_with(0, 3);
        assert!(engine.visible_row_range().is_empty());
        assert_eq!(engine.scroll_height(), 0.0);
    }
}
