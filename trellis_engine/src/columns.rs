// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column bookkeeping: ordered columns, widths, and the frozen boundary.
//!
//! [`ColumnConfig`] owns the ordered column list, each column's defined and
//! calculated pixel widths, and the frozen-column count. It is pure
//! bookkeeping: propagating cell mutations to the row sections, repinning
//! frozen cells, and scrollbar compensation are coordinated by the engine
//! facade, which reads the change descriptions these methods return.

use alloc::format;
use alloc::vec::Vec;
use smallvec::SmallVec;
use trellis_range::Range;

use crate::error::{EngineError, Result};

/// Sub-pixel compensation added to measured cell widths.
///
/// One legacy rendering engine rounds measured widths down below the true
/// sub-pixel value; this nudge keeps content from wrapping there. Harmless on
/// surfaces that measure exactly.
pub const WIDTH_MEASUREMENT_EPSILON: f64 = 0.01;

/// Width given to a column before it has ever been measured or set.
pub(crate) const DEFAULT_COLUMN_WIDTH_PX: f64 = 100.0;

#[derive(Debug, Clone)]
struct Column {
    /// Explicitly set width; negative means "size to content".
    defined_width: f64,
    calculated_width: f64,
    measuring_requested: bool,
}

impl Default for Column {
    fn default() -> Self {
        Self {
            defined_width: -1.0,
            calculated_width: DEFAULT_COLUMN_WIDTH_PX,
            measuring_requested: false,
        }
    }
}

/// How a frozen-count change affects the rendered cells.
///
/// Cells in `first_affected..first_unaffected` flip their frozen state; the
/// old and new last-frozen columns swap their boundary marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrozenChange {
    pub(crate) old_count: usize,
    pub(crate) new_count: usize,
}

impl FrozenChange {
    /// Whether columns are being frozen (as opposed to unfrozen).
    pub(crate) fn freezing(&self) -> bool {
        self.new_count > self.old_count
    }

    /// The half-open column range whose frozen state flips.
    pub(crate) fn affected(&self) -> Range {
        if self.freezing() {
            Range::between(self.old_count, self.new_count)
        } else {
            Range::between(self.new_count, self.old_count)
        }
    }
}

/// The ordered list of columns with widths and the frozen boundary.
#[derive(Debug, Default)]
pub struct ColumnConfig {
    columns: Vec<Column>,
    frozen: usize,
}

impl ColumnConfig {
    /// The number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// The number of frozen columns.
    #[must_use]
    pub fn frozen_column_count(&self) -> usize {
        self.frozen
    }

    /// The combined pixel width of the frozen columns.
    #[must_use]
    pub fn frozen_pixels(&self) -> f64 {
        self.widths_sum(Range::between(0, self.frozen))
    }

    /// The width of a full row, as the sum of all column widths.
    #[must_use]
    pub fn row_width(&self) -> f64 {
        self.widths_sum(Range::between(0, self.column_count()))
    }

    /// The sum of calculated widths over a column range.
    ///
    /// The range must lie within the current columns; this is an internal
    /// invariant, not an input validation.
    #[must_use]
    pub fn widths_sum(&self, columns: Range) -> f64 {
        debug_assert!(
            columns.end() <= self.column_count(),
            "column range {columns:?} outside of current columns"
        );
        self.columns
            .get(columns.start()..columns.end().min(self.column_count()))
            .map_or(0.0, |cols| cols.iter().map(|c| c.calculated_width).sum())
    }

    /// The defined width of a column; negative means "size to content".
    pub fn defined_width(&self, index: usize) -> Result<f64> {
        self.check_column_index(index)?;
        Ok(self.columns[index].defined_width)
    }

    /// The width a column actually occupies. Returns -1 for a column whose
    /// measurement is still pending.
    #[must_use]
    pub fn calculated_width(&self, index: usize) -> f64 {
        self.columns.get(index).map_or(0.0, |c| {
            if c.measuring_requested {
                -1.0
            } else {
                c.calculated_width
            }
        })
    }

    /// Inserts `count` columns before `index`. Returns whether the inserted
    /// columns land inside the frozen span (the caller freezes their cells).
    pub(crate) fn insert(&mut self, index: usize, count: usize) -> Result<bool> {
        if index > self.column_count() {
            return Err(EngineError::OutOfRange(format!(
                "the given index ({index}) was outside of the current number of columns (0..{})",
                self.column_count()
            )));
        }
        if count < 1 {
            return Err(EngineError::InvalidArgument(format!(
                "number of columns must be 1 or greater (was {count})"
            )));
        }

        for _ in 0..count {
            self.columns.insert(index, Column::default());
        }

        let frozen = index < self.frozen;
        if frozen {
            self.frozen += count;
        }
        Ok(frozen)
    }

    /// Removes the columns in `[index, index + count)`, adjusting the frozen
    /// boundary.
    pub(crate) fn remove(&mut self, index: usize, count: usize) -> Result<()> {
        self.check_column_range(index, count)?;

        self.columns.drain(index..index + count);

        if index < self.frozen {
            if index + count < self.frozen {
                // All removed columns were frozen.
                self.frozen -= count;
            } else {
                // The removal reached past the frozen span; what remains
                // frozen is everything left of the removal point.
                self.frozen = index;
            }
        }
        Ok(())
    }

    /// Moves the frozen boundary. Returns the change to apply to rendered
    /// cells, or `None` when the count did not change.
    pub(crate) fn set_frozen_count(&mut self, count: usize) -> Result<Option<FrozenChange>> {
        if count > self.column_count() {
            return Err(EngineError::InvalidArgument(format!(
                "count must be between 0 and the current number of columns ({})",
                self.column_count()
            )));
        }
        let old_count = self.frozen;
        if count == old_count {
            return Ok(None);
        }
        self.frozen = count;
        Ok(Some(FrozenChange {
            old_count,
            new_count: count,
        }))
    }

    /// Records defined widths for a set of columns. A negative width puts
    /// the column into "size to content" mode and latches a measurement
    /// request; the caller resolves pending measurements (now if attached,
    /// at attach time otherwise) through [`Self::apply_measured_width`].
    ///
    /// All indices are validated before anything is applied.
    pub(crate) fn set_widths(&mut self, widths: &[(usize, f64)]) -> Result<()> {
        for (index, _) in widths {
            self.check_column_index(*index)?;
        }
        for (index, width) in widths {
            let column = &mut self.columns[*index];
            column.defined_width = *width;
            if *width < 0.0 {
                column.measuring_requested = true;
            } else {
                column.measuring_requested = false;
                column.calculated_width = *width;
            }
        }
        Ok(())
    }

    /// Stores the measured width of an auto-sized column.
    pub(crate) fn apply_measured_width(&mut self, index: usize, width: f64) {
        debug_assert!(
            width >= 0.0,
            "got a negative measured width for a column, which should be impossible"
        );
        if let Some(column) = self.columns.get_mut(index) {
            column.measuring_requested = false;
            column.calculated_width = width.max(0.0);
        }
    }

    /// Columns whose measurement was requested while detached.
    pub(crate) fn pending_measurements(&self) -> SmallVec<[usize; 4]> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.measuring_requested)
            .map(|(i, _)| i)
            .collect()
    }

    pub(crate) fn check_column_index(&self, index: usize) -> Result<()> {
        if index >= self.column_count() {
            return Err(EngineError::OutOfRange(format!(
                "the given column index ({index}) does not exist"
            )));
        }
        Ok(())
    }

    pub(crate) fn check_column_range(&self, index: usize, count: usize) -> Result<()> {
        if count < 1 {
            return Err(EngineError::InvalidArgument(format!(
                "number of columns can't be less than 1 (was {count})"
            )));
        }
        if index + count > self.column_count() {
            return Err(EngineError::OutOfRange(format!(
                "the given column range ({index}..{}) was outside of the current number of columns ({})",
                index + count,
                self.column_count()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(count: usize) -> ColumnConfig {
        let mut c = ColumnConfig::default();
        c.insert(0, count).unwrap();
        c
    }

    #[test]
    fn insert_validates_and_defaults() {
        let mut c = ColumnConfig::default();
        assert!(matches!(
            c.insert(1, 1),
            Err(EngineError::OutOfRange(_))
        ));
        assert!(matches!(
            c.insert(0, 0),
            Err(EngineError::InvalidArgument(_))
        ));

        c.insert(0, 3).unwrap();
        assert_eq!(c.column_count(), 3);
        assert_eq!(c.calculated_width(0), DEFAULT_COLUMN_WIDTH_PX);
        assert_eq!(c.row_width(), 300.0);
    }

    #[test]
    fn insert_before_frozen_boundary_extends_it() {
        let mut c = config(5);
        c.set_frozen_count(2).unwrap();

        let frozen = c.insert(1, 2).unwrap();
        assert!(frozen);
        assert_eq!(c.frozen_column_count(), 4);

        let frozen = c.insert(6, 1).unwrap();
        assert!(!frozen);
        assert_eq!(c.frozen_column_count(), 4);
    }

    #[test]
    fn remove_fully_frozen_decrements_boundary() {
        let mut c = config(6);
        c.set_frozen_count(4).unwrap();
        c.remove(1, 2).unwrap();
        assert_eq!(c.frozen_column_count(), 2);
        assert_eq!(c.column_count(), 4);
    }

    #[test]
    fn remove_reaching_past_frozen_span_truncates_boundary() {
        let mut c = config(6);
        c.set_frozen_count(3).unwrap();
        // Removes columns 2..5; column 2 was frozen, 3 and 4 were not.
        c.remove(2, 3).unwrap();
        assert_eq!(c.frozen_column_count(), 2);
    }

    #[test]
    fn remove_right_of_frozen_span_keeps_boundary() {
        let mut c = config(6);
        c.set_frozen_count(2).unwrap();
        c.remove(4, 2).unwrap();
        assert_eq!(c.frozen_column_count(), 2);
    }

    #[test]
    fn frozen_change_describes_affected_range() {
        let mut c = config(5);
        let change = c.set_frozen_count(3).unwrap().unwrap();
        assert!(change.freezing());
        assert_eq!(change.affected(), Range::between(0, 3));

        let change = c.set_frozen_count(1).unwrap().unwrap();
        assert!(!change.freezing());
        assert_eq!(change.affected(), Range::between(1, 3));

        assert_eq!(c.set_frozen_count(1).unwrap(), None);
        assert!(matches!(
            c.set_frozen_count(9),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn explicit_widths_apply_immediately() {
        let mut c = config(3);
        c.set_widths(&[(0, 50.0), (2, 150.0)]).unwrap();
        assert_eq!(c.calculated_width(0), 50.0);
        assert_eq!(c.calculated_width(1), DEFAULT_COLUMN_WIDTH_PX);
        assert_eq!(c.calculated_width(2), 150.0);
        assert_eq!(c.row_width(), 300.0);
        assert_eq!(c.defined_width(0).unwrap(), 50.0);
    }

    #[test]
    fn width_validation_is_all_or_nothing() {
        let mut c = config(2);
        let err = c.set_widths(&[(0, 50.0), (7, 60.0)]);
        assert!(matches!(err, Err(EngineError::OutOfRange(_))));
        // The valid entry was not applied either.
        assert_eq!(c.calculated_width(0), DEFAULT_COLUMN_WIDTH_PX);
    }

    #[test]
    fn auto_width_latches_measurement_while_detached() {
        let mut c = config(2);
        c.set_widths(&[(1, -1.0)]).unwrap();
        assert_eq!(c.calculated_width(1), -1.0);
        assert_eq!(c.pending_measurements().as_slice(), &[1]);

        c.apply_measured_width(1, 72.5);
        assert_eq!(c.calculated_width(1), 72.5);
        assert!(c.pending_measurements().is_empty());
    }

    #[test]
    fn frozen_pixels_sums_the_frozen_span() {
        let mut c = config(4);
        c.set_widths(&[(0, 40.0), (1, 60.0)]).unwrap();
        c.set_frozen_count(2).unwrap();
        assert_eq!(c.frozen_pixels(), 100.0);
    }
}
