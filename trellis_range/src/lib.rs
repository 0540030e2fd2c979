// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Range: a half-open integer interval for table index math.
//!
//! [`Range`] describes an immutable, half-open interval `[start, end)` over
//! `usize` indices. It carries the handful of set operations the table engine
//! leans on everywhere: intersection, three-way partitioning against another
//! range, signed offsetting, and combining adjacent ranges.
//!
//! ## Minimal example
//!
//! ```rust
//! use trellis_range::Range;
//!
//! let viewport = Range::between(10, 20);
//! let touched = Range::with_length(5, 10); // rows 5..15
//!
//! let (below, inside, above) = touched.partition_with(viewport);
//! assert_eq!(below, Range::between(5, 10));
//! assert_eq!(inside, Range::between(10, 15));
//! assert!(above.is_empty());
//! ```
//!
//! This crate is `no_std` and has no dependencies.

#![no_std]

/// An immutable, half-open index interval `[start, end)`.
///
/// An empty range has `start == end`; all empty ranges compare equal only if
/// their bounds match, so callers that care about position of an empty range
/// (for example, an insertion point) keep that information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    start: usize,
    end: usize,
}

impl Range {
    /// An empty range at index 0.
    pub const EMPTY: Self = Self { start: 0, end: 0 };

    /// Creates a range `[start, end)`.
    ///
    /// # Panics
    ///
    /// Panics if `start > end`.
    #[must_use]
    pub const fn between(start: usize, end: usize) -> Self {
        assert!(start <= end, "range start must not exceed its end");
        Self { start, end }
    }

    /// Creates a range `[start, start + length)`.
    #[must_use]
    pub const fn with_length(start: usize, length: usize) -> Self {
        Self {
            start,
            end: start + length,
        }
    }

    /// Creates a range covering only `index`.
    #[must_use]
    pub const fn with_only(index: usize) -> Self {
        Self {
            start: index,
            end: index + 1,
        }
    }

    /// The inclusive start of the range.
    #[must_use]
    pub const fn start(self) -> usize {
        self.start
    }

    /// The exclusive end of the range.
    #[must_use]
    pub const fn end(self) -> usize {
        self.end
    }

    /// The number of indices in the range.
    #[must_use]
    pub const fn length(self) -> usize {
        self.end - self.start
    }

    /// Whether the range contains no indices.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Whether `index` lies within the range.
    #[must_use]
    pub const fn contains(self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    /// Whether the two ranges share at least one index.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `other` starts where this range ends (or vice versa) or the
    /// two overlap, so that [`Self::combine_with`] is well-defined.
    #[must_use]
    pub const fn is_connected(self, other: Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// The overlap of the two ranges; empty (positioned at the clamped start)
    /// when they do not intersect.
    #[must_use]
    pub fn restrict_to(self, other: Self) -> Self {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start <= end {
            Self { start, end }
        } else {
            Self { start, end: start }
        }
    }

    /// Merges two connected ranges into their union.
    ///
    /// # Panics
    ///
    /// Panics if the ranges are disjoint and non-adjacent.
    #[must_use]
    pub fn combine_with(self, other: Self) -> Self {
        assert!(
            self.is_connected(other),
            "cannot combine disjoint ranges {self:?} and {other:?}"
        );
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Splits this range against `other` into the parts strictly below,
    /// inside, and strictly above `other`, in that order.
    ///
    /// The three results are disjoint, cover this range exactly, and appear
    /// in ascending index order. Empty parts keep a meaningful position
    /// (clamped to `other`'s bounds).
    #[must_use]
    pub fn partition_with(self, other: Self) -> (Self, Self, Self) {
        let below = Self {
            start: self.start.min(other.start),
            end: self.end.min(other.start),
        };
        let inside = self.restrict_to(other);
        let above = Self {
            start: self.start.max(other.end),
            end: self.end.max(other.end),
        };
        (below, inside, above)
    }

    /// Shifts both bounds by a signed delta.
    ///
    /// Debug builds assert the result stays non-negative; release builds
    /// saturate at zero, preserving the length where possible.
    #[must_use]
    pub fn offset_by(self, delta: i64) -> Self {
        let start = offset_index(self.start, delta);
        let end = offset_index(self.end, delta);
        Self { start, end }
    }

    /// Splits the range in two at `index` (which is clamped to the bounds),
    /// returning the lower and upper parts.
    #[must_use]
    pub fn split_at(self, index: usize) -> (Self, Self) {
        let index = index.clamp(self.start, self.end);
        (
            Self {
                start: self.start,
                end: index,
            },
            Self {
                start: index,
                end: self.end,
            },
        )
    }

    /// Splits the range `length` indices after its start.
    #[must_use]
    pub fn split_at_from_start(self, length: usize) -> (Self, Self) {
        self.split_at(self.start.saturating_add(length))
    }
}

#[expect(
    clippy::cast_sign_loss,
    reason = "delta is applied on top of a non-negative base with a checked lower bound"
)]
fn offset_index(index: usize, delta: i64) -> usize {
    if delta >= 0 {
        index.saturating_add(delta as usize)
    } else {
        let magnitude = delta.unsigned_abs() as usize;
        debug_assert!(
            magnitude <= index,
            "offsetting index {index} by {delta} would go below zero"
        );
        index.saturating_sub(magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_and_accessors() {
        let r = Range::between(3, 7);
        assert_eq!(r.start(), 3);
        assert_eq!(r.end(), 7);
        assert_eq!(r.length(), 4);
        assert!(!r.is_empty());
        assert_eq!(Range::with_length(3, 4), r);
        assert_eq!(Range::with_only(3), Range::between(3, 4));
        assert!(Range::between(5, 5).is_empty());
    }

    #[test]
    #[should_panic(expected = "range start must not exceed its end")]
    fn inverted_bounds_panic() {
        let _ = Range::between(7, 3);
    }

    #[test]
    fn contains_and_intersects() {
        let r = Range::between(3, 7);
        assert!(r.contains(3));
        assert!(r.contains(6));
        assert!(!r.contains(7));
        assert!(r.intersects(Range::between(6, 9)));
        assert!(!r.intersects(Range::between(7, 9)));
        assert!(!r.intersects(Range::between(0, 3)));
        assert!(!Range::between(5, 5).intersects(r));
    }

    #[test]
    fn restrict_to_overlap() {
        let r = Range::between(3, 10);
        assert_eq!(r.restrict_to(Range::between(5, 8)), Range::between(5, 8));
        assert_eq!(r.restrict_to(Range::between(0, 5)), Range::between(3, 5));
        assert!(r.restrict_to(Range::between(20, 30)).is_empty());
    }

    #[test]
    fn partition_covers_and_orders() {
        let touched = Range::between(5, 25);
        let viewport = Range::between(10, 20);
        let (below, inside, above) = touched.partition_with(viewport);
        assert_eq!(below, Range::between(5, 10));
        assert_eq!(inside, Range::between(10, 20));
        assert_eq!(above, Range::between(20, 25));
        assert_eq!(
            below.length() + inside.length() + above.length(),
            touched.length()
        );
    }

    #[test]
    fn partition_fully_outside() {
        let viewport = Range::between(10, 20);

        let (below, inside, above) = Range::between(0, 5).partition_with(viewport);
        assert_eq!(below, Range::between(0, 5));
        assert!(inside.is_empty());
        assert!(above.is_empty());

        let (below, inside, above) = Range::between(30, 40).partition_with(viewport);
        assert!(below.is_empty());
        assert!(inside.is_empty());
        assert_eq!(above, Range::between(30, 40));
    }

    #[test]
    fn offset_shifts_both_bounds() {
        let r = Range::between(5, 8);
        assert_eq!(r.offset_by(3), Range::between(8, 11));
        assert_eq!(r.offset_by(-5), Range::between(0, 3));
        assert_eq!(r.offset_by(0), r);
    }

    #[test]
    fn combine_connected() {
        let a = Range::between(3, 7);
        assert_eq!(a.combine_with(Range::between(7, 9)), Range::between(3, 9));
        assert_eq!(a.combine_with(Range::between(5, 6)), a);
    }

    #[test]
    #[should_panic(expected = "cannot combine disjoint ranges")]
    fn combine_disjoint_panics() {
        let _ = Range::between(0, 2).combine_with(Range::between(5, 7));
    }

    #[test]
    fn split_points() {
        let r = Range::between(3, 9);
        assert_eq!(r.split_at(5), (Range::between(3, 5), Range::between(5, 9)));
        assert_eq!(
            r.split_at_from_start(2),
            (Range::between(3, 5), Range::between(5, 9))
        );
        // Clamped to the bounds.
        assert_eq!(r.split_at(100), (r, Range::between(9, 9)));
        assert_eq!(r.split_at(0), (Range::between(3, 3), r));
    }
}
