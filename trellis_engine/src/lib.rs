// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Engine: a virtualized, scrollable table-rendering engine.
//!
//! Given an arbitrarily large logical row/column matrix, the engine renders
//! only a bounded window of actual display rows, repositions and rebinds them
//! as the user scrolls, and keeps that window consistent with insertions,
//! removals, resizes, frozen columns, and variable-height spacer rows
//! interleaved between data rows.
//!
//! Three coordinate systems are maintained in lockstep:
//!
//! - **logical** index: a row's position in the underlying data source;
//! - **physical** index: a rendered row's position among its parent node's
//!   children;
//! - **visual** index: a rendered row's rank in the on-screen top-to-bottom
//!   order, independent of physical order.
//!
//! The core pieces:
//!
//! - [`Engine`]: the facade. Owns the header/body/footer sections, the column
//!   configuration, both scrollbars, and overall sizing; exposes the public
//!   operations and drains [`EngineEvent`]s to the host.
//! - [`ScrollingSection`](scrolling_section::ScrollingSection): the body. A
//!   bounded pool of reused rows whose visual order and logical binding are
//!   continuously remapped; `len(pool) == min(capacity, row_count)` always.
//! - [`SpacerSet`](spacers::SpacerSet): out-of-band rows anchored below a
//!   logical row index, each with independent height, folded into every
//!   position and scroll-size calculation.
//! - [`ColumnConfig`](columns::ColumnConfig): ordered columns with
//!   defined/measured widths and the frozen-column boundary.
//! - [`scroller`]: scroll-size recalculation and scroll-to-target math.
//!
//! The engine drives a [`trellis_surface::Surface`] and never depends on a
//! concrete rendering technology. It is single-threaded and event-driven;
//! deferred work (debounced display-order sorting, reentrancy-safe
//! scroll-to-row) is drained by the host via [`Engine::flush_deferred`].
//!
//! ## Minimal example
//!
//! ```rust
//! use trellis_engine::{Engine, ScrollDestination, SectionKind};
//! use trellis_surface::TestSurface;
//! use kurbo::Size;
//!
//! let surface = TestSurface::new(Size::new(400.0, 220.0));
//! let mut engine = Engine::new(surface);
//! engine.insert_columns(0, 3).unwrap();
//! engine.insert_rows(SectionKind::Body, 0, 1000).unwrap();
//! engine.attach();
//!
//! engine.scroll_to_row(500, ScrollDestination::Start, 0.0).unwrap();
//! engine.flush_deferred(0);
//! assert_eq!(engine.visible_row_range().start(), 500);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod columns;
mod deferred;
mod engine;
mod error;
mod events;
mod scrollbar;
pub mod scroller;
pub mod scrolling_section;
mod section;
pub mod spacers;
mod static_section;
mod tracker;
mod updater;

pub use columns::{ColumnConfig, WIDTH_MEASUREMENT_EPSILON};
pub use engine::{Engine, HeightMode, ScrollAxis, SectionKind};
pub use error::{EngineError, Result};
pub use events::EngineEvent;
pub use scrollbar::Scrollbar;
pub use scroller::ScrollDestination;
pub use scrolling_section::ScrollingSection;
pub use section::RowSection;
pub use spacers::{SpacerInclusion, SpacerSet};
pub use static_section::StaticSection;
pub use tracker::PositionTracker;
pub use updater::{NullUpdater, RowRef, RowUpdater, SpacerRef, SpacerUpdater};
