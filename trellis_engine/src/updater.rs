// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pluggable content-updater contracts.
//!
//! The engine owns row and cell nodes but never their content; a host
//! installs a [`RowUpdater`] per section and a [`SpacerUpdater`] on the body
//! to fill them in. The invocation order around every content-affecting
//! change is a strict contract updaters may rely on:
//!
//! - row attach: `pre_attach` → (nodes enter the tree) → `post_attach` → `update`
//! - row detach: `pre_detach` → (nodes leave the tree) → `post_detach`
//! - rebind/refresh: `update`
//!
//! Spacers follow `init` (created) → `update` (resized or rebound) →
//! `destroy` (removed).

use trellis_surface::NodeId;

/// A row handed to an updater: its logical binding plus its display nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRef<'a> {
    /// The logical row index this row is currently bound to.
    pub logical_index: usize,
    /// The row's node.
    pub row: NodeId,
    /// The row's cell nodes, in column order.
    pub cells: &'a [NodeId],
}

/// A spacer handed to a [`SpacerUpdater`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpacerRef {
    /// The anchor row index (`-1` anchors above the first row).
    pub row: i64,
    /// The spacer's content node.
    pub node: NodeId,
    /// The spacer's current height in pixels.
    pub height: f64,
}

/// Host hook invoked around every content-affecting row change.
pub trait RowUpdater {
    /// About to attach `row`'s nodes to the live tree.
    fn pre_attach(&mut self, row: RowRef<'_>) {
        let _ = row;
    }
    /// `row`'s nodes are attached; content may now be laid out.
    fn post_attach(&mut self, row: RowRef<'_>) {
        let _ = row;
    }
    /// Bind or re-bind content for `row`'s current logical index.
    fn update(&mut self, row: RowRef<'_>) {
        let _ = row;
    }
    /// About to detach `row`'s nodes from the live tree.
    fn pre_detach(&mut self, row: RowRef<'_>) {
        let _ = row;
    }
    /// `row`'s nodes are detached; external state may be released.
    fn post_detach(&mut self, row: RowRef<'_>) {
        let _ = row;
    }
}

/// Host hook invoked over a spacer's lifecycle.
pub trait SpacerUpdater {
    /// A spacer was created.
    fn init(&mut self, spacer: SpacerRef) {
        let _ = spacer;
    }
    /// A spacer was resized or re-anchored.
    fn update(&mut self, spacer: SpacerRef) {
        let _ = spacer;
    }
    /// A spacer is being removed.
    fn destroy(&mut self, spacer: SpacerRef) {
        let _ = spacer;
    }
}

/// The do-nothing updater installed by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullUpdater;

impl RowUpdater for NullUpdater {}
impl SpacerUpdater for NullUpdater {}
