// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Surface`] capability trait and its node handle type.

use kurbo::{Point, Size};

use crate::event::{EventKind, SubscriptionId};

/// Opaque handle to one display node owned by a [`Surface`].
///
/// Handles are never reused within the lifetime of a surface. A handle for a
/// removed node is dangling; passing one to a surface method is a caller bug
/// and surfaces may panic on it in debug builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a handle from a raw value. Intended for surface implementors.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value behind the handle.
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        self.0
    }
}

/// How a cell participates in horizontal freezing.
///
/// Frozen cells are pinned at the current horizontal scroll offset instead of
/// translating with the viewport. The last frozen column in a row is marked
/// distinctly so hosts can style the freeze boundary (a divider, a shadow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrozenKind {
    /// Not frozen; scrolls with the viewport.
    #[default]
    None,
    /// Frozen; pinned at the horizontal scroll offset.
    Frozen,
    /// Frozen, and the rightmost frozen cell of its row.
    LastFrozen,
}

/// A tree of positionable display nodes the table engine can drive.
///
/// Positioning is absolute within the parent: node order in the tree does not
/// affect layout (the engine positions every row and cell explicitly), but it
/// does affect traversal order for assistive technology, which is why the
/// engine occasionally reorders children to match the visual order.
///
/// All offsets and extents are in logical pixels and are finite.
pub trait Surface {
    /// The root node everything else hangs off.
    fn root(&self) -> NodeId;

    /// Creates a node as the child of `parent` at physical position `index`
    /// (clamped to the current child count).
    fn create_child(&mut self, parent: NodeId, index: usize) -> NodeId;

    /// Removes `node` and its subtree.
    fn remove_node(&mut self, node: NodeId);

    /// The number of children under `parent`.
    fn child_count(&self, parent: NodeId) -> usize;

    /// Reorders the children of `parent` to match `order` exactly.
    ///
    /// `order` must be a permutation of the current children.
    fn reorder_children(&mut self, parent: NodeId, order: &[NodeId]);

    /// Sets the node's pixel offset within its parent.
    fn set_offset(&mut self, node: NodeId, offset: Point);

    /// Sets the node's pixel extent.
    fn set_extent(&mut self, node: NodeId, extent: Size);

    /// Shows or hides the node (hidden nodes keep their layout state).
    fn set_hidden(&mut self, node: NodeId, hidden: bool);

    /// Marks a cell's participation in horizontal freezing.
    fn set_frozen(&mut self, node: NodeId, frozen: FrozenKind);

    /// Measures the content-driven minimum size of the node as currently
    /// rendered. Used for auto column widths.
    fn measure_intrinsic(&mut self, node: NodeId) -> Size;

    /// Measures the natural height of a minimal text row on this surface.
    ///
    /// This is the autodetection probe for the default row height (a throwaway
    /// row holding two characters of filler text, measured and discarded).
    fn probe_row_height(&mut self) -> f64;

    /// The size of the area the engine is rendered into.
    fn viewport_size(&self) -> Size;

    /// Asks the host to start delivering events of `kind` to the engine.
    fn subscribe(&mut self, kind: EventKind) -> SubscriptionId;

    /// Cancels a subscription made with [`Surface::subscribe`].
    fn unsubscribe(&mut self, subscription: SubscriptionId);
}
