// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory [`Surface`] that records every mutation.

use alloc::vec::Vec;
use hashbrown::HashMap;
use kurbo::{Point, Size};

use crate::event::{EventKind, SubscriptionId};
use crate::surface::{FrozenKind, NodeId, Surface};

/// State held for one node of a [`TestSurface`].
#[derive(Debug, Clone)]
pub struct TestNode {
    /// The parent handle; `None` only for the root.
    pub parent: Option<NodeId>,
    /// Children in physical order.
    pub children: Vec<NodeId>,
    /// Last applied offset.
    pub offset: Point,
    /// Last applied extent.
    pub extent: Size,
    /// Whether the node is hidden.
    pub hidden: bool,
    /// Frozen marking.
    pub frozen: FrozenKind,
    /// Intrinsic size reported by [`Surface::measure_intrinsic`].
    pub intrinsic: Size,
}

impl TestNode {
    fn new(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            offset: Point::ZERO,
            extent: Size::ZERO,
            hidden: false,
            frozen: FrozenKind::None,
            intrinsic: Size::ZERO,
        }
    }
}

/// An in-memory surface for tests.
///
/// Every structural or visual mutation bumps [`TestSurface::mutation_count`],
/// which lets tests assert that an operation touched the tree a bounded
/// number of times (or not at all).
#[derive(Debug)]
pub struct TestSurface {
    nodes: HashMap<NodeId, TestNode>,
    root: NodeId,
    next_id: u64,
    next_subscription: u64,
    subscriptions: Vec<(SubscriptionId, EventKind)>,
    viewport: Size,
    probe_height: f64,
    mutations: u64,
}

impl Default for TestSurface {
    fn default() -> Self {
        Self::new(Size::new(400.0, 400.0))
    }
}

impl TestSurface {
    /// Creates a surface with the given viewport size and a 20px probe height.
    #[must_use]
    pub fn new(viewport: Size) -> Self {
        let root = NodeId::from_raw(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, TestNode::new(None));
        Self {
            nodes,
            root,
            next_id: 1,
            next_subscription: 0,
            subscriptions: Vec::new(),
            viewport,
            probe_height: 20.0,
            mutations: 0,
        }
    }

    /// Sets the height the row-height probe reports.
    pub fn set_probe_height(&mut self, height: f64) {
        self.probe_height = height;
    }

    /// Resizes the viewport. Does not notify the engine; tests drive the
    /// engine's resize entry point themselves.
    pub fn set_viewport_size(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Sets the intrinsic size measurement for one node.
    ///
    /// # Panics
    ///
    /// Panics if `node` does not exist.
    pub fn set_intrinsic(&mut self, node: NodeId, intrinsic: Size) {
        self.node_mut(node).intrinsic = intrinsic;
    }

    /// Read access to a node's recorded state.
    #[must_use]
    pub fn node(&self, node: NodeId) -> &TestNode {
        self.nodes.get(&node).expect("node exists")
    }

    /// Whether the node is still in the tree.
    #[must_use]
    pub fn node_exists(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// The children of `parent` in physical order.
    #[must_use]
    pub fn children(&self, parent: NodeId) -> &[NodeId] {
        &self.node(parent).children
    }

    /// The number of structural/visual mutations applied so far.
    #[must_use]
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    /// The event kinds currently subscribed, in subscription order.
    #[must_use]
    pub fn subscribed_kinds(&self) -> Vec<EventKind> {
        self.subscriptions.iter().map(|(_, kind)| *kind).collect()
    }

    fn node_mut(&mut self, node: NodeId) -> &mut TestNode {
        self.nodes.get_mut(&node).expect("node exists")
    }

    fn remove_subtree(&mut self, node: NodeId) {
        if let Some(state) = self.nodes.remove(&node) {
            for child in state.children {
                self.remove_subtree(child);
            }
        }
    }
}

impl Surface for TestSurface {
    fn root(&self) -> NodeId {
        self.root
    }

    fn create_child(&mut self, parent: NodeId, index: usize) -> NodeId {
        self.mutations += 1;
        let id = NodeId::from_raw(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, TestNode::new(Some(parent)));
        let siblings = &mut self.node_mut(parent).children;
        let index = index.min(siblings.len());
        siblings.insert(index, id);
        id
    }

    fn remove_node(&mut self, node: NodeId) {
        self.mutations += 1;
        debug_assert!(node != self.root, "cannot remove the root node");
        if let Some(parent) = self.node(node).parent {
            self.node_mut(parent).children.retain(|c| *c != node);
        }
        self.remove_subtree(node);
    }

    fn child_count(&self, parent: NodeId) -> usize {
        self.node(parent).children.len()
    }

    fn reorder_children(&mut self, parent: NodeId, order: &[NodeId]) {
        self.mutations += 1;
        let children = &mut self.node_mut(parent).children;
        debug_assert_eq!(
            children.len(),
            order.len(),
            "reorder must cover every child"
        );
        children.clear();
        children.extend_from_slice(order);
    }

    fn set_offset(&mut self, node: NodeId, offset: Point) {
        self.mutations += 1;
        self.node_mut(node).offset = offset;
    }

    fn set_extent(&mut self, node: NodeId, extent: Size) {
        self.mutations += 1;
        self.node_mut(node).extent = extent;
    }

    fn set_hidden(&mut self, node: NodeId, hidden: bool) {
        self.mutations += 1;
        self.node_mut(node).hidden = hidden;
    }

    fn set_frozen(&mut self, node: NodeId, frozen: FrozenKind) {
        self.mutations += 1;
        self.node_mut(node).frozen = frozen;
    }

    fn measure_intrinsic(&mut self, node: NodeId) -> Size {
        self.node(node).intrinsic
    }

    fn probe_row_height(&mut self) -> f64 {
        self.probe_height
    }

    fn viewport_size(&self) -> Size {
        self.viewport
    }

    fn subscribe(&mut self, kind: EventKind) -> SubscriptionId {
        let id = SubscriptionId::from_raw(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.push((id, kind));
        id
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.subscriptions.retain(|(id, _)| *id != subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_construction_and_removal() {
        let mut s = TestSurface::default();
        let root = s.root();
        let a = s.create_child(root, 0);
        let b = s.create_child(root, 1);
        let a1 = s.create_child(a, 0);
        assert_eq!(s.children(root), &[a, b]);
        assert_eq!(s.children(a), &[a1]);

        s.remove_node(a);
        assert!(!s.node_exists(a));
        assert!(!s.node_exists(a1));
        assert_eq!(s.children(root), &[b]);
    }

    #[test]
    fn insert_at_index_and_reorder() {
        let mut s = TestSurface::default();
        let root = s.root();
        let a = s.create_child(root, 0);
        let b = s.create_child(root, 0);
        let c = s.create_child(root, 1);
        assert_eq!(s.children(root), &[b, c, a]);

        s.reorder_children(root, &[a, b, c]);
        assert_eq!(s.children(root), &[a, b, c]);
    }

    #[test]
    fn mutation_count_tracks_writes() {
        let mut s = TestSurface::default();
        let root = s.root();
        let before = s.mutation_count();
        let a = s.create_child(root, 0);
        s.set_offset(a, Point::new(1.0, 2.0));
        s.set_hidden(a, true);
        assert_eq!(s.mutation_count(), before + 3);

        // Reads leave the counter alone.
        let count = s.mutation_count();
        let _ = s.child_count(root);
        let _ = s.measure_intrinsic(a);
        assert_eq!(s.mutation_count(), count);
    }

    #[test]
    fn subscriptions_roundtrip() {
        let mut s = TestSurface::default();
        let wheel = s.subscribe(EventKind::Wheel);
        let _scroll = s.subscribe(EventKind::Scroll);
        assert_eq!(
            s.subscribed_kinds(),
            alloc::vec![EventKind::Wheel, EventKind::Scroll]
        );
        s.unsubscribe(wheel);
        assert_eq!(s.subscribed_kinds(), alloc::vec![EventKind::Scroll]);
    }
}
