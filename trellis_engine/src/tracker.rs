// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bookkeeping of the last offset applied to each tracked node.
//!
//! Pure cache, no layout math: writing records the offset and forwards it to
//! the surface in one step, so position reads never have to query the surface
//! back.

use hashbrown::HashMap;
use kurbo::Point;
use trellis_surface::{NodeId, Surface};

/// Records the last-assigned on-screen offset for tracked nodes.
#[derive(Debug, Default)]
pub struct PositionTracker {
    positions: HashMap<NodeId, Point>,
}

impl PositionTracker {
    /// Records `(x, y)` for `node` and applies it to the surface.
    pub fn set(&mut self, surface: &mut impl Surface, node: NodeId, x: f64, y: f64) {
        let offset = Point::new(x, y);
        surface.set_offset(node, offset);
        self.positions.insert(node, offset);
    }

    /// The last recorded vertical offset of `node`.
    ///
    /// Untracked nodes read as 0; asking for one is an internal bug, caught
    /// in debug builds.
    #[must_use]
    pub fn top(&self, node: NodeId) -> f64 {
        debug_assert!(
            self.positions.contains_key(&node),
            "node is not in the position bookkeeping"
        );
        self.positions.get(&node).map_or(0.0, |p| p.y)
    }

    /// The last recorded horizontal offset of `node`. Untracked reads as 0.
    #[must_use]
    pub fn left(&self, node: NodeId) -> f64 {
        debug_assert!(
            self.positions.contains_key(&node),
            "node is not in the position bookkeeping"
        );
        self.positions.get(&node).map_or(0.0, |p| p.x)
    }

    /// Whether `node` currently has a recorded position.
    #[must_use]
    pub fn is_tracked(&self, node: NodeId) -> bool {
        self.positions.contains_key(&node)
    }

    /// Drops the record for `node` (typically right before node removal).
    pub fn remove(&mut self, node: NodeId) {
        self.positions.remove(&node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_surface::TestSurface;

    #[test]
    fn set_records_and_applies() {
        let mut surface = TestSurface::default();
        let root = surface.root();
        let node = surface.create_child(root, 0);

        let mut tracker = PositionTracker::default();
        tracker.set(&mut surface, node, 12.0, 34.0);

        assert_eq!(tracker.left(node), 12.0);
        assert_eq!(tracker.top(node), 34.0);
        assert_eq!(surface.node(node).offset, Point::new(12.0, 34.0));
    }

    #[test]
    fn remove_forgets_the_node() {
        let mut surface = TestSurface::default();
        let root = surface.root();
        let node = surface.create_child(root, 0);

        let mut tracker = PositionTracker::default();
        tracker.set(&mut surface, node, 1.0, 2.0);
        assert!(tracker.is_tracked(node));
        tracker.remove(node);
        assert!(!tracker.is_tracked(node));
    }
}
