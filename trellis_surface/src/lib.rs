// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Surface: the render-surface seam for the table engine.
//!
//! The table engine never talks to a concrete rendering technology. Instead it
//! drives a [`Surface`]: an abstract tree of positionable display nodes with a
//! small capability set (create/remove/reorder children, set pixel offset and
//! extent, hide, mark frozen, measure intrinsic size) plus an event
//! subscription contract and a viewport query.
//!
//! The core concepts are:
//!
//! - [`NodeId`]: an opaque handle to one display node. The engine owns the
//!   handles; the surface owns the nodes.
//! - [`Surface`]: the capability trait a host implements over its real
//!   display tree.
//! - [`WheelDelta`] / [`TouchMove`]: normalized input records. Hosts translate
//!   native events into these and feed them to the engine; the engine never
//!   sees a native event object.
//! - [`EventKind`] / [`SubscriptionId`]: the engine subscribes to the kinds of
//!   events it wants while attached and unsubscribes on detach; the host
//!   delivers only subscribed kinds.
//! - [`TestSurface`]: an in-memory implementation that records every mutation,
//!   with configurable intrinsic sizes, probe row height, and viewport.
//!   The engine's own tests run against it; hosts can use it for theirs.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod event;
mod surface;
mod test_surface;

pub use event::{DeltaUnit, EventKind, SubscriptionId, TouchMove, WheelDelta};
pub use surface::{FrozenKind, NodeId, Surface};
pub use test_surface::{TestNode, TestSurface};
