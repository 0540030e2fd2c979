// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Normalized input-event records and the subscription contract.
//!
//! Hosts translate native scroll/wheel/touch events into these records and
//! deliver them to the engine for whichever [`EventKind`]s the engine has
//! subscribed to. The engine never registers callbacks and never sees native
//! event objects; ownership stays one-directional.

/// The kinds of input the engine can subscribe to while attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Scrollbar position changes, driven by the host's scrollbar widgets.
    Scroll,
    /// Wheel input over the engine's area.
    Wheel,
    /// Touch-drag input over the engine's area.
    Touch,
}

/// Handle identifying one active subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
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

/// The unit a wheel delta is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeltaUnit {
    /// Deltas are pixels.
    #[default]
    Pixel,
    /// Deltas are text lines; the engine multiplies by its default row height.
    Line,
}

/// A normalized wheel event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelDelta {
    /// Horizontal delta, positive scrolling content leftward.
    pub delta_x: f64,
    /// Vertical delta, positive scrolling content upward.
    pub delta_y: f64,
    /// The unit both deltas are expressed in.
    pub unit: DeltaUnit,
    /// Whether the event targeted a node inside the body section. Events
    /// outside the body (header, footer, decorations) do not scroll the body.
    pub within_body: bool,
}

/// A normalized touch-drag step, always in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchMove {
    /// Horizontal movement since the previous step.
    pub dx: f64,
    /// Vertical movement since the previous step.
    pub dy: f64,
}
