// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scroll destination arithmetic and virtual-viewport scrollbar sizing.

use alloc::string::String;

use crate::columns::ColumnConfig;
use crate::error::{EngineError, Result};
use crate::scrollbar::Scrollbar;

/// Slack for sub-pixel comparisons; differences below this are rendering
/// noise, not real overflow.
pub(crate) const PIXEL_EPSILON: f64 = 0.49;

/// Where a scrolled-to target should end up relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollDestination {
    /// Scroll as little as possible to show the target. If the target fits
    /// the viewport this behaves as [`Self::Start`] or [`Self::End`]
    /// depending on which side it currently overflows; a target already in
    /// view causes no scrolling at all.
    #[default]
    Any,
    /// Align the target with the start of the viewport.
    Start,
    /// Center the target in the viewport. Does not accept a padding.
    Middle,
    /// Align the target with the end of the viewport.
    End,
}

/// The scroll position that places `[target_start, target_end]` at
/// `destination` within a viewport currently showing
/// `[viewport_start, viewport_end]`. The result may exceed the scrollable
/// range; the scrollbar clamp takes care of that.
pub(crate) fn scroll_pos_for(
    destination: ScrollDestination,
    target_start: f64,
    target_end: f64,
    viewport_start: f64,
    viewport_end: f64,
    padding: f64,
) -> f64 {
    let viewport_length = viewport_end - viewport_start;
    match destination {
        ScrollDestination::Any => {
            let start_scroll_pos = target_start - padding;
            let end_scroll_pos = target_end + padding - viewport_length;
            if start_scroll_pos < viewport_start {
                start_scroll_pos
            } else if target_end + padding > viewport_end {
                end_scroll_pos
            } else {
                // Already visible.
                viewport_start
            }
        }
        ScrollDestination::Start => target_start - padding,
        ScrollDestination::Middle => {
            let target_middle = target_start + (target_end - target_start) / 2.0;
            target_middle - viewport_length / 2.0
        }
        ScrollDestination::End => target_end + padding - viewport_length,
    }
}

pub(crate) fn validate_destination(destination: ScrollDestination, padding: f64) -> Result<()> {
    if destination == ScrollDestination::Middle && padding != 0.0 {
        return Err(EngineError::InvalidArgument(String::from(
            "a padding cannot be combined with a middle destination",
        )));
    }
    Ok(())
}

/// Everything the virtual-viewport recalculation depends on.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ViewportInputs {
    pub(crate) width_of_engine: f64,
    pub(crate) height_of_engine: f64,
    pub(crate) header_height: f64,
    pub(crate) footer_height: f64,
    /// Full body content height: all logical rows plus all spacers.
    pub(crate) scroll_content_height: f64,
}

/// The inner sizes that remain after scrollbar reservations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ViewportLayout {
    pub(crate) inner_width: f64,
    pub(crate) inner_height: f64,
    pub(crate) vertical_scroll_needed: bool,
    pub(crate) horizontal_scroll_needed: bool,
}

/// Recalculates both scrollbars so their handles represent the virtual
/// viewport, and returns the inner sizes left over for content.
///
/// Either scrollbar appearing steals room from the other axis, which can in
/// turn make the other scrollbar necessary; the single recheck below settles
/// that interaction.
pub(crate) fn recalculate_virtual_viewport(
    inputs: ViewportInputs,
    columns: &ColumnConfig,
    vertical: &mut Scrollbar,
    horizontal: &mut Scrollbar,
) -> ViewportLayout {
    let scroll_content_width = columns.row_width();
    let section_heights = inputs.header_height + inputs.footer_height;

    let mut vertical_scroll_needed =
        inputs.scroll_content_height > inputs.height_of_engine + PIXEL_EPSILON - section_heights;
    let mut horizontal_scroll_needed =
        scroll_content_width > inputs.width_of_engine + PIXEL_EPSILON;

    if vertical_scroll_needed != horizontal_scroll_needed {
        if !vertical_scroll_needed && horizontal_scroll_needed {
            vertical_scroll_needed = inputs.scroll_content_height
                > inputs.height_of_engine + PIXEL_EPSILON
                    - section_heights
                    - horizontal.thickness();
        } else {
            horizontal_scroll_needed = scroll_content_width
                > inputs.width_of_engine + PIXEL_EPSILON - vertical.thickness();
        }
    }

    let mut inner_width = inputs.width_of_engine;
    if vertical_scroll_needed {
        inner_width = (inner_width - vertical.thickness()).max(0.0);
    }
    let mut inner_height = inputs.height_of_engine;
    if horizontal_scroll_needed {
        inner_height = (inner_height - horizontal.thickness()).max(0.0);
    }

    let vertical_offset = (inner_height - section_heights).max(0.0);
    vertical.set_offset_size(vertical_offset);
    vertical.set_scroll_size(inputs.scroll_content_height);

    // Frozen columns don't participate in horizontal scrolling: the handle
    // covers only the unfrozen pixels, offset to start after the frozen
    // block.
    let frozen_pixels = columns.frozen_pixels();
    let unfrozen_pixels = scroll_content_width - frozen_pixels;
    let horizontal_offset = (inner_width - frozen_pixels).max(0.0);
    let prev_scroll_pos = horizontal.scroll_pos();
    horizontal.set_offset_size(horizontal_offset);
    horizontal.set_scroll_size(unfrozen_pixels);
    horizontal.set_scroll_pos(prev_scroll_pos);

    ViewportLayout {
        inner_width,
        inner_height,
        vertical_scroll_needed,
        horizontal_scroll_needed,
    }
}
