// SPDX-License-Identifier: MIT
//! # Progressive Halving
//!
//! Downscaling by a large ratio in a single scaled draw aliases badly. This
//! module instead draws the source once into an oversampled canvas
//! (`target * 2^level`) and then halves that canvas `level` times until it
//! reaches the target size.
//!
//! ## Algorithm
//!
//! 1. Clamp the resample level to `0..=4`; `factor = 2^level`.
//! 2. Allocate a canvas of `target * factor` filled with the background and
//!    draw the source region into the destination region scaled by `factor`.
//! 3. Repeat `level` times: allocate the next canvas at half the previous
//!    size (filled with the background) and draw the whole previous canvas
//!    into its top-left `prev.w * 0.5` x `prev.h * 0.5` region.
//!
//! The halving step always uses the fixed `0.5` factor on the previous
//! canvas's own dimensions; it never recomputes a ratio toward the target.
//! Level `0` degenerates to one direct scaled draw.
//!
//! ## Cost
//!
//! `level + 1` surface allocations and draws. Level 0 is the fastest and
//! lowest quality, level 4 the slowest and highest.

use fast_image_resize::Resizer;
use tracing::debug;

use crate::size::Size;
use crate::surface::{MAX_SURFACE_PIXELS, Rect, Rgba, ScaleError, Surface};

/// Highest accepted resample level; larger requests are clamped.
pub const MAX_RESAMPLE_LEVEL: u32 = 4;

/// Clamp a requested resample level to `0..=MAX_RESAMPLE_LEVEL`.
pub fn clamp_level(level: i32) -> u32 {
    level.clamp(0, MAX_RESAMPLE_LEVEL as i32) as u32
}

/// Everything one progressive resize needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResizeRequest {
    /// Region of the source to read.
    pub source_region: Rect,
    /// Region of the target canvas to draw into, in target pixels.
    pub dest_region: Rect,
    /// Final canvas size.
    pub target: Size,
    /// Requested number of halving passes, clamped to `0..=4`.
    pub resample_level: i32,
    /// Fill color for every canvas allocated along the way.
    pub background: Rgba,
}

impl ResizeRequest {
    /// Whole `source` scaled to fill a `target` canvas.
    pub fn full(source: &Surface, target: Size, resample_level: i32, background: Rgba) -> Self {
        Self {
            source_region: Rect::of_size(source.size()),
            dest_region: Rect::of_size(target),
            target,
            resample_level,
            background,
        }
    }
}

/// Canvas sizes a request goes through, first to last.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HalvingPlan {
    /// Clamped resample level (number of halving passes).
    pub level: u32,
    /// Size of the oversampled canvas the source is drawn into.
    pub oversampled: Size,
    /// Canvas size after each halving pass; empty for level 0.
    pub passes: Vec<Size>,
}

impl HalvingPlan {
    /// Size of the surface the plan ends with.
    pub fn output(&self) -> Size {
        self.passes.last().copied().unwrap_or(self.oversampled)
    }
}

/// Compute the canvas sizes for resizing to `target` at `resample_level`.
pub fn plan_halving(target: Size, resample_level: i32) -> Result<HalvingPlan, ScaleError> {
    let level = clamp_level(resample_level);
    let factor = 1u32 << level;
    let oversampled = target
        .checked_scale(factor)
        .filter(|size| size.checked_area().is_some_and(|area| area <= MAX_SURFACE_PIXELS))
        .ok_or(ScaleError::TooLarge {
            size: target,
            factor,
        })?;
    let passes = (0..level)
        .rev()
        .map(|remaining| Size::new(target.w << remaining, target.h << remaining))
        .collect();
    Ok(HalvingPlan {
        level,
        oversampled,
        passes,
    })
}

/// Resize `source` per `request`, returning a new surface of `request.target`.
///
/// The source is never modified; every step allocates a fresh surface.
pub fn progressive_resize(
    resizer: &mut Resizer,
    source: &Surface,
    request: &ResizeRequest,
) -> Result<Surface, ScaleError> {
    let plan = plan_halving(request.target, request.resample_level)?;
    let factor = 1u32 << plan.level;
    let d = request.dest_region;
    let dest = Rect::new(
        d.x.saturating_mul(factor),
        d.y.saturating_mul(factor),
        d.w.saturating_mul(factor),
        d.h.saturating_mul(factor),
    );

    let mut current = Surface::try_new(plan.oversampled, request.background)?;
    current.draw_region(resizer, source, request.source_region, dest)?;
    debug!(
        source = %source.size(),
        oversampled = %plan.oversampled,
        level = plan.level,
        "drew source into oversampled canvas"
    );

    for (pass, next_size) in plan.passes.iter().enumerate() {
        let mut next = Surface::try_new(*next_size, request.background)?;
        let half = Rect::new(
            0,
            0,
            (f64::from(current.width()) * 0.5) as u32,
            (f64::from(current.height()) * 0.5) as u32,
        );
        next.draw_region(resizer, &current, Rect::of_size(current.size()), half)?;
        debug!(pass = pass + 1, size = %next_size, "halving pass");
        current = next;
    }

    Ok(current)
}
