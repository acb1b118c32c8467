// SPDX-License-Identifier: MIT
//! # Output Size Resolution
//!
//! Computes the dimensions an image should be resized to from its natural size
//! and the caller's requested width and/or height.
//!
//! ## Rules
//!
//! - A requested dimension of `None` or `0` counts as "not supplied".
//! - Only one dimension ever drives scaling. When both are supplied the larger
//!   one is kept and the other discarded; a tie keeps the width.
//! - The other side follows the source aspect ratio.
//! - Results are truncated toward zero, never rounded.
//!
//! Degenerate sources (a zero width or height) produce non-finite ratios;
//! those resolve to `0` instead of saturating to a huge dimension.

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    /// True when either side is zero.
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Multiply both sides by `factor`, or `None` on overflow.
    pub fn checked_scale(self, factor: u32) -> Option<Size> {
        Some(Size {
            w: self.w.checked_mul(factor)?,
            h: self.h.checked_mul(factor)?,
        })
    }

    /// Number of pixels, or `None` if it does not fit in `usize`.
    pub fn checked_area(&self) -> Option<usize> {
        (self.w as usize).checked_mul(self.h as usize)
    }

    /// Number of bytes an RGBA8 buffer of this size occupies, or `None` on
    /// overflow.
    pub fn checked_rgba_len(&self) -> Option<usize> {
        self.checked_area()?.checked_mul(4)
    }

    /// Like [`Size::checked_rgba_len`] but saturating at `usize::MAX`.
    pub fn rgba_len(&self) -> usize {
        self.checked_rgba_len().unwrap_or(usize::MAX)
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Resolve the output size for a source of `src` pixels.
///
/// # Arguments
/// * `src` - Natural dimensions of the source image
/// * `target_w` - Requested width, `None`/`0` when not requested
/// * `target_h` - Requested height, `None`/`0` when not requested
///
/// # Returns
/// The size to resize to. Equal to `src` when nothing was requested.
pub fn resolve_size(src: Size, target_w: Option<u32>, target_h: Option<u32>) -> Size {
    let mut target_w = target_w.filter(|&w| w > 0);
    let mut target_h = target_h.filter(|&h| h > 0);

    if let (Some(w), Some(h)) = (target_w, target_h) {
        if w >= h {
            target_h = None;
        } else {
            target_w = None;
        }
    }

    match (target_w, target_h) {
        (Some(w), _) => Size {
            w,
            h: truncate(f64::from(src.h) * (f64::from(w) / f64::from(src.w))),
        },
        (None, Some(h)) => Size {
            w: truncate(f64::from(src.w) * (f64::from(h) / f64::from(src.h))),
            h,
        },
        (None, None) => src,
    }
}

fn truncate(v: f64) -> u32 {
    if v.is_finite() {
        v.trunc() as u32
    } else {
        0
    }
}
