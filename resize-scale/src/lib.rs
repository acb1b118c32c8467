// SPDX-License-Identifier: MIT
//! # resize-scale: Progressive-Halving Downscaler
//!
//! CPU raster primitives and the progressive halving algorithm used by
//! `progressive-resize`. No I/O and no async here; everything runs to
//! completion on the calling thread.
//!
//! ## Key Components
//!
//! - [`size`]: output size resolution (one driving dimension, aspect preserved)
//! - [`surface`]: RGBA8 surface with fill and scaled region draw
//! - [`halving`]: oversampled draw followed by repeated 2x reductions
//!
//! ## Usage Example
//!
//! ```rust
//! use resize_scale::halving::{progressive_resize, ResizeRequest};
//! use resize_scale::size::{resolve_size, Size};
//! use resize_scale::surface::{Rgba, Surface};
//!
//! let source = Surface::new(Size::new(1000, 500), Rgba::BLACK);
//! let target = resolve_size(source.size(), Some(100), None);
//! let request = ResizeRequest::full(&source, target, 2, Rgba::WHITE);
//!
//! let mut resizer = fast_image_resize::Resizer::new();
//! let out = progressive_resize(&mut resizer, &source, &request)?;
//! assert_eq!(out.size(), Size::new(100, 50));
//! # Ok::<(), resize_scale::surface::ScaleError>(())
//! ```

pub mod halving;
pub mod size;
pub mod surface;

pub use halving::{progressive_resize, ResizeRequest};
pub use size::{resolve_size, Size};
pub use surface::{MAX_SURFACE_PIXELS, Rect, Rgba, ScaleError, Surface};
