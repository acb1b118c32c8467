//! # Progressive Resize Library
//!
//! Load an image from a URL, an inline `data:` URI or a file, shrink it with
//! progressive halving, and hand it back as a data URI, an encoded blob or a
//! raw RGBA surface.
//!
//! ## Architecture
//!
//! - `source`: URL loader and file reader behind the `Loader`/`FormReader` traits
//! - `pipeline`: the `get` → `resize` → `output` orchestrator
//! - `encode`: MIME handling and data URI / blob serialization
//! - `config`: options, per-call overlays and options files
//! - `error`: error taxonomy with recovery suggestions
//!
//! The raster work (size resolution, surfaces, halving) lives in the
//! `resize-scale` crate and is re-exported here.
//!
//! ## Example
//!
//! ```rust,no_run
//! use progressive_resize::{FileInput, OutputType, PartialOptions, Pipeline, Source};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(
//!     PartialOptions::new().with_width(640).with_output_type(OutputType::Blob),
//! )?;
//!
//! let out = pipeline.play(&Source::File(FileInput::single("photo.png"))).await?;
//! if let Some(blob) = out.as_blob() {
//!     std::fs::write("photo_small.jpg", &blob.data)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod encode;
pub mod error;
pub mod pipeline;
pub mod source;

/// Re-export error types for convenience
pub use error::{HasRecoverySuggestion, ResizeError, ResizeResult};

pub use config::{Options, OutputType, PartialOptions};
pub use encode::{Blob, Output};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use source::{FileInput, FormReader, FsFormReader, HttpLoader, Loader, Source};

/// Re-export the raster primitives
pub use resize_scale::{
    Rect, ResizeRequest, Rgba, ScaleError, Size, Surface, progressive_resize, resolve_size,
};
