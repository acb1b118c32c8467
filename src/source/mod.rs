//! # Image Sources
//!
//! Where a pipeline gets its input surface from. A [`Source`] is either a URL
//! (remote `http(s)` or inline `data:`) or a [`FileInput`], the stand-in for a
//! form file picker. URLs are handed to a [`Loader`], file inputs to a
//! [`FormReader`]. Both are traits so tests and embedders can swap them out.

pub mod file;
pub mod http;

use std::{fmt, path::PathBuf};

use async_trait::async_trait;
use resize_scale::Surface;

use crate::error::{ResizeError, ResizeResult};

pub use file::FsFormReader;
pub use http::HttpLoader;

/// Files attached to a file input. Only the first one is ever read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileInput {
    pub files: Vec<PathBuf>,
}

impl FileInput {
    pub fn new(files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            files: vec![path.into()],
        }
    }

    /// First attached file, or a source error when nothing is attached.
    pub fn first(&self) -> ResizeResult<&PathBuf> {
        self.files.first().ok_or_else(|| {
            ResizeError::source("file input has no file attached")
                .with_recovery_suggestion("Attach an image file to the input before loading it")
        })
    }
}

/// Input of `get` and `play`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(FileInput),
}

impl Source {
    /// Classify a command-line argument: `http://`, `https://` and `data:`
    /// are URLs, anything else is a file path.
    pub fn parse(arg: &str) -> Source {
        let lower = arg.trim_start().to_ascii_lowercase();
        if ["http://", "https://", "data:"].iter().any(|p| lower.starts_with(p)) {
            Source::Url(arg.to_string())
        } else {
            Source::File(FileInput::single(arg))
        }
    }
}

impl From<&str> for Source {
    fn from(url: &str) -> Self {
        Source::Url(url.to_string())
    }
}

impl From<String> for Source {
    fn from(url: String) -> Self {
        Source::Url(url)
    }
}

impl From<FileInput> for Source {
    fn from(input: FileInput) -> Self {
        Source::File(input)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) if url.starts_with("data:") => {
                let head: String = url.chars().take(32).collect();
                write!(f, "{}...", head)
            }
            Source::Url(url) => f.write_str(url),
            Source::File(input) => match input.files.first() {
                Some(path) => write!(f, "{}", path.display()),
                None => f.write_str("<empty file input>"),
            },
        }
    }
}

/// Loads a URL into a decoded surface.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, url: &str) -> ResizeResult<Surface>;
}

/// Reads the first file of a file input into a decoded surface.
#[async_trait]
pub trait FormReader: Send + Sync {
    async fn read(&self, input: &FileInput) -> ResizeResult<Surface>;
}

/// Decode encoded image bytes (any format the `image` crate reads) into an
/// RGBA surface on the blocking pool.
pub async fn decode_surface(bytes: Vec<u8>, target: &str) -> ResizeResult<Surface> {
    let owned = target.to_string();
    tokio::task::spawn_blocking(move || decode_blocking(&bytes, &owned))
        .await
        .map_err(|e| ResizeError::task("decode", e).with_metadata("target", target))?
}

fn decode_blocking(bytes: &[u8], target: &str) -> ResizeResult<Surface> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| ResizeError::load_with(target, "failed to decode image", e))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Surface::from_rgba8(width, height, image.into_raw())
        .map_err(|e| ResizeError::scale("decode", e).with_metadata("target", target))
}
