//! Shared helpers for the integration tests: stub loaders and test images.

#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use progressive_resize::{
    FileInput, FormReader, Loader, ResizeError, ResizeResult, Rgba, Size, Surface,
};

/// Opaque horizontal gradient.
pub fn gradient(width: u32, height: u32) -> Surface {
    let mut data = Vec::with_capacity(Size::new(width, height).rgba_len());
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x * 255 / width.max(1)) as u8, (y % 256) as u8, 90, 255]);
        }
    }
    Surface::from_rgba8(width, height, data).expect("gradient buffer")
}

/// Encoded PNG of `surface`.
pub fn png_bytes(surface: &Surface) -> Vec<u8> {
    let uri =
        progressive_resize::encode::to_data_uri(surface, "image/png", 1.0).expect("png encode");
    progressive_resize::encode::data_uri_to_blob(&uri).expect("png blob").data
}

/// Loader that hands out a fixed surface and counts calls.
#[derive(Clone)]
pub struct StubLoader {
    surface: Surface,
    pub calls: Arc<AtomicUsize>,
}

impl StubLoader {
    pub fn new(surface: Surface) -> Self {
        Self {
            surface,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Loader for StubLoader {
    async fn load(&self, url: &str) -> ResizeResult<Surface> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.is_empty() {
            return Err(ResizeError::load("", "no source url given"));
        }
        Ok(self.surface.clone())
    }
}

/// Loader that always fails.
pub struct FailingLoader;

#[async_trait]
impl Loader for FailingLoader {
    async fn load(&self, url: &str) -> ResizeResult<Surface> {
        Err(ResizeError::load(url, "connection refused"))
    }
}

/// Form reader that returns a fixed surface for any non-empty input.
pub struct StubFormReader(pub Surface);

#[async_trait]
impl FormReader for StubFormReader {
    async fn read(&self, input: &FileInput) -> ResizeResult<Surface> {
        input.first()?;
        Ok(self.0.clone())
    }
}

pub fn solid(width: u32, height: u32, color: Rgba) -> Surface {
    Surface::new(Size::new(width, height), color)
}
