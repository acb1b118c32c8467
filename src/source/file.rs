//! Filesystem reader for [`FileInput`].

use async_trait::async_trait;
use resize_scale::Surface;
use tracing::debug;

use super::{FileInput, FormReader, decode_surface};
use crate::error::{ResizeError, ResizeResult};

/// Reads the first attached file with `tokio::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsFormReader;

#[async_trait]
impl FormReader for FsFormReader {
    async fn read(&self, input: &FileInput) -> ResizeResult<Surface> {
        let path = input.first()?;
        let target = path.display().to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ResizeError::load_with(&target, "failed to read file", e))?;
        debug!(path = %target, bytes = bytes.len(), "read file input");
        decode_surface(bytes, &target).await
    }
}
