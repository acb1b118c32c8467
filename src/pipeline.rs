//! # Resize Pipeline
//!
//! The orchestrator: `get` a surface from a [`Source`], `resize` it with
//! progressive halving, and `output` it in the configured shape. `play` runs
//! all three in order and stops at the first error.
//!
//! Each [`Pipeline`] owns its [`Options`], copied from the default template
//! and overlaid with the constructor's [`PartialOptions`]. Every operation
//! also takes optional per-call overrides that are merged over the instance
//! options for that call only.
//!
//! Decoding, drawing and encoding run on tokio's blocking pool.
//!
//! ## Example
//!
//! ```rust,no_run
//! use progressive_resize::{OutputType, PartialOptions, Pipeline, Source};
//!
//! # async fn example() -> progressive_resize::ResizeResult<()> {
//! let options = PartialOptions::new()
//!     .with_width(100)
//!     .with_format("png")
//!     .with_output_type(OutputType::Base64);
//! let pipeline = Pipeline::new(options)?;
//! let out = pipeline.play(&Source::from("https://example.com/photo.jpg")).await?;
//! assert!(out.as_base64().is_some_and(|uri| uri.starts_with("data:image/png;base64,")));
//! # Ok(())
//! # }
//! ```

use fast_image_resize::Resizer;
use resize_scale::halving::clamp_level;
use resize_scale::{ResizeRequest, Surface, progressive_resize, resolve_size};
use tokio::task::spawn_blocking;
use tracing::info;

use crate::config::{Options, PartialOptions};
use crate::encode::{self, Output};
use crate::error::{ResizeError, ResizeResult};
use crate::source::{FormReader, FsFormReader, HttpLoader, Loader, Source};

/// Configured resize pipeline.
pub struct Pipeline {
    options: Options,
    loader: Box<dyn Loader>,
    form_reader: Box<dyn FormReader>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Pipeline with the default loaders and `options` over the defaults.
    pub fn new(options: PartialOptions) -> ResizeResult<Self> {
        Self::builder().options(options).build()
    }

    /// Create a new pipeline using the builder pattern.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Current instance options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Merge `partial` into the instance options. Invalid results are
    /// rejected and leave the options unchanged.
    pub fn update_options(&mut self, partial: &PartialOptions) -> ResizeResult<&mut Self> {
        let next = self.options.merged(partial);
        next.validate()
            .map_err(|e| e.with_operation("update_options"))?;
        self.options = next;
        Ok(self)
    }

    fn effective(
        &self,
        overrides: Option<&PartialOptions>,
        operation: &str,
    ) -> ResizeResult<Options> {
        match overrides {
            None => Ok(self.options.clone()),
            Some(partial) => {
                let options = self.options.merged(partial);
                options.validate().map_err(|e| e.with_operation(operation))?;
                Ok(options)
            }
        }
    }

    /// Load `source` and flatten it onto the background color.
    #[tracing::instrument(skip_all, fields(source = %source))]
    pub async fn get(
        &self,
        source: &Source,
        overrides: Option<&PartialOptions>,
    ) -> ResizeResult<Surface> {
        let options = self.effective(overrides, "get")?;
        let background = options.background()?;
        let loaded = match source {
            Source::Url(url) => self.loader.load(url).await,
            Source::File(input) => self.form_reader.read(input).await,
        }
        .map_err(|e| e.with_operation("get"))?;
        info!(size = %loaded.size(), "loaded source image");
        spawn_blocking(move || loaded.flattened(background))
            .await
            .map_err(|e| ResizeError::task("flatten", e).with_operation("get"))
    }

    /// Resize `surface` to the configured dimensions. The input is not
    /// modified.
    #[tracing::instrument(skip_all, fields(size = %surface.size()))]
    pub async fn resize(
        &self,
        surface: &Surface,
        overrides: Option<&PartialOptions>,
    ) -> ResizeResult<Surface> {
        let options = self.effective(overrides, "resize")?;
        self.resize_owned(surface.clone(), options).await
    }

    async fn resize_owned(&self, surface: Surface, options: Options) -> ResizeResult<Surface> {
        let target = resolve_size(surface.size(), options.width, options.height);
        let request = ResizeRequest::full(
            &surface,
            target,
            options.resample_level,
            options.background()?,
        );
        let resized = spawn_blocking(move || {
            let mut resizer = Resizer::new();
            progressive_resize(&mut resizer, &surface, &request)
        })
        .await
        .map_err(|e| ResizeError::task("resize", e).with_operation("resize"))?
        .map_err(|e| {
            ResizeError::scale("resize", e)
                .with_operation("resize")
                .with_metadata("target", target.to_string())
                .with_recovery_suggestion("Request a smaller width or height")
        })?;
        info!(
            target = %target,
            level = clamp_level(options.resample_level),
            "resized surface"
        );
        Ok(resized)
    }

    /// Encode `surface` in the configured output shape.
    #[tracing::instrument(skip_all, fields(size = %surface.size()))]
    pub async fn output(
        &self,
        surface: Surface,
        overrides: Option<&PartialOptions>,
    ) -> ResizeResult<Output> {
        let options = self.effective(overrides, "output")?;
        self.output_owned(surface, options).await
    }

    async fn output_owned(&self, surface: Surface, options: Options) -> ResizeResult<Output> {
        let Options {
            format,
            quality,
            output_type,
            ..
        } = options;
        let log_format = format.clone();
        let out = spawn_blocking(move || encode::encode(surface, &format, quality, output_type))
            .await
            .map_err(|e| ResizeError::task("output", e).with_operation("output"))?
            .map_err(|e| e.with_operation("output"))?;
        info!(output_type = %output_type, format = %log_format, "encoded output");
        Ok(out)
    }

    /// `get`, `resize` and `output` with the instance options.
    pub async fn play(&self, source: &Source) -> ResizeResult<Output> {
        self.play_with(source, None).await
    }

    /// `play` with per-call overrides applied to every stage.
    #[tracing::instrument(skip_all, fields(source = %source))]
    pub async fn play_with(
        &self,
        source: &Source,
        overrides: Option<&PartialOptions>,
    ) -> ResizeResult<Output> {
        let options = self.effective(overrides, "play")?;
        let loaded = self.get(source, overrides).await?;
        let resized = self.resize_owned(loaded, options.clone()).await?;
        self.output_owned(resized, options).await
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    options: PartialOptions,
    loader: Option<Box<dyn Loader>>,
    form_reader: Option<Box<dyn FormReader>>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            options: PartialOptions::default(),
            loader: None,
            form_reader: None,
        }
    }

    /// Layer `options` over what the builder already has.
    pub fn options(mut self, options: PartialOptions) -> Self {
        self.options.merge_from(&options);
        self
    }

    /// Loader for `Source::Url`; defaults to [`HttpLoader`].
    pub fn loader<L: Loader + 'static>(mut self, loader: L) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Reader for `Source::File`; defaults to [`FsFormReader`].
    pub fn form_reader<R: FormReader + 'static>(mut self, reader: R) -> Self {
        self.form_reader = Some(Box::new(reader));
        self
    }

    /// Build the pipeline, validating the merged options.
    pub fn build(self) -> ResizeResult<Pipeline> {
        let options = Options::default().merged(&self.options);
        options.validate().map_err(|e| e.with_operation("build"))?;
        Ok(Pipeline {
            options,
            loader: self.loader.unwrap_or_else(|| Box::new(HttpLoader::new())),
            form_reader: self.form_reader.unwrap_or_else(|| Box::new(FsFormReader)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputType;
    use resize_scale::{Rgba, Size};

    #[test]
    fn test_defaults() {
        let pipeline = Pipeline::new(PartialOptions::new()).unwrap();
        assert_eq!(pipeline.options(), &Options::default());
    }

    #[test]
    fn test_build_rejects_invalid_options() {
        let err = Pipeline::new(PartialOptions::new().with_quality(2.0)).unwrap_err();
        assert_eq!(err.category(), "config");
        assert_eq!(err.context().operation.as_deref(), Some("build"));
    }

    #[test]
    fn test_update_options_merges() {
        let mut pipeline = Pipeline::new(PartialOptions::new().with_format("png")).unwrap();
        pipeline
            .update_options(&PartialOptions::new().with_width(0).with_height(50))
            .unwrap()
            .update_options(&PartialOptions::new().with_output_type(OutputType::Canvas))
            .unwrap();
        let options = pipeline.options();
        assert_eq!(options.format, "png");
        assert_eq!(options.width, None);
        assert_eq!(options.height, Some(50));
        assert_eq!(options.output_type, OutputType::Canvas);

        let bad = PartialOptions::new().with_background_color("nope");
        assert!(pipeline.update_options(&bad).is_err());
        assert_eq!(pipeline.options().background_color, "#ffffff");
    }

    #[tokio::test]
    async fn test_resize_uses_options_and_overrides() {
        let pipeline = Pipeline::new(PartialOptions::new().with_width(100)).unwrap();
        let source = Surface::new(Size::new(1000, 500), Rgba::BLACK);

        let out = pipeline.resize(&source, None).await.unwrap();
        assert_eq!(out.size(), Size::new(100, 50));

        let overrides = PartialOptions::new().with_width(0).with_height(20);
        let out = pipeline.resize(&source, Some(&overrides)).await.unwrap();
        assert_eq!(out.size(), Size::new(40, 20));

        // Overrides apply to one call only.
        assert_eq!(pipeline.options().width, Some(100));
    }

    #[tokio::test]
    async fn test_resize_without_dimensions_keeps_size() {
        let pipeline = Pipeline::new(PartialOptions::new().with_width(0)).unwrap();
        let source = Surface::new(Size::new(40, 30), Rgba::BLACK);
        let out = pipeline.resize(&source, None).await.unwrap();
        assert_eq!(out.size(), Size::new(40, 30));
    }

    #[tokio::test]
    async fn test_huge_target_is_a_scale_error() {
        let options = PartialOptions::new()
            .with_width(1 << 31)
            .with_resample_level(0);
        let pipeline = Pipeline::new(options).unwrap();
        let source = Surface::new(Size::new(2, 2), Rgba::BLACK);
        let err = pipeline.resize(&source, None).await.unwrap_err();
        assert_eq!(err.category(), "scale");
        assert_eq!(err.context().operation.as_deref(), Some("resize"));
        assert!(err.context().recovery_suggestion.is_some());
    }

    #[tokio::test]
    async fn test_invalid_override_is_rejected() {
        let pipeline = Pipeline::new(PartialOptions::new()).unwrap();
        let source = Surface::new(Size::new(4, 4), Rgba::BLACK);
        let overrides = PartialOptions::new().with_quality(-1.0);
        let err = pipeline
            .output(source, Some(&overrides))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "config");
        assert_eq!(err.context().operation.as_deref(), Some("output"));
    }

    #[tokio::test]
    async fn test_resize_does_not_block_the_executor() {
        let options = PartialOptions::new().with_width(128).with_resample_level(1);
        let pipeline = Pipeline::new(options).unwrap();
        let source = Surface::new(Size::new(512, 512), Rgba::BLACK);

        // On the current-thread runtime the ticker only runs while the
        // resize is parked on the blocking pool.
        let ticks = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = ticks.clone();
        let ticker = tokio::spawn(async move {
            loop {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                tokio::task::yield_now().await;
            }
        });
        let out = pipeline.resize(&source, None).await.unwrap();
        ticker.abort();

        assert_eq!(out.size(), Size::new(128, 128));
        assert!(ticks.load(std::sync::atomic::Ordering::SeqCst) > 0);
    }
}
