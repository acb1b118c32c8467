//! # Resize Options
//!
//! Instance configuration for a [`Pipeline`](crate::pipeline::Pipeline) and the
//! partial overlay used by constructors, per-call overrides and
//! `update_options`.
//!
//! ## Options
//!
//! | Key (JSON) | Type | Default | Description |
//! |------------|------|---------|-------------|
//! | `quality` | `f32` | `0.75` | Lossy encoder quality in `[0, 1]` |
//! | `format` | `String` | `"jpg"` | Output format name or MIME type |
//! | `outputType` | `base64` / `canvas` / `blob` | `base64` | Shape of the result |
//! | `width` | `u32` | `320` | Driving target width |
//! | `height` | `u32` | none | Driving target height |
//! | `resampleLevel` | `i32` | `2` | Halving passes, clamped to `0..=4` |
//! | `backgroundColor` | `String` | `"#ffffff"` | Fill for transparent pixels |
//! | `preserveMetadata` | `bool` | `false` | Accepted and carried, no effect |
//!
//! ## Merging
//!
//! Overlays are presence-based: a `Some` field replaces the base value, `None`
//! keeps it. For `width` and `height` an explicit `0` clears the dimension,
//! which lets a caller switch the driving dimension from width to height.
//!
//! ```rust
//! use progressive_resize::config::{Options, PartialOptions};
//!
//! let options = Options::default().merged(&PartialOptions::new().with_width(0).with_height(90));
//! assert_eq!(options.width, None);
//! assert_eq!(options.height, Some(90));
//! ```

use std::{fmt, path::Path, str::FromStr};

use resize_scale::Rgba;
use serde::{Deserialize, Serialize};

use crate::error::{ResizeError, ResizeResult};

/// Shape of the value returned by `output` and `play`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// `data:<mime>;base64,<payload>` string
    #[default]
    Base64,
    /// The resized surface itself
    Canvas,
    /// Encoded bytes plus their MIME type
    Blob,
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::Base64 => "base64",
            OutputType::Canvas => "canvas",
            OutputType::Blob => "blob",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputType {
    type Err = ResizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base64" => Ok(OutputType::Base64),
            "canvas" => Ok(OutputType::Canvas),
            "blob" => Ok(OutputType::Blob),
            _ => Err(ResizeError::config("outputType", s, "expected one of base64, canvas, blob")
                .with_recovery_suggestion("Use base64, canvas or blob")),
        }
    }
}

/// Fully resolved configuration of one pipeline instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Encoder quality for lossy formats, `0.0..=1.0`.
    pub quality: f32,

    /// Output format. `jpg`/`jpeg` and `png` are shorthands, anything else is
    /// taken as a MIME type.
    pub format: String,

    pub output_type: OutputType,

    /// Target width. When both dimensions are set the larger one drives the
    /// resize and the other is derived from the aspect ratio.
    pub width: Option<u32>,

    pub height: Option<u32>,

    /// Number of halving passes after the oversampled draw.
    pub resample_level: i32,

    /// CSS-style color (`#rgb`, `#rrggbb`, `#rrggbbaa` or a basic name).
    pub background_color: String,

    pub preserve_metadata: bool,
}

impl Default for Options {
    /// The immutable template every pipeline starts from.
    fn default() -> Self {
        Self {
            quality: 0.75,
            format: "jpg".to_string(),
            output_type: OutputType::Base64,
            width: Some(320),
            height: None,
            resample_level: 2,
            background_color: "#ffffff".to_string(),
            preserve_metadata: false,
        }
    }
}

impl Options {
    /// Copy of `self` with `overlay` applied.
    pub fn merged(&self, overlay: &PartialOptions) -> Options {
        let mut out = self.clone();
        out.apply(overlay);
        out
    }

    /// Apply `overlay` in place.
    pub fn apply(&mut self, overlay: &PartialOptions) {
        if let Some(quality) = overlay.quality {
            self.quality = quality;
        }
        if let Some(format) = &overlay.format {
            self.format = format.clone();
        }
        if let Some(output_type) = overlay.output_type {
            self.output_type = output_type;
        }
        if let Some(width) = overlay.width {
            self.width = (width > 0).then_some(width);
        }
        if let Some(height) = overlay.height {
            self.height = (height > 0).then_some(height);
        }
        if let Some(level) = overlay.resample_level {
            self.resample_level = level;
        }
        if let Some(color) = &overlay.background_color {
            self.background_color = color.clone();
        }
        if let Some(preserve) = overlay.preserve_metadata {
            self.preserve_metadata = preserve;
        }
    }

    /// Check value ranges. The resample level is not checked; it is clamped
    /// when the resize runs.
    pub fn validate(&self) -> ResizeResult<()> {
        if !self.quality.is_finite() || !(0.0..=1.0).contains(&self.quality) {
            return Err(ResizeError::config(
                "quality",
                self.quality.to_string(),
                "must be between 0 and 1",
            ));
        }
        if self.format.trim().is_empty() {
            return Err(ResizeError::config("format", "", "must not be empty")
                .with_recovery_suggestion("Use jpg, png or a MIME type such as image/webp"));
        }
        self.background()?;
        Ok(())
    }

    /// Parsed background color.
    pub fn background(&self) -> ResizeResult<Rgba> {
        Rgba::parse(&self.background_color).map_err(|e| {
            ResizeError::config("backgroundColor", &self.background_color, e.to_string())
                .with_recovery_suggestion("Use a hex color such as #ffffff")
        })
    }
}

/// Options where every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_type: Option<OutputType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resample_level: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_metadata: Option<bool>,
}

impl PartialOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = Some(output_type);
        self
    }

    /// `0` clears the width when merged.
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// `0` clears the height when merged.
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_resample_level(mut self, level: i32) -> Self {
        self.resample_level = Some(level);
        self
    }

    pub fn with_background_color(mut self, color: impl Into<String>) -> Self {
        self.background_color = Some(color.into());
        self
    }

    pub fn with_preserve_metadata(mut self, preserve: bool) -> Self {
        self.preserve_metadata = Some(preserve);
        self
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn merge_from(&mut self, other: &PartialOptions) {
        fn pick<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        pick(&mut self.quality, &other.quality);
        pick(&mut self.format, &other.format);
        pick(&mut self.output_type, &other.output_type);
        pick(&mut self.width, &other.width);
        pick(&mut self.height, &other.height);
        pick(&mut self.resample_level, &other.resample_level);
        pick(&mut self.background_color, &other.background_color);
        pick(&mut self.preserve_metadata, &other.preserve_metadata);
    }

    /// Parse a camelCase JSON object. Unknown keys are ignored.
    pub fn from_json_str(json: &str) -> ResizeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse an options file.
    pub fn from_json_file(path: impl AsRef<Path>) -> ResizeResult<Self> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ResizeError::io("read options file", e).with_path(shown.clone()))?;
        Self::from_json_str(&text).map_err(|e| e.with_metadata("path", shown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = Options::default();
        assert_eq!(options.quality, 0.75);
        assert_eq!(options.format, "jpg");
        assert_eq!(options.output_type, OutputType::Base64);
        assert_eq!(options.width, Some(320));
        assert_eq!(options.height, None);
        assert_eq!(options.resample_level, 2);
        assert_eq!(options.background_color, "#ffffff");
        assert!(!options.preserve_metadata);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_merge_is_presence_based() {
        let base = Options::default();
        let merged = base.merged(&PartialOptions::new().with_quality(0.0).with_format("png"));
        assert_eq!(merged.quality, 0.0);
        assert_eq!(merged.format, "png");
        assert_eq!(merged.width, Some(320));

        // The base is a template, merging never touches it.
        assert_eq!(base, Options::default());

        let merged = base.merged(&PartialOptions::new());
        assert_eq!(merged, base);
    }

    #[test]
    fn test_zero_dimension_clears() {
        let partial = PartialOptions::new().with_width(0).with_height(240);
        let merged = Options::default().merged(&partial);
        assert_eq!(merged.width, None);
        assert_eq!(merged.height, Some(240));
    }

    #[test]
    fn test_validation() {
        let mut options = Options::default();

        options.quality = 1.5;
        assert!(options.validate().is_err());
        options.quality = f32::NAN;
        assert!(options.validate().is_err());
        options.quality = 1.0;
        assert!(options.validate().is_ok());

        options.format = "  ".into();
        assert_eq!(options.validate().unwrap_err().category(), "config");
        options.format = "image/webp".into();

        options.background_color = "not-a-color".into();
        assert!(options.validate().is_err());
        options.background_color = "#000".into();
        assert_eq!(options.background().unwrap(), Rgba::BLACK);

        // Out of range levels are clamped later, not rejected.
        options.resample_level = 99;
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip_keys() {
        let json = r##"{
            "outputType": "blob",
            "resampleLevel": 3,
            "backgroundColor": "#000000",
            "width": 64,
            "extra": true
        }"##;
        let partial = PartialOptions::from_json_str(json).unwrap();
        assert_eq!(partial.output_type, Some(OutputType::Blob));
        assert_eq!(partial.background_color.as_deref(), Some("#000000"));
        assert_eq!(partial.resample_level, Some(3));
        assert_eq!(partial.width, Some(64));
        assert_eq!(partial.quality, None);

        let json = serde_json::to_value(Options::default()).unwrap();
        assert_eq!(json["outputType"], "base64");
        assert_eq!(json["preserveMetadata"], false);
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(PartialOptions::from_json_str(r#"{"outputType":"png"}"#).is_err());
        assert!(PartialOptions::from_json_str(r#"{"width":-5}"#).is_err());
        assert!(PartialOptions::from_json_str(r#"{"quality":"high"}"#).is_err());
    }

    #[test]
    fn test_partial_layering() {
        let mut file = PartialOptions::new().with_width(100).with_format("png");
        file.merge_from(&PartialOptions::new().with_width(50));
        assert_eq!(file.width, Some(50));
        assert_eq!(file.format.as_deref(), Some("png"));
        assert!(!file.is_empty());
        assert!(PartialOptions::new().is_empty());
    }

    #[test]
    fn test_output_type_parse() {
        assert_eq!("BLOB".parse::<OutputType>().unwrap(), OutputType::Blob);
        assert_eq!(OutputType::Canvas.to_string(), "canvas");
        assert!("jpeg".parse::<OutputType>().is_err());
    }
}
