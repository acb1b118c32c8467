//! # Error Handling
//!
//! Error types for the resize pipeline. Every failure carries an
//! [`ErrorContext`] with the operation that failed, free-form context, an
//! optional recovery suggestion and key/value metadata.
//!
//! ## Taxonomy
//!
//! - `Source`: the source input is missing or unusable (e.g. no file attached)
//! - `Load`: fetching, reading or decoding the source image failed
//! - `Encode`: serializing a surface (or parsing a data URI) failed
//! - `Scale`: the raster backend rejected a draw or allocation
//! - `Config`: an option value is out of range or malformed
//! - `Io`: local I/O outside of source loading (options files, CLI output)
//! - `Task`: a blocking decode, draw or encode task panicked or was cancelled
//!
//! Nothing in the pipeline retries. The first error of a `play` call is the
//! error the caller sees.
//!
//! ## Usage
//!
//! ```rust
//! use progressive_resize::error::{HasRecoverySuggestion, ResizeError};
//!
//! let error = ResizeError::load("https://example.com/a.png", "HTTP 404")
//!     .with_operation("get")
//!     .with_recovery_suggestion("Check that the URL points at an image");
//!
//! assert_eq!(error.category(), "load");
//! assert_eq!(error.recovery_suggestion(), Some("Check that the URL points at an image"));
//! ```

use std::{collections::HashMap, error::Error as StdError, fmt, time::SystemTime};

use resize_scale::ScaleError;

/// Metadata about when and where an error occurred.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The pipeline operation being performed (`get`, `resize`, `output`, ...)
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Additional metadata as key-value pairs
    pub metadata: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            metadata: HashMap::new(),
        }
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Base error type for the resize pipeline.
#[derive(Debug)]
pub enum ResizeError {
    /// Missing or unsupported source input
    Source {
        reason: String,
        context: ErrorContext,
    },
    /// Network/file read or image decode failure
    Load {
        target: String,
        reason: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
        context: ErrorContext,
    },
    /// Surface serialization failure
    Encode {
        format: String,
        reason: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
        context: ErrorContext,
    },
    /// Raster backend failure
    Scale {
        operation: String,
        source: ScaleError,
        context: ErrorContext,
    },
    /// Invalid option value
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// Local I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// Blocking worker task failure
    Task {
        operation: String,
        source: tokio::task::JoinError,
        context: ErrorContext,
    },
}

impl ResizeError {
    /// Create a source error
    pub fn source(reason: impl Into<String>) -> Self {
        Self::Source {
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a load error without an underlying cause
    pub fn load(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            target: target.into(),
            reason: reason.into(),
            source: None,
            context: ErrorContext::new(),
        }
    }

    /// Create a load error wrapping the underlying cause
    pub fn load_with(
        target: impl Into<String>,
        reason: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Load {
            target: target.into(),
            reason: reason.into(),
            source: Some(Box::new(source)),
            context: ErrorContext::new(),
        }
    }

    /// Create an encode error without an underlying cause
    pub fn encode(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encode {
            format: format.into(),
            reason: reason.into(),
            source: None,
            context: ErrorContext::new(),
        }
    }

    /// Create an encode error wrapping the underlying cause
    pub fn encode_with(
        format: impl Into<String>,
        reason: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Encode {
            format: format.into(),
            reason: reason.into(),
            source: Some(Box::new(source)),
            context: ErrorContext::new(),
        }
    }

    /// Create a scaling error
    pub fn scale(operation: impl Into<String>, source: ScaleError) -> Self {
        Self::Scale {
            operation: operation.into(),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create a task error from a failed `spawn_blocking` join
    pub fn task(operation: impl Into<String>, source: tokio::task::JoinError) -> Self {
        Self::Task {
            operation: operation.into(),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Attach a path to an I/O error; other variants record it as metadata
    pub fn with_path(mut self, p: impl Into<String>) -> Self {
        let p = p.into();
        match &mut self {
            Self::Io { path, .. } => *path = Some(p),
            _ => {
                self.context_mut().metadata.insert("path".into(), p);
            }
        }
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Source { context, .. } => context,
            Self::Load { context, .. } => context,
            Self::Encode { context, .. } => context,
            Self::Scale { context, .. } => context,
            Self::Config { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::Task { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Source { context, .. } => context,
            Self::Load { context, .. } => context,
            Self::Encode { context, .. } => context,
            Self::Scale { context, .. } => context,
            Self::Config { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::Task { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Source { .. } => "source",
            Self::Load { .. } => "load",
            Self::Encode { .. } => "encode",
            Self::Scale { .. } => "scale",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
            Self::Task { .. } => "task",
        }
    }
}

impl fmt::Display for ResizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResizeError::Source { reason, .. } => write!(f, "Unsupported source: {}", reason),
            ResizeError::Load { target, reason, source, .. } => {
                if target.is_empty() {
                    write!(f, "Failed to load image: {}", reason)?;
                } else {
                    write!(f, "Failed to load image from '{}': {}", target, reason)?;
                }
                if let Some(source) = source {
                    write!(f, " ({})", source)?;
                }
                Ok(())
            }
            ResizeError::Encode { format, reason, .. } => {
                write!(f, "Failed to encode surface as {}: {}", format, reason)
            }
            ResizeError::Scale { operation, source, .. } => {
                write!(f, "Scaling failed during {}: {}", operation, source)
            }
            ResizeError::Config { field, value, reason, .. } => {
                write!(f, "Configuration error in '{}': {} (value: {})", field, reason, value)
            }
            ResizeError::Io { operation, path, source, .. } => {
                if let Some(path) = path {
                    write!(f, "I/O error during {} on '{}': {}", operation, path, source)
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            ResizeError::Task { operation, source, .. } => {
                write!(f, "Worker task for {} failed: {}", operation, source)
            }
        }
    }
}

impl StdError for ResizeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Load { source: Some(source), .. } => Some(source.as_ref()),
            Self::Encode { source: Some(source), .. } => Some(source.as_ref()),
            Self::Scale { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::Task { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias using our error type
pub type ResizeResult<T> = Result<T, ResizeError>;

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for ResizeError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Errors caused by what the caller passed in rather than by I/O or codecs
    pub fn is_caller_error(error: &ResizeError) -> bool {
        matches!(error, ResizeError::Source { .. } | ResizeError::Config { .. })
    }
}

impl From<std::io::Error> for ResizeError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<ScaleError> for ResizeError {
    fn from(error: ScaleError) -> Self {
        Self::scale("draw", error)
    }
}

impl From<image::ImageError> for ResizeError {
    fn from(error: image::ImageError) -> Self {
        match error {
            image::ImageError::Decoding(_) | image::ImageError::Unsupported(_) => {
                Self::load_with("", "failed to decode image", error)
            }
            other => Self::encode_with("", "image codec failure", other),
        }
    }
}

impl From<serde_json::Error> for ResizeError {
    fn from(error: serde_json::Error) -> Self {
        Self::config("options", "<json>", error.to_string())
    }
}
