//! # Configuration Module
//!
//! Resize options, the partial overlay used for merging, and JSON options file
//! loading.

pub mod options;

pub use options::{Options, OutputType, PartialOptions};
