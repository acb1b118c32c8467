use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use futures_util::future::join_all;
use progressive_resize::{
    HasRecoverySuggestion, Output, OutputType, PartialOptions, Pipeline, Source,
};

/// Resize images with progressive halving and print or save the result.
#[derive(Parser, Debug)]
#[command(name = "resize-image")]
#[command(about = "Resize images from URLs, data URIs or files")]
#[command(long_about = "Resize images from http(s) URLs, data: URIs or local files.
The image is drawn once at an oversampled size and then halved step by step,
which keeps large reductions smooth. Results are printed as data URIs, written
as encoded files, or reported as raw surface dimensions.")]
struct Args {
    /// Image sources: http(s) URLs, data: URIs or file paths
    #[arg(required = true, help = "One or more http(s) URLs, data: URIs or file paths")]
    sources: Vec<String>,

    /// Target width (0 clears it)
    #[arg(short, long, help = "Target width in pixels; 0 lets the height drive")]
    width: Option<u32>,

    /// Target height (0 clears it)
    #[arg(short = 'H', long, help = "Target height in pixels")]
    height: Option<u32>,

    /// Encoder quality
    #[arg(short, long, help = "Lossy encoder quality between 0 and 1")]
    quality: Option<f32>,

    /// Output format
    #[arg(short, long, help = "Output format: jpg, jpeg, png or a MIME type")]
    format: Option<String>,

    /// Output shape
    #[arg(
        short = 't',
        long,
        value_enum,
        help = "base64 (data URI), blob (encoded bytes) or canvas"
    )]
    output_type: Option<OutputType>,

    /// Halving passes
    #[arg(short = 'r', long, allow_negative_numbers = true,
          help = "Number of halving passes, clamped to 0..=4 (higher = smoother, slower)")]
    resample_level: Option<i32>,

    /// Background color
    #[arg(short = 'b', long = "background", help = "Fill for transparent pixels, e.g. #ffffff")]
    background_color: Option<String>,

    /// JSON options file
    #[arg(short, long, help = "JSON options file (camelCase keys); flags override it")]
    config: Option<PathBuf>,

    /// Output path
    #[arg(short, long, help = "Write the result here instead of stdout (required for blob)")]
    out: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, help = "Enable debug logging for every halving pass")]
    verbose: bool,
}

impl Args {
    /// Options given as flags.
    fn flag_options(&self) -> PartialOptions {
        PartialOptions {
            quality: self.quality,
            format: self.format.clone(),
            output_type: self.output_type,
            width: self.width,
            height: self.height,
            resample_level: self.resample_level,
            background_color: self.background_color.clone(),
            preserve_metadata: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if args.verbose {
            "progressive_resize=debug,resize_scale=debug".to_string()
        } else {
            "progressive_resize=warn,resize_scale=warn".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut options = match &args.config {
        Some(path) => PartialOptions::from_json_file(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => PartialOptions::new(),
    };
    options.merge_from(&args.flag_options());

    let pipeline = Pipeline::new(options).context("Invalid options")?;
    if pipeline.options().output_type == OutputType::Blob && args.out.is_none() {
        bail!("--out is required for blob output");
    }

    let sources: Vec<Source> = args.sources.iter().map(|s| Source::parse(s)).collect();
    let results = join_all(sources.iter().map(|source| pipeline.play(source))).await;

    let total = results.len();
    let mut failed = 0;
    for (index, (source, result)) in sources.iter().zip(results).enumerate() {
        match result {
            Ok(output) => {
                let out = args.out.as_deref().map(|base| output_path(base, index, total));
                write_output(output, out.as_deref())?;
            }
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", source, e);
                if let Some(suggestion) = e.recovery_suggestion() {
                    eprintln!("  hint: {}", suggestion);
                }
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} images failed", failed, total);
    }
    Ok(())
}

/// `base` for a single source, `base` with `-<index>` before the extension
/// otherwise.
fn output_path(base: &Path, index: usize, total: usize) -> PathBuf {
    if total <= 1 {
        return base.to_path_buf();
    }
    let stem = base.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}-{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}-{}", stem, index),
    };
    base.with_file_name(name)
}

fn write_output(output: Output, out: Option<&Path>) -> Result<()> {
    match output {
        Output::Base64(uri) => match out {
            Some(path) => std::fs::write(path, uri)
                .with_context(|| format!("Failed to write {}", path.display()))?,
            None => println!("{}", uri),
        },
        Output::Blob(blob) => {
            let Some(path) = out else {
                bail!("--out is required for blob output");
            };
            std::fs::write(path, &blob.data)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} ({}, {} bytes)", path.display(), blob.mime_type, blob.len());
        }
        Output::Canvas(surface) => println!("{}x{}", surface.width(), surface.height()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        let base = Path::new("out/thumb.jpg");
        assert_eq!(output_path(base, 0, 1), PathBuf::from("out/thumb.jpg"));
        assert_eq!(output_path(base, 2, 3), PathBuf::from("out/thumb-2.jpg"));
        assert_eq!(output_path(Path::new("thumb"), 1, 2), PathBuf::from("thumb-1"));
    }

    #[test]
    fn test_flags_override_nothing_when_absent() {
        let args = Args::parse_from(["resize-image", "a.png"]);
        assert!(args.flag_options().is_empty());

        let args = Args::parse_from([
            "resize-image", "a.png", "-w", "0", "-H", "80", "-t", "canvas", "-r", "-1",
        ]);
        let options = args.flag_options();
        assert_eq!(options.width, Some(0));
        assert_eq!(options.height, Some(80));
        assert_eq!(options.output_type, Some(OutputType::Canvas));
        assert_eq!(options.resample_level, Some(-1));
    }
}
