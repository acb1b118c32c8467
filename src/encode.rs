//! # Surface Encoding
//!
//! Turns a resized [`Surface`] into one of the three output shapes: a
//! `data:<mime>;base64,<payload>` string, a [`Blob`] of encoded bytes, or the
//! surface itself.
//!
//! Format names are normalized with [`mime_type`]. JPEG is written with the
//! configured quality and without alpha, PNG losslessly. Any other MIME type
//! is written when the `image` crate has an encoder for it; otherwise the
//! encoder falls back to PNG and the result is labelled `image/png`.

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{
    DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage,
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
};
use resize_scale::Surface;
use tracing::{debug, warn};

use crate::config::OutputType;
use crate::error::{ResizeError, ResizeResult};

pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";

/// Map a format name to a MIME type. `jpg`/`jpeg` and `png` are shorthands;
/// anything else is returned verbatim.
pub fn mime_type(format: &str) -> String {
    match format {
        "jpg" | "jpeg" => MIME_JPEG.to_string(),
        "png" => MIME_PNG.to_string(),
        other => other.to_string(),
    }
}

/// Encoded image bytes with their MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Blob {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Result of `output`/`play`.
#[derive(Clone, Debug, PartialEq)]
pub enum Output {
    Base64(String),
    Blob(Blob),
    Canvas(Surface),
}

impl Output {
    pub fn output_type(&self) -> OutputType {
        match self {
            Output::Base64(_) => OutputType::Base64,
            Output::Blob(_) => OutputType::Blob,
            Output::Canvas(_) => OutputType::Canvas,
        }
    }

    pub fn as_base64(&self) -> Option<&str> {
        match self {
            Output::Base64(uri) => Some(uri),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Output::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn as_canvas(&self) -> Option<&Surface> {
        match self {
            Output::Canvas(surface) => Some(surface),
            _ => None,
        }
    }

    pub fn into_canvas(self) -> Option<Surface> {
        match self {
            Output::Canvas(surface) => Some(surface),
            _ => None,
        }
    }
}

/// JPEG quality scale used by the encoder.
fn jpeg_quality(quality: f32) -> u8 {
    if !quality.is_finite() {
        return 75;
    }
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

fn encode_png(surface: &Surface) -> ResizeResult<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            surface.as_raw(),
            surface.width(),
            surface.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| ResizeError::encode_with(MIME_PNG, "png encoder failed", e))?;
    Ok(buf)
}

fn encode_jpeg(surface: &Surface, quality: f32) -> ResizeResult<Vec<u8>> {
    let rgb: Vec<u8> = surface
        .as_raw()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality))
        .encode(&rgb, surface.width(), surface.height(), ExtendedColorType::Rgb8)
        .map_err(|e| ResizeError::encode_with(MIME_JPEG, "jpeg encoder failed", e))?;
    Ok(buf)
}

fn encode_other(surface: &Surface, format: ImageFormat) -> Option<Vec<u8>> {
    let image =
        RgbaImage::from_raw(surface.width(), surface.height(), surface.as_raw().to_vec())?;
    let mut buf = Vec::new();
    match DynamicImage::ImageRgba8(image).write_to(&mut Cursor::new(&mut buf), format) {
        Ok(()) => Some(buf),
        Err(e) => {
            debug!(?format, error = %e, "encoder rejected surface");
            None
        }
    }
}

/// Serialize `surface` as `mime`. Returns the MIME type actually written,
/// which is `image/png` when `mime` has no usable encoder.
pub fn encode_bytes(
    surface: &Surface,
    mime: &str,
    quality: f32,
) -> ResizeResult<(String, Vec<u8>)> {
    if surface.is_empty() {
        return Err(ResizeError::encode(mime, "surface has no pixels")
            .with_recovery_suggestion("Request a non-zero width or height"));
    }
    match mime {
        MIME_JPEG => Ok((MIME_JPEG.to_string(), encode_jpeg(surface, quality)?)),
        MIME_PNG => Ok((MIME_PNG.to_string(), encode_png(surface)?)),
        other => {
            let written =
                ImageFormat::from_mime_type(other).and_then(|format| encode_other(surface, format));
            match written {
                Some(bytes) => Ok((other.to_string(), bytes)),
                None => {
                    warn!(requested = other, "no encoder for format, falling back to png");
                    Ok((MIME_PNG.to_string(), encode_png(surface)?))
                }
            }
        }
    }
}

/// `data:<mime>;base64,<payload>` for `surface`.
pub fn to_data_uri(surface: &Surface, mime: &str, quality: f32) -> ResizeResult<String> {
    let (mime, bytes) = encode_bytes(surface, mime, quality)?;
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

/// Split a data URI into its MIME type and payload. The payload is everything
/// after the first comma.
pub fn split_data_uri(uri: &str) -> ResizeResult<(&str, &str)> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| ResizeError::encode("data-uri", "missing ',' separator"))?;
    let header = header
        .strip_prefix("data:")
        .ok_or_else(|| ResizeError::encode("data-uri", "missing 'data:' prefix"))?;
    let mime = header.split(';').next().unwrap_or_default();
    Ok((mime, payload))
}

/// Whether the data URI header carries the `;base64` marker.
fn is_base64_header(uri: &str) -> bool {
    uri.split_once(',')
        .map(|(header, _)| header)
        .unwrap_or(uri)
        .split(';')
        .skip(1)
        .any(|param| param.trim().eq_ignore_ascii_case("base64"))
}

/// Decode a base64 data URI into a [`Blob`]. URIs without the `;base64`
/// marker are rejected.
pub fn data_uri_to_blob(uri: &str) -> ResizeResult<Blob> {
    let (mime, payload) = split_data_uri(uri)?;
    if !is_base64_header(uri) {
        return Err(ResizeError::encode(mime, "data uri is not base64 encoded")
            .with_recovery_suggestion("Encode the image as data:<mime>;base64,<payload>"));
    }
    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| ResizeError::encode_with(mime, "invalid base64 payload", e))?;
    Ok(Blob {
        mime_type: mime.to_string(),
        data,
    })
}

/// Produce the configured output shape for `surface`.
pub fn encode(
    surface: Surface,
    format: &str,
    quality: f32,
    output_type: OutputType,
) -> ResizeResult<Output> {
    let mime = mime_type(format);
    match output_type {
        OutputType::Canvas => Ok(Output::Canvas(surface)),
        OutputType::Base64 => to_data_uri(&surface, &mime, quality).map(Output::Base64),
        OutputType::Blob => {
            let uri = to_data_uri(&surface, &mime, quality)?;
            data_uri_to_blob(&uri).map(Output::Blob)
        }
    }
}
