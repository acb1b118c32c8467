// SPDX-License-Identifier: MIT
// RGBA8 raster surface with the two primitives the halving scaler needs:
// rectangle fill and scaled region draw (source-over), both clipped to bounds.
// Scaling goes through fast_image_resize; compositing is done here.

use std::str::FromStr;

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{FilterType, ResizeAlg, ResizeOptions, Resizer};

use crate::size::Size;

/// Largest surface, in pixels, this crate will allocate (a 16384 x 16384
/// canvas, 1 GiB of RGBA8).
pub const MAX_SURFACE_PIXELS: usize = 1 << 28;

#[derive(Debug)]
pub enum ScaleError {
    InvalidColor(String),
    BufferSize { expected: usize, actual: usize },
    TooLarge { size: Size, factor: u32 },
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError {
    fn from(e: fir::ResizeError) -> Self {
        Self::Fir(e)
    }
}

impl From<fir::ImageBufferError> for ScaleError {
    fn from(e: fir::ImageBufferError) -> Self {
        Self::ImageBuf(e)
    }
}

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::InvalidColor(s) => write!(f, "Invalid color: '{}'", s),
            ScaleError::BufferSize { expected, actual } => {
                write!(f, "Pixel buffer has {} bytes, expected {}", actual, expected)
            }
            ScaleError::TooLarge { size, factor } => {
                write!(
                    f,
                    "Surface {} scaled by {} exceeds the {} pixel limit",
                    size, factor, MAX_SURFACE_PIXELS
                )
            }
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

/// Straight-alpha RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const WHITE: Rgba = Rgba([255, 255, 255, 255]);
    pub const BLACK: Rgba = Rgba([0, 0, 0, 255]);
    pub const TRANSPARENT: Rgba = Rgba([0, 0, 0, 0]);

    /// Parse a CSS-style color: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`
    /// or one of a handful of keywords.
    pub fn parse(input: &str) -> Result<Self, ScaleError> {
        let normalized = input.trim().to_ascii_lowercase();
        let named = match normalized.as_str() {
            "white" => Some(Self::WHITE),
            "black" => Some(Self::BLACK),
            "transparent" => Some(Self::TRANSPARENT),
            "red" => Some(Rgba([255, 0, 0, 255])),
            "green" => Some(Rgba([0, 128, 0, 255])),
            "blue" => Some(Rgba([0, 0, 255, 255])),
            "gray" | "grey" => Some(Rgba([128, 128, 128, 255])),
            _ => None,
        };
        if let Some(color) = named {
            return Ok(color);
        }

        let invalid = || ScaleError::InvalidColor(input.to_string());
        let hex = normalized.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
        let rgba = match hex.len() {
            3 => [nibble(0), nibble(1), nibble(2), Ok(255)],
            4 => [nibble(0), nibble(1), nibble(2), nibble(3)],
            6 => [byte(0), byte(2), byte(4), Ok(255)],
            8 => [byte(0), byte(2), byte(4), byte(6)],
            _ => return Err(invalid()),
        };
        let mut out = [0u8; 4];
        for (slot, v) in out.iter_mut().zip(rgba) {
            *slot = v.map_err(|_| invalid())?;
        }
        Ok(Rgba(out))
    }
}

impl FromStr for Rgba {
    type Err = ScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rgba::parse(s)
    }
}

/// Rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle at the origin covering `size`.
    pub const fn of_size(size: Size) -> Self {
        Self {
            x: 0,
            y: 0,
            w: size.w,
            h: size.h,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }

    /// Intersection with a `bounds`-sized area at the origin.
    pub fn clip_to(&self, bounds: Size) -> Rect {
        let x = self.x.min(bounds.w);
        let y = self.y.min(bounds.h);
        let right = self.x.saturating_add(self.w).min(bounds.w);
        let bottom = self.y.saturating_add(self.h).min(bounds.h);
        Rect::new(x, y, right - x, bottom - y)
    }
}

/// In-memory RGBA8 raster (straight alpha, tightly packed rows).
#[derive(Clone, PartialEq, Eq)]
pub struct Surface {
    size: Size,
    buf: Vec<u8>,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface").field("size", &self.size).finish_non_exhaustive()
    }
}

impl Surface {
    /// Blank surface of `size`, filled with `background`.
    ///
    /// # Panics
    ///
    /// Panics if `size` is larger than [`MAX_SURFACE_PIXELS`]. Use
    /// [`Surface::try_new`] for sizes that come from user input.
    pub fn new(size: Size, background: Rgba) -> Self {
        match Self::try_new(size, background) {
            Ok(surface) => surface,
            Err(e) => panic!("{}", e),
        }
    }

    /// Blank surface of `size`, filled with `background`, or
    /// [`ScaleError::TooLarge`] if the buffer cannot be allocated.
    pub fn try_new(size: Size, background: Rgba) -> Result<Self, ScaleError> {
        let mut buf = alloc_rgba(size)?;
        fill_rgba(&mut buf, background.0);
        Ok(Self { size, buf })
    }

    /// Wrap an existing tightly packed RGBA8 buffer.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ScaleError> {
        let size = Size::new(width, height);
        if data.len() != size.rgba_len() {
            return Err(ScaleError::BufferSize {
                expected: size.rgba_len(),
                actual: data.len(),
            });
        }
        Ok(Self { size, buf: data })
    }

    pub fn width(&self) -> u32 {
        self.size.w
    }

    pub fn height(&self) -> u32 {
        self.size.h
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.buf
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.size.w || y >= self.size.h {
            return None;
        }
        let i = self.offset(x, y);
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.buf[i..i + 4]);
        Some(Rgba(px))
    }

    /// Overwrite the whole surface with `color`.
    pub fn clear(&mut self, color: Rgba) {
        fill_rgba(&mut self.buf, color.0);
    }

    /// Overwrite `rect` (clipped to bounds) with `color`.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        let rect = rect.clip_to(self.size);
        if rect.is_empty() {
            return;
        }
        let row_bytes = rect.w as usize * 4;
        for y in rect.y..rect.y + rect.h {
            let start = self.offset(rect.x, y);
            fill_rgba(&mut self.buf[start..start + row_bytes], color.0);
        }
    }

    /// Copy of this surface composited over a `background`-filled canvas of
    /// the same size.
    pub fn flattened(&self, background: Rgba) -> Surface {
        let mut buf = self.buf.clone();
        for px in buf.chunks_exact_mut(4) {
            let src = [px[0], px[1], px[2], px[3]];
            px.copy_from_slice(&background.0);
            blend_over(px, &src);
        }
        Surface {
            size: self.size,
            buf,
        }
    }

    /// Draw `src_rect` of `src` scaled into `dst_rect` of this surface.
    ///
    /// The source rectangle is clipped to the source bounds, the scaled result
    /// is composited source-over and clipped to this surface. Empty rectangles
    /// or surfaces make this a no-op.
    pub fn draw_region(
        &mut self,
        resizer: &mut Resizer,
        src: &Surface,
        src_rect: Rect,
        dst_rect: Rect,
    ) -> Result<(), ScaleError> {
        let src_rect = src_rect.clip_to(src.size);
        if src_rect.is_empty() || dst_rect.is_empty() || self.is_empty() {
            return Ok(());
        }

        let mut scaled = alloc_rgba(dst_rect.size())?;
        {
            let src_view = TypedImageRef::<U8x4>::from_buffer(src.size.w, src.size.h, &src.buf)?;
            let mut dst_view =
                TypedImage::<U8x4>::from_buffer(dst_rect.w, dst_rect.h, &mut scaled)?;
            let opts = ResizeOptions::new()
                .resize_alg(ResizeAlg::Convolution(FilterType::Bilinear))
                .crop(
                    f64::from(src_rect.x),
                    f64::from(src_rect.y),
                    f64::from(src_rect.w),
                    f64::from(src_rect.h),
                )
                .use_alpha(true);
            resizer.resize_typed::<U8x4>(&src_view, &mut dst_view, &opts)?;
        }

        let visible = dst_rect.clip_to(self.size);
        if visible.is_empty() {
            return Ok(());
        }
        let scaled_row = dst_rect.w as usize * 4;
        for y in visible.y..visible.y + visible.h {
            let src_row = (y - dst_rect.y) as usize * scaled_row;
            for x in visible.x..visible.x + visible.w {
                let s = src_row + (x - dst_rect.x) as usize * 4;
                let d = self.offset(x, y);
                blend_over(&mut self.buf[d..d + 4], &scaled[s..s + 4]);
            }
        }
        Ok(())
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.size.w as usize + x as usize) * 4
    }
}

/// Zeroed RGBA8 buffer for `size`, refusing sizes over
/// [`MAX_SURFACE_PIXELS`] and allocations the system cannot satisfy.
fn alloc_rgba(size: Size) -> Result<Vec<u8>, ScaleError> {
    let too_large = || ScaleError::TooLarge { size, factor: 1 };
    let len = size
        .checked_area()
        .filter(|&area| area <= MAX_SURFACE_PIXELS)
        .and_then(|area| area.checked_mul(4))
        .ok_or_else(too_large)?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| too_large())?;
    buf.resize(len, 0);
    Ok(buf)
}

#[inline]
fn fill_rgba(dst: &mut [u8], color: [u8; 4]) {
    for px in dst.chunks_exact_mut(4) {
        px.copy_from_slice(&color);
    }
}

/// Source-over compositing of one straight-alpha pixel.
#[inline]
fn blend_over(dst: &mut [u8], src: &[u8]) {
    let sa = u32::from(src[3]);
    if sa == 255 {
        dst.copy_from_slice(src);
        return;
    }
    if sa == 0 {
        return;
    }
    let da = u32::from(dst[3]);
    // alpha terms scaled by 255
    let src_w = sa * 255;
    let dst_w = da * (255 - sa);
    let out_a = src_w + dst_w;
    if out_a == 0 {
        dst.copy_from_slice(&[0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let v = u32::from(src[c]) * src_w + u32::from(dst[c]) * dst_w;
        dst[c] = ((v + out_a / 2) / out_a) as u8;
    }
    dst[3] = ((out_a + 127) / 255) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(size: Size) -> Surface {
        let mut s = Surface::new(size, Rgba::BLACK);
        for y in 0..size.h {
            for x in 0..size.w {
                if (x + y) % 2 == 0 {
                    s.fill_rect(Rect::new(x, y, 1, 1), Rgba::WHITE);
                }
            }
        }
        s
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(Rgba::parse("#ffffff").unwrap(), Rgba::WHITE);
        assert_eq!(Rgba::parse("#FFF").unwrap(), Rgba::WHITE);
        assert_eq!(Rgba::parse("#102030").unwrap(), Rgba([0x10, 0x20, 0x30, 255]));
        assert_eq!(Rgba::parse("#10203040").unwrap(), Rgba([0x10, 0x20, 0x30, 0x40]));
        assert_eq!(Rgba::parse("#0f08").unwrap(), Rgba([0, 255, 0, 0x88]));
        assert_eq!(" Transparent ".parse::<Rgba>().unwrap(), Rgba::TRANSPARENT);
    }

    #[test]
    fn rejects_bad_colors() {
        for bad in ["", "ffffff", "#ff", "#fffff", "#gggggg", "chartreuse", "#ééé"] {
            assert!(Rgba::parse(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn new_surface_is_filled() {
        let s = Surface::new(Size::new(3, 2), Rgba([1, 2, 3, 4]));
        assert_eq!(s.as_raw().len(), 24);
        assert!(s.as_raw().chunks_exact(4).all(|px| px == [1, 2, 3, 4]));
    }

    #[test]
    fn from_rgba8_checks_length() {
        assert!(Surface::from_rgba8(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            Surface::from_rgba8(2, 2, vec![0; 15]),
            Err(ScaleError::BufferSize { expected: 16, actual: 15 })
        ));
    }

    #[test]
    fn fill_rect_is_clipped() {
        let mut s = Surface::new(Size::new(4, 4), Rgba::WHITE);
        s.fill_rect(Rect::new(2, 2, 10, 10), Rgba::BLACK);
        assert_eq!(s.pixel(1, 1), Some(Rgba::WHITE));
        assert_eq!(s.pixel(3, 3), Some(Rgba::BLACK));
        assert_eq!(s.pixel(4, 4), None);
    }

    #[test]
    fn draw_same_size_copies_opaque_pixels() {
        let mut resizer = Resizer::new();
        let src = checker(Size::new(8, 8));
        let mut dst = Surface::new(Size::new(8, 8), Rgba::WHITE);
        dst.draw_region(&mut resizer, &src, Rect::of_size(src.size()), Rect::of_size(dst.size()))
            .unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn draw_into_sub_region_leaves_background() {
        let mut resizer = Resizer::new();
        let src = Surface::new(Size::new(16, 16), Rgba::BLACK);
        let mut dst = Surface::new(Size::new(8, 8), Rgba::WHITE);
        dst.draw_region(&mut resizer, &src, Rect::of_size(src.size()), Rect::new(0, 0, 4, 4))
            .unwrap();
        assert_eq!(dst.pixel(0, 0), Some(Rgba::BLACK));
        assert_eq!(dst.pixel(3, 3), Some(Rgba::BLACK));
        assert_eq!(dst.pixel(4, 4), Some(Rgba::WHITE));
        assert_eq!(dst.pixel(7, 0), Some(Rgba::WHITE));
    }

    #[test]
    fn downscaled_checker_averages_to_gray() {
        let mut resizer = Resizer::new();
        let src = checker(Size::new(64, 64));
        let mut dst = Surface::new(Size::new(8, 8), Rgba::WHITE);
        dst.draw_region(&mut resizer, &src, Rect::of_size(src.size()), Rect::of_size(dst.size()))
            .unwrap();
        let px = dst.pixel(4, 4).unwrap();
        assert!((100..=155).contains(&px.0[0]), "expected mid gray, got {:?}", px);
    }

    #[test]
    fn transparent_source_keeps_background() {
        let mut resizer = Resizer::new();
        let src = Surface::new(Size::new(4, 4), Rgba::TRANSPARENT);
        let mut dst = Surface::new(Size::new(4, 4), Rgba([10, 20, 30, 255]));
        dst.draw_region(&mut resizer, &src, Rect::of_size(src.size()), Rect::of_size(dst.size()))
            .unwrap();
        assert!(dst.as_raw().chunks_exact(4).all(|px| px == [10, 20, 30, 255]));
    }

    #[test]
    fn half_transparent_source_blends() {
        let mut dst = [0u8, 0, 0, 255];
        blend_over(&mut dst, &[255, 255, 255, 128]);
        assert_eq!(dst[3], 255);
        assert!((127..=129).contains(&dst[0]), "got {:?}", dst);
    }

    #[test]
    fn try_new_rejects_oversized_surfaces() {
        assert!(matches!(
            Surface::try_new(Size::new(1 << 31, 1 << 31), Rgba::WHITE),
            Err(ScaleError::TooLarge { factor: 1, .. })
        ));
        assert!(matches!(
            Surface::try_new(Size::new(u32::MAX, u32::MAX), Rgba::WHITE),
            Err(ScaleError::TooLarge { .. })
        ));
        let s = Surface::try_new(Size::new(2, 2), Rgba::BLACK).unwrap();
        assert_eq!(s.as_raw().len(), 16);
    }

    #[test]
    fn oversized_destination_rect_is_an_error() {
        let mut resizer = Resizer::new();
        let src = Surface::new(Size::new(2, 2), Rgba::BLACK);
        let mut dst = Surface::new(Size::new(2, 2), Rgba::WHITE);
        let huge = Rect::new(0, 0, 1 << 30, 1 << 30);
        assert!(matches!(
            dst.draw_region(&mut resizer, &src, Rect::of_size(src.size()), huge),
            Err(ScaleError::TooLarge { .. })
        ));
    }

    #[test]
    fn flattened_fills_transparent_pixels() {
        let mut data = vec![0u8; 2 * 4];
        data[4..].copy_from_slice(&[9, 8, 7, 255]);
        let src = Surface::from_rgba8(2, 1, data).unwrap();
        let flat = src.flattened(Rgba::WHITE);
        assert_eq!(flat.pixel(0, 0), Some(Rgba::WHITE));
        assert_eq!(flat.pixel(1, 0), Some(Rgba([9, 8, 7, 255])));
        assert_eq!(src.pixel(0, 0), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn empty_regions_are_no_ops() {
        let mut resizer = Resizer::new();
        let src = Surface::new(Size::new(4, 4), Rgba::BLACK);
        let mut dst = Surface::new(Size::new(4, 4), Rgba::WHITE);
        dst.draw_region(&mut resizer, &src, Rect::new(0, 0, 0, 4), Rect::of_size(dst.size()))
            .unwrap();
        dst.draw_region(&mut resizer, &src, Rect::of_size(src.size()), Rect::new(1, 1, 0, 0))
            .unwrap();
        let mut empty = Surface::new(Size::new(0, 0), Rgba::WHITE);
        empty
            .draw_region(&mut resizer, &src, Rect::of_size(src.size()), Rect::new(0, 0, 2, 2))
            .unwrap();
        assert!(dst.as_raw().chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
    }

    #[test]
    fn rect_clip() {
        let r = Rect::new(5, 5, 10, 10).clip_to(Size::new(8, 12));
        assert_eq!(r, Rect::new(5, 5, 3, 7));
        assert!(Rect::new(20, 0, 4, 4).clip_to(Size::new(8, 8)).is_empty());
    }
}
