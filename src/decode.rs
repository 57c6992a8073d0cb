//! Decodes attachment payloads into display-ready RGBA bitmaps.

use std::io::Cursor;

use fast_image_resize as fir;
use image::{ImageReader, RgbaImage, imageops};
use tracing::{debug, warn};

use crate::error::Result;

/// An RGBA8 bitmap at its natural (post-orientation) size.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pixels: RgbaImage,
}

impl DecodedImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl ImageDecoder {
    /// Decodes `bytes`, applying the EXIF orientation when one is embedded.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
        let img = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)?
            .decode()?;
        let orientation = read_orientation(bytes);
        Ok(DecodedImage::new(apply_orientation(img.to_rgba8(), orientation)))
    }

    /// Scales `image` down (never up) so it fits inside the bounds.
    pub fn fit(&self, image: DecodedImage, bounds_w: u32, bounds_h: u32) -> DecodedImage {
        let (width, height) = image.dimensions();
        let Some((target_w, target_h)) = fit_dimensions(width, height, bounds_w, bounds_h) else {
            return image;
        };
        debug!(width, height, target_w, target_h, "scaling image to display bounds");
        DecodedImage::new(resize_rgba(image.pixels(), target_w, target_h))
    }
}

/// Target size for a downscale into `bounds_w` x `bounds_h`, or `None` when
/// the image already fits. Aspect ratio is preserved and results are floored.
pub fn fit_dimensions(width: u32, height: u32, bounds_w: u32, bounds_h: u32) -> Option<(u32, u32)> {
    if width <= bounds_w && height <= bounds_h {
        return None;
    }
    // ratio = min(bw / w, bh / h), compared and applied in integers to floor exactly
    let (w, h) = (u64::from(width), u64::from(height));
    let (bw, bh) = (u64::from(bounds_w), u64::from(bounds_h));
    let (fit_w, fit_h) = if bw * h <= bh * w {
        (bw, h * bw / w)
    } else {
        (w * bh / h, bh)
    };
    Some((fit_w.max(1) as u32, fit_h.max(1) as u32))
}

/// Rotates according to the EXIF orientation tag. Only the pure rotations
/// (3, 6, 8) are corrected; anything else is left as decoded.
pub fn apply_orientation(img: RgbaImage, orientation: Option<u32>) -> RgbaImage {
    match orientation {
        None | Some(1) => img,
        Some(3) => imageops::rotate180(&img),
        // rotate 90 CW
        Some(6) => imageops::rotate90(&img),
        // rotate 270 CW
        Some(8) => imageops::rotate270(&img),
        Some(other) => {
            warn!(orientation = other, "unexpected EXIF orientation; leaving image unrotated");
            img
        }
    }
}

pub fn read_orientation(bytes: &[u8]) -> Option<u32> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let orientation = field.value.get_uint(0)?;
    debug!(orientation, "exif orientation");
    Some(orientation)
}

fn resize_rgba(source: &RgbaImage, target_w: u32, target_h: u32) -> RgbaImage {
    match resize_with_fir(source, target_w, target_h) {
        Ok(resized) => resized,
        Err(err) => {
            debug!("fast resize failed: {err:#}; falling back to imageops");
            imageops::resize(source, target_w, target_h, imageops::FilterType::Lanczos3)
        }
    }
}

fn resize_with_fir(source: &RgbaImage, target_w: u32, target_h: u32) -> anyhow::Result<RgbaImage> {
    use anyhow::Context;

    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .context("failed to create source view for resize")?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options =
        fir::ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3));
    fir::Resizer::new()
        .resize(&src_view, &mut dst_image, Some(&options))
        .context("resize failed")?;
    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| anyhow::anyhow!("failed to construct resized RGBA image"))
}
