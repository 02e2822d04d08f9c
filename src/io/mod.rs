//! File decoding and raster encoding.
//!
//! Decoders are external collaborators behind the [`ImageDecoder`] trait. The
//! built-in [`ImageCrateDecoder`] reads PNG, JPEG and TIFF through the `image`
//! crate. A Bio-Formats bridge can be registered on a [`DecoderRegistry`]; it
//! is consulted for formats no built-in decoder handles, or for every file when
//! the caller forces it.
//!
//! ## Decoded layout
//!
//! | file pixels          | data type | tensor | color space |
//! |----------------------|-----------|--------|-------------|
//! | 8-bit grey (+alpha)  | `UINT8`   | 1 (2)  | none        |
//! | 8-bit RGB (+alpha)   | `UINT8`   | 3 (4)  | `sRGB`      |
//! | 16-bit               | `UINT16`  | 1–4    | as above    |
//! | 32-bit float RGB(A)  | `SFLOAT`  | 3 (4)  | `sRGB`      |

use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb};
use serde::Serialize;

use crate::display::DisplayRaster;
use crate::error::{DipError, Result};
use crate::image::{BufferElement, Image, Tensor};

/// A source of images read from files.
pub trait ImageDecoder {
    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    /// Whether this decoder recognizes the file, by extension.
    fn can_decode(&self, path: &Path) -> bool;

    fn decode(&self, path: &Path) -> Result<Image>;
}

fn decode_error(path: &Path, reason: impl ToString) -> DipError {
    DipError::Decode {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

// ============================================================================
// image crate decoder
// ============================================================================

/// PNG, JPEG and TIFF via the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCrateDecoder;

const EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tif", "tiff"];

/// Wrap interleaved row-major samples as a `[width, height]` image.
fn interleaved<T: BufferElement>(
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<T>,
) -> Result<Image> {
    let tensor = if channels == 1 { Tensor::scalar() } else { Tensor::vector(channels) };
    let mut image = Image::from_vec(&[width as usize, height as usize], tensor, data)?;
    if channels >= 3 {
        image.set_color_space("sRGB");
    }
    Ok(image)
}

/// Convert a decoded `DynamicImage`, keeping its bit depth and channels.
pub fn from_dynamic_image(decoded: DynamicImage) -> Result<Image> {
    let (w, h) = (decoded.width(), decoded.height());
    match decoded {
        DynamicImage::ImageLuma8(buf) => interleaved(w, h, 1, buf.into_raw()),
        DynamicImage::ImageLumaA8(buf) => interleaved(w, h, 2, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => interleaved(w, h, 3, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => interleaved(w, h, 4, buf.into_raw()),
        DynamicImage::ImageLuma16(buf) => interleaved(w, h, 1, buf.into_raw()),
        DynamicImage::ImageLumaA16(buf) => interleaved(w, h, 2, buf.into_raw()),
        DynamicImage::ImageRgb16(buf) => interleaved(w, h, 3, buf.into_raw()),
        DynamicImage::ImageRgba16(buf) => interleaved(w, h, 4, buf.into_raw()),
        DynamicImage::ImageRgb32F(buf) => interleaved(w, h, 3, buf.into_raw()),
        DynamicImage::ImageRgba32F(buf) => interleaved(w, h, 4, buf.into_raw()),
        other => interleaved(w, h, 4, other.to_rgba8().into_raw()),
    }
}

impl ImageDecoder for ImageCrateDecoder {
    fn name(&self) -> &'static str {
        "image"
    }

    fn can_decode(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    fn decode(&self, path: &Path) -> Result<Image> {
        let decoded = image::open(path).map_err(|e| decode_error(path, e))?;
        from_dynamic_image(decoded)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Optional collaborators available at run time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub bioformats: bool,
}

/// Picks a decoder per file.
pub struct DecoderRegistry {
    standard: Vec<Box<dyn ImageDecoder>>,
    bioformats: Option<Box<dyn ImageDecoder>>,
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        DecoderRegistry::new()
    }
}

impl DecoderRegistry {
    /// Registry with the built-in decoders and no Bio-Formats bridge.
    pub fn new() -> Self {
        DecoderRegistry {
            standard: vec![Box::new(ImageCrateDecoder)],
            bioformats: None,
        }
    }

    /// Register the Bio-Formats bridge.
    pub fn with_bioformats(mut self, bridge: Box<dyn ImageDecoder>) -> Self {
        self.bioformats = Some(bridge);
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            bioformats: self.bioformats.is_some(),
        }
    }

    /// Decode `path`.
    ///
    /// # Arguments
    /// * `path` - File to read
    /// * `force_bioformats` - Skip the built-in decoders
    ///
    /// # Returns
    /// The decoded image, or `DipError::Decode` naming the file.
    pub fn decode(&self, path: &Path, force_bioformats: bool) -> Result<Image> {
        let decoder: &dyn ImageDecoder = if force_bioformats {
            self.bioformats
                .as_deref()
                .ok_or_else(|| decode_error(path, "Bio-Formats bridge is not available"))?
        } else {
            match self.standard.iter().find(|d| d.can_decode(path)) {
                Some(d) => d.as_ref(),
                None => self
                    .bioformats
                    .as_deref()
                    .ok_or_else(|| decode_error(path, "no decoder for this file type"))?,
            }
        };
        log::debug!("decoding {} with the {} decoder", path.display(), decoder.name());
        decoder.decode(path)
    }
}

// ============================================================================
// Raster encoding
// ============================================================================

/// Write a display raster as an 8-bit grey or RGB PNG. 1-D rasters become a
/// single row.
pub fn save_raster_png(raster: &DisplayRaster, path: &Path) -> Result<()> {
    let width = raster.width() as u32;
    let height = raster.height() as u32;
    let data: Vec<u8> = raster.pixels().iter().copied().collect();
    let encode_error = |reason: String| DipError::Encode {
        path: path.to_path_buf(),
        reason,
    };
    let image = if raster.is_rgb() {
        ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data).map(DynamicImage::ImageRgb8)
    } else {
        ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data).map(DynamicImage::ImageLuma8)
    };
    let image = image.ok_or_else(|| encode_error("raster does not match its dimensions".into()))?;
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| encode_error(e.to_string()))
}
