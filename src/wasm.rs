//! WebAssembly exports for the display mapper.
//!
//! These functions are exposed to JavaScript via wasm-bindgen. Images cross
//! the boundary as flat, interleaved, row-major arrays (`height * width *
//! channels` values) and come back as RGB bytes ready for an `ImageData`
//! (after adding alpha).
//!
//! Errors are returned as string `JsValue`s.

use wasm_bindgen::prelude::*;

use crate::display::{image_display, ColorMap, DisplayParams, DisplayRaster};
use crate::error::Result;
use crate::image::{BufferElement, Image, Tensor};

fn to_js(err: crate::error::DipError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Wrap a flat interleaved array as a `[width, height]` image.
fn planar_image<T: BufferElement>(data: &[T], width: usize, height: usize, channels: usize) -> Result<Image> {
    let tensor = if channels == 1 { Tensor::scalar() } else { Tensor::vector(channels) };
    let mut image = Image::from_vec(&[width, height], tensor, data.to_vec())?;
    if channels == 3 {
        image.set_color_space("sRGB");
    }
    Ok(image)
}

fn render(image: &Image, range: &str, color_map: &str) -> Result<Vec<u8>> {
    let params = DisplayParams {
        range: range.parse()?,
        ..Default::default()
    };
    let map = match color_map {
        "" => params.effective_color_map(),
        name => name.parse()?,
    };
    let raster: DisplayRaster = image_display(image, &params)?;
    Ok(raster.apply_color_map(map).into_pixels().into_raw_vec_and_offset().0)
}

// ============================================================================
// Display - u8
// ============================================================================

/// Map an 8-bit image to RGB display bytes.
///
/// # Arguments
/// * `data` - Flat interleaved samples (length = width * height * channels)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `channels` - Samples per pixel; 3 is treated as sRGB
/// * `range` - Range mode name, or `"lower,upper"`
/// * `color_map` - Color map name for grey output; empty picks the range's suggestion
///
/// # Returns
/// Flat RGB bytes (length = width * height * 3)
#[wasm_bindgen]
pub fn image_display_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    range: &str,
    color_map: &str,
) -> std::result::Result<Vec<u8>, JsValue> {
    let image = planar_image(data, width, height, channels).map_err(to_js)?;
    render(&image, range, color_map).map_err(to_js)
}

// ============================================================================
// Display - f32
// ============================================================================

/// Map a float image to RGB display bytes. Same arguments as `image_display_wasm`.
#[wasm_bindgen]
pub fn image_display_f32_wasm(
    data: &[f32],
    width: usize,
    height: usize,
    channels: usize,
    range: &str,
    color_map: &str,
) -> std::result::Result<Vec<u8>, JsValue> {
    let image = planar_image(data, width, height, channels).map_err(to_js)?;
    render(&image, range, color_map).map_err(to_js)
}

// ============================================================================
// Color maps
// ============================================================================

/// Map 8-bit indices through a named color map.
///
/// # Returns
/// Flat RGB bytes (length = data.len() * 3)
#[wasm_bindgen]
pub fn apply_color_map_wasm(data: &[u8], color_map: &str) -> std::result::Result<Vec<u8>, JsValue> {
    let map: ColorMap = color_map.parse().map_err(to_js)?;
    Ok(map.apply_to_slice(data))
}

/// The 256-entry lookup table of a named color map as flat RGB bytes.
#[wasm_bindgen]
pub fn color_map_lut_wasm(color_map: &str) -> std::result::Result<Vec<u8>, JsValue> {
    let map: ColorMap = color_map.parse().map_err(to_js)?;
    Ok(map.lut().iter().flatten().copied().collect())
}
