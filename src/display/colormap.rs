//! Named color maps: 256-entry lookup tables from an 8-bit index to RGB.
//!
//! ## Maps
//!
//! - **grey**: identity on all three channels
//! - **saturation**: grey, with 0 shown blue and 255 shown red to flag clipping
//! - **linear**: perceptually ordered blue, magenta, yellow ramp
//! - **diverging**: blue to neutral grey to yellow, grey at index 128
//! - **cyclic**: magenta, yellow, green, blue and back, for angles
//! - **label**: 16 distinct colors repeated, index 0 black (background)
//!
//! The continuous maps are piecewise-linear through a few control colors.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DipError, Result};
use crate::image::{Image, Pixel, Tensor};

/// A named color map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColorMap {
    Grey,
    Saturation,
    Linear,
    Diverging,
    Cyclic,
    Label,
}

/// Base colors of the label map, cycled for labels 1, 2, 3, ...
const LABEL_PALETTE: [[f32; 3]; 16] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 0.3333, 0.0],
    [0.6667, 1.0, 0.0],
    [0.0, 0.6667, 1.0],
    [0.3333, 0.0, 1.0],
    [1.0, 0.0, 0.6667],
    [1.0, 0.6667, 0.0],
    [0.0, 1.0, 0.5],
    [0.0, 0.3333, 1.0],
    [0.6667, 0.0, 1.0],
    [1.0, 0.0, 0.3333],
];

const LINEAR_STOPS: &[(f32, [f32; 3])] = &[
    (0.0, [0.0, 12.0, 120.0]),
    (0.35, [150.0, 32.0, 150.0]),
    (0.7, [235.0, 112.0, 60.0]),
    (1.0, [255.0, 240.0, 50.0]),
];

const DIVERGING_STOPS: &[(f32, [f32; 3])] = &[
    (0.0, [34.0, 100.0, 232.0]),
    (128.0 / 255.0, [128.0, 128.0, 128.0]),
    (1.0, [232.0, 200.0, 34.0]),
];

const CYCLIC_STOPS: &[(f32, [f32; 3])] = &[
    (0.0, [235.0, 80.0, 235.0]),
    (0.25, [240.0, 210.0, 40.0]),
    (0.5, [60.0, 190.0, 60.0]),
    (0.75, [50.0, 90.0, 230.0]),
    (1.0, [235.0, 80.0, 235.0]),
];

/// Interpolate between control colors at position `t` in `[0, 1]`.
fn interpolate(stops: &[(f32, [f32; 3])], t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let upper = stops.iter().position(|&(p, _)| p >= t).unwrap_or(stops.len() - 1);
    let lower = upper.saturating_sub(1);
    let (p0, c0) = stops[lower];
    let (p1, c1) = stops[upper];
    let w = if p1 > p0 { (t - p0) / (p1 - p0) } else { 0.0 };
    let mut rgb = [0u8; 3];
    for (k, out) in rgb.iter_mut().enumerate() {
        *out = (c0[k] + (c1[k] - c0[k]) * w).round().clamp(0.0, 255.0) as u8;
    }
    rgb
}

impl ColorMap {
    /// All maps, in declaration order.
    pub const ALL: [ColorMap; 6] = [
        ColorMap::Grey,
        ColorMap::Saturation,
        ColorMap::Linear,
        ColorMap::Diverging,
        ColorMap::Cyclic,
        ColorMap::Label,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ColorMap::Grey => "grey",
            ColorMap::Saturation => "saturation",
            ColorMap::Linear => "linear",
            ColorMap::Diverging => "diverging",
            ColorMap::Cyclic => "cyclic",
            ColorMap::Label => "label",
        }
    }

    /// Color of a single index.
    pub fn color(&self, index: u8) -> [u8; 3] {
        let i = index as usize;
        match self {
            ColorMap::Grey => [index; 3],
            ColorMap::Saturation => match index {
                0 => [0, 0, 255],
                255 => [255, 0, 0],
                v => [v; 3],
            },
            ColorMap::Linear => interpolate(LINEAR_STOPS, i as f32 / 255.0),
            ColorMap::Diverging => interpolate(DIVERGING_STOPS, i as f32 / 255.0),
            // Divide by 256 so that index 255 does not coincide with index 0.
            ColorMap::Cyclic => interpolate(CYCLIC_STOPS, i as f32 / 256.0),
            ColorMap::Label => {
                if index == 0 {
                    [0, 0, 0]
                } else {
                    let base = LABEL_PALETTE[(i - 1) % LABEL_PALETTE.len()];
                    base.map(|c| (c * 255.0).round() as u8)
                }
            }
        }
    }

    /// The full 256-entry lookup table.
    pub fn lut(&self) -> [[u8; 3]; 256] {
        let mut table = [[0u8; 3]; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = self.color(i as u8);
        }
        table
    }

    /// Map a run of indices to interleaved RGB triples.
    pub fn apply_to_slice(&self, indices: &[u8]) -> Vec<u8> {
        let lut = self.lut();
        let mut rgb = vec![0u8; indices.len() * 3];
        rgb.par_chunks_mut(3)
            .zip(indices.par_iter())
            .for_each(|(px, &v)| px.copy_from_slice(&lut[v as usize]));
        rgb
    }
}

impl FromStr for ColorMap {
    type Err = DipError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "grey" | "gray" => Ok(ColorMap::Grey),
            "saturation" => Ok(ColorMap::Saturation),
            "linear" => Ok(ColorMap::Linear),
            "diverging" => Ok(ColorMap::Diverging),
            "cyclic" => Ok(ColorMap::Cyclic),
            "label" | "labels" => Ok(ColorMap::Label),
            _ => Err(DipError::InvalidParameter(format!("unknown color map '{s}'"))),
        }
    }
}

impl fmt::Display for ColorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Apply a color map to a scalar image, producing a 3-channel `UINT8` sRGB image.
///
/// Samples are clamp-cast to `UINT8` first, so values outside `[0, 255]`
/// saturate. Complex images are rejected.
///
/// # Arguments
/// * `image` - Scalar, real-valued image
/// * `map` - The color map
///
/// # Returns
/// A new image with the same sizes and pixel size as `image`.
pub fn apply_color_map(image: &Image, map: ColorMap) -> Result<Image> {
    if !image.is_scalar() {
        return Err(DipError::TensorMismatch {
            expected: 1,
            found: image.tensor_elements(),
        });
    }
    if image.data_type().is_complex() {
        return Err(DipError::UnsupportedDataType {
            operation: "color map application",
            data_type: image.data_type(),
        });
    }
    let indices: Vec<u8> = image.samples().into_iter().map(u8::from_sample).collect();
    let rgb = map.apply_to_slice(&indices);
    let mut out = Image::from_vec(image.sizes(), Tensor::vector(3), rgb)?;
    out.set_color_space("sRGB");
    out.set_pixel_size(image.pixel_size().map(<[_]>::to_vec));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::DataType;

    #[test]
    fn test_grey_and_saturation() {
        let grey = ColorMap::Grey.lut();
        assert_eq!(grey[0], [0, 0, 0]);
        assert_eq!(grey[77], [77, 77, 77]);
        let sat = ColorMap::Saturation.lut();
        assert_eq!(sat[0], [0, 0, 255]);
        assert_eq!(sat[255], [255, 0, 0]);
        assert_eq!(sat[254], [254, 254, 254]);
    }

    #[test]
    fn test_label_map_cycles_palette() {
        let lut = ColorMap::Label.lut();
        assert_eq!(lut[0], [0, 0, 0]);
        assert_eq!(lut[1], [255, 0, 0]);
        assert_eq!(lut[2], [0, 255, 0]);
        assert_eq!(lut[7], [255, 85, 0]);
        assert_eq!(lut[17], lut[1]);
        assert_eq!(lut[255], lut[(255 - 1) % 16 + 1]);
        // Adjacent labels never share a color.
        for i in 1..255 {
            assert_ne!(lut[i], lut[i + 1]);
        }
    }

    #[test]
    fn test_continuous_maps() {
        let div = ColorMap::Diverging.lut();
        assert_eq!(div[128], [128, 128, 128]);
        assert_eq!(div[0], [34, 100, 232]);
        assert_eq!(div[255], [232, 200, 34]);

        let cyc = ColorMap::Cyclic.lut();
        assert_eq!(cyc[0], [235, 80, 235]);
        assert_eq!(cyc[64], [240, 210, 40]);
        // Wraps smoothly: the last entry is close to the first.
        let gap: i32 = (0..3).map(|k| (cyc[255][k] as i32 - cyc[0][k] as i32).abs()).sum();
        assert!(gap < 20);

        let lin = ColorMap::Linear.lut();
        assert_eq!(lin[0], [0, 12, 120]);
        assert_eq!(lin[255], [255, 240, 50]);
    }

    #[test]
    fn test_names() {
        for map in ColorMap::ALL {
            assert_eq!(map.name().parse::<ColorMap>().unwrap(), map);
        }
        assert_eq!("gray".parse::<ColorMap>().unwrap(), ColorMap::Grey);
        assert_eq!("labels".parse::<ColorMap>().unwrap(), ColorMap::Label);
        assert!("jet".parse::<ColorMap>().is_err());
    }

    #[test]
    fn test_apply_color_map_to_image() {
        let img = Image::from_vec(&[3], Tensor::scalar(), vec![0.0f32, 1.0, 400.0]).unwrap();
        let rgb = apply_color_map(&img, ColorMap::Label).unwrap();
        assert_eq!(rgb.tensor_elements(), 3);
        assert_eq!(rgb.color_space(), "sRGB");
        assert_eq!(rgb.pixel_as::<u8>(&[0]).unwrap(), vec![0, 0, 0]);
        assert_eq!(rgb.pixel_as::<u8>(&[1]).unwrap(), vec![255, 0, 0]);
        assert_eq!(rgb.pixel_as::<u8>(&[2]).unwrap(), ColorMap::Label.color(255).to_vec());

        let vector = Image::create(&[3], Tensor::vector(2), DataType::U8).unwrap();
        assert!(apply_color_map(&vector, ColorMap::Grey).is_err());
    }
}
