//! Reduction of an N-d image to the 1-D or 2-D plane that is displayed.
//!
//! The output has one dimension per displayed axis, in display order. Every
//! other axis is collapsed:
//!
//! - **slice**: the plane through the given coordinates (a view, no copy)
//! - **max**: the sample with the largest value along the collapsed axes,
//!   compared by magnitude for complex data
//! - **mean**: the average along the collapsed axes, as `DFLOAT` or `DCOMPLEX`

use num_complex::Complex64;

use super::params::ProjectionMode;
use crate::error::{DipError, Result};
use crate::image::{DataType, Image, Range, Sample};

/// Complete coordinates for a slice through `image`.
///
/// Accepts an empty list (the origin), one coordinate per dimension, or one
/// coordinate per collapsed dimension. Coordinates past the end of an axis
/// are clamped to its last index.
pub(crate) fn resolve_coordinates(image: &Image, axes: &[usize], coordinates: &[usize]) -> Result<Vec<usize>> {
    let sizes = image.sizes();
    let ndims = sizes.len();
    let collapsed: Vec<usize> = (0..ndims).filter(|d| !axes.contains(d)).collect();
    let mut full = vec![0usize; ndims];
    if coordinates.len() == ndims {
        full.copy_from_slice(coordinates);
    } else if coordinates.len() == collapsed.len() {
        for (&d, &c) in collapsed.iter().zip(coordinates) {
            full[d] = c;
        }
    } else if !coordinates.is_empty() {
        return Err(DipError::InvalidProjection(format!(
            "expected {} or {} coordinates, got {}",
            ndims,
            collapsed.len(),
            coordinates.len()
        )));
    }
    for (c, &size) in full.iter_mut().zip(sizes) {
        *c = (*c).min(size - 1);
    }
    Ok(full)
}

/// Collapse all axes not in `axes` and order the rest as listed.
///
/// # Arguments
/// * `image` - The image to display
/// * `axes` - One or two distinct axes, in display order
/// * `mode` - How collapsed axes are reduced
/// * `coordinates` - Full coordinates, used by `slice` only
pub(crate) fn project(image: &Image, axes: &[usize], mode: ProjectionMode, coordinates: &[usize]) -> Result<Image> {
    let ndims = image.dimensionality();
    if axes.len() == ndims {
        return image.permute_dimensions(axes);
    }
    match mode {
        ProjectionMode::Slice => {
            let ranges: Vec<Range> = (0..ndims)
                .map(|d| {
                    if axes.contains(&d) {
                        Range::all()
                    } else {
                        Range::single(coordinates[d] as isize)
                    }
                })
                .collect();
            // Collapsed axes now have size 1 and are dropped by the permutation.
            image.at(&ranges)?.permute_dimensions(axes)
        }
        ProjectionMode::Max | ProjectionMode::Mean => reduce(image, axes, mode),
    }
}

/// Index of the output pixel that input pixel `pixel` (raster order) falls in.
struct PlaneIndex {
    /// Per displayed axis: linear-index pitch in the input, size, output pitch.
    axes: Vec<(usize, usize, usize)>,
}

impl PlaneIndex {
    fn new(sizes: &[usize], axes: &[usize]) -> Self {
        let mut out_pitch = 1;
        let axes = axes
            .iter()
            .map(|&d| {
                let entry = (sizes[..d].iter().product(), sizes[d], out_pitch);
                out_pitch *= sizes[d];
                entry
            })
            .collect();
        PlaneIndex { axes }
    }

    fn of(&self, pixel: usize) -> usize {
        self.axes
            .iter()
            .map(|&(pitch, size, out_pitch)| (pixel / pitch) % size * out_pitch)
            .sum()
    }
}

fn reduce(image: &Image, axes: &[usize], mode: ProjectionMode) -> Result<Image> {
    let sizes = image.sizes();
    let out_sizes: Vec<usize> = axes.iter().map(|&d| sizes[d]).collect();
    let out_pixels: usize = out_sizes.iter().product();
    let elements = image.tensor_elements();
    let index = PlaneIndex::new(sizes, axes);
    let samples = image.samples();
    let complex = image.data_type().is_complex();

    let (data_type, reduced): (DataType, Vec<Sample>) = match mode {
        ProjectionMode::Mean => {
            let count = (image.number_of_pixels() / out_pixels) as f64;
            let mut sums = vec![Complex64::new(0.0, 0.0); out_pixels * elements];
            for (pixel, values) in samples.chunks(elements).enumerate() {
                let base = index.of(pixel) * elements;
                for (t, v) in values.iter().enumerate() {
                    sums[base + t] += v.as_complex();
                }
            }
            if complex {
                let mean = sums.into_iter().map(|s| Sample::Complex(s / count)).collect();
                (DataType::C64, mean)
            } else {
                let mean = sums.into_iter().map(|s| Sample::Float(s.re / count)).collect();
                (DataType::F64, mean)
            }
        }
        _ => {
            let mut best: Vec<Option<(f64, Sample)>> = vec![None; out_pixels * elements];
            for (pixel, values) in samples.chunks(elements).enumerate() {
                let base = index.of(pixel) * elements;
                for (t, &v) in values.iter().enumerate() {
                    // `as_f64` is the magnitude for complex samples.
                    let key = v.as_f64();
                    let slot = &mut best[base + t];
                    let replace = match slot {
                        None => true,
                        Some((k, _)) => key > *k || (k.is_nan() && !key.is_nan()),
                    };
                    if replace {
                        *slot = Some((key, v));
                    }
                }
            }
            let max = best
                .into_iter()
                .map(|b| b.map_or(Sample::Int(0), |(_, v)| v))
                .collect();
            (image.data_type(), max)
        }
    };
    let mut out = Image::from_samples(&out_sizes, image.tensor(), data_type, &reduced)?;
    out.set_color_space(image.color_space());
    Ok(out)
}
