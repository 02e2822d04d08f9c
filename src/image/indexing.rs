//! Views and single-pixel access.
//!
//! Every method that returns an [`Image`] here returns a view: it shares the
//! buffer of `self` and only recomputes sizes, strides and origin.

use super::{Image, PixelValue, Pixel, Range, Sample, Tensor};
use crate::error::{DipError, Result};

impl Image {
    // ========================================================================
    // Spatial views
    // ========================================================================

    /// Spatial slice: one inclusive range per dimension.
    ///
    /// # Arguments
    /// * `ranges` - `(start, stop, step)` per dimension, see [`Range`]
    ///
    /// # Returns
    /// A view sharing this image's buffer.
    pub fn at(&self, ranges: &[Range]) -> Result<Image> {
        if ranges.len() != self.dimensionality() {
            return Err(DipError::LengthMismatch {
                expected: self.dimensionality(),
                found: ranges.len(),
            });
        }
        let mut origin = self.origin() as isize;
        let mut sizes = Vec::with_capacity(ranges.len());
        let mut strides = Vec::with_capacity(ranges.len());
        for ((range, &size), &stride) in ranges.iter().zip(self.sizes()).zip(self.strides()) {
            let resolved = range.resolve(size)?;
            origin += resolved.offset as isize * stride;
            sizes.push(resolved.size);
            strides.push(stride * resolved.step);
        }
        Ok(self.with_geometry(sizes, strides, self.tensor(), self.tensor_stride(), origin as usize))
    }

    /// Buffer offset of the pixel at `coords`.
    pub(crate) fn offset_of(&self, coords: &[usize]) -> Result<usize> {
        if coords.len() != self.dimensionality() {
            return Err(DipError::LengthMismatch {
                expected: self.dimensionality(),
                found: coords.len(),
            });
        }
        let mut offset = self.origin() as isize;
        for ((&c, &size), &stride) in coords.iter().zip(self.sizes()).zip(self.strides()) {
            if c >= size {
                return Err(DipError::index(c as isize, size));
            }
            offset += c as isize * stride;
        }
        Ok(offset as usize)
    }

    /// Read the full tensor of the pixel at `coords`.
    pub fn pixel(&self, coords: &[usize]) -> Result<Vec<Sample>> {
        let offsets = self.tensor_offsets(self.offset_of(coords)?);
        Ok(self.buffer().gather(&offsets))
    }

    /// Read the pixel at `coords` as values of type `T` (clamp-cast).
    pub fn pixel_as<T: Pixel>(&self, coords: &[usize]) -> Result<Vec<T>> {
        let offsets = self.tensor_offsets(self.offset_of(coords)?);
        Ok(self.buffer().gather_as::<T>(&offsets))
    }

    /// Write the pixel at `coords`.
    ///
    /// A single value is written to every tensor element; otherwise the value
    /// must have exactly one sample per tensor element.
    pub fn set_pixel(&self, coords: &[usize], value: impl Into<PixelValue>) -> Result<()> {
        let value: PixelValue = value.into();
        let samples = value.broadcast_to(self.tensor_elements())?;
        let offsets = self.tensor_offsets(self.offset_of(coords)?);
        self.buffer_mut().scatter(&offsets, &samples);
        Ok(())
    }

    fn tensor_offsets(&self, pixel: usize) -> Vec<usize> {
        (0..self.tensor_elements())
            .map(|t| (pixel as isize + t as isize * self.tensor_stride()) as usize)
            .collect()
    }

    // ========================================================================
    // Tensor views
    // ========================================================================

    /// View of a single tensor element; negative indices count from the end.
    pub fn tensor_element(&self, index: isize) -> Result<Image> {
        self.tensor_element_range(Range::single(index))
    }

    /// View of a range of tensor elements, as a vector image.
    pub fn tensor_element_range(&self, range: Range) -> Result<Image> {
        let resolved = range.resolve(self.tensor_elements())?;
        let origin = self.origin() as isize + resolved.offset as isize * self.tensor_stride();
        let tensor = if resolved.size == 1 {
            Tensor::scalar()
        } else {
            Tensor::vector(resolved.size)
        };
        let mut view = self.with_geometry(
            self.sizes().to_vec(),
            self.strides().to_vec(),
            tensor,
            self.tensor_stride() * resolved.step,
            origin as usize,
        );
        // A subset of channels is no longer in the original color space.
        if resolved.size != self.tensor_elements() {
            view.set_color_space("");
        }
        Ok(view)
    }

    /// View of the tensor element at matrix position (`row`, `column`).
    pub fn tensor_element_at(&self, row: usize, column: usize) -> Result<Image> {
        let index = self.tensor().index(row, column)?;
        self.tensor_element(index as isize)
    }

    // ========================================================================
    // Reshaping views
    // ========================================================================

    /// Reorder dimensions. Dimensions not listed must be singleton and are dropped.
    pub fn permute_dimensions(&self, order: &[usize]) -> Result<Image> {
        let ndims = self.dimensionality();
        if order.is_empty() {
            return Err(DipError::InvalidAxis("permutation must keep at least one dimension".into()));
        }
        let mut used = vec![false; ndims];
        for &d in order {
            if d >= ndims {
                return Err(DipError::InvalidAxis(format!(
                    "dimension {d} out of range for a {ndims}-D image"
                )));
            }
            if used[d] {
                return Err(DipError::InvalidAxis(format!("dimension {d} listed twice")));
            }
            used[d] = true;
        }
        if let Some(d) = (0..ndims).find(|&d| !used[d] && self.sizes()[d] != 1) {
            return Err(DipError::InvalidAxis(format!(
                "cannot drop non-singleton dimension {d}"
            )));
        }
        let sizes = order.iter().map(|&d| self.sizes()[d]).collect();
        let strides = order.iter().map(|&d| self.strides()[d]).collect();
        Ok(self.with_geometry(sizes, strides, self.tensor(), self.tensor_stride(), self.origin()))
    }

    /// Drop all singleton dimensions; an image of one pixel keeps one dimension.
    pub fn squeeze(&self) -> Image {
        let mut keep: Vec<usize> = (0..self.dimensionality())
            .filter(|&d| self.sizes()[d] != 1)
            .collect();
        if keep.is_empty() {
            keep.push(0);
        }
        let sizes = keep.iter().map(|&d| self.sizes()[d]).collect();
        let strides = keep.iter().map(|&d| self.strides()[d]).collect();
        self.with_geometry(sizes, strides, self.tensor(), self.tensor_stride(), self.origin())
    }

    /// Reverse the selected dimensions.
    pub fn mirror(&self, axes: &[bool]) -> Result<Image> {
        if axes.len() != self.dimensionality() {
            return Err(DipError::LengthMismatch {
                expected: self.dimensionality(),
                found: axes.len(),
            });
        }
        let mut origin = self.origin() as isize;
        let mut strides = self.strides().to_vec();
        for (d, _) in axes.iter().enumerate().filter(|(_, &flip)| flip) {
            origin += (self.sizes()[d] as isize - 1) * strides[d];
            strides[d] = -strides[d];
        }
        Ok(self.with_geometry(
            self.sizes().to_vec(),
            strides,
            self.tensor(),
            self.tensor_stride(),
            origin as usize,
        ))
    }

    /// Broadcast singleton dimensions to `sizes` using zero strides.
    ///
    /// Missing trailing dimensions are added as singletons first. Every
    /// non-singleton dimension must already match.
    pub fn expand_singleton(&self, sizes: &[usize]) -> Result<Image> {
        if sizes.len() < self.dimensionality() {
            return Err(DipError::sizes(sizes, self.sizes()));
        }
        let mut new_sizes = Vec::with_capacity(sizes.len());
        let mut strides = Vec::with_capacity(sizes.len());
        for (d, &target) in sizes.iter().enumerate() {
            let (size, stride) = match (self.sizes().get(d), self.strides().get(d)) {
                (Some(&s), Some(&st)) => (s, st),
                _ => (1, 0),
            };
            if size == target {
                new_sizes.push(size);
                strides.push(stride);
            } else if size == 1 {
                new_sizes.push(target);
                strides.push(0);
            } else {
                return Err(DipError::sizes(sizes, self.sizes()));
            }
        }
        Ok(self.with_geometry(new_sizes, strides, self.tensor(), self.tensor_stride(), self.origin()))
    }

    /// Broadcast a scalar image to `elements` tensor elements (tensor stride 0).
    pub(crate) fn expand_tensor(&self, elements: usize) -> Result<Image> {
        if self.tensor_elements() == elements {
            return Ok(self.clone());
        }
        if !self.is_scalar() {
            return Err(DipError::TensorMismatch {
                expected: elements,
                found: self.tensor_elements(),
            });
        }
        Ok(self.with_geometry(
            self.sizes().to_vec(),
            self.strides().to_vec(),
            Tensor::vector(elements),
            0,
            self.origin(),
        ))
    }
}
