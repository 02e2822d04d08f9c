//! Strided N-dimensional image container.
//!
//! An [`Image`] is a set of metadata (sizes, strides, tensor descriptor,
//! origin) laid over a reference-counted [`Buffer`]. Slicing produces a new
//! `Image` that holds another share of the same buffer, so views stay valid for
//! as long as any holder exists and writes through a view are visible through
//! every other image on that buffer.
//!
//! ## Layout
//!
//! Freshly allocated images store tensor elements interleaved (tensor stride 1)
//! and dimension 0 fastest, so `strides[0] == tensor_elements` and
//! `strides[d] == strides[d - 1] * sizes[d - 1]`. Views may have any strides,
//! including negative ones and zero (singleton expansion).
//!
//! ## Mutability
//!
//! Writing pixel data takes `&self`: the data lives behind the shared handle and
//! is visible to every view. Changing metadata (color space, pixel size) takes
//! `&mut self` and only affects that one image.
//!
//! The container is single-threaded. `Image` is neither `Send` nor `Sync`; hosts
//! that share images across threads must copy them.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::{DipError, Result};

mod buffer;
mod datatype;
pub mod indexing;
pub mod mask;
pub mod ops;
mod range;
mod tensor;

pub use buffer::{Buffer, BufferElement, SharedBuffer};
pub use datatype::{clamp_cast, DataType, Pixel, Sample};
pub use ops::{Operand, PixelValue};
pub use range::{Range, ResolvedRange};
pub use tensor::{Tensor, TensorShape};

/// Physical size of a pixel along one axis, e.g. `0.25 um`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalQuantity {
    pub magnitude: f64,
    pub units: String,
}

impl PhysicalQuantity {
    pub fn new(magnitude: f64, units: impl Into<String>) -> Self {
        PhysicalQuantity {
            magnitude,
            units: units.into(),
        }
    }
}

/// A strided N-dimensional image, either owning its buffer or viewing a shared one.
///
/// `Clone` creates another share of the same buffer (a view of the whole
/// image). Use [`Image::copy`] for an independent deep copy.
#[derive(Clone)]
pub struct Image {
    buffer: SharedBuffer,
    data_type: DataType,
    sizes: Vec<usize>,
    strides: Vec<isize>,
    tensor: Tensor,
    tensor_stride: isize,
    origin: usize,
    color_space: String,
    pixel_size: Option<Vec<PhysicalQuantity>>,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("data_type", &self.data_type)
            .field("sizes", &self.sizes)
            .field("strides", &self.strides)
            .field("tensor", &self.tensor)
            .field("tensor_stride", &self.tensor_stride)
            .field("origin", &self.origin)
            .field("color_space", &self.color_space)
            .finish()
    }
}

/// Default strides for `sizes` with interleaved tensor elements.
fn default_strides(sizes: &[usize], tensor_elements: usize) -> Vec<isize> {
    let mut stride = tensor_elements as isize;
    sizes
        .iter()
        .map(|&s| {
            let current = stride;
            stride *= s as isize;
            current
        })
        .collect()
}

/// Number of samples for `sizes` x `tensor_elements`, failing on empty or
/// overflowing shapes.
fn checked_sample_count(sizes: &[usize], tensor_elements: usize) -> Result<usize> {
    if sizes.is_empty() {
        return Err(DipError::Allocation("an image needs at least one dimension".into()));
    }
    if tensor_elements == 0 || sizes.contains(&0) {
        return Err(DipError::Allocation(format!(
            "zero-sized image requested: sizes {sizes:?}, {tensor_elements} tensor elements"
        )));
    }
    sizes
        .iter()
        .try_fold(tensor_elements, |acc, &s| acc.checked_mul(s))
        .filter(|&n| n <= isize::MAX as usize)
        .ok_or_else(|| DipError::Allocation(format!("sizes {sizes:?} overflow addressable memory")))
}

impl Image {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Allocate a new image with zero-initialized samples.
    ///
    /// # Arguments
    /// * `sizes` - Size of each spatial dimension, dimension 0 first
    /// * `tensor` - Per-pixel tensor descriptor
    /// * `data_type` - Sample type
    ///
    /// # Errors
    /// `Allocation` for zero-dimensional, zero-sized or unaddressable requests.
    pub fn create(sizes: &[usize], tensor: Tensor, data_type: DataType) -> Result<Image> {
        let count = checked_sample_count(sizes, tensor.elements())?;
        let buffer = Buffer::allocate(data_type, count)?;
        Ok(Image::on_buffer(Rc::new(RefCell::new(buffer)), sizes, tensor))
    }

    /// Allocate a new scalar image.
    pub fn new(sizes: &[usize], data_type: DataType) -> Result<Image> {
        Image::create(sizes, Tensor::scalar(), data_type)
    }

    /// Take ownership of `data`, laid out in raster order with interleaved
    /// tensor elements.
    pub fn from_vec<T: BufferElement>(sizes: &[usize], tensor: Tensor, data: Vec<T>) -> Result<Image> {
        let count = checked_sample_count(sizes, tensor.elements())?;
        if data.len() != count {
            return Err(DipError::LengthMismatch {
                expected: count,
                found: data.len(),
            });
        }
        Ok(Image::on_buffer(Rc::new(RefCell::new(T::wrap(data))), sizes, tensor))
    }

    /// Wrap a freshly built buffer holding exactly the samples of `sizes` x `tensor`.
    pub(crate) fn from_buffer(buffer: Buffer, sizes: &[usize], tensor: Tensor) -> Image {
        Image::on_buffer(Rc::new(RefCell::new(buffer)), sizes, tensor)
    }

    fn on_buffer(buffer: SharedBuffer, sizes: &[usize], tensor: Tensor) -> Image {
        let data_type = buffer.borrow().data_type();
        Image {
            buffer,
            data_type,
            sizes: sizes.to_vec(),
            strides: default_strides(sizes, tensor.elements()),
            tensor,
            tensor_stride: 1,
            origin: 0,
            color_space: String::new(),
            pixel_size: None,
        }
    }

    /// Wrap an existing shared buffer with arbitrary strides.
    ///
    /// The buffer stays alive for as long as the returned image (or any view
    /// of it) exists. Every addressable sample must lie inside the buffer.
    ///
    /// # Arguments
    /// * `buffer` - The shared storage
    /// * `sizes` - Spatial sizes
    /// * `strides` - Spatial strides in samples, one per dimension
    /// * `tensor` - Tensor descriptor
    /// * `tensor_stride` - Distance between tensor elements of one pixel
    /// * `origin` - Offset of the first pixel in the buffer
    pub fn from_shared_buffer(
        buffer: SharedBuffer,
        sizes: &[usize],
        strides: &[isize],
        tensor: Tensor,
        tensor_stride: isize,
        origin: usize,
    ) -> Result<Image> {
        checked_sample_count(sizes, tensor.elements())?;
        if strides.len() != sizes.len() {
            return Err(DipError::LengthMismatch {
                expected: sizes.len(),
                found: strides.len(),
            });
        }
        let len = buffer.borrow().len() as isize;
        let mut lowest = origin as isize;
        let mut highest = origin as isize;
        let extents = sizes
            .iter()
            .zip(strides)
            .map(|(&s, &st)| (s, st))
            .chain(std::iter::once((tensor.elements(), tensor_stride)));
        let overflow = || DipError::Allocation(format!("strides {strides:?} overflow addressable memory"));
        for (size, stride) in extents {
            let reach = stride.checked_mul(size as isize - 1).ok_or_else(overflow)?;
            if reach < 0 {
                lowest = lowest.checked_add(reach).ok_or_else(overflow)?;
            } else {
                highest = highest.checked_add(reach).ok_or_else(overflow)?;
            }
        }
        if lowest < 0 || highest >= len {
            return Err(DipError::Allocation(format!(
                "strided layout addresses samples {lowest}..={highest} outside a buffer of {len}"
            )));
        }
        let data_type = buffer.borrow().data_type();
        Ok(Image {
            buffer,
            data_type,
            sizes: sizes.to_vec(),
            strides: strides.to_vec(),
            tensor,
            tensor_stride,
            origin,
            color_space: String::new(),
            pixel_size: None,
        })
    }

    /// Copy an ndarray into a new image.
    ///
    /// ndarray shapes are row-major, so the axes are reversed: an array of
    /// shape `(height, width)` becomes an image of sizes `[width, height]`.
    /// With `channels_last`, the last array axis becomes the tensor dimension.
    pub fn from_ndarray<T: BufferElement>(array: ArrayViewD<'_, T>, channels_last: bool) -> Result<Image> {
        let shape = array.shape();
        let (spatial, tensor) = if channels_last {
            match shape.split_last() {
                Some((&channels, rest)) => (rest, Tensor::vector(channels)),
                None => (shape, Tensor::scalar()),
            }
        } else {
            (shape, Tensor::scalar())
        };
        let sizes: Vec<usize> = spatial.iter().rev().copied().collect();
        let data: Vec<T> = array.iter().copied().collect();
        Image::from_vec(&sizes, tensor, data)
    }

    /// Copy the image into an ndarray of type `T`, converting samples with
    /// clamp-cast rules.
    ///
    /// The array shape is the reversed sizes, with a trailing channel axis for
    /// non-scalar images.
    pub fn to_ndarray<T: Pixel>(&self) -> Result<ArrayD<T>> {
        let mut shape: Vec<usize> = self.sizes.iter().rev().copied().collect();
        if !self.is_scalar() {
            shape.push(self.tensor_elements());
        }
        let offsets = self.sample_offsets();
        let data = self.buffer().gather_as::<T>(&offsets);
        ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(|e| DipError::InvalidParameter(e.to_string()))
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn dimensionality(&self) -> usize {
        self.sizes.len()
    }

    pub fn number_of_pixels(&self) -> usize {
        self.sizes.iter().product()
    }

    /// Number of samples: pixels times tensor elements.
    pub fn number_of_samples(&self) -> usize {
        self.number_of_pixels() * self.tensor_elements()
    }

    pub fn tensor(&self) -> Tensor {
        self.tensor
    }

    pub fn tensor_elements(&self) -> usize {
        self.tensor.elements()
    }

    pub fn tensor_stride(&self) -> isize {
        self.tensor_stride
    }

    pub fn is_scalar(&self) -> bool {
        self.tensor.is_scalar()
    }

    /// Offset of the first pixel inside the shared buffer.
    pub fn origin(&self) -> usize {
        self.origin
    }

    pub fn color_space(&self) -> &str {
        &self.color_space
    }

    pub fn set_color_space(&mut self, color_space: impl Into<String>) {
        self.color_space = color_space.into();
    }

    pub fn is_color(&self) -> bool {
        !self.color_space.is_empty()
    }

    pub fn pixel_size(&self) -> Option<&[PhysicalQuantity]> {
        self.pixel_size.as_deref()
    }

    pub fn set_pixel_size(&mut self, pixel_size: Option<Vec<PhysicalQuantity>>) {
        self.pixel_size = pixel_size;
    }

    /// True when both images are backed by the same buffer.
    pub fn shares_data(&self, other: &Image) -> bool {
        Rc::ptr_eq(&self.buffer, &other.buffer)
    }

    /// True when the image uses the default layout starting at sample 0, so
    /// that raster order equals buffer order.
    pub fn has_normal_strides(&self) -> bool {
        self.origin == 0
            && self.tensor_stride == 1
            && self.strides == default_strides(&self.sizes, self.tensor_elements())
    }

    /// Another handle on the shared buffer.
    pub fn shared_buffer(&self) -> SharedBuffer {
        Rc::clone(&self.buffer)
    }

    // ========================================================================
    // Crate-internal access
    // ========================================================================

    pub(crate) fn buffer(&self) -> Ref<'_, Buffer> {
        self.buffer.borrow()
    }

    pub(crate) fn buffer_mut(&self) -> RefMut<'_, Buffer> {
        self.buffer.borrow_mut()
    }

    /// Clone of the metadata with replaced geometry; shares the buffer.
    pub(crate) fn with_geometry(
        &self,
        sizes: Vec<usize>,
        strides: Vec<isize>,
        tensor: Tensor,
        tensor_stride: isize,
        origin: usize,
    ) -> Image {
        Image {
            buffer: Rc::clone(&self.buffer),
            data_type: self.data_type,
            sizes,
            strides,
            tensor,
            tensor_stride,
            origin,
            color_space: self.color_space.clone(),
            pixel_size: self.pixel_size.clone(),
        }
    }

    /// Copy color space and pixel size from `other`.
    pub(crate) fn copy_metadata_from(&mut self, other: &Image) {
        self.color_space = other.color_space.clone();
        self.pixel_size = other.pixel_size.clone();
    }

    /// Buffer offsets of every pixel (tensor element 0), in raster order.
    pub(crate) fn pixel_offsets(&self) -> PixelOffsets<'_> {
        PixelOffsets {
            sizes: &self.sizes,
            strides: &self.strides,
            coords: vec![0; self.sizes.len()],
            offset: self.origin as isize,
            remaining: self.number_of_pixels(),
        }
    }

    /// Buffer offsets of every sample, pixel-major, in raster order.
    pub(crate) fn sample_offsets(&self) -> Vec<usize> {
        let elements = self.tensor_elements();
        let mut offsets = Vec::with_capacity(self.number_of_samples());
        for pixel in self.pixel_offsets() {
            for t in 0..elements {
                offsets.push((pixel as isize + t as isize * self.tensor_stride) as usize);
            }
        }
        offsets
    }

    /// All samples in raster order, pixel-major.
    pub(crate) fn samples(&self) -> Vec<Sample> {
        self.buffer().gather(&self.sample_offsets())
    }

    /// Overwrite all samples in raster order, pixel-major.
    pub(crate) fn set_samples(&self, samples: &[Sample]) {
        let offsets = self.sample_offsets();
        self.buffer_mut().scatter(&offsets, samples);
    }
}

/// Iterator over the buffer offsets of an image's pixels, dimension 0 fastest.
pub(crate) struct PixelOffsets<'a> {
    sizes: &'a [usize],
    strides: &'a [isize],
    coords: Vec<usize>,
    offset: isize,
    remaining: usize,
}

impl Iterator for PixelOffsets<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.offset as usize;
        self.remaining -= 1;
        for d in 0..self.sizes.len() {
            self.coords[d] += 1;
            self.offset += self.strides[d];
            if self.coords[d] < self.sizes[d] {
                break;
            }
            self.offset -= self.strides[d] * self.sizes[d] as isize;
            self.coords[d] = 0;
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for PixelOffsets<'_> {}
