//! Mask- and coordinate-driven gather and scatter.
//!
//! `copy_at` gathers the pixels selected by a binary mask into a new 1-D image,
//! in raster order (dimension 0 fastest). `fill_at` writes back to the same
//! positions in the same order, so `a.fill_at(&a.copy_at(&m)?, &m)` leaves `a`
//! unchanged.

use super::{DataType, Image, Operand};
use crate::error::{DipError, Result};

impl Image {
    /// Buffer offsets of the pixels selected by `mask`, in raster order.
    fn masked_pixel_offsets(&self, mask: &Image) -> Result<Vec<usize>> {
        if mask.data_type() != DataType::Bin {
            return Err(DipError::UnsupportedDataType {
                operation: "mask indexing",
                data_type: mask.data_type(),
            });
        }
        if !mask.is_scalar() {
            return Err(DipError::TensorMismatch {
                expected: 1,
                found: mask.tensor_elements(),
            });
        }
        if mask.sizes() != self.sizes() {
            return Err(DipError::sizes(self.sizes(), mask.sizes()));
        }
        let selected = mask.samples();
        Ok(self
            .pixel_offsets()
            .zip(selected)
            .filter(|(_, s)| !s.is_zero())
            .map(|(offset, _)| offset)
            .collect())
    }

    /// Buffer offsets of the pixels at `coordinates`, in list order.
    fn coordinate_pixel_offsets(&self, coordinates: &[Vec<usize>]) -> Result<Vec<usize>> {
        coordinates.iter().map(|c| self.offset_of(c)).collect()
    }

    fn expand_tensor_offsets(&self, pixels: &[usize]) -> Vec<usize> {
        let elements = self.tensor_elements();
        let mut offsets = Vec::with_capacity(pixels.len() * elements);
        for &p in pixels {
            for t in 0..elements {
                offsets.push((p as isize + t as isize * self.tensor_stride()) as usize);
            }
        }
        offsets
    }

    /// An empty selection yields a 1-D image of size 0.
    fn gather_pixels(&self, pixels: &[usize]) -> Result<Image> {
        let offsets = self.expand_tensor_offsets(pixels);
        let buffer = self.buffer().select(&offsets);
        let mut out = Image::from_buffer(buffer, &[pixels.len()], self.tensor());
        out.copy_metadata_from(self);
        Ok(out)
    }

    fn scatter_pixels(&self, value: Operand<'_>, pixels: &[usize]) -> Result<()> {
        let elements = self.tensor_elements();
        let samples = match value {
            Operand::Pixel(value) => {
                let pixel = value.broadcast_to(elements)?;
                pixel.iter().copied().cycle().take(pixels.len() * elements).collect()
            }
            Operand::Image(source) => {
                if source.number_of_pixels() != pixels.len() {
                    return Err(DipError::LengthMismatch {
                        expected: pixels.len(),
                        found: source.number_of_pixels(),
                    });
                }
                source.expand_tensor(elements)?.samples()
            }
        };
        let offsets = self.expand_tensor_offsets(pixels);
        self.buffer_mut().scatter(&offsets, &samples);
        Ok(())
    }

    /// Gather the pixels where `mask` is set into a new 1-D image.
    ///
    /// # Arguments
    /// * `mask` - Scalar binary image with the same sizes as `self`
    ///
    /// # Returns
    /// An image of sizes `[count]` with this image's tensor shape and data type.
    ///
    /// # Errors
    /// `DimensionMismatch` if sizes differ, `TensorMismatch` for a non-scalar mask.
    pub fn copy_at(&self, mask: &Image) -> Result<Image> {
        let pixels = self.masked_pixel_offsets(mask)?;
        self.gather_pixels(&pixels)
    }

    /// Write a constant, or the pixels of a 1-D image, to the positions where
    /// `mask` is set.
    ///
    /// An image source must have exactly as many pixels as the mask has set
    /// pixels; they are consumed in raster order.
    pub fn fill_at<'a>(&self, value: impl Into<Operand<'a>>, mask: &Image) -> Result<()> {
        let pixels = self.masked_pixel_offsets(mask)?;
        self.scatter_pixels(value.into(), &pixels)
    }

    /// Gather the pixels at `coordinates` into a new 1-D image, in list order.
    pub fn copy_at_coordinates(&self, coordinates: &[Vec<usize>]) -> Result<Image> {
        let pixels = self.coordinate_pixel_offsets(coordinates)?;
        self.gather_pixels(&pixels)
    }

    /// Write to the pixels at `coordinates`, in list order.
    pub fn fill_at_coordinates<'a>(&self, value: impl Into<Operand<'a>>, coordinates: &[Vec<usize>]) -> Result<()> {
        let pixels = self.coordinate_pixel_offsets(coordinates)?;
        self.scatter_pixels(value.into(), &pixels)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DipError;
    use crate::image::{DataType, Image, PixelValue, Range, Tensor};

    fn ramp() -> Image {
        Image::from_vec(&[3, 2], Tensor::scalar(), vec![5u16, 150, 7, 200, 1, 120]).unwrap()
    }

    #[test]
    fn test_copy_at_raster_order() {
        let a = ramp();
        let mask = a.greater(100u16).unwrap();
        let picked = a.copy_at(&mask).unwrap();
        assert_eq!(picked.sizes(), &[3]);
        assert_eq!(picked.data_type(), DataType::U16);
        assert_eq!(picked.to_ndarray::<u16>().unwrap().into_raw_vec_and_offset().0, vec![150, 200, 120]);
    }

    #[test]
    fn test_fill_at_constant_and_inverse() {
        let a = ramp();
        let mask = a.greater(100u16).unwrap();
        let before = a.samples();
        let picked = a.copy_at(&mask).unwrap();
        a.fill_at(&picked, &mask).unwrap();
        assert_eq!(a.samples(), before);

        a.fill_at(0u16, &mask).unwrap();
        assert_eq!(a.to_ndarray::<u16>().unwrap().into_raw_vec_and_offset().0, vec![5, 0, 7, 0, 1, 0]);
    }

    #[test]
    fn test_mask_validation() {
        let a = ramp();
        let wrong = Image::new(&[2, 3], DataType::Bin).unwrap();
        assert!(matches!(a.copy_at(&wrong), Err(DipError::DimensionMismatch { .. })));
        let not_binary = Image::new(&[3, 2], DataType::U8).unwrap();
        assert!(a.copy_at(&not_binary).is_err());

        let mask = a.greater(100u16).unwrap();
        let short = Image::new(&[2], DataType::U16).unwrap();
        let before = a.samples();
        assert!(matches!(a.fill_at(&short, &mask), Err(DipError::LengthMismatch { expected: 3, found: 2 })));
        assert_eq!(a.samples(), before);

    }

    #[test]
    fn test_empty_mask_round_trip() {
        let a = ramp();
        let before = a.samples();
        let none = a.greater(1000u16).unwrap();
        let picked = a.copy_at(&none).unwrap();
        assert_eq!(picked.sizes(), &[0]);
        assert_eq!(picked.number_of_pixels(), 0);
        assert_eq!(picked.data_type(), DataType::U16);
        a.fill_at(&picked, &none).unwrap();
        assert_eq!(a.samples(), before);
        assert!(matches!(a.fill_at(&Image::new(&[1], DataType::U16).unwrap(), &none), Err(DipError::LengthMismatch { expected: 0, found: 1 })));

        let listed = a.copy_at_coordinates(&[]).unwrap();
        assert_eq!(listed.sizes(), &[0]);
    }

    #[test]
    fn test_mask_on_view_writes_parent() {
        let a = ramp();
        let view = a.at(&[Range::new(1, 2, 1), Range::all()]).unwrap();
        let mask = view.greater_equal(150u16).unwrap();
        view.fill_at(PixelValue::from(vec![9u16]), &mask).unwrap();
        assert_eq!(a.to_ndarray::<u16>().unwrap().into_raw_vec_and_offset().0, vec![5, 9, 7, 200, 1, 120]);
    }

    #[test]
    fn test_coordinate_lists() {
        let rgb = Image::create(&[4, 4], Tensor::vector(3), DataType::U8).unwrap();
        let coords = vec![vec![0, 0], vec![3, 2]];
        rgb.fill_at_coordinates([1u8, 2, 3], &coords).unwrap();
        let picked = rgb.copy_at_coordinates(&coords).unwrap();
        assert_eq!(picked.tensor_elements(), 3);
        assert_eq!(picked.pixel_as::<u8>(&[1]).unwrap(), vec![1, 2, 3]);
        assert!(rgb.copy_at_coordinates(&[vec![4, 0]]).is_err());
    }
}
