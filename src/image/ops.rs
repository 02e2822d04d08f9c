//! Whole-image operations: fill, copy, convert, arithmetic, comparison and
//! bitwise logic.
//!
//! ## Broadcasting
//!
//! Binary operations accept another image or a constant pixel value (see
//! [`Operand`]). Spatial singleton dimensions of either image are expanded to
//! match the other; a scalar tensor broadcasts across all tensor elements of
//! the other operand. Anything else is a mismatch error.
//!
//! ## Result types
//!
//! Arithmetic results use [`DataType::suggest_arithmetic`]. A constant does not
//! widen the image type within its own category: `uint8 + 5` stays `UINT8`,
//! `uint8 + 0.5` becomes `SFLOAT`. Comparisons always produce a scalar `BIN`
//! image: a pixel is set when the comparison holds for all of its tensor
//! elements, or for `not_equal`, when any element differs.
//!
//! All validation happens before any sample is written.

use num_complex::{Complex32, Complex64};
use rayon::prelude::*;

use super::{Buffer, DataType, Image, Pixel, Sample, Tensor};
use crate::error::{DipError, Result};

// ============================================================================
// Constant operands
// ============================================================================

/// A constant pixel: one sample, or one sample per tensor element.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelValue(pub Vec<Sample>);

impl PixelValue {
    pub fn samples(&self) -> &[Sample] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Repeat a single sample, or check that there is one sample per element.
    pub(crate) fn broadcast_to(&self, elements: usize) -> Result<Vec<Sample>> {
        match self.0.len() {
            0 => Err(DipError::EmptyInput("pixel value has no samples".into())),
            1 => Ok(vec![self.0[0]; elements]),
            n if n == elements => Ok(self.0.clone()),
            n => Err(DipError::TensorMismatch {
                expected: elements,
                found: n,
            }),
        }
    }

    /// Smallest data type category of the constant, anchored on `image_type`.
    fn data_type_against(&self, image_type: DataType) -> DataType {
        if self.0.iter().any(|s| matches!(s, Sample::Complex(_))) {
            DataType::C32
        } else if self.0.iter().any(|s| matches!(s, Sample::Float(_))) {
            DataType::F32
        } else {
            image_type
        }
    }
}

impl<T: Pixel> From<Vec<T>> for PixelValue {
    fn from(values: Vec<T>) -> Self {
        PixelValue(values.into_iter().map(Pixel::to_sample).collect())
    }
}

impl<T: Pixel> From<&[T]> for PixelValue {
    fn from(values: &[T]) -> Self {
        PixelValue(values.iter().map(|v| v.to_sample()).collect())
    }
}

impl<T: Pixel, const N: usize> From<[T; N]> for PixelValue {
    fn from(values: [T; N]) -> Self {
        PixelValue(values.iter().map(|v| v.to_sample()).collect())
    }
}

impl From<Sample> for PixelValue {
    fn from(sample: Sample) -> Self {
        PixelValue(vec![sample])
    }
}

/// Right-hand side of a binary operation.
#[derive(Clone, Debug)]
pub enum Operand<'a> {
    Image(&'a Image),
    Pixel(PixelValue),
}

impl<'a> From<&'a Image> for Operand<'a> {
    fn from(image: &'a Image) -> Self {
        Operand::Image(image)
    }
}

impl<T: Pixel> From<Vec<T>> for Operand<'_> {
    fn from(values: Vec<T>) -> Self {
        Operand::Pixel(PixelValue::from(values))
    }
}

impl<T: Pixel, const N: usize> From<[T; N]> for Operand<'_> {
    fn from(values: [T; N]) -> Self {
        Operand::Pixel(PixelValue::from(values))
    }
}

impl From<PixelValue> for Operand<'_> {
    fn from(value: PixelValue) -> Self {
        Operand::Pixel(value)
    }
}

macro_rules! impl_scalar_operands {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for PixelValue {
                fn from(value: $t) -> Self {
                    PixelValue(vec![value.to_sample()])
                }
            }

            impl From<$t> for Operand<'_> {
                fn from(value: $t) -> Self {
                    Operand::Pixel(PixelValue::from(value))
                }
            }
        )*
    };
}

impl_scalar_operands!(bool, u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, Complex32, Complex64);

// ============================================================================
// Sample-level kernels
// ============================================================================

#[derive(Clone, Copy, Debug)]
enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Clone, Copy, Debug)]
enum Comparison {
    Equal,
    NotEqual,
    Lesser,
    LesserEqual,
    Greater,
    GreaterEqual,
}

#[derive(Clone, Copy, Debug)]
enum Bitwise {
    And,
    Or,
    Xor,
}

fn arithmetic(op: Arithmetic, a: Sample, b: Sample, result: DataType) -> Sample {
    if result.is_complex() {
        let (a, b) = (a.as_complex(), b.as_complex());
        return Sample::Complex(match op {
            Arithmetic::Add => a + b,
            Arithmetic::Subtract => a - b,
            Arithmetic::Multiply => a * b,
            Arithmetic::Divide => a / b,
        });
    }
    match (a, b) {
        (Sample::Int(a), Sample::Int(b)) if !result.is_float() => Sample::Int(match op {
            Arithmetic::Add => a.saturating_add(b),
            Arithmetic::Subtract => a.saturating_sub(b),
            Arithmetic::Multiply => a.saturating_mul(b),
            // Integer division by zero yields 0.
            Arithmetic::Divide => a.checked_div(b).unwrap_or(0),
        }),
        _ => {
            let (a, b) = (a.as_f64(), b.as_f64());
            Sample::Float(match op {
                Arithmetic::Add => a + b,
                Arithmetic::Subtract => a - b,
                Arithmetic::Multiply => a * b,
                Arithmetic::Divide => a / b,
            })
        }
    }
}

fn compare(op: Comparison, a: Sample, b: Sample) -> bool {
    if let (Sample::Int(a), Sample::Int(b)) = (a, b) {
        return match op {
            Comparison::Equal => a == b,
            Comparison::NotEqual => a != b,
            Comparison::Lesser => a < b,
            Comparison::LesserEqual => a <= b,
            Comparison::Greater => a > b,
            Comparison::GreaterEqual => a >= b,
        };
    }
    if matches!(a, Sample::Complex(_)) || matches!(b, Sample::Complex(_)) {
        let equal = a.as_complex() == b.as_complex();
        return match op {
            Comparison::NotEqual => !equal,
            _ => equal,
        };
    }
    let (a, b) = (a.as_f64(), b.as_f64());
    match op {
        Comparison::Equal => a == b,
        Comparison::NotEqual => a != b,
        Comparison::Lesser => a < b,
        Comparison::LesserEqual => a <= b,
        Comparison::Greater => a > b,
        Comparison::GreaterEqual => a >= b,
    }
}

fn int_of(sample: Sample) -> i128 {
    match sample {
        Sample::Int(v) => v,
        other => other.as_f64() as i128,
    }
}

fn bitwise(op: Bitwise, a: Sample, b: Sample) -> Sample {
    let (a, b) = (int_of(a), int_of(b));
    Sample::Int(match op {
        Bitwise::And => a & b,
        Bitwise::Or => a | b,
        Bitwise::Xor => a ^ b,
    })
}

// ============================================================================
// Broadcasting
// ============================================================================

/// Both operands flattened to the same length, in raster order.
struct Broadcast {
    sizes: Vec<usize>,
    elements: usize,
    lhs: Vec<Sample>,
    rhs: Vec<Sample>,
    rhs_type: DataType,
}

fn broadcast_sizes(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    let n = a.len().max(b.len());
    (0..n)
        .map(|d| {
            let sa = a.get(d).copied().unwrap_or(1);
            let sb = b.get(d).copied().unwrap_or(1);
            match (sa, sb) {
                (x, y) if x == y => Ok(x),
                (1, y) => Ok(y),
                (x, 1) => Ok(x),
                _ => Err(DipError::sizes(a, b)),
            }
        })
        .collect()
}

fn broadcast_elements(a: usize, b: usize) -> Result<usize> {
    match (a, b) {
        (x, y) if x == y => Ok(x),
        (1, y) => Ok(y),
        (x, 1) => Ok(x),
        (x, y) => Err(DipError::TensorMismatch { expected: x, found: y }),
    }
}

impl Image {
    fn broadcast(&self, rhs: &Operand<'_>) -> Result<Broadcast> {
        match rhs {
            Operand::Image(other) => {
                let sizes = broadcast_sizes(self.sizes(), other.sizes())?;
                let elements = broadcast_elements(self.tensor_elements(), other.tensor_elements())?;
                let lhs = self.expand_singleton(&sizes)?.expand_tensor(elements)?;
                let rhs = other.expand_singleton(&sizes)?.expand_tensor(elements)?;
                Ok(Broadcast {
                    sizes,
                    elements,
                    lhs: lhs.samples(),
                    rhs: rhs.samples(),
                    rhs_type: other.data_type(),
                })
            }
            Operand::Pixel(value) => {
                let elements = broadcast_elements(self.tensor_elements(), value.len().max(1))?;
                let constant = value.broadcast_to(elements)?;
                let lhs = self.expand_tensor(elements)?.samples();
                let rhs = (0..lhs.len()).map(|i| constant[i % elements]).collect();
                Ok(Broadcast {
                    sizes: self.sizes().to_vec(),
                    elements,
                    lhs,
                    rhs,
                    rhs_type: value.data_type_against(self.data_type()),
                })
            }
        }
    }

    /// Broadcast for an in-place operation: the result must fit `self`.
    fn broadcast_in_place(&self, rhs: &Operand<'_>) -> Result<Broadcast> {
        let b = self.broadcast(rhs)?;
        if b.sizes != self.sizes() {
            return Err(DipError::sizes(self.sizes(), &b.sizes));
        }
        if b.elements != self.tensor_elements() {
            return Err(DipError::TensorMismatch {
                expected: self.tensor_elements(),
                found: b.elements,
            });
        }
        Ok(b)
    }

    /// New image with default layout holding `samples` converted to `data_type`.
    pub(crate) fn from_samples(
        sizes: &[usize],
        tensor: Tensor,
        data_type: DataType,
        samples: &[Sample],
    ) -> Result<Image> {
        let buffer = Buffer::from_samples(data_type, samples)?;
        Ok(Image::from_buffer(buffer, sizes, tensor))
    }

    /// Tensor of a binary-operation result with `elements` elements.
    fn result_tensor(&self, elements: usize) -> Tensor {
        if elements == self.tensor_elements() {
            self.tensor()
        } else {
            Tensor::vector(elements)
        }
    }

    // ========================================================================
    // Fill / copy / convert
    // ========================================================================

    /// Write `value` to every pixel. A single sample fills all tensor elements.
    pub fn fill(&self, value: impl Into<PixelValue>) -> Result<()> {
        let value: PixelValue = value.into();
        let pixel = value.broadcast_to(self.tensor_elements())?;
        let samples: Vec<Sample> = pixel
            .iter()
            .copied()
            .cycle()
            .take(self.number_of_samples())
            .collect();
        self.set_samples(&samples);
        Ok(())
    }

    /// Deep copy into a new buffer with default layout.
    ///
    /// Sizes, tensor shape, data type, color space and pixel size are kept.
    pub fn copy(&self) -> Result<Image> {
        let buffer = if self.has_normal_strides() && self.buffer().len() == self.number_of_samples() {
            self.buffer().clone()
        } else {
            self.buffer().select(&self.sample_offsets())
        };
        let mut out = Image::from_buffer(buffer, self.sizes(), self.tensor());
        out.copy_metadata_from(self);
        Ok(out)
    }

    /// Copy the samples of `source` into this image (e.g. into a view).
    ///
    /// Sizes must match after singleton expansion of `source`; a scalar source
    /// is broadcast across tensor elements. Samples are clamp-cast to this
    /// image's data type.
    pub fn copy_from(&self, source: &Image) -> Result<()> {
        let source = source
            .expand_singleton(self.sizes())
            .map_err(|_| DipError::sizes(self.sizes(), source.sizes()))?
            .expand_tensor(self.tensor_elements())?;
        let samples = source.samples();
        self.set_samples(&samples);
        Ok(())
    }

    /// Convert to `data_type`, producing a new image. The source is unchanged.
    ///
    /// Converting to the current type yields an identical deep copy.
    pub fn convert(&self, data_type: DataType) -> Result<Image> {
        if data_type == self.data_type() {
            return self.copy();
        }
        log::debug!("converting {} image to {}", self.data_type(), data_type);
        let samples = self.samples();
        let mut out = Image::from_samples(self.sizes(), self.tensor(), data_type, &samples)?;
        out.copy_metadata_from(self);
        Ok(out)
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    fn arithmetic(&self, rhs: Operand<'_>, op: Arithmetic) -> Result<Image> {
        let b = self.broadcast(&rhs)?;
        let result_type = self.data_type().suggest_arithmetic(b.rhs_type);
        let samples: Vec<Sample> = b
            .lhs
            .par_iter()
            .zip(b.rhs.par_iter())
            .map(|(&x, &y)| arithmetic(op, x, y, result_type))
            .collect();
        let mut out = Image::from_samples(&b.sizes, self.result_tensor(b.elements), result_type, &samples)?;
        if b.elements == self.tensor_elements() {
            out.copy_metadata_from(self);
        }
        Ok(out)
    }

    fn arithmetic_in_place(&self, rhs: Operand<'_>, op: Arithmetic) -> Result<()> {
        let b = self.broadcast_in_place(&rhs)?;
        let compute_type = self.data_type().suggest_arithmetic(b.rhs_type);
        let samples: Vec<Sample> = b
            .lhs
            .par_iter()
            .zip(b.rhs.par_iter())
            .map(|(&x, &y)| arithmetic(op, x, y, compute_type))
            .collect();
        self.set_samples(&samples);
        Ok(())
    }

    /// Sample-wise sum.
    pub fn add<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Image> {
        self.arithmetic(rhs.into(), Arithmetic::Add)
    }

    /// Sample-wise difference.
    pub fn subtract<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Image> {
        self.arithmetic(rhs.into(), Arithmetic::Subtract)
    }

    /// Sample-wise product (not a matrix product for tensor images).
    pub fn multiply<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Image> {
        self.arithmetic(rhs.into(), Arithmetic::Multiply)
    }

    /// Sample-wise quotient. Integer division truncates; division by zero gives 0.
    pub fn divide<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Image> {
        self.arithmetic(rhs.into(), Arithmetic::Divide)
    }

    pub fn add_in_place<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<()> {
        self.arithmetic_in_place(rhs.into(), Arithmetic::Add)
    }

    pub fn subtract_in_place<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<()> {
        self.arithmetic_in_place(rhs.into(), Arithmetic::Subtract)
    }

    pub fn multiply_in_place<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<()> {
        self.arithmetic_in_place(rhs.into(), Arithmetic::Multiply)
    }

    pub fn divide_in_place<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<()> {
        self.arithmetic_in_place(rhs.into(), Arithmetic::Divide)
    }

    // ========================================================================
    // Comparison
    // ========================================================================

    fn comparison(&self, rhs: Operand<'_>, op: Comparison) -> Result<Image> {
        let ordering = !matches!(op, Comparison::Equal | Comparison::NotEqual);
        if ordering {
            let rhs_complex = match &rhs {
                Operand::Image(other) => other.data_type().is_complex(),
                Operand::Pixel(value) => value.samples().iter().any(|s| matches!(s, Sample::Complex(_))),
            };
            if self.data_type().is_complex() || rhs_complex {
                let data_type = if self.data_type().is_complex() {
                    self.data_type()
                } else {
                    DataType::C64
                };
                return Err(DipError::UnsupportedDataType {
                    operation: "ordering comparison",
                    data_type,
                });
            }
        }
        let b = self.broadcast(&rhs)?;
        let any = matches!(op, Comparison::NotEqual);
        let samples: Vec<Sample> = b
            .lhs
            .par_chunks(b.elements)
            .zip(b.rhs.par_chunks(b.elements))
            .map(|(x, y)| {
                let mut hits = x.iter().zip(y).map(|(&x, &y)| compare(op, x, y));
                Sample::from(if any { hits.any(|h| h) } else { hits.all(|h| h) })
            })
            .collect();
        Image::from_samples(&b.sizes, Tensor::scalar(), DataType::Bin, &samples)
    }

    pub fn equal<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Image> {
        self.comparison(rhs.into(), Comparison::Equal)
    }

    pub fn not_equal<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Image> {
        self.comparison(rhs.into(), Comparison::NotEqual)
    }

    pub fn lesser<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Image> {
        self.comparison(rhs.into(), Comparison::Lesser)
    }

    pub fn lesser_equal<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Image> {
        self.comparison(rhs.into(), Comparison::LesserEqual)
    }

    pub fn greater<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Image> {
        self.comparison(rhs.into(), Comparison::Greater)
    }

    pub fn greater_equal<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Image> {
        self.comparison(rhs.into(), Comparison::GreaterEqual)
    }

    // ========================================================================
    // Bitwise
    // ========================================================================

    fn check_bitwise(operation: &'static str, data_type: DataType) -> Result<()> {
        if data_type.is_integer() || data_type.is_binary() {
            Ok(())
        } else {
            Err(DipError::UnsupportedDataType { operation, data_type })
        }
    }

    fn bitwise(&self, rhs: Operand<'_>, op: Bitwise, operation: &'static str) -> Result<Image> {
        Image::check_bitwise(operation, self.data_type())?;
        let b = self.broadcast(&rhs)?;
        Image::check_bitwise(operation, b.rhs_type)?;
        let result_type = match self.data_type().suggest_arithmetic(b.rhs_type) {
            _ if self.data_type() == b.rhs_type => self.data_type(),
            // UINT64 with a signed type has no integer common type.
            t if t.is_float() => DataType::I64,
            t => t,
        };
        let samples: Vec<Sample> = b
            .lhs
            .par_iter()
            .zip(b.rhs.par_iter())
            .map(|(&x, &y)| bitwise(op, x, y))
            .collect();
        Image::from_samples(&b.sizes, self.result_tensor(b.elements), result_type, &samples)
    }

    pub fn bitwise_and<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Image> {
        self.bitwise(rhs.into(), Bitwise::And, "bitwise and")
    }

    pub fn bitwise_or<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Image> {
        self.bitwise(rhs.into(), Bitwise::Or, "bitwise or")
    }

    pub fn bitwise_xor<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Image> {
        self.bitwise(rhs.into(), Bitwise::Xor, "bitwise xor")
    }

    /// Bitwise complement; logical not for binary images.
    pub fn bitwise_not(&self) -> Result<Image> {
        let data_type = self.data_type();
        Image::check_bitwise("bitwise not", data_type)?;
        let (lo, hi) = data_type.integer_limits().unwrap_or((0, 1));
        let samples: Vec<Sample> = self
            .samples()
            .into_iter()
            .map(|s| {
                let v = int_of(s);
                // Unsigned complement within the type's width.
                Sample::Int(if lo == 0 { hi - v } else { !v })
            })
            .collect();
        let mut out = Image::from_samples(self.sizes(), self.tensor(), data_type, &samples)?;
        out.copy_metadata_from(self);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Range;

    fn u8_image(sizes: &[usize], data: Vec<u8>) -> Image {
        Image::from_vec(sizes, Tensor::scalar(), data).unwrap()
    }

    #[test]
    fn test_fill_view_and_copy_independence() {
        let a = Image::new(&[4, 3], DataType::F32).unwrap();
        a.fill(1.0f32).unwrap();
        let b = a.copy().unwrap();
        assert!(!b.shares_data(&a));
        b.fill(9.0f32).unwrap();
        assert_eq!(a.pixel_as::<f32>(&[0, 0]).unwrap(), vec![1.0]);

        let view = a.at(&[Range::new(1, 2, 1), Range::all()]).unwrap();
        let copied = view.copy().unwrap();
        assert_eq!(copied.sizes(), &[2, 3]);
        assert!(copied.has_normal_strides());
    }

    #[test]
    fn test_fill_tensor_value() {
        let img = Image::create(&[2, 2], Tensor::vector(3), DataType::U8).unwrap();
        img.fill([10u8, 20, 30]).unwrap();
        assert_eq!(img.pixel_as::<u8>(&[1, 1]).unwrap(), vec![10, 20, 30]);
        assert!(img.fill(vec![1u8, 2]).is_err());
    }

    #[test]
    fn test_convert_rules() {
        let img = Image::from_vec(&[4], Tensor::scalar(), vec![-1.5f64, 0.4, 254.5, 1e9]).unwrap();
        let u8s = img.convert(DataType::U8).unwrap();
        assert_eq!(u8s.to_ndarray::<u8>().unwrap().into_raw_vec_and_offset().0, vec![0, 0, 255, 255]);
        let same = img.convert(DataType::F64).unwrap();
        assert!(!same.shares_data(&img));
        assert_eq!(same.samples(), img.samples());
    }

    #[test]
    fn test_copy_from_into_view() {
        let a = Image::new(&[4, 4], DataType::U8).unwrap();
        let src = Image::from_vec(&[2, 2], Tensor::scalar(), vec![1.0f32, 2.0, 3.0, 300.0]).unwrap();
        let view = a.at(&[Range::new(2, 3, 1), Range::new(0, 1, 1)]).unwrap();
        view.copy_from(&src).unwrap();
        assert_eq!(a.pixel_as::<u8>(&[3, 1]).unwrap(), vec![255]);
        assert_eq!(a.pixel_as::<u8>(&[0, 0]).unwrap(), vec![0]);
        assert!(a.copy_from(&src).is_err());
    }

    #[test]
    fn test_arithmetic_types_and_broadcast() {
        let a = u8_image(&[3], vec![250, 10, 4]);
        let sum = a.add(10u8).unwrap();
        assert_eq!(sum.data_type(), DataType::U8);
        assert_eq!(sum.to_ndarray::<u8>().unwrap().into_raw_vec_and_offset().0, vec![255, 20, 14]);

        let half = a.multiply(0.5f64).unwrap();
        assert_eq!(half.data_type(), DataType::F32);
        assert_eq!(half.pixel_as::<f32>(&[2]).unwrap(), vec![2.0]);

        let column = u8_image(&[1, 2], vec![1, 2]);
        let grid = a.subtract(&column).unwrap();
        assert_eq!(grid.sizes(), &[3, 2]);
        assert_eq!(grid.pixel_as::<u8>(&[2, 1]).unwrap(), vec![2]);

        let q = a.divide(0u8).unwrap();
        assert_eq!(q.pixel_as::<u8>(&[0]).unwrap(), vec![0]);

        let rgb = Image::create(&[3], Tensor::vector(3), DataType::U8).unwrap();
        let scaled = rgb.add(&a).unwrap();
        assert_eq!(scaled.tensor_elements(), 3);
        assert_eq!(scaled.pixel_as::<u8>(&[1]).unwrap(), vec![10, 10, 10]);
    }

    #[test]
    fn test_uint64_with_signed_promotes_to_float() {
        let big = Image::from_vec(&[2], Tensor::scalar(), vec![u64::MAX, 10]).unwrap();
        let offset = Image::from_vec(&[2], Tensor::scalar(), vec![-1i8, -20]).unwrap();
        let sum = big.add(&offset).unwrap();
        assert_eq!(sum.data_type(), DataType::F64);
        assert_eq!(sum.pixel_as::<f64>(&[0]).unwrap(), vec![u64::MAX as f64 - 1.0]);
        assert_eq!(sum.pixel_as::<f64>(&[1]).unwrap(), vec![-10.0]);
        assert_eq!(big.bitwise_and(&offset).unwrap().data_type(), DataType::I64);
    }

    #[test]
    fn test_in_place_through_view() {
        let a = u8_image(&[4], vec![1, 2, 3, 4]);
        let view = a.at(&[Range::new(2, 3, 1)]).unwrap();
        view.multiply_in_place(10u8).unwrap();
        assert_eq!(a.to_ndarray::<u8>().unwrap().into_raw_vec_and_offset().0, vec![1, 2, 30, 40]);
        let wide = u8_image(&[1, 2], vec![1, 2]);
        assert!(view.add_in_place(&wide).is_err());
    }

    #[test]
    fn test_comparisons() {
        let a = u8_image(&[4], vec![1, 100, 150, 99]);
        let mask = a.greater_equal(100u8).unwrap();
        assert_eq!(mask.data_type(), DataType::Bin);
        assert_eq!(
            mask.to_ndarray::<bool>().unwrap().into_raw_vec_and_offset().0,
            vec![false, true, true, false]
        );
        let c = Image::new(&[4], DataType::C64).unwrap();
        assert!(matches!(c.lesser(1.0f64), Err(DipError::UnsupportedDataType { .. })));
        assert!(c.equal(0.0f64).is_ok());
    }

    #[test]
    fn test_comparison_on_tensor_pixels_is_scalar() {
        let rgb = Image::from_vec(&[3], Tensor::vector(3), vec![100u8, 120, 140, 100, 50, 200, 0, 0, 0]).unwrap();
        let mask = rgb.greater_equal(100u8).unwrap();
        assert!(mask.is_scalar());
        assert_eq!(mask.sizes(), &[3]);
        assert_eq!(
            mask.to_ndarray::<bool>().unwrap().into_raw_vec_and_offset().0,
            vec![true, false, false]
        );
        let picked = rgb.copy_at(&mask).unwrap();
        assert_eq!(picked.pixel_as::<u8>(&[0]).unwrap(), vec![100, 120, 140]);

        let same = rgb.equal(&rgb.copy().unwrap()).unwrap();
        assert!(same.is_scalar());
        assert_eq!(same.pixel_as::<bool>(&[1]).unwrap(), vec![true]);
        let differs = rgb.not_equal([100u8, 50, 200]).unwrap();
        assert_eq!(
            differs.to_ndarray::<bool>().unwrap().into_raw_vec_and_offset().0,
            vec![true, false, true]
        );
    }

    #[test]
    fn test_bitwise() {
        let a = u8_image(&[2], vec![0b1100, 0xF0]);
        let and = a.bitwise_and(0b1010u8).unwrap();
        assert_eq!(and.pixel_as::<u8>(&[0]).unwrap(), vec![0b1000]);
        let not = a.bitwise_not().unwrap();
        assert_eq!(not.pixel_as::<u8>(&[1]).unwrap(), vec![0x0F]);
        let f = Image::new(&[2], DataType::F32).unwrap();
        assert!(f.bitwise_or(1u8).is_err());
        let m = a.greater(100u8).unwrap();
        assert_eq!(m.bitwise_not().unwrap().pixel_as::<bool>(&[0]).unwrap(), vec![true]);
    }
}
