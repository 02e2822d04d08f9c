//! Typed pixel storage and the shared handle that views hold on to.

use std::cell::RefCell;
use std::rc::Rc;

use num_complex::{Complex32, Complex64};
use rayon::prelude::*;

use super::datatype::{DataType, Pixel, Sample};
use crate::error::{DipError, Result};

/// Contiguous storage for the samples of one or more images.
#[derive(Clone, Debug, PartialEq)]
pub enum Buffer {
    Bin(Vec<bool>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    C32(Vec<Complex32>),
    C64(Vec<Complex64>),
}

/// Shared ownership of a buffer. The buffer lives as long as its longest holder.
pub type SharedBuffer = Rc<RefCell<Buffer>>;

/// Run `$body` with `$v` bound to the typed vector inside a buffer.
macro_rules! with_buffer {
    ($buffer:expr, $v:ident => $body:expr) => {
        match $buffer {
            Buffer::Bin($v) => $body,
            Buffer::U8($v) => $body,
            Buffer::U16($v) => $body,
            Buffer::U32($v) => $body,
            Buffer::U64($v) => $body,
            Buffer::I8($v) => $body,
            Buffer::I16($v) => $body,
            Buffer::I32($v) => $body,
            Buffer::I64($v) => $body,
            Buffer::F32($v) => $body,
            Buffer::F64($v) => $body,
            Buffer::C32($v) => $body,
            Buffer::C64($v) => $body,
        }
    };
}

fn zeroed<T: Pixel>(len: usize) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|e| {
        DipError::Allocation(format!("cannot reserve {len} samples of {}: {e}", T::DATA_TYPE))
    })?;
    data.resize(len, T::default());
    Ok(data)
}

impl Buffer {
    /// Allocate `len` zero-initialized samples.
    pub fn allocate(data_type: DataType, len: usize) -> Result<Buffer> {
        let limit = isize::MAX as usize / data_type.size_of();
        if len > limit {
            return Err(DipError::Allocation(format!(
                "{len} samples of {data_type} exceed addressable memory"
            )));
        }
        let buffer = match data_type {
            DataType::Bin => Buffer::Bin(zeroed(len)?),
            DataType::U8 => Buffer::U8(zeroed(len)?),
            DataType::U16 => Buffer::U16(zeroed(len)?),
            DataType::U32 => Buffer::U32(zeroed(len)?),
            DataType::U64 => Buffer::U64(zeroed(len)?),
            DataType::I8 => Buffer::I8(zeroed(len)?),
            DataType::I16 => Buffer::I16(zeroed(len)?),
            DataType::I32 => Buffer::I32(zeroed(len)?),
            DataType::I64 => Buffer::I64(zeroed(len)?),
            DataType::F32 => Buffer::F32(zeroed(len)?),
            DataType::F64 => Buffer::F64(zeroed(len)?),
            DataType::C32 => Buffer::C32(zeroed(len)?),
            DataType::C64 => Buffer::C64(zeroed(len)?),
        };
        Ok(buffer)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Buffer::Bin(_) => DataType::Bin,
            Buffer::U8(_) => DataType::U8,
            Buffer::U16(_) => DataType::U16,
            Buffer::U32(_) => DataType::U32,
            Buffer::U64(_) => DataType::U64,
            Buffer::I8(_) => DataType::I8,
            Buffer::I16(_) => DataType::I16,
            Buffer::I32(_) => DataType::I32,
            Buffer::I64(_) => DataType::I64,
            Buffer::F32(_) => DataType::F32,
            Buffer::F64(_) => DataType::F64,
            Buffer::C32(_) => DataType::C32,
            Buffer::C64(_) => DataType::C64,
        }
    }

    pub fn len(&self) -> usize {
        with_buffer!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the sample at `offset`.
    pub fn sample(&self, offset: usize) -> Sample {
        with_buffer!(self, v => v[offset].to_sample())
    }

    /// Clamp-cast `sample` into the buffer at `offset`.
    pub fn set_sample(&mut self, offset: usize, sample: Sample) {
        with_buffer!(self, v => v[offset] = Pixel::from_sample(sample))
    }

    /// Read the samples at the given offsets, in order.
    pub fn gather(&self, offsets: &[usize]) -> Vec<Sample> {
        with_buffer!(self, v => offsets.iter().map(|&o| v[o].to_sample()).collect())
    }

    /// Read the samples at the given offsets as values of type `T`.
    pub fn gather_as<T: Pixel>(&self, offsets: &[usize]) -> Vec<T> {
        with_buffer!(self, v => offsets.iter().map(|&o| T::from_sample(v[o].to_sample())).collect())
    }

    /// Clamp-cast a run of samples into a new buffer of `data_type`.
    pub fn from_samples(data_type: DataType, samples: &[Sample]) -> Result<Buffer> {
        let mut buffer = Buffer::allocate(data_type, samples.len())?;
        with_buffer!(&mut buffer, v => {
            v.par_iter_mut()
                .zip(samples.par_iter())
                .for_each(|(d, &s)| *d = Pixel::from_sample(s));
        });
        Ok(buffer)
    }

    /// Copy the samples at `offsets` into a new contiguous buffer of the same type.
    pub fn select(&self, offsets: &[usize]) -> Buffer {
        with_buffer!(self, v => {
            let data: Vec<_> = offsets.iter().map(|&o| v[o]).collect();
            BufferElement::wrap(data)
        })
    }

    /// Write `samples[i]` to `offsets[i]`.
    pub fn scatter(&mut self, offsets: &[usize], samples: &[Sample]) {
        with_buffer!(self, v => {
            for (&o, &s) in offsets.iter().zip(samples) {
                v[o] = Pixel::from_sample(s);
            }
        })
    }
}

/// Typed access to the vector stored inside a [`Buffer`].
pub trait BufferElement: Pixel {
    fn wrap(data: Vec<Self>) -> Buffer;
    fn unwrap_ref(buffer: &Buffer) -> Option<&[Self]>;
}

macro_rules! impl_buffer_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl BufferElement for $t {
                fn wrap(data: Vec<Self>) -> Buffer {
                    Buffer::$variant(data)
                }

                fn unwrap_ref(buffer: &Buffer) -> Option<&[Self]> {
                    match buffer {
                        Buffer::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_buffer_element!(
    bool => Bin, u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    f32 => F32, f64 => F64, Complex32 => C32, Complex64 => C64,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_zeroed_and_typed() {
        let buffer = Buffer::allocate(DataType::I16, 6).unwrap();
        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.data_type(), DataType::I16);
        assert_eq!(buffer.sample(5), Sample::Int(0));
    }

    #[test]
    fn test_allocate_rejects_unaddressable_sizes() {
        let err = Buffer::allocate(DataType::C64, usize::MAX / 2).unwrap_err();
        assert!(matches!(err, DipError::Allocation(_)));
    }

    #[test]
    fn test_set_sample_clamps_to_buffer_type() {
        let mut buffer = Buffer::allocate(DataType::U8, 2).unwrap();
        buffer.set_sample(0, Sample::Float(-3.0));
        buffer.set_sample(1, Sample::Int(1000));
        assert_eq!(buffer, Buffer::U8(vec![0, 255]));
    }

    #[test]
    fn test_scatter_then_gather() {
        let mut buffer = Buffer::allocate(DataType::F32, 4).unwrap();
        buffer.scatter(&[3, 1], &[Sample::Float(1.5), Sample::Int(2)]);
        assert_eq!(buffer.gather_as::<f64>(&[1, 3]), vec![2.0, 1.5]);
        assert_eq!(f32::unwrap_ref(&buffer), Some(&[0.0, 2.0, 0.0, 1.5][..]));
    }

    #[test]
    fn test_select_and_from_samples() {
        let buffer = Buffer::I16(vec![10, 20, 30, 40]);
        assert_eq!(buffer.select(&[3, 0]), Buffer::I16(vec![40, 10]));
        let converted = Buffer::from_samples(DataType::U8, &[Sample::Int(-5), Sample::Float(7.6)]).unwrap();
        assert_eq!(converted, Buffer::U8(vec![0, 8]));
    }
}
