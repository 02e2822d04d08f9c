//! Pixel data types and the clamp-cast rules between them.
//!
//! ## Conversion Rules
//!
//! | From \ To | binary | integer | float | complex |
//! |-----------|--------|---------|-------|---------|
//! | binary    | copy   | 0 / 1   | 0 / 1 | (0 / 1, 0) |
//! | integer   | `!= 0` | saturate | exact cast | (v, 0) |
//! | float     | `!= 0` | round half away from zero, saturate, NaN → 0 | cast | (v, 0) |
//! | complex   | `!= 0` | magnitude, then as float | magnitude | cast |
//!
//! Integer to integer conversions go through `i128`, so 64-bit values are
//! never routed through a lossy float.

use std::fmt;
use std::str::FromStr;

use num_complex::{Complex32, Complex64};
use serde::{Deserialize, Serialize};

use crate::error::DipError;

/// The fixed set of pixel data types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Bin,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    C32,
    C64,
}

impl DataType {
    /// Size of one sample in bytes.
    pub fn size_of(self) -> usize {
        match self {
            DataType::Bin | DataType::U8 | DataType::I8 => 1,
            DataType::U16 | DataType::I16 => 2,
            DataType::U32 | DataType::I32 | DataType::F32 => 4,
            DataType::U64 | DataType::I64 | DataType::F64 | DataType::C32 => 8,
            DataType::C64 => 16,
        }
    }

    pub fn is_binary(self) -> bool {
        self == DataType::Bin
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, DataType::U8 | DataType::U16 | DataType::U32 | DataType::U64)
    }

    pub fn is_signed_integer(self) -> bool {
        matches!(self, DataType::I8 | DataType::I16 | DataType::I32 | DataType::I64)
    }

    pub fn is_integer(self) -> bool {
        self.is_unsigned() || self.is_signed_integer()
    }

    pub fn is_float(self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, DataType::C32 | DataType::C64)
    }

    /// Canonical upper-case name, e.g. `"UINT8"`.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Bin => "BIN",
            DataType::U8 => "UINT8",
            DataType::U16 => "UINT16",
            DataType::U32 => "UINT32",
            DataType::U64 => "UINT64",
            DataType::I8 => "SINT8",
            DataType::I16 => "SINT16",
            DataType::I32 => "SINT32",
            DataType::I64 => "SINT64",
            DataType::F32 => "SFLOAT",
            DataType::F64 => "DFLOAT",
            DataType::C32 => "SCOMPLEX",
            DataType::C64 => "DCOMPLEX",
        }
    }

    /// Inclusive integer limits, `None` for non-integer types.
    pub fn integer_limits(self) -> Option<(i128, i128)> {
        let limits = match self {
            DataType::Bin => (0, 1),
            DataType::U8 => (0, u8::MAX as i128),
            DataType::U16 => (0, u16::MAX as i128),
            DataType::U32 => (0, u32::MAX as i128),
            DataType::U64 => (0, u64::MAX as i128),
            DataType::I8 => (i8::MIN as i128, i8::MAX as i128),
            DataType::I16 => (i16::MIN as i128, i16::MAX as i128),
            DataType::I32 => (i32::MIN as i128, i32::MAX as i128),
            DataType::I64 => (i64::MIN as i128, i64::MAX as i128),
            _ => return None,
        };
        Some(limits)
    }

    /// Data type for the result of an arithmetic operation on `self` and `other`.
    ///
    /// Complex wins over float, float over integer. 64-bit and 32-bit integers
    /// promote to double precision. Binary operands count as `UINT8`.
    pub fn suggest_arithmetic(self, other: DataType) -> DataType {
        let a = if self.is_binary() { DataType::U8 } else { self };
        let b = if other.is_binary() { DataType::U8 } else { other };
        let wide = |t: DataType| {
            matches!(
                t,
                DataType::F64 | DataType::C64 | DataType::U32 | DataType::U64 | DataType::I32 | DataType::I64
            )
        };
        if a.is_complex() || b.is_complex() {
            return if wide(a) || wide(b) { DataType::C64 } else { DataType::C32 };
        }
        if a.is_float() || b.is_float() {
            return if wide(a) || wide(b) { DataType::F64 } else { DataType::F32 };
        }
        if a == b {
            return a;
        }
        let size = a.size_of().max(b.size_of());
        if a.is_unsigned() && b.is_unsigned() {
            return match size {
                1 => DataType::U8,
                2 => DataType::U16,
                4 => DataType::U32,
                _ => DataType::U64,
            };
        }
        // Mixed signedness: the signed type must hold the unsigned operand.
        // No signed integer holds UINT64, so that pair goes to DFLOAT.
        let unsigned_size = [a, b]
            .iter()
            .filter(|t| t.is_unsigned())
            .map(|t| t.size_of() * 2)
            .max()
            .unwrap_or(0);
        match size.max(unsigned_size) {
            1 => DataType::I8,
            2 => DataType::I16,
            4 => DataType::I32,
            8 => DataType::I64,
            _ => DataType::F64,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = DipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dt = match s.to_ascii_lowercase().as_str() {
            "bin" | "binary" | "bool" => DataType::Bin,
            "uint8" | "u8" => DataType::U8,
            "uint16" | "u16" => DataType::U16,
            "uint32" | "u32" => DataType::U32,
            "uint64" | "u64" => DataType::U64,
            "sint8" | "int8" | "i8" => DataType::I8,
            "sint16" | "int16" | "i16" => DataType::I16,
            "sint32" | "int32" | "i32" => DataType::I32,
            "sint64" | "int64" | "i64" => DataType::I64,
            "sfloat" | "float32" | "f32" | "single" => DataType::F32,
            "dfloat" | "float64" | "f64" | "double" => DataType::F64,
            "scomplex" | "complex64" | "c32" => DataType::C32,
            "dcomplex" | "complex128" | "c64" => DataType::C64,
            _ => {
                return Err(DipError::TypeConversion(format!("unknown data type name '{s}'")));
            }
        };
        Ok(dt)
    }
}

// ============================================================================
// Sample: a type-erased single value
// ============================================================================

/// One sample value in the widest representation of its category.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    Int(i128),
    Float(f64),
    Complex(Complex64),
}

impl Sample {
    /// Real value of the sample; complex samples yield their magnitude.
    pub fn as_f64(self) -> f64 {
        match self {
            Sample::Int(v) => v as f64,
            Sample::Float(v) => v,
            Sample::Complex(c) => c.norm(),
        }
    }

    pub fn as_complex(self) -> Complex64 {
        match self {
            Sample::Int(v) => Complex64::new(v as f64, 0.0),
            Sample::Float(v) => Complex64::new(v, 0.0),
            Sample::Complex(c) => c,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Sample::Int(v) => v == 0,
            Sample::Float(v) => v == 0.0,
            Sample::Complex(c) => c.re == 0.0 && c.im == 0.0,
        }
    }

    /// Saturating conversion to an integer range; floats are rounded.
    fn to_clamped_int(self, lo: i128, hi: i128) -> i128 {
        match self {
            Sample::Int(v) => v.clamp(lo, hi),
            other => {
                let v = other.as_f64();
                if v.is_nan() {
                    0
                } else {
                    // `as` saturates for out-of-range floats.
                    (v.round() as i128).clamp(lo, hi)
                }
            }
        }
    }
}

impl From<bool> for Sample {
    fn from(v: bool) -> Self {
        Sample::Int(v as i128)
    }
}

// ============================================================================
// Pixel trait
// ============================================================================

/// A scalar type that can be stored in an image buffer.
pub trait Pixel: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    fn to_sample(self) -> Sample;

    /// Clamp-cast from any sample, following the rules in the module docs.
    fn from_sample(sample: Sample) -> Self;
}

impl Pixel for bool {
    const DATA_TYPE: DataType = DataType::Bin;

    fn to_sample(self) -> Sample {
        Sample::Int(self as i128)
    }

    fn from_sample(sample: Sample) -> Self {
        !sample.is_zero()
    }
}

macro_rules! impl_integer_pixel {
    ($($t:ty => $dt:ident),* $(,)?) => {
        $(
            impl Pixel for $t {
                const DATA_TYPE: DataType = DataType::$dt;

                fn to_sample(self) -> Sample {
                    Sample::Int(self as i128)
                }

                fn from_sample(sample: Sample) -> Self {
                    sample.to_clamped_int(<$t>::MIN as i128, <$t>::MAX as i128) as $t
                }
            }
        )*
    };
}

impl_integer_pixel!(
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
);

impl Pixel for f32 {
    const DATA_TYPE: DataType = DataType::F32;

    fn to_sample(self) -> Sample {
        Sample::Float(self as f64)
    }

    fn from_sample(sample: Sample) -> Self {
        sample.as_f64() as f32
    }
}

impl Pixel for f64 {
    const DATA_TYPE: DataType = DataType::F64;

    fn to_sample(self) -> Sample {
        Sample::Float(self)
    }

    fn from_sample(sample: Sample) -> Self {
        sample.as_f64()
    }
}

impl Pixel for Complex32 {
    const DATA_TYPE: DataType = DataType::C32;

    fn to_sample(self) -> Sample {
        Sample::Complex(Complex64::new(self.re as f64, self.im as f64))
    }

    fn from_sample(sample: Sample) -> Self {
        let c = sample.as_complex();
        Complex32::new(c.re as f32, c.im as f32)
    }
}

impl Pixel for Complex64 {
    const DATA_TYPE: DataType = DataType::C64;

    fn to_sample(self) -> Sample {
        Sample::Complex(self)
    }

    fn from_sample(sample: Sample) -> Self {
        sample.as_complex()
    }
}

/// Clamp-cast a value of one pixel type into another.
pub fn clamp_cast<S: Pixel, D: Pixel>(value: S) -> D {
    D::from_sample(value.to_sample())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_to_integer_rounds_and_saturates() {
        assert_eq!(clamp_cast::<f64, u8>(2.5), 3);
        assert_eq!(clamp_cast::<f64, u8>(2.49), 2);
        assert_eq!(clamp_cast::<f64, u8>(-7.0), 0);
        assert_eq!(clamp_cast::<f64, u8>(300.0), 255);
        assert_eq!(clamp_cast::<f64, i8>(-2.5), -3);
        assert_eq!(clamp_cast::<f32, i16>(f32::NAN), 0);
        assert_eq!(clamp_cast::<f64, i64>(1e300), i64::MAX);
    }

    #[test]
    fn test_integer_to_integer_is_exact_or_saturated() {
        assert_eq!(clamp_cast::<u64, i64>(u64::MAX), i64::MAX);
        assert_eq!(clamp_cast::<i64, u64>(-1), 0);
        assert_eq!(clamp_cast::<i64, i64>(i64::MAX - 1), i64::MAX - 1);
        assert_eq!(clamp_cast::<i32, u8>(200), 200);
    }

    #[test]
    fn test_complex_and_binary_rules() {
        let c = Complex64::new(3.0, 4.0);
        assert_eq!(clamp_cast::<Complex64, f64>(c), 5.0);
        assert_eq!(clamp_cast::<Complex64, u8>(c), 5);
        assert_eq!(clamp_cast::<f64, Complex32>(1.5), Complex32::new(1.5, 0.0));
        assert!(clamp_cast::<f64, bool>(0.1));
        assert!(!clamp_cast::<i32, bool>(0));
        assert_eq!(clamp_cast::<bool, f32>(true), 1.0);
    }

    #[test]
    fn test_names_round_trip_through_from_str() {
        for dt in [DataType::Bin, DataType::U16, DataType::I64, DataType::F32, DataType::C64] {
            assert_eq!(dt.name().parse::<DataType>().unwrap(), dt);
        }
        assert_eq!("u8".parse::<DataType>().unwrap(), DataType::U8);
        assert!("float16".parse::<DataType>().is_err());
    }

    #[test]
    fn test_suggest_arithmetic() {
        assert_eq!(DataType::U8.suggest_arithmetic(DataType::U8), DataType::U8);
        assert_eq!(DataType::U8.suggest_arithmetic(DataType::U16), DataType::U16);
        assert_eq!(DataType::U8.suggest_arithmetic(DataType::I8), DataType::I16);
        assert_eq!(DataType::U16.suggest_arithmetic(DataType::F32), DataType::F32);
        assert_eq!(DataType::I32.suggest_arithmetic(DataType::F32), DataType::F64);
        assert_eq!(DataType::F32.suggest_arithmetic(DataType::C32), DataType::C32);
        assert_eq!(DataType::F64.suggest_arithmetic(DataType::C32), DataType::C64);
        assert_eq!(DataType::Bin.suggest_arithmetic(DataType::Bin), DataType::U8);
        assert_eq!(DataType::U32.suggest_arithmetic(DataType::I8), DataType::I64);
        assert_eq!(DataType::U64.suggest_arithmetic(DataType::I8), DataType::F64);
        assert_eq!(DataType::I64.suggest_arithmetic(DataType::U64), DataType::F64);
        assert_eq!(DataType::U64.suggest_arithmetic(DataType::U8), DataType::U64);
    }
}
