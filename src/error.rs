//! Error taxonomy shared by the image container, the display mapper and the
//! I/O collaborators.
//!
//! Every error is reported synchronously to the immediate caller. Nothing in
//! this crate retries internally, and a failing operation never leaves a
//! partially mutated image behind.

use std::path::PathBuf;

use crate::image::DataType;

/// Errors produced by image construction, indexing, conversion and display.
#[derive(Debug, thiserror::Error)]
pub enum DipError {
    /// The requested buffer is zero-sized, zero-dimensional or too large.
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// An index fell outside `[0, size)` after negative-index normalization.
    #[error("index {index} out of range for axis of size {size}")]
    Index { index: isize, size: usize },

    /// Two images (or an image and a coordinate/range list) have incompatible sizes.
    #[error("dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch { expected: Vec<usize>, found: Vec<usize> },

    /// A value list does not have the length the operation requires.
    #[error("length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// The number of tensor elements does not match.
    #[error("tensor element count mismatch: expected {expected}, found {found}")]
    TensorMismatch { expected: usize, found: usize },

    /// A conversion between data types is not possible.
    #[error("invalid type conversion: {0}")]
    TypeConversion(String),

    /// The operation is not defined for this data type.
    #[error("{operation} is not supported for data type {data_type}")]
    UnsupportedDataType {
        operation: &'static str,
        data_type: DataType,
    },

    /// A display axis is out of bounds or duplicated.
    #[error("invalid axis: {0}")]
    InvalidAxis(String),

    /// The projection parameters do not fit the image.
    #[error("invalid projection: {0}")]
    InvalidProjection(String),

    /// There is nothing to operate on.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// An option name or numeric parameter was rejected.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An external decoder failed or no decoder handles the file.
    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// Writing an output file failed.
    #[error("failed to encode {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, DipError>;

impl DipError {
    pub(crate) fn index(index: isize, size: usize) -> Self {
        DipError::Index { index, size }
    }

    pub(crate) fn sizes(expected: &[usize], found: &[usize]) -> Self {
        DipError::DimensionMismatch {
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}
