//! Per-pixel tensor descriptor: how many channels a pixel has and how they are
//! arranged.

use serde::{Deserialize, Serialize};

use crate::error::{DipError, Result};

/// Arrangement of the tensor elements of a pixel.
///
/// Diagonal, symmetric and triangular matrices store only their non-redundant
/// elements: the diagonal first, then the off-diagonal elements of the upper
/// (or lower) triangle column by column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TensorShape {
    ColumnVector,
    RowVector,
    ColumnMajorMatrix,
    RowMajorMatrix,
    DiagonalMatrix,
    SymmetricMatrix,
    UpperTriangularMatrix,
    LowerTriangularMatrix,
}

/// Tensor descriptor of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tensor {
    shape: TensorShape,
    elements: usize,
    rows: usize,
}

impl Default for Tensor {
    fn default() -> Self {
        Tensor::scalar()
    }
}

impl Tensor {
    /// A single sample per pixel.
    pub fn scalar() -> Self {
        Tensor {
            shape: TensorShape::ColumnVector,
            elements: 1,
            rows: 1,
        }
    }

    /// A column vector of `n` elements (e.g. the channels of a color image).
    pub fn vector(n: usize) -> Self {
        Tensor {
            shape: TensorShape::ColumnVector,
            elements: n,
            rows: n,
        }
    }

    pub fn row_vector(n: usize) -> Self {
        Tensor {
            shape: TensorShape::RowVector,
            elements: n,
            rows: 1,
        }
    }

    /// A full `rows` x `columns` matrix stored column-major.
    pub fn matrix(rows: usize, columns: usize) -> Self {
        Tensor {
            shape: TensorShape::ColumnMajorMatrix,
            elements: rows * columns,
            rows,
        }
    }

    /// A full `rows` x `columns` matrix stored row-major.
    pub fn row_major_matrix(rows: usize, columns: usize) -> Self {
        Tensor {
            shape: TensorShape::RowMajorMatrix,
            elements: rows * columns,
            rows,
        }
    }

    pub fn diagonal(n: usize) -> Self {
        Tensor {
            shape: TensorShape::DiagonalMatrix,
            elements: n,
            rows: n,
        }
    }

    pub fn symmetric(n: usize) -> Self {
        Tensor {
            shape: TensorShape::SymmetricMatrix,
            elements: n * (n + 1) / 2,
            rows: n,
        }
    }

    pub fn upper_triangular(n: usize) -> Self {
        Tensor {
            shape: TensorShape::UpperTriangularMatrix,
            elements: n * (n + 1) / 2,
            rows: n,
        }
    }

    pub fn lower_triangular(n: usize) -> Self {
        Tensor {
            shape: TensorShape::LowerTriangularMatrix,
            elements: n * (n + 1) / 2,
            rows: n,
        }
    }

    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    /// Number of stored elements per pixel.
    pub fn elements(&self) -> usize {
        self.elements
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        match self.shape {
            TensorShape::ColumnVector => 1,
            TensorShape::RowVector => self.elements,
            TensorShape::ColumnMajorMatrix | TensorShape::RowMajorMatrix => self.elements / self.rows,
            _ => self.rows,
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.elements == 1
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.shape, TensorShape::ColumnVector | TensorShape::RowVector)
    }

    /// Storage index of the element at (`row`, `column`).
    ///
    /// Fails with an index error for positions outside the matrix and for the
    /// implicit zeros of diagonal and triangular shapes.
    pub fn index(&self, row: usize, column: usize) -> Result<usize> {
        let rows = self.rows;
        let columns = self.columns();
        if row >= rows {
            return Err(DipError::index(row as isize, rows));
        }
        if column >= columns {
            return Err(DipError::index(column as isize, columns));
        }
        // Off-diagonal element (r, c) with r < c of a packed triangle.
        let packed = |r: usize, c: usize| rows + c * (c - 1) / 2 + r;
        let implicit_zero = || {
            DipError::InvalidParameter(format!(
                "tensor element ({row}, {column}) is not stored for a {:?}",
                self.shape
            ))
        };
        let index = match self.shape {
            TensorShape::ColumnVector => row,
            TensorShape::RowVector => column,
            TensorShape::ColumnMajorMatrix => row + column * rows,
            TensorShape::RowMajorMatrix => row * columns + column,
            TensorShape::DiagonalMatrix => {
                if row != column {
                    return Err(implicit_zero());
                }
                row
            }
            TensorShape::SymmetricMatrix => {
                if row == column {
                    row
                } else {
                    packed(row.min(column), row.max(column))
                }
            }
            TensorShape::UpperTriangularMatrix => {
                if row == column {
                    row
                } else if row < column {
                    packed(row, column)
                } else {
                    return Err(implicit_zero());
                }
            }
            TensorShape::LowerTriangularMatrix => {
                if row == column {
                    row
                } else if row > column {
                    packed(column, row)
                } else {
                    return Err(implicit_zero());
                }
            }
        };
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_counts() {
        assert_eq!(Tensor::scalar().elements(), 1);
        assert_eq!(Tensor::vector(3).elements(), 3);
        assert_eq!(Tensor::matrix(2, 3).elements(), 6);
        assert_eq!(Tensor::matrix(2, 3).columns(), 3);
        assert_eq!(Tensor::symmetric(3).elements(), 6);
        assert_eq!(Tensor::diagonal(4).elements(), 4);
    }

    #[test]
    fn test_matrix_indexing() {
        let t = Tensor::matrix(2, 3);
        assert_eq!(t.index(1, 2).unwrap(), 5);
        let t = Tensor::row_major_matrix(2, 3);
        assert_eq!(t.index(1, 0).unwrap(), 3);
        assert!(t.index(2, 0).is_err());
    }

    #[test]
    fn test_packed_shapes() {
        // 3x3 symmetric: xx yy zz xy xz yz
        let t = Tensor::symmetric(3);
        assert_eq!(t.index(0, 0).unwrap(), 0);
        assert_eq!(t.index(2, 2).unwrap(), 2);
        assert_eq!(t.index(0, 1).unwrap(), 3);
        assert_eq!(t.index(1, 0).unwrap(), 3);
        assert_eq!(t.index(0, 2).unwrap(), 4);
        assert_eq!(t.index(2, 1).unwrap(), 5);

        let t = Tensor::upper_triangular(3);
        assert_eq!(t.index(1, 2).unwrap(), 5);
        assert!(t.index(2, 1).is_err());

        let t = Tensor::lower_triangular(3);
        assert_eq!(t.index(2, 1).unwrap(), 5);
        assert!(t.index(1, 2).is_err());

        assert!(Tensor::diagonal(3).index(0, 1).is_err());
    }
}
