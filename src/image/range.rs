//! Inclusive index ranges used for spatial and tensor slicing.
//!
//! A `Range` selects `start, start + step, ...` up to and including `stop`.
//! Negative `start`/`stop` count from the end of the axis, so the default
//! range `(0, -1, 1)` covers the whole axis. Traversal runs backwards when the
//! resolved `start` lies beyond `stop`; a negative `step` on an ascending pair
//! swaps the two ends, so `(0, -1, -1)` walks the full axis in reverse.

use serde::{Deserialize, Serialize};

use crate::error::{DipError, Result};

/// An inclusive `(start, stop, step)` range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: isize,
    pub stop: isize,
    pub step: isize,
}

impl Default for Range {
    fn default() -> Self {
        Range::all()
    }
}

impl From<isize> for Range {
    fn from(index: isize) -> Self {
        Range::single(index)
    }
}

impl From<(isize, isize)> for Range {
    fn from((start, stop): (isize, isize)) -> Self {
        Range::new(start, stop, 1)
    }
}

impl From<(isize, isize, isize)> for Range {
    fn from((start, stop, step): (isize, isize, isize)) -> Self {
        Range::new(start, stop, step)
    }
}

/// A range resolved against a concrete axis size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedRange {
    /// First selected index.
    pub offset: usize,
    /// Number of selected indices, always at least 1.
    pub size: usize,
    /// Signed distance between consecutive selected indices.
    pub step: isize,
}

impl Range {
    pub fn new(start: isize, stop: isize, step: isize) -> Self {
        Range { start, stop, step }
    }

    /// The whole axis.
    pub fn all() -> Self {
        Range::new(0, -1, 1)
    }

    /// A single index.
    pub fn single(index: isize) -> Self {
        Range::new(index, index, 1)
    }

    /// Resolve against an axis of `size` elements.
    ///
    /// # Errors
    /// `Index` if a normalized end point falls outside `[0, size)`,
    /// `InvalidParameter` for a zero step.
    pub fn resolve(&self, size: usize) -> Result<ResolvedRange> {
        if self.step == 0 {
            return Err(DipError::InvalidParameter("range step must be non-zero".into()));
        }
        let normalize = |index: isize| -> Result<usize> {
            let n = size as isize;
            let resolved = if index < 0 { index + n } else { index };
            if resolved < 0 || resolved >= n {
                return Err(DipError::index(index, size));
            }
            Ok(resolved as usize)
        };
        let mut start = normalize(self.start)?;
        let mut stop = normalize(self.stop)?;
        if self.step < 0 && start < stop {
            std::mem::swap(&mut start, &mut stop);
        }
        let magnitude = self.step.unsigned_abs();
        let count = 1 + start.abs_diff(stop) / magnitude;
        let step = if start > stop {
            -(magnitude as isize)
        } else {
            magnitude as isize
        };
        Ok(ResolvedRange {
            offset: start,
            size: count,
            step,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_range() {
        let r = Range::all().resolve(10).unwrap();
        assert_eq!(r, ResolvedRange { offset: 0, size: 10, step: 1 });
    }

    #[test]
    fn test_negative_indices_count_from_end() {
        let r = Range::new(4, -1, 1).resolve(20).unwrap();
        assert_eq!(r.offset, 4);
        assert_eq!(r.size, 16);
        let r = Range::single(-2).resolve(5).unwrap();
        assert_eq!((r.offset, r.size), (3, 1));
    }

    #[test]
    fn test_stepped_and_reversed() {
        let r = Range::new(1, 8, 3).resolve(10).unwrap();
        assert_eq!((r.offset, r.size, r.step), (1, 3, 3));
        let r = Range::new(8, 2, 2).resolve(10).unwrap();
        assert_eq!((r.offset, r.size, r.step), (8, 4, -2));
        let r = Range::new(0, -1, -1).resolve(5).unwrap();
        assert_eq!((r.offset, r.size, r.step), (4, 5, -1));
    }

    #[test]
    fn test_out_of_bounds_and_zero_step() {
        assert!(matches!(
            Range::new(0, 10, 1).resolve(10),
            Err(DipError::Index { index: 10, size: 10 })
        ));
        assert!(Range::single(-11).resolve(10).is_err());
        assert!(matches!(
            Range::new(0, 3, 0).resolve(10),
            Err(DipError::InvalidParameter(_))
        ));
    }
}
