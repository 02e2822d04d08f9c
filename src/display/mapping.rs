//! Intensity mapping from real sample values to 8-bit display values.
//!
//! ## Scalings
//!
//! - **linear**: `lower` maps to 0 and `upper` to 255
//! - **log**: `[lower, upper]` is first stretched onto `[1, 1000]`, then the
//!   natural logarithm is scaled so that 1000 maps to 255
//! - **modulo**: integer values are wrapped into `[1, 255]`, 0 stays 0
//!
//! Results are rounded to the nearest integer and saturated; NaN maps to 0.

use rayon::prelude::*;
use serde::Serialize;

use super::params::{ComplexMode, RangeMode};
use crate::image::{clamp_cast, Sample};

/// Percentiles used by the `percentile` range policy.
const LOWER_PERCENTILE: f64 = 5.0;
const UPPER_PERCENTILE: f64 = 95.0;

/// Dynamic range of the `log` scaling.
const LOG_RANGE: f64 = 1000.0;

/// Input values mapped to 0 and 255.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Limits {
    pub lower: f64,
    pub upper: f64,
}

impl Limits {
    pub fn new(lower: f64, upper: f64) -> Self {
        Limits { lower, upper }
    }
}

/// Reduce samples to real values.
pub(crate) fn real_values(samples: &[Sample], mode: ComplexMode) -> Vec<f64> {
    samples
        .par_iter()
        .map(|&s| match s {
            Sample::Complex(c) => match mode {
                ComplexMode::Magnitude => c.norm(),
                ComplexMode::Phase => c.arg(),
                ComplexMode::Real => c.re,
                ComplexMode::Imag => c.im,
            },
            other => other.as_f64(),
        })
        .collect()
}

/// Rank of the `percentile`-th value in a sorted list of `n` values.
///
/// Percentiles above 50 are counted from the top so that the 5th and 95th
/// percentiles sit symmetrically in the list.
fn rank_from_percentile(percentile: f64, n: usize) -> usize {
    if percentile > 50.0 {
        return n - 1 - rank_from_percentile(100.0 - percentile, n);
    }
    let rank = (percentile / 100.0 * (n - 1) as f64 + 0.5).floor();
    (rank.max(0.0) as usize).min(n - 1)
}

/// Limits derived from the data for a range policy.
///
/// NaN values are ignored. When no finite limit can be found the lower limit
/// defaults to 0 and the upper to 255.
pub(crate) fn data_limits(values: &[f64], range: RangeMode) -> Limits {
    if let Some((lower, upper)) = range.fixed_limits() {
        return Limits::new(lower, upper);
    }
    let mut valid: Vec<f64> = values.par_iter().copied().filter(|v| !v.is_nan()).collect();
    let (lower, upper) = if valid.is_empty() {
        (f64::NAN, f64::NAN)
    } else if range == RangeMode::Percentile {
        valid.par_sort_unstable_by(f64::total_cmp);
        let n = valid.len();
        (
            valid[rank_from_percentile(LOWER_PERCENTILE, n)],
            valid[rank_from_percentile(UPPER_PERCENTILE, n)],
        )
    } else {
        valid
            .par_iter()
            .fold(
                || (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), &v| (lo.min(v), hi.max(v)),
            )
            .reduce(
                || (f64::INFINITY, f64::NEG_INFINITY),
                |a, b| (a.0.min(b.0), a.1.max(b.1)),
            )
    };
    let (lower, upper) = if range == RangeMode::Based {
        let bound = lower.abs().max(upper.abs());
        (-bound, bound)
    } else {
        (lower, upper)
    };
    Limits::new(
        if lower.is_nan() { 0.0 } else { lower },
        if upper.is_nan() { 255.0 } else { upper },
    )
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Kind {
    Linear,
    Log,
    Modulo,
}

/// Affine part of the mapping plus the curve applied after it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Scaling {
    kind: Kind,
    scale: f64,
    offset: f64,
    period: Option<f64>,
}

impl Scaling {
    pub(crate) fn new(range: RangeMode, limits: Limits) -> Self {
        let lower = limits.lower;
        // A flat range would divide by zero.
        let upper = if limits.upper == limits.lower { lower + 1.0 } else { limits.upper };
        let period = range.period();
        match range {
            RangeMode::Modulo => Scaling { kind: Kind::Modulo, scale: 1.0, offset: 0.0, period },
            RangeMode::Log => {
                let scale = (LOG_RANGE - 1.0) / (upper - lower);
                Scaling {
                    kind: Kind::Log,
                    scale,
                    offset: 1.0 - lower * scale,
                    period,
                }
            }
            _ => {
                let scale = 255.0 / (upper - lower);
                Scaling {
                    kind: Kind::Linear,
                    scale,
                    offset: -lower * scale,
                    period,
                }
            }
        }
    }

    /// Display value of one real input value.
    pub(crate) fn map(&self, value: f64) -> u8 {
        let value = match self.period {
            Some(period) => value.rem_euclid(period),
            None => value,
        };
        match self.kind {
            Kind::Linear => clamp_cast(value * self.scale + self.offset),
            Kind::Log => {
                let stretched = value * self.scale + self.offset;
                clamp_cast(stretched.ln() * 255.0 / LOG_RANGE.ln())
            }
            Kind::Modulo => {
                if value.is_nan() || value < 1.0 {
                    return 0;
                }
                // Saturating float to integer conversion.
                let label = value as u64;
                ((label - 1) % 255 + 1) as u8
            }
        }
    }

    /// Map all values in parallel.
    pub(crate) fn map_all(&self, values: &[f64]) -> Vec<u8> {
        values.par_iter().map(|&v| self.map(v)).collect()
    }
}

/// Binary samples are shown as 0 or 255 whatever the range.
pub(crate) fn map_binary(samples: &[Sample]) -> Vec<u8> {
    samples.par_iter().map(|s| if s.is_zero() { 0 } else { 255 }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;
    use std::f64::consts::PI;

    #[test]
    fn test_linear_mapping() {
        let s = Scaling::new(RangeMode::Linear, Limits::new(10.0, 20.0));
        assert_eq!(s.map(10.0), 0);
        assert_eq!(s.map(20.0), 255);
        assert_eq!(s.map(15.0), 128);
        assert_eq!(s.map(-5.0), 0);
        assert_eq!(s.map(99.0), 255);
        assert_eq!(s.map(f64::NAN), 0);
    }

    #[test]
    fn test_inverted_and_flat_limits() {
        let inverted = Scaling::new(RangeMode::Manual { lower: 255.0, upper: 0.0 }, Limits::new(255.0, 0.0));
        assert_eq!(inverted.map(0.0), 255);
        assert_eq!(inverted.map(255.0), 0);

        let flat = Scaling::new(RangeMode::Linear, Limits::new(7.0, 7.0));
        assert_eq!(flat.map(7.0), 0);
        assert_eq!(flat.map(8.0), 255);
    }

    #[test]
    fn test_log_mapping() {
        let s = Scaling::new(RangeMode::Log, Limits::new(0.0, 999.0));
        assert_eq!(s.map(0.0), 0);
        assert_eq!(s.map(999.0), 255);
        // ln(100) / ln(1000) = 2/3
        assert_eq!(s.map(99.0), 170);
        assert_eq!(s.map(-10.0), 0);
    }

    #[test]
    fn test_modulo_mapping() {
        let s = Scaling::new(RangeMode::Modulo, Limits::new(0.0, 255.0));
        assert_eq!(s.map(0.0), 0);
        assert_eq!(s.map(1.0), 1);
        assert_eq!(s.map(255.0), 255);
        assert_eq!(s.map(256.0), 1);
        assert_eq!(s.map(510.0), 255);
        assert_eq!(s.map(-3.0), 0);
    }

    #[test]
    fn test_angle_wraps() {
        let limits = Limits::new(0.0, 2.0 * PI);
        let s = Scaling::new(RangeMode::Angle, limits);
        assert_eq!(s.map(PI / 2.0), 64);
        assert_eq!(s.map(-1.5 * PI), 64);
        assert_eq!(s.map(2.5 * PI), 64);
    }

    #[test]
    fn test_data_limits() {
        let values = [3.0, -1.0, f64::NAN, 8.0];
        assert_eq!(data_limits(&values, RangeMode::Linear), Limits::new(-1.0, 8.0));
        assert_eq!(data_limits(&values, RangeMode::Log), Limits::new(-1.0, 8.0));
        assert_eq!(data_limits(&values, RangeMode::Based), Limits::new(-8.0, 8.0));
        assert_eq!(data_limits(&values, RangeMode::Bits12), Limits::new(0.0, 4095.0));
        assert_eq!(data_limits(&values, RangeMode::Modulo), Limits::new(0.0, 255.0));
        assert_eq!(data_limits(&[f64::NAN], RangeMode::Linear), Limits::new(0.0, 255.0));
    }

    #[test]
    fn test_percentile_limits() {
        let values: Vec<f64> = (0..101).rev().map(f64::from).collect();
        assert_eq!(data_limits(&values, RangeMode::Percentile), Limits::new(5.0, 95.0));
        assert_eq!(rank_from_percentile(5.0, 10), 0);
        assert_eq!(rank_from_percentile(95.0, 10), 9);
        assert_eq!(rank_from_percentile(50.0, 1), 0);
    }

    #[test]
    fn test_complex_reduction() {
        let samples = [Sample::Complex(Complex64::new(3.0, 4.0)), Sample::Int(2)];
        assert_eq!(real_values(&samples, ComplexMode::Magnitude), vec![5.0, 2.0]);
        assert_eq!(real_values(&samples, ComplexMode::Real), vec![3.0, 2.0]);
        assert_eq!(real_values(&samples, ComplexMode::Imag), vec![4.0, 2.0]);
        let phase = real_values(&samples, ComplexMode::Phase);
        assert!((phase[0] - (4.0f64).atan2(3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_binary_mapping() {
        let samples = [Sample::Int(0), Sample::Int(1)];
        assert_eq!(map_binary(&samples), vec![0, 255]);
    }
}
