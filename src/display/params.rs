//! Display options: range policy, complex-to-real mode, projection and axes.
//!
//! Every option is a closed enum parsed from its name with [`FromStr`]; unknown
//! names are rejected with [`DipError::InvalidParameter`]. [`DisplayParams`]
//! round-trips through serde so the CLI can read it from a JSON file:
//!
//! ```json
//! { "range": "percentile", "complex_mode": "phase", "projection": "slice",
//!   "coordinates": [0, 0, 12], "dim1": 0, "dim2": 1, "color_map": "grey" }
//! ```
//!
//! `range` also accepts an explicit pair such as `[0, 4095]`.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::colormap::ColorMap;
use crate::error::DipError;

// ============================================================================
// Range policy
// ============================================================================

/// How input intensities are mapped onto the output range `[0, 255]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RangeRepr", into = "RangeRepr")]
pub enum RangeMode {
    /// Explicit limits: `lower` maps to 0, `upper` to 255.
    Manual { lower: f64, upper: f64 },
    /// `[0, 1]`
    Unit,
    /// `[0, 255]`
    Normal,
    /// `[0, 4095]`
    Bits12,
    /// `[0, 65535]`
    Bits16,
    /// `[-128, 127]`
    SignedBits8,
    /// `[-2048, 2047]`
    SignedBits12,
    /// `[-32768, 32767]`
    SignedBits16,
    /// `[0, 2π)`, values wrapped modulo 2π.
    Angle,
    /// `[0, π)`, values wrapped modulo π.
    Orientation,
    /// Data minimum to data maximum.
    #[default]
    Linear,
    /// 5th to 95th percentile of the data.
    Percentile,
    /// Symmetric around zero: `[-b, b]` with `b = max(|min|, |max|)`.
    Based,
    /// Logarithmic compression of the data range.
    Log,
    /// Integer labels wrapped into `[1, 255]`, with 0 kept at 0.
    Modulo,
}

impl RangeMode {
    /// Limits that do not depend on the data, if any.
    pub fn fixed_limits(&self) -> Option<(f64, f64)> {
        let limits = match *self {
            RangeMode::Manual { lower, upper } => (lower, upper),
            RangeMode::Unit => (0.0, 1.0),
            RangeMode::Normal | RangeMode::Modulo => (0.0, 255.0),
            RangeMode::Bits12 => (0.0, 4095.0),
            RangeMode::Bits16 => (0.0, 65535.0),
            RangeMode::SignedBits8 => (-128.0, 127.0),
            RangeMode::SignedBits12 => (-2048.0, 2047.0),
            RangeMode::SignedBits16 => (-32768.0, 32767.0),
            RangeMode::Angle => (0.0, 2.0 * PI),
            RangeMode::Orientation => (0.0, PI),
            RangeMode::Linear | RangeMode::Percentile | RangeMode::Based | RangeMode::Log => return None,
        };
        Some(limits)
    }

    /// Period of the wrap applied before mapping, for cyclic quantities.
    pub fn period(&self) -> Option<f64> {
        match self {
            RangeMode::Angle => Some(2.0 * PI),
            RangeMode::Orientation => Some(PI),
            _ => None,
        }
    }

    /// Color map that best fits this range policy.
    pub fn suggested_color_map(&self) -> ColorMap {
        match self {
            RangeMode::Based => ColorMap::Diverging,
            RangeMode::Modulo => ColorMap::Label,
            RangeMode::Angle | RangeMode::Orientation => ColorMap::Cyclic,
            _ => ColorMap::Grey,
        }
    }

    /// Canonical name; `None` for explicit limits.
    pub fn name(&self) -> Option<&'static str> {
        let name = match self {
            RangeMode::Manual { .. } => return None,
            RangeMode::Unit => "unit",
            RangeMode::Normal => "8bit",
            RangeMode::Bits12 => "12bit",
            RangeMode::Bits16 => "16bit",
            RangeMode::SignedBits8 => "s8bit",
            RangeMode::SignedBits12 => "s12bit",
            RangeMode::SignedBits16 => "s16bit",
            RangeMode::Angle => "angle",
            RangeMode::Orientation => "orientation",
            RangeMode::Linear => "lin",
            RangeMode::Percentile => "percentile",
            RangeMode::Based => "based",
            RangeMode::Log => "log",
            RangeMode::Modulo => "modulo",
        };
        Some(name)
    }
}

impl FromStr for RangeMode {
    type Err = DipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s {
            "unit" => RangeMode::Unit,
            "normal" | "8bit" => RangeMode::Normal,
            "12bit" => RangeMode::Bits12,
            "16bit" => RangeMode::Bits16,
            "s8bit" => RangeMode::SignedBits8,
            "s12bit" => RangeMode::SignedBits12,
            "s16bit" => RangeMode::SignedBits16,
            "angle" => RangeMode::Angle,
            "orientation" => RangeMode::Orientation,
            "lin" | "linear" | "all" => RangeMode::Linear,
            "percentile" => RangeMode::Percentile,
            "base" | "based" => RangeMode::Based,
            "log" => RangeMode::Log,
            "modulo" | "labels" => RangeMode::Modulo,
            // "lower,upper" gives explicit limits.
            _ => match s.split_once(',').map(|(a, b)| (a.trim().parse(), b.trim().parse())) {
                Some((Ok(lower), Ok(upper))) => RangeMode::Manual { lower, upper },
                _ => return Err(DipError::InvalidParameter(format!("unknown range mode '{s}'"))),
            },
        };
        Ok(mode)
    }
}

impl fmt::Display for RangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.name()) {
            (_, Some(name)) => f.write_str(name),
            (RangeMode::Manual { lower, upper }, None) => write!(f, "[{lower}, {upper}]"),
            _ => Ok(()),
        }
    }
}

/// Serialized form of [`RangeMode`]: a name or a `[lower, upper]` pair.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RangeRepr {
    Named(String),
    Limits([f64; 2]),
}

impl TryFrom<RangeRepr> for RangeMode {
    type Error = DipError;

    fn try_from(repr: RangeRepr) -> Result<Self, Self::Error> {
        match repr {
            RangeRepr::Named(name) => name.parse(),
            RangeRepr::Limits([lower, upper]) => Ok(RangeMode::Manual { lower, upper }),
        }
    }
}

impl From<RangeMode> for RangeRepr {
    fn from(mode: RangeMode) -> Self {
        match (mode, mode.name()) {
            (_, Some(name)) => RangeRepr::Named(name.to_string()),
            (RangeMode::Manual { lower, upper }, None) => RangeRepr::Limits([lower, upper]),
            _ => RangeRepr::Named(String::new()),
        }
    }
}

// ============================================================================
// Complex and projection modes
// ============================================================================

/// Reduction of complex samples to real values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ComplexMode {
    #[default]
    Magnitude,
    Phase,
    Real,
    Imag,
}

impl FromStr for ComplexMode {
    type Err = DipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abs" | "mag" | "magnitude" => Ok(ComplexMode::Magnitude),
            "phase" => Ok(ComplexMode::Phase),
            "real" => Ok(ComplexMode::Real),
            "imag" => Ok(ComplexMode::Imag),
            _ => Err(DipError::InvalidParameter(format!("unknown complex mode '{s}'"))),
        }
    }
}

impl fmt::Display for ComplexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComplexMode::Magnitude => "abs",
            ComplexMode::Phase => "phase",
            ComplexMode::Real => "real",
            ComplexMode::Imag => "imag",
        })
    }
}

/// How dimensions that are not displayed are collapsed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProjectionMode {
    /// The plane through `coordinates`.
    Slice,
    /// Maximum along collapsed dimensions (maximum magnitude for complex data).
    Max,
    /// Mean along collapsed dimensions.
    #[default]
    Mean,
}

impl FromStr for ProjectionMode {
    type Err = DipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "slice" => Ok(ProjectionMode::Slice),
            "max" => Ok(ProjectionMode::Max),
            "mean" => Ok(ProjectionMode::Mean),
            _ => Err(DipError::InvalidProjection(format!("unknown projection mode '{s}'"))),
        }
    }
}

impl fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProjectionMode::Slice => "slice",
            ProjectionMode::Max => "max",
            ProjectionMode::Mean => "mean",
        })
    }
}

macro_rules! string_conversions {
    ($($t:ty),*) => {
        $(
            impl TryFrom<String> for $t {
                type Error = DipError;

                fn try_from(s: String) -> Result<Self, Self::Error> {
                    s.parse()
                }
            }

            impl From<$t> for String {
                fn from(value: $t) -> String {
                    value.to_string()
                }
            }
        )*
    };
}

string_conversions!(ComplexMode, ProjectionMode, ColorMap);

// ============================================================================
// DisplayParams
// ============================================================================

/// Complete set of display options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayParams {
    pub range: RangeMode,
    #[serde(alias = "complexMode")]
    pub complex_mode: ComplexMode,
    #[serde(alias = "projectionMode")]
    pub projection: ProjectionMode,
    /// Point the slice passes through. Empty means the origin.
    pub coordinates: Vec<usize>,
    /// Axis shown horizontally.
    pub dim1: usize,
    /// Axis shown vertically; `None` produces a 1-D profile along `dim1`.
    pub dim2: Option<usize>,
    /// Color map for rendering; `None` uses the range's suggestion.
    #[serde(alias = "colormap")]
    pub color_map: Option<ColorMap>,
}

impl Default for DisplayParams {
    fn default() -> Self {
        DisplayParams {
            range: RangeMode::default(),
            complex_mode: ComplexMode::default(),
            projection: ProjectionMode::default(),
            coordinates: Vec::new(),
            dim1: 0,
            dim2: Some(1),
            color_map: None,
        }
    }
}

impl DisplayParams {
    /// The explicit color map, or the one suggested by the range policy.
    pub fn effective_color_map(&self) -> ColorMap {
        self.color_map.unwrap_or_else(|| self.range.suggested_color_map())
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        serde_json::from_str(json).map_err(|e| DipError::InvalidParameter(format!("display parameters: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_aliases() {
        assert_eq!("all".parse::<RangeMode>().unwrap(), RangeMode::Linear);
        assert_eq!("labels".parse::<RangeMode>().unwrap(), RangeMode::Modulo);
        assert_eq!("base".parse::<RangeMode>().unwrap(), RangeMode::Based);
        assert_eq!("normal".parse::<RangeMode>().unwrap(), RangeMode::Normal);
        assert!(matches!("bright".parse::<RangeMode>(), Err(DipError::InvalidParameter(_))));
        assert_eq!(
            "-1, 2.5".parse::<RangeMode>().unwrap(),
            RangeMode::Manual { lower: -1.0, upper: 2.5 }
        );
        assert!("1,x".parse::<RangeMode>().is_err());
    }

    #[test]
    fn test_fixed_limits() {
        assert_eq!(RangeMode::SignedBits12.fixed_limits(), Some((-2048.0, 2047.0)));
        assert_eq!(RangeMode::Orientation.fixed_limits(), Some((0.0, PI)));
        assert_eq!(RangeMode::Percentile.fixed_limits(), None);
        assert_eq!(RangeMode::Angle.period(), Some(2.0 * PI));
    }

    #[test]
    fn test_suggested_color_maps() {
        assert_eq!(RangeMode::Based.suggested_color_map(), ColorMap::Diverging);
        assert_eq!(RangeMode::Modulo.suggested_color_map(), ColorMap::Label);
        assert_eq!(RangeMode::Angle.suggested_color_map(), ColorMap::Cyclic);
        assert_eq!(RangeMode::Unit.suggested_color_map(), ColorMap::Grey);
    }

    #[test]
    fn test_complex_and_projection_names() {
        assert_eq!("mag".parse::<ComplexMode>().unwrap(), ComplexMode::Magnitude);
        assert_eq!("imag".parse::<ComplexMode>().unwrap(), ComplexMode::Imag);
        assert!("angle".parse::<ComplexMode>().is_err());
        assert_eq!("max".parse::<ProjectionMode>().unwrap(), ProjectionMode::Max);
        assert!(matches!("sum".parse::<ProjectionMode>(), Err(DipError::InvalidProjection(_))));
    }

    #[test]
    fn test_params_from_json() {
        let params = DisplayParams::from_json(
            r#"{ "range": [0, 4095], "complexMode": "phase", "projection": "slice", "coordinates": [0, 0, 3] }"#,
        )
        .unwrap();
        assert_eq!(params.range, RangeMode::Manual { lower: 0.0, upper: 4095.0 });
        assert_eq!(params.complex_mode, ComplexMode::Phase);
        assert_eq!(params.projection, ProjectionMode::Slice);
        assert_eq!(params.dim2, Some(1));

        let params = DisplayParams::from_json(r#"{ "range": "labels", "dim2": null }"#).unwrap();
        assert_eq!(params.range, RangeMode::Modulo);
        assert_eq!(params.dim2, None);
        assert_eq!(params.effective_color_map(), ColorMap::Label);

        assert!(DisplayParams::from_json(r#"{ "range": "bright" }"#).is_err());
    }

    #[test]
    fn test_params_json_round_trip() {
        let params = DisplayParams {
            range: RangeMode::Manual { lower: -1.0, upper: 1.0 },
            color_map: Some(ColorMap::Diverging),
            ..DisplayParams::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(DisplayParams::from_json(&json).unwrap(), params);
    }
}
