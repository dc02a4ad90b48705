//! Transfer functions mapping physical values to 8-bit display intensity.

use core::fmt;
use core::str::FromStr;

use alloc::string::String;

use crate::error::Error;

/// Curvature of the logarithmic stretch. Larger values brighten faint pixels more.
pub const LOG_STRETCH: f64 = 1000.0;

/// Display stretch applied between the low and high cuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScaleType {
    #[default]
    Linear,
    Log,
    /// Square of the normalized value.
    Power,
    SquareRoot,
}

impl ScaleType {
    pub const ALL: [ScaleType; 4] = [
        ScaleType::Linear,
        ScaleType::Log,
        ScaleType::Power,
        ScaleType::SquareRoot,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScaleType::Linear => "linear",
            ScaleType::Log => "log",
            ScaleType::Power => "power",
            ScaleType::SquareRoot => "sqrt",
        }
    }

    /// Apply the curve to a normalized value `t` in `[0, 1]`.
    ///
    /// Every curve maps 0 to 0 and 1 to 1 and is non-decreasing.
    pub fn transfer(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            ScaleType::Linear => t,
            ScaleType::Log => libm::log(1.0 + LOG_STRETCH * t) / libm::log(1.0 + LOG_STRETCH),
            ScaleType::Power => t * t,
            ScaleType::SquareRoot => libm::sqrt(t),
        }
    }
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScaleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(ScaleType::Linear),
            "log" => Ok(ScaleType::Log),
            "power" | "pow" => Ok(ScaleType::Power),
            "sqrt" | "squareroot" => Ok(ScaleType::SquareRoot),
            _ => Err(Error::InvalidValue {
                keyword: "scale type",
                value: String::from(s),
            }),
        }
    }
}

/// Maps physical values in a `[min, max]` window to `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleMapper {
    scale: ScaleType,
    min: f64,
    max: f64,
}

impl ScaleMapper {
    pub fn new(scale: ScaleType, min: f64, max: f64) -> Self {
        Self { scale, min, max }
    }

    pub fn scale(&self) -> ScaleType {
        self.scale
    }

    /// Display index for a physical value; `min` maps to 0 and `max` to 255.
    ///
    /// Values outside the window clamp. A window with `max < min` renders
    /// inverted. With an empty window (`max == min`), values at or above `max`
    /// map to 255 and everything else to 0. NaN maps to 0.
    pub fn map(&self, value: f64) -> u8 {
        if value.is_nan() {
            return 0;
        }
        let range = self.max - self.min;
        if range == 0.0 || range.is_nan() {
            return if value >= self.max { 255 } else { 0 };
        }
        let scaled = 255.0 * self.scale.transfer((value - self.min) / range);
        scaled.clamp(0.0, 255.0) as u8
    }
}
