//! Raw-to-physical value calibration (`BSCALE`, `BZERO`, `BLANK`).

use crate::header::Header;

/// Affine map from stored sample values to physical units.
///
/// `physical = raw * b_scale + b_zero`. A raw sample equal to `blank` is undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalValueTransform {
    pub b_zero: f64,
    pub b_scale: f64,
    pub blank: Option<f64>,
}

impl Default for PhysicalValueTransform {
    fn default() -> Self {
        Self {
            b_zero: 0.0,
            b_scale: 1.0,
            blank: None,
        }
    }
}

impl PhysicalValueTransform {
    /// Read `BZERO`, `BSCALE` and `BLANK`, defaulting to the identity transform.
    pub fn from_header(header: &Header) -> Self {
        Self {
            b_zero: header.get_f64("BZERO").unwrap_or(0.0),
            b_scale: header.get_f64("BSCALE").unwrap_or(1.0),
            blank: header.get_f64("BLANK"),
        }
    }

    #[inline]
    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.b_scale + self.b_zero
    }

    /// Inverse of [`apply`](Self::apply); returns `physical` unchanged when `b_scale` is zero.
    #[inline]
    pub fn invert(&self, physical: f64) -> f64 {
        if self.b_scale == 0.0 {
            return physical;
        }
        (physical - self.b_zero) / self.b_scale
    }

    /// `true` when the raw sample equals the declared `BLANK` value.
    #[inline]
    pub fn is_blank(&self, raw: f64) -> bool {
        self.blank == Some(raw)
    }

    /// Physical value for a raw sample, or `None` for blank and NaN samples.
    #[inline]
    pub fn physical(&self, raw: f64) -> Option<f64> {
        if raw.is_nan() || self.is_blank(raw) {
            None
        } else {
            Some(self.apply(raw))
        }
    }

    pub fn contains_blanks(&self) -> bool {
        self.blank.is_some()
    }
}
