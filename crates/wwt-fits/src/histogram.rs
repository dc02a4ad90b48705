//! Curve math behind the interactive histogram stretch control.
//!
//! Low, high and center markers sit at integer bucket positions over a
//! histogram plot. Marker positions convert to physical cut values for a
//! given statistics range, and the transfer curve is sampled between them.

use alloc::vec;
use alloc::vec::Vec;

use crate::scale::ScaleType;
use crate::stats::DEFAULT_BUCKETS;

/// Seed for the sample spacing so a zero-width drag never divides by zero.
pub const CURVE_EPSILON: f64 = 0.000001;

/// One vertex of the display curve.
///
/// `x` is a bucket position; `y` runs from 0 (black) to 1 (white).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub x: f64,
    pub y: f64,
}

/// Sample the transfer curve between two marker positions.
///
/// Linear curves are a single segment. Other curves are sampled at every
/// integer position from `low_pos` towards `high_pos`, which may lie on
/// either side of `low_pos`.
pub fn transfer_curve(scale: ScaleType, low_pos: i32, high_pos: i32) -> Vec<CurvePoint> {
    let low = low_pos as f64;
    let high = high_pos as f64;
    if scale == ScaleType::Linear {
        return vec![CurvePoint { x: low, y: 0.0 }, CurvePoint { x: high, y: 1.0 }];
    }

    let steps = high_pos.abs_diff(low_pos);
    let direction = if high_pos >= low_pos { 1.0 } else { -1.0 };
    let span = (steps as f64).max(CURVE_EPSILON);
    (0..=steps)
        .map(|i| {
            let i = i as f64;
            CurvePoint {
                x: low + direction * i,
                y: scale.transfer(i / span),
            }
        })
        .collect()
}

/// Which marker a drag moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Low,
    High,
    Center,
}

/// State of the three histogram markers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramController {
    low_pos: i32,
    high_pos: i32,
    max_pos: i32,
    scale: ScaleType,
}

impl Default for HistogramController {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKETS)
    }
}

impl HistogramController {
    /// Markers spanning the full range of a histogram with `bucket_count` buckets.
    pub fn new(bucket_count: usize) -> Self {
        let max_pos = i32::try_from(bucket_count.saturating_sub(1)).unwrap_or(i32::MAX);
        Self {
            low_pos: 0,
            high_pos: max_pos,
            max_pos,
            scale: ScaleType::Linear,
        }
    }

    /// Place the markers at the positions of `low_cut` and `high_cut` within `[min, max]`.
    pub fn from_cuts(
        bucket_count: usize,
        (min, max): (f64, f64),
        (low_cut, high_cut): (f64, f64),
    ) -> Self {
        let mut controller = Self::new(bucket_count);
        controller.low_pos = controller.position_of(low_cut, min, max);
        controller.high_pos = controller.position_of(high_cut, min, max);
        controller
    }

    fn position_of(&self, value: f64, min: f64, max: f64) -> i32 {
        let range = max - min;
        if !(range > 0.0) {
            return 0;
        }
        let pos = libm::round((value - min) / range * self.max_pos as f64);
        pos.clamp(0.0, self.max_pos as f64) as i32
    }

    pub fn low_pos(&self) -> i32 {
        self.low_pos
    }

    pub fn high_pos(&self) -> i32 {
        self.high_pos
    }

    pub fn center_pos(&self) -> i32 {
        (self.low_pos + self.high_pos) / 2
    }

    pub fn scale(&self) -> ScaleType {
        self.scale
    }

    pub fn set_scale(&mut self, scale: ScaleType) {
        self.scale = scale;
    }

    /// Which marker is closest to `x`; ties go to the center marker.
    pub fn hit_test(&self, x: i32) -> Marker {
        let d_low = x.abs_diff(self.low_pos);
        let d_high = x.abs_diff(self.high_pos);
        let d_center = x.abs_diff(self.center_pos());
        if d_center <= d_low && d_center <= d_high {
            Marker::Center
        } else if d_low <= d_high {
            Marker::Low
        } else {
            Marker::High
        }
    }

    /// Move `marker` to position `x`, clamped to the histogram.
    ///
    /// Dragging the center shifts both markers and keeps their separation.
    pub fn drag(&mut self, marker: Marker, x: i32) {
        let x = x.clamp(0, self.max_pos);
        match marker {
            Marker::Low => self.low_pos = x,
            Marker::High => self.high_pos = x,
            Marker::Center => {
                let half = (self.high_pos - self.low_pos).abs() / 2;
                let center = x.clamp(half, (self.max_pos - half).max(half));
                let moved = center - self.center_pos();
                self.low_pos = (self.low_pos + moved).clamp(0, self.max_pos);
                self.high_pos = (self.high_pos + moved).clamp(0, self.max_pos);
            }
        }
    }

    /// Physical `(low_cut, high_cut)` for the statistics range `[min, max]`.
    ///
    /// `low_cut > high_cut` when the markers are crossed.
    pub fn cuts(&self, min: f64, max: f64) -> (f64, f64) {
        let denom = (self.max_pos as f64).max(CURVE_EPSILON);
        let at = |pos: i32| min + pos as f64 / denom * (max - min);
        (at(self.low_pos), at(self.high_pos))
    }

    /// Curve for the current markers and scale.
    pub fn curve(&self) -> Vec<CurvePoint> {
        transfer_curve(self.scale, self.low_pos, self.high_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // ---- curve ----

    #[test]
    fn linear_curve_is_one_segment() {
        let curve = transfer_curve(ScaleType::Linear, 10, 200);
        assert_eq!(
            curve,
            vec![
                CurvePoint { x: 10.0, y: 0.0 },
                CurvePoint { x: 200.0, y: 1.0 }
            ]
        );
    }

    #[test]
    fn sampled_curve_covers_each_position() {
        let curve = transfer_curve(ScaleType::SquareRoot, 0, 100);
        assert_eq!(curve.len(), 101);
        assert_eq!(curve[0], CurvePoint { x: 0.0, y: 0.0 });
        assert_eq!(curve[100], CurvePoint { x: 100.0, y: 1.0 });
        assert_abs_diff_eq!(curve[25].y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn inverted_drag_runs_backwards() {
        let curve = transfer_curve(ScaleType::Power, 50, 40);
        assert_eq!(curve.len(), 11);
        assert_eq!(curve[0].x, 50.0);
        assert_eq!(curve[10].x, 40.0);
        assert_eq!(curve[10].y, 1.0);
        assert!(curve.windows(2).all(|w| w[0].y <= w[1].y));
    }

    #[test]
    fn zero_width_drag_is_finite() {
        for scale in [ScaleType::Log, ScaleType::Power, ScaleType::SquareRoot] {
            let curve = transfer_curve(scale, 77, 77);
            assert_eq!(curve.len(), 1);
            assert!(curve[0].y.is_finite());
        }
    }

    // ---- controller ----

    #[test]
    fn default_spans_full_range() {
        let c = HistogramController::default();
        assert_eq!((c.low_pos(), c.high_pos()), (0, 255));
        assert_eq!(c.cuts(10.0, 20.0), (10.0, 20.0));
    }

    #[test]
    fn from_cuts_round_trips_positions() {
        let c = HistogramController::from_cuts(256, (0.0, 255.0), (51.0, 204.0));
        assert_eq!((c.low_pos(), c.high_pos()), (51, 204));
        let (low, high) = c.cuts(0.0, 255.0);
        assert_abs_diff_eq!(low, 51.0, epsilon = 1e-9);
        assert_abs_diff_eq!(high, 204.0, epsilon = 1e-9);
    }

    #[test]
    fn from_cuts_degenerate_range() {
        let c = HistogramController::from_cuts(256, (3.0, 3.0), (3.0, 3.0));
        assert_eq!((c.low_pos(), c.high_pos()), (0, 0));
    }

    #[test]
    fn drag_low_and_high_clamp() {
        let mut c = HistogramController::new(256);
        c.drag(Marker::Low, -40);
        c.drag(Marker::High, 999);
        assert_eq!((c.low_pos(), c.high_pos()), (0, 255));
        c.drag(Marker::Low, 200);
        c.drag(Marker::High, 100);
        assert_eq!((c.low_pos(), c.high_pos()), (200, 100));
        let (low, high) = c.cuts(0.0, 255.0);
        assert!(low > high);
    }

    #[test]
    fn drag_center_keeps_separation() {
        let mut c = HistogramController::new(256);
        c.drag(Marker::Low, 100);
        c.drag(Marker::High, 140);
        c.drag(Marker::Center, 60);
        assert_eq!((c.low_pos(), c.high_pos()), (40, 80));
        c.drag(Marker::Center, 250);
        assert_eq!((c.low_pos(), c.high_pos()), (215, 255));
        c.drag(Marker::Center, 0);
        assert_eq!((c.low_pos(), c.high_pos()), (0, 40));
    }

    #[test]
    fn hit_test_picks_nearest_marker() {
        let mut c = HistogramController::new(256);
        c.drag(Marker::Low, 100);
        c.drag(Marker::High, 200);
        assert_eq!(c.hit_test(95), Marker::Low);
        assert_eq!(c.hit_test(151), Marker::Center);
        assert_eq!(c.hit_test(230), Marker::High);
    }

    #[test]
    fn controller_curve_uses_scale() {
        let mut c = HistogramController::new(256);
        c.set_scale(ScaleType::Log);
        assert_eq!(c.curve().len(), 256);
        c.set_scale(ScaleType::Linear);
        assert_eq!(c.curve().len(), 2);
    }
}
