//! Summary statistics over a decoded pixel buffer: physical range and histogram.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::physical::PhysicalValueTransform;

/// Histogram buckets used for full images.
pub const DEFAULT_BUCKETS: usize = 256;

/// Physical value range and optional histogram of an image.
///
/// `histogram` has `bucket_count + 1` entries; the last one holds the largest
/// bucket count (at least 1) so log-scaled plots never take `log(0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub min: f64,
    pub max: f64,
    pub histogram: Option<Vec<u32>>,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::unknown()
    }
}

impl Statistics {
    /// Sentinel statistics: `min = +inf`, `max = -inf`.
    pub fn unknown() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            histogram: None,
        }
    }

    pub fn from_range(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            histogram: None,
        }
    }

    /// Scan `pixels` for the physical range, then bucket them.
    pub fn collect(
        pixels: &[f64],
        transform: &PhysicalValueTransform,
        bucket_count: usize,
    ) -> Self {
        let (min, max) = physical_range(pixels, transform);
        let histogram = compute_histogram(pixels, transform, min, max, bucket_count).ok();
        Self {
            min,
            max,
            histogram,
        }
    }

    /// `true` while min/max are still at their sentinels (no usable samples).
    pub fn is_degenerate(&self) -> bool {
        !(self.min <= self.max) || !self.min.is_finite() || !self.max.is_finite()
    }

    /// `(min, max)`, or [`Error::DegenerateStatistics`] when no samples contributed.
    pub fn range(&self) -> Result<(f64, f64)> {
        if self.is_degenerate() {
            return Err(Error::DegenerateStatistics);
        }
        Ok((self.min, self.max))
    }

    /// Bucket counts without the trailing peak slot.
    pub fn buckets(&self) -> Option<&[u32]> {
        self.histogram
            .as_deref()
            .and_then(|h| h.split_last().map(|(_, buckets)| buckets))
    }

    /// The largest bucket count, as stored in the trailing slot.
    pub fn peak(&self) -> Option<u32> {
        self.histogram.as_deref().and_then(|h| h.last().copied())
    }

    /// Percentile display cuts read from the histogram.
    ///
    /// `low_fraction` and `high_fraction` are cumulative fractions in `[0, 1]`,
    /// e.g. `0.005` and `0.995`. Without a histogram the full range is returned.
    pub fn auto_cuts(&self, low_fraction: f64, high_fraction: f64) -> Result<(f64, f64)> {
        let (min, max) = self.range()?;
        let Some(buckets) = self.buckets() else {
            return Ok((min, max));
        };
        let total: u64 = buckets.iter().map(|&c| c as u64).sum();
        if total == 0 || buckets.is_empty() || min == max {
            return Ok((min, max));
        }

        let low_fraction = low_fraction.clamp(0.0, 1.0);
        let high_fraction = high_fraction.clamp(low_fraction, 1.0);
        let width = (max - min) / buckets.len() as f64;
        let low_target = total as f64 * low_fraction;
        let high_target = total as f64 * high_fraction;

        let mut cumulative = 0u64;
        let mut low = None;
        let mut high = None;
        for (i, &count) in buckets.iter().enumerate() {
            cumulative += count as u64;
            if low.is_none() && cumulative as f64 > low_target {
                low = Some(min + i as f64 * width);
            }
            if high.is_none() && cumulative as f64 >= high_target {
                high = Some(min + (i + 1) as f64 * width);
            }
        }
        let low = low.unwrap_or(min);
        let high = high.unwrap_or(max).min(max);
        if low < high {
            Ok((low, high))
        } else {
            Ok((min, max))
        }
    }
}

/// Physical min/max over finite non-blank samples; sentinels when there are none.
pub fn physical_range(pixels: &[f64], transform: &PhysicalValueTransform) -> (f64, f64) {
    pixels
        .iter()
        .filter_map(|&raw| transform.physical(raw))
        .filter(|p| p.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p), hi.max(p))
        })
}

/// Bucket the physical values of `pixels` uniformly over `[min, max)`.
///
/// Returns `bucket_count + 1` counts; the extra slot is `max(1, largest bucket)`.
/// Values outside the range clamp to the first or last bucket. When
/// `min == max` every sample lands in bucket 0.
pub fn compute_histogram(
    pixels: &[f64],
    transform: &PhysicalValueTransform,
    min: f64,
    max: f64,
    bucket_count: usize,
) -> Result<Vec<u32>> {
    if !(min <= max) || !min.is_finite() || !max.is_finite() {
        return Err(Error::DegenerateStatistics);
    }
    let bucket_count = bucket_count.max(1);
    let last = bucket_count - 1;
    let width = (max - min) / bucket_count as f64;
    let mut histogram = vec![0u32; bucket_count + 1];

    for physical in pixels.iter().filter_map(|&raw| transform.physical(raw)) {
        if !physical.is_finite() {
            continue;
        }
        let index = if width > 0.0 {
            let pos = libm::floor((physical - min) / width);
            if pos <= 0.0 {
                0
            } else {
                (pos as usize).min(last)
            }
        } else {
            0
        };
        histogram[index] = histogram[index].saturating_add(1);
    }

    let peak = histogram[..bucket_count].iter().copied().max().unwrap_or(0);
    histogram[bucket_count] = peak.max(1);
    Ok(histogram)
}
