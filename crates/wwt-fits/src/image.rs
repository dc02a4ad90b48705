//! The decoded image aggregate and the decode pipeline that builds it.
//!
//! `decode` runs the stages in a fixed order: gzip envelope, header scan,
//! axes, BITPIX, physical transform, pixel decode, statistics, WCS. Any
//! failure before the WCS stage aborts the decode and no image is produced.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::block::DEFAULT_MAX_HEADER_BLOCKS;
use crate::compression;
use crate::error::Result;
use crate::header::{self, Header, HeaderWarning};
use crate::histogram::HistogramController;
use crate::physical::PhysicalValueTransform;
use crate::pixels::{AxisDescriptor, Bitpix, DecodeMode, ImageData, PixelDecoder};
use crate::render::{render, RasterImage, RenderCache, RenderRequest};
use crate::scale::ScaleType;
use crate::stats::{compute_histogram, Statistics, DEFAULT_BUCKETS};
use crate::wcs::{self, WcsSolution};

/// Cumulative fractions used for the default display window.
const AUTO_CUT_LOW: f64 = 0.005;
const AUTO_CUT_HIGH: f64 = 0.995;

// ── Configuration ──

/// How a buffer is decoded.
///
/// Full images collect statistics while decoding; pyramid tiles skip that
/// pass and take their range from the parent level instead.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOptions {
    /// Track min/max during the pixel pass and build the histogram.
    pub collect_statistics: bool,
    /// Keep the native-typed pixel buffer beside the `f64` buffer.
    pub retain_typed_buffer: bool,
    /// Give up on a header with no `END` after this many blocks.
    pub max_header_blocks: usize,
    pub histogram_buckets: usize,
    /// Range known from a parent pyramid level, used when statistics are not collected.
    pub inherited_range: Option<(f64, f64)>,
    pub source_filename: Option<String>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::full()
    }
}

impl DecodeOptions {
    /// Standalone image: statistics and histogram collected.
    pub fn full() -> Self {
        Self {
            collect_statistics: true,
            retain_typed_buffer: false,
            max_header_blocks: DEFAULT_MAX_HEADER_BLOCKS,
            histogram_buckets: DEFAULT_BUCKETS,
            inherited_range: None,
            source_filename: None,
        }
    }

    /// Pyramid tile: no statistics pass.
    pub fn tile() -> Self {
        Self {
            collect_statistics: false,
            ..Self::full()
        }
    }

    pub fn with_inherited_range(mut self, min: f64, max: f64) -> Self {
        self.inherited_range = Some((min, max));
        self
    }

    pub fn with_typed_buffer(mut self, retain: bool) -> Self {
        self.retain_typed_buffer = retain;
        self
    }

    pub fn with_source_filename(mut self, name: impl Into<String>) -> Self {
        self.source_filename = Some(name.into());
        self
    }

    pub fn with_max_header_blocks(mut self, blocks: usize) -> Self {
        self.max_header_blocks = blocks;
        self
    }

    fn mode(&self) -> DecodeMode {
        if self.collect_statistics {
            DecodeMode::Full
        } else {
            DecodeMode::Tile
        }
    }
}

/// Display settings applied by the most recent [`DecodedImage::bitmap`] call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplaySettings {
    pub scale: ScaleType,
    pub low_cut: f64,
    pub high_cut: f64,
    pub color_map: Option<String>,
}

// ── DecodedImage ──

/// A fully decoded FITS image.
///
/// Header, axes, pixels, statistics and WCS are fixed once decoding
/// completes. Only the display settings and the render cache change
/// afterwards.
pub struct DecodedImage {
    header: Header,
    warnings: Vec<HeaderWarning>,
    has_extension: bool,
    axes: AxisDescriptor,
    bitpix: Bitpix,
    transform: PhysicalValueTransform,
    pixels: Vec<f64>,
    typed: Option<ImageData>,
    samples_read: usize,
    statistics: Statistics,
    wcs: WcsSolution,
    source_filename: Option<String>,
    is_tile: bool,
    display: Option<DisplaySettings>,
    cache: RenderCache,
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("axes", &self.axes)
            .field("bitpix", &self.bitpix)
            .field("statistics", &(self.statistics.min, self.statistics.max))
            .field("wcs_valid", &self.wcs.valid)
            .field("source_filename", &self.source_filename)
            .field("is_tile", &self.is_tile)
            .finish_non_exhaustive()
    }
}

impl DecodedImage {
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Cards skipped or flagged while scanning the header.
    pub fn warnings(&self) -> &[HeaderWarning] {
        &self.warnings
    }

    /// `true` when an extension header was merged into [`header`](Self::header).
    pub fn has_extension(&self) -> bool {
        self.has_extension
    }

    pub fn axes(&self) -> &AxisDescriptor {
        &self.axes
    }

    pub fn width(&self) -> usize {
        self.axes.width()
    }

    pub fn height(&self) -> usize {
        self.axes.height()
    }

    pub fn bitpix(&self) -> Bitpix {
        self.bitpix
    }

    pub fn transform(&self) -> &PhysicalValueTransform {
        &self.transform
    }

    /// Raw sample values in FITS order (row 0 at the bottom).
    pub fn pixels(&self) -> &[f64] {
        &self.pixels
    }

    /// Native-typed samples, present when decoded with `retain_typed_buffer`.
    pub fn typed_pixels(&self) -> Option<&ImageData> {
        self.typed.as_ref()
    }

    /// `false` when the data unit ended before all samples were read.
    pub fn is_complete(&self) -> bool {
        self.samples_read == self.pixels.len()
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn wcs(&self) -> &WcsSolution {
        &self.wcs
    }

    pub fn source_filename(&self) -> Option<&str> {
        self.source_filename.as_deref()
    }

    pub fn is_tile(&self) -> bool {
        self.is_tile
    }

    /// Physical value at `(x, y)` of plane `z`, with `y = 0` at the bottom.
    ///
    /// `None` outside the image and for blank or NaN samples.
    pub fn physical_value(&self, x: usize, y: usize, z: usize) -> Option<f64> {
        if x >= self.axes.width() || y >= self.axes.height() {
            return None;
        }
        let index = z
            .checked_mul(self.axes.plane_len())?
            .checked_add(y * self.axes.width() + x)?;
        self.transform.physical(*self.pixels.get(index)?)
    }

    /// Settings of the last rendered bitmap, if any.
    pub fn last_display(&self) -> Option<&DisplaySettings> {
        self.display.as_ref()
    }

    /// Render request for the initial display: percentile auto-cuts, linear scale.
    pub fn default_request(&self) -> Result<RenderRequest> {
        let (low, high) = self.statistics.auto_cuts(AUTO_CUT_LOW, AUTO_CUT_HIGH)?;
        Ok(RenderRequest::new(low, high))
    }

    /// Render with `request`, reusing the previous raster when nothing changed.
    pub fn bitmap(&mut self, request: &RenderRequest) -> Result<&RasterImage> {
        let raster = self.cache.get_or_render(request, || {
            render(&self.pixels, &self.axes, &self.transform, request)
        })?;
        self.display = Some(DisplaySettings {
            scale: request.scale,
            low_cut: request.min,
            high_cut: request.max,
            color_map: request.color_map.clone(),
        });
        Ok(raster)
    }

    /// Histogram markers positioned at the last display cuts, or at the full
    /// range before anything was rendered.
    pub fn histogram_controller(&self) -> Result<HistogramController> {
        let range = self.statistics.range()?;
        let buckets = self
            .statistics
            .buckets()
            .map_or(DEFAULT_BUCKETS, <[u32]>::len);
        let mut controller = match &self.display {
            Some(display) => {
                HistogramController::from_cuts(buckets, range, (display.low_cut, display.high_cut))
            }
            None => HistogramController::new(buckets),
        };
        if let Some(display) = &self.display {
            controller.set_scale(display.scale);
        }
        Ok(controller)
    }
}

// ── Pipeline ──

/// Decode a complete FITS buffer, optionally gzip-wrapped.
pub fn decode(bytes: &[u8], options: &DecodeOptions) -> Result<DecodedImage> {
    let bytes = compression::maybe_gunzip(bytes)?;
    let scan = header::scan_bounded(&bytes, options.max_header_blocks)?;
    let axes = AxisDescriptor::from_header(&scan.header)?;
    let bitpix = Bitpix::from_header(&scan.header)?;
    let transform = PhysicalValueTransform::from_header(&scan.header);

    let decoder = PixelDecoder {
        mode: options.mode(),
        retain_typed_buffer: options.retain_typed_buffer,
    };
    let decoded = decoder.decode(&bytes, &axes, bitpix, scan.data_start, &transform)?;

    let statistics = if options.collect_statistics {
        let histogram = compute_histogram(
            &decoded.data,
            &transform,
            decoded.min,
            decoded.max,
            options.histogram_buckets,
        )
        .ok();
        Statistics {
            min: decoded.min,
            max: decoded.max,
            histogram,
        }
    } else {
        options
            .inherited_range
            .map_or_else(Statistics::unknown, |(min, max)| {
                Statistics::from_range(min, max)
            })
    };
    if options.collect_statistics && statistics.is_degenerate() {
        tracing::warn!(
            samples = decoded.data.len(),
            "no finite non-blank samples; statistics left at sentinels"
        );
    }

    let wcs = wcs::calibrate(&scan.header);
    tracing::debug!(
        axes = ?axes.sizes(),
        bitpix = bitpix.value(),
        min = statistics.min,
        max = statistics.max,
        wcs_valid = wcs.valid,
        "image decoded"
    );

    Ok(DecodedImage {
        header: scan.header,
        warnings: scan.warnings,
        has_extension: scan.has_extension,
        axes,
        bitpix,
        transform,
        samples_read: decoded.samples_read,
        pixels: decoded.data,
        typed: decoded.typed,
        statistics,
        wcs,
        source_filename: options.source_filename.clone(),
        is_tile: !options.collect_statistics,
        display: None,
        cache: RenderCache::new(),
    })
}

/// Decode `bytes` and report the outcome to `callback` exactly once.
///
/// The callback receives the image and `false` on success, or `None` and
/// `true` on failure.
pub fn decode_then<F>(bytes: &[u8], options: &DecodeOptions, callback: F)
where
    F: FnOnce(Option<DecodedImage>, bool),
{
    match decode(bytes, options) {
        Ok(image) => callback(Some(image), false),
        Err(err) => {
            tracing::warn!(
                %err,
                source = options.source_filename.as_deref().unwrap_or("<memory>"),
                "decode failed"
            );
            callback(None, true)
        }
    }
}

/// Hand the result of an external fetch to the decoder.
///
/// A fetch error is reported through `callback` like a decode failure.
pub fn deliver<B, E, F>(fetched: core::result::Result<B, E>, options: &DecodeOptions, callback: F)
where
    B: AsRef<[u8]>,
    E: fmt::Display,
    F: FnOnce(Option<DecodedImage>, bool),
{
    match fetched {
        Ok(bytes) => decode_then(bytes.as_ref(), options, callback),
        Err(err) => {
            tracing::warn!(
                error = %err,
                source = options.source_filename.as_deref().unwrap_or("<memory>"),
                "fetch failed"
            );
            callback(None, true)
        }
    }
}
