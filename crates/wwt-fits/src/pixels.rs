//! Pixel data decoding for the five supported BITPIX encodings.
//!
//! Samples are decoded into one flat `f64` buffer of raw (uncalibrated)
//! values. In [`DecodeMode::Full`] the same pass tracks the physical min/max;
//! [`DecodeMode::Tile`] skips that work for pyramid tiles whose range is
//! already known.

use alloc::format;
use alloc::vec::Vec;

use bytemuck::pod_collect_to_vec;

use crate::endian::{read_f32_be, read_f64_be, read_i16_be, read_i32_be, read_u8};
use crate::error::{Error, Result};
use crate::header::Header;
use crate::physical::PhysicalValueTransform;

/// Most zero samples a truncated data unit may be padded with. Headers that
/// declare more data than this beyond what the buffer holds are rejected.
pub const MAX_ZERO_FILL_SAMPLES: usize = 1 << 22;

/// Numeric encoding declared by `BITPIX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitpix {
    U8,
    I16,
    I32,
    F32,
    F64,
}

impl Bitpix {
    /// The `BITPIX` keyword value for this encoding.
    pub const fn value(self) -> i64 {
        match self {
            Bitpix::U8 => 8,
            Bitpix::I16 => 16,
            Bitpix::I32 => 32,
            Bitpix::F32 => -32,
            Bitpix::F64 => -64,
        }
    }

    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Bitpix::U8 => 1,
            Bitpix::I16 => 2,
            Bitpix::I32 | Bitpix::F32 => 4,
            Bitpix::F64 => 8,
        }
    }

    pub fn from_header(header: &Header) -> Result<Self> {
        let raw = header
            .get_i64("BITPIX")
            .ok_or(Error::MissingKeyword("BITPIX"))?;
        Self::try_from(raw)
    }

    /// Per-sample reader converting big-endian bytes to `f64`.
    fn reader(self) -> fn(&[u8]) -> f64 {
        match self {
            Bitpix::U8 => |b: &[u8]| read_u8(b) as f64,
            Bitpix::I16 => |b: &[u8]| read_i16_be(b) as f64,
            Bitpix::I32 => |b: &[u8]| read_i32_be(b) as f64,
            Bitpix::F32 => |b: &[u8]| read_f32_be(b) as f64,
            Bitpix::F64 => read_f64_be,
        }
    }
}

impl TryFrom<i64> for Bitpix {
    type Error = Error;

    /// `64` is rejected: 64-bit integers do not fit losslessly in the `f64` buffer.
    fn try_from(value: i64) -> Result<Self> {
        match value {
            8 => Ok(Bitpix::U8),
            16 => Ok(Bitpix::I16),
            32 => Ok(Bitpix::I32),
            -32 => Ok(Bitpix::F32),
            -64 => Ok(Bitpix::F64),
            other => Err(Error::UnsupportedEncoding(other)),
        }
    }
}

/// Axis sizes from `NAXIS1..NAXISn`. Axis 1 is the width, axis 2 the height.
///
/// A third axis of exactly 3 marks an interleaved R/G/B color cube rather than
/// a depth stack.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AxisDescriptor {
    sizes: Vec<usize>,
}

impl AxisDescriptor {
    pub fn new(sizes: Vec<usize>) -> Self {
        Self { sizes }
    }

    pub fn from_header(header: &Header) -> Result<Self> {
        let naxis = header
            .get_i64("NAXIS")
            .ok_or(Error::MissingKeyword("NAXIS"))?;
        let naxis = usize::try_from(naxis).map_err(|_| Error::InvalidValue {
            keyword: "NAXIS",
            value: format!("{naxis}"),
        })?;
        let mut sizes = Vec::with_capacity(naxis);
        for n in 1..=naxis {
            let keyword = format!("NAXIS{n}");
            let size = header
                .get_i64(&keyword)
                .ok_or(Error::MissingKeyword("NAXISn"))?;
            let size = usize::try_from(size).map_err(|_| Error::InvalidValue {
                keyword: "NAXISn",
                value: format!("{keyword}={size}"),
            })?;
            sizes.push(size);
        }
        Ok(Self { sizes })
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn naxis(&self) -> usize {
        self.sizes.len()
    }

    pub fn width(&self) -> usize {
        self.sizes.first().copied().unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        match self.sizes.len() {
            0 => 0,
            1 => 1,
            _ => self.sizes[1],
        }
    }

    /// Number of planes along axis 3, or 1 for 1-D and 2-D images.
    pub fn depth(&self) -> usize {
        self.sizes.get(2).copied().unwrap_or(1)
    }

    pub fn is_color_cube(&self) -> bool {
        self.sizes.get(2) == Some(&3)
    }

    /// Samples in one `width * height` plane.
    pub fn plane_len(&self) -> usize {
        self.width().saturating_mul(self.height())
    }

    /// Product of all axis sizes, or `None` on overflow. Zero axes hold no samples.
    pub fn sample_count(&self) -> Option<usize> {
        if self.sizes.is_empty() {
            return Some(0);
        }
        self.sizes.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
    }
}

/// Pixel samples in their on-disk numeric type.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageData {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl ImageData {
    pub fn len(&self) -> usize {
        match self {
            ImageData::U8(v) => v.len(),
            ImageData::I16(v) => v.len(),
            ImageData::I32(v) => v.len(),
            ImageData::F32(v) => v.len(),
            ImageData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bitpix(&self) -> Bitpix {
        match self {
            ImageData::U8(_) => Bitpix::U8,
            ImageData::I16(_) => Bitpix::I16,
            ImageData::I32(_) => Bitpix::I32,
            ImageData::F32(_) => Bitpix::F32,
            ImageData::F64(_) => Bitpix::F64,
        }
    }

    /// Decode `raw` big-endian bytes, then zero-extend to `len` samples.
    fn from_be_bytes(raw: &[u8], bitpix: Bitpix, len: usize) -> Self {
        match bitpix {
            Bitpix::U8 => {
                let mut pixels = raw.to_vec();
                pixels.resize(len, 0);
                ImageData::U8(pixels)
            }
            Bitpix::I16 => {
                let mut pixels: Vec<i16> = pod_collect_to_vec(raw);
                for v in &mut pixels {
                    *v = i16::from_be(*v);
                }
                pixels.resize(len, 0);
                ImageData::I16(pixels)
            }
            Bitpix::I32 => {
                let mut pixels: Vec<i32> = pod_collect_to_vec(raw);
                for v in &mut pixels {
                    *v = i32::from_be(*v);
                }
                pixels.resize(len, 0);
                ImageData::I32(pixels)
            }
            Bitpix::F32 => {
                let mut pixels: Vec<f32> = pod_collect_to_vec(raw);
                for v in &mut pixels {
                    *v = f32::from_bits(u32::from_be(v.to_bits()));
                }
                pixels.resize(len, 0.0);
                ImageData::F32(pixels)
            }
            Bitpix::F64 => {
                let mut pixels: Vec<f64> = pod_collect_to_vec(raw);
                for v in &mut pixels {
                    *v = f64::from_bits(u64::from_be(v.to_bits()));
                }
                pixels.resize(len, 0.0);
                ImageData::F64(pixels)
            }
        }
    }
}

/// Whether the decode pass also tracks the physical value range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Standalone images: min/max collected during the pass.
    Full,
    /// Pyramid tiles: statistics come from a parent level.
    Tile,
}

/// Output of [`PixelDecoder::decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPixels {
    /// Raw sample values, `product(axes)` long.
    pub data: Vec<f64>,
    /// Native-typed copy, when requested.
    pub typed: Option<ImageData>,
    /// Physical minimum over finite non-blank samples; `+inf` if none or in tile mode.
    pub min: f64,
    /// Physical maximum over finite non-blank samples; `-inf` if none or in tile mode.
    pub max: f64,
    /// Samples actually present in the buffer. Less than `data.len()` when truncated.
    pub samples_read: usize,
}

/// Converts the data unit bytes into a flat sample buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelDecoder {
    pub mode: DecodeMode,
    pub retain_typed_buffer: bool,
}

impl PixelDecoder {
    pub fn full() -> Self {
        Self {
            mode: DecodeMode::Full,
            retain_typed_buffer: false,
        }
    }

    pub fn tile() -> Self {
        Self {
            mode: DecodeMode::Tile,
            retain_typed_buffer: false,
        }
    }

    /// Decode `product(axes)` samples starting at `start`.
    ///
    /// A buffer that ends early leaves the remaining samples at zero and logs a
    /// warning. More than [`MAX_ZERO_FILL_SAMPLES`] missing samples is
    /// [`Error::UnexpectedEof`].
    pub fn decode(
        &self,
        buffer: &[u8],
        axes: &AxisDescriptor,
        bitpix: Bitpix,
        start: usize,
        transform: &PhysicalValueTransform,
    ) -> Result<DecodedPixels> {
        let count = axes.sample_count().ok_or_else(|| Error::InvalidValue {
            keyword: "NAXISn",
            value: format!("{:?}", axes.sizes()),
        })?;
        let width = bitpix.bytes_per_sample();
        let available = buffer.len().saturating_sub(start) / width;
        let samples_read = count.min(available);
        if count - samples_read > MAX_ZERO_FILL_SAMPLES {
            tracing::warn!(
                expected = count,
                present = samples_read,
                "declared pixel data far exceeds the buffer"
            );
            return Err(Error::UnexpectedEof);
        }
        if samples_read < count {
            tracing::warn!(
                expected = count,
                present = samples_read,
                "pixel data truncated, padding with zeros"
            );
        }

        let raw = &buffer[start.min(buffer.len())..][..samples_read * width];
        let mut data = Vec::new();
        data.try_reserve_exact(count)
            .map_err(|_| Error::InvalidValue {
                keyword: "NAXISn",
                value: format!("{count} samples do not fit in memory"),
            })?;
        data.resize(count, 0.0f64);
        let read = bitpix.reader();

        let (min, max) = match self.mode {
            DecodeMode::Full => decode_with_range(raw, width, &mut data, transform, read),
            DecodeMode::Tile => {
                decode_plain(raw, width, &mut data, read);
                (f64::INFINITY, f64::NEG_INFINITY)
            }
        };

        let typed = self
            .retain_typed_buffer
            .then(|| ImageData::from_be_bytes(raw, bitpix, count));

        tracing::debug!(
            bitpix = bitpix.value(),
            samples = count,
            min,
            max,
            "pixel data decoded"
        );
        Ok(DecodedPixels {
            data,
            typed,
            min,
            max,
            samples_read,
        })
    }
}

fn decode_plain(raw: &[u8], width: usize, out: &mut [f64], read: fn(&[u8]) -> f64) {
    for (slot, chunk) in out.iter_mut().zip(raw.chunks_exact(width)) {
        *slot = read(chunk);
    }
}

fn decode_with_range(
    raw: &[u8],
    width: usize,
    out: &mut [f64],
    transform: &PhysicalValueTransform,
    read: fn(&[u8]) -> f64,
) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for (slot, chunk) in out.iter_mut().zip(raw.chunks_exact(width)) {
        let sample = read(chunk);
        *slot = sample;
        if let Some(physical) = transform.physical(sample).filter(|p| p.is_finite()) {
            if physical < min {
                min = physical;
            }
            if physical > max {
                max = physical;
            }
        }
    }
    (min, max)
}
