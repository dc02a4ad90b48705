//! Rasterizing a decoded pixel buffer into a top-down RGBA bitmap.
//!
//! FITS rows run bottom-up, so FITS row `r` lands on output row
//! `height - 1 - r`. Rendering reads only the immutable pixel buffer; the
//! [`RenderCache`] reuses the last raster when the request is unchanged.

use alloc::string::String;
use alloc::vec::Vec;

use crate::colormap::{ColorMap, Rgba};
use crate::error::{Error, Result};
use crate::physical::PhysicalValueTransform;
use crate::pixels::AxisDescriptor;
use crate::scale::{ScaleMapper, ScaleType};

/// A top-down RGBA raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl RasterImage {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel at column `x` of output row `y` (row 0 is the top).
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Interleaved `RGBARGBA...` bytes, ready for texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

/// Display parameters for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// Physical value shown as black (index 0).
    pub min: f64,
    /// Physical value shown as white (index 255).
    pub max: f64,
    pub scale: ScaleType,
    /// Depth plane for cubes; ignored for color cubes.
    pub z: usize,
    /// Color map name; `None` renders grayscale.
    pub color_map: Option<String>,
    /// Render `BLANK` samples fully transparent instead of black.
    pub transparent_blanks: bool,
}

impl RenderRequest {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            scale: ScaleType::Linear,
            z: 0,
            color_map: None,
            transparent_blanks: false,
        }
    }

    pub fn with_scale(mut self, scale: ScaleType) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_z(mut self, z: usize) -> Self {
        self.z = z;
        self
    }

    pub fn with_color_map(mut self, name: &str) -> Self {
        self.color_map = Some(String::from(name));
        self
    }

    pub fn with_transparent_blanks(mut self, transparent: bool) -> Self {
        self.transparent_blanks = transparent;
        self
    }

    /// Same settings, comparing the cuts bit for bit.
    fn same_settings(&self, other: &RenderRequest) -> bool {
        self.min.to_bits() == other.min.to_bits()
            && self.max.to_bits() == other.max.to_bits()
            && self.scale == other.scale
            && self.z == other.z
            && self.color_map == other.color_map
            && self.transparent_blanks == other.transparent_blanks
    }
}

/// Render `pixels` (raw samples laid out per `axes`) with the given display settings.
pub fn render(
    pixels: &[f64],
    axes: &AxisDescriptor,
    transform: &PhysicalValueTransform,
    request: &RenderRequest,
) -> Result<RasterImage> {
    let width = axes.width();
    let height = axes.height();
    let plane = axes.plane_len();
    let mapper = ScaleMapper::new(request.scale, request.min, request.max);

    // Color cubes carry their own channels; the map name is not consulted.
    let color_map = match request.color_map.as_deref().filter(|_| !axes.is_color_cube()) {
        Some(name) => Some(ColorMap::by_name(name).ok_or_else(|| Error::InvalidValue {
            keyword: "color map",
            value: String::from(name),
        })?),
        None => None,
    };

    let planes_needed = if axes.is_color_cube() {
        3
    } else {
        let depth = axes.depth();
        if request.z >= depth {
            return Err(Error::InvalidSlice {
                z: request.z,
                depth,
            });
        }
        request.z + 1
    };
    if pixels.len() < plane * planes_needed {
        return Err(Error::UnexpectedEof);
    }

    let mut out = Vec::with_capacity(plane);
    for out_row in 0..height {
        let fits_row = height - 1 - out_row;
        let row_start = fits_row * width;
        for col in 0..width {
            let index = row_start + col;
            let px = if axes.is_color_cube() {
                color_pixel(pixels, index, plane, transform, &mapper, request)
            } else {
                let raw = pixels[request.z * plane + index];
                mono_pixel(raw, transform, &mapper, color_map.as_ref(), request)
            };
            out.push(px);
        }
    }

    Ok(RasterImage {
        width,
        height,
        pixels: out,
    })
}

fn mono_pixel(
    raw: f64,
    transform: &PhysicalValueTransform,
    mapper: &ScaleMapper,
    color_map: Option<&ColorMap>,
    request: &RenderRequest,
) -> Rgba {
    if raw.is_nan() {
        return Rgba::TRANSPARENT;
    }
    if transform.is_blank(raw) {
        return if request.transparent_blanks {
            Rgba::TRANSPARENT
        } else {
            Rgba::gray(0)
        };
    }
    let index = mapper.map(transform.apply(raw));
    match color_map {
        Some(map) => map.lookup(index as f64 / 255.0),
        None => Rgba::gray(index),
    }
}

fn color_pixel(
    pixels: &[f64],
    index: usize,
    plane: usize,
    transform: &PhysicalValueTransform,
    mapper: &ScaleMapper,
    request: &RenderRequest,
) -> Rgba {
    let channel = |k: usize| -> Option<u8> {
        transform
            .physical(pixels[k * plane + index])
            .map(|v| mapper.map(v))
    };
    match (channel(0), channel(1), channel(2)) {
        (None, None, None) if request.transparent_blanks => Rgba::TRANSPARENT,
        (r, g, b) => Rgba::new(r.unwrap_or(0), g.unwrap_or(0), b.unwrap_or(0), 255),
    }
}

/// Memo of the last rendered raster, keyed by the full request.
#[derive(Debug, Clone, Default)]
pub struct RenderCache {
    last: Option<(RenderRequest, RasterImage)>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached raster if `request` matches the last one, otherwise
    /// run `render_fn` and cache its output. A failed render keeps the
    /// previous entry.
    pub fn get_or_render<F>(&mut self, request: &RenderRequest, render_fn: F) -> Result<&RasterImage>
    where
        F: FnOnce() -> Result<RasterImage>,
    {
        let entry = match self.last.take() {
            Some(entry) if entry.0.same_settings(request) => {
                tracing::trace!("render cache hit");
                entry
            }
            previous => match render_fn() {
                Ok(raster) => (request.clone(), raster),
                Err(err) => {
                    self.last = previous;
                    return Err(err);
                }
            },
        };
        let (_, raster) = self.last.insert(entry);
        Ok(raster)
    }

    /// The request that produced the cached raster.
    pub fn last_request(&self) -> Option<&RenderRequest> {
        self.last.as_ref().map(|(request, _)| request)
    }

    pub fn invalidate(&mut self) {
        self.last = None;
    }
}
