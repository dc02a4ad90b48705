//! FITS image decoding, statistics, WCS calibration and display stretching
//! for WorldWide Telescope imagery.
//!
//! Without the default `std` feature the crate builds as `no_std` + `alloc`. The
//! entry point is [`image::decode`], which turns a complete (optionally
//! gzip-wrapped) FITS buffer into a [`DecodedImage`].

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod block;
pub mod builder;
pub mod colormap;
pub mod compression;
pub mod endian;
pub mod error;
pub mod header;
pub mod histogram;
pub mod image;
pub mod physical;
pub mod pixels;
pub mod render;
pub mod scale;
pub mod stats;
pub mod wcs;

#[cfg(feature = "std")]
pub mod io;

#[cfg(feature = "array")]
mod array;

pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use builder::FitsBuilder;
pub use colormap::{ColorMap, Rgba};
pub use error::{Error, Result};
pub use header::{Header, HeaderScan, HeaderWarning};
pub use histogram::{HistogramController, Marker};
pub use image::{decode, decode_then, deliver, DecodeOptions, DecodedImage, DisplaySettings};
pub use physical::PhysicalValueTransform;
pub use pixels::{AxisDescriptor, Bitpix, ImageData};
pub use render::{render, RasterImage, RenderCache, RenderRequest};
pub use scale::{ScaleMapper, ScaleType};
pub use stats::Statistics;
pub use wcs::{Projection, WcsSolution};
