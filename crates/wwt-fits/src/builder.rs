//! Minimal FITS writer for single-image files.
//!
//! Produces a primary HDU, or an empty primary followed by one `IMAGE`
//! extension, with block-padded header and data. Used to synthesize inputs
//! for the decoder and for export of processed images.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::block::{extend_padded, CARD_SIZE, DATA_PAD_BYTE, HEADER_PAD_BYTE};
use crate::endian::{push_f32_be, push_f64_be, push_i16_be, push_i32_be};
use crate::error::{Error, Result};
use crate::physical::PhysicalValueTransform;
use crate::pixels::Bitpix;

/// Builder for a FITS byte stream holding one image.
#[derive(Debug, Clone)]
pub struct FitsBuilder {
    bitpix: Bitpix,
    axes: Vec<usize>,
    cards: Vec<(String, String)>,
    samples: Vec<f64>,
    transform: PhysicalValueTransform,
    as_extension: bool,
}

impl FitsBuilder {
    pub fn new(bitpix: Bitpix, axes: &[usize]) -> Self {
        Self {
            bitpix,
            axes: axes.to_vec(),
            cards: Vec::new(),
            samples: Vec::new(),
            transform: PhysicalValueTransform::default(),
            as_extension: false,
        }
    }

    /// Add a card with pre-formatted value text (written right-justified).
    pub fn keyword(mut self, keyword: &str, value: &str) -> Self {
        self.cards.push((keyword.to_ascii_uppercase(), String::from(value)));
        self
    }

    pub fn float(self, keyword: &str, value: f64) -> Self {
        self.keyword(keyword, &format!("{value:?}"))
    }

    pub fn int(self, keyword: &str, value: i64) -> Self {
        self.keyword(keyword, &format!("{value}"))
    }

    /// Add a quoted string card.
    pub fn string(self, keyword: &str, value: &str) -> Self {
        let quoted = format!("'{:<8}'", value.replace('\'', "''"));
        self.keyword(keyword, &quoted)
    }

    /// Record `BSCALE`/`BZERO`; physical samples are converted through them.
    pub fn scaling(mut self, b_scale: f64, b_zero: f64) -> Self {
        self.transform.b_scale = b_scale;
        self.transform.b_zero = b_zero;
        self
    }

    /// Record the `BLANK` raw value for integer encodings.
    pub fn blank(mut self, raw: i64) -> Self {
        self.transform.blank = Some(raw as f64);
        self
    }

    /// Write the image as an `IMAGE` extension after an empty primary HDU.
    pub fn as_extension(mut self, yes: bool) -> Self {
        self.as_extension = yes;
        self
    }

    /// Stored sample values, written as-is (after rounding for integer encodings).
    pub fn raw_samples(mut self, samples: &[f64]) -> Self {
        self.samples = samples.to_vec();
        self
    }

    /// Physical sample values, converted with the recorded scaling.
    ///
    /// Integer encodings round to nearest and clamp to the type's range. NaN
    /// becomes the `BLANK` value when one is set.
    pub fn physical_samples(mut self, samples: &[f64]) -> Self {
        let transform = self.transform;
        self.samples = samples
            .iter()
            .map(|&v| match transform.blank {
                Some(blank) if v.is_nan() => blank,
                _ => transform.invert(v),
            })
            .collect();
        self
    }

    /// Serialize header and data.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut header = Vec::new();

        if self.as_extension {
            push_card(&mut header, "SIMPLE", "T")?;
            push_card(&mut header, "BITPIX", "8")?;
            push_card(&mut header, "NAXIS", "0")?;
            push_card(&mut header, "EXTEND", "T")?;
            push_end(&mut header);
            extend_padded(&mut out, &header, HEADER_PAD_BYTE);
            header.clear();
            push_card(&mut header, "XTENSION", "'IMAGE   '")?;
        } else {
            push_card(&mut header, "SIMPLE", "T")?;
        }

        push_card(&mut header, "BITPIX", &format!("{}", self.bitpix.value()))?;
        push_card(&mut header, "NAXIS", &format!("{}", self.axes.len()))?;
        for (i, size) in self.axes.iter().enumerate() {
            push_card(&mut header, &format!("NAXIS{}", i + 1), &format!("{size}"))?;
        }
        if self.as_extension {
            push_card(&mut header, "PCOUNT", "0")?;
            push_card(&mut header, "GCOUNT", "1")?;
        }
        if self.transform.b_scale != 1.0 || self.transform.b_zero != 0.0 {
            push_card(&mut header, "BSCALE", &format!("{:?}", self.transform.b_scale))?;
            push_card(&mut header, "BZERO", &format!("{:?}", self.transform.b_zero))?;
        }
        if let Some(blank) = self.transform.blank {
            push_card(&mut header, "BLANK", &format!("{}", blank as i64))?;
        }
        for (keyword, value) in &self.cards {
            push_card(&mut header, keyword, value)?;
        }
        push_end(&mut header);
        extend_padded(&mut out, &header, HEADER_PAD_BYTE);

        let data = encode_samples(&self.samples, self.bitpix);
        if !data.is_empty() {
            extend_padded(&mut out, &data, DATA_PAD_BYTE);
        }
        Ok(out)
    }
}

fn push_card(out: &mut Vec<u8>, keyword: &str, value: &str) -> Result<()> {
    if keyword.len() > 8 {
        return Err(Error::InvalidValue {
            keyword: "keyword",
            value: String::from(keyword),
        });
    }
    let text = format!("{keyword:<8}= {value:>20}");
    if text.len() > CARD_SIZE || !text.is_ascii() {
        return Err(Error::InvalidValue {
            keyword: "card",
            value: text,
        });
    }
    out.extend_from_slice(text.as_bytes());
    out.resize(out.len() + CARD_SIZE - text.len(), HEADER_PAD_BYTE);
    Ok(())
}

fn push_end(out: &mut Vec<u8>) {
    out.extend_from_slice(b"END");
    out.resize(out.len() + CARD_SIZE - 3, HEADER_PAD_BYTE);
}

fn round_clamp(v: f64, lo: f64, hi: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    libm::round(v).clamp(lo, hi)
}

fn encode_samples(samples: &[f64], bitpix: Bitpix) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * bitpix.bytes_per_sample());
    for &v in samples {
        match bitpix {
            Bitpix::U8 => out.push(round_clamp(v, 0.0, 255.0) as u8),
            Bitpix::I16 => {
                push_i16_be(&mut out, round_clamp(v, i16::MIN as f64, i16::MAX as f64) as i16)
            }
            Bitpix::I32 => {
                push_i32_be(&mut out, round_clamp(v, i32::MIN as f64, i32::MAX as f64) as i32)
            }
            Bitpix::F32 => push_f32_be(&mut out, v as f32),
            Bitpix::F64 => push_f64_be(&mut out, v),
        }
    }
    out
}
