//! Gzip envelope around a whole FITS file (`.fits.gz`).
//!
//! Only the single-member RFC 1952 framing is handled; the deflate stream
//! itself is inflated by `miniz_oxide`.

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::String;

use crate::error::{Error, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const METHOD_DEFLATE: u8 = 0x08;
const FIXED_HEADER_LEN: usize = 10;
const TRAILER_LEN: usize = 8;

const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;

/// `true` if `bytes` starts with the gzip magic number.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Borrow `bytes` unchanged, or inflate them if they are gzip-wrapped.
pub fn maybe_gunzip(bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    if is_gzip(bytes) {
        gunzip(bytes).map(Cow::Owned)
    } else {
        Ok(Cow::Borrowed(bytes))
    }
}

/// Inflate a gzip member and check its recorded length.
pub fn gunzip(bytes: &[u8]) -> Result<alloc::vec::Vec<u8>> {
    let payload = deflate_payload(bytes)?;
    let trailer = &bytes[bytes.len() - TRAILER_LEN..];
    let expected_len = u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]);

    let inflated = miniz_oxide::inflate::decompress_to_vec(payload)
        .map_err(|e| Error::Compression(format!("inflate failed: {:?}", e.status)))?;
    // ISIZE is the length modulo 2^32.
    if inflated.len() as u32 != expected_len {
        return Err(Error::Compression(format!(
            "length mismatch: trailer says {expected_len}, inflated {}",
            inflated.len()
        )));
    }
    tracing::debug!(
        compressed = bytes.len(),
        inflated = inflated.len(),
        "gzip envelope removed"
    );
    Ok(inflated)
}

/// Locate the raw deflate stream between the gzip header and trailer.
fn deflate_payload(bytes: &[u8]) -> Result<&[u8]> {
    let corrupt = |what: &str| Error::Compression(String::from(what));

    if bytes.len() < FIXED_HEADER_LEN + TRAILER_LEN || !is_gzip(bytes) {
        return Err(corrupt("truncated gzip header"));
    }
    if bytes[2] != METHOD_DEFLATE {
        return Err(Error::Compression(format!(
            "unsupported compression method {}",
            bytes[2]
        )));
    }
    let flags = bytes[3];
    let body_end = bytes.len() - TRAILER_LEN;
    let mut pos = FIXED_HEADER_LEN;

    if flags & FEXTRA != 0 {
        let len = bytes
            .get(pos..pos + 2)
            .ok_or_else(|| corrupt("truncated FEXTRA field"))?;
        pos += 2 + u16::from_le_bytes([len[0], len[1]]) as usize;
    }
    for flag in [FNAME, FCOMMENT] {
        if flags & flag != 0 {
            let rest = bytes.get(pos..body_end).unwrap_or_default();
            let nul = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| corrupt("unterminated gzip header string"))?;
            pos += nul + 1;
        }
    }
    if flags & FHCRC != 0 {
        pos += 2;
    }

    bytes
        .get(pos..body_end)
        .ok_or_else(|| corrupt("gzip header overruns data"))
}
