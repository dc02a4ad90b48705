//! FITS header scanning: 80-byte cards grouped into 2880-byte blocks.
//!
//! The scanner walks cards until `END`, then peeks past blank padding. If the
//! next card is `XTENSION` the extension header is merged into the same
//! [`Header`] (one extension only); otherwise pixel data starts at that card.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::str;

use crate::block::{
    card_at, is_blank_card, next_block_boundary, BLOCK_SIZE, CARD_SIZE, DEFAULT_MAX_HEADER_BLOCKS,
};
use crate::error::{Error, Result};

// ── Types ──

/// Keyword/value pairs collected from the header cards.
///
/// Keywords are stored uppercased. A repeated keyword keeps the last value seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    entries: BTreeMap<String, String>,
}

/// Why a card was skipped or flagged during scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// The card contains bytes outside printable ASCII.
    NonAscii,
    /// The keyword contains characters not allowed in FITS keywords.
    InvalidKeyword,
    /// The keyword already appeared in the same HDU; the later value was kept.
    DuplicateKeyword,
}

/// A non-fatal problem found while scanning the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderWarning {
    /// Byte offset of the offending card in the scanned buffer.
    pub offset: usize,
    /// The keyword, when it could be read.
    pub keyword: Option<String>,
    pub kind: WarningKind,
}

/// Result of a successful header scan.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderScan {
    pub header: Header,
    /// Offset of the first byte of the data unit.
    pub data_start: usize,
    /// `true` when an `XTENSION` header followed the primary header.
    pub has_extension: bool,
    pub warnings: Vec<HeaderWarning>,
}

/// Keywords that carry no value worth storing.
const SKIPPED_KEYWORDS: [&str; 4] = ["", "COMMENT", "HISTORY", "CONTINUE"];

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a keyword/value pair, returning the previous value if any.
    pub fn insert(&mut self, keyword: &str, value: &str) -> Option<String> {
        self.entries
            .insert(keyword.trim().to_ascii_uppercase(), String::from(value))
    }

    /// Raw value text for `keyword` (case-insensitive).
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.entries
            .get(&keyword.to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// Value as a float. Accepts Fortran-style `D` exponents.
    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        parse_f64(self.get(keyword)?)
    }

    /// Value as an integer. Integral float spellings such as `16.` are accepted.
    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        let raw = self.get(keyword)?.trim();
        if let Ok(n) = raw.parse::<i64>() {
            return Some(n);
        }
        let f = parse_f64(raw)?;
        if libm::trunc(f) == f && libm::fabs(f) < i64::MAX as f64 {
            Some(f as i64)
        } else {
            None
        }
    }

    /// Value as a string with surrounding quotes removed and `''` unescaped.
    pub fn get_str(&self, keyword: &str) -> Option<String> {
        self.get(keyword).map(unquote)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate keyword/value pairs in keyword order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn parse_f64(raw: &str) -> Option<f64> {
    let text = unquote(raw);
    let text = text.trim();
    if let Ok(v) = text.parse::<f64>() {
        return Some(v);
    }
    if text.contains(['D', 'd']) {
        return text.replace(['D', 'd'], "E").parse::<f64>().ok();
    }
    None
}

/// Strip FITS string quoting: `'abc  '` becomes `abc`, `'it''s'` becomes `it's`.
pub fn unquote(raw: &str) -> String {
    let s = raw.trim();
    match s.strip_prefix('\'') {
        Some(inner) => {
            let inner = inner.strip_suffix('\'').unwrap_or(inner);
            inner.replace("''", "'").trim_end().to_string()
        }
        None => s.to_string(),
    }
}

/// Extract the value text from bytes 10..80 of a card.
///
/// Everything from the first `/` on is comment, except inside a quoted string.
fn value_text(field: &str) -> &str {
    let trimmed = field.trim_start();
    if trimmed.starts_with('\'') {
        let bytes = trimmed.as_bytes();
        let mut i = 1;
        while i < bytes.len() {
            if bytes[i] == b'\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                return &trimmed[..=i];
            }
            i += 1;
        }
        // Unterminated string; keep what is there.
        return trimmed.trim_end();
    }
    match trimmed.find('/') {
        Some(idx) => trimmed[..idx].trim(),
        None => trimmed.trim(),
    }
}

fn valid_keyword(keyword: &str) -> bool {
    keyword
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn card_keyword(card: &[u8; CARD_SIZE]) -> Option<&str> {
    str::from_utf8(&card[..8]).ok().map(str::trim)
}

// ── Parsing ──

enum CardOutcome<'a> {
    End,
    Skip,
    Entry { keyword: String, value: &'a str },
    Malformed { keyword: Option<String>, kind: WarningKind },
}

fn classify_card(card: &[u8; CARD_SIZE]) -> CardOutcome<'_> {
    let text = match str::from_utf8(card) {
        Ok(t) if t.bytes().all(|b| (0x20..0x7F).contains(&b)) => t,
        _ => {
            return CardOutcome::Malformed {
                keyword: card_keyword(card).map(str::to_ascii_uppercase),
                kind: WarningKind::NonAscii,
            }
        }
    };

    let keyword = text[..8].trim().to_ascii_uppercase();
    if keyword == "END" {
        return CardOutcome::End;
    }
    if SKIPPED_KEYWORDS.contains(&keyword.as_str()) {
        return CardOutcome::Skip;
    }
    if !valid_keyword(&keyword) {
        return CardOutcome::Malformed {
            keyword: Some(keyword),
            kind: WarningKind::InvalidKeyword,
        };
    }
    CardOutcome::Entry {
        keyword,
        value: value_text(&text[10..]),
    }
}

/// Scan the header at the start of `buffer` with the default block bound.
pub fn scan(buffer: &[u8]) -> Result<HeaderScan> {
    scan_bounded(buffer, DEFAULT_MAX_HEADER_BLOCKS)
}

/// Scan the header, giving up with [`Error::MalformedHeader`] after `max_blocks` blocks.
pub fn scan_bounded(buffer: &[u8], max_blocks: usize) -> Result<HeaderScan> {
    let marker = buffer.get(..8).ok_or(Error::NotFits)?;
    if str::from_utf8(marker).map(str::trim) != Ok("SIMPLE") {
        return Err(Error::NotFits);
    }

    let limit = max_blocks.saturating_mul(BLOCK_SIZE);
    let mut header = Header::new();
    let mut warnings = Vec::new();
    let mut hdu_keys = BTreeSet::new();
    let mut has_extension = false;
    let mut pos = 0usize;

    loop {
        if pos >= limit {
            return Err(Error::MalformedHeader("no END card within scan bound"));
        }
        let card = card_at(buffer, pos)
            .ok_or(Error::MalformedHeader("no END card before end of buffer"))?;
        let offset = pos;
        pos += CARD_SIZE;

        match classify_card(card) {
            CardOutcome::End => {
                let data_start = skip_blank_cards(buffer, pos);
                if !has_extension
                    && card_at(buffer, data_start).and_then(card_keyword) == Some("XTENSION")
                {
                    tracing::debug!(offset = data_start, "merging extension header");
                    has_extension = true;
                    hdu_keys.clear();
                    pos = data_start;
                    continue;
                }
                tracing::debug!(
                    keywords = header.len(),
                    data_start,
                    warnings = warnings.len(),
                    "header scanned"
                );
                return Ok(HeaderScan {
                    header,
                    data_start: data_start.min(buffer.len()),
                    has_extension,
                    warnings,
                });
            }
            CardOutcome::Skip => {}
            CardOutcome::Entry { keyword, value } => {
                if !hdu_keys.insert(keyword.clone()) {
                    tracing::warn!(offset, keyword = %keyword, "duplicate keyword, keeping last value");
                    warnings.push(HeaderWarning {
                        offset,
                        keyword: Some(keyword.clone()),
                        kind: WarningKind::DuplicateKeyword,
                    });
                }
                header.insert(&keyword, value);
            }
            CardOutcome::Malformed { keyword, kind } => {
                tracing::warn!(offset, ?keyword, ?kind, "skipping malformed header card");
                warnings.push(HeaderWarning {
                    offset,
                    keyword,
                    kind,
                });
            }
        }
    }
}

/// Advance past blank cards following `END`, never beyond the end of its block.
fn skip_blank_cards(buffer: &[u8], mut pos: usize) -> usize {
    let block_end = next_block_boundary(pos);
    while pos < block_end {
        match card_at(buffer, pos) {
            Some(card) if is_blank_card(card) => pos += CARD_SIZE,
            _ => break,
        }
    }
    pos
}
