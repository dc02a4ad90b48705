use alloc::string::String;

/// All errors that can occur while decoding or displaying a FITS image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The buffer does not start with a `SIMPLE` card.
    #[error("not a FITS file: missing SIMPLE keyword")]
    NotFits,
    /// The header could not be delimited (no END card within the scan bound).
    #[error("malformed FITS header: {0}")]
    MalformedHeader(&'static str),
    /// Premature end of data while reading.
    #[error("unexpected end of data")]
    UnexpectedEof,
    /// BITPIX value the decoder does not handle.
    #[error("unsupported BITPIX encoding: {0}")]
    UnsupportedEncoding(i64),
    /// CTYPE1/CTYPE2 name a projection other than TAN, SIN or galactic.
    #[error("unsupported WCS projection: {0}")]
    UnsupportedProjection(String),
    /// No finite, non-blank samples: min/max are still at their sentinels.
    #[error("degenerate statistics: no finite non-blank samples")]
    DegenerateStatistics,
    /// A required keyword was not found in the header.
    #[error("missing required keyword: {0}")]
    MissingKeyword(&'static str),
    /// A keyword is present but its value cannot be interpreted.
    #[error("invalid value for {keyword}: {value:?}")]
    InvalidValue {
        keyword: &'static str,
        value: String,
    },
    /// Requested depth slice does not exist in the cube.
    #[error("slice {z} out of range for depth {depth}")]
    InvalidSlice { z: usize, depth: usize },
    /// The gzip envelope around the FITS data could not be inflated.
    #[error("compressed buffer: {0}")]
    Compression(String),
    /// An I/O error from the standard library.
    #[cfg(feature = "std")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::ToString;

    #[test]
    fn display_not_fits() {
        assert_eq!(
            Error::NotFits.to_string(),
            "not a FITS file: missing SIMPLE keyword"
        );
    }

    #[test]
    fn display_malformed_header() {
        let e = Error::MalformedHeader("no END card");
        assert_eq!(e.to_string(), "malformed FITS header: no END card");
    }

    #[test]
    fn display_unsupported_encoding() {
        let e = Error::UnsupportedEncoding(64);
        assert_eq!(e.to_string(), "unsupported BITPIX encoding: 64");
    }

    #[test]
    fn display_unsupported_projection() {
        let e = Error::UnsupportedProjection("RA---AIT".into());
        assert_eq!(e.to_string(), "unsupported WCS projection: RA---AIT");
    }

    #[test]
    fn display_invalid_value() {
        let e = Error::InvalidValue {
            keyword: "NAXIS1",
            value: "abc".into(),
        };
        assert_eq!(e.to_string(), "invalid value for NAXIS1: \"abc\"");
    }

    #[test]
    fn display_invalid_slice() {
        let e = Error::InvalidSlice { z: 4, depth: 2 };
        assert_eq!(e.to_string(), "slice 4 out of range for depth 2");
    }

    #[test]
    fn debug_formatting() {
        let e = Error::UnsupportedEncoding(99);
        let debug = format!("{e:?}");
        assert!(debug.contains("UnsupportedEncoding"));
        assert!(debug.contains("99"));
    }

    #[cfg(feature = "std")]
    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::other("oops");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
    }

    #[cfg(feature = "std")]
    #[test]
    fn std_error_source() {
        use std::error::Error as StdError;

        assert!(Error::NotFits.source().is_none());
        let e = Error::Io(std::io::Error::other("inner"));
        assert!(e.source().is_some());
    }
}
