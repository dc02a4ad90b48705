//! Filesystem helpers (requires the `std` feature).

use std::path::Path;

use crate::builder::FitsBuilder;
use crate::error::Result;
use crate::image::{decode, DecodeOptions, DecodedImage};

/// Read and decode the FITS (or `.fits.gz`) file at `path`.
///
/// When `options` carries no source filename, the file name is recorded.
pub fn decode_file<P: AsRef<Path>>(path: P, options: &DecodeOptions) -> Result<DecodedImage> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "read FITS file");

    if options.source_filename.is_some() {
        return decode(&data, options);
    }
    let mut options = options.clone();
    options.source_filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    decode(&data, &options)
}

/// Serialize `builder` and write it to `path`, replacing any existing file.
pub fn write_file<P: AsRef<Path>>(path: P, builder: &FitsBuilder) -> Result<()> {
    let bytes = builder.build()?;
    std::fs::write(path.as_ref(), &bytes)?;
    Ok(())
}
