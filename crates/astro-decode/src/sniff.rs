//! Container classification from leading signature bytes.
//!
//! Only the first eight bytes are inspected: the XISF monolithic signature
//! and the FITS keyword field of the first header card occupy the same span.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::block::XISF_SIGNATURE_LEN;

/// XISF 1.0 monolithic file signature.
pub const XISF_SIGNATURE: &[u8; XISF_SIGNATURE_LEN] = b"XISF0100";

const FITS_PRIMARY_KEYWORD: &[u8; 8] = b"SIMPLE  ";
const FITS_EXTENSION_KEYWORD: &[u8; 8] = b"XTENSION";

/// Number of leading bytes [`sniff`] needs to classify a buffer.
pub const SNIFF_LEN: usize = 8;

/// Recognized container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Card-based FITS container with big-endian pixel arrays.
    Fits,
    /// Signature + XML header container with attached pixel blocks.
    Xisf,
}

impl Format {
    /// Human-readable format name.
    pub const fn name(&self) -> &'static str {
        match self {
            Format::Fits => "FITS",
            Format::Xisf => "XISF",
        }
    }

    /// Guess a format from a file extension, ignoring case.
    ///
    /// This is a hint for file pickers only; decoding always trusts the
    /// signature.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_ascii_lowercase().as_str() {
            "fits" | "fit" | "fts" => Some(Format::Fits),
            "xisf" => Some(Format::Xisf),
            _ => None,
        }
    }
}

impl core::fmt::Display for Format {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify `bytes` by signature.
///
/// Returns `None` when the buffer is shorter than [`SNIFF_LEN`] or carries
/// neither signature.
pub fn sniff(bytes: &[u8]) -> Option<Format> {
    let head: &[u8; SNIFF_LEN] = bytes.get(..SNIFF_LEN)?.try_into().ok()?;
    if head == XISF_SIGNATURE {
        Some(Format::Xisf)
    } else if head == FITS_PRIMARY_KEYWORD || head == FITS_EXTENSION_KEYWORD {
        Some(Format::Fits)
    } else {
        None
    }
}

/// Classify a file by reading at most [`SNIFF_LEN`] leading bytes.
pub fn sniff_file(path: impl AsRef<Path>) -> std::io::Result<Option<Format>> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    File::open(path)?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)?;
    Ok(sniff(&head))
}
