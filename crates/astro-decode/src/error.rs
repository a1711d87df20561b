use thiserror::Error;

/// All errors that can occur while decoding FITS or XISF data.
#[derive(Debug, Error)]
pub enum Error {
    /// The leading signature is absent or belongs to another format.
    #[error("format mismatch: expected {expected} signature")]
    FormatMismatch {
        /// Name of the format the caller asked for.
        expected: &'static str,
    },
    /// Malformed or out-of-range header content.
    #[error("structural error: {0}")]
    Structural(String),
    /// The container is well formed but uses a feature this decoder lacks.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),
    /// An I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn structural(msg: impl Into<String>) -> Self {
        Error::Structural(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Error::UnsupportedEncoding(msg.into())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
