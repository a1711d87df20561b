//! Fixed record sizes of the two containers.

/// FITS logical record length; headers and data units are padded to it.
pub const BLOCK_SIZE: usize = 2880;

/// Length of one FITS header card.
pub const CARD_SIZE: usize = 80;

/// Length of the XISF monolithic file signature (`XISF0100`).
pub const XISF_SIGNATURE_LEN: usize = 8;

/// Signature, header length and reserved field of an XISF file.
pub const XISF_PREAMBLE_LEN: usize = 16;

/// Default ceiling for the XISF XML header length (100 MiB).
pub const DEFAULT_MAX_HEADER_LEN: usize = 100 * 1024 * 1024;

/// Whole FITS records spanned by `num_bytes`; zero bytes span none.
pub const fn blocks_needed(num_bytes: usize) -> usize {
    if num_bytes == 0 {
        return 0;
    }
    num_bytes.div_ceil(BLOCK_SIZE)
}

/// `num_bytes` rounded up to a record boundary.
pub const fn padded_byte_len(num_bytes: usize) -> usize {
    blocks_needed(num_bytes) * BLOCK_SIZE
}
