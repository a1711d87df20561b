//! Pure Rust decoding of FITS and XISF astronomical images into typed
//! header metadata and 8-bit display pixels.

pub mod block;
pub mod compose;
pub mod decode;
pub mod descriptor;
pub mod endian;
pub mod error;
pub mod fits;
pub mod header;
pub mod metadata;
pub mod normalize;
pub mod observe;
pub mod pixels;
pub mod sniff;
pub mod stats;
pub mod value;
pub mod xisf;
pub mod xml;

pub use block::{BLOCK_SIZE, CARD_SIZE, DEFAULT_MAX_HEADER_LEN};
pub use compose::{DecodedImage, OutputMode};
pub use decode::{
    decode_image, decode_image_file, read_metadata, read_metadata_file, resolve_descriptor,
    DecodeOptions, Decoder,
};
pub use descriptor::{parse_geometry, ImageDescriptor, SampleFormat};
pub use error::{Error, Result};
pub use metadata::MetadataMap;
pub use observe::{DecodeEvent, DecodeObserver, NullObserver, TracingObserver};
pub use sniff::{sniff, Format};
pub use stats::PixelStats;
pub use value::MetadataValue;
