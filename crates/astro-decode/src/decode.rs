//! Format-agnostic entry points.
//!
//! [`Decoder`] sniffs the container, runs the matching format module and
//! reports each step to its [`DecodeObserver`]. The free functions use a
//! default decoder.

use std::io::ErrorKind;
use std::path::Path;

use crate::block::DEFAULT_MAX_HEADER_LEN;
use crate::compose::{compose, DecodedImage, OutputMode, NEUTRAL_GRAY};
use crate::descriptor::ImageDescriptor;
use crate::error::{Error, Result};
use crate::metadata::MetadataMap;
use crate::observe::{DecodeEvent, DecodeObserver, TracingObserver};
use crate::pixels::{decode_planes, SamplePlanes};
use crate::sniff::{sniff, Format, SNIFF_LEN};
use crate::{fits, xisf};

/// Channels the composer can use.
const MAX_DISPLAY_CHANNELS: usize = 3;

/// Decode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Output pixel layout.
    pub mode: OutputMode,
    /// Largest XISF XML header accepted, in bytes.
    pub max_header_len: usize,
    /// Byte written for every pixel of a two-channel image.
    pub two_channel_fill: u8,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            mode: OutputMode::Grayscale,
            max_header_len: DEFAULT_MAX_HEADER_LEN,
            two_channel_fill: NEUTRAL_GRAY,
        }
    }
}

/// Reusable decoder holding options and an event observer.
#[derive(Debug, Clone)]
pub struct Decoder<O = TracingObserver> {
    options: DecodeOptions,
    observer: O,
}

impl Decoder<TracingObserver> {
    pub fn new(options: DecodeOptions) -> Self {
        Decoder {
            options,
            observer: TracingObserver,
        }
    }
}

impl Default for Decoder<TracingObserver> {
    fn default() -> Self {
        Decoder::new(DecodeOptions::default())
    }
}

impl<O: DecodeObserver> Decoder<O> {
    /// Replace the observer.
    pub fn with_observer<P: DecodeObserver>(self, observer: P) -> Decoder<P> {
        Decoder {
            options: self.options,
            observer,
        }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    fn detect(&self, data: &[u8]) -> Result<Format> {
        let format = sniff(data).ok_or(Error::FormatMismatch {
            expected: "FITS or XISF",
        })?;
        self.observer.on_event(&DecodeEvent::FormatDetected { format });
        Ok(format)
    }

    /// Typed header metadata of a FITS or XISF buffer.
    ///
    /// Buffers too short to carry a signature yield an empty map.
    pub fn read_metadata(&self, data: &[u8]) -> Result<MetadataMap> {
        if data.len() < SNIFF_LEN {
            return Ok(MetadataMap::new());
        }
        let format = self.detect(data)?;
        let map = match format {
            Format::Fits => fits::read_metadata(data)?,
            Format::Xisf => xisf::read_metadata_with(data, self.options.max_header_len)?,
        };
        self.observer.on_event(&DecodeEvent::HeaderParsed {
            format,
            entries: map.len(),
        });
        Ok(map)
    }

    /// Metadata of the file at `path`; a missing file yields an empty map.
    pub fn read_metadata_file(&self, path: impl AsRef<Path>) -> Result<MetadataMap> {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(data) => self.read_metadata(&data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "file not found, no metadata");
                Ok(MetadataMap::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Locate the displayed image of a FITS or XISF buffer.
    pub fn resolve_descriptor(&self, data: &[u8]) -> Result<ImageDescriptor> {
        let format = self.detect(data)?;
        self.resolve_as(data, format)
    }

    fn resolve_as(&self, data: &[u8], format: Format) -> Result<ImageDescriptor> {
        let descriptor = match format {
            Format::Fits => fits::resolve_descriptor(data)?,
            Format::Xisf => xisf::resolve_descriptor_with(data, self.options.max_header_len)?,
        };
        self.observer.on_event(&DecodeEvent::DescriptorResolved {
            descriptor: &descriptor,
        });
        Ok(descriptor)
    }

    /// Decoded samples of up to three channels, before normalization.
    pub fn decode_samples(&self, data: &[u8]) -> Result<(ImageDescriptor, SamplePlanes)> {
        let format = self.detect(data)?;
        let descriptor = self.resolve_as(data, format)?;
        let planes = decode_planes(data, &descriptor, MAX_DISPLAY_CHANNELS)?;
        Ok((descriptor, planes))
    }

    /// Decode and normalize the image of a FITS or XISF buffer.
    pub fn decode(&self, data: &[u8]) -> Result<DecodedImage> {
        let format = self.detect(data)?;
        self.decode_as(data, format)
    }

    /// Decode `data` as `format` without sniffing.
    pub fn decode_as(&self, data: &[u8], format: Format) -> Result<DecodedImage> {
        let descriptor = self.resolve_as(data, format)?;
        let planes = decode_planes(data, &descriptor, MAX_DISPLAY_CHANNELS)?;
        Ok(compose(
            &planes,
            self.options.mode,
            self.options.two_channel_fill,
            &self.observer,
        ))
    }

    /// Read the whole file at `path` and decode it.
    pub fn decode_file(&self, path: impl AsRef<Path>) -> Result<DecodedImage> {
        let data = std::fs::read(path)?;
        self.decode(&data)
    }
}

/// Metadata of a FITS or XISF buffer with default options.
pub fn read_metadata(data: &[u8]) -> Result<MetadataMap> {
    Decoder::default().read_metadata(data)
}

/// Metadata of a file with default options; a missing file yields an empty
/// map.
pub fn read_metadata_file(path: impl AsRef<Path>) -> Result<MetadataMap> {
    Decoder::default().read_metadata_file(path)
}

pub fn resolve_descriptor(data: &[u8]) -> Result<ImageDescriptor> {
    Decoder::default().resolve_descriptor(data)
}

/// Decode the image of a FITS or XISF buffer.
pub fn decode_image(data: &[u8], mode: OutputMode) -> Result<DecodedImage> {
    Decoder::new(DecodeOptions {
        mode,
        ..DecodeOptions::default()
    })
    .decode(data)
}

/// Decode the image of a file.
pub fn decode_image_file(path: impl AsRef<Path>, mode: OutputMode) -> Result<DecodedImage> {
    Decoder::new(DecodeOptions {
        mode,
        ..DecodeOptions::default()
    })
    .decode_file(path)
}
