//! The image declaration shared by both containers: geometry, sample
//! encoding and the byte range of the pixel payload.

use crate::endian::ByteOrder;
use crate::error::{Error, Result};

/// Encoding of one scalar pixel sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    UInt8,
    UInt16,
    UInt32,
    /// FITS `BITPIX = 16`.
    Int16,
    /// FITS `BITPIX = 32`.
    Int32,
    /// FITS `BITPIX = 64`.
    Int64,
    Float32,
    Float64,
}

impl SampleFormat {
    /// Size of one sample in bytes.
    pub const fn byte_width(self) -> usize {
        match self {
            SampleFormat::UInt8 => 1,
            SampleFormat::UInt16 | SampleFormat::Int16 => 2,
            SampleFormat::UInt32 | SampleFormat::Int32 | SampleFormat::Float32 => 4,
            SampleFormat::Int64 | SampleFormat::Float64 => 8,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, SampleFormat::Float32 | SampleFormat::Float64)
    }

    /// Map a FITS BITPIX value to its sample format.
    pub fn from_bitpix(bitpix: i64) -> Result<SampleFormat> {
        match bitpix {
            8 => Ok(SampleFormat::UInt8),
            16 => Ok(SampleFormat::Int16),
            32 => Ok(SampleFormat::Int32),
            64 => Ok(SampleFormat::Int64),
            -32 => Ok(SampleFormat::Float32),
            -64 => Ok(SampleFormat::Float64),
            other => Err(Error::unsupported(format!("BITPIX {other}"))),
        }
    }

    /// Map an XISF `sampleFormat` attribute to its sample format.
    pub fn from_xisf_name(name: &str) -> Result<SampleFormat> {
        match name.trim() {
            "UInt8" => Ok(SampleFormat::UInt8),
            "UInt16" => Ok(SampleFormat::UInt16),
            "UInt32" => Ok(SampleFormat::UInt32),
            "Float32" => Ok(SampleFormat::Float32),
            "Float64" => Ok(SampleFormat::Float64),
            other => Err(Error::unsupported(format!("sample format '{other}'"))),
        }
    }
}

/// Order of channels within the payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    /// All samples of channel 0, then channel 1, and so on.
    #[default]
    Planar,
    /// Channels interleaved per pixel (XISF `pixelStorage="Normal"`).
    Interleaved,
}

/// Linear transform from stored to physical values
/// (`physical = zero + scale * stored`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub scale: f64,
    pub zero: f64,
}

impl Calibration {
    /// Returns `None` for the identity transform.
    pub fn new(scale: f64, zero: f64) -> Option<Calibration> {
        if scale == 1.0 && zero == 0.0 {
            None
        } else {
            Some(Calibration { scale, zero })
        }
    }

    #[inline]
    pub fn apply(&self, stored: f64) -> f64 {
        self.zero + self.scale * stored
    }
}

/// The authoritative image declaration of a container.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDescriptor {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub sample_format: SampleFormat,
    /// Absolute byte offset of the payload within the buffer.
    pub payload_offset: u64,
    /// Payload length in bytes.
    pub payload_length: u64,
    pub byte_order: ByteOrder,
    pub layout: ChannelLayout,
    pub calibration: Option<Calibration>,
    /// Stored integer value marking undefined pixels.
    pub blank: Option<i64>,
}

/// How many times larger than the whole buffer the geometry may claim the
/// payload to be. Truncated payloads decode partially up to this bound;
/// beyond it the geometry is taken to be corrupt.
pub const MAX_GEOMETRY_OVERCLAIM: u64 = 16;

impl ImageDescriptor {
    /// Pixels per channel, or `None` if the count overflows.
    pub fn pixel_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// Samples across all channels, or `None` if the count overflows.
    pub fn sample_count(&self) -> Option<usize> {
        self.pixel_count()?.checked_mul(self.channels as usize)
    }

    /// Bytes the geometry implies for the whole payload.
    pub fn expected_payload_len(&self) -> Option<u64> {
        u64::try_from(self.sample_count()?)
            .ok()?
            .checked_mul(self.sample_format.byte_width() as u64)
    }

    /// Check the geometry alone against a buffer of `buffer_len` bytes and
    /// return the implied payload size.
    ///
    /// A zero dimension, an overflowing size, or a size more than
    /// [`MAX_GEOMETRY_OVERCLAIM`] times the buffer is structural.
    pub fn check_geometry(&self, buffer_len: u64) -> Result<u64> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::structural(format!(
                "image geometry {}x{} has a zero dimension",
                self.width, self.height
            )));
        }
        if self.channels == 0 {
            return Err(Error::structural("image declares zero channels"));
        }
        let expected = self.expected_payload_len().ok_or_else(|| {
            Error::structural(format!(
                "image geometry {}x{}x{} overflows",
                self.width, self.height, self.channels
            ))
        })?;
        let limit = buffer_len.saturating_mul(MAX_GEOMETRY_OVERCLAIM);
        if expected > limit {
            return Err(Error::structural(format!(
                "image geometry {}x{}x{} implies {expected} bytes, \
                 far more than the {buffer_len}-byte buffer",
                self.width, self.height, self.channels
            )));
        }
        Ok(expected)
    }

    /// Check the geometry and the payload range against a buffer of
    /// `buffer_len` bytes.
    pub fn validate(&self, buffer_len: u64) -> Result<()> {
        self.check_geometry(buffer_len)?;
        let end = self
            .payload_offset
            .checked_add(self.payload_length)
            .ok_or_else(|| Error::structural("payload range overflows"))?;
        if end > buffer_len {
            return Err(Error::structural(format!(
                "payload {}..{} extends past end of buffer ({buffer_len} bytes)",
                self.payload_offset, end
            )));
        }
        Ok(())
    }
}

/// Parse a positive integer field, naming it in the error.
fn parse_positive(field: &'static str, text: &str) -> Result<u32> {
    match text.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::structural(format!(
            "invalid {field} '{}': expected a positive integer",
            text.trim()
        ))),
    }
}

fn parse_non_negative(field: &'static str, text: &str) -> Result<u64> {
    text.trim().parse::<u64>().map_err(|_| {
        Error::structural(format!(
            "invalid {field} '{}': expected a non-negative integer",
            text.trim()
        ))
    })
}

/// Parse a `width:height:channels` geometry string.
///
/// Fewer than three parts is a structural error; more than three describes
/// a volume, which is not supported.
pub fn parse_geometry(geometry: &str) -> Result<(u32, u32, u32)> {
    let parts: Vec<&str> = geometry.split(':').collect();
    match parts.len() {
        0..=2 => Err(Error::structural(format!(
            "geometry '{geometry}' must be width:height:channels"
        ))),
        3 => Ok((
            parse_positive("geometry width", parts[0])?,
            parse_positive("geometry height", parts[1])?,
            parse_positive("geometry channels", parts[2])?,
        )),
        n => Err(Error::unsupported(format!(
            "{}-dimensional geometry '{geometry}'",
            n - 1
        ))),
    }
}

/// Parse an `attachment:<offset>:<length>` location into `(offset, length)`.
///
/// Any other scheme (`inline`, `embedded`, `url`, `path`) is unsupported.
pub fn parse_location(location: &str) -> Result<(u64, u64)> {
    let mut parts = location.split(':');
    let scheme = parts.next().unwrap_or_default().trim();
    if scheme != "attachment" {
        return Err(Error::unsupported(format!("location scheme '{scheme}'")));
    }
    let rest: Vec<&str> = parts.collect();
    if rest.len() != 2 {
        return Err(Error::structural(format!(
            "location '{location}' must be attachment:offset:length"
        )));
    }
    let offset = parse_non_negative("location offset", rest[0])?;
    let length = parse_non_negative("location length", rest[1])?;
    Ok((offset, length))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(offset: u64, length: u64) -> ImageDescriptor {
        ImageDescriptor {
            width: 4,
            height: 2,
            channels: 1,
            sample_format: SampleFormat::UInt16,
            payload_offset: offset,
            payload_length: length,
            byte_order: ByteOrder::Little,
            layout: ChannelLayout::Planar,
            calibration: None,
            blank: None,
        }
    }

    #[test]
    fn geometry_full() {
        assert_eq!(parse_geometry("1920:1080:1").unwrap(), (1920, 1080, 1));
        assert_eq!(parse_geometry("640:480:3").unwrap(), (640, 480, 3));
    }

    #[test]
    fn geometry_too_few_parts() {
        let err = parse_geometry("1920:1080").unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
    }

    #[test]
    fn geometry_names_failing_field() {
        let err = parse_geometry("1920:abc:1").unwrap_err();
        assert!(err.to_string().contains("geometry height"));
        let err = parse_geometry("0:10:1").unwrap_err();
        assert!(err.to_string().contains("geometry width"));
        let err = parse_geometry("10:10:0").unwrap_err();
        assert!(err.to_string().contains("geometry channels"));
    }

    #[test]
    fn geometry_volume_unsupported() {
        let err = parse_geometry("10:10:10:1").unwrap_err();
        assert!(matches!(err, Error::UnsupportedEncoding(_)));
    }

    #[test]
    fn location_attachment() {
        assert_eq!(parse_location("attachment:4096:2073600").unwrap(), (4096, 2073600));
        assert_eq!(parse_location("attachment:0:0").unwrap(), (0, 0));
    }

    #[test]
    fn location_other_schemes() {
        for loc in ["inline:base64", "embedded", "url(file:///a.raw)", "path(@header_dir/a)"] {
            let err = parse_location(loc).unwrap_err();
            assert!(matches!(err, Error::UnsupportedEncoding(_)), "{loc}");
        }
    }

    #[test]
    fn location_malformed() {
        let err = parse_location("attachment:12").unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
        let err = parse_location("attachment:-5:10").unwrap_err();
        assert!(err.to_string().contains("location offset"));
        let err = parse_location("attachment:5:x").unwrap_err();
        assert!(err.to_string().contains("location length"));
    }

    #[test]
    fn bitpix_mapping() {
        assert_eq!(SampleFormat::from_bitpix(-32).unwrap(), SampleFormat::Float32);
        assert_eq!(SampleFormat::from_bitpix(16).unwrap(), SampleFormat::Int16);
        assert!(matches!(
            SampleFormat::from_bitpix(12),
            Err(Error::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn xisf_sample_names() {
        assert_eq!(SampleFormat::from_xisf_name("UInt16").unwrap(), SampleFormat::UInt16);
        assert!(SampleFormat::from_xisf_name("Complex32").is_err());
        assert_eq!(SampleFormat::Float64.byte_width(), 8);
    }

    #[test]
    fn validate_payload_bounds() {
        assert!(descriptor(16, 16).validate(32).is_ok());
        assert!(descriptor(16, 17).validate(32).is_err());
        assert!(descriptor(u64::MAX, 2).validate(32).is_err());
    }

    #[test]
    fn expected_payload_len() {
        let d = descriptor(0, 16);
        assert_eq!(d.sample_count(), Some(8));
        assert_eq!(d.expected_payload_len(), Some(16));
    }

    #[test]
    fn overflowing_geometry_is_structural() {
        let mut d = descriptor(0, 0);
        d.width = u32::MAX;
        d.height = u32::MAX;
        d.channels = 2;
        assert_eq!(d.expected_payload_len(), None);
        let err = d.validate(1024).unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn geometry_far_beyond_buffer_is_structural() {
        let mut d = descriptor(0, 0);
        d.width = 100_000;
        d.height = 100_000;
        assert!(matches!(d.validate(4096), Err(Error::Structural(_))));

        // A modest shortfall is still accepted for partial decoding.
        let d = descriptor(0, 4);
        assert_eq!(d.check_geometry(8).unwrap(), 16);
    }

    #[test]
    fn identity_calibration_is_none() {
        assert!(Calibration::new(1.0, 0.0).is_none());
        let c = Calibration::new(1.0, 32768.0).unwrap();
        assert_eq!(c.apply(-32768.0), 0.0);
    }
}
