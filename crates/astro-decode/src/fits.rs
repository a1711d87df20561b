//! FITS container: primary header metadata and image HDU location.

use crate::block::{padded_byte_len, CARD_SIZE};
use crate::compose::{DecodedImage, OutputMode};
use crate::decode::{DecodeOptions, Decoder};
use crate::descriptor::{Calibration, ChannelLayout, ImageDescriptor, SampleFormat};
use crate::endian::ByteOrder;
use crate::error::{Error, Result};
use crate::header::{parse_header, Header};
use crate::metadata::MetadataMap;
use crate::sniff::{sniff, Format};

/// Shortest buffer that can hold one header card.
pub const MIN_FITS_LEN: usize = CARD_SIZE;

fn check_signature(data: &[u8]) -> Result<()> {
    match sniff(data) {
        Some(Format::Fits) => Ok(()),
        _ => Err(Error::FormatMismatch {
            expected: Format::Fits.name(),
        }),
    }
}

/// Parse the primary header of a FITS buffer.
pub fn primary_header(data: &[u8]) -> Result<Header> {
    check_signature(data)?;
    parse_header(data)
}

/// Metadata from the primary header.
///
/// Buffers shorter than one card yield an empty map.
pub fn read_metadata(data: &[u8]) -> Result<MetadataMap> {
    if data.len() < MIN_FITS_LEN {
        return Ok(MetadataMap::new());
    }
    Ok(primary_header(data)?.to_metadata())
}

/// Locate the image to display: the primary HDU when it has at least two
/// axes, otherwise the first `IMAGE` extension.
pub fn resolve_descriptor(data: &[u8]) -> Result<ImageDescriptor> {
    check_signature(data)?;

    let mut offset = 0usize;
    let mut index = 0usize;
    while offset < data.len() {
        let header = parse_header(&data[offset..])?;
        let header_len = header.byte_len.ok_or_else(|| {
            Error::structural(format!("HDU {index} header has no END card"))
        })?;
        let data_start = offset.saturating_add(header_len);
        let is_primary = index == 0;

        if !is_primary && header.find("XTENSION").is_none() {
            tracing::debug!(offset, "trailing bytes after last HDU");
            break;
        }
        if is_image_hdu(&header, is_primary)? {
            tracing::debug!(hdu = index, "image HDU selected");
            return image_descriptor(&header, data_start, data.len());
        }

        let data_len = data_byte_len(&header, is_primary)?;
        offset = usize::try_from(data_len)
            .ok()
            .map(padded_byte_len)
            .and_then(|len| data_start.checked_add(len))
            .ok_or_else(|| Error::structural(format!("HDU {index} data size overflows")))?;
        index += 1;
    }
    Err(Error::structural("no image HDU with at least two axes"))
}

/// Decode the FITS image in `data` with default options.
pub fn decode_image(data: &[u8], mode: OutputMode) -> Result<DecodedImage> {
    let options = DecodeOptions {
        mode,
        ..DecodeOptions::default()
    };
    Decoder::new(options).decode_as(data, Format::Fits)
}

fn naxis(header: &Header) -> Result<i64> {
    header
        .integer("NAXIS")
        .ok_or_else(|| Error::structural("missing NAXIS"))
}

/// Random-groups data: `NAXIS1 = 0` with `GROUPS = T` in the primary.
fn is_random_groups(header: &Header) -> bool {
    header.integer("NAXIS1") == Some(0) && header.logical("GROUPS") == Some(true)
}

fn is_image_hdu(header: &Header, is_primary: bool) -> Result<bool> {
    if is_primary && is_random_groups(header) {
        return Ok(false);
    }
    if !is_primary {
        if header.logical("ZIMAGE") == Some(true) {
            return Err(Error::unsupported("tile-compressed image extension"));
        }
        if header.string("XTENSION").map(str::trim) != Some("IMAGE") {
            return Ok(false);
        }
    }
    Ok(naxis(header)? >= 2)
}

/// A positive `NAXISn` value.
fn axis(header: &Header, n: usize) -> Result<u32> {
    let keyword = format!("NAXIS{n}");
    let value = header
        .integer(&keyword)
        .ok_or_else(|| Error::structural(format!("missing {keyword}")))?;
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            Error::structural(format!(
                "invalid {keyword} {value}: expected a positive integer"
            ))
        })
}

fn image_descriptor(header: &Header, data_start: usize, buffer_len: usize) -> Result<ImageDescriptor> {
    let bitpix = header
        .integer("BITPIX")
        .ok_or_else(|| Error::structural("missing BITPIX"))?;
    let sample_format = SampleFormat::from_bitpix(bitpix)?;

    let width = axis(header, 1)?;
    let height = axis(header, 2)?;
    let channels = if naxis(header)? >= 3 { axis(header, 3)? } else { 1 };

    let calibration = Calibration::new(
        header.float("BSCALE").unwrap_or(1.0),
        header.float("BZERO").unwrap_or(0.0),
    );
    let blank = if sample_format.is_float() {
        None
    } else {
        header.integer("BLANK")
    };

    if data_start > buffer_len {
        return Err(Error::structural(format!(
            "data offset {data_start} is past end of buffer ({buffer_len} bytes)"
        )));
    }

    let mut descriptor = ImageDescriptor {
        width,
        height,
        channels,
        sample_format,
        payload_offset: data_start as u64,
        payload_length: 0,
        byte_order: ByteOrder::Big,
        layout: ChannelLayout::Planar,
        calibration,
        blank,
    };

    let expected = descriptor.check_geometry(buffer_len as u64)?;
    let available = (buffer_len - data_start) as u64;
    if expected > available {
        tracing::warn!(expected, available, "FITS data unit is truncated");
    }
    descriptor.payload_length = expected.min(available);
    descriptor.validate(buffer_len as u64)?;
    Ok(descriptor)
}

/// Size in bytes of an HDU's data unit before block padding.
///
/// `|BITPIX|/8 * GCOUNT * (PCOUNT + NAXIS1 * ... * NAXISn)`, with the first
/// axis dropped for primary random-groups data.
fn data_byte_len(header: &Header, is_primary: bool) -> Result<u64> {
    let bitpix = header
        .integer("BITPIX")
        .ok_or_else(|| Error::structural("missing BITPIX"))?;
    let naxis = naxis(header)?;
    if naxis <= 0 {
        return Ok(0);
    }

    let mut dims = Vec::with_capacity(naxis as usize);
    for n in 1..=naxis {
        let keyword = format!("NAXIS{n}");
        let dim = header
            .integer(&keyword)
            .and_then(|d| u64::try_from(d).ok())
            .ok_or_else(|| Error::structural(format!("missing or negative {keyword}")))?;
        dims.push(dim);
    }

    let random_groups = is_primary && is_random_groups(header);
    let axes = if random_groups { &dims[1..] } else { &dims[..] };
    let overflow = || Error::structural("data unit size overflows");

    let product = axes
        .iter()
        .try_fold(1u64, |acc, &d| acc.checked_mul(d))
        .ok_or_else(overflow)?;
    let pcount = header.integer("PCOUNT").unwrap_or(0).max(0) as u64;
    let gcount = header.integer("GCOUNT").unwrap_or(1).max(0) as u64;

    (bitpix.unsigned_abs() / 8)
        .checked_mul(gcount)
        .and_then(|n| n.checked_mul(pcount.checked_add(product)?))
        .ok_or_else(overflow)
}
