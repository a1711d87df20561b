//! Raw payload to numeric samples.
//!
//! A single routine covers every (sample format, byte order, channel layout)
//! combination. Output is always channel-planar, one [`Plane`] per kept
//! channel, with a validity flag per sample so that truncated payloads,
//! non-finite floats and BLANK pixels drop out of range statistics without
//! failing the decode.

use crate::descriptor::{ChannelLayout, ImageDescriptor, SampleFormat};
use crate::endian::ByteOrder;
use crate::error::Result;
use crate::normalize::SampleRange;

/// Decoded samples of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    /// Physical sample values; rejected samples hold `0.0`.
    pub values: Vec<f64>,
    /// `false` for samples that were absent, non-finite or BLANK.
    pub valid: Vec<bool>,
}

impl Plane {
    /// Range over the valid samples.
    pub fn range(&self) -> Option<SampleRange> {
        SampleRange::of(&self.values, &self.valid)
    }

    /// Number of rejected samples.
    pub fn rejected(&self) -> usize {
        self.valid.iter().filter(|ok| !**ok).count()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Channel-planar samples of an image.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePlanes {
    pub width: u32,
    pub height: u32,
    /// Channel count declared by the descriptor; may exceed `planes.len()`.
    pub channels: u32,
    pub planes: Vec<Plane>,
}

impl SamplePlanes {
    /// Copy the planes into an array shaped `(planes, height, width)`.
    #[cfg(feature = "array")]
    pub fn to_array3(&self) -> Result<ndarray::Array3<f64>> {
        let data: Vec<f64> = self
            .planes
            .iter()
            .flat_map(|p| p.values.iter().copied())
            .collect();
        ndarray::Array3::from_shape_vec(
            (self.planes.len(), self.height as usize, self.width as usize),
            data,
        )
        .map_err(|e| crate::error::Error::structural(e.to_string()))
    }
}

/// A stored sample before calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Raw {
    Integer(i64),
    Real(f64),
}

#[inline]
fn read_raw(format: SampleFormat, order: ByteOrder, bytes: &[u8]) -> Raw {
    match format {
        SampleFormat::UInt8 => Raw::Integer(bytes[0].into()),
        SampleFormat::UInt16 => Raw::Integer(order.read_u16(bytes).into()),
        SampleFormat::UInt32 => Raw::Integer(order.read_u32(bytes).into()),
        SampleFormat::Int16 => Raw::Integer(order.read_i16(bytes).into()),
        SampleFormat::Int32 => Raw::Integer(order.read_i32(bytes).into()),
        SampleFormat::Int64 => Raw::Integer(order.read_i64(bytes)),
        SampleFormat::Float32 => Raw::Real(order.read_f32(bytes).into()),
        SampleFormat::Float64 => Raw::Real(order.read_f64(bytes)),
    }
}

/// Turn a stored sample into a physical value, or `None` if it must be
/// excluded.
#[inline]
fn physical(raw: Raw, desc: &ImageDescriptor) -> Option<f64> {
    let stored = match raw {
        Raw::Integer(n) if desc.blank == Some(n) => return None,
        Raw::Integer(n) => n as f64,
        Raw::Real(f) if !f.is_finite() => return None,
        Raw::Real(f) => f,
    };
    let value = match &desc.calibration {
        Some(c) => c.apply(stored),
        None => stored,
    };
    value.is_finite().then_some(value)
}

fn to_index(v: u64) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}

/// Decode up to `max_planes` channels of the image `desc` describes.
///
/// Samples whose bytes fall outside the declared payload or outside
/// `buffer` are marked invalid rather than failing the call. A geometry
/// that fails [`ImageDescriptor::check_geometry`] is rejected before any
/// plane is allocated.
pub fn decode_planes(
    buffer: &[u8],
    desc: &ImageDescriptor,
    max_planes: usize,
) -> Result<SamplePlanes> {
    desc.check_geometry(buffer.len() as u64)?;
    let width = desc.sample_format.byte_width();
    let pixel_count = desc.width as usize * desc.height as usize;
    let channels = desc.channels as usize;
    let kept = channels.min(max_planes);

    let start = to_index(desc.payload_offset).min(buffer.len());
    let end = to_index(desc.payload_offset.saturating_add(desc.payload_length)).min(buffer.len());
    let payload = &buffer[start..end.max(start)];

    let mut planes = Vec::with_capacity(kept);
    for channel in 0..kept {
        let mut values = vec![0.0; pixel_count];
        let mut valid = vec![false; pixel_count];
        for pixel in 0..pixel_count {
            let sample_index = match desc.layout {
                ChannelLayout::Planar => channel * pixel_count + pixel,
                ChannelLayout::Interleaved => pixel * channels + channel,
            };
            let at = sample_index * width;
            let Some(bytes) = payload.get(at..at + width) else {
                continue;
            };
            if let Some(v) = physical(read_raw(desc.sample_format, desc.byte_order, bytes), desc)
            {
                values[pixel] = v;
                valid[pixel] = true;
            }
        }
        planes.push(Plane { values, valid });
    }

    Ok(SamplePlanes {
        width: desc.width,
        height: desc.height,
        channels: desc.channels,
        planes,
    })
}
