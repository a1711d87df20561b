//! Planes to display pixels: grayscale, luminance or true color.

use crate::normalize::{normalize, SampleRange};
use crate::observe::{DecodeEvent, DecodeObserver};
use crate::pixels::{Plane, SamplePlanes};
use crate::stats::PixelStats;

/// ITU-R BT.709 luma weights for R, G and B.
pub const BT709_WEIGHTS: [f64; 3] = [0.2126, 0.7152, 0.0722];

/// Fill value for images whose channel count has no display mapping.
pub const NEUTRAL_GRAY: u8 = 128;

/// Requested output pixel layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputMode {
    /// One byte per pixel.
    #[default]
    Grayscale,
    /// Three interleaved bytes (R, G, B) per pixel.
    Rgb,
}

impl OutputMode {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            OutputMode::Grayscale => 1,
            OutputMode::Rgb => 3,
        }
    }
}

/// A normalized, displayable image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub mode: OutputMode,
    /// Row-major bytes, `width * height * mode.bytes_per_pixel()` long.
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Count, mean, extremes and standard deviation over every byte.
    pub fn stats(&self) -> Option<PixelStats> {
        PixelStats::from_pixels(&self.pixels)
    }

    /// Wrap the pixels in an `image` buffer for rendering or export.
    #[cfg(feature = "image")]
    pub fn to_dynamic_image(&self) -> Option<image::DynamicImage> {
        match self.mode {
            OutputMode::Grayscale => {
                image::GrayImage::from_raw(self.width, self.height, self.pixels.clone())
                    .map(image::DynamicImage::ImageLuma8)
            }
            OutputMode::Rgb => {
                image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
                    .map(image::DynamicImage::ImageRgb8)
            }
        }
    }
}

const RGB_PLANE_NAMES: [&str; 3] = ["red", "green", "blue"];

fn normalize_plane<O: DecodeObserver>(plane: &Plane, name: &'static str, observer: &O) -> Vec<u8> {
    let rejected = plane.rejected();
    if rejected > 0 {
        observer.on_event(&DecodeEvent::SamplesRejected {
            plane: name,
            count: rejected,
        });
    }
    let range = plane.range();
    observer.on_event(&DecodeEvent::PlaneRange { plane: name, range });
    normalize(&plane.values, range)
}

/// BT.709 luma of the first three planes. A pixel is valid only when all
/// three of its channels are.
fn luma_plane(planes: &[Plane]) -> Plane {
    let [r, g, b] = [&planes[0], &planes[1], &planes[2]];
    let (values, valid) = (0..r.len())
        .map(|i| {
            if r.valid[i] && g.valid[i] && b.valid[i] {
                let y = BT709_WEIGHTS[0] * r.values[i]
                    + BT709_WEIGHTS[1] * g.values[i]
                    + BT709_WEIGHTS[2] * b.values[i];
                (y, true)
            } else {
                (0.0, false)
            }
        })
        .unzip();
    Plane { values, valid }
}

fn interleave(channels: [Vec<u8>; 3]) -> Vec<u8> {
    let [r, g, b] = channels;
    r.iter()
        .zip(&g)
        .zip(&b)
        .flat_map(|((&r, &g), &b)| [r, g, b])
        .collect()
}

/// Compose decoded planes into display pixels.
///
/// * one channel: the normalized plane, replicated into R, G and B for RGB;
/// * three or more: luma then one normalization for grayscale, independent
///   per-channel normalization for RGB; channels past the third are ignored;
/// * two channels: a flat `two_channel_fill`.
pub fn compose<O: DecodeObserver>(
    samples: &SamplePlanes,
    mode: OutputMode,
    two_channel_fill: u8,
    observer: &O,
) -> DecodedImage {
    let pixel_count = samples.width as usize * samples.height as usize;

    let pixels = match (samples.planes.len(), mode) {
        (0, _) => vec![0; pixel_count * mode.bytes_per_pixel()],
        (1, OutputMode::Grayscale) => normalize_plane(&samples.planes[0], "gray", observer),
        (1, OutputMode::Rgb) => {
            let gray = normalize_plane(&samples.planes[0], "gray", observer);
            gray.iter().flat_map(|&v| [v, v, v]).collect()
        }
        (2, _) => {
            tracing::debug!("two-channel image shown as flat gray");
            vec![two_channel_fill; pixel_count * mode.bytes_per_pixel()]
        }
        (_, OutputMode::Grayscale) => {
            let luma = luma_plane(&samples.planes);
            normalize_plane(&luma, "luma", observer)
        }
        (_, OutputMode::Rgb) => {
            let channels = [0, 1, 2].map(|c| {
                normalize_plane(&samples.planes[c], RGB_PLANE_NAMES[c], observer)
            });
            interleave(channels)
        }
    };

    observer.on_event(&DecodeEvent::ImageComposed {
        width: samples.width,
        height: samples.height,
        mode,
    });

    DecodedImage {
        width: samples.width,
        height: samples.height,
        mode,
        pixels,
    }
}

/// Range the grayscale output of `samples` would be scaled with.
pub fn display_range(samples: &SamplePlanes) -> Option<SampleRange> {
    match samples.planes.len() {
        1 => samples.planes[0].range(),
        n if n >= 3 => luma_plane(&samples.planes).range(),
        _ => None,
    }
}
