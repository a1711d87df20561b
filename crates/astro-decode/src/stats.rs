//! Summary statistics over display bytes.

/// Count, mean, extremes and population standard deviation of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelStats {
    pub count: usize,
    pub mean: f64,
    pub min: u8,
    pub max: u8,
    pub std_dev: f64,
}

impl PixelStats {
    /// Returns `None` for an empty slice.
    pub fn from_pixels(pixels: &[u8]) -> Option<PixelStats> {
        let (&first, _) = pixels.split_first()?;
        let count = pixels.len();

        let (sum, min, max) = pixels
            .iter()
            .fold((0u64, first, first), |(sum, min, max), &p| {
                (sum + u64::from(p), min.min(p), max.max(p))
            });
        let mean = sum as f64 / count as f64;

        let variance = pixels
            .iter()
            .map(|&p| {
                let d = f64::from(p) - mean;
                d * d
            })
            .sum::<f64>()
            / count as f64;

        Some(PixelStats {
            count,
            mean,
            min,
            max,
            std_dev: variance.sqrt(),
        })
    }
}
