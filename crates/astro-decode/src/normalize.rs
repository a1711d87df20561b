//! Linear min-max scaling of decoded samples into display bytes.

/// Minimum and maximum over the valid samples of one plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRange {
    pub min: f64,
    pub max: f64,
}

impl SampleRange {
    /// Range of the samples whose `valid` flag is set.
    ///
    /// Non-finite values are skipped even if flagged valid. Returns `None`
    /// when nothing qualifies.
    pub fn of(values: &[f64], valid: &[bool]) -> Option<SampleRange> {
        values
            .iter()
            .zip(valid)
            .filter(|(v, ok)| **ok && v.is_finite())
            .map(|(v, _)| *v)
            .fold(None, |acc, v| match acc {
                None => Some(SampleRange { min: v, max: v }),
                Some(r) => Some(SampleRange {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    /// `true` when every valid sample has the same value.
    pub fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }

    /// Scale one sample into `0..=255`.
    #[inline]
    pub fn scale(&self, sample: f64) -> u8 {
        if self.is_degenerate() {
            return clamp_to_byte(self.min);
        }
        clamp_to_byte((sample - self.min) * 255.0 / (self.max - self.min))
    }
}

/// Round to nearest and clamp into `0..=255`; NaN maps to 0.
#[inline]
pub fn clamp_to_byte(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

/// Normalize a plane of samples with its own range.
///
/// Invalid samples carry the substituted value (0) through the same scale.
/// A plane without any valid sample becomes all zeros.
pub fn normalize(values: &[f64], range: Option<SampleRange>) -> Vec<u8> {
    match range {
        Some(r) => values.iter().map(|&v| r.scale(v)).collect(),
        None => vec![0; values.len()],
    }
}
