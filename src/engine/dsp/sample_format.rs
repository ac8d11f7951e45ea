use crate::error::{DecodeError, Result};

/// Widest native sample the converter accepts. Wider values would round the
/// maximum positive sample up to 1.0 in f32.
pub const MAX_BITS_PER_SAMPLE: u32 = 24;

/// Converts signed fixed-point native samples to canonical f32 in [-1.0, 1.0).
///
/// Channel layout passes through untouched: mono input stays mono.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatConverter {
    bits_per_sample: u32,
    scale: f32,
}

impl FormatConverter {
    pub fn new(bits_per_sample: u32) -> Result<Self> {
        if !(2..=MAX_BITS_PER_SAMPLE).contains(&bits_per_sample) {
            return Err(DecodeError::UnsupportedSampleWidth(bits_per_sample));
        }
        Ok(Self {
            bits_per_sample,
            scale: (1u32 << (bits_per_sample - 1)) as f32,
        })
    }

    pub fn bits_per_sample(&self) -> u32 {
        self.bits_per_sample
    }

    /// Largest representable native sample.
    pub fn max_sample(&self) -> i32 {
        (1i32 << (self.bits_per_sample - 1)) - 1
    }

    /// Smallest representable native sample.
    pub fn min_sample(&self) -> i32 {
        -(1i32 << (self.bits_per_sample - 1))
    }

    #[inline]
    pub fn convert_sample(&self, native: i32) -> f32 {
        native as f32 / self.scale
    }

    /// Convert `native` into the front of `out`. Returns samples written.
    pub fn convert(&self, native: &[i32], out: &mut [f32]) -> usize {
        let n = native.len().min(out.len());
        for (dst, &src) in out[..n].iter_mut().zip(&native[..n]) {
            *dst = self.convert_sample(src);
        }
        n
    }
}
