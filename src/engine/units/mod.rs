//! Conversions between backend time units, seconds and frame indices.
//!
//! Backend time is counted in 100 ns ticks. Frame conversions return `f64`;
//! callers truncate explicitly.

/// Backend ticks per second.
pub const TICKS_PER_SECOND: f64 = 1e7;

/// Convert backend ticks to seconds.
#[inline]
pub fn seconds_from_backend_units(units: i64) -> f64 {
    units as f64 / TICKS_PER_SECOND
}

/// Convert seconds to backend ticks.
#[inline]
pub fn backend_units_from_seconds(seconds: f64) -> f64 {
    seconds * TICKS_PER_SECOND
}

/// Frame/tick conversions at a fixed sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitConverter {
    sample_rate: u32,
}

impl UnitConverter {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frame index at the given backend time.
    #[inline]
    pub fn frame_from_backend_units(&self, units: i64) -> f64 {
        units as f64 * self.sample_rate as f64 / TICKS_PER_SECOND
    }

    /// Backend time at the given frame index.
    #[inline]
    pub fn backend_units_from_frame(&self, frame: i64) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        frame as f64 / self.sample_rate as f64 * TICKS_PER_SECOND
    }
}
