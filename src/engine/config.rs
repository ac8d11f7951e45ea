//! Tunables for decode sessions and the demo player.

/// Settings for a `DecodeSession`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Channel count to ask the backend for. The backend decides.
    pub target_channels: Option<u16>,
    /// Sample rate to ask the backend for. The backend decides.
    pub target_sample_rate: Option<u32>,
    /// Initial leftover size, in samples, when the backend cannot suggest one.
    pub fallback_leftover_samples: usize,
    /// Ticks subtracted from every seek target; backends tend to land late.
    pub seek_bias_ticks: i64,
    /// Consecutive empty chunks tolerated within one read.
    pub max_empty_pulls: usize,
    /// Seek to frame 0 at the end of `open`, skipping header frames.
    pub prime_on_open: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_channels: None,
            target_sample_rate: None,
            fallback_leftover_samples: 32,
            seek_bias_ticks: 1,
            max_empty_pulls: 64,
            prime_on_open: true,
        }
    }
}

impl SessionConfig {
    pub fn with_target_channels(mut self, channels: u16) -> Self {
        self.target_channels = Some(channels);
        self
    }

    pub fn with_target_sample_rate(mut self, sample_rate: u32) -> Self {
        self.target_sample_rate = Some(sample_rate);
        self
    }

    pub fn with_fallback_leftover_samples(mut self, samples: usize) -> Self {
        self.fallback_leftover_samples = samples;
        self
    }

    pub fn with_seek_bias_ticks(mut self, ticks: i64) -> Self {
        self.seek_bias_ticks = ticks;
        self
    }

    pub fn with_max_empty_pulls(mut self, pulls: usize) -> Self {
        self.max_empty_pulls = pulls;
        self
    }

    pub fn with_prime_on_open(mut self, prime: bool) -> Self {
        self.prime_on_open = prime;
        self
    }
}

/// Settings for the playback engine's decode thread.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    /// Frames requested from the session per read.
    pub read_frames: usize,
    /// Length of the prefetch ring in seconds of output audio.
    pub ring_seconds: f32,
    /// Input frames per resampler block.
    pub resampler_chunk: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            read_frames: 1024,
            ring_seconds: 1.0,
            resampler_chunk: 1024,
        }
    }
}

impl PlayerConfig {
    /// Ring capacity in samples for the given output layout.
    pub fn ring_capacity(&self, sample_rate: u32, channels: u32) -> usize {
        let samples = self.ring_seconds.max(0.0) as f64 * sample_rate as f64 * channels as f64;
        (samples as usize).max(self.read_frames * channels as usize * 2)
    }
}
