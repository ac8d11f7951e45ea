use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};

/// Represents the current playback state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PlaybackState {
    Stopped = 0,
    Playing = 1,
    Paused = 2,
}

impl From<u8> for PlaybackState {
    fn from(value: u8) -> Self {
        match value {
            1 => PlaybackState::Playing,
            2 => PlaybackState::Paused,
            _ => PlaybackState::Stopped,
        }
    }
}

/// Timing state shared by the control thread, the decode thread and the
/// output callback. All fields are atomics so the callback never blocks.
pub struct Clock {
    /// Output samples played since the last seek target.
    sample_pos: AtomicU64,
    /// Output device sample rate.
    sample_rate: AtomicU32,
    /// Output device channel count.
    channels: AtomicU8,
    state: AtomicU8,
    /// Set by a seek; the callback drops queued audio and resets it.
    clear_buffer: AtomicBool,
    /// Set by the decode thread once the session has nothing more to give.
    eos: AtomicBool,
}

impl Clock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_pos: AtomicU64::new(0),
            sample_rate: AtomicU32::new(sample_rate),
            channels: AtomicU8::new(2),
            state: AtomicU8::new(PlaybackState::Stopped as u8),
            clear_buffer: AtomicBool::new(false),
            eos: AtomicBool::new(false),
        }
    }

    pub fn get_sample_pos(&self) -> u64 {
        self.sample_pos.load(Ordering::Relaxed)
    }

    pub fn set_sample_pos(&self, pos: u64) {
        self.sample_pos.store(pos, Ordering::SeqCst);
    }

    /// Count samples handed to the device, only while playing.
    pub fn increment_samples(&self, amount: u64) {
        if self.get_state() == PlaybackState::Playing {
            self.sample_pos.fetch_add(amount, Ordering::Relaxed);
        }
    }

    /// Playback position in seconds of output audio.
    pub fn get_time_secs(&self) -> f64 {
        let rate = self.get_sample_rate() as f64;
        let channels = self.get_channels() as f64;
        if rate > 0.0 && channels > 0.0 {
            self.get_sample_pos() as f64 / (rate * channels)
        } else {
            0.0
        }
    }

    pub fn get_state(&self) -> PlaybackState {
        PlaybackState::from(self.state.load(Ordering::Relaxed))
    }

    pub fn set_state(&self, state: PlaybackState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub fn set_sample_rate(&self, rate: u32) {
        self.sample_rate.store(rate, Ordering::SeqCst);
    }

    pub fn get_sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    pub fn set_channels(&self, channels: u32) {
        self.channels.store(channels.min(u8::MAX as u32) as u8, Ordering::SeqCst);
    }

    pub fn get_channels(&self) -> u32 {
        self.channels.load(Ordering::Relaxed) as u32
    }

    pub fn signal_clear_buffer(&self) {
        self.clear_buffer.store(true, Ordering::SeqCst);
    }

    /// Consume a pending clear request.
    pub fn take_clear_buffer(&self) -> bool {
        self.clear_buffer.swap(false, Ordering::AcqRel)
    }

    pub fn set_eos(&self, eos: bool) {
        self.eos.store(eos, Ordering::SeqCst);
    }

    pub fn is_eos(&self) -> bool {
        self.eos.load(Ordering::Relaxed)
    }
}
