//! Growable store for decoded frames the caller has not received yet.
//!
//! Frames are kept in the backend's native representation (`i32` holding a
//! `bits_per_sample`-wide value), interleaved. Capacity and length are
//! counted in frames.

use tracing::trace;

/// Decoded frames carried across `read` calls.
#[derive(Debug)]
pub struct LeftoverBuffer {
    samples: Vec<i32>,
    channels: usize,
    capacity: usize,
    length: usize,
    frame_position: i64,
}

impl LeftoverBuffer {
    /// Create an empty buffer able to hold `capacity` frames without growing.
    pub fn new(channels: usize, capacity: usize) -> Self {
        let channels = channels.max(1);
        let capacity = capacity.max(1);
        Self {
            samples: vec![0; capacity * channels],
            channels,
            capacity,
            length: 0,
            frame_position: 0,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames that fit before the next growth.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames currently held.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Frame index of the first held frame. Meaningless while empty.
    pub fn frame_position(&self) -> i64 {
        self.frame_position
    }

    /// The held frames, interleaved.
    pub fn frames(&self) -> &[i32] {
        &self.samples[..self.length * self.channels]
    }

    /// Discard all held frames.
    pub fn clear(&mut self) {
        self.length = 0;
    }

    /// Grow so that at least `needed` frames fit, doubling each step.
    ///
    /// Never shrinks. Held frames are preserved.
    pub fn ensure_capacity(&mut self, needed: usize) {
        if needed <= self.capacity {
            return;
        }
        let mut new_capacity = self.capacity.max(1);
        while new_capacity < needed {
            new_capacity *= 2;
        }
        trace!(from = self.capacity, to = new_capacity, "Growing leftover buffer");
        self.samples.resize(new_capacity * self.channels, 0);
        self.capacity = new_capacity;
    }

    /// Copy up to `frames_wanted` held frames to the front of `dest`.
    ///
    /// Undelivered frames move to the front of the buffer and
    /// `frame_position` advances by the frames consumed. Returns how many of
    /// `frames_wanted` are still missing.
    pub fn drain_into(&mut self, dest: &mut [i32], frames_wanted: usize) -> usize {
        let ch = self.channels;
        let frames_wanted = frames_wanted.min(dest.len() / ch);
        let consumed = frames_wanted.min(self.length);

        dest[..consumed * ch].copy_from_slice(&self.samples[..consumed * ch]);

        if consumed < self.length {
            self.samples.copy_within(consumed * ch..self.length * ch, 0);
            self.length -= consumed;
            self.frame_position += consumed as i64;
        } else {
            self.length = 0;
        }

        frames_wanted - consumed
    }

    /// Deliver a freshly decoded run of frames and keep what does not fit.
    ///
    /// `src` starts at frame index `start_frame`. Up to `frames_wanted` frames
    /// go to the front of `dest`; the tail replaces the buffer contents, tagged
    /// with the frame index it starts at. The buffer must be empty on entry.
    pub fn append_and_spill(
        &mut self,
        src: &[i32],
        start_frame: i64,
        dest: &mut [i32],
        frames_wanted: usize,
    ) -> Spill {
        let ch = self.channels;
        let src_frames = src.len() / ch;
        let copied = src_frames.min(frames_wanted).min(dest.len() / ch);

        dest[..copied * ch].copy_from_slice(&src[..copied * ch]);

        let remainder = src_frames - copied;
        if remainder > 0 {
            self.ensure_capacity(remainder);
            self.samples[..remainder * ch].copy_from_slice(&src[copied * ch..src_frames * ch]);
            self.frame_position = start_frame + copied as i64;
        }
        self.length = remainder;

        Spill { copied, remainder }
    }
}

/// Outcome of [`LeftoverBuffer::append_and_spill`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spill {
    /// Frames written to the destination.
    pub copied: usize,
    /// Frames now held as leftover.
    pub remainder: usize,
}
