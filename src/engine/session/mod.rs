//! Frame-accurate reads and seeks over a chunk-oriented decoding backend.
//!
//! A `DecodeSession` owns one backend and turns its variable-size,
//! approximately positioned chunks into exactly the frames the caller asks
//! for. Undelivered frames wait in a [`LeftoverBuffer`]; after a seek the
//! [`SeekState`] trims, pads or discards chunks until the stream lines up
//! with the requested frame again.
//!
//! A session is single-threaded: calls must be serialized by the caller.
//! `read` may allocate and may block inside the backend, so it belongs on a
//! decode thread, not in a real-time callback.

pub mod seek;

use std::path::Path;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::engine::buffer::LeftoverBuffer;
use crate::engine::config::SessionConfig;
use crate::engine::decoder::symphonia_decoder::SymphoniaBackend;
use crate::engine::decoder::{ChunkStatus, DecoderBackend, FormatRequest};
use crate::engine::dsp::sample_format::FormatConverter;
use crate::engine::units::{seconds_from_backend_units, UnitConverter};
use crate::error::{DecodeError, Result};

pub use seek::{Alignment, SeekState};

/// Width assumed when the backend reports none (compressed sources).
pub const DEFAULT_BITS_PER_SAMPLE: u32 = 16;

pub struct DecodeSession<B: DecoderBackend> {
    backend: B,
    config: SessionConfig,
    units: UnitConverter,
    converter: Option<FormatConverter>,
    channels: usize,
    sample_rate: u32,
    bits_per_sample: u32,
    duration_units: i64,
    duration_secs: f64,
    position_in_samples: u64,
    seek: SeekState,
    leftover: LeftoverBuffer,
    /// Native samples for the read in progress.
    native: Vec<i32>,
    dead: bool,
}

impl DecodeSession<SymphoniaBackend> {
    /// Open `path` with the Symphonia backend.
    pub fn open_path<P: AsRef<Path>>(path: P, config: SessionConfig) -> Result<Self> {
        let mut session = Self::new(SymphoniaBackend::new(path), config);
        session.open()?;
        Ok(session)
    }
}

impl<B: DecoderBackend> DecodeSession<B> {
    pub fn new(backend: B, config: SessionConfig) -> Self {
        Self {
            backend,
            config,
            units: UnitConverter::new(0),
            converter: None,
            channels: 0,
            sample_rate: 0,
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
            duration_units: 0,
            duration_secs: 0.0,
            position_in_samples: 0,
            seek: SeekState::new(),
            leftover: LeftoverBuffer::new(1, 1),
            native: Vec::new(),
            dead: false,
        }
    }

    /// Open and configure the backend, then prime the position at frame 0.
    #[instrument(skip(self))]
    pub fn open(&mut self) -> Result<()> {
        if self.converter.is_some() {
            return Err(DecodeError::AlreadyOpen);
        }

        self.backend.open()?;
        self.backend.select_single_audio_stream()?;
        let props = self.backend.negotiate_output_format(FormatRequest {
            channels: self.config.target_channels,
            sample_rate: self.config.target_sample_rate,
        })?;

        if props.channels == 0 || props.sample_rate == 0 {
            return Err(DecodeError::InvalidFormat(format!(
                "{} Hz, {} channels",
                props.sample_rate, props.channels
            )));
        }
        let bits_per_sample = match props.bits_per_sample {
            0 => DEFAULT_BITS_PER_SAMPLE,
            bits => bits,
        };
        let converter = FormatConverter::new(bits_per_sample)?;

        self.channels = props.channels as usize;
        self.sample_rate = props.sample_rate;
        self.bits_per_sample = bits_per_sample;
        self.units = UnitConverter::new(props.sample_rate);

        match self.backend.duration() {
            Ok(units) => {
                self.duration_units = units;
                self.duration_secs = seconds_from_backend_units(units);
            }
            Err(e) => warn!("Could not read duration: {}", e),
        }

        let leftover_samples = match self.backend.preferred_chunk_samples() {
            Some(samples) if samples > 0 => samples,
            _ => {
                debug!(
                    "No preferred chunk size, using {} samples",
                    self.config.fallback_leftover_samples
                );
                self.config.fallback_leftover_samples
            }
        };
        self.leftover = LeftoverBuffer::new(self.channels, leftover_samples / self.channels);
        self.converter = Some(converter);
        self.dead = false;

        info!(
            channels = self.channels,
            sample_rate = self.sample_rate,
            bits_per_sample = self.bits_per_sample,
            duration_secs = self.duration_secs,
            "Decode session open"
        );

        if self.config.prime_on_open {
            self.seek(0);
        }
        Ok(())
    }

    /// Reposition to `frame`. Returns the position in samples, unchanged if
    /// the backend refused or the session is dead.
    pub fn seek(&mut self, frame: u64) -> u64 {
        if self.dead || self.converter.is_none() {
            return self.position_in_samples;
        }

        let target = i64::try_from(frame).unwrap_or(i64::MAX);
        let ticks = (self.units.backend_units_from_frame(target) as i64)
            .saturating_sub(self.config.seek_bias_ticks)
            .max(0);

        if let Err(e) = self.backend.flush_pending_chunks() {
            warn!("Failed to flush before seek: {}", e);
        }
        match self.backend.set_position(ticks) {
            Ok(()) => {
                self.position_in_samples = frame.saturating_mul(self.channels as u64);
                debug!(frame, ticks, "Seek requested");
            }
            Err(e) => warn!("Failed to seek to frame {}: {}", frame, e),
        }

        self.seek.request(target);
        self.leftover.clear();
        self.position_in_samples
    }

    /// Fill `out` with up to `frame_count` interleaved frames.
    ///
    /// Returns the frames produced; fewer than requested means end of stream,
    /// a stream type change, or a dead session.
    pub fn read(&mut self, frame_count: usize, out: &mut [f32]) -> usize {
        let Some(converter) = self.converter else {
            return 0;
        };
        if self.dead {
            return 0;
        }

        let ch = self.channels;
        let requested = frame_count.min(out.len() / ch);
        if requested == 0 {
            return 0;
        }

        self.native.clear();
        self.native.resize(requested * ch, 0);
        let mut needed = requested;

        if !self.leftover.is_empty() && self.leftover.frame_position() == self.seek.next_frame() {
            needed = self.leftover.drain_into(&mut self.native, needed);
            self.seek.advance(requested - needed);
            if !self.leftover.is_empty() && needed != 0 {
                error!("Leftover frames remain but the read is unsatisfied, abandoning stream");
                self.dead = true;
            }
        } else {
            self.leftover.clear();
        }

        let mut empty_pulls = 0;
        while needed > 0 && !self.dead {
            let chunk = self.backend.pull_next_chunk();
            match chunk.status {
                ChunkStatus::Ok => {}
                ChunkStatus::Error => {
                    error!("Backend reported an unrecoverable error, abandoning stream");
                    self.dead = true;
                    break;
                }
                ChunkStatus::EndOfStream => {
                    debug!("End of stream");
                    break;
                }
                ChunkStatus::TypeChanged => {
                    warn!("Stream type changed, ending read");
                    break;
                }
            }

            let chunk_frames = chunk.frame_count(ch);
            if chunk.samples.len() != chunk_frames * ch {
                warn!(
                    "Dropping {} samples of a partial frame",
                    chunk.samples.len() - chunk_frames * ch
                );
            }
            if chunk_frames == 0 {
                empty_pulls += 1;
                if empty_pulls > self.config.max_empty_pulls {
                    warn!("Backend keeps delivering empty chunks, ending read");
                    break;
                }
                continue;
            }
            empty_pulls = 0;

            let mut skip = 0;
            if self.seek.is_seeking() {
                let buffer_position = self.units.frame_from_backend_units(chunk.timestamp) as i64;
                match self.seek.reconcile(buffer_position, chunk_frames, needed) {
                    Alignment::Discard => {
                        trace!(buffer_position, "Chunk precedes seek target, discarding");
                        continue;
                    }
                    Alignment::Consume { silence, skip: lead } => {
                        if silence > 0 {
                            let at = (requested - needed) * ch;
                            self.native[at..at + silence * ch].fill(0);
                            needed -= silence;
                        }
                        skip = lead;
                    }
                }
            }

            if !self.leftover.is_empty() {
                error!("Leftover buffer was not drained before refilling, abandoning stream");
                self.dead = true;
                break;
            }

            self.leftover.ensure_capacity(chunk_frames - skip);
            let at = (requested - needed) * ch;
            let spill = self.leftover.append_and_spill(
                &chunk.samples[skip * ch..chunk_frames * ch],
                self.seek.next_frame(),
                &mut self.native[at..],
                needed,
            );
            needed -= spill.copied;
            self.seek.advance(spill.copied);
            trace!(
                copied = spill.copied,
                leftover = spill.remainder,
                next_frame = self.seek.next_frame(),
                "Consumed chunk"
            );
        }

        let produced = requested - needed;
        if !self.leftover.is_empty() && needed != 0 {
            error!("Read ended short with leftover frames pending, abandoning stream");
            self.dead = true;
        }
        self.position_in_samples += (produced * ch) as u64;

        converter.convert(&self.native[..produced * ch], out);
        produced
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bits_per_sample(&self) -> u32 {
        self.bits_per_sample
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn duration_backend_units(&self) -> i64 {
        self.duration_units
    }

    /// Total interleaved samples, rounded up to whole frames.
    pub fn num_samples(&self) -> u64 {
        if self.channels == 0 {
            return 0;
        }
        let ch = self.channels as u64;
        let len = (self.duration_secs * self.sample_rate as f64 * ch as f64) as u64;
        len.div_ceil(ch) * ch
    }

    /// Read cursor in interleaved samples.
    pub fn position_in_samples(&self) -> u64 {
        self.position_in_samples
    }

    /// Frame index the next produced frame corresponds to.
    pub fn next_frame(&self) -> i64 {
        self.seek.next_frame()
    }

    pub fn is_seeking(&self) -> bool {
        self.seek.is_seeking()
    }

    pub fn is_open(&self) -> bool {
        self.converter.is_some()
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn leftover(&self) -> &LeftoverBuffer {
        &self.leftover
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
