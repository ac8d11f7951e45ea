#![allow(dead_code)]

use audio_decoder::engine::units::TICKS_PER_SECOND;
use audio_decoder::{
    BackendChunk, DecodeError, DecoderBackend, FormatRequest, Result, StreamProperties,
};

/// Native value of `channel` at `frame`. Never zero, so silence is recognisable.
pub fn sample_value(frame: u64, channel: usize) -> i32 {
    1 + ((frame * 7 + channel as u64 * 1000) % 30000) as i32
}

/// Expected canonical output for `frame`/`channel` at 16 bits.
pub fn expected(frame: u64, channel: usize) -> f32 {
    sample_value(frame, channel) as f32 / 32768.0
}

/// Synthetic in-memory backend with scriptable seek inaccuracy and failures.
pub struct ScriptedBackend {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u32,
    pub total_frames: u64,
    pub chunk_frames: u64,
    pub preferred_chunk_samples: Option<usize>,
    /// Pull number (1-based) that reports `Error`.
    pub fail_on_pull: Option<usize>,
    /// Frame at which the stream reports a type change.
    pub type_change_at: Option<u64>,
    pub refuse_seeks: bool,
    pub fail_duration: bool,
    /// Round every seek down to a chunk boundary.
    pub align_seeks_to_chunks: bool,
    /// Empty chunks to hand out before the next real one.
    pub pending_empty: usize,
    pub pulls: usize,
    pub flushes: usize,
    pub positions: Vec<i64>,
    cursor: u64,
    landing: Option<u64>,
}

impl ScriptedBackend {
    pub fn new(sample_rate: u32, channels: u16, total_frames: u64, chunk_frames: u64) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample: 16,
            total_frames,
            chunk_frames,
            preferred_chunk_samples: None,
            fail_on_pull: None,
            type_change_at: None,
            refuse_seeks: false,
            fail_duration: false,
            align_seeks_to_chunks: false,
            pending_empty: 0,
            pulls: 0,
            flushes: 0,
            positions: Vec::new(),
            cursor: 0,
            landing: None,
        }
    }

    pub fn stereo_44k(total_frames: u64, chunk_frames: u64) -> Self {
        Self::new(44100, 2, total_frames, chunk_frames)
    }

    /// Make the next seek land on `frame` whatever was asked for.
    pub fn land_next_seek_at(&mut self, frame: u64) {
        self.landing = Some(frame);
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    fn ticks_from_frame(&self, frame: u64) -> i64 {
        (frame as f64 * TICKS_PER_SECOND / self.sample_rate as f64).ceil() as i64
    }
}

impl DecoderBackend for ScriptedBackend {
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn select_single_audio_stream(&mut self) -> Result<()> {
        Ok(())
    }

    fn negotiate_output_format(&mut self, _request: FormatRequest) -> Result<StreamProperties> {
        self.presentation_properties()
    }

    fn pull_next_chunk(&mut self) -> BackendChunk {
        self.pulls += 1;
        if self.fail_on_pull == Some(self.pulls) {
            return BackendChunk::error();
        }
        if self.pending_empty > 0 {
            self.pending_empty -= 1;
            return BackendChunk::new(Vec::new(), self.ticks_from_frame(self.cursor));
        }
        if self.type_change_at.is_some_and(|f| self.cursor >= f) {
            return BackendChunk::type_changed();
        }
        if self.cursor >= self.total_frames {
            return BackendChunk::end_of_stream();
        }

        let mut end = (self.cursor + self.chunk_frames).min(self.total_frames);
        if let Some(f) = self.type_change_at {
            if f > self.cursor {
                end = end.min(f);
            }
        }
        let channels = self.channels as usize;
        let samples = (self.cursor..end)
            .flat_map(|frame| (0..channels).map(move |ch| sample_value(frame, ch)))
            .collect();
        let chunk = BackendChunk::new(samples, self.ticks_from_frame(self.cursor));
        self.cursor = end;
        chunk
    }

    fn flush_pending_chunks(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn set_position(&mut self, ticks: i64) -> Result<()> {
        self.positions.push(ticks);
        if self.refuse_seeks {
            return Err(DecodeError::SeekFailed("requests pending".to_string()));
        }
        let requested = (ticks as f64 * self.sample_rate as f64 / TICKS_PER_SECOND) as u64;
        let mut landed = self.landing.take().unwrap_or(requested);
        if self.align_seeks_to_chunks {
            landed = landed / self.chunk_frames * self.chunk_frames;
        }
        self.cursor = landed.min(self.total_frames);
        Ok(())
    }

    fn duration(&mut self) -> Result<i64> {
        if self.fail_duration {
            return Err(DecodeError::InvalidFormat("no duration".to_string()));
        }
        Ok(self.ticks_from_frame(self.total_frames))
    }

    fn presentation_properties(&self) -> Result<StreamProperties> {
        Ok(StreamProperties {
            bits_per_sample: self.bits_per_sample,
            channels: self.channels,
            sample_rate: self.sample_rate,
        })
    }

    fn preferred_chunk_samples(&self) -> Option<usize> {
        self.preferred_chunk_samples
    }
}
