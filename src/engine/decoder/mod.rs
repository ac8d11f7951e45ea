pub mod symphonia_decoder;

use crate::error::Result;

/// How a pull from the backend ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    Ok,
    /// The backend is unusable from now on.
    Error,
    EndOfStream,
    /// The stream's native format changed mid-file.
    TypeChanged,
}

/// One batch of decoded frames, sized by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendChunk {
    /// Interleaved native samples, each a `bits_per_sample`-wide signed value.
    pub samples: Vec<i32>,
    /// Presentation time of the first frame, in 100 ns ticks.
    pub timestamp: i64,
    pub status: ChunkStatus,
}

impl BackendChunk {
    pub fn new(samples: Vec<i32>, timestamp: i64) -> Self {
        Self {
            samples,
            timestamp,
            status: ChunkStatus::Ok,
        }
    }

    fn terminal(status: ChunkStatus) -> Self {
        Self {
            samples: Vec::new(),
            timestamp: 0,
            status,
        }
    }

    pub fn error() -> Self {
        Self::terminal(ChunkStatus::Error)
    }

    pub fn end_of_stream() -> Self {
        Self::terminal(ChunkStatus::EndOfStream)
    }

    pub fn type_changed() -> Self {
        Self::terminal(ChunkStatus::TypeChanged)
    }

    /// Whole frames in this chunk; a trailing partial frame is ignored.
    pub fn frame_count(&self, channels: usize) -> usize {
        if channels == 0 {
            0
        } else {
            self.samples.len() / channels
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Native layout the backend delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamProperties {
    /// 0 means undefined (compressed-native); sessions treat it as 16.
    pub bits_per_sample: u32,
    pub channels: u16,
    pub sample_rate: u32,
}

/// Output layout the session would like. Backends may ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatRequest {
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
}

/// A decoding engine a `DecodeSession` can drive.
///
/// Calls arrive in order: `open`, `select_single_audio_stream`,
/// `negotiate_output_format`, then any mix of pulls, flushes, seeks and
/// property queries.
pub trait DecoderBackend {
    /// Acquire the source and whatever platform state decoding needs.
    fn open(&mut self) -> Result<()>;

    /// Keep exactly one audio stream active.
    fn select_single_audio_stream(&mut self) -> Result<()>;

    /// Settle on the native output layout. The backend has the last word.
    fn negotiate_output_format(&mut self, request: FormatRequest) -> Result<StreamProperties>;

    /// Block until the next chunk or a terminal condition.
    fn pull_next_chunk(&mut self) -> BackendChunk;

    /// Drop chunks decoded ahead of the current position.
    fn flush_pending_chunks(&mut self) -> Result<()>;

    /// Best-effort reposition to a time in 100 ns ticks.
    fn set_position(&mut self, ticks: i64) -> Result<()>;

    /// Stream length in 100 ns ticks.
    fn duration(&mut self) -> Result<i64>;

    fn presentation_properties(&self) -> Result<StreamProperties>;

    /// Samples per chunk the backend usually delivers, if it knows.
    fn preferred_chunk_samples(&self) -> Option<usize>;
}
