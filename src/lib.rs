//! Frame-accurate decoding of compressed audio files to interleaved f32 PCM.
//!
//! [`DecodeSession`] drives a [`DecoderBackend`] that hands out decoded audio
//! in chunks of its own choosing and seeks only approximately, and turns it
//! into exactly the frames a caller asks for, starting exactly where the
//! caller seeked to. [`SymphoniaBackend`] is the bundled file backend.
//!
//! ```no_run
//! use audio_decoder::{DecodeSession, SessionConfig};
//!
//! # fn main() -> audio_decoder::Result<()> {
//! let mut session = DecodeSession::open_path("demo.mp3", SessionConfig::default())?;
//! let mut out = vec![0.0f32; 1024 * session.channels()];
//! session.seek(44100);
//! let frames = session.read(1024, &mut out);
//! println!("{} frames at {} Hz", frames, session.sample_rate());
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod logging;

pub use engine::config::{PlayerConfig, SessionConfig};
pub use engine::decoder::symphonia_decoder::SymphoniaBackend;
pub use engine::decoder::{BackendChunk, ChunkStatus, DecoderBackend, FormatRequest, StreamProperties};
pub use engine::session::DecodeSession;
pub use error::{DecodeError, Result};
