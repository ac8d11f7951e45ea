use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};
use tracing::{debug, error, info, instrument, warn};

use crate::engine::decoder::{BackendChunk, DecoderBackend, FormatRequest, StreamProperties};
use crate::engine::units::{seconds_from_backend_units, TICKS_PER_SECOND};
use crate::error::{DecodeError, Result};

// A decode error on a single packet is skipped; this many in a row is fatal.
const MAX_DECODE_RETRIES: usize = 3;

const DEFAULT_BITS_PER_SAMPLE: u32 = 16;
const WIDE_BITS_PER_SAMPLE: u32 = 24;

/// File decoding backend built on Symphonia.
///
/// Delivers 16-bit native samples for sources up to 16 bits wide (or of
/// undefined width, as with most compressed codecs) and 24-bit otherwise.
pub struct SymphoniaBackend {
    path: PathBuf,
    reader: Option<Box<dyn FormatReader>>,
    decoder: Option<Box<dyn Decoder>>,
    track_id: u32,
    params: Option<CodecParameters>,
    sample_rate: u32,
    channels: usize,
    bits_per_sample: u32,
    sample_buf: Option<SampleBuffer<i32>>,
}

impl SymphoniaBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reader: None,
            decoder: None,
            track_id: 0,
            params: None,
            sample_rate: 0,
            channels: 0,
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
            sample_buf: None,
        }
    }

    pub fn supported_file_extensions() -> &'static [&'static str] {
        &[
            "m4a", "mp4", "mp3", "wav", "aif", "aiff", "flac", "ogg", "oga", "opus", "caf", "mka",
            "mkv", "webm",
        ]
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&mut self) -> Result<&mut Box<dyn FormatReader>> {
        self.reader
            .as_mut()
            .ok_or_else(|| DecodeError::Backend("source not opened".to_string()))
    }

    fn time_base(&self) -> Option<TimeBase> {
        self.params.as_ref().and_then(|p| p.time_base)
    }

    /// Packet timestamp to ticks, rounded up so truncating back to frames is lossless.
    fn ticks_from_ts(&self, ts: u64) -> i64 {
        let seconds = match self.time_base() {
            Some(tb) => {
                let time = tb.calc_time(ts);
                time.seconds as f64 + time.frac
            }
            None if self.sample_rate > 0 => ts as f64 / self.sample_rate as f64,
            None => 0.0,
        };
        (seconds * TICKS_PER_SECOND).ceil() as i64
    }

    fn shift(&self) -> u32 {
        32 - self.bits_per_sample
    }

    /// Decode packets until one yields audio and report its layout.
    fn probe_first_spec(&mut self) -> Result<SignalSpec> {
        let track_id = self.track_id;
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| DecodeError::Backend("source not opened".to_string()))?;
        let decoder = self
            .decoder
            .as_mut()
            .ok_or(DecodeError::NoAudioStream)?;

        let mut failures = 0;
        loop {
            let packet = reader
                .next_packet()
                .map_err(|e| DecodeError::InvalidFormat(format!("no decodable packet: {}", e)))?;
            if packet.track_id() != track_id {
                continue;
            }
            match decoder.decode(&packet) {
                Ok(decoded) => return Ok(*decoded.spec()),
                Err(Error::DecodeError(e)) if failures < MAX_DECODE_RETRIES => {
                    failures += 1;
                    warn!("Skipping undecodable packet while probing: {}", e);
                }
                Err(e) => {
                    return Err(DecodeError::InvalidFormat(format!("probe decode failed: {}", e)))
                }
            }
        }
    }
}

impl DecoderBackend for SymphoniaBackend {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn open(&mut self) -> Result<()> {
        let file = File::open(&self.path).map_err(|e| {
            error!("Failed to open file: {}", e);
            DecodeError::SourceError(format!("{}: {}", self.path.display(), e))
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = self.path.extension().and_then(|s| s.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| DecodeError::InvalidFormat(format!("probe failed: {}", e)))?;

        self.reader = Some(probed.format);
        info!("Opened audio source");
        Ok(())
    }

    fn select_single_audio_stream(&mut self) -> Result<()> {
        let reader = self.reader()?;
        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioStream)?;

        let track_id = track.id;
        let params = track.codec_params.clone();
        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| DecodeError::InvalidFormat(format!("no decoder for track: {}", e)))?;

        debug!(track_id, "Selected audio track");
        self.track_id = track_id;
        self.params = Some(params);
        self.decoder = Some(decoder);
        Ok(())
    }

    fn negotiate_output_format(&mut self, request: FormatRequest) -> Result<StreamProperties> {
        let params = self.params.clone().ok_or(DecodeError::NoAudioStream)?;

        let (sample_rate, channels) = match (params.sample_rate, params.channels) {
            (Some(rate), Some(channels)) => (rate, channels.count()),
            _ => {
                // Some codecs (AAC in MP4) only reveal their layout once decoding starts.
                let spec = self.probe_first_spec()?;
                (spec.rate, spec.channels.count())
            }
        };
        if sample_rate == 0 || channels == 0 {
            return Err(DecodeError::InvalidFormat(format!(
                "{} Hz, {} channels",
                sample_rate, channels
            )));
        }

        self.bits_per_sample = match params.bits_per_sample {
            Some(bits) if bits > DEFAULT_BITS_PER_SAMPLE => WIDE_BITS_PER_SAMPLE,
            _ => DEFAULT_BITS_PER_SAMPLE,
        };
        self.sample_rate = sample_rate;
        self.channels = channels;

        if request.sample_rate.is_some_and(|r| r != sample_rate)
            || request.channels.is_some_and(|c| c as usize != channels)
        {
            debug!(
                "Requested {:?}Hz/{:?}ch, stream is {}Hz/{}ch; no conversion applied",
                request.sample_rate, request.channels, sample_rate, channels
            );
        }

        self.presentation_properties()
    }

    fn pull_next_chunk(&mut self) -> BackendChunk {
        let shift = self.shift();
        let (Some(reader), Some(decoder)) = (self.reader.as_mut(), self.decoder.as_mut()) else {
            return BackendChunk::error();
        };

        let mut failures = 0;
        let (ts, spec, samples) = loop {
            let packet = match reader.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(ref err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("End of input file");
                    return BackendChunk::end_of_stream();
                }
                Err(Error::ResetRequired) => {
                    warn!("Track list changed mid-stream");
                    return BackendChunk::type_changed();
                }
                Err(err) => {
                    error!("Reader error: {}", err);
                    return BackendChunk::error();
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    if decoded.frames() == 0 {
                        return BackendChunk::new(Vec::new(), 0);
                    }
                    let needed = decoded.capacity() * spec.channels.count();
                    if self.sample_buf.as_ref().is_some_and(|b| b.capacity() < needed) {
                        self.sample_buf = None;
                    }
                    let buf = self.sample_buf.get_or_insert_with(|| {
                        SampleBuffer::<i32>::new(decoded.capacity() as u64, spec)
                    });
                    buf.copy_interleaved_ref(decoded);
                    let samples: Vec<i32> = buf.samples().iter().map(|s| s >> shift).collect();
                    break (packet.ts(), spec, samples);
                }
                Err(Error::DecodeError(err)) => {
                    failures += 1;
                    if failures > MAX_DECODE_RETRIES {
                        error!("Decoding failed on {} consecutive packets: {}", failures, err);
                        return BackendChunk::error();
                    }
                    warn!("Skipping undecodable packet: {}", err);
                }
                Err(err) => {
                    error!("Decoder error: {}", err);
                    return BackendChunk::error();
                }
            }
        };

        if spec.rate != self.sample_rate || spec.channels.count() != self.channels {
            warn!(
                "Stream format changed to {}Hz/{}ch",
                spec.rate,
                spec.channels.count()
            );
            return BackendChunk::type_changed();
        }

        BackendChunk::new(samples, self.ticks_from_ts(ts))
    }

    fn flush_pending_chunks(&mut self) -> Result<()> {
        match self.decoder.as_mut() {
            Some(decoder) => {
                decoder.reset();
                Ok(())
            }
            None => Err(DecodeError::NoAudioStream),
        }
    }

    fn set_position(&mut self, ticks: i64) -> Result<()> {
        let track_id = self.track_id;
        let seconds = seconds_from_backend_units(ticks.max(0));
        self.reader()?
            .seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time: Time::from(seconds),
                    track_id: Some(track_id),
                },
            )
            .map_err(|e| DecodeError::SeekFailed(e.to_string()))?;
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.reset();
        }
        Ok(())
    }

    fn duration(&mut self) -> Result<i64> {
        let params = self.params.as_ref().ok_or(DecodeError::NoAudioStream)?;
        let frames = params
            .n_frames
            .ok_or_else(|| DecodeError::InvalidFormat("stream length unknown".to_string()))?;
        let seconds = match params.time_base {
            Some(tb) => {
                let time = tb.calc_time(frames);
                time.seconds as f64 + time.frac
            }
            None if self.sample_rate > 0 => frames as f64 / self.sample_rate as f64,
            None => return Err(DecodeError::InvalidFormat("no time base".to_string())),
        };
        Ok((seconds * TICKS_PER_SECOND) as i64)
    }

    fn presentation_properties(&self) -> Result<StreamProperties> {
        if self.channels == 0 {
            return Err(DecodeError::NotOpen);
        }
        Ok(StreamProperties {
            bits_per_sample: self.bits_per_sample,
            channels: self.channels as u16,
            sample_rate: self.sample_rate,
        })
    }

    fn preferred_chunk_samples(&self) -> Option<usize> {
        let frames = self.params.as_ref()?.max_frames_per_packet?;
        Some(frames as usize * self.channels.max(1))
    }
}
