use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::engine::buffer::{PrefetchProducer, PrefetchRing};
use crate::engine::clock::{Clock, PlaybackState};
use crate::engine::config::{PlayerConfig, SessionConfig};
use crate::engine::decoder::symphonia_decoder::SymphoniaBackend;
use crate::engine::dsp::resampler::Resampler;
use crate::engine::output::{output_manager::OutputManager, AudioOutput};
use crate::engine::session::DecodeSession;
use crate::error::{DecodeError, Result};

enum DecoderCommand {
    Seek(f64),
    Stop,
}

/// Demo player: one decode thread pulls canonical frames from a
/// `DecodeSession` into the prefetch ring; the output callback drains it.
pub struct AudioEngine {
    clock: Arc<Clock>,
    output: Box<dyn AudioOutput>,
    producer: Option<PrefetchProducer>,
    decode_thread: Option<JoinHandle<PrefetchProducer>>,
    is_decoding: Arc<AtomicBool>,
    command_tx: Option<Sender<DecoderCommand>>,
    config: PlayerConfig,
    session_config: SessionConfig,
}

impl AudioEngine {
    pub fn new(config: PlayerConfig, session_config: SessionConfig) -> Result<Self> {
        let clock = Arc::new(Clock::new(44100));
        let (producer, consumer) = PrefetchRing::with_capacity(config.ring_capacity(44100, 2));
        // Opening the device updates the clock with the real output layout.
        let output = Box::new(OutputManager::new(consumer, clock.clone()));

        Ok(Self {
            clock,
            output,
            producer: Some(producer),
            decode_thread: None,
            is_decoding: Arc::new(AtomicBool::new(false)),
            command_tx: None,
            config,
            session_config,
        })
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.stop();

        let session = DecodeSession::open_path(path, self.session_config.clone())?;
        let producer = self
            .producer
            .take()
            .ok_or_else(|| DecodeError::Output("Ring producer already in use".to_string()))?;

        let (tx, rx) = mpsc::channel();
        self.command_tx = Some(tx);
        self.is_decoding.store(true, Ordering::SeqCst);
        self.clock.set_eos(false);
        self.clock.set_sample_pos(0);

        let worker = DecodeWorker {
            session,
            producer,
            clock: self.clock.clone(),
            is_decoding: self.is_decoding.clone(),
            commands: rx,
            config: self.config.clone(),
        };
        self.decode_thread = Some(thread::spawn(move || worker.run()));
        Ok(())
    }

    pub fn play(&mut self) -> Result<()> {
        self.clock.set_state(PlaybackState::Playing);
        self.output.start()
    }

    pub fn pause(&mut self) -> Result<()> {
        self.clock.set_state(PlaybackState::Paused);
        self.output.pause()
    }

    pub fn stop(&mut self) {
        self.clock.set_state(PlaybackState::Stopped);
        if let Err(e) = self.output.stop() {
            warn!("Failed to stop output: {}", e);
        }

        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(DecoderCommand::Stop);
        }
        self.is_decoding.store(false, Ordering::SeqCst);
        if let Some(handle) = self.decode_thread.take() {
            match handle.join() {
                Ok(producer) => self.producer = Some(producer),
                Err(_) => warn!("Decode thread panicked; ring producer lost"),
            }
        }

        self.clock.signal_clear_buffer();
        self.clock.set_sample_pos(0);
    }

    pub fn seek(&mut self, time_secs: f64) {
        let time_secs = time_secs.max(0.0);
        let sample_pos = (time_secs
            * self.clock.get_sample_rate() as f64
            * self.clock.get_channels() as f64) as u64;
        self.clock.set_sample_pos(sample_pos);
        self.clock.signal_clear_buffer();

        if let Some(tx) = &self.command_tx {
            let _ = tx.send(DecoderCommand::Seek(time_secs));
        }
    }

    pub fn get_time_secs(&self) -> f64 {
        self.clock.get_time_secs()
    }

    pub fn state(&self) -> PlaybackState {
        self.clock.get_state()
    }

    /// True once the file is exhausted and the ring has run dry.
    pub fn is_finished(&self) -> bool {
        self.clock.is_eos() && self.clock.get_state() == PlaybackState::Stopped
    }

    pub fn tick(&mut self) {
        self.output.tick();
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

struct DecodeWorker {
    session: DecodeSession<SymphoniaBackend>,
    producer: PrefetchProducer,
    clock: Arc<Clock>,
    is_decoding: Arc<AtomicBool>,
    commands: Receiver<DecoderCommand>,
    config: PlayerConfig,
}

impl DecodeWorker {
    /// Returns the producer so the engine can reuse the ring for the next file.
    fn run(mut self) -> PrefetchProducer {
        let in_channels = self.session.channels();
        let in_rate = self.session.sample_rate();
        let mut out_rate = self.clock.get_sample_rate();
        let mut out_channels = self.clock.get_channels() as usize;
        let mut resampler = self.make_resampler(in_rate, out_rate, out_channels);

        let mut decoded = vec![0.0f32; self.config.read_frames * in_channels];

        while self.is_decoding.load(Ordering::Relaxed) {
            if !self.drain_commands() {
                break;
            }

            let current_rate = self.clock.get_sample_rate();
            let current_channels = self.clock.get_channels() as usize;
            if current_rate != out_rate || current_channels != out_channels {
                info!(
                    "Output changed: {}Hz/{}ch -> {}Hz/{}ch",
                    out_rate, out_channels, current_rate, current_channels
                );
                out_rate = current_rate;
                out_channels = current_channels;
                resampler = self.make_resampler(in_rate, out_rate, out_channels);
                self.clock.signal_clear_buffer();
            }

            if self.producer.vacant_len() < self.config.read_frames * out_channels * 2 {
                thread::sleep(Duration::from_millis(10));
                continue;
            }

            let frames = self.session.read(self.config.read_frames, &mut decoded);
            if frames == 0 {
                if let Some(r) = resampler.as_mut() {
                    match r.flush() {
                        Ok(tail) => self.push_all(&tail),
                        Err(e) => warn!("Resampler flush failed: {}", e),
                    }
                }
                debug!(dead = self.session.is_dead(), "Decoding finished");
                self.clock.set_eos(true);
                break;
            }

            let fitted = fit_channels(&decoded[..frames * in_channels], in_channels, out_channels);
            let ready = match resampler.as_mut() {
                Some(r) => match r.process(&fitted) {
                    Ok(out) => out,
                    Err(e) => {
                        warn!("Resampling failed, dropping block: {}", e);
                        continue;
                    }
                },
                None => fitted,
            };
            self.push_all(&ready);
        }

        self.is_decoding.store(false, Ordering::SeqCst);
        self.producer
    }

    /// Apply pending commands. Returns `false` on stop.
    fn drain_commands(&mut self) -> bool {
        while let Ok(cmd) = self.commands.try_recv() {
            match cmd {
                DecoderCommand::Seek(time) => {
                    let frame = (time * self.session.sample_rate() as f64) as u64;
                    self.session.seek(frame);
                    self.clock.set_eos(false);
                }
                DecoderCommand::Stop => return false,
            }
        }
        true
    }

    fn push_all(&mut self, samples: &[f32]) {
        let mut pushed = 0;
        while pushed < samples.len() && self.is_decoding.load(Ordering::Relaxed) {
            pushed += self.producer.push_slice(&samples[pushed..]);
            if pushed < samples.len() {
                thread::sleep(Duration::from_millis(5));
            }
        }
    }

    fn make_resampler(&self, in_rate: u32, out_rate: u32, channels: usize) -> Option<Resampler> {
        if in_rate == out_rate {
            return None;
        }
        info!("Resampling {}Hz -> {}Hz", in_rate, out_rate);
        match Resampler::new(in_rate, out_rate, channels, self.config.resampler_chunk) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!("Could not build resampler, playing at source rate: {}", e);
                None
            }
        }
    }
}

/// Map interleaved frames to another channel count: mono is duplicated,
/// missing channels repeat the last source channel, extra ones are dropped.
pub fn fit_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }
    let mut out = Vec::with_capacity(samples.len() / from * to);
    for frame in samples.chunks_exact(from) {
        for ch in 0..to {
            out.push(frame[ch.min(from - 1)]);
        }
    }
    out
}
