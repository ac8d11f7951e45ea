use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::engine::buffer::PrefetchConsumer;
use crate::engine::clock::{Clock, PlaybackState};
use crate::engine::output::AudioOutput;
use crate::error::{DecodeError, Result};

type SharedConsumer = Arc<Mutex<Option<PrefetchConsumer>>>;

/// Default output device fed from the prefetch ring.
pub struct CpalBackend {
    stream: Stream,
    device_id: String,
    is_healthy: Arc<AtomicBool>,
    consumer: SharedConsumer,
}

impl CpalBackend {
    /// Open the default output device. On failure the consumer is handed
    /// back (when it can be) so a later reconnect can reuse it.
    pub fn new(
        consumer: PrefetchConsumer,
        clock: Arc<Clock>,
    ) -> std::result::Result<Self, (Option<PrefetchConsumer>, DecodeError)> {
        let host = cpal::default_host();
        let device = match host.default_output_device() {
            Some(d) => d,
            None => {
                return Err((
                    Some(consumer),
                    DecodeError::Output("No output device available".to_string()),
                ))
            }
        };

        let device_id = device.name().unwrap_or_else(|_| "unknown".to_string());
        let config_inner = match device.default_output_config() {
            Ok(c) => c,
            Err(e) => return Err((Some(consumer), DecodeError::Output(e.to_string()))),
        };

        let sample_format = config_inner.sample_format();
        let config: StreamConfig = config_inner.into();

        clock.set_sample_rate(config.sample_rate);
        clock.set_channels(config.channels as u32);
        info!(
            device = %device_id,
            sample_rate = config.sample_rate,
            channels = config.channels,
            "Opening output device"
        );

        let is_healthy = Arc::new(AtomicBool::new(true));
        let shared_consumer: SharedConsumer = Arc::new(Mutex::new(Some(consumer)));

        let stream_res = match sample_format {
            SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, &shared_consumer, &clock, &is_healthy)
            }
            SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, &shared_consumer, &clock, &is_healthy)
            }
            SampleFormat::U16 => {
                build_stream::<u16>(&device, &config, &shared_consumer, &clock, &is_healthy)
            }
            other => Err(DecodeError::Output(format!(
                "Unsupported sample format {:?}",
                other
            ))),
        };

        match stream_res {
            Ok(stream) => Ok(Self {
                stream,
                device_id,
                is_healthy,
                consumer: shared_consumer,
            }),
            Err(e) => Err((reclaim(&shared_consumer), e)),
        }
    }
}

fn reclaim(shared: &SharedConsumer) -> Option<PrefetchConsumer> {
    shared.lock().ok()?.take()
}

fn build_stream<T: SizedSample + FromSample<f32>>(
    device: &Device,
    config: &StreamConfig,
    shared: &SharedConsumer,
    clock: &Arc<Clock>,
    is_healthy: &Arc<AtomicBool>,
) -> Result<Stream> {
    let consumer = shared.clone();
    let clock = clock.clone();
    let is_healthy = is_healthy.clone();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _| {
                if let Ok(mut guard) = consumer.lock() {
                    if let Some(c) = guard.as_mut() {
                        process_audio(data, c, &clock);
                    }
                }
            },
            move |err| {
                error!("Output stream error: {}", err);
                is_healthy.store(false, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| DecodeError::Output(e.to_string()))
}

impl AudioOutput for CpalBackend {
    fn start(&mut self) -> Result<()> {
        self.stream
            .play()
            .map_err(|e| DecodeError::Output(e.to_string()))
    }

    fn pause(&mut self) -> Result<()> {
        self.stream
            .pause()
            .map_err(|e| DecodeError::Output(e.to_string()))
    }

    fn stop(&mut self) -> Result<()> {
        if let Err(e) = self.stream.pause() {
            warn!("Failed to pause stream on stop: {}", e);
        }
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        if !self.is_healthy.load(Ordering::SeqCst) {
            return false;
        }
        let host = cpal::default_host();
        if let Some(device) = host.default_output_device() {
            if let Ok(name) = device.name() {
                if name != self.device_id {
                    return false;
                }
            }
        }
        true
    }

    fn shutdown(&mut self) -> Option<PrefetchConsumer> {
        let _ = self.stream.pause();
        reclaim(&self.consumer)
    }

    fn tick(&mut self) {}
}

fn process_audio<T: Sample + FromSample<f32>>(
    data: &mut [T],
    consumer: &mut PrefetchConsumer,
    clock: &Clock,
) {
    if clock.take_clear_buffer() {
        consumer.clear();
    }

    if clock.get_state() != PlaybackState::Playing {
        data.fill(T::EQUILIBRIUM);
        return;
    }

    let mut samples_read = 0;
    for out in data.iter_mut() {
        match consumer.pop() {
            Some(sample) => {
                *out = T::from_sample(sample);
                samples_read += 1;
            }
            None => break,
        }
    }
    data[samples_read..].fill(T::EQUILIBRIUM);

    clock.increment_samples(samples_read as u64);

    if samples_read == 0 && clock.is_eos() {
        clock.set_state(PlaybackState::Stopped);
    }
}
