use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::buffer::PrefetchConsumer;
use crate::engine::clock::{Clock, PlaybackState};
use crate::engine::output::cpal_backend::CpalBackend;
use crate::engine::output::AudioOutput;
use crate::error::{DecodeError, Result};

/// Keeps a `CpalBackend` alive across device loss and default-device changes.
pub struct OutputManager {
    backend: Option<CpalBackend>,
    consumer: Option<PrefetchConsumer>,
    clock: Arc<Clock>,
}

impl OutputManager {
    pub fn new(consumer: PrefetchConsumer, clock: Arc<Clock>) -> Self {
        let mut manager = Self {
            backend: None,
            consumer: Some(consumer),
            clock,
        };
        if let Err(e) = manager.try_reconnect() {
            warn!("No output device yet: {}", e);
        }
        manager
    }

    pub fn try_reconnect(&mut self) -> Result<()> {
        let consumer = self
            .consumer
            .take()
            .ok_or_else(|| DecodeError::Output("Ring consumer missing".to_string()))?;

        match CpalBackend::new(consumer, self.clock.clone()) {
            Ok(backend) => {
                self.backend = Some(backend);
                Ok(())
            }
            Err((recovered, e)) => {
                self.consumer = recovered;
                Err(e)
            }
        }
    }

    pub fn check_connection(&mut self) {
        let needs_reconnect = match &self.backend {
            Some(backend) => !backend.is_healthy(),
            None => true,
        };
        if !needs_reconnect {
            return;
        }

        let previous_state = self.clock.get_state();
        if let Some(mut backend) = self.backend.take() {
            info!("Output device lost or changed, reconnecting");
            if let Some(consumer) = backend.shutdown() {
                self.consumer = Some(consumer);
            }
        }
        if self.try_reconnect().is_ok() && previous_state == PlaybackState::Playing {
            if let Err(e) = self.start() {
                warn!("Failed to resume after reconnect: {}", e);
            }
        }
    }
}

impl AudioOutput for OutputManager {
    fn start(&mut self) -> Result<()> {
        if self.backend.is_none() {
            self.check_connection();
        }
        match &mut self.backend {
            Some(backend) => backend.start(),
            None => Err(DecodeError::Output("No audio backend available".to_string())),
        }
    }

    fn pause(&mut self) -> Result<()> {
        match &mut self.backend {
            Some(backend) => backend.pause(),
            None => Ok(()),
        }
    }

    fn stop(&mut self) -> Result<()> {
        match &mut self.backend {
            Some(backend) => backend.stop(),
            None => Ok(()),
        }
    }

    fn is_healthy(&self) -> bool {
        self.backend.as_ref().is_some_and(|b| b.is_healthy())
    }

    fn shutdown(&mut self) -> Option<PrefetchConsumer> {
        match self.backend.take() {
            Some(mut backend) => backend.shutdown().or(self.consumer.take()),
            None => self.consumer.take(),
        }
    }

    fn tick(&mut self) {
        self.check_connection();
    }
}
