pub mod cpal_backend;
pub mod output_manager;

use crate::engine::buffer::PrefetchConsumer;
use crate::error::Result;

/// A device sink that drains the prefetch ring from its own callback.
pub trait AudioOutput {
    fn start(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// `false` once the device errored or the default device changed.
    fn is_healthy(&self) -> bool;

    /// Tear down the stream and hand back the ring consumer.
    fn shutdown(&mut self) -> Option<PrefetchConsumer>;

    /// Periodic housekeeping from the control thread.
    fn tick(&mut self);
}
