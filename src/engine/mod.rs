pub mod buffer;
pub mod clock;
pub mod config;
pub mod decoder;
pub mod dsp;
pub mod engine;
pub mod output;
pub mod session;
pub mod units;
