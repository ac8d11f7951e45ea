pub mod resampler;
pub mod sample_format;
