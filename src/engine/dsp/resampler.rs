use audioadapter_buffers::direct::SequentialSliceOfVecs;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};

use crate::error::{DecodeError, Result};

/// Rate adapter between decoded audio and the output device, used by the
/// player only. Takes and returns interleaved f32 of any length; input is
/// buffered until a full block is available.
pub struct Resampler {
    resampler: Fft<f32>,
    channels: usize,
    chunk_size: usize,
    pending: Vec<f32>,
    planar_in: Vec<Vec<f32>>,
    planar_out: Vec<Vec<f32>>,
}

fn resample_err<E: std::fmt::Display>(e: E) -> DecodeError {
    DecodeError::Resample(e.to_string())
}

impl Resampler {
    pub fn new(
        source_sample_rate: u32,
        target_sample_rate: u32,
        channels: usize,
        chunk_size: usize,
    ) -> Result<Self> {
        let resampler = Fft::<f32>::new(
            source_sample_rate as usize,
            target_sample_rate as usize,
            chunk_size,
            2,
            channels,
            FixedSync::Input,
        )
        .map_err(resample_err)?;

        Ok(Self {
            resampler,
            channels,
            chunk_size,
            pending: Vec::with_capacity(chunk_size * channels),
            planar_in: vec![vec![0.0; chunk_size]; channels],
            planar_out: vec![Vec::new(); channels],
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Feed interleaved input; returns whatever whole blocks produced.
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        self.pending.extend_from_slice(input);

        let block = self.chunk_size * self.channels;
        let mut output = Vec::new();
        let mut consumed = 0;

        while self.pending.len() - consumed >= block {
            let frames = &self.pending[consumed..consumed + block];
            for (i, frame) in frames.chunks_exact(self.channels).enumerate() {
                for (ch, &sample) in frame.iter().enumerate() {
                    self.planar_in[ch][i] = sample;
                }
            }
            consumed += block;

            let out_len = self.resampler.output_frames_next();
            for plane in self.planar_out.iter_mut() {
                plane.resize(out_len, 0.0);
            }

            let input_adapter =
                SequentialSliceOfVecs::new(&self.planar_in, self.channels, self.chunk_size)
                    .map_err(resample_err)?;
            let mut output_adapter =
                SequentialSliceOfVecs::new_mut(&mut self.planar_out, self.channels, out_len)
                    .map_err(resample_err)?;
            self.resampler
                .process_into_buffer(&input_adapter, &mut output_adapter, None)
                .map_err(resample_err)?;

            output.reserve(out_len * self.channels);
            for i in 0..out_len {
                for plane in &self.planar_out {
                    output.push(plane[i]);
                }
            }
        }

        self.pending.drain(..consumed);
        Ok(output)
    }

    /// Pad the last partial block with silence and push it through.
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }
        let block = self.chunk_size * self.channels;
        self.pending.resize(block, 0.0);
        self.process(&[])
    }
}
