mod common;

use std::path::PathBuf;

use audio_decoder::{DecodeError, DecodeSession, SessionConfig, SymphoniaBackend};
use common::{expected, sample_value};

const RATE: u32 = 44100;
const CHANNELS: u16 = 2;
const FRAMES: u64 = 20000;

/// Temporary 16-bit PCM WAV file, removed on drop.
struct WavFixture {
    path: PathBuf,
}

impl WavFixture {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "audio_decoder_{}_{}.wav",
            name,
            std::process::id()
        ));

        let block_align = CHANNELS as u32 * 2;
        let data_len = FRAMES as u32 * block_align;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&CHANNELS.to_le_bytes());
        bytes.extend_from_slice(&RATE.to_le_bytes());
        bytes.extend_from_slice(&(RATE * block_align).to_le_bytes());
        bytes.extend_from_slice(&(block_align as u16).to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for frame in 0..FRAMES {
            for ch in 0..CHANNELS as usize {
                let sample = sample_value(frame, ch) as i16;
                bytes.extend_from_slice(&sample.to_le_bytes());
            }
        }

        std::fs::write(&path, bytes).expect("write wav fixture");
        Self { path }
    }
}

impl Drop for WavFixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn assert_frames_from(out: &[f32], first_frame: u64) {
    for (i, frame) in out.chunks_exact(CHANNELS as usize).enumerate() {
        for (ch, &sample) in frame.iter().enumerate() {
            assert_eq!(sample, expected(first_frame + i as u64, ch));
        }
    }
}

#[test]
fn test_wav_properties() {
    let wav = WavFixture::new("properties");
    let session =
        DecodeSession::open_path(&wav.path, SessionConfig::default()).expect("open wav");

    assert_eq!(session.channels(), 2);
    assert_eq!(session.sample_rate(), RATE);
    assert_eq!(session.bits_per_sample(), 16);
    assert!((session.duration_secs() - FRAMES as f64 / RATE as f64).abs() < 1e-3);
    assert_eq!(session.num_samples(), FRAMES * 2);
}

#[test]
fn test_wav_reads_whole_file() {
    let wav = WavFixture::new("whole");
    let mut session =
        DecodeSession::open_path(&wav.path, SessionConfig::default()).expect("open wav");

    let mut out = vec![0.0; 1000 * 2];
    let mut frame = 0;
    loop {
        let produced = session.read(1000, &mut out);
        if produced == 0 {
            break;
        }
        assert_frames_from(&out[..produced * 2], frame);
        frame += produced as u64;
    }
    assert_eq!(frame, FRAMES);
    assert!(!session.is_dead());
    assert_eq!(session.position_in_samples(), FRAMES * 2);
}

#[test]
fn test_wav_seek_is_frame_accurate() {
    let wav = WavFixture::new("seek");
    let mut session =
        DecodeSession::open_path(&wav.path, SessionConfig::default()).expect("open wav");

    let mut out = vec![0.0; 256 * 2];
    assert_eq!(session.read(256, &mut out), 256);

    for &target in &[10000u64, 3, 15123, 0] {
        assert_eq!(session.seek(target), target * 2);
        assert_eq!(session.read(256, &mut out), 256);
        assert_frames_from(&out, target);
    }
}

#[test]
fn test_missing_file_fails_to_open() {
    let path = std::env::temp_dir().join("audio_decoder_does_not_exist.wav");
    let result = DecodeSession::<SymphoniaBackend>::open_path(&path, SessionConfig::default());
    assert!(matches!(result, Err(DecodeError::SourceError(_))));
}

#[test]
fn test_wav_is_a_supported_extension() {
    let extensions = SymphoniaBackend::supported_file_extensions();
    assert!(extensions.contains(&"wav"));
    assert!(extensions.contains(&"flac"));
}
