mod common;

use audio_decoder::{
    BackendChunk, DecodeError, DecodeSession, DecoderBackend, FormatRequest, Result,
    SessionConfig, StreamProperties,
};
use common::{expected, ScriptedBackend};
use mockall::mock;

fn open(backend: ScriptedBackend) -> DecodeSession<ScriptedBackend> {
    let mut session = DecodeSession::new(backend, SessionConfig::default());
    session.open().expect("open scripted backend");
    session
}

fn read_frames(session: &mut DecodeSession<ScriptedBackend>, frames: usize) -> Vec<f32> {
    let mut out = vec![f32::NAN; frames * session.channels()];
    let produced = session.read(frames, &mut out);
    out.truncate(produced * session.channels());
    out
}

fn assert_frames_from(out: &[f32], channels: usize, first_frame: u64) {
    for (i, frame) in out.chunks_exact(channels).enumerate() {
        for (ch, &sample) in frame.iter().enumerate() {
            assert_eq!(
                sample,
                expected(first_frame + i as u64, ch),
                "frame {} channel {}",
                first_frame + i as u64,
                ch
            );
        }
    }
}

#[test]
fn test_open_reports_stream_properties() {
    let session = open(ScriptedBackend::stereo_44k(44100, 441));
    assert!(session.is_open());
    assert_eq!(session.channels(), 2);
    assert_eq!(session.sample_rate(), 44100);
    assert_eq!(session.bits_per_sample(), 16);
    assert!((session.duration_secs() - 1.0).abs() < 1e-6);
    assert_eq!(session.num_samples(), 88200);
    assert_eq!(session.position_in_samples(), 0);

    // primed at frame 0
    assert!(session.is_seeking());
    assert_eq!(session.backend().flushes, 1);
    assert_eq!(session.backend().positions, vec![0]);
}

#[test]
fn test_open_twice_fails() {
    let mut session = open(ScriptedBackend::stereo_44k(1000, 100));
    assert!(matches!(session.open(), Err(DecodeError::AlreadyOpen)));
}

#[test]
fn test_calls_before_open_are_inert() {
    let backend = ScriptedBackend::stereo_44k(1000, 100);
    let mut session = DecodeSession::new(backend, SessionConfig::default());
    let mut out = vec![0.0; 64];
    assert_eq!(session.read(32, &mut out), 0);
    assert_eq!(session.seek(10), 0);
    assert_eq!(session.backend().pulls, 0);
    assert!(session.backend().positions.is_empty());
}

#[test]
fn test_unsupported_width_fails_open() {
    let mut backend = ScriptedBackend::stereo_44k(1000, 100);
    backend.bits_per_sample = 32;
    let mut session = DecodeSession::new(backend, SessionConfig::default());
    assert!(matches!(
        session.open(),
        Err(DecodeError::UnsupportedSampleWidth(32))
    ));
    assert!(!session.is_open());
}

#[test]
fn test_unknown_width_defaults_to_16_bits() {
    let mut backend = ScriptedBackend::stereo_44k(1000, 100);
    backend.bits_per_sample = 0;
    let mut session = open(backend);
    assert_eq!(session.bits_per_sample(), 16);
    let out = read_frames(&mut session, 10);
    assert_frames_from(&out, 2, 0);
}

#[test]
fn test_missing_duration_is_not_fatal() {
    let mut backend = ScriptedBackend::stereo_44k(1000, 100);
    backend.fail_duration = true;
    let mut session = open(backend);
    assert_eq!(session.duration_secs(), 0.0);
    assert_eq!(session.num_samples(), 0);
    assert_eq!(read_frames(&mut session, 100).len(), 200);
}

#[test]
fn test_read_from_start() {
    let mut session = open(ScriptedBackend::stereo_44k(44100, 441));
    let out = read_frames(&mut session, 1024);
    assert_eq!(out.len(), 2048);
    assert_frames_from(&out, 2, 0);
    assert_eq!(session.position_in_samples(), 2048);
    assert_eq!(session.next_frame(), 1024);
    assert!(!session.is_seeking());
}

#[test]
fn test_split_reads_match_single_read() {
    let mut whole = open(ScriptedBackend::stereo_44k(44100, 441));
    let mut split = open(ScriptedBackend::stereo_44k(44100, 441));

    let expected_out = read_frames(&mut whole, 1024);
    let mut out = read_frames(&mut split, 512);
    out.extend(read_frames(&mut split, 512));

    assert_eq!(out, expected_out);
    assert_eq!(split.position_in_samples(), whole.position_in_samples());
}

#[test]
fn test_zero_frame_read_changes_nothing() {
    let mut session = open(ScriptedBackend::stereo_44k(44100, 441));
    read_frames(&mut session, 300);
    let position = session.position_in_samples();
    let next = session.next_frame();
    let leftover = session.leftover().len();

    let mut out = vec![0.0; 16];
    assert_eq!(session.read(0, &mut out), 0);
    assert_eq!(session.position_in_samples(), position);
    assert_eq!(session.next_frame(), next);
    assert_eq!(session.leftover().len(), leftover);

    // the stream continues where it left off
    let out = read_frames(&mut session, 50);
    assert_frames_from(&out, 2, 300);
}

#[test]
fn test_short_output_buffer_clamps_request() {
    let mut session = open(ScriptedBackend::stereo_44k(44100, 441));
    let mut out = vec![0.0; 20];
    assert_eq!(session.read(100, &mut out), 10);
    assert_frames_from(&out, 2, 0);
}

#[test]
fn test_produced_never_exceeds_requested() {
    let mut session = open(ScriptedBackend::stereo_44k(3000, 441));
    let mut out = vec![0.0; 2048];
    let mut total = 0;
    for &expected_frames in &[1024, 1024, 952, 0, 0] {
        let produced = session.read(1024, &mut out);
        assert!(produced <= 1024);
        assert_eq!(produced, expected_frames);
        total += produced;
    }
    assert_eq!(total, 3000);
    assert!(!session.is_dead());
    assert_eq!(session.position_in_samples(), 6000);
}

#[test]
fn test_leftover_stays_within_capacity() {
    let mut backend = ScriptedBackend::stereo_44k(44100, 1153);
    backend.preferred_chunk_samples = Some(64);
    let mut session = open(backend);
    assert_eq!(session.leftover().capacity(), 32);

    let mut frame = 0;
    for &size in &[7usize, 100, 1, 999, 2048, 13] {
        let out = read_frames(&mut session, size);
        assert_frames_from(&out, 2, frame);
        frame += size as u64;
        assert!(session.leftover().len() <= session.leftover().capacity());
    }
    assert!(session.leftover().capacity() >= 1153);
}

#[test]
fn test_fallback_leftover_capacity() {
    let session = open(ScriptedBackend::stereo_44k(1000, 100));
    assert_eq!(session.leftover().capacity(), 16);
}

#[test]
fn test_mono_passes_through_at_mono_density() {
    let mut session = open(ScriptedBackend::new(22050, 1, 5000, 300));
    let mut out = vec![-2.0; 150];
    assert_eq!(session.read(100, &mut out), 100);
    assert_frames_from(&out[..100], 1, 0);
    assert!(out[100..].iter().all(|&s| s == -2.0));
    assert_eq!(session.position_in_samples(), 100);
}

#[test]
fn test_seek_delivers_target_frame() {
    let mut session = open(ScriptedBackend::stereo_44k(44100, 441));
    read_frames(&mut session, 700);

    assert_eq!(session.seek(5000), 10000);
    assert!(session.leftover().is_empty());
    // biased one tick early, the backend lands on the frame before
    assert_eq!(session.backend().cursor(), 4999);

    let out = read_frames(&mut session, 256);
    assert_eq!(out.len(), 512);
    assert_frames_from(&out, 2, 5000);
    assert_eq!(session.position_in_samples(), 10512);
    assert_eq!(session.next_frame(), 5256);
}

#[test]
fn test_seek_discards_chunks_before_target() {
    let mut backend = ScriptedBackend::stereo_44k(44100, 441);
    backend.align_seeks_to_chunks = true;
    let mut session = open(backend);

    session.backend_mut().land_next_seek_at(3000);
    session.seek(5000);
    assert_eq!(session.backend().cursor(), 2646);

    let out = read_frames(&mut session, 600);
    assert_frames_from(&out, 2, 5000);
    assert!(!session.is_seeking());
}

#[test]
fn test_small_overshoot_is_padded_with_silence() {
    let mut session = open(ScriptedBackend::stereo_44k(44100, 441));
    session.backend_mut().land_next_seek_at(5003);
    session.seek(5000);

    let out = read_frames(&mut session, 16);
    assert_eq!(out.len(), 32);
    assert!(out[..6].iter().all(|&s| s == 0.0));
    assert_frames_from(&out[6..], 2, 5003);
    assert_eq!(session.next_frame(), 5016);
    assert_eq!(session.position_in_samples(), 10032);
}

#[test]
fn test_large_overshoot_takes_landing_as_position() {
    let mut session = open(ScriptedBackend::stereo_44k(44100, 441));
    session.backend_mut().land_next_seek_at(6000);
    session.seek(5000);

    let out = read_frames(&mut session, 512);
    assert_eq!(out.len(), 1024);
    assert_frames_from(&out, 2, 6000);
    assert_eq!(session.next_frame(), 6512);
}

#[test]
fn test_refused_seek_keeps_position() {
    let mut session = open(ScriptedBackend::stereo_44k(44100, 441));
    read_frames(&mut session, 100);
    session.backend_mut().refuse_seeks = true;

    assert_eq!(session.seek(5000), 200);
    assert!(session.is_seeking());
    assert!(!session.is_dead());

    // the backend never moved, so chunks are discarded until the target comes round
    let out = read_frames(&mut session, 10);
    assert_frames_from(&out, 2, 5000);
}

#[test]
fn test_seek_past_end_reads_nothing() {
    let mut session = open(ScriptedBackend::stereo_44k(1000, 100));
    session.seek(5000);
    let mut out = vec![0.0; 64];
    assert_eq!(session.read(32, &mut out), 0);
    assert!(!session.is_dead());
}

#[test]
fn test_error_kills_session() {
    let mut backend = ScriptedBackend::stereo_44k(44100, 100);
    backend.fail_on_pull = Some(3);
    let mut session = open(backend);

    let out = read_frames(&mut session, 1000);
    assert_eq!(out.len(), 400);
    assert_frames_from(&out, 2, 0);
    assert!(session.is_dead());
    assert_eq!(session.position_in_samples(), 400);

    let mut out = vec![0.0; 200];
    assert_eq!(session.read(100, &mut out), 0);
    assert_eq!(session.seek(10), 400);
    assert_eq!(session.backend().pulls, 3);
    assert_eq!(session.backend().positions.len(), 1);
}

#[test]
fn test_type_change_ends_read_short() {
    let mut backend = ScriptedBackend::stereo_44k(44100, 441);
    backend.type_change_at = Some(500);
    let mut session = open(backend);

    assert_eq!(read_frames(&mut session, 1024).len(), 1000);
    assert!(!session.is_dead());
    assert_eq!(session.position_in_samples(), 1000);
}

#[test]
fn test_empty_chunks_are_skipped() {
    let mut backend = ScriptedBackend::stereo_44k(44100, 441);
    backend.pending_empty = 3;
    let mut session = open(backend);

    let out = read_frames(&mut session, 100);
    assert_frames_from(&out, 2, 0);
    assert_eq!(out.len(), 200);
}

#[test]
fn test_endless_empty_chunks_end_read() {
    let mut backend = ScriptedBackend::stereo_44k(44100, 441);
    backend.pending_empty = 10;
    let config = SessionConfig::default().with_max_empty_pulls(2);
    let mut session = DecodeSession::new(backend, config);
    session.open().expect("open");

    let mut out = vec![0.0; 200];
    assert_eq!(session.read(100, &mut out), 0);
    assert!(!session.is_dead());
    assert_eq!(session.backend().pulls, 3);
}

mock! {
    pub Backend {}

    impl DecoderBackend for Backend {
        fn open(&mut self) -> Result<()>;
        fn select_single_audio_stream(&mut self) -> Result<()>;
        fn negotiate_output_format(&mut self, request: FormatRequest) -> Result<StreamProperties>;
        fn pull_next_chunk(&mut self) -> BackendChunk;
        fn flush_pending_chunks(&mut self) -> Result<()>;
        fn set_position(&mut self, ticks: i64) -> Result<()>;
        fn duration(&mut self) -> Result<i64>;
        fn presentation_properties(&self) -> Result<StreamProperties>;
        fn preferred_chunk_samples(&self) -> Option<usize>;
    }
}

#[test]
fn test_dead_session_stops_pulling() {
    let props = StreamProperties {
        bits_per_sample: 16,
        channels: 2,
        sample_rate: 48000,
    };

    let mut backend = MockBackend::new();
    backend.expect_open().times(1).returning(|| Ok(()));
    backend
        .expect_select_single_audio_stream()
        .times(1)
        .returning(|| Ok(()));
    backend
        .expect_negotiate_output_format()
        .times(1)
        .returning(move |_| Ok(props));
    backend.expect_duration().returning(|| Ok(10_000_000));
    backend.expect_preferred_chunk_samples().returning(|| Some(400));
    backend.expect_flush_pending_chunks().times(1).returning(|| Ok(()));
    backend
        .expect_set_position()
        .withf(|ticks| *ticks == 0)
        .times(1)
        .returning(|_| Ok(()));

    let mut pulls = 0;
    backend.expect_pull_next_chunk().times(3).returning(move || {
        pulls += 1;
        if pulls < 3 {
            let start = (pulls - 1) * 200;
            let samples = (start..start + 200).map(|s| s as i32).collect();
            // 100 frames at 48 kHz
            BackendChunk::new(samples, (pulls as i64 - 1) * 20_833)
        } else {
            BackendChunk::error()
        }
    });

    let mut session = DecodeSession::new(backend, SessionConfig::default());
    session.open().expect("open mock backend");

    let mut out = vec![0.0; 1024];
    assert_eq!(session.read(512, &mut out), 200);
    assert_eq!(out[0], 0.0);
    assert_eq!(out[399], 399.0 / 32768.0);
    assert!(session.is_dead());

    // no further backend traffic once dead
    assert_eq!(session.read(512, &mut out), 0);
    assert_eq!(session.seek(0), 400);
}
