use audio_decoder::engine::engine::AudioEngine;
use audio_decoder::logging::init_logging;
use audio_decoder::{PlayerConfig, SessionConfig, SymphoniaBackend};
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{error, warn};

fn main() {
    if let Err(e) = init_logging("info") {
        eprintln!("{}", e);
    }
    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> audio_decoder::Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "demo.mp3".to_string());
    let known = Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            SymphoniaBackend::supported_file_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        });
    if !known {
        warn!("{} has an unrecognised extension, trying anyway", path);
    }

    println!("--- playsong ---");
    let mut engine = AudioEngine::new(PlayerConfig::default(), SessionConfig::default())?;
    engine.load(&path)?;
    engine.play()?;
    println!("Playing {}. Ctrl-C to stop.", path);

    // Keep the output connected (device changes) until the file runs out.
    while !engine.is_finished() {
        engine.tick();
        println!("\rPlayback time: {:.2} seconds", engine.get_time_secs());
        thread::sleep(Duration::from_secs(1));
    }

    println!("Finished.");
    Ok(())
}
