use std::time::Duration;

use log::info;

use drumbox::audio_output::AudioOutput;
use drumbox::config::EngineConfig;

fn load_config() -> EngineConfig {
    let mut config = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                log::warn!("bad config {}: {}, using defaults", path, e);
                EngineConfig::default()
            }),
            Err(e) => {
                log::warn!("cannot read {}: {}, using defaults", path, e);
                EngineConfig::default()
            }
        },
        None => EngineConfig::default(),
    };
    // The standalone binary has no controller attached, so let the demo
    // script play
    config.demo_mode = true;
    config
}

fn main() {
    env_logger::init();

    let config = load_config();
    info!(
        "starting engine: {} Hz, block {}",
        config.sample_rate, config.block_size
    );

    let (engine, mut port) = drumbox::build(config);
    let stats = engine.stats_handle();

    let _output = match AudioOutput::new(engine) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("failed to start audio: {}", e);
            std::process::exit(1);
        }
    };

    info!("demo mode running; Ctrl-C to quit");
    loop {
        std::thread::sleep(Duration::from_secs(5));
        // Nothing feeds the protocol port here, but drain it anyway so a
        // future transport can be bolted on without surprises
        let mut sink = [0u8; 256];
        let _ = port.read_tx(&mut sink);
        info!(
            "uptime {} ms, voices {}, cpu {}%",
            stats.uptime_ms.load(std::sync::atomic::Ordering::Relaxed),
            stats.active_voices.load(std::sync::atomic::Ordering::Relaxed),
            stats.cpu_load.load(std::sync::atomic::Ordering::Relaxed),
        );
    }
}
