//! countd - live-stream people counting daemon
//!
//! This daemon:
//! 1. Resolves the configured source (Twitch channel or direct URL)
//! 2. Connects to the stream and reads frames at ~30 fps
//! 3. Counts people per frame with the configured detector backend
//! 4. Averages per-frame counts over a fixed aggregation window
//! 5. POSTs each window to the backend as JSON

use anyhow::{Context, Result};

use streamcount::{select_backend, Config, CountService, PersonCounter, ShutdownFlag};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = Config::load()?;

    log::info!("starting people counting service");
    match (&cfg.twitch_channel, &cfg.stream_url) {
        (Some(channel), _) => log::info!("twitch channel: {channel}"),
        (None, Some(url)) => log::info!("stream url: {url}"),
        (None, None) => {}
    }
    log::info!("stream id: {}", cfg.stream_id);
    log::info!("backend url: {}", cfg.backend_url);
    log::info!("confidence threshold: {}", cfg.confidence_threshold);
    log::info!(
        "aggregation interval: {}s",
        cfg.aggregation_interval.as_secs()
    );

    let backend = select_backend(
        &cfg.detector,
        &cfg.model_path,
        cfg.proc_width,
        cfg.proc_height,
        cfg.confidence_threshold,
    )?;
    let mut counter = PersonCounter::new(backend, cfg.confidence_threshold);
    log::info!("detector backend: {}", counter.backend_name());
    counter
        .warm_up()
        .with_context(|| format!("warming up '{}' detector", cfg.detector))?;

    let shutdown = ShutdownFlag::new();
    let handler_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        log::info!("shutdown signal received, stopping...");
        handler_flag.request();
    })
    .expect("error setting Ctrl-C handler");

    let service = CountService::connect(&cfg, counter, shutdown).context("connecting to stream")?;
    service.run()
}
