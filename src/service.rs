//! Capture loop lifecycle.
//!
//! `CountService` owns the stream session, the detector, the aggregation
//! buffer and the reporter, and advances them one `tick()` at a time.
//! Liveness checks, reconnects and delivery failures are absorbed inside
//! the tick; only genuinely unexpected errors bubble out of `run()`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::aggregate::CountAggregator;
use crate::config::{Config, StreamSource};
use crate::detect::PersonCounter;
use crate::frame::Frame;
use crate::ingest::{connect_to_stream, StreamResolver, StreamSession};
use crate::report::Reporter;

/// How often a trial read proactively verifies the connection.
const CONNECTION_CHECK_INTERVAL: Duration = Duration::from_secs(300);
/// Pacing delay between iterations, roughly 30 fps.
const FRAME_PACING: Duration = Duration::from_millis(33);
/// Pause after a failed read on a direct URL.
const DIRECT_READ_PAUSE: Duration = Duration::from_millis(100);
/// Pause after a failed read on a channel, before re-verifying liveness.
const CHANNEL_READ_PAUSE: Duration = Duration::from_secs(1);
/// Wait after an exhausted reconnect round, per source kind.
const CHANNEL_RECONNECT_WAIT: Duration = Duration::from_secs(30);
const DIRECT_RECONNECT_WAIT: Duration = Duration::from_secs(10);
/// Progress log cadence, in processed frames.
const FRAME_LOG_INTERVAL: u64 = 30;

/// Cooperative stop flag shared between the signal handler and the loop.
#[derive(Clone)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Ask the service to stop after the current iteration.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// The capture → count → aggregate → report pipeline, driven by `run`.
pub struct CountService {
    session: Option<StreamSession>,
    resolver: StreamResolver,
    counter: PersonCounter,
    aggregator: CountAggregator,
    reporter: Reporter,
    shutdown: ShutdownFlag,
    proc_width: u32,
    proc_height: u32,
    liveness_interval: Duration,
    last_liveness_check: Instant,
    last_connection_check: Instant,
    frames_processed: u64,
}

impl CountService {
    /// Resolve the configured source and establish the initial session.
    /// Failure here is fatal; steady-state reconnects are handled in `tick`.
    pub fn connect(cfg: &Config, counter: PersonCounter, shutdown: ShutdownFlag) -> Result<Self> {
        let resolver = StreamResolver::from_config(cfg);
        let session = connect_to_stream(&resolver)
            .ok_or_else(|| anyhow!("no stream connection could be established"))?;
        Ok(Self {
            session: Some(session),
            resolver,
            counter,
            aggregator: CountAggregator::new(cfg.aggregation_interval),
            reporter: Reporter::new(&cfg.backend_url, cfg.stream_id.clone()),
            shutdown,
            proc_width: cfg.proc_width,
            proc_height: cfg.proc_height,
            liveness_interval: cfg.twitch_check_interval,
            last_liveness_check: Instant::now(),
            last_connection_check: Instant::now(),
            frames_processed: 0,
        })
    }

    /// Iterate until shutdown is requested or an unexpected error surfaces.
    /// The buffer is flushed on the way out either way.
    pub fn run(mut self) -> Result<()> {
        while !self.shutdown.is_set() {
            if let Err(err) = self.tick() {
                log::error!("unexpected error in capture loop: {:#}", err);
                break;
            }
            thread::sleep(FRAME_PACING);
        }
        self.finalize()
    }

    /// One loop iteration: periodic checks, one frame read, one count.
    pub fn tick(&mut self) -> Result<()> {
        self.maybe_check_liveness();
        self.maybe_check_connection();

        let Some(session) = self.session.as_mut() else {
            self.attempt_reconnect();
            return Ok(());
        };
        let frame = match session.read_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("failed to read frame: {:#}", err);
                self.recover_after_read_failure();
                return Ok(());
            }
        };
        self.process_frame(frame)
    }

    /// Flush whatever the buffer holds, then release the session.
    pub fn finalize(mut self) -> Result<()> {
        if !self.aggregator.is_empty() {
            self.flush_window();
        }
        if let Some(session) = self.session.take() {
            let stats = session.stats();
            log::info!(
                "capture stopped after {} frames from {}",
                stats.frames_captured,
                stats.source
            );
        }
        log::info!("count service stopped");
        Ok(())
    }

    fn process_frame(&mut self, frame: Frame) -> Result<()> {
        let frame = frame.resize_to(self.proc_width, self.proc_height)?;
        let count = self.counter.count_people(&frame);
        self.aggregator.record(count);
        self.frames_processed += 1;
        if self.frames_processed % FRAME_LOG_INTERVAL == 0 {
            log::debug!(
                "processed {} frames, current count: {}",
                self.frames_processed,
                count
            );
        }
        if self.aggregator.is_due() {
            self.flush_window();
        }
        Ok(())
    }

    fn flush_window(&mut self) {
        let Some(window) = self.aggregator.flush() else {
            return;
        };
        // Delivery failures drop the window; the buffer is already clear.
        if let Err(err) = self.reporter.send(&window) {
            log::error!("failed to deliver count window: {:#}", err);
        }
    }

    /// Interval-gated channel liveness check. Logged only; reads decide
    /// whether the session actually comes down.
    fn maybe_check_liveness(&mut self) {
        if !self.resolver.can_verify_liveness() {
            return;
        }
        if self.last_liveness_check.elapsed() < self.liveness_interval {
            return;
        }
        self.last_liveness_check = Instant::now();
        match self.resolver.channel_live() {
            Some(true) => log::debug!("channel still live"),
            Some(false) => log::warn!("channel reports offline, stream reads will confirm"),
            None => {}
        }
    }

    /// Every `CONNECTION_CHECK_INTERVAL`, burn one frame to verify the
    /// session still delivers, reconnecting when it does not.
    fn maybe_check_connection(&mut self) {
        if self.last_connection_check.elapsed() < CONNECTION_CHECK_INTERVAL {
            return;
        }
        self.last_connection_check = Instant::now();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.trial_read() {
            Ok(()) => {
                let stats = session.stats();
                log::debug!(
                    "stream healthy: {} frames captured from {}",
                    stats.frames_captured,
                    stats.source
                );
            }
            Err(err) => {
                log::warn!("stream connection lost ({:#}), reconnecting", err);
                self.session = None;
                self.attempt_reconnect();
            }
        }
    }

    /// One reconnection round. Channel resolution re-verifies liveness on
    /// its own; an exhausted round waits before the next tick retries.
    fn attempt_reconnect(&mut self) {
        match connect_to_stream(&self.resolver) {
            Some(session) => {
                log::info!("reconnected to {}", session.url());
                self.session = Some(session);
                self.last_connection_check = Instant::now();
            }
            None => {
                let wait = if self.channel_source() {
                    CHANNEL_RECONNECT_WAIT
                } else {
                    DIRECT_RECONNECT_WAIT
                };
                log::error!("reconnection failed, retrying in {:?}", wait);
                thread::sleep(wait);
            }
        }
    }

    /// Channels pause and re-verify liveness, dropping the session only on
    /// a confirmed offline answer. Direct URLs just pause briefly.
    fn recover_after_read_failure(&mut self) {
        if self.channel_source() {
            thread::sleep(CHANNEL_READ_PAUSE);
            if self.resolver.channel_live() == Some(false) {
                log::info!("channel confirmed offline, releasing stream session");
                self.session = None;
                self.attempt_reconnect();
            }
        } else {
            thread::sleep(DIRECT_READ_PAUSE);
        }
    }

    fn channel_source(&self) -> bool {
        matches!(self.resolver.selected(), Some(StreamSource::Channel(_)))
    }
}
