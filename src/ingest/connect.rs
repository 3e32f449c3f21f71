//! Bounded-retry stream connection.
//!
//! Connecting means: resolve the configured source into a URL, open a
//! decoder session for it, and confirm delivery with one trial read. Each
//! of those can fail; a failure of any of them consumes one attempt. URLs
//! are re-resolved on every attempt, so rotated channel URLs are picked up
//! on reconnect.

use std::thread;
use std::time::Duration;

use anyhow::Result;

use super::resolve::StreamResolver;
use super::session::StreamSession;

/// Attempts before giving up.
pub const CONNECT_ATTEMPTS: u32 = 5;
/// Fixed delay between consecutive attempts.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Connect to the configured stream with bounded retries.
///
/// Returns `None` after exhausting all attempts. Startup treats that as
/// fatal; the running loop treats it as retry-later.
pub fn connect_to_stream(resolver: &StreamResolver) -> Option<StreamSession> {
    connect_with(
        CONNECT_ATTEMPTS,
        CONNECT_RETRY_DELAY,
        || resolver.resolve(),
        |url| {
            let mut session = StreamSession::open(url)?;
            session.trial_read()?;
            Ok(session)
        },
        thread::sleep,
    )
}

/// The connection algorithm with injected resolve/open/sleep, so retry
/// counting and pacing are testable without a network or a clock.
pub fn connect_with<R, O, S>(
    attempts: u32,
    delay: Duration,
    mut resolve: R,
    mut open: O,
    mut sleep: S,
) -> Option<StreamSession>
where
    R: FnMut() -> Result<Option<String>>,
    O: FnMut(&str) -> Result<StreamSession>,
    S: FnMut(Duration),
{
    for attempt in 1..=attempts {
        match resolve() {
            Ok(Some(url)) => match open(&url) {
                Ok(session) => {
                    log::info!("connected to stream on attempt {}/{}", attempt, attempts);
                    return Some(session);
                }
                Err(err) => {
                    log::warn!("connect attempt {}/{} failed: {:#}", attempt, attempts, err);
                }
            },
            Ok(None) => {
                log::warn!("connect attempt {}/{}: no stream available", attempt, attempts);
            }
            Err(err) => {
                log::warn!(
                    "connect attempt {}/{}: resolve failed: {:#}",
                    attempt,
                    attempts,
                    err
                );
            }
        }
        if attempt < attempts {
            sleep(delay);
        }
    }
    log::error!("unable to connect to stream after {} attempts", attempts);
    None
}
