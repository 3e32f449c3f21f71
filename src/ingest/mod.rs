//! Stream ingestion.
//!
//! Three pieces, used in order when bringing a stream up:
//! - [`StreamResolver`]: configuration to playable URL, resolving Twitch
//!   channels when one is configured; channel beats direct URL.
//! - [`connect_to_stream`]: bounded-retry connect (resolve, open, trial
//!   read) with a fixed delay between attempts.
//! - [`StreamSession`]: the live decoder handle. Backends: `stub://`
//!   synthetic frames, HTTP MJPEG/JPEG snapshots, and ffmpeg for HLS and
//!   everything else (feature: ingest-ffmpeg).

mod connect;
#[cfg(feature = "ingest-ffmpeg")]
pub(crate) mod hls_ffmpeg;
mod mjpeg;
mod resolve;
mod session;

pub use connect::{connect_to_stream, connect_with, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY};
pub use resolve::StreamResolver;
pub use session::{SessionStats, StreamSession};
