//! Live-stream people counting.
//!
//! The `countd` daemon ingests a live video stream, counts the people
//! visible in each frame with a pluggable detector backend, aggregates
//! per-frame counts over a fixed window, and reports each window's
//! average to an HTTP backend.
//!
//! # Module Structure
//!
//! - `config`: flag/environment parsing and validation
//! - `ingest`: stream sources (HLS via ffmpeg, MJPEG, synthetic) plus
//!   connect/retry and channel resolution
//! - `twitch`: Helix liveness checks and channel-to-URL resolution
//! - `detect`: detector backends and per-frame person counting
//! - `aggregate`: the count buffer and window averaging
//! - `report`: delivery of aggregated windows to the backend
//! - `service`: the capture loop tying it all together

pub mod aggregate;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod report;
pub mod service;
pub mod twitch;

pub use aggregate::{CountAggregator, CountWindow};
pub use config::{Args, Config, StreamSource};
pub use detect::{select_backend, DetectorBackend, PersonCounter};
pub use frame::Frame;
pub use ingest::{connect_to_stream, StreamResolver, StreamSession};
pub use report::Reporter;
pub use service::{CountService, ShutdownFlag};
pub use twitch::TwitchClient;
