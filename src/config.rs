//! Runtime configuration.
//!
//! Flags parse with environment fallbacks (`Args`), then `Config::from_args`
//! validates and normalizes into the struct the rest of the daemon consumes.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use url::Url;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Count people in a live video stream and report windowed averages"
)]
pub struct Args {
    /// Direct stream URL: HLS playlist, MJPEG stream, or JPEG snapshot
    /// endpoint. Ignored when a Twitch channel is configured.
    #[arg(long, env = "STREAM_URL")]
    stream_url: Option<String>,

    /// Twitch channel to watch; takes precedence over --stream-url.
    #[arg(long, env = "TWITCH_CHANNEL")]
    twitch_channel: Option<String>,

    /// Helix application client id. Without it channel liveness cannot be
    /// verified and resolution relies on the helper alone.
    #[arg(long, env = "TWITCH_CLIENT_ID")]
    twitch_client_id: Option<String>,

    /// Seconds between channel liveness re-checks.
    #[arg(long, env = "TWITCH_CHECK_INTERVAL", default_value_t = 60)]
    twitch_check_interval: u64,

    /// Identifier attached to every reported count window.
    #[arg(long, env = "STREAM_ID", default_value = "stream1")]
    stream_id: String,

    /// Base URL of the backend receiving count windows.
    #[arg(long, env = "BACKEND_URL", default_value = "http://127.0.0.1:3000")]
    backend_url: String,

    /// Minimum detection confidence (0.0-1.0) for a person to count.
    #[arg(long, env = "CONFIDENCE_THRESHOLD", default_value_t = 0.35)]
    confidence_threshold: f32,

    /// Aggregation window length in seconds.
    #[arg(long, env = "AGGREGATION_INTERVAL", default_value_t = 15)]
    aggregation_interval: u64,

    /// Detector backend: 'stub' or 'tract'.
    #[arg(long, env = "DETECTOR", default_value = "stub")]
    detector: String,

    /// Path to the ONNX model used by the tract backend.
    #[arg(long, env = "MODEL_PATH", default_value = "yolov8n.onnx")]
    model_path: PathBuf,

    /// Processing resolution frames are resized to before inference.
    #[arg(long, env = "PROC_WIDTH", default_value_t = 1280)]
    proc_width: u32,

    #[arg(long, env = "PROC_HEIGHT", default_value_t = 720)]
    proc_height: u32,
}

/// Validated daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub stream_url: Option<String>,
    pub twitch_channel: Option<String>,
    pub twitch_client_id: Option<String>,
    pub twitch_check_interval: Duration,
    pub stream_id: String,
    pub backend_url: String,
    pub confidence_threshold: f32,
    pub aggregation_interval: Duration,
    pub detector: String,
    pub model_path: PathBuf,
    pub proc_width: u32,
    pub proc_height: u32,
}

/// Where frames come from, channel preferred when both are configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSource {
    /// Twitch channel, resolved to a playable URL at connect time.
    Channel(String),
    /// Direct URL, used verbatim.
    Url(String),
}

impl Config {
    /// Parse the process arguments and environment into a validated config.
    pub fn load() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<Self> {
        if args.twitch_channel.is_none() && args.stream_url.is_none() {
            bail!("either --twitch-channel or --stream-url must be provided");
        }

        let twitch_channel = match args.twitch_channel {
            Some(channel) => {
                validate_channel_name(&channel)?;
                Some(channel.to_lowercase())
            }
            None => None,
        };

        if let Some(url) = &args.stream_url {
            Url::parse(url).with_context(|| format!("invalid stream URL '{url}'"))?;
        }

        let backend = Url::parse(&args.backend_url)
            .with_context(|| format!("invalid backend URL '{}'", args.backend_url))?;
        if backend.scheme() != "http" && backend.scheme() != "https" {
            bail!("backend URL must use http or https");
        }

        if !(0.0..=1.0).contains(&args.confidence_threshold) {
            bail!("confidence threshold must be between 0.0 and 1.0");
        }
        if args.aggregation_interval == 0 {
            bail!("aggregation interval must be greater than zero");
        }
        if args.twitch_check_interval == 0 {
            bail!("twitch check interval must be greater than zero");
        }
        if args.proc_width == 0 || args.proc_height == 0 {
            bail!("processing resolution must be non-zero");
        }
        if args.stream_id.trim().is_empty() {
            bail!("stream id must not be empty");
        }

        Ok(Self {
            stream_url: args.stream_url,
            twitch_channel,
            twitch_client_id: args.twitch_client_id,
            twitch_check_interval: Duration::from_secs(args.twitch_check_interval),
            stream_id: args.stream_id,
            backend_url: args.backend_url,
            confidence_threshold: args.confidence_threshold,
            aggregation_interval: Duration::from_secs(args.aggregation_interval),
            detector: args.detector,
            model_path: args.model_path,
            proc_width: args.proc_width,
            proc_height: args.proc_height,
        })
    }

    /// The source frames come from, channel winning over a direct URL.
    pub fn source(&self) -> Option<StreamSource> {
        if let Some(channel) = &self.twitch_channel {
            return Some(StreamSource::Channel(channel.clone()));
        }
        self.stream_url
            .as_ref()
            .map(|url| StreamSource::Url(url.clone()))
    }
}

/// Twitch login names: 3-25 of `[a-z0-9_]`, case-insensitive.
pub fn validate_channel_name(name: &str) -> Result<()> {
    // Compile once.
    static CHANNEL_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = CHANNEL_RE.get_or_init(|| regex::Regex::new(r"^[a-z0-9_]{3,25}$").unwrap());

    if !re.is_match(&name.to_lowercase()) {
        return Err(anyhow!("channel name must match ^[a-z0-9_]{{3,25}}$"));
    }
    Ok(())
}
