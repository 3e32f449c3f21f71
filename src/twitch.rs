//! Twitch channel resolution.
//!
//! Two external surfaces, both best-effort:
//! - Helix `/streams` liveness query, authenticated with a `Client-Id`
//!   header. Optional: without a credential the channel is resolved
//!   unverified. A 401 is an auth misconfiguration, logged as an error,
//!   and verification is skipped rather than crashing the daemon.
//! - `streamlink` subprocess for the actual playback URL. A helper that
//!   reports the channel offline or nonexistent means absence; a helper
//!   that is missing or fails in any other way falls back to a constructed
//!   usher URL guess, which may not be authenticated or playable.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const HELIX_BASE: &str = "https://api.twitch.tv/helix";
const HELIX_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_HELPER: &str = "streamlink";

/// Client for Twitch channel liveness and playback-URL resolution.
pub struct TwitchClient {
    agent: ureq::Agent,
    client_id: Option<String>,
    helix_base: String,
    helper_cmd: String,
}

#[derive(Debug, Deserialize)]
struct HelixStreamsResponse {
    data: Vec<HelixStream>,
}

#[derive(Debug, Deserialize)]
struct HelixStream {
    #[serde(rename = "type")]
    stream_type: String,
    #[serde(default)]
    viewer_count: u64,
}

enum HelperOutcome {
    Resolved(String),
    Offline,
    Unavailable(String),
}

impl TwitchClient {
    pub fn new(client_id: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(HELIX_TIMEOUT).build();
        Self {
            agent,
            client_id,
            helix_base: HELIX_BASE.to_string(),
            helper_cmd: DEFAULT_HELPER.to_string(),
        }
    }

    /// Override the Helix endpoint. Tests point this at a local server.
    pub fn with_helix_base(mut self, base: impl Into<String>) -> Self {
        self.helix_base = base.into();
        self
    }

    /// Override the resolution helper binary.
    pub fn with_helper_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.helper_cmd = cmd.into();
        self
    }

    /// True when a credential is configured and liveness can be verified.
    pub fn can_verify(&self) -> bool {
        self.client_id.is_some()
    }

    /// Query Helix for channel liveness.
    ///
    /// `Ok(None)` means verification is unavailable: no credential
    /// configured, or the credential was rejected (401).
    pub fn is_live(&self, channel: &str) -> Result<Option<bool>> {
        let Some(client_id) = self.client_id.as_deref() else {
            return Ok(None);
        };
        let url = format!("{}/streams", self.helix_base);
        let response = self
            .agent
            .get(&url)
            .query("user_login", channel)
            .set("Client-Id", client_id)
            .call();
        match response {
            Ok(response) => {
                let body: HelixStreamsResponse = response
                    .into_json()
                    .context("parse helix streams response")?;
                match body.data.first() {
                    Some(stream) => {
                        log::debug!(
                            "channel {} is live (type={}, {} viewers)",
                            channel,
                            stream.stream_type,
                            stream.viewer_count
                        );
                        Ok(Some(true))
                    }
                    None => Ok(Some(false)),
                }
            }
            Err(ureq::Error::Status(401, _)) => {
                log::error!(
                    "twitch api rejected the credential (401): check TWITCH_CLIENT_ID; \
                     continuing without liveness verification"
                );
                Ok(None)
            }
            Err(err) => Err(err).context("query twitch channel liveness"),
        }
    }

    /// Resolve a channel into a playable stream URL.
    ///
    /// `Ok(None)` means the channel is offline or does not exist.
    pub fn resolve_stream_url(&self, channel: &str) -> Result<Option<String>> {
        match self.is_live(channel) {
            Ok(Some(false)) => {
                log::info!("channel {} is not live", channel);
                return Ok(None);
            }
            Ok(Some(true)) => {}
            Ok(None) => log::debug!("resolving {} without liveness verification", channel),
            Err(err) => log::warn!("liveness check failed, resolving anyway: {:#}", err),
        }

        match self.helper_stream_url(channel) {
            HelperOutcome::Resolved(url) => {
                log::info!("resolved channel {} via {}", channel, self.helper_cmd);
                Ok(Some(url))
            }
            HelperOutcome::Offline => {
                log::info!("channel {} reported offline by resolution helper", channel);
                Ok(None)
            }
            HelperOutcome::Unavailable(reason) => {
                let guess = fallback_hls_url(channel);
                log::warn!(
                    "{}; falling back to constructed url {} (may not be playable)",
                    reason,
                    guess
                );
                Ok(Some(guess))
            }
        }
    }

    fn helper_stream_url(&self, channel: &str) -> HelperOutcome {
        let target = format!("https://twitch.tv/{}", channel);
        let output = match Command::new(&self.helper_cmd)
            .args(["--stream-url", &target, "best"])
            .output()
        {
            Ok(output) => output,
            Err(err) => {
                return HelperOutcome::Unavailable(format!(
                    "resolution helper '{}' could not run: {}",
                    self.helper_cmd, err
                ))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        classify_helper_output(output.status.success(), stdout.trim(), stderr.trim())
    }
}

/// Constructed HLS playlist guess for a channel, used when the resolution
/// helper is unavailable. Unauthenticated, so it may be rejected upstream.
pub fn fallback_hls_url(channel: &str) -> String {
    format!("https://usher.ttvnw.net/api/channel/hls/{}.m3u8", channel)
}

fn classify_helper_output(success: bool, stdout: &str, stderr: &str) -> HelperOutcome {
    if success {
        let url = stdout.lines().last().unwrap_or("").trim();
        if url.starts_with("http") {
            return HelperOutcome::Resolved(url.to_string());
        }
    }

    let combined = format!("{} {}", stdout, stderr).to_lowercase();
    if combined.contains("no playable streams")
        || combined.contains("offline")
        || combined.contains("could not be found")
    {
        return HelperOutcome::Offline;
    }

    HelperOutcome::Unavailable(format!(
        "resolution helper failed (stdout: '{}', stderr: '{}')",
        stdout, stderr
    ))
}
