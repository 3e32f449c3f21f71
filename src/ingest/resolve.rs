//! Configuration-to-URL resolution.
//!
//! A configured channel always wins over a configured direct URL; direct
//! URLs pass through verbatim. `Ok(None)` is absence (offline channel, or
//! nothing configured), which the caller decides is fatal or retry-later.

use anyhow::Result;

use crate::config::{Config, StreamSource};
use crate::twitch::TwitchClient;

pub struct StreamResolver {
    source: Option<StreamSource>,
    twitch: Option<TwitchClient>,
}

impl StreamResolver {
    pub fn new(source: Option<StreamSource>, twitch: Option<TwitchClient>) -> Self {
        Self { source, twitch }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let source = cfg.source();
        let twitch = match &source {
            Some(StreamSource::Channel(_)) => {
                Some(TwitchClient::new(cfg.twitch_client_id.clone()))
            }
            _ => None,
        };
        Self::new(source, twitch)
    }

    /// The source this resolver will resolve, channel preferred.
    pub fn selected(&self) -> Option<&StreamSource> {
        self.source.as_ref()
    }

    /// Resolve the configured source into a playable URL.
    pub fn resolve(&self) -> Result<Option<String>> {
        match &self.source {
            Some(StreamSource::Channel(channel)) => match &self.twitch {
                Some(client) => client.resolve_stream_url(channel),
                None => Ok(None),
            },
            Some(StreamSource::Url(url)) => Ok(Some(url.clone())),
            None => Ok(None),
        }
    }

    /// Verified channel liveness, when a channel and credential are
    /// configured. `None` means liveness cannot be determined.
    pub fn channel_live(&self) -> Option<bool> {
        let (channel, client) = match (&self.source, &self.twitch) {
            (Some(StreamSource::Channel(channel)), Some(client)) => (channel, client),
            _ => return None,
        };
        match client.is_live(channel) {
            Ok(live) => live,
            Err(err) => {
                log::warn!("channel liveness check failed: {:#}", err);
                None
            }
        }
    }

    /// True when periodic liveness checks can produce a verified answer.
    pub fn can_verify_liveness(&self) -> bool {
        matches!(
            (&self.source, &self.twitch),
            (Some(StreamSource::Channel(_)), Some(client)) if client.can_verify()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_url_passes_through_verbatim() {
        let resolver = StreamResolver::new(
            Some(StreamSource::Url("http://cam.local/stream".to_string())),
            None,
        );
        assert_eq!(
            resolver.resolve().unwrap().as_deref(),
            Some("http://cam.local/stream")
        );
    }

    #[test]
    fn nothing_configured_resolves_to_absence() {
        let resolver = StreamResolver::new(None, None);
        assert!(resolver.resolve().unwrap().is_none());
        assert!(resolver.selected().is_none());
    }

    #[test]
    fn direct_sources_cannot_verify_liveness() {
        let resolver = StreamResolver::new(
            Some(StreamSource::Url("http://cam.local/stream".to_string())),
            None,
        );
        assert!(!resolver.can_verify_liveness());
        assert_eq!(resolver.channel_live(), None);
    }
}
