use anyhow::Result;

use crate::detect::result::Detection;

/// Detector backend trait.
///
/// A backend receives one packed RGB24 frame per call and returns every
/// object it found. Filtering down to countable people (class + confidence
/// threshold) happens in [`crate::detect::PersonCounter`], not here, so
/// backends stay reusable for other counting rules.
pub trait DetectorBackend: Send {
    /// Backend identifier, used in logs and config matching.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// Implementations must treat the pixel slice as read-only and must not
    /// retain it beyond the call.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, run once before the first real frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
