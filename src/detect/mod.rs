//! Person detection.
//!
//! Backends implement [`DetectorBackend`]; [`PersonCounter`] applies the
//! counting rule (person class, confidence threshold, fail-open on error)
//! on top of whichever backend the configuration selects.

mod backend;
mod backends;
mod counter;
mod result;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use counter::PersonCounter;
pub use result::{Detection, ObjectClass};

use std::path::Path;

use anyhow::{bail, Result};

/// Build the detector backend named in the configuration.
///
/// `width`/`height` are the processing resolution every frame is normalized
/// to before inference; model-based backends take it as their input size.
pub fn select_backend(
    name: &str,
    model_path: &Path,
    width: u32,
    height: u32,
    confidence_threshold: f32,
) -> Result<Box<dyn DetectorBackend>> {
    match name {
        "stub" => Ok(Box::new(StubBackend::new())),
        "tract" => {
            #[cfg(feature = "backend-tract")]
            {
                if !model_path.exists() {
                    bail!("model file {} not found", model_path.display());
                }
                let backend = TractBackend::new(model_path, width, height)?
                    .with_threshold(confidence_threshold);
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                let _ = (model_path, width, height, confidence_threshold);
                bail!("detector 'tract' requires the backend-tract feature")
            }
        }
        other => bail!(
            "unknown detector backend '{}'; expected 'stub' or 'tract'",
            other
        ),
    }
}
