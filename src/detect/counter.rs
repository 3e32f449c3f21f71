use crate::detect::backend::DetectorBackend;
use crate::frame::Frame;

/// Counts people in frames via a pluggable detector backend.
///
/// The counting rule: a detection counts when its class is person and its
/// confidence meets the configured threshold. Inference failures are
/// fail-open: the frame contributes a count of zero and the loop moves on,
/// so one bad frame never takes the daemon down.
pub struct PersonCounter {
    backend: Box<dyn DetectorBackend>,
    confidence_threshold: f32,
}

impl PersonCounter {
    pub fn new(backend: Box<dyn DetectorBackend>, confidence_threshold: f32) -> Self {
        Self {
            backend,
            confidence_threshold,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Run the backend's warm-up hook once before the first real frame.
    pub fn warm_up(&mut self) -> anyhow::Result<()> {
        self.backend.warm_up()
    }

    /// Count people in one frame. Never fails: backend errors are logged and
    /// reported as zero.
    pub fn count_people(&mut self, frame: &Frame) -> u32 {
        match self
            .backend
            .detect(frame.as_rgb(), frame.width, frame.height)
        {
            Ok(detections) => detections
                .iter()
                .filter(|d| d.class.is_person() && d.confidence >= self.confidence_threshold)
                .count() as u32,
            Err(err) => {
                log::warn!("inference failed, counting 0 for this frame: {:#}", err);
                0
            }
        }
    }
}
