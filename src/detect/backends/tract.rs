#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, ObjectClass};

/// Tract-based backend for ONNX person detection.
///
/// Loads a local YOLO-family model file and performs inference on RGB
/// frames. Expects the common detection output layout `[1, 4 + classes, N]`
/// (box center/size rows followed by per-class score rows); the transposed
/// `[1, N, 4 + classes]` variant is handled too. No network I/O.
pub struct TractBackend {
    model: TypedSimplePlan<TypedModel>,
    width: u32,
    height: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            confidence_threshold: 0.35,
            iou_threshold: 0.45,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        if width != self.width || height != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                width,
                height,
                self.width,
                self.height
            ));
        }

        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;

        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let width = width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn parse_detections(&self, outputs: TVec<TValue>) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape();
        if shape.len() != 3 || shape[0] != 1 {
            bail!("unexpected model output shape {:?}", shape);
        }

        // Rows-as-channels is the export default; fewer channels than anchors
        // tells the layouts apart.
        let channel_major = shape[1] <= shape[2];
        let (channels, anchors) = if channel_major {
            (shape[1], shape[2])
        } else {
            (shape[2], shape[1])
        };
        if channels < 5 {
            bail!("model output has {} channels, need at least 5", channels);
        }
        let class_count = channels - 4;
        let at = |c: usize, a: usize| {
            if channel_major {
                view[[0, c, a]]
            } else {
                view[[0, a, c]]
            }
        };

        let frame_w = self.width as f32;
        let frame_h = self.height as f32;
        let mut candidates = Vec::new();
        for a in 0..anchors {
            let mut best_class = 0usize;
            let mut best_score = 0.0f32;
            for c in 0..class_count {
                let score = at(4 + c, a);
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }
            if best_score < self.confidence_threshold {
                continue;
            }
            let cx = at(0, a);
            let cy = at(1, a);
            let w = at(2, a);
            let h = at(3, a);
            candidates.push(Detection {
                x: ((cx - w / 2.0) / frame_w).clamp(0.0, 1.0),
                y: ((cy - h / 2.0) / frame_h).clamp(0.0, 1.0),
                w: (w / frame_w).clamp(0.0, 1.0),
                h: (h / frame_h).clamp(0.0, 1.0),
                confidence: best_score,
                class: ObjectClass::from_coco_id(best_class as u32),
            });
        }

        Ok(non_max_suppress(candidates, self.iou_threshold))
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.parse_detections(outputs)
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = vec![0u8; (self.width * self.height * 3) as usize];
        let input = self.build_input(&blank, self.width, self.height)?;
        self.model
            .run(tvec!(input.into()))
            .context("ONNX warm-up inference failed")?;
        Ok(())
    }
}

/// Greedy per-class non-maximum suppression.
fn non_max_suppress(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        let overlaps = kept
            .iter()
            .any(|k| k.class == candidate.class && iou(k, &candidate) > iou_threshold);
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &Detection, b: &Detection) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.w).min(b.x + b.w);
    let y2 = (a.y + a.h).min(b.y + b.h);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.w * a.h + b.w * b.h - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}
