//! RGB frame container and processing-resolution normalization.
//!
//! Sources hand frames over as packed RGB24. Before inference the loop
//! normalizes every frame to the configured processing resolution so the
//! detector sees a stable input size regardless of what the stream delivers.

use anyhow::{anyhow, Result};
use image::imageops::FilterType;
use image::RgbImage;

/// A single decoded video frame, packed RGB24 (3 bytes per pixel, row-major).
#[derive(Clone, Debug)]
pub struct Frame {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap a packed RGB24 buffer. Rejects buffers that do not match the
    /// stated dimensions.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    pub fn as_rgb(&self) -> &[u8] {
        &self.pixels
    }

    /// Resize to the processing resolution (bilinear). Returns `self`
    /// unchanged when the frame already matches.
    pub fn resize_to(self, width: u32, height: u32) -> Result<Self> {
        if self.width == width && self.height == height {
            return Ok(self);
        }
        let src = RgbImage::from_raw(self.width, self.height, self.pixels)
            .ok_or_else(|| anyhow!("frame buffer does not match dimensions"))?;
        let resized = image::imageops::resize(&src, width, height, FilterType::Triangle);
        Ok(Self {
            pixels: resized.into_raw(),
            width,
            height,
        })
    }
}
