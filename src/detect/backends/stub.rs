use anyhow::{bail, Result};

use crate::detect::backend::{FaceDetector, FaceRegion};
use crate::detect::result::{BoundingBox, Landmarks, Point};

/// Stub backend for testing. Ignores pixel content and reports a fixed answer.
pub struct StubDetector {
    confidence: Option<f32>,
    calls: u64,
}

impl StubDetector {
    /// Reports a centered face with the given confidence on every frame.
    pub fn present(confidence: f32) -> Self {
        Self {
            confidence: Some(confidence),
            calls: 0,
        }
    }

    /// Never reports a face.
    pub fn absent() -> Self {
        Self {
            confidence: None,
            calls: 0,
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl FaceDetector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _pixels: &[u8], width: u32, height: u32) -> Result<Option<FaceRegion>> {
        if width == 0 || height == 0 {
            bail!("cannot analyze a zero-area frame ({}x{})", width, height);
        }
        self.calls += 1;
        let Some(confidence) = self.confidence else {
            return Ok(None);
        };
        let center = Point { x: 0.5, y: 0.5 };
        Ok(Some(FaceRegion {
            position: BoundingBox {
                x: 0.4,
                y: 0.4,
                w: 0.2,
                h: 0.2,
            },
            landmarks: Landmarks {
                nose: center,
                left_eye: Point { x: 0.46, y: 0.47 },
                right_eye: Point { x: 0.54, y: 0.47 },
                mouth: Point { x: 0.5, y: 0.55 },
            },
            confidence,
            luminance: 128.0,
            skin_fraction: 0.5,
        }))
    }
}
