use anyhow::Result;

use crate::detect::result::{BoundingBox, Landmarks};

/// Face-like region found by a detector backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceRegion {
    pub position: BoundingBox,
    pub landmarks: Landmarks,
    /// 0..=1
    pub confidence: f32,
    /// Mean luminance of the analyzed region, 0..=255.
    pub luminance: f32,
    /// Share of analyzed samples classified skin-tone-like.
    pub skin_fraction: f32,
}

/// Face detector backend.
///
/// Implementations receive pixels for the duration of `detect` only and must
/// not retain them. Backends decide presence and region; pose, dwell and
/// quality are the session's job.
pub trait FaceDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Inspect one packed RGB24 frame. `Ok(None)` means no face-like region.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Option<FaceRegion>>;

    /// One-time initialization before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
