//! Synthetic camera (`stub://` URLs).
//!
//! `stub://empty` produces a dark scene with nothing face-like in it. Every
//! other scene name produces a face-like patch in the middle of the frame:
//! columns alternate between a warm skin tone and mid gray so the analyzed
//! square has a skin share of about 0.3 and a mean luminance of about 120.
//!
//! Capture instants come from a simulated clock that advances by one frame
//! interval per frame, so runs are reproducible regardless of wall time.

use anyhow::{bail, Result};
use std::time::{Duration, Instant};

use super::{SourceConfig, SourceStats};
use crate::capture::CaptureError;
use crate::frame::Frame;

const SKIN: [u8; 3] = [220, 160, 120];
const PATCH_GRAY: [u8; 3] = [100, 100, 100];
const BACKGROUND: [u8; 3] = [40, 40, 40];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scene {
    Face,
    Empty,
}

pub(crate) struct SyntheticCamera {
    config: SourceConfig,
    scene: Scene,
    interval: Duration,
    clock_origin: Option<Instant>,
    frame_count: u64,
    dropped: bool,
}

impl SyntheticCamera {
    pub(crate) fn new(config: SourceConfig) -> Self {
        let scene = match config.url.trim_start_matches("stub://") {
            "empty" => Scene::Empty,
            _ => Scene::Face,
        };
        let interval = config.frame_interval();
        Self {
            config,
            scene,
            interval,
            clock_origin: None,
            frame_count: 0,
            dropped: false,
        }
    }

    /// Synthetic sources are always reachable.
    pub(crate) fn connect(&mut self) -> Result<()> {
        self.clock_origin = Some(Instant::now());
        log::info!(
            "CameraSource: connected to {} (synthetic, {:?} scene)",
            self.config.url,
            self.scene
        );
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        let Some(origin) = self.clock_origin else {
            bail!("camera source {} is not connected", self.config.url);
        };
        if let Some(limit) = self.config.fail_after {
            if self.frame_count >= limit {
                self.dropped = true;
                return Err(CaptureError::CameraUnavailable {
                    reason: format!("{} stopped after {} frames", self.config.url, limit),
                }
                .into());
            }
        }

        let captured_at = origin + self.interval * self.frame_count as u32;
        self.frame_count += 1;

        let pixels = self.render();
        Ok(Frame::from_rgb(pixels, self.config.width, self.config.height)?
            .with_capture_instant(captured_at))
    }

    fn render(&self) -> Vec<u8> {
        let (w, h) = (self.config.width, self.config.height);
        let mut pixels = Vec::with_capacity(w as usize * h as usize * 3);
        let (px0, px1) = (w / 4, w - w / 4);
        let (py0, py1) = (h / 4, h - h / 4);
        for y in 0..h {
            for x in 0..w {
                let in_patch = (px0..px1).contains(&x) && (py0..py1).contains(&y);
                let sample = match (self.scene, in_patch) {
                    (Scene::Face, true) if x % 10 < 3 => SKIN,
                    (Scene::Face, true) => PATCH_GRAY,
                    _ => BACKGROUND,
                };
                pixels.extend_from_slice(&sample);
            }
        }
        pixels
    }

    pub(crate) fn is_healthy(&self) -> bool {
        !self.dropped
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.config.url.clone(),
        }
    }
}
