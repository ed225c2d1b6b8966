//! Luminance + skin-tone heuristic.
//!
//! This is not face recognition. It inspects a square in the middle of the
//! frame and says "face" when that square is bright enough and contains
//! enough skin-coloured samples. Landmarks are fixed offsets from the square.

use anyhow::{anyhow, bail, Result};
use std::time::Duration;

use crate::detect::backend::{FaceDetector, FaceRegion};
use crate::detect::result::{BoundingBox, Landmarks, Point};
use crate::frame::RGB_CHANNELS;

/// Mean luminance (0..=255) the analyzed square must exceed.
pub const MIN_LUMINANCE: f32 = 50.0;
/// Skin-tone share the analyzed square must exceed.
pub const MIN_SKIN_FRACTION: f32 = 0.15;
/// Confidence ceiling for a heuristic detection.
pub const MAX_CONFIDENCE: f32 = 0.95;

/// Statistics over the analyzed center square.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionStats {
    pub x0: u32,
    pub y0: u32,
    pub side: u32,
    pub luminance: f32,
    pub skin_fraction: f32,
    pub samples: usize,
}

impl RegionStats {
    pub fn is_face_like(&self) -> bool {
        self.luminance > MIN_LUMINANCE && self.skin_fraction > MIN_SKIN_FRACTION
    }

    pub fn confidence(&self) -> f32 {
        (self.skin_fraction * 3.0 + self.luminance / 255.0).min(MAX_CONFIDENCE)
    }
}

/// Square centered on the frame, side a quarter of the shorter dimension.
/// Returns `(x0, y0, side)`; side is at least one pixel.
pub fn center_square(width: u32, height: u32) -> (u32, u32, u32) {
    let side = (width.min(height) / 4).max(1);
    let x0 = width.saturating_sub(side) / 2;
    let y0 = height.saturating_sub(side) / 2;
    (x0, y0, side)
}

/// Fixed skin-tone rule over one RGB sample.
pub fn is_skin_tone(r: u8, g: u8, b: u8) -> bool {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    r > 95
        && g > 40
        && b > 20
        && r > g
        && r > b
        && r.abs_diff(g) > 15
        && max - min > 15
}

/// Measure the center square of a packed RGB24 frame.
pub fn region_stats(pixels: &[u8], width: u32, height: u32) -> Result<RegionStats> {
    if width == 0 || height == 0 {
        bail!("cannot analyze a zero-area frame ({}x{})", width, height);
    }
    let expected = width as usize * height as usize * RGB_CHANNELS;
    if pixels.len() != expected {
        return Err(anyhow!(
            "RGB frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let (x0, y0, side) = center_square(width, height);
    let stride = width as usize * RGB_CHANNELS;
    let mut luminance_sum = 0.0f64;
    let mut skin = 0usize;
    let mut samples = 0usize;

    for y in y0..(y0 + side).min(height) {
        let row = y as usize * stride;
        for x in x0..(x0 + side).min(width) {
            let i = row + x as usize * RGB_CHANNELS;
            let (r, g, b) = (pixels[i], pixels[i + 1], pixels[i + 2]);
            luminance_sum += (r as f64 + g as f64 + b as f64) / 3.0;
            if is_skin_tone(r, g, b) {
                skin += 1;
            }
            samples += 1;
        }
    }

    Ok(RegionStats {
        x0,
        y0,
        side,
        luminance: (luminance_sum / samples as f64) as f32,
        skin_fraction: skin as f32 / samples as f32,
        samples,
    })
}

fn landmarks_for(stats: &RegionStats, width: u32, height: u32) -> Landmarks {
    let (w, h) = (width as f32, height as f32);
    let s = stats.side as f32;
    let cx = stats.x0 as f32 + s / 2.0;
    let cy = stats.y0 as f32 + s / 2.0;
    let at = |dx: f32, dy: f32| Point {
        x: (cx + dx * s) / w,
        y: (cy + dy * s) / h,
    };
    Landmarks {
        nose: at(0.0, 0.0),
        left_eye: at(-0.2, -0.15),
        right_eye: at(0.2, -0.15),
        mouth: at(0.0, 0.25),
    }
}

/// The shipped detector backend.
#[derive(Debug, Default)]
pub struct HeuristicDetector {
    load_delay: Duration,
    loaded: bool,
}

impl HeuristicDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated model load time spent in `warm_up`.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

impl FaceDetector for HeuristicDetector {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Option<FaceRegion>> {
        let stats = region_stats(pixels, width, height)?;
        if !stats.is_face_like() {
            return Ok(None);
        }

        let (w, h) = (width as f32, height as f32);
        let side = stats.side as f32;
        Ok(Some(FaceRegion {
            position: BoundingBox {
                x: stats.x0 as f32 / w,
                y: stats.y0 as f32 / h,
                w: side / w,
                h: side / h,
            },
            landmarks: landmarks_for(&stats, width, height),
            confidence: stats.confidence(),
            luminance: stats.luminance,
            skin_fraction: stats.skin_fraction,
        }))
    }

    fn warm_up(&mut self) -> Result<()> {
        if !self.load_delay.is_zero() {
            std::thread::sleep(self.load_delay);
        }
        self.loaded = true;
        log::debug!("heuristic detector ready");
        Ok(())
    }
}
