use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Head pose reported for a frame.
///
/// `None` means no pose was confirmed for the frame. It is never a capture target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Front,
    Left,
    Right,
    #[default]
    None,
}

impl Direction {
    /// Poses in capture order.
    pub const POSES: [Direction; 3] = [Direction::Front, Direction::Left, Direction::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Front => "front",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::None => "none",
        }
    }

    pub fn is_pose(&self) -> bool {
        !matches!(self, Direction::None)
    }

    /// Instruction shown while this pose is requested. Anything that is not a
    /// pose falls back to the front instruction.
    pub fn instruction(&self) -> &'static str {
        match self {
            Direction::Left => "Turn your head to the LEFT",
            Direction::Right => "Turn your head to the RIGHT",
            Direction::Front | Direction::None => "Look straight at the camera",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "front" => Ok(Direction::Front),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            "none" => Ok(Direction::None),
            other => Err(anyhow!("unknown direction '{}'", other)),
        }
    }
}

/// Bounding region, normalized to 0..1 by frame dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.w / 2.0,
            y: self.y + self.h / 2.0,
        }
    }
}

/// Normalized point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Placeholder landmark positions derived from the analyzed region.
/// They are fixed offsets, not measurements.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landmarks {
    pub nose: Point,
    pub left_eye: Point,
    pub right_eye: Point,
    pub mouth: Point,
}

/// Per-frame detection outcome.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detected: bool,
    /// 0..=1
    pub confidence: f32,
    pub position: Option<BoundingBox>,
    pub direction: Direction,
    /// 0..=1
    pub quality: f32,
    pub landmarks: Option<Landmarks>,
}

impl DetectionResult {
    /// The negative result: nothing detected, every score zero.
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Aggregate over the recent history window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StabilizedDetection {
    pub detected: bool,
    pub confidence: f32,
    pub direction: Direction,
    pub quality: f32,
    /// Share of examined entries that were detections, 0..=1.
    pub stability: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_fall_back_to_front() {
        assert_eq!(Direction::Front.instruction(), "Look straight at the camera");
        assert_eq!(Direction::Left.instruction(), "Turn your head to the LEFT");
        assert_eq!(Direction::Right.instruction(), "Turn your head to the RIGHT");
        assert_eq!(Direction::None.instruction(), Direction::Front.instruction());
    }

    #[test]
    fn direction_parses_case_insensitively() -> Result<()> {
        assert_eq!("LEFT".parse::<Direction>()?, Direction::Left);
        assert_eq!(" right ".parse::<Direction>()?, Direction::Right);
        assert!("up".parse::<Direction>().is_err());
        Ok(())
    }

    #[test]
    fn absent_result_is_all_zero() {
        let r = DetectionResult::absent();
        assert!(!r.detected);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.quality, 0.0);
        assert_eq!(r.direction, Direction::None);
        assert!(r.position.is_none());
        assert!(r.landmarks.is_none());
    }
}
