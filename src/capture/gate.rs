use anyhow::{anyhow, Result};

use crate::detect::{Direction, StabilizedDetection};

pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.7;
pub const DEFAULT_MIN_QUALITY: f32 = 0.6;
pub const DEFAULT_MIN_STABILITY: f32 = 0.6;

/// Auto-capture predicate. Every bound is strict.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcceptGate {
    pub min_confidence: f32,
    pub min_quality: f32,
    pub min_stability: f32,
}

impl AcceptGate {
    pub fn new(min_confidence: f32, min_quality: f32, min_stability: f32) -> Result<Self> {
        for (name, value) in [
            ("min_confidence", min_confidence),
            ("min_quality", min_quality),
            ("min_stability", min_stability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within 0..=1 (got {})", name, value));
            }
        }
        Ok(Self {
            min_confidence,
            min_quality,
            min_stability,
        })
    }

    /// True when `detection` confirms the `expected` pose.
    pub fn accepts(&self, detection: &StabilizedDetection, expected: Direction) -> bool {
        detection.detected
            && detection.direction == expected
            && detection.direction != Direction::None
            && detection.confidence > self.min_confidence
            && detection.quality > self.min_quality
            && detection.stability > self.min_stability
    }
}

impl Default for AcceptGate {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            min_quality: DEFAULT_MIN_QUALITY,
            min_stability: DEFAULT_MIN_STABILITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perfect(direction: Direction) -> StabilizedDetection {
        StabilizedDetection {
            detected: true,
            confidence: 1.0,
            direction,
            quality: 1.0,
            stability: 1.0,
        }
    }

    #[test]
    fn never_accepts_none() {
        let gate = AcceptGate::default();
        assert!(!gate.accepts(&perfect(Direction::None), Direction::None));
        assert!(!gate.accepts(&perfect(Direction::None), Direction::Front));
    }

    #[test]
    fn requires_matching_direction() {
        let gate = AcceptGate::default();
        assert!(gate.accepts(&perfect(Direction::Left), Direction::Left));
        assert!(!gate.accepts(&perfect(Direction::Left), Direction::Right));
    }

    #[test]
    fn thresholds_are_strict() {
        let gate = AcceptGate::default();
        let base = perfect(Direction::Front);

        let at_confidence = StabilizedDetection {
            confidence: 0.7,
            ..base
        };
        let at_quality = StabilizedDetection {
            quality: 0.6,
            ..base
        };
        let at_stability = StabilizedDetection {
            stability: 0.6,
            ..base
        };
        let undetected = StabilizedDetection {
            detected: false,
            ..base
        };
        for d in [at_confidence, at_quality, at_stability, undetected] {
            assert!(!gate.accepts(&d, Direction::Front), "{:?}", d);
        }
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        assert!(AcceptGate::new(1.5, 0.6, 0.6).is_err());
        assert!(AcceptGate::new(0.7, -0.1, 0.6).is_err());
        assert!(AcceptGate::new(0.8, 0.7, 0.7).is_ok());
    }
}
