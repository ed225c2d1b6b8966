//! Direction classifier and dwell gate.
//!
//! No pose estimation happens here. A frame "shows" the expected direction
//! only once the face has been continuously present for the dwell time since
//! the timer was armed for that direction.

use rand::Rng;
use std::time::{Duration, Instant};

use crate::detect::result::Direction;

/// Hold time before the expected direction is reported.
pub const DEFAULT_DWELL: Duration = Duration::from_millis(2000);

const BASE_QUALITY: f32 = 0.8;
const MATCH_BONUS: f32 = 0.15;
const MISMATCH_PENALTY: f32 = 0.1;
const JITTER: f32 = 0.1;

/// Dwell timer for the session's current expected direction.
#[derive(Clone, Debug)]
pub struct DwellGate {
    dwell: Duration,
    armed: Option<(Direction, Instant)>,
}

impl DwellGate {
    pub fn new(dwell: Duration) -> Self {
        Self { dwell, armed: None }
    }

    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    /// Instant the timer was armed, if it is.
    pub fn armed_at(&self) -> Option<Instant> {
        self.armed.map(|(_, at)| at)
    }

    pub fn reset(&mut self) {
        self.armed = None;
    }

    /// Classify a positive frame taken at `now` against `expected`.
    ///
    /// Arms the timer when it is empty or armed for another direction and
    /// reports `None`. Once `now` is at least the dwell past the arming
    /// instant, clears the timer and reports `expected`.
    pub fn classify(&mut self, expected: Direction, now: Instant) -> Direction {
        if !expected.is_pose() {
            return Direction::None;
        }
        match self.armed {
            Some((direction, since)) if direction == expected => {
                if now.saturating_duration_since(since) >= self.dwell {
                    self.armed = None;
                    expected
                } else {
                    Direction::None
                }
            }
            _ => {
                self.armed = Some((expected, now));
                Direction::None
            }
        }
    }
}

impl Default for DwellGate {
    fn default() -> Self {
        Self::new(DEFAULT_DWELL)
    }
}

/// Pose quality with simulated sensor noise, clamped to 0.1..=1.0.
pub fn pose_quality<R: Rng + ?Sized>(reported: Direction, expected: Direction, rng: &mut R) -> f32 {
    let adjustment = if reported == expected {
        MATCH_BONUS
    } else {
        -MISMATCH_PENALTY
    };
    let jitter: f32 = rng.gen_range(0.0..JITTER);
    (BASE_QUALITY + adjustment + jitter).clamp(0.1, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn reports_none_until_dwell_elapses_then_clears() {
        let mut gate = DwellGate::default();
        let t0 = Instant::now();

        assert_eq!(gate.classify(Direction::Front, t0), Direction::None);
        assert_eq!(gate.armed_at(), Some(t0));

        for ms in [1, 500, 1000, 1999] {
            let at = t0 + Duration::from_millis(ms);
            assert_eq!(gate.classify(Direction::Front, at), Direction::None);
            assert_eq!(gate.armed_at(), Some(t0));
        }

        let at = t0 + Duration::from_millis(2000);
        assert_eq!(gate.classify(Direction::Front, at), Direction::Front);
        assert_eq!(gate.armed_at(), None);

        // The next call restarts the measurement.
        let later = at + Duration::from_millis(10);
        assert_eq!(gate.classify(Direction::Front, later), Direction::None);
        assert_eq!(gate.armed_at(), Some(later));
    }

    #[test]
    fn changing_expected_direction_rearms() {
        let mut gate = DwellGate::default();
        let t0 = Instant::now();
        gate.classify(Direction::Front, t0);

        let t1 = t0 + Duration::from_millis(2500);
        assert_eq!(gate.classify(Direction::Left, t1), Direction::None);
        assert_eq!(gate.armed_at(), Some(t1));
    }

    #[test]
    fn none_is_never_reported_as_a_pose() {
        let mut gate = DwellGate::new(Duration::ZERO);
        let t0 = Instant::now();
        assert_eq!(gate.classify(Direction::None, t0), Direction::None);
        assert_eq!(gate.armed_at(), None);
    }

    #[test]
    fn quality_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let matched = pose_quality(Direction::Left, Direction::Left, &mut rng);
            assert!((0.95..=1.0).contains(&matched), "matched {}", matched);

            let unmatched = pose_quality(Direction::None, Direction::Left, &mut rng);
            assert!((0.7..0.8 + 1e-6).contains(&unmatched), "unmatched {}", unmatched);
        }
    }
}
