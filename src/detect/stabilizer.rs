//! Temporal stabilization over a bounded detection history.

use std::collections::VecDeque;

use crate::detect::result::{DetectionResult, Direction, StabilizedDetection};

/// Maximum number of results kept.
pub const MAX_HISTORY: usize = 10;

/// Number of most recent results the stabilizer examines.
pub const STABILITY_WINDOW: usize = 5;

/// Bounded FIFO of recent per-frame results. Oldest entries are evicted first.
#[derive(Clone, Debug)]
pub struct HistoryBuffer {
    entries: VecDeque<DetectionResult>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(MAX_HISTORY),
            capacity: MAX_HISTORY,
        }
    }

    pub fn push(&mut self, result: DetectionResult) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&DetectionResult> {
        self.entries.back()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &DetectionResult> + '_ {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Aggregate the most recent `STABILITY_WINDOW` entries.
    pub fn stabilize(&self) -> StabilizedDetection {
        let skip = self.entries.len().saturating_sub(STABILITY_WINDOW);
        let window: Vec<&DetectionResult> = self.entries.iter().skip(skip).collect();
        stabilize(&window)
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate a window of results, oldest first.
///
/// Confidence and quality are means over detected entries; stability is the
/// detected share of the window. The direction is the most frequent pose
/// among detected entries, earliest first occurrence winning ties. Entries
/// reporting `None` abstain, so the result is `None` only when no detected
/// entry reports a pose.
pub fn stabilize(window: &[&DetectionResult]) -> StabilizedDetection {
    let valid: Vec<&DetectionResult> = window.iter().copied().filter(|r| r.detected).collect();
    if valid.is_empty() {
        return StabilizedDetection::default();
    }

    let n = valid.len() as f32;
    let confidence = valid.iter().map(|r| r.confidence).sum::<f32>() / n;
    let quality = valid.iter().map(|r| r.quality).sum::<f32>() / n;
    let stability = n / window.len() as f32;

    StabilizedDetection {
        detected: true,
        confidence,
        direction: mode_direction(valid.iter().map(|r| r.direction)),
        quality,
        stability,
    }
}

fn mode_direction(directions: impl Iterator<Item = Direction>) -> Direction {
    // (direction, count) in order of first occurrence
    let mut counts: Vec<(Direction, usize)> = Vec::with_capacity(Direction::POSES.len());
    for direction in directions.filter(Direction::is_pose) {
        match counts.iter_mut().find(|(d, _)| *d == direction) {
            Some((_, count)) => *count += 1,
            None => counts.push((direction, 1)),
        }
    }

    let mut best: Option<(Direction, usize)> = None;
    for (direction, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((direction, count));
        }
    }
    best.map(|(direction, _)| direction).unwrap_or(Direction::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(direction: Direction, confidence: f32, quality: f32) -> DetectionResult {
        DetectionResult {
            detected: true,
            confidence,
            direction,
            quality,
            ..DetectionResult::default()
        }
    }

    #[test]
    fn history_is_bounded_fifo() {
        let mut history = HistoryBuffer::new();
        for i in 0..11 {
            history.push(hit(Direction::None, i as f32 / 100.0, 0.5));
        }
        assert_eq!(history.len(), MAX_HISTORY);
        let first = history.iter().next().expect("entry");
        assert_eq!(first.confidence, 0.01);
        assert_eq!(history.latest().map(|r| r.confidence), Some(0.10));
    }

    #[test]
    fn empty_history_is_not_detected() {
        let s = HistoryBuffer::new().stabilize();
        assert!(!s.detected);
        assert_eq!(s.confidence, 0.0);
        assert_eq!(s.stability, 0.0);
    }

    #[test]
    fn all_misses_is_not_detected() {
        let mut history = HistoryBuffer::new();
        for _ in 0..4 {
            history.push(DetectionResult::absent());
        }
        let s = history.stabilize();
        assert!(!s.detected);
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn means_and_stability_use_last_five() {
        let mut history = HistoryBuffer::new();
        // Pushed out of the window.
        history.push(hit(Direction::Right, 0.1, 0.1));
        history.push(hit(Direction::Right, 0.1, 0.1));
        history.push(hit(Direction::Front, 0.8, 0.9));
        history.push(DetectionResult::absent());
        history.push(hit(Direction::Front, 0.9, 0.7));
        history.push(DetectionResult::absent());
        history.push(hit(Direction::None, 1.0, 0.8));

        let s = history.stabilize();
        assert!(s.detected);
        assert!((s.confidence - 0.9).abs() < 1e-6);
        assert!((s.quality - 0.8).abs() < 1e-6);
        assert!((s.stability - 0.6).abs() < 1e-6);
        assert_eq!(s.direction, Direction::Front);
    }

    #[test]
    fn short_history_uses_what_exists() {
        let mut history = HistoryBuffer::new();
        history.push(DetectionResult::absent());
        history.push(hit(Direction::Left, 0.9, 0.9));
        let s = history.stabilize();
        assert!((s.stability - 0.5).abs() < 1e-6);
        assert!((0.0..=1.0).contains(&s.stability));
    }

    #[test]
    fn mode_ties_go_to_earliest_occurrence() {
        let mut history = HistoryBuffer::new();
        for d in [
            Direction::Left,
            Direction::Right,
            Direction::Left,
            Direction::Right,
            Direction::Front,
        ] {
            history.push(hit(d, 0.9, 0.9));
        }
        assert_eq!(history.stabilize().direction, Direction::Left);
    }

    #[test]
    fn none_abstains_from_the_mode() {
        let mut history = HistoryBuffer::new();
        for _ in 0..4 {
            history.push(hit(Direction::None, 0.9, 0.75));
        }
        history.push(hit(Direction::Front, 0.9, 1.0));
        assert_eq!(history.stabilize().direction, Direction::Front);

        let mut idle = HistoryBuffer::new();
        idle.push(hit(Direction::None, 0.9, 0.75));
        assert_eq!(idle.stabilize().direction, Direction::None);
    }
}
