use serde::Serialize;

use crate::detect::Direction;

/// Position in the capture sequence. Only ever moves forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStep {
    #[default]
    Front,
    Left,
    Right,
    Complete,
}

impl CaptureStep {
    /// Direction that must be held to complete this step.
    pub fn expected_direction(&self) -> Direction {
        match self {
            CaptureStep::Front => Direction::Front,
            CaptureStep::Left => Direction::Left,
            CaptureStep::Right => Direction::Right,
            CaptureStep::Complete => Direction::None,
        }
    }

    pub fn next(&self) -> CaptureStep {
        match self {
            CaptureStep::Front => CaptureStep::Left,
            CaptureStep::Left => CaptureStep::Right,
            CaptureStep::Right | CaptureStep::Complete => CaptureStep::Complete,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CaptureStep::Complete)
    }

    /// 1-based index among the pose steps; `None` once complete.
    pub fn ordinal(&self) -> Option<usize> {
        match self {
            CaptureStep::Front => Some(1),
            CaptureStep::Left => Some(2),
            CaptureStep::Right => Some(3),
            CaptureStep::Complete => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            CaptureStep::Front => "Front view",
            CaptureStep::Left => "Left profile",
            CaptureStep::Right => "Right profile",
            CaptureStep::Complete => "Capture complete",
        }
    }

    pub fn instruction(&self) -> &'static str {
        self.expected_direction().instruction()
    }
}

impl std::fmt::Display for CaptureStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureStep::Complete => f.write_str("complete"),
            step => f.write_str(step.expected_direction().as_str()),
        }
    }
}
