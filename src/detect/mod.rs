mod backend;
pub mod backends;
pub mod dwell;
mod result;
pub mod stabilizer;

pub use backend::{FaceDetector, FaceRegion};
pub use backends::{HeuristicDetector, StubDetector};
pub use dwell::{pose_quality, DwellGate, DEFAULT_DWELL};
pub use result::{BoundingBox, DetectionResult, Direction, Landmarks, Point, StabilizedDetection};
pub use stabilizer::{HistoryBuffer, MAX_HISTORY, STABILITY_WINDOW};
