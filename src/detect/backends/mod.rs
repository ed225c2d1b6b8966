pub mod heuristic;
pub mod stub;

pub use heuristic::HeuristicDetector;
pub use stub::StubDetector;
