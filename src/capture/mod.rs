//! Capture step state machine and session.
//!
//! The sequence is front, left, right, then complete. A step advances only
//! when the stabilized detection passes the accept gate for that step's
//! direction; that is also the only moment a frame is kept.

mod driver;
mod error;
mod gate;
mod session;
mod set;
mod step;

pub use driver::{drive, DriveReport};
pub use error::{capture_error_kind, CaptureError};
pub use gate::{AcceptGate, DEFAULT_MIN_CONFIDENCE, DEFAULT_MIN_QUALITY, DEFAULT_MIN_STABILITY};
pub use session::{CaptureSession, Feedback, FrameOutcome, SessionConfig};
pub use set::CaptureSet;
pub use step::CaptureStep;
