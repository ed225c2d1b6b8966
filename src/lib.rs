//! Marivor face capture
//!
//! Guided three-pose face capture for account registration and code login.
//!
//! # Architecture
//!
//! A capture session walks the shopper through three poses in order:
//! front, left profile, right profile. Each frame goes through:
//!
//! 1. **Detection**: a `FaceDetector` backend scores the center of the frame
//!    and reports a face region (or nothing).
//! 2. **Dwell gating**: the reported direction becomes the expected pose only
//!    once the shopper has held it long enough.
//! 3. **Stabilization**: the last few results are smoothed into one
//!    `StabilizedDetection` with a stability score.
//! 4. **Acceptance**: a strict threshold gate decides whether to keep the
//!    frame as that pose's capture and advance.
//!
//! A completed session yields a `CaptureSet`, which a `RegistrationStore`
//! turns into an account with a 6-digit login code.
//!
//! # Module Structure
//!
//! - `frame`: RGB frames and captured images (pixels zeroized on drop)
//! - `detect`: detector backends, dwell gate, history and stabilization
//! - `capture`: session state machine, acceptance gate, frame driver
//! - `ingest`: frame sources (synthetic camera, still-image directories)
//! - `storage`: registration store (SQLite, in-memory)
//! - `config`: file + environment configuration
//! - `ui`: terminal progress for the binaries

pub mod capture;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod storage;
pub mod ui;

pub use capture::{
    capture_error_kind, drive, AcceptGate, CaptureError, CaptureSession, CaptureSet, CaptureStep,
    DriveReport, Feedback, FrameOutcome, SessionConfig,
};
pub use config::CaptureConfig;
pub use detect::{
    BoundingBox, DetectionResult, Direction, FaceDetector, FaceRegion, HeuristicDetector,
    Landmarks, Point, StabilizedDetection, StubDetector,
};
pub use frame::{CapturedImage, Frame, ImageEncoding};
pub use ingest::{CameraSource, SourceConfig, SourceStats};
pub use storage::{
    validate_login_code, InMemoryRegistrationStore, PhotoRecord, Registration, RegistrationStore,
    SqliteRegistrationStore,
};
