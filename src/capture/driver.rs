use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::capture::error::CaptureError;
use crate::capture::session::{CaptureSession, FrameOutcome};
use crate::detect::FaceDetector;
use crate::ingest::CameraSource;

/// How a `drive` loop ended.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriveReport {
    pub frames_read: u64,
    pub frames_skipped: u64,
    pub completed: bool,
    pub cancelled: bool,
}

/// Pull frames from `source` into `session` until every pose is captured,
/// `cancel` is set, or `max_frames` frames have been read.
///
/// Zero-area frames are skipped. A source failure fails the session and is
/// returned as `CaptureError::CameraUnavailable`.
pub fn drive<D: FaceDetector>(
    session: &mut CaptureSession<D>,
    source: &mut CameraSource,
    max_frames: Option<u64>,
    cancel: &AtomicBool,
    mut on_frame: impl FnMut(&FrameOutcome),
) -> Result<DriveReport> {
    let mut report = DriveReport::default();

    while !session.is_complete() {
        if cancel.load(Ordering::SeqCst) {
            log::info!("capture cancelled after {} frames", report.frames_read);
            report.cancelled = true;
            return Ok(report);
        }
        if max_frames.is_some_and(|max| report.frames_read >= max) {
            log::warn!("frame budget exhausted during {} step", session.step());
            return Ok(report);
        }

        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(err) => {
                session.camera_unavailable(&err.to_string())?;
                break;
            }
        };
        report.frames_read += 1;

        match session.analyze(&frame) {
            Ok(outcome) => on_frame(&outcome),
            Err(err) => match err.downcast_ref::<CaptureError>() {
                Some(CaptureError::InvalidFrame { width, height }) => {
                    log::warn!("skipping invalid {}x{} frame", width, height);
                    report.frames_skipped += 1;
                }
                _ => return Err(err),
            },
        }
    }

    report.completed = session.is_complete();
    Ok(report)
}
