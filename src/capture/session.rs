//! Direction-gated capture session.
//!
//! One session owns everything a registration needs between frames: the
//! detector backend, the dwell timer, the detection history, the active step
//! and the captures taken so far. Frames are analyzed one at a time through
//! `&mut self`; there is no shared state between sessions.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

use crate::capture::error::CaptureError;
use crate::capture::gate::AcceptGate;
use crate::capture::set::CaptureSet;
use crate::capture::step::CaptureStep;
use crate::detect::{
    pose_quality, BoundingBox, DetectionResult, Direction, DwellGate, FaceDetector,
    HeuristicDetector, HistoryBuffer, StabilizedDetection, DEFAULT_DWELL,
};
use crate::frame::{CapturedImage, Frame};

/// Tunables for one session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub dwell: Duration,
    pub gate: AcceptGate,
    /// Seed for the quality jitter. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dwell: DEFAULT_DWELL,
            gate: AcceptGate::default(),
            seed: None,
        }
    }
}

/// What one analyzed frame produced.
#[derive(Clone, Debug)]
pub struct FrameOutcome {
    pub detection: DetectionResult,
    pub stabilized: StabilizedDetection,
    /// Active step after this frame.
    pub step: CaptureStep,
    /// Pose captured on this frame, if the gate fired.
    pub captured: Option<Direction>,
}

/// Snapshot for the presentation layer.
#[derive(Clone, Debug)]
pub struct Feedback {
    pub step: CaptureStep,
    pub instruction: &'static str,
    pub stabilized: StabilizedDetection,
    /// Region of the latest positive frame, for overlays.
    pub face_box: Option<BoundingBox>,
    pub captures_taken: usize,
}

pub struct CaptureSession<D: FaceDetector = HeuristicDetector> {
    detector: D,
    gate: AcceptGate,
    dwell: DwellGate,
    history: HistoryBuffer,
    step: CaptureStep,
    captures: Vec<CapturedImage>,
    rng: StdRng,
    ready: bool,
    failed: bool,
    latest: StabilizedDetection,
    frames_analyzed: u64,
}

impl CaptureSession<HeuristicDetector> {
    pub fn with_heuristic(config: SessionConfig) -> Self {
        Self::new(HeuristicDetector::new(), config)
    }
}

impl<D: FaceDetector> CaptureSession<D> {
    pub fn new(detector: D, config: SessionConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            detector,
            gate: config.gate,
            dwell: DwellGate::new(config.dwell),
            history: HistoryBuffer::new(),
            step: CaptureStep::Front,
            captures: Vec::with_capacity(Direction::POSES.len()),
            rng,
            ready: false,
            failed: false,
            latest: StabilizedDetection::default(),
            frames_analyzed: 0,
        }
    }

    /// One-time initialization. Warms the detector; later calls are no-ops.
    pub fn initialize(&mut self) -> Result<()> {
        if self.ready {
            return Ok(());
        }
        self.detector.warm_up()?;
        self.ready = true;
        log::info!(
            "capture session ready (detector={}, dwell={}ms)",
            self.detector.name(),
            self.dwell.dwell().as_millis()
        );
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn step(&self) -> CaptureStep {
        self.step
    }

    pub fn is_complete(&self) -> bool {
        self.step.is_terminal()
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn dwell(&self) -> &DwellGate {
        &self.dwell
    }

    pub fn captures(&self) -> &[CapturedImage] {
        &self.captures
    }

    pub fn frames_analyzed(&self) -> u64 {
        self.frames_analyzed
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Analyze one frame and advance the step when the gate accepts.
    pub fn analyze(&mut self, frame: &Frame) -> Result<FrameOutcome> {
        if !self.ready {
            return Err(CaptureError::NotReady.into());
        }
        if self.failed {
            return Err(CaptureError::SessionFailed.into());
        }
        if self.step.is_terminal() {
            return Err(CaptureError::SessionComplete.into());
        }
        if frame.is_empty() {
            return Err(CaptureError::InvalidFrame {
                width: frame.width,
                height: frame.height,
            }
            .into());
        }

        let expected = self.step.expected_direction();
        let detection = match frame.run_detector(&mut self.detector)? {
            Some(region) => {
                let direction = self.dwell.classify(expected, frame.captured_at());
                DetectionResult {
                    detected: true,
                    confidence: region.confidence,
                    position: Some(region.position),
                    direction,
                    quality: pose_quality(direction, expected, &mut self.rng),
                    landmarks: Some(region.landmarks),
                }
            }
            None => DetectionResult::absent(),
        };

        self.frames_analyzed += 1;
        self.history.push(detection.clone());
        let stabilized = self.history.stabilize();
        self.latest = stabilized;

        log::debug!(
            "frame #{}: step={} detected={} dir={} conf={:.2} quality={:.2} stability={:.2}",
            self.frames_analyzed,
            self.step,
            stabilized.detected,
            stabilized.direction,
            stabilized.confidence,
            stabilized.quality,
            stabilized.stability
        );

        let captured = if self.gate.accepts(&stabilized, expected) {
            self.captures.push(frame.capture(expected));
            self.step = self.step.next();
            self.dwell.reset();
            log::info!(
                "captured {} pose ({}/{}), next step: {}",
                expected,
                self.captures.len(),
                Direction::POSES.len(),
                self.step
            );
            Some(expected)
        } else {
            None
        };

        Ok(FrameOutcome {
            detection,
            stabilized,
            step: self.step,
            captured,
        })
    }

    /// Report that the frame source stopped. A session that is still
    /// capturing fails and drops its progress; a complete one is unaffected.
    pub fn camera_unavailable(&mut self, reason: &str) -> Result<()> {
        if self.step.is_terminal() {
            return Ok(());
        }
        log::warn!(
            "camera unavailable during {} step: {} ({} captures discarded)",
            self.step,
            reason,
            self.captures.len()
        );
        self.failed = true;
        self.discard_progress();
        Err(CaptureError::CameraUnavailable {
            reason: reason.to_string(),
        }
        .into())
    }

    /// Start over from the front pose. Readiness is kept.
    pub fn restart(&mut self) {
        self.failed = false;
        self.discard_progress();
        log::info!("capture session restarted");
    }

    /// Latest stabilized detection and the active step.
    pub fn feedback(&self) -> Feedback {
        Feedback {
            step: self.step,
            instruction: self.step.instruction(),
            stabilized: self.latest,
            face_box: self
                .history
                .latest()
                .filter(|r| r.detected)
                .and_then(|r| r.position),
            captures_taken: self.captures.len(),
        }
    }

    /// Hand the three captures over. Only valid once the session is complete.
    pub fn into_capture_set(self) -> Result<CaptureSet> {
        if !self.step.is_terminal() {
            anyhow::bail!(
                "capture session incomplete: {} of {} poses captured",
                self.captures.len(),
                Direction::POSES.len()
            );
        }
        CaptureSet::from_images(self.captures)
    }

    fn discard_progress(&mut self) {
        self.step = CaptureStep::Front;
        self.captures.clear();
        self.history.clear();
        self.dwell.reset();
        self.latest = StabilizedDetection::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::StubDetector;
    use std::time::Instant;

    fn session(detector: StubDetector) -> CaptureSession<StubDetector> {
        let mut s = CaptureSession::new(
            detector,
            SessionConfig {
                seed: Some(42),
                ..SessionConfig::default()
            },
        );
        s.initialize().expect("initialize");
        s
    }

    fn frame_at(at: Instant) -> Frame {
        Frame::filled(8, 8, [120, 120, 120])
            .expect("frame")
            .with_capture_instant(at)
    }

    fn kind(err: &anyhow::Error) -> CaptureError {
        err.downcast_ref::<CaptureError>()
            .cloned()
            .expect("capture error")
    }

    /// Feed frames every `step_ms` until `until_ms` (inclusive), returning
    /// the outcomes that captured something.
    fn feed(
        s: &mut CaptureSession<StubDetector>,
        t0: Instant,
        step_ms: u64,
        until_ms: u64,
    ) -> Vec<(u64, Direction)> {
        let mut captured = Vec::new();
        let mut ms = 0;
        while ms <= until_ms && !s.is_complete() {
            let out = s
                .analyze(&frame_at(t0 + Duration::from_millis(ms)))
                .expect("analyze");
            if let Some(d) = out.captured {
                captured.push((ms, d));
            }
            ms += step_ms;
        }
        captured
    }

    #[test]
    fn analyze_before_initialize_fails_fast() {
        let mut s = CaptureSession::new(StubDetector::present(0.9), SessionConfig::default());
        let err = s.analyze(&frame_at(Instant::now())).unwrap_err();
        assert_eq!(kind(&err), CaptureError::NotReady);
        assert_eq!(s.detector().calls(), 0);
    }

    #[test]
    fn zero_area_frame_is_rejected_without_history() -> Result<()> {
        let mut s = session(StubDetector::present(0.9));
        s.analyze(&frame_at(Instant::now()))?;
        let before = s.history().len();

        for (w, h) in [(0, 10), (10, 0), (0, 0)] {
            let empty = Frame::from_rgb(Vec::new(), w, h)?;
            let err = s.analyze(&empty).unwrap_err();
            assert_eq!(
                kind(&err),
                CaptureError::InvalidFrame {
                    width: w,
                    height: h
                }
            );
        }
        assert_eq!(s.history().len(), before);
        Ok(())
    }

    #[test]
    fn history_never_exceeds_ten() -> Result<()> {
        let mut s = session(StubDetector::absent());
        let t0 = Instant::now();
        for i in 0..25 {
            s.analyze(&frame_at(t0 + Duration::from_millis(i * 10)))?;
            assert!(s.history().len() <= 10);
        }
        assert_eq!(s.history().len(), 10);
        Ok(())
    }

    #[test]
    fn holds_pose_for_dwell_then_captures_each_step_once() {
        let mut s = session(StubDetector::present(0.9));
        let t0 = Instant::now();

        let captured = feed(&mut s, t0, 100, 10_000);
        let poses: Vec<Direction> = captured.iter().map(|(_, d)| *d).collect();
        assert_eq!(poses, Direction::POSES.to_vec());

        // front at 2000ms; each later pose re-arms on the frame after a capture.
        assert_eq!(captured[0].0, 2000);
        assert_eq!(captured[1].0, 4100);
        assert_eq!(captured[2].0, 6200);
        assert!(s.is_complete());

        let set = s.into_capture_set().expect("capture set");
        assert_eq!(set.iter().count(), 3);
    }

    #[test]
    fn absent_face_never_captures() {
        let mut s = session(StubDetector::absent());
        let captured = feed(&mut s, Instant::now(), 100, 5000);
        assert!(captured.is_empty());
        assert_eq!(s.step(), CaptureStep::Front);
        assert!(!s.feedback().stabilized.detected);
    }

    #[test]
    fn low_confidence_never_captures() {
        let mut s = session(StubDetector::present(0.5));
        let captured = feed(&mut s, Instant::now(), 100, 5000);
        assert!(captured.is_empty());
        assert!(s.dwell().armed_at().is_some());
    }

    #[test]
    fn complete_session_rejects_more_frames() {
        let mut s = session(StubDetector::present(0.9));
        let t0 = Instant::now();
        feed(&mut s, t0, 100, 10_000);
        assert!(s.is_complete());
        let err = s
            .analyze(&frame_at(t0 + Duration::from_secs(20)))
            .unwrap_err();
        assert_eq!(kind(&err), CaptureError::SessionComplete);
        assert!(s.camera_unavailable("stream ended").is_ok());
        assert_eq!(s.captures().len(), 3);
    }

    #[test]
    fn camera_failure_discards_progress_until_restart() -> Result<()> {
        let mut s = session(StubDetector::present(0.9));
        let t0 = Instant::now();
        feed(&mut s, t0, 100, 2500);
        assert_eq!(s.step(), CaptureStep::Left);
        assert_eq!(s.captures().len(), 1);

        let err = s.camera_unavailable("device unplugged").unwrap_err();
        assert!(matches!(kind(&err), CaptureError::CameraUnavailable { .. }));
        assert!(s.is_failed());
        assert_eq!(s.step(), CaptureStep::Front);
        assert!(s.captures().is_empty());
        assert!(s.history().is_empty());

        let err = s.analyze(&frame_at(t0 + Duration::from_secs(3))).unwrap_err();
        assert_eq!(kind(&err), CaptureError::SessionFailed);

        s.restart();
        assert!(s.is_ready());
        s.analyze(&frame_at(t0 + Duration::from_secs(4)))?;
        assert_eq!(s.history().len(), 1);
        Ok(())
    }

    #[test]
    fn incomplete_session_cannot_hand_off() {
        let mut s = session(StubDetector::present(0.9));
        feed(&mut s, Instant::now(), 100, 2500);
        assert!(s.into_capture_set().is_err());
    }

    #[test]
    fn feedback_tracks_step_and_overlay() -> Result<()> {
        let mut s = session(StubDetector::present(0.9));
        let fb = s.feedback();
        assert_eq!(fb.step, CaptureStep::Front);
        assert_eq!(fb.instruction, "Look straight at the camera");
        assert!(fb.face_box.is_none());

        let t0 = Instant::now();
        s.analyze(&frame_at(t0))?;
        let fb = s.feedback();
        assert!(fb.stabilized.detected);
        assert_eq!(fb.stabilized.direction, Direction::None);
        assert!(fb.face_box.is_some());
        assert_eq!(fb.captures_taken, 0);
        Ok(())
    }
}
