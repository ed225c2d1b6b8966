/// Caller-visible session failures.
///
/// Returned inside `anyhow::Error`; recover the kind with
/// `err.downcast_ref::<CaptureError>()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureError {
    /// The frame has zero width or height. Nothing was recorded.
    InvalidFrame { width: u32, height: u32 },
    /// The frame source stopped producing frames. Progress is discarded.
    CameraUnavailable { reason: String },
    /// `analyze` was called before `initialize`.
    NotReady,
    /// All poses are captured; the session takes no more frames.
    SessionComplete,
    /// A previous camera failure ended this session; call `restart`.
    SessionFailed,
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::InvalidFrame { width, height } => {
                write!(f, "invalid frame: {}x{} has zero area", width, height)
            }
            CaptureError::CameraUnavailable { reason } => {
                write!(f, "camera unavailable: {}", reason)
            }
            CaptureError::NotReady => f.write_str("capture session used before initialization"),
            CaptureError::SessionComplete => f.write_str("capture session already complete"),
            CaptureError::SessionFailed => {
                f.write_str("capture session failed; restart from the front pose")
            }
        }
    }
}

impl std::error::Error for CaptureError {}

/// Kind of a session error, if it is one.
pub fn capture_error_kind(err: &anyhow::Error) -> Option<&CaptureError> {
    err.downcast_ref::<CaptureError>()
}
