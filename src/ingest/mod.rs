//! Frame sources.
//!
//! - `stub://` synthetic camera (tests, demo)
//! - local directory of still images (feature: ingest-images)
//!
//! Sources are pull-based: the caller asks for one frame at a time. When a
//! source can no longer produce frames it fails with
//! `CaptureError::CameraUnavailable`; it never retries on its own.
//!
//! Sources MUST NOT write frames to disk or log pixel content.

#[cfg(feature = "ingest-images")]
pub mod images;
pub mod synthetic;

use anyhow::{bail, Result};
use std::time::Duration;

use crate::frame::Frame;
#[cfg(feature = "ingest-images")]
use images::ImageDirSource;
use synthetic::SyntheticCamera;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// `stub://<scene>` or a local directory path.
    pub url: String,
    /// Frames per second. Sets the spacing of frame capture instants.
    pub target_fps: u32,
    /// Frame width for synthetic frames.
    pub width: u32,
    /// Frame height for synthetic frames.
    pub height: u32,
    /// Simulate the feed dropping after this many frames.
    pub fail_after: Option<u64>,
}

impl SourceConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.target_fps.max(1)))
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "stub://face".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
            fail_after: None,
        }
    }
}

/// Camera frame source.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "ingest-images")]
    ImageDir(ImageDirSource),
}

impl CameraSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        if config.target_fps == 0 {
            bail!("target_fps must be >= 1");
        }
        if config.url.starts_with("stub://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCamera::new(config)),
            });
        }
        if config.url.trim().is_empty() || config.url.contains("://") {
            bail!(
                "unsupported camera source '{}' (expected stub:// or a local directory)",
                config.url
            );
        }
        #[cfg(feature = "ingest-images")]
        {
            Ok(Self {
                backend: CameraBackend::ImageDir(ImageDirSource::new(config)?),
            })
        }
        #[cfg(not(feature = "ingest-images"))]
        {
            bail!("image directory sources require the ingest-images feature")
        }
    }

    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-images")]
            CameraBackend::ImageDir(source) => source.connect(),
        }
    }

    /// Pull the next frame.
    pub fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-images")]
            CameraBackend::ImageDir(source) => source.next_frame(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "ingest-images")]
            CameraBackend::ImageDir(source) => source.is_healthy(),
        }
    }

    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-images")]
            CameraBackend::ImageDir(source) => source.stats(),
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub url: String,
}
