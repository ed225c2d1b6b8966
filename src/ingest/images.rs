//! Still-image directory source (feature: ingest-images).
//!
//! Replays PNG/JPEG files from a local directory in file-name order, one frame
//! per file. Capture instants are spaced by the configured frame interval.
//! Running out of files is reported as the camera becoming unavailable.

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::{SourceConfig, SourceStats};
use crate::capture::CaptureError;
use crate::frame::Frame;

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

pub struct ImageDirSource {
    config: SourceConfig,
    dir: PathBuf,
    files: Vec<PathBuf>,
    interval: Duration,
    clock_origin: Option<Instant>,
    frame_count: u64,
    exhausted: bool,
}

impl ImageDirSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.url);
        if !dir.is_dir() {
            bail!("image source {} is not a directory", dir.display());
        }
        let interval = config.frame_interval();
        Ok(Self {
            config,
            dir,
            files: Vec::new(),
            interval,
            clock_origin: None,
            frame_count: 0,
            exhausted: false,
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        self.files = list_images(&self.dir)?;
        if self.files.is_empty() {
            bail!("image source {} contains no images", self.dir.display());
        }
        self.clock_origin = Some(Instant::now());
        log::info!(
            "CameraSource: connected to {} ({} images)",
            self.dir.display(),
            self.files.len()
        );
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<Frame> {
        let origin = self
            .clock_origin
            .ok_or_else(|| anyhow!("camera source {} is not connected", self.dir.display()))?;

        let index = self.frame_count as usize;
        let limit_hit = self
            .config
            .fail_after
            .is_some_and(|limit| self.frame_count >= limit);
        let Some(path) = self.files.get(index).filter(|_| !limit_hit) else {
            self.exhausted = true;
            return Err(CaptureError::CameraUnavailable {
                reason: format!("{} has no more frames", self.dir.display()),
            }
            .into());
        };

        let decoded = image::open(path)
            .with_context(|| format!("decoding {}", path.display()))?
            .to_rgb8();
        let (width, height) = decoded.dimensions();
        let captured_at = origin + self.interval * self.frame_count as u32;
        self.frame_count += 1;

        Ok(Frame::from_rgb(decoded.into_raw(), width, height)?.with_capture_instant(captured_at))
    }

    pub fn is_healthy(&self) -> bool {
        !self.exhausted
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.config.url.clone(),
        }
    }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_png(dir: &Path, name: &str, rgb: [u8; 3]) {
        RgbImage::from_pixel(40, 30, Rgb(rgb))
            .save(dir.join(name))
            .expect("write png");
    }

    #[test]
    fn replays_images_in_name_order_then_drops() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_png(dir.path(), "b.png", [10, 10, 10]);
        write_png(dir.path(), "a.png", [200, 150, 120]);
        std::fs::write(dir.path().join("notes.txt"), "ignored")?;

        let mut source = ImageDirSource::new(SourceConfig {
            url: dir.path().display().to_string(),
            ..SourceConfig::default()
        })?;
        source.connect()?;

        let first = source.next_frame()?;
        assert_eq!((first.width, first.height), (40, 30));
        let second = source.next_frame()?;
        assert_eq!(
            second.captured_at() - first.captured_at(),
            Duration::from_millis(100)
        );

        let err = source.next_frame().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CaptureError>(),
            Some(CaptureError::CameraUnavailable { .. })
        ));
        assert!(!source.is_healthy());
        Ok(())
    }

    #[test]
    fn empty_directory_fails_to_connect() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut source = ImageDirSource::new(SourceConfig {
            url: dir.path().display().to_string(),
            ..SourceConfig::default()
        })?;
        assert!(source.connect().is_err());
        Ok(())
    }
}
