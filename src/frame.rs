//! Raw media layer.
//!
//! - `Frame`: one camera instant. Pixel bytes are private to the crate and
//!   zeroized on drop. Detectors receive them through `Frame::run_detector`.
//! - `CapturedImage`: the copy of an accepted frame handed to the upload
//!   collaborator, tagged with the pose it was captured for.
//!
//! Frames are never persisted. The only path from a frame to stored bytes is a
//! capture accepted by the session gate.

use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use std::time::Instant;
use zeroize::Zeroize;

use crate::detect::{Direction, FaceDetector, FaceRegion};

/// Bytes per RGB sample.
pub const RGB_CHANNELS: usize = 3;

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// One raster frame from the camera feed, packed RGB24, row-major.
///
/// There is no `Clone` and no public byte accessor. A frame lives for one
/// `analyze` call unless the session captures it.
pub struct Frame {
    data: Vec<u8>,

    pub width: u32,
    pub height: u32,

    /// Monotonic instant the frame was taken. Dwell timing is measured on this.
    captured_at: Instant,
}

impl Frame {
    /// Wrap packed RGB24 pixels. The buffer length must match the dimensions.
    ///
    /// Zero-area frames are accepted here; analysis rejects them.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = expected_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            captured_at: Instant::now(),
        })
    }

    /// A frame with every sample set to `rgb`.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self> {
        let len = expected_len(width, height)?;
        let data = rgb.iter().copied().cycle().take(len).collect();
        Self::from_rgb(data, width, height)
    }

    /// Override the capture instant (sources with their own clock).
    pub fn with_capture_instant(mut self, captured_at: Instant) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// True when the frame has no pixels to analyze.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Run a detector over this frame's pixels.
    ///
    /// The detector borrows the slice for the duration of the call only.
    pub fn run_detector<D: FaceDetector + ?Sized>(
        &self,
        detector: &mut D,
    ) -> Result<Option<FaceRegion>> {
        detector.detect(&self.data, self.width, self.height)
    }

    /// Copy this frame into a capture tagged with `direction`.
    pub(crate) fn capture(&self, direction: Direction) -> CapturedImage {
        CapturedImage {
            direction,
            width: self.width,
            height: self.height,
            pixels: self.data.clone(),
        }
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Pixel content is never formatted.
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn expected_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(RGB_CHANNELS))
        .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))
}

// ----------------------------------------------------------------------------
// CapturedImage
// ----------------------------------------------------------------------------

/// Storage encodings for a captured image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageEncoding {
    /// Packed RGB24 exactly as captured.
    RawRgb,
    /// Baseline JPEG (feature `ingest-images`).
    Jpeg,
}

impl ImageEncoding {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageEncoding::RawRgb => "rgb",
            ImageEncoding::Jpeg => "jpg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageEncoding::RawRgb => "application/octet-stream",
            ImageEncoding::Jpeg => "image/jpeg",
        }
    }
}

/// A frame accepted by the capture gate for one pose.
pub struct CapturedImage {
    direction: Direction,
    pub width: u32,
    pub height: u32,
    pixels: Vec<u8>,
}

impl CapturedImage {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }

    /// SHA-256 of the raw RGB payload.
    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(&self.pixels).into()
    }

    /// Encode for the upload collaborator.
    pub fn encode(&self, encoding: ImageEncoding) -> Result<Vec<u8>> {
        match encoding {
            ImageEncoding::RawRgb => Ok(self.pixels.clone()),
            ImageEncoding::Jpeg => self.encode_jpeg(),
        }
    }

    #[cfg(feature = "ingest-images")]
    fn encode_jpeg(&self) -> Result<Vec<u8>> {
        use image::codecs::jpeg::JpegEncoder;
        use image::ExtendedColorType;

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, 90).encode(
            &self.pixels,
            self.width,
            self.height,
            ExtendedColorType::Rgb8,
        )?;
        Ok(out)
    }

    #[cfg(not(feature = "ingest-images"))]
    fn encode_jpeg(&self) -> Result<Vec<u8>> {
        anyhow::bail!("JPEG encoding requires the ingest-images feature")
    }
}

impl Drop for CapturedImage {
    fn drop(&mut self) {
        self.pixels.zeroize();
    }
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("direction", &self.direction)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgb_validates_length() {
        assert!(Frame::from_rgb(vec![0u8; 12], 2, 2).is_ok());
        assert!(Frame::from_rgb(vec![0u8; 11], 2, 2).is_err());
    }

    #[test]
    fn zero_area_frame_is_constructible_but_empty() -> Result<()> {
        let frame = Frame::from_rgb(Vec::new(), 0, 480)?;
        assert!(frame.is_empty());
        assert_eq!(frame.byte_len(), 0);
        Ok(())
    }

    #[test]
    fn filled_repeats_sample() -> Result<()> {
        let frame = Frame::filled(3, 2, [1, 2, 3])?;
        assert_eq!(frame.byte_len(), 18);
        assert_eq!(&frame.data[..6], &[1, 2, 3, 1, 2, 3]);
        Ok(())
    }

    #[test]
    fn capture_copies_pixels_and_tags_direction() -> Result<()> {
        let frame = Frame::filled(4, 4, [200, 150, 120])?;
        let image = frame.capture(Direction::Left);
        assert_eq!(image.direction(), Direction::Left);
        assert_eq!(image.byte_len(), 48);
        assert_eq!(image.encode(ImageEncoding::RawRgb)?, frame.data);
        let expected: [u8; 32] = Sha256::digest(&frame.data).into();
        assert_eq!(image.digest(), expected);
        Ok(())
    }

    #[test]
    fn debug_output_omits_pixels() -> Result<()> {
        let frame = Frame::filled(1, 1, [7, 7, 7])?;
        let rendered = format!("{:?}", frame);
        assert!(rendered.contains("width: 1"));
        assert!(!rendered.contains("[7"));
        Ok(())
    }

    #[cfg(not(feature = "ingest-images"))]
    #[test]
    fn jpeg_requires_feature() -> Result<()> {
        let frame = Frame::filled(2, 2, [0, 0, 0])?;
        let image = frame.capture(Direction::Front);
        assert!(image.encode(ImageEncoding::Jpeg).is_err());
        Ok(())
    }
}
