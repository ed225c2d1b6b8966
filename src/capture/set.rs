use anyhow::{anyhow, bail, Result};

use crate::detect::Direction;
use crate::frame::CapturedImage;

/// The three pose captures handed to the upload collaborator.
#[derive(Debug)]
pub struct CaptureSet {
    front: CapturedImage,
    left: CapturedImage,
    right: CapturedImage,
}

impl CaptureSet {
    /// Build from captures in any order. Exactly one image per pose is required.
    pub fn from_images(images: Vec<CapturedImage>) -> Result<Self> {
        if images.len() != Direction::POSES.len() {
            bail!(
                "capture set needs exactly {} images, got {}",
                Direction::POSES.len(),
                images.len()
            );
        }
        let mut front = None;
        let mut left = None;
        let mut right = None;
        for image in images {
            let slot = match image.direction() {
                Direction::Front => &mut front,
                Direction::Left => &mut left,
                Direction::Right => &mut right,
                Direction::None => bail!("capture tagged with no direction"),
            };
            if slot.is_some() {
                bail!("duplicate {} capture", image.direction());
            }
            *slot = Some(image);
        }
        Ok(Self {
            front: front.ok_or_else(|| anyhow!("missing front capture"))?,
            left: left.ok_or_else(|| anyhow!("missing left capture"))?,
            right: right.ok_or_else(|| anyhow!("missing right capture"))?,
        })
    }

    pub fn get(&self, direction: Direction) -> Option<&CapturedImage> {
        match direction {
            Direction::Front => Some(&self.front),
            Direction::Left => Some(&self.left),
            Direction::Right => Some(&self.right),
            Direction::None => None,
        }
    }

    /// Images in capture order.
    pub fn iter(&self) -> impl Iterator<Item = &CapturedImage> + '_ {
        [&self.front, &self.left, &self.right].into_iter()
    }
}
