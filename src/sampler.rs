//! Frame sampling.
//!
//! One `sample()` call issues one still capture against the camera
//! collaborator at the configured low test resolution and decodes the bytes
//! into a luminance grid. Pure data acquisition; no decision logic lives
//! here. Returned frames are snapshots and are never mutated afterwards.

use crate::camera::Camera;
use crate::error::{RecorderError, Result};
use crate::frame::Frame;

/// Samples low-resolution stills for motion comparison.
#[derive(Clone, Copy, Debug)]
pub struct FrameSampler {
    test_width: u32,
    test_height: u32,
}

impl FrameSampler {
    pub fn new(test_width: u32, test_height: u32) -> Self {
        Self {
            test_width,
            test_height,
        }
    }

    /// Capture one still and decode it into a luminance grid.
    ///
    /// Clears any cosmetic image effect first so samples stay
    /// lighting-normalized. Failures are surfaced without retry; the caller
    /// decides whether the tick is lost.
    pub fn sample<C: Camera>(&self, camera: &mut C) -> Result<Frame> {
        camera
            .clear_image_effect()
            .map_err(RecorderError::Capture)?;
        let bytes = camera
            .capture_still(self.test_width, self.test_height)
            .map_err(RecorderError::Capture)?;

        let decoded = image::load_from_memory(&bytes)?.to_luma8();
        if decoded.width() != self.test_width || decoded.height() != self.test_height {
            return Err(RecorderError::Configuration(format!(
                "camera produced a {}x{} still, test grid is {}x{}",
                decoded.width(),
                decoded.height(),
                self.test_width,
                self.test_height
            )));
        }
        Frame::from_luma(self.test_width, self.test_height, decoded.into_raw())
    }
}
