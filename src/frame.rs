//! Luminance frame grids used for motion comparison.
//!
//! - `Frame`: immutable width x height grid of 8-bit luminance samples,
//!   produced by downsampling a captured still. Distinct from the
//!   high-resolution video output; never written to disk.
//! - `Region`: axis-aligned sub-rectangle of the grid that comparison is
//!   restricted to.
//! - `FrameHistory`: owned two-slot (previous/current) history, replaced
//!   wholesale each sampling tick. No in-place buffer reuse.

use serde::Deserialize;

use crate::error::{RecorderError, Result};

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// An immutable low-resolution luminance grid.
///
/// Frames are snapshots: once returned by the sampler they are never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    luma: Vec<u8>,
}

impl Frame {
    /// Build a frame from row-major luminance bytes.
    ///
    /// Fails when the byte count does not match the claimed dimensions,
    /// which indicates a resolution mismatch between the camera and the
    /// configured test grid.
    pub fn from_luma(width: u32, height: u32, luma: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if luma.len() != expected {
            return Err(RecorderError::Configuration(format!(
                "luminance buffer is {} bytes, expected {}x{} = {}",
                luma.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            luma,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Luminance at (x, y). Callers must stay inside the grid; region bounds
    /// are validated at configuration time, not here.
    #[inline]
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        self.luma[y as usize * self.width as usize + x as usize]
    }
}

// ----------------------------------------------------------------------------
// Region
// ----------------------------------------------------------------------------

/// Rectangular sub-area of the test grid compared for motion.
///
/// Half-open on both axes: `[start_x, end_x) x [start_y, end_y)`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct Region {
    pub start_x: u32,
    pub start_y: u32,
    pub end_x: u32,
    pub end_y: u32,
}

impl Region {
    /// Region covering an entire width x height grid.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            start_x: 0,
            start_y: 0,
            end_x: width,
            end_y: height,
        }
    }

    /// Validate `0 <= start < end <= dimension` on each axis.
    ///
    /// Called once at startup; `detect_motion` assumes a valid region.
    pub fn validate_within(&self, width: u32, height: u32) -> Result<()> {
        if self.start_x >= self.end_x || self.start_y >= self.end_y {
            return Err(RecorderError::Configuration(format!(
                "detection region ({},{})-({},{}) is empty",
                self.start_x, self.start_y, self.end_x, self.end_y
            )));
        }
        if self.end_x > width || self.end_y > height {
            return Err(RecorderError::Configuration(format!(
                "detection region ({},{})-({},{}) exceeds the {}x{} test grid",
                self.start_x, self.start_y, self.end_x, self.end_y, width, height
            )));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// FrameHistory
// ----------------------------------------------------------------------------

/// Two-slot frame history: the previous and current sampled frames.
///
/// `push` shifts current -> previous and installs the new frame, returning
/// the pair when a previous frame exists. The slots are replaced by value,
/// so there is no aliasing between ticks.
#[derive(Debug, Default)]
pub struct FrameHistory {
    previous: Option<Frame>,
    current: Option<Frame>,
}

impl FrameHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a newly sampled frame, shifting the current one back.
    pub fn push(&mut self, frame: Frame) {
        self.previous = self.current.take();
        self.current = Some(frame);
    }

    /// The previous/current pair, once at least two frames have been pushed.
    pub fn pair(&self) -> Option<(&Frame, &Frame)> {
        match (&self.previous, &self.current) {
            (Some(prev), Some(curr)) => Some((prev, curr)),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.previous = None;
        self.current = None;
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
