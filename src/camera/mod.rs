//! Camera collaborator interface.
//!
//! The camera driver is external to the recorder core; this module defines
//! the capability set the core consumes plus the exposure profiles it
//! applies. Backends:
//! - `SyntheticCamera`: procedural frames, for running `sentryd` without
//!   hardware.
//! - `ScriptedCamera`: deterministic frames and a recorded command log, for
//!   tests.
//!
//! All calls are synchronous and blocking; the core imposes no timeout
//! wrapper beyond the driver's own contract.

mod stub;

pub use stub::{
    CameraCommand, CommandLog, FaultHandle, FrameFeed, ScriptedCamera, SyntheticCamera,
};

use std::path::Path;
use thiserror::Error;

/// Native sensor resolution. Recording always captures at full sensor size
/// and scales down before encoding to reduce noise.
pub const SENSOR_WIDTH: u32 = 2592;
pub const SENSOR_HEIGHT: u32 = 1944;

/// Failure reported by a camera driver operation.
#[derive(Clone, Debug, Error)]
#[error("{0}")]
pub struct CameraError(pub String);

impl CameraError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Metering mode applied at setup time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeteringMode {
    Average,
    Spot,
    Backlit,
    Matrix,
}

/// Exposure parameters applied before each recording start.
///
/// Two fixed profiles exist: the day profile leaves the driver on automatic
/// exposure, the night profile forces a long exposure with raised gain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExposureProfile {
    pub mode: ExposureMode,
    pub image_effect: ImageEffect,
    pub exposure_compensation: i8,
    pub iso: u32,
    pub brightness: u8,
    pub contrast: i8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExposureMode {
    Auto,
    Night,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageEffect {
    None,
    Denoise,
}

impl ExposureProfile {
    /// Daylight profile: automatic exposure, neutral tuning.
    pub fn day() -> Self {
        Self {
            mode: ExposureMode::Auto,
            image_effect: ImageEffect::None,
            exposure_compensation: 0,
            iso: 0, // 0 = driver auto
            brightness: 50,
            contrast: 0,
        }
    }

    /// Dusk/dawn profile: long exposure, high gain, lifted brightness.
    pub fn night() -> Self {
        Self {
            mode: ExposureMode::Night,
            image_effect: ImageEffect::Denoise,
            exposure_compensation: 10,
            iso: 800,
            brightness: 60,
            contrast: 30,
        }
    }
}

/// Capability set the recorder core consumes from a camera driver.
///
/// Implementations must be synchronous: `capture_still` returns encoded
/// image bytes for one downsampled still, and `start_recording` /
/// `stop_recording` bracket one continuous high-resolution segment.
pub trait Camera {
    /// One-time setup.
    fn set_resolution(&mut self, width: u32, height: u32) -> Result<(), CameraError>;
    fn set_framerate(&mut self, fps: u32) -> Result<(), CameraError>;
    fn set_rotation(&mut self, degrees: u16) -> Result<(), CameraError>;
    fn set_metering_mode(&mut self, mode: MeteringMode) -> Result<(), CameraError>;

    /// Capture one still, resized to the given test resolution, returning
    /// encoded image bytes.
    fn capture_still(&mut self, resize_width: u32, resize_height: u32)
        -> Result<Vec<u8>, CameraError>;

    /// Drop any cosmetic image effect so sampled stills are
    /// lighting-normalized.
    fn clear_image_effect(&mut self) -> Result<(), CameraError>;

    /// Apply an exposure profile ahead of a recording start.
    fn set_exposure_profile(&mut self, profile: &ExposureProfile) -> Result<(), CameraError>;

    /// Begin continuous recording into `path` at the given output geometry.
    fn start_recording(
        &mut self,
        path: &Path,
        resize_width: u32,
        resize_height: u32,
        quantization: u32,
        bitrate: u32,
    ) -> Result<(), CameraError>;

    /// End continuous recording and finalize the open file.
    fn stop_recording(&mut self) -> Result<(), CameraError>;

    /// Cosmetic only; failures are ignorable by callers.
    fn start_preview(&mut self) -> Result<(), CameraError>;
    fn stop_preview(&mut self) -> Result<(), CameraError>;
}

/// Output geometry for a scale-down factor applied to the sensor.
pub fn output_resolution(scale_down: u32) -> (u32, u32) {
    let scale = scale_down.max(1);
    (SENSOR_WIDTH / scale, SENSOR_HEIGHT / scale)
}
