//! Stub camera backends.
//!
//! - `SyntheticCamera`: procedural scene generator so `sentryd` can run
//!   end-to-end without camera hardware. The scene alternates between a
//!   static background and a moving bright block, producing periodic motion.
//! - `ScriptedCamera`: deterministic test double. Tests feed it luminance
//!   grids and inspect the exact sequence of driver commands issued by the
//!   core.
//!
//! Both encode stills as PNG so the sampled grids survive the encode/decode
//! round trip byte-exact.

use std::collections::VecDeque;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{Camera, CameraError, ExposureProfile, MeteringMode};

fn encode_luma_png(width: u32, height: u32, luma: &[u8]) -> Result<Vec<u8>, CameraError> {
    let image = image::GrayImage::from_raw(width, height, luma.to_vec()).ok_or_else(|| {
        CameraError::new(format!(
            "scripted frame is {} bytes, expected {}x{}",
            luma.len(),
            width,
            height
        ))
    })?;
    let mut bytes = Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(image)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .map_err(|e| CameraError::new(format!("png encode failed: {e}")))?;
    Ok(bytes.into_inner())
}

// ----------------------------------------------------------------------------
// SyntheticCamera
// ----------------------------------------------------------------------------

/// Procedural camera for hardware-free runs.
pub struct SyntheticCamera {
    capture_count: u64,
    recording_to: Option<PathBuf>,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self {
            capture_count: 0,
            recording_to: None,
        }
    }

    /// Static background with a bright block that appears for ten captures
    /// out of every forty, drifting one column per capture.
    fn generate_luma(&self, width: u32, height: u32) -> Vec<u8> {
        let mut luma = vec![64u8; (width * height) as usize];
        let phase = self.capture_count % 40;
        if phase < 10 && width > 8 && height >= 8 {
            let origin_x = (self.capture_count % (width as u64 - 8)) as u32;
            for y in 2..8 {
                for x in origin_x..origin_x + 8 {
                    luma[(y * width + x) as usize] = 220;
                }
            }
        }
        luma
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for SyntheticCamera {
    fn set_resolution(&mut self, _width: u32, _height: u32) -> Result<(), CameraError> {
        Ok(())
    }

    fn set_framerate(&mut self, _fps: u32) -> Result<(), CameraError> {
        Ok(())
    }

    fn set_rotation(&mut self, _degrees: u16) -> Result<(), CameraError> {
        Ok(())
    }

    fn set_metering_mode(&mut self, _mode: MeteringMode) -> Result<(), CameraError> {
        Ok(())
    }

    fn capture_still(
        &mut self,
        resize_width: u32,
        resize_height: u32,
    ) -> Result<Vec<u8>, CameraError> {
        self.capture_count += 1;
        let luma = self.generate_luma(resize_width, resize_height);
        encode_luma_png(resize_width, resize_height, &luma)
    }

    fn clear_image_effect(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn set_exposure_profile(&mut self, _profile: &ExposureProfile) -> Result<(), CameraError> {
        Ok(())
    }

    fn start_recording(
        &mut self,
        path: &Path,
        _resize_width: u32,
        _resize_height: u32,
        _quantization: u32,
        _bitrate: u32,
    ) -> Result<(), CameraError> {
        // Real drivers write the segment themselves; simulate with an empty
        // file so downstream storage operations have something to act on.
        std::fs::File::create(path)
            .map_err(|e| CameraError::new(format!("create {}: {e}", path.display())))?;
        self.recording_to = Some(path.to_path_buf());
        log::debug!("synthetic camera recording to {}", path.display());
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), CameraError> {
        self.recording_to = None;
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), CameraError> {
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// ScriptedCamera
// ----------------------------------------------------------------------------

/// Driver commands recorded by `ScriptedCamera`, in issue order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CameraCommand {
    SetResolution(u32, u32),
    SetFramerate(u32),
    SetRotation(u16),
    SetMeteringMode(MeteringMode),
    ClearImageEffect,
    CaptureStill(u32, u32),
    SetExposureProfile(ExposureProfile),
    StartRecording {
        path: PathBuf,
        width: u32,
        height: u32,
        quantization: u32,
        bitrate: u32,
    },
    StopRecording,
    StartPreview,
    StopPreview,
}

/// Shared command log handle, kept by tests after the camera moves into the
/// controller.
pub type CommandLog = Arc<Mutex<Vec<CameraCommand>>>;

#[derive(Default)]
struct Faults {
    capture: AtomicBool,
    start: AtomicBool,
    stop: AtomicBool,
}

/// Fault-injection handle for a `ScriptedCamera`.
#[derive(Clone, Default)]
pub struct FaultHandle(Arc<Faults>);

impl FaultHandle {
    pub fn fail_capture(&self, fail: bool) {
        self.0.capture.store(fail, Ordering::SeqCst);
    }

    pub fn fail_start(&self, fail: bool) {
        self.0.start.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stop(&self, fail: bool) {
        self.0.stop.store(fail, Ordering::SeqCst);
    }
}

/// Deterministic camera for tests: scripted luminance grids in, command log
/// out. When the frame queue runs dry the last frame repeats, which reads as
/// a static scene.
pub struct ScriptedCamera {
    frames: Arc<Mutex<VecDeque<Vec<u8>>>>,
    last_frame: Option<Vec<u8>>,
    log: CommandLog,
    faults: FaultHandle,
}

/// Handle for feeding frames to a `ScriptedCamera` after it has been moved
/// into the controller.
#[derive(Clone)]
pub struct FrameFeed(Arc<Mutex<VecDeque<Vec<u8>>>>);

impl FrameFeed {
    pub fn push(&self, luma: Vec<u8>) {
        self.0.lock().expect("frame feed poisoned").push_back(luma);
    }
}

impl ScriptedCamera {
    pub fn new() -> Self {
        Self {
            frames: Arc::new(Mutex::new(VecDeque::new())),
            last_frame: None,
            log: Arc::new(Mutex::new(Vec::new())),
            faults: FaultHandle::default(),
        }
    }

    pub fn command_log(&self) -> CommandLog {
        Arc::clone(&self.log)
    }

    pub fn frame_feed(&self) -> FrameFeed {
        FrameFeed(Arc::clone(&self.frames))
    }

    pub fn faults(&self) -> FaultHandle {
        self.faults.clone()
    }

    fn record(&self, command: CameraCommand) {
        self.log.lock().expect("command log poisoned").push(command);
    }

    fn next_frame(&mut self) -> Result<Vec<u8>, CameraError> {
        let popped = self
            .frames
            .lock()
            .expect("frame feed poisoned")
            .pop_front();
        if let Some(frame) = popped {
            self.last_frame = Some(frame.clone());
            return Ok(frame);
        }
        self.last_frame
            .clone()
            .ok_or_else(|| CameraError::new("scripted camera has no frames"))
    }
}

impl Default for ScriptedCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for ScriptedCamera {
    fn set_resolution(&mut self, width: u32, height: u32) -> Result<(), CameraError> {
        self.record(CameraCommand::SetResolution(width, height));
        Ok(())
    }

    fn set_framerate(&mut self, fps: u32) -> Result<(), CameraError> {
        self.record(CameraCommand::SetFramerate(fps));
        Ok(())
    }

    fn set_rotation(&mut self, degrees: u16) -> Result<(), CameraError> {
        self.record(CameraCommand::SetRotation(degrees));
        Ok(())
    }

    fn set_metering_mode(&mut self, mode: MeteringMode) -> Result<(), CameraError> {
        self.record(CameraCommand::SetMeteringMode(mode));
        Ok(())
    }

    fn capture_still(
        &mut self,
        resize_width: u32,
        resize_height: u32,
    ) -> Result<Vec<u8>, CameraError> {
        self.record(CameraCommand::CaptureStill(resize_width, resize_height));
        if self.faults.0.capture.load(Ordering::SeqCst) {
            return Err(CameraError::new("injected capture failure"));
        }
        let luma = self.next_frame()?;
        encode_luma_png(resize_width, resize_height, &luma)
    }

    fn clear_image_effect(&mut self) -> Result<(), CameraError> {
        self.record(CameraCommand::ClearImageEffect);
        Ok(())
    }

    fn set_exposure_profile(&mut self, profile: &ExposureProfile) -> Result<(), CameraError> {
        self.record(CameraCommand::SetExposureProfile(profile.clone()));
        Ok(())
    }

    fn start_recording(
        &mut self,
        path: &Path,
        resize_width: u32,
        resize_height: u32,
        quantization: u32,
        bitrate: u32,
    ) -> Result<(), CameraError> {
        self.record(CameraCommand::StartRecording {
            path: path.to_path_buf(),
            width: resize_width,
            height: resize_height,
            quantization,
            bitrate,
        });
        if self.faults.0.start.load(Ordering::SeqCst) {
            return Err(CameraError::new("injected start failure"));
        }
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), CameraError> {
        self.record(CameraCommand::StopRecording);
        if self.faults.0.stop.load(Ordering::SeqCst) {
            return Err(CameraError::new("injected stop failure"));
        }
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), CameraError> {
        self.record(CameraCommand::StartPreview);
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), CameraError> {
        self.record(CameraCommand::StopPreview);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_camera_replays_frames_and_logs_commands() {
        let mut camera = ScriptedCamera::new();
        let feed = camera.frame_feed();
        let log = camera.command_log();

        feed.push(vec![10u8; 16]);
        let png = camera.capture_still(4, 4).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_luma8();
        assert_eq!(decoded.as_raw(), &vec![10u8; 16]);

        // Queue empty: last frame repeats.
        let png = camera.capture_still(4, 4).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_luma8();
        assert_eq!(decoded.as_raw(), &vec![10u8; 16]);

        let log = log.lock().unwrap();
        assert_eq!(
            log.as_slice(),
            &[
                CameraCommand::CaptureStill(4, 4),
                CameraCommand::CaptureStill(4, 4)
            ]
        );
    }

    #[test]
    fn scripted_camera_injects_faults() {
        let mut camera = ScriptedCamera::new();
        let faults = camera.faults();
        camera.frame_feed().push(vec![0u8; 16]);

        faults.fail_capture(true);
        assert!(camera.capture_still(4, 4).is_err());

        faults.fail_capture(false);
        assert!(camera.capture_still(4, 4).is_ok());
    }

    #[test]
    fn synthetic_camera_scene_eventually_moves() {
        let mut camera = SyntheticCamera::new();
        let first = camera.capture_still(96, 72).unwrap();
        let mut changed = false;
        for _ in 0..40 {
            let next = camera.capture_still(96, 72).unwrap();
            if next != first {
                changed = true;
                break;
            }
        }
        assert!(changed, "synthetic scene never changed");
    }

    #[test]
    fn synthetic_camera_handles_tiny_test_grids() {
        let mut camera = SyntheticCamera::new();
        // Grids at and below the block size fall back to a static scene.
        for (w, h) in [(8, 8), (4, 4), (1, 1)] {
            for _ in 0..12 {
                let png = camera.capture_still(w, h).unwrap();
                let decoded = image::load_from_memory(&png).unwrap().to_luma8();
                assert!(decoded.as_raw().iter().all(|&v| v == 64));
            }
        }
    }

    #[test]
    fn scripted_frame_size_is_checked() {
        let mut camera = ScriptedCamera::new();
        camera.frame_feed().push(vec![0u8; 7]);
        assert!(camera.capture_still(4, 4).is_err());
    }
}
