//! Motion and recording controller.
//!
//! Owns the configuration, the two-frame history and the recording state
//! machine. Each tick samples a frame, compares it against the previous
//! one and decides whether to start or stop a video segment, subject to:
//!
//! - a skip-first flag that seeds the history after startup and after every
//!   stop, so a stale reference frame cannot fake motion;
//! - an allowed hour window (day gating: a pause, not a stop);
//! - a minimum-tail duration of no motion before an open segment closes;
//! - a night-mode parameter switch during the fixed dusk/dawn band.
//!
//! Single-threaded by construction: the controller owns the camera, the
//! storage collaborator and all mutable state exclusively.

use chrono::{Local, NaiveDateTime, Timelike};
use std::time::{Duration, Instant};

use crate::camera::{output_resolution, Camera, ExposureProfile, MeteringMode};
use crate::camera::{SENSOR_HEIGHT, SENSOR_WIDTH};
use crate::config::RecorderConfig;
use crate::detect::detect_motion;
use crate::error::{RecorderError, Result};
use crate::frame::FrameHistory;
use crate::sampler::FrameSampler;
use crate::storage::{derive_segment_paths, SegmentPaths, Storage};

/// Dusk/dawn band during which the night profile applies (when enabled).
/// Fixed policy, deliberately not configurable.
const NIGHT_BAND_START_HOUR: u32 = 20;
const NIGHT_BAND_END_HOUR: u32 = 5;

/// True when `hour` falls inside the dusk/dawn band.
pub fn is_night_hour(hour: u32) -> bool {
    hour >= NIGHT_BAND_START_HOUR || hour <= NIGHT_BAND_END_HOUR
}

/// What one tick did, for logging and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// First tick after startup or after a stop: the sample only seeded the
    /// frame history.
    Seeded,
    /// Current hour is outside the allowed window; nothing sampled.
    Paused,
    /// No motion, no transition.
    Quiet,
    /// Motion while already recording.
    MotionContinued,
    /// Idle -> Recording transition happened.
    RecordingStarted,
    /// Recording -> Idle transition happened.
    RecordingStopped,
}

/// An in-progress video segment.
#[derive(Debug)]
struct Session {
    paths: SegmentPaths,
    night_mode: bool,
    started_at: NaiveDateTime,
}

#[derive(Debug)]
enum RecorderState {
    Idle,
    Recording(Session),
}

/// The motion-triggered recording state machine.
pub struct MotionController<C: Camera, S: Storage> {
    config: RecorderConfig,
    camera: C,
    storage: S,
    sampler: FrameSampler,
    history: FrameHistory,
    state: RecorderState,
    /// Suppresses detection on the next evaluated tick; set at construction
    /// and re-armed after every stop.
    seed_next: bool,
    /// Accumulated wall-clock time since motion was last detected.
    idle_clock: Duration,
    last_tick: Option<Instant>,
}

impl<C: Camera, S: Storage> MotionController<C, S> {
    /// Validate the configuration and perform one-time camera setup.
    pub fn new(config: RecorderConfig, mut camera: C, storage: S) -> Result<Self> {
        config.validate()?;

        camera
            .set_resolution(SENSOR_WIDTH, SENSOR_HEIGHT)
            .map_err(RecorderError::Setup)?;
        camera
            .set_framerate(config.camera.framerate)
            .map_err(RecorderError::Setup)?;
        camera
            .set_rotation(config.camera.rotation)
            .map_err(RecorderError::Setup)?;
        camera
            .set_metering_mode(MeteringMode::Average)
            .map_err(RecorderError::Setup)?;

        let sampler = FrameSampler::new(config.detect.test_width, config.detect.test_height);
        Ok(Self {
            config,
            camera,
            storage,
            sampler,
            history: FrameHistory::new(),
            state: RecorderState::Idle,
            seed_next: true,
            idle_clock: Duration::ZERO,
            last_tick: None,
        })
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecorderState::Recording(_))
    }

    /// Accumulated no-motion time.
    pub fn idle_for(&self) -> Duration {
        self.idle_clock
    }

    pub fn start_preview(&mut self) -> Result<()> {
        self.camera.start_preview().map_err(RecorderError::Setup)
    }

    pub fn stop_preview(&mut self) -> Result<()> {
        self.camera.stop_preview().map_err(RecorderError::Setup)
    }

    /// One scheduled iteration, using real wall-clock time.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let elapsed = self
            .last_tick
            .map(|at| at.elapsed())
            .unwrap_or(Duration::ZERO);
        self.last_tick = Some(Instant::now());
        self.tick_at(Local::now().naive_local(), elapsed)
    }

    /// One iteration at an injected point in time.
    ///
    /// `elapsed` is the real time since the previous tick; it feeds the
    /// activity clock on no-motion ticks. Tests drive this directly so no
    /// real time has to pass.
    pub fn tick_at(&mut self, now: NaiveDateTime, elapsed: Duration) -> Result<TickOutcome> {
        if self.seed_next {
            let frame = self.sampler.sample(&mut self.camera)?;
            self.history.clear();
            self.history.push(frame);
            self.seed_next = false;
            log::debug!("seeded frame history, detection resumes next tick");
            return Ok(TickOutcome::Seeded);
        }

        let hour = now.hour();
        if hour < self.config.policy.timer_start || hour >= self.config.policy.timer_stop {
            log::debug!(
                "hour {} outside allowed window [{}, {}), pausing",
                hour,
                self.config.policy.timer_start,
                self.config.policy.timer_stop
            );
            return Ok(TickOutcome::Paused);
        }

        let frame = self.sampler.sample(&mut self.camera)?;
        self.history.push(frame);
        let Some((previous, current)) = self.history.pair() else {
            // History lost its reference frame; treat this sample as a seed.
            return Ok(TickOutcome::Seeded);
        };

        let motion = detect_motion(
            previous,
            current,
            self.config.detect.region,
            self.config.detect.threshold,
            self.config.detect.sensitivity,
        );

        if motion {
            self.idle_clock = Duration::ZERO;
            if self.is_recording() {
                return Ok(TickOutcome::MotionContinued);
            }
            self.begin_session(now)?;
            Ok(TickOutcome::RecordingStarted)
        } else {
            self.idle_clock += elapsed;
            if self.is_recording() && self.idle_clock > self.config.policy.minimum_tail {
                self.end_session()?;
                return Ok(TickOutcome::RecordingStopped);
            }
            Ok(TickOutcome::Quiet)
        }
    }

    /// Stop any in-progress recording; no-op when idle.
    ///
    /// This is the interrupt-triggered path: it runs outside the tick
    /// cadence and must finalize the open segment before the camera is
    /// released.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.is_recording() {
            self.end_session()?;
        }
        Ok(())
    }

    /// Idle -> Recording.
    fn begin_session(&mut self, now: NaiveDateTime) -> Result<()> {
        let output = &self.config.output;
        let paths = derive_segment_paths(&output.root, &output.prefix, output.date_folders, now);
        if let Some(parent) = paths.raw.parent() {
            self.storage
                .ensure_directory(parent)
                .map_err(|source| RecorderError::Storage {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let night = self.config.policy.night_mode && is_night_hour(now.hour());
        let profile = if night {
            ExposureProfile::night()
        } else {
            ExposureProfile::day()
        };
        let scale_down = if night {
            self.config.video.night_scale_down
        } else {
            self.config.video.day_scale_down
        };
        let (width, height) = output_resolution(scale_down);

        self.camera
            .set_exposure_profile(&profile)
            .map_err(RecorderError::RecordingStart)?;
        self.camera
            .start_recording(
                &paths.raw,
                width,
                height,
                self.config.video.quantization,
                self.config.video.bitrate,
            )
            .map_err(RecorderError::RecordingStart)?;

        log::info!(
            "recording started: {} ({}x{}, night={})",
            paths.raw.display(),
            width,
            height,
            night
        );
        self.state = RecorderState::Recording(Session {
            paths,
            night_mode: night,
            started_at: now,
        });
        Ok(())
    }

    /// Recording -> Idle.
    ///
    /// The state flips to Idle and the skip-first flag re-arms before the
    /// camera is instructed, so a failed stop cannot wedge the state
    /// machine.
    fn end_session(&mut self) -> Result<()> {
        let RecorderState::Recording(session) =
            std::mem::replace(&mut self.state, RecorderState::Idle)
        else {
            return Ok(());
        };
        self.seed_next = true;
        self.idle_clock = Duration::ZERO;

        self.camera
            .stop_recording()
            .map_err(RecorderError::RecordingStop)?;
        log::info!(
            "recording stopped: {} (night={}, started {})",
            session.paths.raw.display(),
            session.night_mode,
            session.started_at
        );

        if self.config.output.post_process {
            self.storage
                .transcode(
                    &session.paths.raw,
                    &session.paths.container,
                    self.config.camera.framerate,
                )
                .map_err(|source| RecorderError::Storage {
                    path: session.paths.container.clone(),
                    source,
                })?;
            self.storage
                .delete_file(&session.paths.raw)
                .map_err(|source| RecorderError::Storage {
                    path: session.paths.raw.clone(),
                    source,
                })?;
            log::info!("packaged {}", session.paths.container.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn night_band_is_twenty_to_five() {
        for hour in [20, 21, 22, 23, 0, 1, 2, 3, 4, 5] {
            assert!(is_night_hour(hour), "hour {hour} should be night");
        }
        for hour in 6..20 {
            assert!(!is_night_hour(hour), "hour {hour} should be day");
        }
    }
}
