//! Recorder configuration.
//!
//! Configuration is immutable after startup: a TOML file layer is resolved
//! against built-in defaults, a small set of `SENTRY_*` environment
//! overrides is applied, and the result is validated before the loop
//! begins. Validation failures are fatal; the daemon must not start with an
//! out-of-range detection region or a non-positive interval.

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RecorderError, Result};
use crate::frame::Region;

const DEFAULT_CAMERA_DRIVER: &str = "stub";
const DEFAULT_FRAMERATE: u32 = 15;
const DEFAULT_ROTATION: u16 = 0;
const DEFAULT_QUANTIZATION: u32 = 25;
const DEFAULT_BITRATE: u32 = 15_000_000;
const DEFAULT_DAY_SCALE_DOWN: u32 = 2;
const DEFAULT_NIGHT_SCALE_DOWN: u32 = 4;
const DEFAULT_TEST_WIDTH: u32 = 96;
const DEFAULT_TEST_HEIGHT: u32 = 72;
const DEFAULT_THRESHOLD: u8 = 15;
const DEFAULT_SENSITIVITY: u32 = 25;
const DEFAULT_INTERVAL_SECS: f64 = 0.5;
const DEFAULT_MINIMUM_TAIL_SECS: f64 = 5.0;
const DEFAULT_TIMER_START: u32 = 0;
const DEFAULT_TIMER_STOP: u32 = 24;
const DEFAULT_OUTPUT_ROOT: &str = "/var/lib/motion-sentry";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    camera: Option<CameraFile>,
    video: Option<VideoFile>,
    detect: Option<DetectFile>,
    policy: Option<PolicyFile>,
    output: Option<OutputFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraFile {
    driver: Option<String>,
    framerate: Option<u32>,
    rotation: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct VideoFile {
    quantization: Option<u32>,
    bitrate: Option<u32>,
    day_scale_down: Option<u32>,
    night_scale_down: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectFile {
    test_width: Option<u32>,
    test_height: Option<u32>,
    threshold: Option<u8>,
    sensitivity: Option<u32>,
    interval_secs: Option<f64>,
    region: Option<Region>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PolicyFile {
    minimum_tail_secs: Option<f64>,
    timer_start: Option<u32>,
    timer_stop: Option<u32>,
    night_mode: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OutputFile {
    root: Option<PathBuf>,
    prefix: Option<String>,
    date_folders: Option<bool>,
    post_process: Option<bool>,
}

/// Resolved, validated recorder configuration.
#[derive(Clone, Debug)]
pub struct RecorderConfig {
    pub camera: CameraSettings,
    pub video: VideoSettings,
    pub detect: DetectSettings,
    pub policy: PolicySettings,
    pub output: OutputSettings,
}

#[derive(Clone, Debug)]
pub struct CameraSettings {
    pub driver: String,
    pub framerate: u32,
    pub rotation: u16,
}

#[derive(Clone, Debug)]
pub struct VideoSettings {
    pub quantization: u32,
    pub bitrate: u32,
    pub day_scale_down: u32,
    pub night_scale_down: u32,
}

#[derive(Clone, Debug)]
pub struct DetectSettings {
    pub test_width: u32,
    pub test_height: u32,
    pub threshold: u8,
    pub sensitivity: u32,
    pub interval: Duration,
    pub region: Region,
}

#[derive(Clone, Debug)]
pub struct PolicySettings {
    pub minimum_tail: Duration,
    /// Allowed hour window, half-open: ticks run while
    /// `timer_start <= hour < timer_stop`.
    pub timer_start: u32,
    pub timer_stop: u32,
    pub night_mode: bool,
}

#[derive(Clone, Debug)]
pub struct OutputSettings {
    pub root: PathBuf,
    pub prefix: String,
    pub date_folders: bool,
    pub post_process: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self::from_file(ConfigFile::default())
    }
}

impl RecorderConfig {
    /// Load from an optional TOML file, apply env overrides, validate.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => ConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ConfigFile) -> Self {
        let camera = file.camera.unwrap_or_default();
        let video = file.video.unwrap_or_default();
        let detect = file.detect.unwrap_or_default();
        let policy = file.policy.unwrap_or_default();
        let output = file.output.unwrap_or_default();

        let test_width = detect.test_width.unwrap_or(DEFAULT_TEST_WIDTH);
        let test_height = detect.test_height.unwrap_or(DEFAULT_TEST_HEIGHT);

        Self {
            camera: CameraSettings {
                driver: camera
                    .driver
                    .unwrap_or_else(|| DEFAULT_CAMERA_DRIVER.to_string()),
                framerate: camera.framerate.unwrap_or(DEFAULT_FRAMERATE),
                rotation: camera.rotation.unwrap_or(DEFAULT_ROTATION),
            },
            video: VideoSettings {
                quantization: video.quantization.unwrap_or(DEFAULT_QUANTIZATION),
                bitrate: video.bitrate.unwrap_or(DEFAULT_BITRATE),
                day_scale_down: video.day_scale_down.unwrap_or(DEFAULT_DAY_SCALE_DOWN),
                night_scale_down: video.night_scale_down.unwrap_or(DEFAULT_NIGHT_SCALE_DOWN),
            },
            detect: DetectSettings {
                test_width,
                test_height,
                threshold: detect.threshold.unwrap_or(DEFAULT_THRESHOLD),
                sensitivity: detect.sensitivity.unwrap_or(DEFAULT_SENSITIVITY),
                interval: Duration::from_secs_f64(
                    detect
                        .interval_secs
                        .unwrap_or(DEFAULT_INTERVAL_SECS)
                        .max(0.0),
                ),
                region: detect
                    .region
                    .unwrap_or_else(|| Region::full(test_width, test_height)),
            },
            policy: PolicySettings {
                minimum_tail: Duration::from_secs_f64(
                    policy
                        .minimum_tail_secs
                        .unwrap_or(DEFAULT_MINIMUM_TAIL_SECS)
                        .max(0.0),
                ),
                timer_start: policy.timer_start.unwrap_or(DEFAULT_TIMER_START),
                timer_stop: policy.timer_stop.unwrap_or(DEFAULT_TIMER_STOP),
                night_mode: policy.night_mode.unwrap_or(false),
            },
            output: OutputSettings {
                root: output
                    .root
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_ROOT)),
                prefix: output.prefix.unwrap_or_default(),
                date_folders: output.date_folders.unwrap_or(true),
                post_process: output.post_process.unwrap_or(false),
            },
        }
    }

    fn apply_env(&mut self) {
        if let Ok(driver) = std::env::var("SENTRY_CAMERA_DRIVER") {
            if !driver.trim().is_empty() {
                self.camera.driver = driver;
            }
        }
        if let Ok(root) = std::env::var("SENTRY_OUTPUT_ROOT") {
            if !root.trim().is_empty() {
                self.output.root = PathBuf::from(root);
            }
        }
        if let Ok(prefix) = std::env::var("SENTRY_PREFIX") {
            self.output.prefix = prefix;
        }
    }

    /// Validate startup invariants. Errors here abort before the loop runs.
    pub fn validate(&self) -> Result<()> {
        if self.detect.test_width == 0 || self.detect.test_height == 0 {
            return Err(RecorderError::Configuration(
                "test resolution must be non-zero on both axes".into(),
            ));
        }
        if self.detect.interval.is_zero() {
            return Err(RecorderError::Configuration(
                "detect.interval_secs must be positive".into(),
            ));
        }
        self.detect
            .region
            .validate_within(self.detect.test_width, self.detect.test_height)?;

        let region = self.detect.region;
        let region_area =
            u64::from(region.end_x - region.start_x) * u64::from(region.end_y - region.start_y);
        if u64::from(self.detect.sensitivity) >= region_area {
            return Err(RecorderError::Configuration(format!(
                "sensitivity {} can never be exceeded inside a {}-pixel region",
                self.detect.sensitivity, region_area
            )));
        }

        if self.policy.timer_start >= self.policy.timer_stop || self.policy.timer_stop > 24 {
            return Err(RecorderError::Configuration(format!(
                "allowed hour window [{}, {}) is not a valid range within 0..24",
                self.policy.timer_start, self.policy.timer_stop
            )));
        }

        if self.camera.framerate == 0 {
            return Err(RecorderError::Configuration(
                "camera.framerate must be positive".into(),
            ));
        }
        if self.video.day_scale_down == 0 || self.video.night_scale_down == 0 {
            return Err(RecorderError::Configuration(
                "video scale-down factors must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> anyhow::Result<ConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let cfg = toml::from_str(&raw)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(cfg)
}
