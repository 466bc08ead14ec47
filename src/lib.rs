//! Motion Sentry
//!
//! Continuous motion-triggered video recorder for a fixed camera. The
//! daemon samples low-resolution stills at a fixed cadence, compares
//! consecutive luminance grids over a configured region, and starts/stops
//! full-resolution video segments accordingly.
//!
//! # Architecture
//!
//! Two components, evaluated leaves-first:
//!
//! - **Frame sampler** (`sampler`): obtains a downsampled still from the
//!   camera collaborator and exposes it as a luminance grid. Pure data
//!   acquisition.
//! - **Motion & recording controller** (`controller`): owns the two-frame
//!   history and the Idle/Recording state machine, with minimum-tail,
//!   hour-window and night-mode policy.
//!
//! Everything that touches hardware or the filesystem is an injected
//! collaborator (`camera::Camera`, `storage::Storage`), so the core runs
//! single-threaded and is testable without real I/O.
//!
//! # Module Structure
//!
//! - `camera`: camera capability trait plus synthetic/scripted backends
//! - `config`: TOML + env configuration, validated at startup
//! - `frame`: luminance grids, detection region, two-slot history
//! - `detect`: pure per-pixel luminance-delta motion test
//! - `sampler`: still capture and decode
//! - `controller`: recording state machine and policy
//! - `storage`: output path policy, directory/transcode/delete collaborator
//! - `scheduler`: fixed-interval tick loop with shutdown handling

pub mod camera;
pub mod config;
pub mod controller;
pub mod detect;
pub mod error;
pub mod frame;
pub mod sampler;
pub mod scheduler;
pub mod storage;

pub use camera::{Camera, CameraError, ExposureProfile, ScriptedCamera, SyntheticCamera};
pub use config::RecorderConfig;
pub use controller::{is_night_hour, MotionController, TickOutcome};
pub use detect::{changed_pixels, detect_motion};
pub use error::{RecorderError, Result};
pub use frame::{Frame, FrameHistory, Region};
pub use sampler::FrameSampler;
pub use scheduler::Scheduler;
pub use storage::{derive_segment_paths, LocalStorage, MemoryStorage, SegmentPaths, Storage};
