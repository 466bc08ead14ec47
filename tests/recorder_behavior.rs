//! End-to-end behavior of the motion/recording state machine, driven over a
//! scripted camera and in-memory storage with injected time.

use chrono::{NaiveDate, NaiveDateTime};
use std::path::PathBuf;
use std::time::Duration;

use motion_sentry::camera::{CameraCommand, CommandLog, ExposureProfile, ScriptedCamera};
use motion_sentry::storage::{StorageOp, StorageOpLog};
use motion_sentry::{
    MemoryStorage, MotionController, RecorderConfig, RecorderError, TickOutcome,
};

const W: u32 = 96;
const H: u32 = 72;

fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 8, 27)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap()
}

fn flat(value: u8) -> Vec<u8> {
    vec![value; (W * H) as usize]
}

/// Flat frame with a 6x6 block (36 pixels) raised well past the threshold.
fn with_motion(base: u8) -> Vec<u8> {
    let mut luma = flat(base);
    for y in 30..36 {
        for x in 10..16 {
            luma[(y * W + x) as usize] = base.saturating_add(100);
        }
    }
    luma
}

struct Rig {
    controller: MotionController<ScriptedCamera, MemoryStorage>,
    feed: motion_sentry::camera::FrameFeed,
    camera_faults: motion_sentry::camera::FaultHandle,
    storage_faults: motion_sentry::storage::StorageFaultHandle,
    commands: CommandLog,
    ops: StorageOpLog,
}

fn rig(configure: impl FnOnce(&mut RecorderConfig)) -> Rig {
    let mut config = RecorderConfig::default();
    config.output.root = PathBuf::from("/srv/video");
    config.output.prefix = "cam-".to_string();
    configure(&mut config);

    let camera = ScriptedCamera::new();
    let feed = camera.frame_feed();
    let camera_faults = camera.faults();
    let commands = camera.command_log();

    let storage = MemoryStorage::new();
    let storage_faults = storage.faults();
    let ops = storage.op_log();

    let controller = MotionController::new(config, camera, storage).unwrap();
    Rig {
        controller,
        feed,
        camera_faults,
        storage_faults,
        commands,
        ops,
    }
}

fn count_starts(commands: &CommandLog) -> usize {
    commands
        .lock()
        .unwrap()
        .iter()
        .filter(|c| matches!(c, CameraCommand::StartRecording { .. }))
        .count()
}

fn count_stops(commands: &CommandLog) -> usize {
    commands
        .lock()
        .unwrap()
        .iter()
        .filter(|c| matches!(c, CameraCommand::StopRecording))
        .count()
}

fn count_captures(commands: &CommandLog) -> usize {
    commands
        .lock()
        .unwrap()
        .iter()
        .filter(|c| matches!(c, CameraCommand::CaptureStill(..)))
        .count()
}

#[test]
fn first_tick_only_seeds_regardless_of_content() {
    let mut rig = rig(|_| {});
    rig.feed.push(with_motion(0));

    let outcome = rig
        .controller
        .tick_at(at(12, 0, 0), Duration::ZERO)
        .unwrap();
    assert_eq!(outcome, TickOutcome::Seeded);
    assert!(!rig.controller.is_recording());
    assert_eq!(count_starts(&rig.commands), 0);
    assert_eq!(count_captures(&rig.commands), 1);
}

#[test]
fn motion_from_idle_starts_exactly_one_recording() {
    let mut rig = rig(|_| {});
    rig.feed.push(flat(50));
    rig.feed.push(with_motion(50));

    rig.controller
        .tick_at(at(12, 0, 0), Duration::ZERO)
        .unwrap();
    let outcome = rig
        .controller
        .tick_at(at(12, 0, 0), Duration::from_millis(500))
        .unwrap();

    assert_eq!(outcome, TickOutcome::RecordingStarted);
    assert!(rig.controller.is_recording());
    assert_eq!(count_starts(&rig.commands), 1);
    assert_eq!(rig.controller.idle_for(), Duration::ZERO);
}

#[test]
fn motion_while_recording_continues_without_new_start() {
    let mut rig = rig(|_| {});
    rig.feed.push(flat(50));
    rig.feed.push(with_motion(50));
    rig.feed.push(flat(50)); // block disappears: another big change

    rig.controller
        .tick_at(at(12, 0, 0), Duration::ZERO)
        .unwrap();
    rig.controller
        .tick_at(at(12, 0, 0), Duration::from_millis(500))
        .unwrap();
    let outcome = rig
        .controller
        .tick_at(at(12, 0, 1), Duration::from_millis(500))
        .unwrap();

    assert_eq!(outcome, TickOutcome::MotionContinued);
    assert_eq!(count_starts(&rig.commands), 1);
}

#[test]
fn recording_stops_only_after_the_minimum_tail() {
    let mut rig = rig(|cfg| {
        cfg.policy.minimum_tail = Duration::from_secs(10);
    });
    rig.feed.push(flat(50));
    rig.feed.push(with_motion(50));
    // Queue runs dry afterwards: the motion frame repeats, a static scene.

    rig.controller
        .tick_at(at(12, 0, 0), Duration::ZERO)
        .unwrap();
    rig.controller
        .tick_at(at(12, 0, 0), Duration::from_millis(500))
        .unwrap();
    assert!(rig.controller.is_recording());

    // 9.9 s of quiet: still recording.
    for _ in 0..3 {
        let outcome = rig
            .controller
            .tick_at(at(12, 0, 5), Duration::from_secs_f64(3.3))
            .unwrap();
        assert_eq!(outcome, TickOutcome::Quiet);
    }
    assert!(rig.controller.is_recording());
    assert_eq!(rig.controller.idle_for(), Duration::from_secs_f64(9.9));

    // 10.1 s total: exactly one stop.
    let outcome = rig
        .controller
        .tick_at(at(12, 0, 15), Duration::from_secs_f64(0.2))
        .unwrap();
    assert_eq!(outcome, TickOutcome::RecordingStopped);
    assert!(!rig.controller.is_recording());
    assert_eq!(count_stops(&rig.commands), 1);
}

#[test]
fn stop_rearms_the_seeding_flag() {
    let mut rig = rig(|cfg| {
        cfg.policy.minimum_tail = Duration::from_secs(1);
    });
    rig.feed.push(flat(50));
    rig.feed.push(with_motion(50));

    rig.controller
        .tick_at(at(12, 0, 0), Duration::ZERO)
        .unwrap();
    rig.controller
        .tick_at(at(12, 0, 0), Duration::from_millis(500))
        .unwrap();
    rig.controller
        .tick_at(at(12, 0, 5), Duration::from_secs(2))
        .unwrap();
    assert!(!rig.controller.is_recording());

    // Post-stop frame is wildly different; it must only seed.
    rig.feed.push(flat(255));
    let outcome = rig
        .controller
        .tick_at(at(12, 0, 6), Duration::from_millis(500))
        .unwrap();
    assert_eq!(outcome, TickOutcome::Seeded);
    assert_eq!(count_starts(&rig.commands), 1);
}

#[test]
fn hours_outside_the_window_pause_without_sampling() {
    let mut rig = rig(|cfg| {
        cfg.policy.timer_start = 8;
        cfg.policy.timer_stop = 20;
    });
    rig.feed.push(flat(50));

    // Seeding happens even outside the window.
    rig.controller.tick_at(at(6, 0, 0), Duration::ZERO).unwrap();
    assert_eq!(count_captures(&rig.commands), 1);

    let outcome = rig
        .controller
        .tick_at(at(6, 0, 1), Duration::from_millis(500))
        .unwrap();
    assert_eq!(outcome, TickOutcome::Paused);
    assert_eq!(count_captures(&rig.commands), 1);

    // The stop hour itself is outside the half-open window.
    let outcome = rig
        .controller
        .tick_at(at(20, 0, 0), Duration::from_millis(500))
        .unwrap();
    assert_eq!(outcome, TickOutcome::Paused);

    // Inside the window sampling resumes.
    rig.feed.push(flat(50));
    let outcome = rig
        .controller
        .tick_at(at(8, 0, 0), Duration::from_millis(500))
        .unwrap();
    assert_eq!(outcome, TickOutcome::Quiet);
    assert_eq!(count_captures(&rig.commands), 2);
}

#[test]
fn night_band_selects_the_night_profile_and_geometry() {
    let mut rig = rig(|cfg| {
        cfg.policy.night_mode = true;
        cfg.video.day_scale_down = 2;
        cfg.video.night_scale_down = 4;
    });
    rig.feed.push(flat(50));
    rig.feed.push(with_motion(50));

    rig.controller
        .tick_at(at(21, 0, 0), Duration::ZERO)
        .unwrap();
    rig.controller
        .tick_at(at(21, 0, 0), Duration::from_millis(500))
        .unwrap();

    let commands = rig.commands.lock().unwrap();
    assert!(commands
        .iter()
        .any(|c| *c == CameraCommand::SetExposureProfile(ExposureProfile::night())));
    assert!(commands.iter().any(|c| matches!(
        c,
        CameraCommand::StartRecording {
            width: 648,
            height: 486,
            ..
        }
    )));
}

#[test]
fn daytime_or_disabled_night_mode_uses_the_day_profile() {
    // Night hour, but night mode disabled.
    let mut disabled_rig = rig(|cfg| {
        cfg.policy.night_mode = false;
    });
    disabled_rig.feed.push(flat(50));
    disabled_rig.feed.push(with_motion(50));
    disabled_rig
        .controller
        .tick_at(at(21, 0, 0), Duration::ZERO)
        .unwrap();
    disabled_rig
        .controller
        .tick_at(at(21, 0, 0), Duration::from_millis(500))
        .unwrap();
    {
        let commands = disabled_rig.commands.lock().unwrap();
        assert!(commands
            .iter()
            .any(|c| *c == CameraCommand::SetExposureProfile(ExposureProfile::day())));
    }

    // Night mode enabled, but daytime hour.
    let mut day_rig = rig(|cfg| {
        cfg.policy.night_mode = true;
    });
    day_rig.feed.push(flat(50));
    day_rig.feed.push(with_motion(50));
    day_rig
        .controller
        .tick_at(at(12, 0, 0), Duration::ZERO)
        .unwrap();
    day_rig
        .controller
        .tick_at(at(12, 0, 0), Duration::from_millis(500))
        .unwrap();
    let commands = day_rig.commands.lock().unwrap();
    assert!(commands
        .iter()
        .any(|c| *c == CameraCommand::SetExposureProfile(ExposureProfile::day())));
    assert!(commands.iter().any(|c| matches!(
        c,
        CameraCommand::StartRecording {
            width: 1296,
            height: 972,
            ..
        }
    )));
}

#[test]
fn date_foldered_segment_path_is_used_for_the_start() {
    let mut rig = rig(|cfg| {
        cfg.output.date_folders = true;
    });
    rig.feed.push(flat(50));
    rig.feed.push(with_motion(50));

    rig.controller
        .tick_at(at(14, 30, 9), Duration::ZERO)
        .unwrap();
    rig.controller
        .tick_at(at(14, 30, 9), Duration::from_millis(500))
        .unwrap();

    let ops = rig.ops.lock().unwrap();
    assert_eq!(
        ops[0],
        StorageOp::EnsureDirectory(PathBuf::from("/srv/video/2026/08/27"))
    );
    let commands = rig.commands.lock().unwrap();
    assert!(commands.iter().any(|c| matches!(
        c,
        CameraCommand::StartRecording { path, .. }
        if path == &PathBuf::from("/srv/video/2026/08/27/cam-14-30-09.h264")
    )));
}

#[test]
fn storage_failure_aborts_the_start_and_the_next_tick_retries() {
    let mut rig = rig(|_| {});
    rig.feed.push(flat(50));
    rig.feed.push(with_motion(50));
    rig.feed.push(flat(50)); // still moving on the retry tick

    rig.controller
        .tick_at(at(12, 0, 0), Duration::ZERO)
        .unwrap();

    rig.storage_faults.fail_ensure_directory(true);
    let err = rig
        .controller
        .tick_at(at(12, 0, 0), Duration::from_millis(500))
        .unwrap_err();
    assert!(matches!(err, RecorderError::Storage { .. }));
    assert!(!rig.controller.is_recording());
    assert_eq!(count_starts(&rig.commands), 0);

    rig.storage_faults.fail_ensure_directory(false);
    let outcome = rig
        .controller
        .tick_at(at(12, 0, 1), Duration::from_millis(500))
        .unwrap();
    assert_eq!(outcome, TickOutcome::RecordingStarted);
    assert_eq!(count_starts(&rig.commands), 1);
}

#[test]
fn capture_failure_is_fatal_for_the_tick_only() {
    let mut rig = rig(|_| {});
    rig.feed.push(flat(50));

    rig.controller
        .tick_at(at(12, 0, 0), Duration::ZERO)
        .unwrap();

    rig.camera_faults.fail_capture(true);
    let err = rig
        .controller
        .tick_at(at(12, 0, 0), Duration::from_millis(500))
        .unwrap_err();
    assert!(matches!(err, RecorderError::Capture(_)));
    assert!(!rig.controller.is_recording());

    rig.camera_faults.fail_capture(false);
    rig.feed.push(flat(50));
    let outcome = rig
        .controller
        .tick_at(at(12, 0, 1), Duration::from_millis(500))
        .unwrap();
    assert_eq!(outcome, TickOutcome::Quiet);
}

#[test]
fn shutdown_when_idle_issues_no_stop() {
    let mut rig = rig(|_| {});
    rig.feed.push(flat(50));
    rig.controller
        .tick_at(at(12, 0, 0), Duration::ZERO)
        .unwrap();

    rig.controller.shutdown().unwrap();
    assert_eq!(count_stops(&rig.commands), 0);
}

#[test]
fn shutdown_finalizes_an_open_recording() {
    let mut rig = rig(|_| {});
    rig.feed.push(flat(50));
    rig.feed.push(with_motion(50));
    rig.controller
        .tick_at(at(12, 0, 0), Duration::ZERO)
        .unwrap();
    rig.controller
        .tick_at(at(12, 0, 0), Duration::from_millis(500))
        .unwrap();
    assert!(rig.controller.is_recording());

    rig.controller.shutdown().unwrap();
    assert!(!rig.controller.is_recording());
    assert_eq!(count_stops(&rig.commands), 1);

    // Second shutdown is a no-op.
    rig.controller.shutdown().unwrap();
    assert_eq!(count_stops(&rig.commands), 1);
}

#[test]
fn a_failed_stop_still_leaves_the_machine_idle() {
    let mut rig = rig(|_| {});
    rig.feed.push(flat(50));
    rig.feed.push(with_motion(50));
    rig.controller
        .tick_at(at(12, 0, 0), Duration::ZERO)
        .unwrap();
    rig.controller
        .tick_at(at(12, 0, 0), Duration::from_millis(500))
        .unwrap();

    rig.camera_faults.fail_stop(true);
    let err = rig.controller.shutdown().unwrap_err();
    assert!(matches!(err, RecorderError::RecordingStop(_)));
    assert!(!rig.controller.is_recording());

    // Retrying shutdown no longer touches the camera.
    rig.camera_faults.fail_stop(false);
    rig.controller.shutdown().unwrap();
    assert_eq!(count_stops(&rig.commands), 1);
}

#[test]
fn post_processing_transcodes_then_deletes_the_raw_file() {
    let mut rig = rig(|cfg| {
        cfg.output.post_process = true;
        cfg.output.date_folders = false;
        cfg.policy.minimum_tail = Duration::from_secs(1);
        cfg.camera.framerate = 15;
    });
    rig.feed.push(flat(50));
    rig.feed.push(with_motion(50));

    rig.controller
        .tick_at(at(9, 15, 0), Duration::ZERO)
        .unwrap();
    rig.controller
        .tick_at(at(9, 15, 0), Duration::from_millis(500))
        .unwrap();
    rig.controller
        .tick_at(at(9, 15, 5), Duration::from_secs(2))
        .unwrap();

    let raw = PathBuf::from("/srv/video/cam-20260827-091500.h264");
    let container = PathBuf::from("/srv/video/cam-20260827-091500.mp4");
    let ops = rig.ops.lock().unwrap();
    assert_eq!(
        ops.as_slice(),
        &[
            StorageOp::EnsureDirectory(PathBuf::from("/srv/video")),
            StorageOp::Transcode {
                source: raw.clone(),
                dest: container,
                framerate: 15,
            },
            StorageOp::DeleteFile(raw),
        ]
    );
}

#[test]
fn without_post_processing_the_raw_file_is_left_in_place() {
    let mut rig = rig(|cfg| {
        cfg.output.post_process = false;
        cfg.policy.minimum_tail = Duration::from_secs(1);
    });
    rig.feed.push(flat(50));
    rig.feed.push(with_motion(50));

    rig.controller
        .tick_at(at(9, 15, 0), Duration::ZERO)
        .unwrap();
    rig.controller
        .tick_at(at(9, 15, 0), Duration::from_millis(500))
        .unwrap();
    rig.controller
        .tick_at(at(9, 15, 5), Duration::from_secs(2))
        .unwrap();

    let ops = rig.ops.lock().unwrap();
    assert!(ops
        .iter()
        .all(|op| matches!(op, StorageOp::EnsureDirectory(_))));
}
