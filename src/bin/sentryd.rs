//! sentryd - motion-triggered recording daemon
//!
//! This daemon:
//! 1. Loads and validates the recorder configuration
//! 2. Opens the configured camera driver and performs one-time setup
//! 3. Samples low-resolution stills on a fixed cadence
//! 4. Starts/stops full-resolution segments from the motion state machine
//! 5. On interrupt, finalizes any open recording before releasing the camera

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use motion_sentry::{
    LocalStorage, MotionController, RecorderConfig, Scheduler, SyntheticCamera,
};

/// Camera warm-up before the first sample; the sensor needs time to settle
/// on exposure.
const WARM_UP: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "sentryd", version, about = "motion-triggered video recorder")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "SENTRY_CONFIG")]
    config: Option<PathBuf>,

    /// Show the camera preview window while running.
    #[arg(long)]
    preview: bool,

    /// Exit after this many ticks (smoke-testing aid).
    #[arg(long)]
    ticks: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = RecorderConfig::load(args.config.as_deref())?;

    log::info!(
        "sentryd {} starting (driver={}, test grid {}x{}, interval {:.1}s)",
        env!("CARGO_PKG_VERSION"),
        cfg.camera.driver,
        cfg.detect.test_width,
        cfg.detect.test_height,
        cfg.detect.interval.as_secs_f64()
    );
    log::info!(
        "output root {} (date_folders={}, post_process={}), allowed hours [{}, {}), night_mode={}",
        cfg.output.root.display(),
        cfg.output.date_folders,
        cfg.output.post_process,
        cfg.policy.timer_start,
        cfg.policy.timer_stop,
        cfg.policy.night_mode
    );

    let camera = match cfg.camera.driver.as_str() {
        "stub" | "synthetic" => SyntheticCamera::new(),
        other => bail!("camera driver {other:?} is not built into this binary"),
    };

    let interval = cfg.detect.interval;
    let mut controller = MotionController::new(cfg, camera, LocalStorage::new())?;

    if args.preview {
        if let Err(e) = controller.start_preview() {
            log::warn!("preview unavailable: {e}");
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("interrupt received, finishing current segment");
        flag.store(false, Ordering::SeqCst);
    })?;

    log::info!("warming up camera...");
    std::thread::sleep(WARM_UP);
    log::info!("camera ready, watching for motion (Ctrl+C to stop)");

    let mut scheduler = Scheduler::new(interval, running);
    let result = scheduler.run(&mut controller, args.ticks);

    if args.preview {
        if let Err(e) = controller.stop_preview() {
            log::debug!("preview teardown: {e}");
        }
    }

    if let Err(e) = &result {
        // A failed shutdown stop must not keep the process alive; the
        // camera is released when the controller drops.
        log::error!("shutdown stop failed: {e}");
    }
    log::info!(
        "sentryd exiting after {} ticks ({} overruns)",
        scheduler.ticks(),
        scheduler.overruns()
    );
    result.map_err(Into::into)
}
