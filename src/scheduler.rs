//! Fixed-interval tick scheduler.
//!
//! Drives `MotionController::tick()` on the configured cadence. Each cycle
//! measures how long the tick took and sleeps only the remainder, so slow
//! captures do not stretch the cadence more than they must. Per-tick
//! operational errors are logged and the loop proceeds to the next
//! scheduled tick; only the shutdown flag ends the loop, after which any
//! open recording is finalized.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::camera::Camera;
use crate::controller::MotionController;
use crate::error::Result;
use crate::storage::Storage;

pub struct Scheduler {
    interval: Duration,
    running: Arc<AtomicBool>,
    ticks: u64,
    overruns: u64,
}

impl Scheduler {
    /// `running` is the shutdown flag: the loop exits after the first tick
    /// boundary at which it reads false.
    pub fn new(interval: Duration, running: Arc<AtomicBool>) -> Self {
        Self {
            interval,
            running,
            ticks: 0,
            overruns: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks that took longer than the configured interval.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Run until the shutdown flag clears or `max_ticks` is reached, then
    /// gracefully stop any in-progress recording.
    pub fn run<C: Camera, S: Storage>(
        &mut self,
        controller: &mut MotionController<C, S>,
        max_ticks: Option<u64>,
    ) -> Result<()> {
        while self.running.load(Ordering::SeqCst) {
            if let Some(limit) = max_ticks {
                if self.ticks >= limit {
                    break;
                }
            }

            let cycle_start = Instant::now();
            match controller.tick() {
                Ok(outcome) => {
                    log::debug!("tick #{}: {:?}", self.ticks, outcome);
                }
                Err(e) => {
                    log::warn!("tick #{} failed: {e}", self.ticks);
                }
            }
            self.ticks += 1;

            let spent = cycle_start.elapsed();
            if spent < self.interval {
                std::thread::sleep(self.interval - spent);
            } else {
                self.overruns += 1;
            }
        }

        // Shutdown-triggered stop: must run even though it happens outside
        // the tick cadence, so the open segment is finalized before the
        // camera is released.
        controller.shutdown()
    }
}
