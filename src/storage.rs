//! Filesystem/process collaborator and output path policy.
//!
//! The recorder core never touches the filesystem directly: directory
//! creation, mp4 transcoding and raw-file cleanup go through the `Storage`
//! trait. `LocalStorage` is the production implementation (std::fs plus an
//! external ffmpeg invocation); `MemoryStorage` records operations for
//! tests.

use chrono::{Datelike, NaiveDateTime, Timelike};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Extension of the raw codec stream written by the camera.
pub const RAW_EXTENSION: &str = "h264";
/// Extension of the post-processed container.
pub const CONTAINER_EXTENSION: &str = "mp4";

/// Output file pair for one recording session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentPaths {
    /// Raw codec stream the camera records into.
    pub raw: PathBuf,
    /// Sibling container file produced when post-processing is enabled.
    pub container: PathBuf,
}

/// Derive the output paths for a segment starting at `now`.
///
/// With date foldering: `<root>/<YYYY>/<MM>/<DD>/<prefix><HH-MM-SS>.h264`.
/// Without: `<root>/<prefix><YYYYMMDD-HHMMSS>.h264` flat under the root.
pub fn derive_segment_paths(
    root: &Path,
    prefix: &str,
    date_folders: bool,
    now: NaiveDateTime,
) -> SegmentPaths {
    let raw = if date_folders {
        root.join(format!("{:04}", now.year()))
            .join(format!("{:02}", now.month()))
            .join(format!("{:02}", now.day()))
            .join(format!(
                "{prefix}{:02}-{:02}-{:02}.{RAW_EXTENSION}",
                now.hour(),
                now.minute(),
                now.second()
            ))
    } else {
        root.join(format!(
            "{prefix}{:04}{:02}{:02}-{:02}{:02}{:02}.{RAW_EXTENSION}",
            now.year(),
            now.month(),
            now.day(),
            now.hour(),
            now.minute(),
            now.second()
        ))
    };
    let container = raw.with_extension(CONTAINER_EXTENSION);
    SegmentPaths { raw, container }
}

// ----------------------------------------------------------------------------
// Storage trait
// ----------------------------------------------------------------------------

/// Filesystem/process capability set consumed by the core.
pub trait Storage {
    /// Create `path` and any missing parents.
    fn ensure_directory(&mut self, path: &Path) -> io::Result<()>;

    /// Repackage a raw codec stream into a container at the given framerate.
    fn transcode(&mut self, source: &Path, dest: &Path, framerate: u32) -> io::Result<()>;

    /// Remove a file.
    fn delete_file(&mut self, path: &Path) -> io::Result<()>;
}

// ----------------------------------------------------------------------------
// LocalStorage
// ----------------------------------------------------------------------------

/// Production storage: std::fs for directories and deletion, external
/// ffmpeg (stream copy, no re-encode) for the mp4 container.
#[derive(Debug, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for LocalStorage {
    fn ensure_directory(&mut self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn transcode(&mut self, source: &Path, dest: &Path, framerate: u32) -> io::Result<()> {
        let status = Command::new("ffmpeg")
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-framerate")
            .arg(framerate.to_string())
            .arg("-i")
            .arg(source)
            .arg("-c")
            .arg("copy")
            .arg(dest)
            .status()?;
        if !status.success() {
            return Err(io::Error::other(format!(
                "ffmpeg exited with {status} while packaging {}",
                source.display()
            )));
        }
        Ok(())
    }

    fn delete_file(&mut self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

// ----------------------------------------------------------------------------
// MemoryStorage
// ----------------------------------------------------------------------------

/// Storage operations recorded by `MemoryStorage`, in issue order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageOp {
    EnsureDirectory(PathBuf),
    Transcode {
        source: PathBuf,
        dest: PathBuf,
        framerate: u32,
    },
    DeleteFile(PathBuf),
}

/// Shared operation log handle.
pub type StorageOpLog = Arc<Mutex<Vec<StorageOp>>>;

/// In-memory storage double for tests: records every operation and can be
/// told to fail directory creation.
#[derive(Default)]
pub struct MemoryStorage {
    ops: StorageOpLog,
    fail_ensure: Arc<AtomicBool>,
}

/// Fault-injection handle for a `MemoryStorage`.
#[derive(Clone, Default)]
pub struct StorageFaultHandle(Arc<AtomicBool>);

impl StorageFaultHandle {
    pub fn fail_ensure_directory(&self, fail: bool) {
        self.0.store(fail, Ordering::SeqCst);
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn op_log(&self) -> StorageOpLog {
        Arc::clone(&self.ops)
    }

    pub fn faults(&self) -> StorageFaultHandle {
        StorageFaultHandle(Arc::clone(&self.fail_ensure))
    }

    fn record(&self, op: StorageOp) {
        self.ops.lock().expect("storage op log poisoned").push(op);
    }
}

impl Storage for MemoryStorage {
    fn ensure_directory(&mut self, path: &Path) -> io::Result<()> {
        self.record(StorageOp::EnsureDirectory(path.to_path_buf()));
        if self.fail_ensure.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected directory failure",
            ));
        }
        Ok(())
    }

    fn transcode(&mut self, source: &Path, dest: &Path, framerate: u32) -> io::Result<()> {
        self.record(StorageOp::Transcode {
            source: source.to_path_buf(),
            dest: dest.to_path_buf(),
            framerate,
        });
        Ok(())
    }

    fn delete_file(&mut self, path: &Path) -> io::Result<()> {
        self.record(StorageOp::DeleteFile(path.to_path_buf()));
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
