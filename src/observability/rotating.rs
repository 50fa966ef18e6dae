//! Size-bounded rotating log file.
//!
//! # Responsibilities
//! - Own one append-mode file handle per log stream
//! - Track the size of the active file
//! - Roll the active file over to numbered backups before it overflows
//! - Enforce the retention cap on backups
//!
//! # Backup Layout
//! ```text
//! sys.log      active file
//! sys.log.1    newest backup
//! sys.log.N    oldest backup (N = max_backups), discarded on next rotation
//! ```
//!
//! # Design Decisions
//! - Write and rotate share one mutex: no writer observes a half-rotated file
//! - A record is never split across files, even if it alone exceeds the limit
//! - Filesystem errors are returned to the caller and leave the handle unusable

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::logging::{LogError, LogSink};

/// Default size at which a log file is rotated (1 GiB).
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 1024 * 1024 * 1024;

/// Default number of rotated generations kept on disk.
pub const DEFAULT_MAX_BACKUPS: usize = 1;

/// State guarded by the writer's mutex.
#[derive(Debug)]
struct Active {
    /// `None` once closed or after a fatal I/O error.
    file: Option<File>,
    /// Bytes currently in the active file.
    current_size: u64,
    /// Number of rotations since open.
    rotations: u64,
}

/// A log file that rolls over to numbered backups when it would exceed
/// `max_size_bytes`.
#[derive(Debug)]
pub struct RotatingFileWriter {
    path: PathBuf,
    max_size_bytes: u64,
    max_backups: usize,
    active: Mutex<Active>,
}

impl RotatingFileWriter {
    /// Open `path` for append, creating it and any missing parent directories.
    ///
    /// The size counter starts at the length of the existing file so a
    /// restarted process keeps honouring the limit.
    pub fn open(
        path: impl AsRef<Path>,
        max_size_bytes: u64,
        max_backups: usize,
    ) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        if max_size_bytes == 0 {
            return Err(LogError::InvalidLimit(path));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LogError::Open {
                path: path.clone(),
                source,
            })?;
        }

        let file = open_append(&path).map_err(|source| LogError::Open {
            path: path.clone(),
            source,
        })?;
        let current_size = file
            .metadata()
            .map_err(|source| LogError::Open {
                path: path.clone(),
                source,
            })?
            .len();

        Ok(Self {
            path,
            max_size_bytes,
            max_backups,
            active: Mutex::new(Active {
                file: Some(file),
                current_size,
                rotations: 0,
            }),
        })
    }

    /// Path of the active file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of backup generation `n` (1 = newest).
    pub fn backup_path(&self, n: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    /// Bytes in the active file.
    pub fn current_size(&self) -> u64 {
        self.lock().current_size
    }

    /// Number of rotations performed since open.
    pub fn rotations(&self) -> u64 {
        self.lock().rotations
    }

    /// Whether the handle has been closed (explicitly or by a fatal error).
    pub fn is_closed(&self) -> bool {
        self.lock().file.is_none()
    }

    /// Append `buf`, rotating first if it would push the file past the limit.
    pub fn write(&self, buf: &[u8]) -> Result<(), LogError> {
        let mut active = self.lock();
        if active.file.is_none() {
            return Err(LogError::Closed(self.path.clone()));
        }

        let incoming = buf.len() as u64;
        if active.current_size > 0
            && active.current_size.saturating_add(incoming) > self.max_size_bytes
        {
            self.rotate_locked(&mut active)?;
        }

        let Some(file) = active.file.as_mut() else {
            return Err(LogError::Closed(self.path.clone()));
        };
        if let Err(source) = file.write_all(buf) {
            active.file = None;
            return Err(LogError::Write {
                path: self.path.clone(),
                source,
            });
        }
        active.current_size += incoming;
        Ok(())
    }

    /// Force a rotation regardless of the current size.
    pub fn rotate(&self) -> Result<(), LogError> {
        let mut active = self.lock();
        if active.file.is_none() {
            return Err(LogError::Closed(self.path.clone()));
        }
        self.rotate_locked(&mut active)
    }

    /// Flush and release the file handle. Later calls are no-ops.
    pub fn close(&self) -> Result<(), LogError> {
        let mut active = self.lock();
        let Some(mut file) = active.file.take() else {
            return Ok(());
        };
        file.flush().map_err(|source| LogError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn rotate_locked(&self, active: &mut Active) -> Result<(), LogError> {
        // Drop the handle before renaming; on failure the handle stays gone.
        if let Some(mut file) = active.file.take() {
            file.flush().map_err(|source| self.rotate_error(source))?;
        }

        self.shift_backups().map_err(|source| self.rotate_error(source))?;

        let file = open_append(&self.path).map_err(|source| self.rotate_error(source))?;
        active.file = Some(file);
        active.current_size = 0;
        active.rotations += 1;

        metrics::counter!("log_rotations_total", "file" => self.path.display().to_string())
            .increment(1);
        tracing::debug!(
            path = %self.path.display(),
            max_backups = self.max_backups,
            "Log file rotated"
        );
        Ok(())
    }

    fn shift_backups(&self) -> io::Result<()> {
        if self.max_backups == 0 {
            return remove_if_exists(&self.path);
        }

        remove_if_exists(&self.backup_path(self.max_backups))?;
        for n in (1..self.max_backups).rev() {
            let src = self.backup_path(n);
            if src.exists() {
                fs::rename(&src, self.backup_path(n + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))
    }

    fn rotate_error(&self, source: io::Error) -> LogError {
        LogError::Rotate {
            path: self.path.clone(),
            source,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Active> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogSink for RotatingFileWriter {
    fn write(&self, buf: &[u8]) -> Result<(), LogError> {
        RotatingFileWriter::write(self, buf)
    }

    fn close(&self) -> Result<(), LogError> {
        RotatingFileWriter::close(self)
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
