use fs2::FileExt;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;

use crate::Error;

pub const DEFAULT_LOCK_PATH: &str = "/tmp/apsshelldemo.pid";

/// Role of this process, decided by who holds the lock file
#[derive(Debug)]
pub enum InstanceRole {
    /// The lock is held for as long as the `InstanceLock` lives
    Primary(InstanceLock),
    Secondary,
}

impl InstanceRole {
    pub fn is_primary(&self) -> bool {
        matches!(self, InstanceRole::Primary(_))
    }
}

/// Exclusive lock on the instance lock file.
///
/// Dropping the value unlocks and closes the file.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the lock explicitly, equivalent to dropping it
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("Failed to unlock {}: {}", self.path.display(), e);
        } else {
            log::debug!("Released instance lock {}", self.path.display());
        }
    }
}

/// Tries to become the primary instance by locking `path`.
///
/// Never blocks and never retries: if the lock can't be taken right now the
/// process is a secondary instance. The only error is failing to open the
/// file at all.
pub fn acquire(path: impl AsRef<Path>) -> Result<InstanceRole, Error> {
    let path = path.as_ref().to_path_buf();
    let file = open_lock_file(&path).map_err(|source| Error::LockFile {
        path: path.clone(),
        source,
    })?;

    match file.try_lock_exclusive() {
        Ok(()) => {
            log::debug!("Acquired instance lock {}", path.display());
            Ok(InstanceRole::Primary(InstanceLock { file, path }))
        }
        Err(e) => {
            log::debug!("Instance lock {} is held elsewhere: {}", path.display(), e);
            Ok(InstanceRole::Secondary)
        }
    }
}

fn open_lock_file(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).read(true).write(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o666);
    }

    options.open(path)
}
