use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exclusive advisory lock on a data root. Released on drop.
pub struct InstanceLock {
    lock_file: File,
}

fn open_lock_file(lock_path: &Path) -> Result<File, CoreError> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?)
}

impl InstanceLock {
    /// Block until the lock is held.
    pub fn acquire(lock_path: &Path) -> Result<Self, CoreError> {
        let file = open_lock_file(lock_path)?;
        file.lock_exclusive()
            .map_err(|e| CoreError::Io(std::io::Error::new(std::io::ErrorKind::WouldBlock, e)))?;
        Ok(Self { lock_file: file })
    }

    /// `None` if another process holds the lock. Any other failure is an error.
    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>, CoreError> {
        let file = open_lock_file(lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { lock_file: file })),
            Err(e) if is_contended(&e) => Ok(None),
            Err(e) => Err(CoreError::Io(e)),
        }
    }
}

fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::WouldBlock
        || (e.raw_os_error().is_some()
            && e.raw_os_error() == fs2::lock_contended_error().raw_os_error())
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// First Ctrl-C asks the daemon loop to wind down; a second one exits at once.
pub fn install_signal_handler() {
    let _ = ctrlc::set_handler(move || {
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            std::process::exit(1);
        }
        SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
        eprintln!("\nshutdown requested, stopping watchers...");
    });
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_acquire_returns_none_when_held() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join(".lock");

        let _lock = InstanceLock::acquire(&lock_path).unwrap();
        assert!(lock_path.exists());
        assert!(InstanceLock::try_acquire(&lock_path).unwrap().is_none());
    }

    #[test]
    fn lock_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("nested").join(".lock");

        {
            let _lock = InstanceLock::try_acquire(&lock_path).unwrap().unwrap();
        }
        assert!(InstanceLock::try_acquire(&lock_path).unwrap().is_some());
    }

    #[test]
    fn only_contention_counts_as_held() {
        assert!(is_contended(&fs2::lock_contended_error()));
        assert!(is_contended(&std::io::Error::from(std::io::ErrorKind::WouldBlock)));
        assert!(!is_contended(&std::io::Error::from(std::io::ErrorKind::PermissionDenied)));
    }

    #[test]
    fn unusable_lock_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("root");
        std::fs::write(&blocker, "not a directory").unwrap();
        let result = InstanceLock::try_acquire(&blocker.join(".lock"));
        assert!(matches!(result, Err(CoreError::Io(_))));
    }
}
