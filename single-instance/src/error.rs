use std::path::PathBuf;

/// Errors from the instance guard and the notifier channel
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to open lock file {}: {source}", path.display())]
    LockFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to connect to the D-Bus session bus: {0}")]
    Connect(zbus::Error),

    #[error("Bus name {0} is already owned by another connection")]
    NameTaken(String),

    #[error("D-Bus error: {0}")]
    DBus(#[from] zbus::Error),
}
