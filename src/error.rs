use thiserror::Error;

use crate::remote::RemoteError;

/// Failures that abort a whole run.
///
/// Per-plugin problems (bad manifest, registry lookup failure, sync failure)
/// never surface here; they are recorded on the plugin and the run goes on.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("connection failed after {attempts} attempt(s): {reason}")]
    Connection { attempts: u32, reason: String },

    #[error("no plugin directories found under {0}")]
    NoPlugins(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
