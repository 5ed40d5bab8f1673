//! Remote file-transfer session: the `RemoteFs` seam, the SSH/SFTP
//! implementation and the connection lifecycle around it.

pub mod connection;
pub mod ssh;

#[cfg(test)]
pub mod memory;

use std::time::Duration;

use thiserror::Error;

use crate::model::credentials::Credentials;

pub use connection::ConnectionManager;
pub use ssh::SshConnector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
}

impl RemoteEntry {
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{0}: no such file or directory")]
    NotFound(String),

    #[error("{0}: already exists")]
    AlreadyExists(String),

    #[error("{op} {path}: {message}")]
    Operation {
        op: &'static str,
        path: String,
        message: String,
    },
}

impl RemoteError {
    pub fn operation(op: &'static str, path: &str, message: impl ToString) -> Self {
        Self::Operation {
            op,
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}

/// File operations of one live session. Paths are POSIX strings.
///
/// The command and file-transfer channels live behind one implementor, so a
/// session is either fully usable or not held at all.
pub trait RemoteFs {
    /// Lists a directory without the `.` and `..` entries.
    fn list_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError>;

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, RemoteError>;

    /// Creates or truncates `path` and writes `contents`.
    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), RemoteError>;

    /// Fails with [`RemoteError::AlreadyExists`] when a directory is already there.
    fn create_dir(&mut self, path: &str) -> Result<(), RemoteError>;

    fn remove_dir(&mut self, path: &str) -> Result<(), RemoteError>;

    fn remove_file(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Releases the file-transfer channel, then the command channel.
    fn close(&mut self) -> Result<(), RemoteError>;
}

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Transport(String),
}

/// Opens new sessions. One call is one connection attempt.
pub trait Connector {
    fn open(
        &self,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteFs>, OpenError>;
}

pub fn join_remote(base: &str, name: &str) -> String {
    if base.is_empty() || base == "." {
        return name.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), name)
}
