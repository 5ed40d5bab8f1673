use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use ssh2::{ErrorCode, Session, Sftp};

use crate::model::credentials::Credentials;
use crate::remote::{Connector, OpenError, RemoteEntry, RemoteError, RemoteFs};

// libssh2 codes for a rejected login.
const LIBSSH2_ERROR_AUTHENTICATION_FAILED: i32 = -18;
const LIBSSH2_ERROR_PUBLICKEY_UNVERIFIED: i32 = -19;

/// Opens password-authenticated SSH sessions with an SFTP channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshConnector;

impl Connector for SshConnector {
    fn open(
        &self,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteFs>, OpenError> {
        let addr = (credentials.host.as_str(), credentials.port)
            .to_socket_addrs()
            .map_err(|err| OpenError::Transport(format!("{}: {err}", credentials.host)))?
            .next()
            .ok_or_else(|| {
                OpenError::Transport(format!("{}: no address resolved", credentials.host))
            })?;

        let tcp = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|err| OpenError::Transport(format!("{addr}: {err}")))?;

        let mut session =
            Session::new().map_err(|err| OpenError::Transport(err.to_string()))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(timeout_millis(timeout));

        match establish(&mut session, credentials) {
            Ok(sftp) => Ok(Box::new(SshSession {
                sftp: Some(sftp),
                session: Some(session),
            })),
            Err(err) => {
                if let Err(disconnect_err) = session.disconnect(None, "connection aborted", None) {
                    tracing::debug!("ignoring error while aborting SSH session: {disconnect_err}");
                }
                Err(err)
            }
        }
    }
}

fn establish(session: &mut Session, credentials: &Credentials) -> Result<Sftp, OpenError> {
    session
        .handshake()
        .map_err(|err| OpenError::Transport(format!("handshake: {err}")))?;

    if let Err(err) = session.userauth_password(&credentials.username, credentials.secret()) {
        return Err(match err.code() {
            ErrorCode::Session(
                LIBSSH2_ERROR_AUTHENTICATION_FAILED | LIBSSH2_ERROR_PUBLICKEY_UNVERIFIED,
            ) => OpenError::Authentication(format!(
                "{}@{}: {err}",
                credentials.username, credentials.host
            )),
            _ => OpenError::Transport(format!("authentication: {err}")),
        });
    }

    if !session.authenticated() {
        return Err(OpenError::Authentication(format!(
            "{}@{}: credentials rejected",
            credentials.username, credentials.host
        )));
    }

    session
        .sftp()
        .map_err(|err| OpenError::Transport(format!("sftp channel: {err}")))
}

fn timeout_millis(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

/// The SSH command channel and its SFTP channel, released together.
pub struct SshSession {
    sftp: Option<Sftp>,
    session: Option<Session>,
}

impl SshSession {
    fn sftp(&self, op: &'static str, path: &str) -> Result<&Sftp, RemoteError> {
        self.sftp
            .as_ref()
            .ok_or_else(|| RemoteError::operation(op, path, "session is closed"))
    }

    fn is_dir(&self, path: &str) -> bool {
        self.sftp
            .as_ref()
            .and_then(|sftp| sftp.stat(Path::new(path)).ok())
            .is_some_and(|stat| stat.is_dir())
    }
}

fn map_err(op: &'static str, path: &str, err: ssh2::Error) -> RemoteError {
    // SSH_FX_NO_SUCH_FILE
    if matches!(err.code(), ErrorCode::SFTP(2)) {
        return RemoteError::NotFound(path.to_string());
    }
    RemoteError::operation(op, path, err)
}

impl RemoteFs for SshSession {
    fn list_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let entries = self
            .sftp("list", path)?
            .readdir(Path::new(path))
            .map_err(|err| map_err("list", path, err))?;

        Ok(entries
            .into_iter()
            .filter_map(|(entry_path, stat)| {
                let name = entry_path.file_name()?.to_str()?.to_string();
                Some(if stat.is_dir() {
                    RemoteEntry::dir(name)
                } else {
                    RemoteEntry::file(name)
                })
            })
            .collect())
    }

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let mut file = self
            .sftp("read", path)?
            .open(Path::new(path))
            .map_err(|err| map_err("read", path, err))?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|err| RemoteError::operation("read", path, err))?;
        Ok(contents)
    }

    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), RemoteError> {
        let mut file = self
            .sftp("write", path)?
            .create(Path::new(path))
            .map_err(|err| map_err("write", path, err))?;

        file.write_all(contents)
            .map_err(|err| RemoteError::operation("write", path, err))
    }

    fn create_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let result = self.sftp("mkdir", path)?.mkdir(Path::new(path), 0o755);
        match result {
            Ok(()) => Ok(()),
            Err(_) if self.is_dir(path) => Err(RemoteError::AlreadyExists(path.to_string())),
            Err(err) => Err(map_err("mkdir", path, err)),
        }
    }

    fn remove_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        self.sftp("rmdir", path)?
            .rmdir(Path::new(path))
            .map_err(|err| map_err("rmdir", path, err))
    }

    fn remove_file(&mut self, path: &str) -> Result<(), RemoteError> {
        self.sftp("unlink", path)?
            .unlink(Path::new(path))
            .map_err(|err| map_err("unlink", path, err))
    }

    fn close(&mut self) -> Result<(), RemoteError> {
        let mut first_error = None;

        if let Some(mut sftp) = self.sftp.take() {
            if let Err(err) = sftp.shutdown() {
                first_error.get_or_insert(RemoteError::operation("close", "sftp", err));
            }
        }
        if let Some(session) = self.session.take() {
            if let Err(err) = session.disconnect(None, "closing", None) {
                first_error.get_or_insert(RemoteError::operation("close", "ssh", err));
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
