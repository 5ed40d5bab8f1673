use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::log::Logger;
use crate::model::config::SftpConfig;
use crate::model::credentials::CredentialSource;
use crate::remote::{Connector, OpenError, RemoteFs};
use crate::{log_debug, log_info, log_success, log_warn};

/// Owns the single live session of a run.
///
/// `connect` reuses a held session after a cheap probe and otherwise opens a
/// new one with bounded retries. Authentication failures are never retried.
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    credentials: Box<dyn CredentialSource>,
    logger: Arc<dyn Logger>,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    probe_path: String,
    session: Option<Box<dyn RemoteFs>>,
}

impl ConnectionManager {
    pub fn new(
        connector: Box<dyn Connector>,
        credentials: Box<dyn CredentialSource>,
        config: &SftpConfig,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            connector,
            credentials,
            logger,
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            probe_path: config.probe_path.clone(),
            session: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn connect(&mut self) -> Result<&mut dyn RemoteFs> {
        if let Some(session) = self.session.as_mut() {
            match session.list_dir(&self.probe_path) {
                Ok(_) => {
                    log_debug!(self.logger, "reusing live SFTP session");
                }
                Err(err) => {
                    log_warn!(self.logger, "SFTP session probe failed, reconnecting: {err}");
                    self.release();
                }
            }
        }

        if self.session.is_none() {
            let session = self.establish()?;
            self.session = Some(session);
        }

        match self.session.as_deref_mut() {
            Some(session) => Ok(session),
            None => Err(SyncError::Connection {
                attempts: 0,
                reason: "no session available".to_string(),
            }),
        }
    }

    fn establish(&self) -> Result<Box<dyn RemoteFs>> {
        let credentials = self.credentials.load()?;
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            log_debug!(
                self.logger,
                "connecting to SFTP server {}:{} (attempt {attempt}/{})",
                credentials.host,
                credentials.port,
                self.max_retries
            );

            let reason = match self.connector.open(&credentials, self.timeout) {
                Ok(mut session) => match session.list_dir(&self.probe_path) {
                    Ok(_) => {
                        log_success!(
                            self.logger,
                            "connected to SFTP server {}:{}",
                            credentials.host,
                            credentials.port
                        );
                        return Ok(session);
                    }
                    Err(err) => {
                        if let Err(close_err) = session.close() {
                            log_debug!(
                                self.logger,
                                "ignoring error while closing unhealthy SFTP session: {close_err}"
                            );
                        }
                        format!("liveness probe failed: {err}")
                    }
                },
                Err(OpenError::Authentication(reason)) => {
                    return Err(SyncError::Authentication(reason));
                }
                Err(OpenError::Transport(reason)) => reason,
            };

            if attempt < self.max_retries {
                log_info!(
                    self.logger,
                    "SFTP connection attempt {attempt}/{} failed, retrying: {reason}",
                    self.max_retries
                );
                if !self.retry_delay.is_zero() {
                    thread::sleep(self.retry_delay);
                }
            }
            last_error = reason;
        }

        Err(SyncError::Connection {
            attempts: self.max_retries,
            reason: last_error,
        })
    }

    /// Releases the held session, if any. Teardown errors are logged only.
    pub fn close(&mut self) {
        if self.release() {
            log_info!(self.logger, "SFTP connection closed");
        }
    }

    fn release(&mut self) -> bool {
        let Some(mut session) = self.session.take() else {
            return false;
        };
        if let Err(err) = session.close() {
            log_debug!(self.logger, "ignoring error while closing SFTP session: {err}");
        }
        true
    }

    /// Runs `f` against a live session and closes it on every exit path.
    pub fn with_session<T>(
        &mut self,
        f: impl FnOnce(&mut dyn RemoteFs) -> Result<T>,
    ) -> Result<T> {
        let result = match self.connect() {
            Ok(session) => f(session),
            Err(err) => Err(err),
        };
        self.close();
        result
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.release();
    }
}
