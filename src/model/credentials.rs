use std::fmt;

use crate::error::{Result, SyncError};

pub const DEFAULT_SFTP_PORT: u16 = 22;

/// Remote login. The secret never reaches `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub username: String,
    secret: String,
}

impl Credentials {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self> {
        let credentials = Self {
            host: host.into(),
            port,
            username: username.into(),
            secret: secret.into(),
        };
        credentials.validate()?;
        Ok(credentials)
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty()
            || self.username.trim().is_empty()
            || self.secret.is_empty()
        {
            return Err(SyncError::Configuration(
                "SFTP credentials are incomplete".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(SyncError::Configuration(
                "SFTP port must be between 1 and 65535".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Produces credentials when a new session has to be established.
pub trait CredentialSource {
    fn load(&self) -> Result<Credentials>;
}

impl CredentialSource for Credentials {
    fn load(&self) -> Result<Credentials> {
        Ok(self.clone())
    }
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads `SFTP_HOST`, `SFTP_PORT`, `SFTP_USER` and `SFTP_PASS`.
pub struct EnvCredentials {
    lookup: Lookup,
}

impl EnvCredentials {
    pub fn new() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.var(key)
            .ok_or_else(|| SyncError::Configuration(format!("{key} is not set")))
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialSource for EnvCredentials {
    fn load(&self) -> Result<Credentials> {
        let host = self.required("SFTP_HOST")?;
        let username = self.required("SFTP_USER")?;
        let secret = self.required("SFTP_PASS")?;
        let port = match self.var("SFTP_PORT") {
            Some(raw) => parse_port(&raw)?,
            None => DEFAULT_SFTP_PORT,
        };

        Credentials::new(host, port, username, secret)
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| {
            SyncError::Configuration(format!(
                "SFTP_PORT must be between 1 and 65535, got {raw:?}"
            ))
        })
}

/// Registry namespace and bearer token, both taken from the environment
/// (`GITHUB` and `GITHUB_TOKEN`).
#[derive(Clone, Default)]
pub struct RegistryAccess {
    pub namespace: Option<String>,
    token: Option<String>,
}

impl RegistryAccess {
    pub fn new(namespace: Option<String>, token: Option<String>) -> Self {
        Self {
            namespace: namespace.filter(|ns| !ns.trim().is_empty()),
            token: token.filter(|token| !token.trim().is_empty()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("GITHUB").ok(), std::env::var("GITHUB_TOKEN").ok())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl fmt::Debug for RegistryAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryAccess")
            .field("namespace", &self.namespace)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
