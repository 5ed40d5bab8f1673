use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};

/// Fetches the canonical source of a plugin into a local directory.
pub trait SourceFetcher {
    /// `dest` does not exist yet; the fetcher creates it.
    fn fetch(&self, plugin_name: &str, dest: &Path) -> Result<()>;
}

/// Shallow `git clone` of the default branch of
/// `https://<clone_host>/<namespace>/<plugin>.git`.
pub struct GitFetcher {
    clone_host: String,
    namespace: String,
    token: Option<String>,
}

impl GitFetcher {
    pub fn new(clone_host: impl Into<String>, namespace: impl Into<String>, token: Option<String>) -> Self {
        Self {
            clone_host: clone_host.into(),
            namespace: namespace.into(),
            token,
        }
    }

    pub fn clone_url(&self, plugin_name: &str) -> String {
        let credentials = self
            .token
            .as_deref()
            .map(|token| format!("{token}@"))
            .unwrap_or_default();
        format!(
            "https://{credentials}{}/{}/{plugin_name}.git",
            self.clone_host, self.namespace
        )
    }

    fn scrub(&self, text: &str) -> String {
        match self.token.as_deref() {
            Some(token) if !token.is_empty() => text.replace(token, "***"),
            _ => text.to_string(),
        }
    }
}

impl SourceFetcher for GitFetcher {
    fn fetch(&self, plugin_name: &str, dest: &Path) -> Result<()> {
        let output = Command::new("git")
            .args(["clone", "--depth", "1", "--quiet"])
            .arg(self.clone_url(plugin_name))
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .context("failed to run git clone")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git clone failed: {}", self.scrub(stderr.trim()));
        }

        Ok(())
    }
}
