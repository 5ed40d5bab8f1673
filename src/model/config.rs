use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SyncError};
use crate::log::Logger;
use crate::log_warn;
use crate::model::mode::{Mode, ModeFlags};

const DEFAULTS: &str = include_str!("../../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub sftp: SftpConfig,
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub plugins_dir: String,
    pub authors: Vec<String>,
    pub modes: Vec<Mode>,
    pub target_plugins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SftpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub probe_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    pub api_base: String,
    pub clone_host: String,
    pub timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    ///
    /// An explicit path must exist. Without one, the platform config file is
    /// used when present and the defaults otherwise.
    pub fn load(explicit: Option<&Path>, logger: &dyn Logger) -> Result<Self> {
        let mut value = parse_toml(DEFAULTS, Path::new("<defaults>"))?;

        let user_path = match explicit {
            Some(path) if !path.exists() => {
                return Err(SyncError::Configuration(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => Some(path.to_path_buf()),
            None => match default_config_path() {
                Some(path) if path.exists() => Some(path),
                Some(path) => {
                    log_warn!(
                        logger,
                        "no config file at {}, using defaults",
                        path.display()
                    );
                    None
                }
                None => None,
            },
        };

        if let Some(path) = user_path {
            let raw = fs::read_to_string(&path).map_err(|err| {
                SyncError::Configuration(format!("{}: {err}", path.display()))
            })?;
            merge(&mut value, parse_toml(&raw, &path)?);
        }

        Self::from_value(value)
    }

    #[cfg(test)]
    pub fn from_toml(raw: &str) -> Result<Self> {
        let mut value = parse_toml(DEFAULTS, Path::new("<defaults>"))?;
        merge(&mut value, parse_toml(raw, Path::new("<inline>"))?);
        Self::from_value(value)
    }

    fn from_value(value: toml::Value) -> Result<Self> {
        let config: AppConfig = value
            .try_into()
            .map_err(|err| SyncError::Configuration(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.plugins_dir.trim().is_empty() {
            return Err(SyncError::Configuration("plugins_dir is empty".to_string()));
        }
        if self.sftp.timeout_secs == 0 || self.registry.timeout_secs == 0 {
            return Err(SyncError::Configuration(
                "timeouts must be positive".to_string(),
            ));
        }
        if self.sftp.max_retries == 0 {
            return Err(SyncError::Configuration(
                "max_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn mode_flags(&self) -> ModeFlags {
        ModeFlags::from_modes(&self.general.modes)
    }
}

fn parse_toml(raw: &str, origin: &Path) -> Result<toml::Value> {
    toml::from_str(raw)
        .map_err(|err| SyncError::Configuration(format!("{}: {err}", origin.display())))
}

/// Overlays `overlay` onto `base`, table by table.
fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "sftp-auto-sync")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NoOpLogger;
    use std::io::Write;

    #[test]
    fn test_defaults_parse() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.general.plugins_dir, "./plugins");
        assert!(config.general.modes.is_empty());
        assert_eq!(config.sftp.max_retries, 3);
        assert_eq!(config.sftp.timeout_secs, 60);
        assert_eq!(config.registry.timeout_secs, 30);
        assert_eq!(config.mode_flags(), ModeFlags::default());
    }

    #[test]
    fn test_user_values_merge_over_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [general]
            plugins_dir = "/srv/pmmp/plugins"
            authors = ["Alice"]
            modes = ["valid", "update"]

            [sftp]
            max_retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.general.plugins_dir, "/srv/pmmp/plugins");
        assert_eq!(config.general.authors, vec!["Alice".to_string()]);
        assert!(config.general.target_plugins.is_empty());
        assert_eq!(config.sftp.max_retries, 5);
        assert_eq!(config.sftp.timeout_secs, 60);

        let flags = config.mode_flags();
        assert!(flags.valid && flags.update);
        assert!(!flags.owned && !flags.registry);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result = AppConfig::from_toml("[general]\nmodes = [\"deploy\"]\n");
        assert!(matches!(result, Err(SyncError::Configuration(_))));
    }

    #[test]
    fn test_github_mode_is_registry() {
        let config = AppConfig::from_toml("[general]\nmodes = [\"github\"]\n").unwrap();
        assert_eq!(config.general.modes, vec![Mode::Registry]);
        assert!(config.mode_flags().registry);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for raw in [
            "[general]\nplugins_dir = \"  \"\n",
            "[sftp]\ntimeout_secs = 0\n",
            "[sftp]\nmax_retries = 0\n",
            "[registry]\ntimeout_secs = 0\n",
        ] {
            assert!(
                matches!(AppConfig::from_toml(raw), Err(SyncError::Configuration(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[general]\ntarget_plugins = [\"Alpha\"]").unwrap();

        let config = AppConfig::load(Some(file.path()), &NoOpLogger).unwrap();
        assert_eq!(config.general.target_plugins, vec!["Alpha".to_string()]);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load(Some(&dir.path().join("absent.toml")), &NoOpLogger);
        assert!(matches!(result, Err(SyncError::Configuration(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = AppConfig::from_toml("[general\nplugins_dir = ");
        assert!(matches!(result, Err(SyncError::Configuration(_))));
    }
}
