use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Result, SyncError};
use crate::log::Logger;
use crate::model::config::AppConfig;
use crate::model::credentials::RegistryAccess;
use crate::model::mode::ModeFlags;
use crate::plugin::{DirectorySyncer, Plugin, PluginClassifier};
use crate::remote::{ConnectionManager, RemoteFs};
use crate::{log_debug, log_info, log_success, log_warn};

const SEPARATOR_WIDTH: usize = 80;

/// Cooperative stop flag, checked at the top of each plugin iteration.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub plugins_dir: String,
    pub modes: ModeFlags,
    /// Lower-cased.
    pub targets: HashSet<String>,
}

impl RunSettings {
    pub fn from_config(config: &AppConfig, access: &RegistryAccess) -> Result<Self> {
        let modes = config.mode_flags();
        if modes.needs_registry() && access.namespace.is_none() {
            return Err(SyncError::Configuration(
                "GITHUB (registry namespace) must be set for the registry and update modes"
                    .to_string(),
            ));
        }

        Ok(Self {
            plugins_dir: config.general.plugins_dir.clone(),
            modes,
            targets: config
                .general
                .target_plugins
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
        })
    }
}

/// Tallies over the plugins processed before the run ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub valid: usize,
    pub owned: usize,
    pub registry_present: usize,
    pub updated: usize,
}

impl RunSummary {
    fn record(&mut self, plugin: &Plugin) {
        self.processed += 1;
        self.valid += usize::from(plugin.is_valid == Some(true));
        self.owned += usize::from(plugin.is_owned == Some(true));
        self.registry_present += usize::from(plugin.is_registry_present == Some(true));
        self.updated += usize::from(plugin.updated);
    }

    fn emit(&self, modes: ModeFlags, logger: &dyn Logger) {
        if modes.valid {
            log_info!(logger, "{} valid plugins", self.valid);
        }
        if modes.owned {
            log_info!(logger, "{} plugins owned by you", self.owned);
        }
        if modes.registry {
            log_info!(logger, "{} plugins present in registry", self.registry_present);
        }
        if modes.update {
            log_success!(logger, "{} plugins updated", self.updated);
        }
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub plugins: Vec<Plugin>,
    pub summary: RunSummary,
    pub cancelled: bool,
}

/// Drives one run: list, classify, optionally sync, tally.
pub struct Orchestrator {
    settings: RunSettings,
    connections: ConnectionManager,
    classifier: PluginClassifier,
    syncer: DirectorySyncer,
    logger: Arc<dyn Logger>,
}

impl Orchestrator {
    pub fn new(
        settings: RunSettings,
        connections: ConnectionManager,
        classifier: PluginClassifier,
        syncer: DirectorySyncer,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            settings,
            connections,
            classifier,
            syncer,
            logger,
        }
    }

    /// Per-plugin explanations go to the logger, separators to `out`. The
    /// session is closed before this returns, on success or failure.
    pub fn run(&mut self, out: &mut dyn Write, cancel: &CancellationToken) -> Result<RunReport> {
        let Self {
            settings,
            connections,
            classifier,
            syncer,
            logger,
        } = self;
        let logger: &dyn Logger = &**logger;

        let report = connections.with_session(|fs| {
            let names = list_plugin_names(fs, &settings.plugins_dir)?;
            if names.is_empty() {
                return Err(SyncError::NoPlugins(settings.plugins_dir.clone()));
            }

            let total = names.len();
            log_debug!(logger, "analysing {total} plugins");

            let mut report = RunReport::default();
            for (idx, name) in names.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    log_warn!(
                        logger,
                        "interrupted, stopping after {} of {total} plugins",
                        report.summary.processed
                    );
                    report.cancelled = true;
                    break;
                }

                log_debug!(logger, "[{}/{total}] analysing {name}", idx + 1);
                let plugin = process_plugin(settings, classifier, syncer, fs, name);

                plugin.emit(logger);
                if let Err(err) = writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH)) {
                    log_warn!(logger, "failed to write output: {err}");
                }

                report.summary.record(&plugin);
                report.plugins.push(plugin);
            }
            Ok(report)
        })?;

        report.summary.emit(settings.modes, logger);
        Ok(report)
    }
}

fn process_plugin(
    settings: &RunSettings,
    classifier: &PluginClassifier,
    syncer: &DirectorySyncer,
    fs: &mut dyn RemoteFs,
    name: String,
) -> Plugin {
    let mut plugin = Plugin::new(name, &settings.plugins_dir);
    classifier.classify(&mut plugin, fs, settings.modes);

    if settings.modes.update
        && plugin.is_targeted(&settings.targets)
        && plugin.is_registry_present == Some(true)
    {
        syncer.apply_update(&mut plugin, fs);
    }
    plugin
}

/// Directory entries under the plugins root, sorted by name.
fn list_plugin_names(fs: &mut dyn RemoteFs, plugins_dir: &str) -> Result<Vec<String>> {
    let mut names: Vec<String> = fs
        .list_dir(plugins_dir)?
        .into_iter()
        .filter(|entry| entry.is_dir)
        .map(|entry| entry.name)
        .collect();
    names.sort();
    Ok(names)
}
