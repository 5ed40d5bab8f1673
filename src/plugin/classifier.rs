use std::collections::BTreeSet;
use std::sync::Arc;

use crate::log::Logger;
use crate::model::credentials::RegistryAccess;
use crate::model::mode::ModeFlags;
use crate::plugin::explanation::{Explanation, Severity, derive_explanation};
use crate::plugin::manifest::{MANIFEST_FILE, PluginManifest, SOURCE_DIR};
use crate::plugin::registry::RegistryClient;
use crate::plugin::state::Plugin;
use crate::remote::RemoteFs;
use crate::{log_debug, log_trace};

/// Runs the structural, ownership and registry checks for one plugin.
///
/// None of the checks fail: problems turn into `false` plus a diagnostic on
/// the plugin.
pub struct PluginClassifier {
    registry: Box<dyn RegistryClient>,
    access: RegistryAccess,
    allowed_authors: BTreeSet<String>,
    logger: Arc<dyn Logger>,
}

impl PluginClassifier {
    pub fn new(
        registry: Box<dyn RegistryClient>,
        access: RegistryAccess,
        allowed_authors: &[String],
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            registry,
            access,
            allowed_authors: allowed_authors
                .iter()
                .map(|author| author.to_lowercase())
                .collect(),
            logger,
        }
    }

    /// Runs the enabled checks, then derives the explanation.
    pub fn classify(&self, plugin: &mut Plugin, fs: &mut dyn RemoteFs, modes: ModeFlags) {
        if modes.valid {
            plugin.is_valid = Some(self.check_valid(plugin, fs));
        }
        if modes.owned {
            plugin.is_owned = Some(self.check_owned(plugin, fs));
        }
        if modes.registry {
            plugin.is_registry_present = Some(self.check_registry_presence(plugin));
        }
        plugin.explanation = Some(derive_explanation(plugin));
    }

    pub fn check_valid(&self, plugin: &mut Plugin, fs: &mut dyn RemoteFs) -> bool {
        log_trace!(self.logger, "{}: listing {}", plugin.name, plugin.path);
        match fs.list_dir(&plugin.path) {
            Ok(entries) => {
                let has = |name: &str| entries.iter().any(|entry| entry.name == name);
                has(MANIFEST_FILE) && has(SOURCE_DIR)
            }
            Err(err) => {
                log_debug!(self.logger, "{}: listing failed: {err}", plugin.name);
                plugin.record(Explanation::new(
                    Severity::Error,
                    format!("{}: invalid structure ({err})", plugin.name),
                ));
                false
            }
        }
    }

    pub fn check_owned(&self, plugin: &mut Plugin, fs: &mut dyn RemoteFs) -> bool {
        let manifest = match PluginManifest::read(fs, &plugin.path) {
            Ok(manifest) => manifest,
            Err(err) => {
                if plugin.is_valid == Some(true) {
                    plugin.is_valid = Some(false);
                }
                plugin.record(Explanation::new(
                    Severity::Error,
                    format!("{}: {err}", plugin.name),
                ));
                return false;
            }
        };

        if manifest.declared_name().is_none() {
            plugin.record(Explanation::new(
                Severity::Info,
                format!("{}: {MANIFEST_FILE} declares no name", plugin.name),
            ));
            return false;
        }

        plugin.authors = manifest.authors();
        !plugin.authors.is_disjoint(&self.allowed_authors)
    }

    /// A missing namespace or token skips the lookup. A failed lookup counts
    /// as absent and is recorded on the plugin.
    pub fn check_registry_presence(&self, plugin: &mut Plugin) -> bool {
        let (Some(namespace), Some(token)) = (self.access.namespace.as_deref(), self.access.token())
        else {
            return false;
        };

        match self.registry.project_exists(namespace, &plugin.name, token) {
            Ok(found) => found,
            Err(err) => {
                log_debug!(self.logger, "{}: registry lookup error: {err:?}", plugin.name);
                plugin.record(Explanation::new(
                    Severity::Error,
                    format!("{}: registry lookup failed: {err}", plugin.name),
                ));
                false
            }
        }
    }
}
