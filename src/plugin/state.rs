use std::collections::{BTreeSet, HashSet};

use crate::log::Logger;
use crate::plugin::explanation::Explanation;
use crate::remote::join_remote;

/// One remote plugin directory and what the enabled checks found about it.
///
/// Check results are tri-state: `None` means the check never ran.
#[derive(Debug, Clone)]
pub struct Plugin {
    pub name: String,
    pub path: String,
    pub is_valid: Option<bool>,
    pub is_owned: Option<bool>,
    pub is_registry_present: Option<bool>,
    pub authors: BTreeSet<String>,
    pub updated: bool,
    /// Problems met while checking, emitted before the explanation.
    pub diagnostics: Vec<Explanation>,
    pub explanation: Option<Explanation>,
}

impl Plugin {
    pub fn new(name: impl Into<String>, plugins_dir: &str) -> Self {
        let name = name.into();
        let path = join_remote(plugins_dir, &name);
        Self {
            name,
            path,
            is_valid: None,
            is_owned: None,
            is_registry_present: None,
            authors: BTreeSet::new(),
            updated: false,
            diagnostics: Vec::new(),
            explanation: None,
        }
    }

    /// `targets` must already be lower-cased.
    pub fn is_targeted(&self, targets: &HashSet<String>) -> bool {
        targets.contains(&self.name.to_lowercase())
    }

    pub fn record(&mut self, diagnostic: Explanation) {
        self.diagnostics.push(diagnostic);
    }

    /// Emits the diagnostics, then the explanation.
    pub fn emit(&self, logger: &dyn Logger) {
        for diagnostic in &self.diagnostics {
            diagnostic.emit(logger);
        }
        if let Some(explanation) = &self.explanation {
            explanation.emit(logger);
        }
    }
}
