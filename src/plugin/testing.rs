//! Test doubles for the registry and source-fetch seams.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Result, bail};

use crate::plugin::registry::{RegistryClient, RegistryError};
use crate::plugin::source::SourceFetcher;

pub struct FakeRegistry {
    pub present: HashSet<String>,
    pub fail: bool,
    pub calls: Rc<Cell<u32>>,
}

impl FakeRegistry {
    pub fn with(names: &[&str]) -> Self {
        Self {
            present: names.iter().map(|name| name.to_string()).collect(),
            fail: false,
            calls: Rc::new(Cell::new(0)),
        }
    }
}

impl RegistryClient for FakeRegistry {
    fn project_exists(
        &self,
        _namespace: &str,
        name: &str,
        _token: &str,
    ) -> Result<bool, RegistryError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(RegistryError::Client("dns failure".into()));
        }
        Ok(self.present.contains(name))
    }
}

/// Writes a fixed set of files (relative path, contents) into the checkout.
pub struct FakeFetcher {
    pub files: Vec<(String, String)>,
    pub fail: bool,
    pub fetched: Rc<RefCell<Vec<String>>>,
}

impl FakeFetcher {
    pub fn with(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, contents)| (path.to_string(), contents.to_string()))
                .collect(),
            fail: false,
            fetched: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl SourceFetcher for FakeFetcher {
    fn fetch(&self, plugin_name: &str, dest: &Path) -> Result<()> {
        self.fetched.borrow_mut().push(plugin_name.to_string());
        if self.fail {
            bail!("git clone failed: repository not found");
        }
        fs::create_dir_all(dest)?;
        for (relative, contents) in &self.files {
            let path = dest.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, contents)?;
        }
        Ok(())
    }
}
