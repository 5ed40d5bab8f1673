//! In-memory `RemoteFs` used by tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::remote::{RemoteEntry, RemoteError, RemoteFs};

#[derive(Debug)]
pub struct MemoryTree {
    pub dirs: BTreeSet<String>,
    pub files: BTreeMap<String, Vec<u8>>,
    /// Every list call fails while set.
    pub fail_listing: bool,
    pub removed: Vec<String>,
    pub closes: u32,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self {
            dirs: BTreeSet::from([".".to_string(), "/".to_string()]),
            files: BTreeMap::new(),
            fail_listing: false,
            removed: Vec::new(),
            closes: 0,
        }
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => ".",
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl MemoryTree {
    pub fn add_dir(&mut self, path: &str) {
        let mut current = String::new();
        for part in path.split('/') {
            if part.is_empty() {
                current.push('/');
                continue;
            }
            if !current.is_empty() && !current.ends_with('/') {
                current.push('/');
            }
            current.push_str(part);
            self.dirs.insert(current.clone());
        }
    }

    pub fn add_file(&mut self, path: &str, contents: &str) {
        self.add_dir(parent_of(path));
        self.files
            .insert(path.to_string(), contents.as_bytes().to_vec());
    }

    pub fn exists(&self, path: &str) -> bool {
        self.dirs.contains(path) || self.files.contains_key(path)
    }

    fn children(&self, path: &str) -> Vec<RemoteEntry> {
        let dirs = self
            .dirs
            .iter()
            .filter(|dir| dir.as_str() != path && parent_of(dir) == path)
            .map(|dir| RemoteEntry::dir(name_of(dir)));
        let files = self
            .files
            .keys()
            .filter(|file| parent_of(file) == path)
            .map(|file| RemoteEntry::file(name_of(file)));
        dirs.chain(files).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    pub tree: Rc<RefCell<MemoryTree>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(tree: Rc<RefCell<MemoryTree>>) -> Self {
        Self { tree }
    }
}

impl RemoteFs for MemoryFs {
    fn list_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let tree = self.tree.borrow();
        if tree.fail_listing {
            return Err(RemoteError::operation("list", path, "connection reset"));
        }
        if !tree.dirs.contains(path) {
            return Err(RemoteError::NotFound(path.to_string()));
        }
        Ok(tree.children(path))
    }

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, RemoteError> {
        self.tree
            .borrow()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(path.to_string()))
    }

    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), RemoteError> {
        let mut tree = self.tree.borrow_mut();
        if !tree.dirs.contains(parent_of(path)) {
            return Err(RemoteError::NotFound(parent_of(path).to_string()));
        }
        tree.files.insert(path.to_string(), contents.to_vec());
        Ok(())
    }

    fn create_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let mut tree = self.tree.borrow_mut();
        if tree.exists(path) {
            return Err(RemoteError::AlreadyExists(path.to_string()));
        }
        if !tree.dirs.contains(parent_of(path)) {
            return Err(RemoteError::NotFound(parent_of(path).to_string()));
        }
        tree.dirs.insert(path.to_string());
        Ok(())
    }

    fn remove_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let mut tree = self.tree.borrow_mut();
        if !tree.dirs.contains(path) {
            return Err(RemoteError::NotFound(path.to_string()));
        }
        if !tree.children(path).is_empty() {
            return Err(RemoteError::operation("rmdir", path, "directory not empty"));
        }
        tree.dirs.remove(path);
        tree.removed.push(path.to_string());
        Ok(())
    }

    fn remove_file(&mut self, path: &str) -> Result<(), RemoteError> {
        let mut tree = self.tree.borrow_mut();
        if tree.files.remove(path).is_none() {
            return Err(RemoteError::NotFound(path.to_string()));
        }
        tree.removed.push(path.to_string());
        Ok(())
    }

    fn close(&mut self) -> Result<(), RemoteError> {
        self.tree.borrow_mut().closes += 1;
        Ok(())
    }
}

/// Opens sessions over one shared tree and counts the attempts.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    pub tree: Rc<RefCell<MemoryTree>>,
    pub opens: Rc<std::cell::Cell<u32>>,
}

impl crate::remote::Connector for MemoryConnector {
    fn open(
        &self,
        _credentials: &crate::model::credentials::Credentials,
        _timeout: std::time::Duration,
    ) -> Result<Box<dyn RemoteFs>, crate::remote::OpenError> {
        self.opens.set(self.opens.get() + 1);
        Ok(Box::new(MemoryFs::shared(self.tree.clone())))
    }
}
