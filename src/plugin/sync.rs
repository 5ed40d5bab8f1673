use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use ignore::WalkBuilder;

use crate::log::Logger;
use crate::plugin::source::SourceFetcher;
use crate::plugin::state::Plugin;
use crate::remote::{RemoteError, RemoteFs, join_remote};
use crate::{log_error, log_info, log_success};

/// Directory names never mirrored to the remote side.
const VCS_METADATA: [&str; 3] = [".git", ".hg", ".svn"];

/// Deletes `path` and everything below it, children before parents.
pub fn remove_remote_tree(fs: &mut dyn RemoteFs, path: &str) -> Result<(), RemoteError> {
    for entry in fs.list_dir(path)? {
        let child = join_remote(path, &entry.name);
        if entry.is_dir {
            remove_remote_tree(fs, &child)?;
        } else {
            fs.remove_file(&child)?;
        }
    }
    fs.remove_dir(path)
}

/// Mirrors `local_root` onto `remote_root`, skipping VCS metadata.
///
/// Directories that already exist are reused and files are overwritten.
/// Returns the number of files uploaded. A failure part-way leaves a
/// partially mirrored tree.
pub fn upload_local_tree(
    fs: &mut dyn RemoteFs,
    local_root: &Path,
    remote_root: &str,
) -> Result<usize> {
    ensure_remote_dir(fs, remote_root)?;

    let walker = WalkBuilder::new(local_root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            !VCS_METADATA
                .iter()
                .any(|name| entry.file_name() == *name)
        })
        .build();

    let mut uploaded = 0;
    for entry in walker {
        let entry = entry.context("failed to walk local tree")?;
        if entry.depth() == 0 {
            continue;
        }

        let relative = entry.path().strip_prefix(local_root)?;
        let remote_path = remote_path_for(remote_root, relative)?;
        let Some(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            ensure_remote_dir(fs, &remote_path)?;
        } else if file_type.is_file() {
            let contents = std::fs::read(entry.path())
                .with_context(|| format!("failed to read {}", entry.path().display()))?;
            fs.write_file(&remote_path, &contents)?;
            uploaded += 1;
        }
    }

    Ok(uploaded)
}

fn ensure_remote_dir(fs: &mut dyn RemoteFs, path: &str) -> Result<(), RemoteError> {
    match fs.create_dir(path) {
        Ok(()) | Err(RemoteError::AlreadyExists(_)) => Ok(()),
        Err(err) => Err(err),
    }
}

fn remote_path_for(remote_root: &str, relative: &Path) -> Result<String> {
    relative
        .components()
        .try_fold(remote_root.to_string(), |acc, component| {
            let name = component
                .as_os_str()
                .to_str()
                .ok_or_else(|| anyhow!("non UTF-8 path: {}", relative.display()))?;
            Ok(join_remote(&acc, name))
        })
}

/// Replaces the remote content of a plugin with a fresh checkout.
pub struct DirectorySyncer {
    fetcher: Box<dyn SourceFetcher>,
    logger: Arc<dyn Logger>,
}

impl DirectorySyncer {
    pub fn new(fetcher: Box<dyn SourceFetcher>, logger: Arc<dyn Logger>) -> Self {
        Self { fetcher, logger }
    }

    /// Sets `plugin.updated` on success. Failures are logged, never returned.
    pub fn apply_update(&self, plugin: &mut Plugin, fs: &mut dyn RemoteFs) {
        match self.replace_content(plugin, fs) {
            Ok(uploaded) => {
                plugin.updated = true;
                log_success!(
                    self.logger,
                    "{}: plugin updated ({uploaded} files uploaded)",
                    plugin.name
                );
            }
            Err(err) => {
                plugin.updated = false;
                log_error!(self.logger, "{}: update failed: {err:#}", plugin.name);
            }
        }
    }

    fn replace_content(&self, plugin: &Plugin, fs: &mut dyn RemoteFs) -> Result<usize> {
        // Removed when dropped, whatever the outcome.
        let workspace = tempfile::Builder::new()
            .prefix("sftp-auto-sync-")
            .tempdir()
            .context("failed to create temporary workspace")?;
        let checkout = workspace.path().join(&plugin.name);

        log_info!(self.logger, "{}: fetching source", plugin.name);
        self.fetcher.fetch(&plugin.name, &checkout)?;

        log_info!(self.logger, "{}: removing remote files", plugin.name);
        remove_remote_tree(fs, &plugin.path)
            .with_context(|| format!("failed to clear {}", plugin.path))?;

        log_info!(self.logger, "{}: uploading files", plugin.name);
        upload_local_tree(fs, &checkout, &plugin.path)
            .with_context(|| format!("failed to upload to {}", plugin.path))
    }
}
