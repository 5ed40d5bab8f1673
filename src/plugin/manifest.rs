use std::collections::BTreeSet;

use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;

use crate::remote::{RemoteError, RemoteFs};

/// Conventional manifest file name inside a plugin directory.
pub const MANIFEST_FILE: &str = "plugin.yml";
/// Conventional source-content entry inside a plugin directory.
pub const SOURCE_DIR: &str = "src";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("cannot read plugin.yml: {0}")]
    Read(#[from] RemoteError),

    #[error("plugin.yml is not valid UTF-8")]
    Encoding,

    #[error("invalid plugin.yml: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// The fields of `plugin.yml` that classification reads. Everything else in
/// the document is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub author: Option<Value>,
    #[serde(default)]
    pub authors: Option<Value>,
}

impl PluginManifest {
    pub fn parse(raw: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn read(fs: &mut dyn RemoteFs, plugin_path: &str) -> Result<Self, ManifestError> {
        let path = crate::remote::join_remote(plugin_path, MANIFEST_FILE);
        let bytes = fs.read_file(&path)?;
        let raw = String::from_utf8(bytes).map_err(|_| ManifestError::Encoding)?;
        Self::parse(&raw)
    }

    pub fn declared_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Union of `author` and `authors`, lower-cased and deduplicated.
    ///
    /// Either field may hold a single string or a list of strings. Other
    /// shapes, and non-string list items, are skipped.
    pub fn authors(&self) -> BTreeSet<String> {
        let mut authors = BTreeSet::new();
        for value in [&self.author, &self.authors].into_iter().flatten() {
            match value {
                Value::String(author) => {
                    authors.insert(author.to_lowercase());
                }
                Value::Sequence(items) => {
                    authors.extend(
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_lowercase),
                    );
                }
                _ => {}
            }
        }
        authors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authors_union_is_case_insensitive_and_deduplicated() {
        let manifest = PluginManifest::parse(
            "name: Shop\nauthor: Alice\nauthors: [alice, BOB]\nversion: 1.0\n",
        )
        .unwrap();

        let authors: Vec<_> = manifest.authors().into_iter().collect();
        assert_eq!(authors, vec!["alice", "bob"]);
        assert_eq!(manifest.declared_name(), Some("Shop"));
    }

    #[test]
    fn test_authors_ignores_non_string_items() {
        let manifest =
            PluginManifest::parse("name: Shop\nauthors:\n  - Carol\n  - 42\n  - {x: 1}\n")
                .unwrap();
        assert_eq!(manifest.authors(), BTreeSet::from(["carol".to_string()]));
    }

    #[test]
    fn test_either_field_accepts_string_or_list() {
        let manifest = PluginManifest::parse("name: Shop\nauthor: [Dave]\n").unwrap();
        assert_eq!(manifest.authors(), BTreeSet::from(["dave".to_string()]));

        let manifest = PluginManifest::parse("name: Shop\nauthors: Erin\n").unwrap();
        assert_eq!(manifest.authors(), BTreeSet::from(["erin".to_string()]));
    }

    #[test]
    fn test_blank_name_is_missing() {
        let manifest = PluginManifest::parse("name: '  '\nauthor: alice\n").unwrap();
        assert_eq!(manifest.declared_name(), None);

        let manifest = PluginManifest::parse("author: alice\n").unwrap();
        assert_eq!(manifest.declared_name(), None);
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        assert!(matches!(
            PluginManifest::parse("name: [unterminated\n"),
            Err(ManifestError::Parse(_))
        ));
    }
}
