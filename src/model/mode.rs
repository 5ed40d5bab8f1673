use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Checks and actions a run can enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Structural check: manifest and source entries present.
    Valid,
    /// Ownership check against the configured authors.
    Owned,
    /// Registry-presence lookup. Older configs call it `github`.
    #[serde(alias = "github")]
    Registry,
    /// Content synchronization for targeted plugins.
    Update,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Valid, Mode::Owned, Mode::Registry, Mode::Update];

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Valid => "valid",
            Mode::Owned => "owned",
            Mode::Registry => "registry",
            Mode::Update => "update",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("github") {
            return Ok(Mode::Registry);
        }
        Mode::ALL
            .into_iter()
            .find(|mode| mode.label().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                format!("unknown mode {value:?} (expected valid, owned, registry or update)")
            })
    }
}

/// Which modes a run has enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub valid: bool,
    pub owned: bool,
    pub registry: bool,
    pub update: bool,
}

impl ModeFlags {
    pub fn from_modes(modes: &[Mode]) -> Self {
        Self {
            valid: modes.contains(&Mode::Valid),
            owned: modes.contains(&Mode::Owned),
            registry: modes.contains(&Mode::Registry),
            update: modes.contains(&Mode::Update),
        }
    }

    #[cfg(test)]
    pub fn all() -> Self {
        Self::from_modes(&Mode::ALL)
    }

    /// Registry lookups are needed to classify and to gate updates.
    pub fn needs_registry(&self) -> bool {
        self.registry || self.update
    }
}
