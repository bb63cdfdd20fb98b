use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

/// How [`Document::clone_repository`](crate::model::Document::clone_repository)
/// treats the source repository's path tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryCloneMode {
    /// Only the name is duplicated; the clone starts with an empty tree.
    #[default]
    NameOnly,
    /// Every rule in the source tree is re-created at the same path in the clone.
    WithRules,
}

/// What happens when a group membership would make a group a member of itself,
/// directly or through other groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Refuse the membership with an invalid-argument failure.
    #[default]
    Reject,
    /// Accept it; resolving cyclic groups is left to the caller.
    Allow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentConfig {
    #[serde(default)]
    pub repository_clone: RepositoryCloneMode,
    #[serde(default)]
    pub membership_cycles: CyclePolicy,
}

impl DocumentConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load a config from a TOML file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_toml = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&config_toml)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            ?config,
            "loaded document config"
        );
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
