//! Engine tunables and the config file loader.
//!
//! Config files may be TOML, RON or JSON, told apart by their extension.
//! Every field has a default, so an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported config format: {file}")]
    UnsupportedFormat { file: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Types
// ===========================================================================

/// What a write to a cell that is currently notifying does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReentrancyPolicy {
    /// Store the value without notifying again.
    #[default]
    Settle,
    /// Fail the write with [`crate::cell::CellError::Reentrant`].
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Nested write depth at which a cascade is aborted.
    pub max_propagation_depth: u32,
    pub reentrancy: ReentrancyPolicy,
    /// Units per second that smooth control bindings move toward their target.
    pub smoothing_rate: f64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            max_propagation_depth: 256,
            reentrancy: ReentrancyPolicy::Settle,
            smoothing_rate: 4.0,
        }
    }
}

// ===========================================================================
// Loading
// ===========================================================================

impl CircuitConfig {
    /// Parse config text with the parser named by `file`'s extension.
    pub fn parse(content: &str, file: &Path) -> Result<Self, ConfigError> {
        let parse_err = |detail: String| ConfigError::Parse {
            file: file.to_path_buf(),
            detail,
        };
        match file.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
            Some("ron") => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
            Some("json") => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat {
                file: file.to_path_buf(),
            }),
        }
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content, path)?;
        tracing::debug!(path = %path.display(), ?config, "loaded circuit config");
        Ok(config)
    }
}
