//! Configuration file handling
//!
//! The configuration is an optional TOML file:
//!
//! ```toml
//! key_file = "/home/me/.lockme/key.bin"
//! mode = "gcm"
//! ```
//!
//! Every field is optional. Command-line flags take precedence over values
//! read from the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::blockcrypt::CipherMode;
use crate::error::{ErrorCategory, ErrorKind, LockmeError, Result};
use crate::keyfile::DEFAULT_KEY_FILE;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Path of the key file, relative to the working directory unless absolute
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,

    /// Cipher mode used for both encryption and decryption
    #[serde(default)]
    pub mode: CipherMode,
}

fn default_key_file() -> PathBuf {
    PathBuf::from(DEFAULT_KEY_FILE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_file: default_key_file(),
            mode: CipherMode::default(),
        }
    }
}

impl Config {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            LockmeError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::InvalidConfig,
                "invalid configuration",
                e,
            )
        })
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            LockmeError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Io,
                format!("failed to read config file {}", path.display()),
                e,
            )
        })?;
        let config = Self::from_toml(&text)
            .map_err(|e| e.with_context(format!("failed to load {}", path.display())))?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line overrides on top of this configuration.
    pub fn with_overrides(mut self, key_file: Option<PathBuf>, mode: Option<CipherMode>) -> Self {
        if let Some(key_file) = key_file {
            self.key_file = key_file;
        }
        if let Some(mode) = mode {
            self.mode = mode;
        }
        self
    }
}
