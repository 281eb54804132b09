//! Configuration management for sleipnir
//!
//! This crate holds the chain and execution configuration an execution context is built from,
//! along with helpers for loading and saving it as TOML.

/// Well-known chain ids
pub mod chains;

/// Error types for the configuration module
pub mod error;

/// Hard fork definitions used for opcode activation
pub mod hardfork;

use std::path::Path;

use crate::{error::Error, hardfork::HardFork};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The maximum nesting depth of message calls and creations.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// The maximum size of deployed contract code, in bytes.
pub const DEFAULT_MAX_CODE_SIZE: usize = 24576;

/// The [`ChainConfig`] struct describes the chain an execution runs against.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ChainConfig {
    /// The chain id returned by the `CHAINID` opcode
    pub chain_id: u64,

    /// The active hard fork, which gates opcode availability
    pub hardfork: HardFork,
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig { chain_id: chains::MAINNET, hardfork: HardFork::Latest }
    }
}

/// The [`ExecutionConfig`] struct holds the limits applied to a single execution.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Maximum number of simultaneously active frames, counting the top-level frame.
    pub max_call_depth: usize,

    /// Number of opcodes executed between two checks of the cancellation flag. Values below 1
    /// are treated as 1.
    pub abort_check_interval: u64,

    /// Maximum size of deployed contract code, in bytes.
    pub max_code_size: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            abort_check_interval: 1,
            max_code_size: DEFAULT_MAX_CODE_SIZE,
        }
    }
}

/// The [`Configuration`] struct groups every configurable section. Missing keys fall back to
/// their defaults when parsed.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Configuration {
    /// Chain parameters
    pub chain: ChainConfig,

    /// Execution limits
    pub execution: ExecutionConfig,
}

impl Configuration {
    /// Parses a configuration from a TOML document.
    ///
    /// ```
    /// use sleipnir_config::{hardfork::HardFork, Configuration};
    ///
    /// let config = Configuration::from_toml_str(
    ///     "[chain]\nhardfork = \"shanghai\"\n\n[execution]\nmax_call_depth = 64\n",
    /// )
    /// .expect("failed to parse config");
    ///
    /// assert_eq!(config.chain.hardfork, HardFork::Shanghai);
    /// assert_eq!(config.chain.chain_id, 1);
    /// assert_eq!(config.execution.max_call_depth, 64);
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| Error::ParseError(format!("failed to parse config file: {e}")))
    }

    /// Reads the configuration at `path`. If the file doesn't exist, the default configuration
    /// is written there and returned.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        if !path.exists() {
            debug!(path = %path.display(), "config file not found, writing defaults");
            let config = Configuration::default();
            config.save(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Writes the configuration to `path` as TOML, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string(&self)
            .map_err(|e| Error::ParseError(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Update a single key/value pair in the configuration.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), Error> {
        let parse_int = |value: &str| {
            value.trim().parse::<u64>().map_err(|e| {
                Error::ParseError(format!("invalid value for '{key}': '{value}' ({e})"))
            })
        };

        match key {
            "chain_id" => self.chain.chain_id = parse_int(value)?,
            "hardfork" => self.chain.hardfork = value.parse()?,
            "max_call_depth" => self.execution.max_call_depth = parse_int(value)? as usize,
            "abort_check_interval" => self.execution.abort_check_interval = parse_int(value)?,
            "max_code_size" => self.execution.max_code_size = parse_int(value)? as usize,
            _ => {
                return Err(Error::Generic(format!(
                    "invalid key: \'{key}\' is not a valid configuration key."
                )))
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("sleipnir-config-{}-{name}", std::process::id()));
        path.push("config.toml");
        path
    }

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();
        assert_eq!(config.chain.chain_id, chains::MAINNET);
        assert_eq!(config.chain.hardfork, HardFork::Latest);
        assert_eq!(config.execution.max_call_depth, 1024);
        assert_eq!(config.execution.abort_check_interval, 1);
        assert_eq!(config.execution.max_code_size, 24576);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config =
            Configuration::from_toml_str("[execution]\nabort_check_interval = 32\n").expect("parse");
        assert_eq!(config.execution.abort_check_interval, 32);
        assert_eq!(config.execution.max_call_depth, 1024);
        assert_eq!(config.chain, ChainConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Configuration::from_toml_str("[chain]\nhardfork = \"prague\"\n"),
            Err(Error::ParseError(_))
        ));
    }

    #[test]
    fn test_save_and_load_configuration() {
        let path = scratch_path("save");
        let _ = std::fs::remove_file(&path);

        let mut config = Configuration::default();
        config.update("chain_id", "1337").expect("failed to update chain_id");
        config.update("hardfork", "london").expect("failed to update hardfork");
        config.save(&path).expect("failed to save config file");

        let loaded = Configuration::load(&path).expect("failed to load config file");
        assert_eq!(loaded.chain.chain_id, chains::DEVNET);
        assert_eq!(loaded.chain.hardfork, HardFork::London);
        assert_eq!(loaded.execution, ExecutionConfig::default());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_writes_defaults() {
        let path = scratch_path("missing");
        let _ = std::fs::remove_file(&path);

        let config = Configuration::load(&path).expect("failed to load config file");
        assert_eq!(config, Configuration::default());
        assert!(path.exists());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_update_rejects_unknown_key() {
        let mut config = Configuration::default();
        assert!(matches!(config.update("rpc_url", "http://localhost:8545"), Err(Error::Generic(_))));
        assert!(matches!(config.update("max_call_depth", "deep"), Err(Error::ParseError(_))));
    }
}
