//! Configuration management for the gatekeeper CLI.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/gatekeeper/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gatekeeper::{
    AllowedRoot, CredentialHasher, DigestEncoding, Gatekeeper, HashAlgorithm, PathGuard,
    TokenGenerator, TokenLength, DEFAULT_TOKEN_LENGTH, MAX_TOKEN_LENGTH,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("allowed_root must not be empty")]
    EmptyAllowedRoot,

    #[error("allowed_root must be an absolute path, got {0}")]
    RelativeAllowedRoot(String),

    #[error("default_length must be between 1 and {max} bytes, got {got}")]
    InvalidTokenLength { got: usize, max: usize },

    #[error("hash algorithm rejected: {0}")]
    UnsupportedAlgorithm(String),

    #[error("encoding must be one of: base64, hex; got {0}")]
    InvalidEncoding(String),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A configuration value replaced from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOverride {
    pub variable: &'static str,
    pub value: String,
}

/// Main configuration structure for the gatekeeper CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Path confinement settings.
    pub paths: PathsConfig,

    /// Token generation settings.
    pub tokens: TokenConfig,

    /// Credential hashing settings.
    pub hashing: HashingConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Path confinement settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// The directory requested file names are confined to.
    pub allowed_root: PathBuf,

    /// Resolve symlinks in `allowed_root` once at startup.
    pub canonicalize: bool,
}

/// Token generation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TokenConfig {
    /// Token length in bytes when none is requested.
    pub default_length: usize,
}

/// Credential hashing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HashingConfig {
    /// Hash algorithm name (sha256, sha384, sha512).
    pub algorithm: String,

    /// Digest text encoding (base64, hex).
    pub encoding: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Directory for daily rolling log files. Console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            allowed_root: default_allowed_root(),
            canonicalize: false,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            default_length: DEFAULT_TOKEN_LENGTH,
        }
    }
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default().name().to_string(),
            encoding: DigestEncoding::default().name().to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            directory: None,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gatekeeper")
        .join("config.toml")
}

/// Returns the default allowed root.
fn default_allowed_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("gatekeeper")
        .join("files")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values; empty
    /// values are ignored. Returns the overrides that were applied so the
    /// caller can log them once tracing is up.
    ///
    /// Supported variables:
    /// - GATEKEEPER_ALLOWED_ROOT: Override the allowed root directory
    /// - GATEKEEPER_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - GATEKEEPER_HASH_ALGORITHM: Override the hash algorithm
    pub fn apply_env_overrides(&mut self) -> Vec<EnvOverride> {
        let mut applied = Vec::new();

        if let Some(root) = env_value("GATEKEEPER_ALLOWED_ROOT", &mut applied) {
            self.paths.allowed_root = PathBuf::from(root);
        }

        if let Some(level) = env_value("GATEKEEPER_LOG_LEVEL", &mut applied) {
            self.logging.log_level = level;
        }

        if let Some(algorithm) = env_value("GATEKEEPER_HASH_ALGORITHM", &mut applied) {
            self.hashing.algorithm = algorithm;
        }

        applied
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_paths()?;
        self.validate_tokens()?;
        self.validate_hashing()?;
        self.validate_logging()
    }

    /// Validate the `[paths]` section.
    pub fn validate_paths(&self) -> Result<(), ConfigError> {
        let root = &self.paths.allowed_root;
        if root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyAllowedRoot);
        }
        if !root.is_absolute() {
            return Err(ConfigError::RelativeAllowedRoot(
                root.display().to_string(),
            ));
        }
        Ok(())
    }

    /// Validate the `[tokens]` section.
    pub fn validate_tokens(&self) -> Result<(), ConfigError> {
        if TokenLength::new(self.tokens.default_length).is_err() {
            return Err(ConfigError::InvalidTokenLength {
                got: self.tokens.default_length,
                max: MAX_TOKEN_LENGTH,
            });
        }
        Ok(())
    }

    /// Validate the `[hashing]` section.
    pub fn validate_hashing(&self) -> Result<(), ConfigError> {
        if let Err(e) = self.hashing.algorithm.parse::<HashAlgorithm>() {
            return Err(ConfigError::UnsupportedAlgorithm(e.to_string()));
        }
        if self.hashing.encoding.parse::<DigestEncoding>().is_err() {
            return Err(ConfigError::InvalidEncoding(self.hashing.encoding.clone()));
        }
        Ok(())
    }

    /// Validate the `[logging]` section.
    pub fn validate_logging(&self) -> Result<(), ConfigError> {
        let level = self.logging.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.log_level.clone()));
        }
        Ok(())
    }

    /// Build the path guard for the configured root.
    ///
    /// With `paths.canonicalize` set, the allowed root must exist.
    pub fn build_path_guard(&self) -> gatekeeper::Result<PathGuard> {
        let root = if self.paths.canonicalize {
            AllowedRoot::canonicalize(&self.paths.allowed_root)?
        } else {
            AllowedRoot::new(&self.paths.allowed_root)?
        };
        Ok(PathGuard::new(root))
    }

    /// Build the token generator with the configured default length.
    pub fn build_token_generator(&self) -> gatekeeper::Result<TokenGenerator> {
        TokenGenerator::new(self.tokens.default_length)
    }

    /// Build the credential hasher with the configured algorithm and encoding.
    pub fn build_hasher(&self) -> gatekeeper::Result<CredentialHasher> {
        CredentialHasher::from_names(&self.hashing.algorithm, &self.hashing.encoding)
    }

    /// Build all three components at once.
    pub fn build_gatekeeper(&self) -> gatekeeper::Result<Gatekeeper> {
        Ok(Gatekeeper::new(
            self.build_path_guard()?,
            self.build_token_generator()?,
            self.build_hasher()?,
        ))
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Read a non-empty environment variable and record it as applied.
fn env_value(variable: &'static str, applied: &mut Vec<EnvOverride>) -> Option<String> {
    let value = std::env::var(variable).ok().filter(|v| !v.is_empty())?;
    applied.push(EnvOverride {
        variable,
        value: value.clone(),
    });
    Some(value)
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
