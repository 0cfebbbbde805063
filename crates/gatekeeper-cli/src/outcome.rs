//! Process exit codes and machine-readable command output.

use std::path::PathBuf;

use gatekeeper::{DigestEncoding, GatekeeperError, HashAlgorithm};
use serde::Serialize;

use crate::config::ConfigError;

pub const EXIT_SUCCESS: i32 = 0;
/// Unclassified failure, or a verification mismatch.
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_INVALID_INPUT: i32 = 2;
pub const EXIT_SECURITY_VIOLATION: i32 = 3;
pub const EXIT_ALGORITHM_UNAVAILABLE: i32 = 4;
pub const EXIT_INVALID_CONFIGURATION: i32 = 5;

/// Map a gatekeeper error to its exit code.
pub fn gatekeeper_exit_code(err: &GatekeeperError) -> i32 {
    match err {
        GatekeeperError::InvalidInput(_) => EXIT_INVALID_INPUT,
        GatekeeperError::SecurityViolation(_) => EXIT_SECURITY_VIOLATION,
        GatekeeperError::AlgorithmUnavailable(_) => EXIT_ALGORITHM_UNAVAILABLE,
        GatekeeperError::InvalidConfiguration(_) => EXIT_INVALID_CONFIGURATION,
        GatekeeperError::Io { .. } => EXIT_FAILURE,
    }
}

/// Map any error returned by a command to its exit code.
///
/// Context added with `anyhow` does not hide the underlying error kind.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(err) = err.downcast_ref::<GatekeeperError>() {
        return gatekeeper_exit_code(err);
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return EXIT_INVALID_CONFIGURATION;
    }
    EXIT_FAILURE
}

/// Short machine-readable error kind.
pub fn error_kind(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<GatekeeperError>() {
        Some(GatekeeperError::InvalidInput(_)) => "invalid_input",
        Some(GatekeeperError::SecurityViolation(_)) => "security_violation",
        Some(GatekeeperError::AlgorithmUnavailable(_)) => "algorithm_unavailable",
        Some(GatekeeperError::InvalidConfiguration(_)) => "invalid_configuration",
        Some(GatekeeperError::Io { .. }) => "io",
        None if err.downcast_ref::<ConfigError>().is_some() => "invalid_configuration",
        None => "error",
    }
}

#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub requested: String,
    pub path: PathBuf,
    pub relative: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct TokenReport {
    pub byte_length: usize,
    pub tokens: Vec<String>,
    /// Chance that any two of `tokens` collide.
    pub collision_probability: f64,
}

#[derive(Debug, Serialize)]
pub struct DigestReport {
    pub algorithm: HashAlgorithm,
    pub encoding: DigestEncoding,
    pub digest: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub algorithm: HashAlgorithm,
    pub matches: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
    pub exit_code: i32,
}

impl ErrorReport {
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            kind: error_kind(err),
            message: format!("{:#}", err),
            exit_code: exit_code(err),
        }
    }
}
