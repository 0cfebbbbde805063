//! Error types for the gatekeeper crate.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The specific kind of sandbox escape that was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    /// The requested name contains `..` or a path separator.
    PathTraversal,
    /// The requested name contains a NUL byte.
    NulByte,
    /// The normalized result does not sit under the allowed root.
    OutsideAllowedDirectory,
    /// The path exists on disk but a symlink takes it outside the root.
    SymlinkEscape,
}

impl Violation {
    /// Short, stable description suitable for alerting.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PathTraversal => "path traversal detected",
            Self::NulByte => "nul byte in requested name",
            Self::OutsideAllowedDirectory => "outside allowed directory",
            Self::SymlinkEscape => "symlink escapes allowed directory",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gatekeeper error type covering all possible failure modes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatekeeperError {
    /// A caller-supplied argument is missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A request tried to escape the sandbox root.
    #[error("security violation: {0}")]
    SecurityViolation(Violation),

    /// A required cryptographic primitive is missing or forbidden.
    #[error("algorithm unavailable: {0}")]
    AlgorithmUnavailable(String),

    /// A value fixed at construction time is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Filesystem access failed while checking a path on disk.
    #[error("I/O error at {}: {message}", path.display())]
    Io {
        /// The path being inspected.
        path: PathBuf,
        /// The underlying error message.
        message: String,
    },
}

impl GatekeeperError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Whether this error signals a potential attack rather than a bug.
    pub fn is_security_violation(&self) -> bool {
        matches!(self, Self::SecurityViolation(_))
    }

    /// Whether this error means the deployment itself is unusable.
    ///
    /// Fatal errors should abort startup or fail a health check; they are
    /// never degraded to a weaker fallback.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AlgorithmUnavailable(_) | Self::InvalidConfiguration(_)
        )
    }

    /// The violation kind, if this is a security violation.
    pub fn violation(&self) -> Option<Violation> {
        match self {
            Self::SecurityViolation(v) => Some(*v),
            _ => None,
        }
    }
}

/// Result type alias for gatekeeper operations.
pub type Result<T> = std::result::Result<T, GatekeeperError>;
