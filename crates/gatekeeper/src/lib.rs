//! # Gatekeeper
//!
//! Small, stateless primitives with real security invariants:
//!
//! - **Path confinement**: resolve a caller-supplied file name under a fixed
//!   root, rejecting anything that could escape it
//! - **Secure tokens**: fixed-length random tokens from the OS CSPRNG,
//!   URL-safe base64 encoded
//! - **Credential hashing**: deterministic SHA-2 digests for storage and
//!   constant-time comparison
//!
//! The three components are independent. Each can be used through a free
//! function, through its own type, or through the [`Gatekeeper`] facade.
//!
//! ## Example Usage
//!
//! ```rust
//! use gatekeeper::{Gatekeeper, GatekeeperError, Violation};
//!
//! let gatekeeper = Gatekeeper::with_root("/app/data").unwrap();
//!
//! let path = gatekeeper.resolve("report.csv").unwrap();
//! assert_eq!(path.to_string(), "/app/data/report.csv");
//!
//! let err = gatekeeper.resolve("../../etc/passwd").unwrap_err();
//! assert_eq!(err, GatekeeperError::SecurityViolation(Violation::PathTraversal));
//!
//! let token = gatekeeper.generate(32).unwrap();
//! assert_eq!(token.to_bytes().len(), 32);
//!
//! let digest = gatekeeper.hash("password123").unwrap();
//! assert!(gatekeeper.verify("password123", &digest).unwrap());
//! ```
//!
//! ## Modules
//!
//! - [`path_guard`]: allowed roots and path resolution
//! - [`token`]: token generation and collision estimates
//! - [`credential`]: hash algorithms, digests and verification
//! - [`service`]: the [`Gatekeeper`] facade
//! - [`error`]: error types

pub mod credential;
pub mod error;
pub mod path_guard;
pub mod service;
pub mod token;

pub use credential::{hash_credential, CredentialHasher, Digest, DigestEncoding, HashAlgorithm};
pub use error::{GatekeeperError, Result, Violation};
pub use path_guard::{resolve_path, AllowedRoot, PathGuard, ResolvedPath};
pub use service::Gatekeeper;
pub use token::{
    collision_probability, generate_token, Token, TokenGenerator, TokenLength,
    DEFAULT_TOKEN_LENGTH, MAX_TOKEN_LENGTH,
};
