//! A single value bundling the three gatekeeper components.

use std::path::Path;

use crate::credential::{CredentialHasher, Digest};
use crate::error::Result;
use crate::path_guard::{AllowedRoot, PathGuard, ResolvedPath};
use crate::token::{Token, TokenGenerator};

/// Path confinement, token generation and credential hashing behind one
/// handle.
///
/// All state is fixed at construction and never mutated, so a `Gatekeeper`
/// can be cloned freely or shared behind an `Arc` across threads and tasks.
/// The components stay independent: each method delegates to exactly one.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    guard: PathGuard,
    tokens: TokenGenerator,
    hasher: CredentialHasher,
}

impl Gatekeeper {
    /// Creates a gatekeeper from explicitly configured components.
    pub fn new(guard: PathGuard, tokens: TokenGenerator, hasher: CredentialHasher) -> Self {
        Self {
            guard,
            tokens,
            hasher,
        }
    }

    /// Creates a gatekeeper for `root` with default token and hash settings.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Result<Self> {
        Ok(Self::new(
            PathGuard::new(AllowedRoot::new(root)?),
            TokenGenerator::default(),
            CredentialHasher::default(),
        ))
    }

    /// The path guard.
    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    /// The token generator.
    pub fn tokens(&self) -> &TokenGenerator {
        &self.tokens
    }

    /// The credential hasher.
    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    /// See [`PathGuard::resolve`].
    pub fn resolve(&self, requested: &str) -> Result<ResolvedPath> {
        self.guard.resolve(requested)
    }

    /// See [`PathGuard::resolve_existing`].
    pub fn resolve_existing(&self, requested: &str) -> Result<ResolvedPath> {
        self.guard.resolve_existing(requested)
    }

    /// Generates a token of `byte_length` bytes.
    pub fn generate(&self, byte_length: usize) -> Result<Token> {
        self.tokens.generate(byte_length)
    }

    /// Generates a token of the configured default length.
    pub fn generate_default(&self) -> Result<Token> {
        self.tokens.generate_default()
    }

    /// See [`CredentialHasher::hash`].
    pub fn hash(&self, secret: &str) -> Result<Digest> {
        self.hasher.hash(secret)
    }

    /// See [`CredentialHasher::verify`].
    pub fn verify(&self, secret: &str, expected: &Digest) -> Result<bool> {
        self.hasher.verify(secret, expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{DigestEncoding, HashAlgorithm};
    use crate::error::{GatekeeperError, Violation};

    #[test]
    fn test_with_root_defaults() {
        let gatekeeper = Gatekeeper::with_root("/app/data").unwrap();
        assert_eq!(gatekeeper.guard().root().as_path(), Path::new("/app/data"));
        assert_eq!(gatekeeper.tokens().default_length(), 32);
        assert_eq!(gatekeeper.hasher().algorithm(), HashAlgorithm::Sha256);
    }

    #[test]
    fn test_with_empty_root_fails() {
        let err = Gatekeeper::with_root("").unwrap_err();
        assert!(matches!(err, GatekeeperError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_delegation() {
        let gatekeeper = Gatekeeper::new(
            PathGuard::from_path("/srv/files").unwrap(),
            TokenGenerator::new(16).unwrap(),
            CredentialHasher::new(HashAlgorithm::Sha512, DigestEncoding::Hex),
        );

        let resolved = gatekeeper.resolve("a.txt").unwrap();
        assert_eq!(resolved.as_path(), Path::new("/srv/files/a.txt"));
        assert_eq!(
            gatekeeper.resolve("../a.txt").unwrap_err().violation(),
            Some(Violation::PathTraversal)
        );

        assert_eq!(gatekeeper.generate_default().unwrap().byte_len(), 16);
        assert_eq!(gatekeeper.generate(8).unwrap().byte_len(), 8);

        let digest = gatekeeper.hash("secret").unwrap();
        assert_eq!(digest.algorithm(), HashAlgorithm::Sha512);
        assert_eq!(digest.as_str().len(), 128);
        assert!(gatekeeper.verify("secret", &digest).unwrap());
    }

    #[test]
    fn test_gatekeeper_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Gatekeeper>();
        assert_send_sync::<PathGuard>();
        assert_send_sync::<TokenGenerator>();
        assert_send_sync::<CredentialHasher>();
    }
}
