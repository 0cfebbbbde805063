//! One-way hashing of credential material.
//!
//! Digests are deterministic so stored values can be compared by equality.
//! Only SHA-2 family functions are offered; names of broken functions such
//! as MD5 and SHA-1 are refused rather than mapped to a substitute.
//!
//! Note that a single fast hash is not a password KDF: there is no salt and
//! no work factor. Callers storing user passwords should layer a slow,
//! salted derivation on top.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::{GatekeeperError, Result};

/// Hash functions known to be broken. Requests for these fail loudly.
const DEPRECATED_ALGORITHMS: &[&str] = &["md2", "md4", "md5", "sha0", "sha1"];

/// Supported hash functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256, 32-byte output.
    #[default]
    Sha256,
    /// SHA-384, 48-byte output.
    Sha384,
    /// SHA-512, 64-byte output.
    Sha512,
}

impl HashAlgorithm {
    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Output size in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        // A fresh hashing context per call.
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = GatekeeperError;

    /// Accepts `sha256`, `SHA-256`, `sha_256` and so on.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            name if DEPRECATED_ALGORITHMS.contains(&name) => {
                Err(GatekeeperError::AlgorithmUnavailable(format!(
                    "{} is deprecated and not supported",
                    s.trim()
                )))
            }
            _ => Err(GatekeeperError::AlgorithmUnavailable(format!(
                "unknown hash algorithm: {}",
                s.trim()
            ))),
        }
    }
}

/// Textual encoding of a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestEncoding {
    /// Standard base64 with padding.
    #[default]
    Base64,
    /// Lowercase hexadecimal.
    Hex,
}

impl DigestEncoding {
    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Hex => "hex",
        }
    }

    fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Base64 => BASE64.encode(bytes),
            Self::Hex => hex::encode(bytes),
        }
    }

    fn decode(&self, encoded: &str) -> Result<Vec<u8>> {
        let decoded = match self {
            Self::Base64 => BASE64.decode(encoded).map_err(|e| e.to_string()),
            Self::Hex => hex::decode(encoded).map_err(|e| e.to_string()),
        };
        decoded.map_err(|e| {
            GatekeeperError::InvalidInput(format!("malformed {} digest: {}", self.name(), e))
        })
    }
}

impl fmt::Display for DigestEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestEncoding {
    type Err = GatekeeperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(Self::Base64),
            "hex" => Ok(Self::Hex),
            other => Err(GatekeeperError::InvalidInput(format!(
                "unknown digest encoding: {}",
                other
            ))),
        }
    }
}

/// The fixed-size output of hashing a credential.
///
/// Carries the algorithm and encoding that produced it so a stored value can
/// be re-checked later. Equality is constant-time over the digest bytes.
#[derive(Debug, Clone)]
pub struct Digest {
    algorithm: HashAlgorithm,
    encoding: DigestEncoding,
    bytes: Vec<u8>,
    encoded: String,
}

impl Digest {
    fn new(algorithm: HashAlgorithm, encoding: DigestEncoding, bytes: Vec<u8>) -> Self {
        let encoded = encoding.encode(&bytes);
        Self {
            algorithm,
            encoding,
            bytes,
            encoded,
        }
    }

    /// Reconstructs a digest from its stored text form.
    ///
    /// The decoded length must match the algorithm's output size.
    pub fn from_encoded(
        algorithm: HashAlgorithm,
        encoding: DigestEncoding,
        encoded: &str,
    ) -> Result<Self> {
        if encoded.is_empty() {
            return Err(GatekeeperError::InvalidInput(
                "digest must not be empty".to_string(),
            ));
        }
        let bytes = encoding.decode(encoded)?;
        if bytes.len() != algorithm.output_len() {
            return Err(GatekeeperError::InvalidInput(format!(
                "{} digest must be {} bytes, got {}",
                algorithm,
                algorithm.output_len(),
                bytes.len()
            )));
        }
        Ok(Self::new(algorithm, encoding, bytes))
    }

    /// The algorithm that produced this digest.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The textual encoding of this digest.
    pub fn encoding(&self) -> DigestEncoding {
        self.encoding
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded form, for storage.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Consumes the digest, returning the encoded form.
    pub fn into_string(self) -> String {
        self.encoded
    }
}

impl PartialEq for Digest {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm
            && bool::from(self.bytes.as_slice().ct_eq(other.bytes.as_slice()))
    }
}

impl Eq for Digest {}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

/// Computes digests of credential strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CredentialHasher {
    algorithm: HashAlgorithm,
    encoding: DigestEncoding,
}

impl CredentialHasher {
    /// Creates a hasher with an explicit algorithm and encoding.
    pub fn new(algorithm: HashAlgorithm, encoding: DigestEncoding) -> Self {
        Self {
            algorithm,
            encoding,
        }
    }

    /// Creates a hasher from configuration names.
    ///
    /// An unknown or deprecated algorithm is
    /// [`GatekeeperError::AlgorithmUnavailable`]; there is no fallback.
    pub fn from_names(algorithm: &str, encoding: &str) -> Result<Self> {
        Ok(Self::new(algorithm.parse()?, encoding.parse()?))
    }

    /// The configured algorithm.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The configured encoding.
    pub fn encoding(&self) -> DigestEncoding {
        self.encoding
    }

    /// Hashes `secret`.
    pub fn hash(&self, secret: &str) -> Result<Digest> {
        check_secret(secret)?;
        let bytes = self.algorithm.digest(secret.as_bytes());
        debug!(algorithm = %self.algorithm, "Hashed credential");
        Ok(Digest::new(self.algorithm, self.encoding, bytes))
    }

    /// Checks `secret` against a stored digest in constant time.
    ///
    /// The digest's own algorithm is used, so digests produced under an
    /// earlier configuration still verify.
    pub fn verify(&self, secret: &str, expected: &Digest) -> Result<bool> {
        check_secret(secret)?;
        let actual = expected.algorithm.digest(secret.as_bytes());
        Ok(bool::from(actual.as_slice().ct_eq(expected.bytes.as_slice())))
    }

    /// Checks `secret` against a digest stored as text in this hasher's
    /// algorithm and encoding.
    pub fn verify_encoded(&self, secret: &str, encoded: &str) -> Result<bool> {
        let expected = Digest::from_encoded(self.algorithm, self.encoding, encoded)?;
        self.verify(secret, &expected)
    }
}

/// Hashes `secret` with SHA-256, base64-encoded.
pub fn hash_credential(secret: &str) -> Result<Digest> {
    CredentialHasher::default().hash(secret)
}

fn check_secret(secret: &str) -> Result<()> {
    if secret.is_empty() {
        return Err(GatekeeperError::InvalidInput(
            "secret must not be empty".to_string(),
        ));
    }
    Ok(())
}
