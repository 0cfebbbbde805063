//! Unpredictable tokens drawn from the operating system's CSPRNG.
//!
//! Tokens are raw random bytes carried as URL-safe base64 without padding,
//! so they can be placed in URLs and headers without further escaping.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use tracing::{debug, error};
use zeroize::Zeroizing;

use crate::error::{GatekeeperError, Result};

/// Default token length in bytes (256 bits of entropy).
pub const DEFAULT_TOKEN_LENGTH: usize = 32;

/// Largest token length accepted, in bytes.
pub const MAX_TOKEN_LENGTH: usize = 1024;

/// A validated token length, between 1 and [`MAX_TOKEN_LENGTH`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenLength(usize);

impl TokenLength {
    /// Validates a byte length.
    pub fn new(bytes: usize) -> Result<Self> {
        if bytes == 0 || bytes > MAX_TOKEN_LENGTH {
            return Err(GatekeeperError::InvalidInput(format!(
                "token length must be between 1 and {} bytes, got {}",
                MAX_TOKEN_LENGTH, bytes
            )));
        }
        Ok(Self(bytes))
    }

    /// Returns the length in bytes.
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for TokenLength {
    fn default() -> Self {
        Self(DEFAULT_TOKEN_LENGTH)
    }
}

impl TryFrom<usize> for TokenLength {
    type Error = GatekeeperError;

    fn try_from(bytes: usize) -> Result<Self> {
        Self::new(bytes)
    }
}

impl TryFrom<i64> for TokenLength {
    type Error = GatekeeperError;

    fn try_from(bytes: i64) -> Result<Self> {
        let bytes = usize::try_from(bytes).map_err(|_| {
            GatekeeperError::InvalidInput(format!(
                "token length must be a positive integer, got {}",
                bytes
            ))
        })?;
        Self::new(bytes)
    }
}

/// An opaque random token.
///
/// Holds the raw bytes, wiped on drop, alongside their transport encoding.
/// Comparison is constant-time and `Debug` output is redacted so tokens do
/// not end up in logs by accident.
#[derive(Clone)]
pub struct Token {
    encoded: String,
    bytes: Zeroizing<Vec<u8>>,
}

impl Token {
    fn from_bytes(bytes: Zeroizing<Vec<u8>>) -> Self {
        Self {
            encoded: URL_SAFE_NO_PAD.encode(bytes.as_slice()),
            bytes,
        }
    }

    /// Parses a token previously produced by [`TokenGenerator`].
    ///
    /// Fails with [`GatekeeperError::InvalidInput`] if the text is empty, is
    /// not URL-safe unpadded base64, or decodes to more than
    /// [`MAX_TOKEN_LENGTH`] bytes.
    pub fn parse(encoded: &str) -> Result<Self> {
        if encoded.is_empty() {
            return Err(GatekeeperError::InvalidInput(
                "token must not be empty".to_string(),
            ));
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map(Zeroizing::new)
            .map_err(|e| GatekeeperError::InvalidInput(format!("malformed token: {}", e)))?;
        TokenLength::new(bytes.len())?;
        Ok(Self::from_bytes(bytes))
    }

    /// Returns the URL-safe encoded form.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Consumes the token, returning the encoded form.
    pub fn into_string(self) -> String {
        self.encoded
    }

    /// Number of random bytes in the token.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Borrows the raw token bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies out the raw token bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.bytes.as_slice().ct_eq(other.bytes.as_slice()))
    }
}

impl Eq for Token {}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("byte_len", &self.byte_len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Generates tokens from the operating system's secure random source.
///
/// The generator holds no RNG state of its own: every call reads fresh
/// entropy from the OS, so it is safe to share across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenGenerator {
    default_length: TokenLength,
}

impl TokenGenerator {
    /// Creates a generator with a custom default length.
    pub fn new(default_length: usize) -> Result<Self> {
        let default_length = TokenLength::new(default_length).map_err(|_| {
            GatekeeperError::InvalidConfiguration(format!(
                "default token length must be between 1 and {} bytes, got {}",
                MAX_TOKEN_LENGTH, default_length
            ))
        })?;
        Ok(Self { default_length })
    }

    /// Returns the default token length in bytes.
    pub fn default_length(&self) -> usize {
        self.default_length.get()
    }

    /// Generates a token of `byte_length` random bytes.
    pub fn generate<L>(&self, byte_length: L) -> Result<Token>
    where
        L: TryInto<TokenLength, Error = GatekeeperError>,
    {
        let length = byte_length.try_into()?;
        self.generate_with(length)
    }

    /// Generates a token of the default length.
    pub fn generate_default(&self) -> Result<Token> {
        self.generate_with(self.default_length)
    }

    fn generate_with(&self, length: TokenLength) -> Result<Token> {
        let mut bytes = Zeroizing::new(vec![0u8; length.get()]);
        OsRng.try_fill_bytes(bytes.as_mut_slice()).map_err(|e| {
            error!(error = %e, "Operating system entropy source failed");
            GatekeeperError::AlgorithmUnavailable(format!(
                "operating system entropy source failed: {}",
                e
            ))
        })?;

        let token = Token::from_bytes(bytes);

        debug!(byte_len = length.get(), "Generated token");
        Ok(token)
    }
}

/// Generates a token of `byte_length` bytes with a default generator.
pub fn generate_token(byte_length: usize) -> Result<Token> {
    TokenGenerator::default().generate(byte_length)
}

/// Probability that at least two of `count` tokens of `byte_length` bytes
/// collide.
///
/// Uses the birthday bound `1 - exp(-n(n-1) / 2^(8L+1))`. For 32-byte tokens
/// the result is indistinguishable from zero for any realistic `count`; for
/// a 4-byte token it passes 50% after roughly 77,000 tokens.
pub fn collision_probability(byte_length: usize, count: u64) -> f64 {
    if byte_length == 0 {
        return if count > 1 { 1.0 } else { 0.0 };
    }
    if count < 2 {
        return 0.0;
    }

    let bits = byte_length.saturating_mul(8).min(i32::MAX as usize) as i32;
    let space = 2f64.powi(bits);
    let n = count as f64;
    let exponent = n * (n - 1.0) / (2.0 * space);
    -(-exponent).exp_m1()
}
