//! Key transport strategies for per-snapshot AES keys.
//!
//! The block format carries whatever string the strategy produces in its
//! `key` field. [`ClearKey`] is the only strategy shipped today.

use zeroize::Zeroizing;

use crate::crypto::{b64, b64_decode, CryptoError};

/// How a per-snapshot AES key is carried alongside its ciphertext.
pub trait KeyWrap: Send + Sync {
    /// Short identifier for logs and diagnostics.
    fn alg(&self) -> &'static str;

    /// Wrap a raw AES key for transport.
    fn wrap_key(&self, raw_key: &[u8]) -> Result<String, CryptoError>;

    /// Recover the raw AES key from its transported form.
    fn unwrap_key(&self, wrapped: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

/// Raw key, base64url, no protection.
///
/// Any party that sees the block can decrypt it, the broker included if it
/// chose to look. Use only where the transport itself is trusted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearKey;

impl KeyWrap for ClearKey {
    fn alg(&self) -> &'static str {
        "clear"
    }

    fn wrap_key(&self, raw_key: &[u8]) -> Result<String, CryptoError> {
        Ok(b64(raw_key))
    }

    fn unwrap_key(&self, wrapped: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        b64_decode(wrapped, "key").map(Zeroizing::new)
    }
}
