//! Cryptographic primitives for blindsnap snapshots.
//!
//! This module provides:
//! - AES-256-GCM encryption with a fresh key and 96-bit IV per snapshot
//! - AAD binding of ciphertext to its unencrypted context
//! - SHA-256 content digests, stable across re-encryption
//! - ECDSA P-256 signing over canonical JSON
//!
//! # Security Notes
//!
//! - Every call to [`encrypt_snapshot`] draws a new key and IV; nothing is reused.
//! - With the default [`ClearKey`] strategy the AES key travels next to the
//!   ciphertext. Anyone holding the [`EncryptedBlock`] can decrypt it. Swap in
//!   another [`KeyWrap`] via [`encrypt_snapshot_with`] to close that gap.
//! - Decryption either returns the full verified plaintext or an error.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use p256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey, VerifyingKey,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::keywrap::{ClearKey, KeyWrap};

/// IV size for AES-GCM (96 bits = 12 bytes).
pub const IV_SIZE: usize = 12;

/// Key size for AES-256-GCM (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// Current [`EncryptedBlock`] format version.
pub const BLOCK_VERSION: u8 = 1;

/// Crypto errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material could not be parsed.
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Public and private JWK describe different keys.
    #[error("public key does not match private key")]
    KeyMismatch,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// A base64url field could not be decoded.
    #[error("invalid base64url in field `{field}`")]
    InvalidEncoding {
        /// Name of the offending field.
        field: &'static str,
    },

    /// Signature bytes are not a valid P-256 signature encoding.
    #[error("malformed signature")]
    MalformedSignature,

    /// Block version is not understood.
    #[error("unsupported block version: {0}")]
    UnsupportedVersion(u8),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (authentication error).
    #[error("decryption failed: authentication error")]
    DecryptionFailed,

    /// Decrypted plaintext does not match the recorded digest.
    #[error("plaintext digest mismatch")]
    DigestMismatch,

    /// A signature is present but no signer key accompanies it.
    #[error("signature present without signer key")]
    MissingSigner,

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A versioned, self-describing AES-256-GCM ciphertext.
///
/// All binary fields are base64url without padding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlock {
    /// Format version, currently [`BLOCK_VERSION`].
    pub v: u8,
    /// 96-bit IV.
    pub iv: String,
    /// Per-snapshot AES key as produced by the key-wrap strategy.
    pub key: String,
    /// Additional authenticated data (canonical JSON of the context).
    pub aad: String,
    /// Ciphertext with GCM tag appended.
    pub ct: String,
    /// SHA-256 of the plaintext.
    pub sha256: String,
}

/// Encrypt `payload` as JSON, binding it to `aad`, with the clear-key strategy.
pub fn encrypt_snapshot<P, A>(payload: &P, aad: &A) -> Result<EncryptedBlock, CryptoError>
where
    P: Serialize + ?Sized,
    A: Serialize + ?Sized,
{
    encrypt_snapshot_with(payload, aad, &ClearKey)
}

/// Encrypt `payload` as JSON, binding it to `aad`, wrapping the key with `wrap`.
pub fn encrypt_snapshot_with<P, A>(
    payload: &P,
    aad: &A,
    wrap: &dyn KeyWrap,
) -> Result<EncryptedBlock, CryptoError>
where
    P: Serialize + ?Sized,
    A: Serialize + ?Sized,
{
    let plaintext = Zeroizing::new(serde_json::to_vec(payload)?);
    let aad = canonical_json(aad)?;

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    getrandom::getrandom(&mut key[..]).expect("getrandom failed");
    let mut iv = [0u8; IV_SIZE];
    getrandom::getrandom(&mut iv).expect("getrandom failed");

    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let ct = cipher
        .encrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: &plaintext,
                aad: &aad,
            },
        )
        .map_err(|_| CryptoError::EncryptionFailed("aead encrypt failed".into()))?;

    Ok(EncryptedBlock {
        v: BLOCK_VERSION,
        iv: b64(&iv),
        key: wrap.wrap_key(&key[..])?,
        aad: b64(&aad),
        ct: b64(&ct),
        sha256: b64(&sha256(&plaintext)),
    })
}

/// Decrypt a clear-key block using its own recorded AAD.
pub fn decrypt_snapshot<T: DeserializeOwned>(block: &EncryptedBlock) -> Result<T, CryptoError> {
    let aad = b64_decode(&block.aad, "aad")?;
    let plaintext = open_block(block, &aad, &ClearKey)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Decrypt a block against a caller-supplied AAD context.
///
/// The context is re-serialized canonically, so any field that differs from
/// what was bound at encryption time fails GCM tag verification.
pub fn decrypt_bound<T, A>(
    block: &EncryptedBlock,
    aad: &A,
    wrap: &dyn KeyWrap,
) -> Result<T, CryptoError>
where
    T: DeserializeOwned,
    A: Serialize + ?Sized,
{
    let aad = canonical_json(aad)?;
    let plaintext = open_block(block, &aad, wrap)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Decrypt and digest-check a block, returning raw plaintext bytes.
pub fn open_block(
    block: &EncryptedBlock,
    aad: &[u8],
    wrap: &dyn KeyWrap,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if block.v != BLOCK_VERSION {
        return Err(CryptoError::UnsupportedVersion(block.v));
    }

    let key = wrap.unwrap_key(&block.key)?;
    if key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: key.len(),
        });
    }
    let iv = b64_decode(&block.iv, "iv")?;
    if iv.len() != IV_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: IV_SIZE,
            actual: iv.len(),
        });
    }
    let ct = b64_decode(&block.ct, "ct")?;
    let expected_digest = b64_decode(&block.sha256, "sha256")?;

    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::DecryptionFailed)?;
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(&iv), Payload { msg: &ct, aad })
            .map_err(|_| CryptoError::DecryptionFailed)?,
    );

    if sha256(&plaintext).as_slice() != expected_digest.as_slice() {
        return Err(CryptoError::DigestMismatch);
    }
    Ok(plaintext)
}

/// Sign the canonical JSON form of `value` with ECDSA P-256 / SHA-256.
///
/// Returns the 64-byte `r || s` signature as base64url.
pub fn sign_envelope<T: Serialize + ?Sized>(
    value: &T,
    private_key: &SigningKey,
) -> Result<String, CryptoError> {
    let message = canonical_json(value)?;
    let signature: Signature = private_key.sign(&message);
    Ok(b64(&signature.to_bytes()))
}

/// Verify a signature produced by [`sign_envelope`].
///
/// Returns `Ok(false)` for a well-formed signature that does not match.
/// Errors only when the signature or value cannot be decoded.
pub fn verify_envelope<T: Serialize + ?Sized>(
    value: &T,
    signature: &str,
    public_key: &VerifyingKey,
) -> Result<bool, CryptoError> {
    let message = canonical_json(value)?;
    let bytes = b64_decode(signature, "signature")?;
    let signature = Signature::from_slice(&bytes).map_err(|_| CryptoError::MalformedSignature)?;
    Ok(public_key.verify(&message, &signature).is_ok())
}

/// Serialize `value` as JSON with object keys sorted at every depth.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CryptoError> {
    let value = sort_keys(serde_json::to_value(value)?);
    Ok(serde_json::to_vec(&value)?)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub(crate) fn b64(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

pub(crate) fn b64_decode(data: &str, field: &'static str) -> Result<Vec<u8>, CryptoError> {
    URL_SAFE_NO_PAD
        .decode(data)
        .map_err(|_| CryptoError::InvalidEncoding { field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{generate_identity, import_signing_keys};
    use serde_json::json;

    // ===========================================
    // AES-256-GCM Tests
    // ===========================================

    #[test]
    fn identical_content_gets_fresh_key_and_iv() {
        let payload = json!({"msg": "hello"});
        let aad = json!({"type": "snapshot"});

        let a = encrypt_snapshot(&payload, &aad).unwrap();
        let b = encrypt_snapshot(&payload, &aad).unwrap();

        assert_ne!(a.iv, b.iv);
        assert_ne!(a.key, b.key);
        assert_ne!(a.ct, b.ct);
        // Digest is over plaintext, so it is stable
        assert_eq!(a.sha256, b.sha256);
    }

    #[test]
    fn block_field_sizes() {
        let block = encrypt_snapshot(&json!({"msg": "hello"}), &json!({})).unwrap();
        assert_eq!(block.v, 1);
        assert_eq!(b64_decode(&block.iv, "iv").unwrap().len(), IV_SIZE);
        assert_eq!(b64_decode(&block.key, "key").unwrap().len(), KEY_SIZE);
        assert_eq!(b64_decode(&block.sha256, "sha256").unwrap().len(), 32);
        assert_eq!(b64_decode(&block.aad, "aad").unwrap(), b"{}");
    }

    #[test]
    fn block_decrypts_to_original() {
        let payload = json!({"msg": "hello", "n": [1, 2, 3]});
        let block = encrypt_snapshot(&payload, &json!({"type": "snapshot"})).unwrap();
        let restored: Value = decrypt_snapshot(&block).unwrap();
        assert_eq!(restored, payload);
    }

    #[test]
    fn aad_context_mismatch_fails() {
        let block =
            encrypt_snapshot(&json!({"msg": "hello"}), &json!({"type": "snapshot"})).unwrap();

        let same: Value = decrypt_bound(&block, &json!({"type": "snapshot"}), &ClearKey).unwrap();
        assert_eq!(same, json!({"msg": "hello"}));

        let result: Result<Value, _> = decrypt_bound(&block, &json!({"type": "other"}), &ClearKey);
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn aad_key_order_does_not_matter() {
        let block = encrypt_snapshot(&json!("x"), &json!({"b": 2, "a": 1})).unwrap();
        let restored: Value = decrypt_bound(&block, &json!({"a": 1, "b": 2}), &ClearKey).unwrap();
        assert_eq!(restored, json!("x"));
    }

    #[test]
    fn corrupted_ciphertext_fails_decryption() {
        let mut block = encrypt_snapshot(&json!({"msg": "hello"}), &json!({})).unwrap();
        let mut ct = b64_decode(&block.ct, "ct").unwrap();
        ct[0] ^= 0xFF;
        block.ct = b64(&ct);

        let result: Result<Value, _> = decrypt_snapshot(&block);
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn tampered_digest_fails_loudly() {
        let mut block = encrypt_snapshot(&json!({"msg": "hello"}), &json!({})).unwrap();
        block.sha256 = b64(&[0u8; 32]);

        let result: Result<Value, _> = decrypt_snapshot(&block);
        assert!(matches!(result, Err(CryptoError::DigestMismatch)));
    }

    #[test]
    fn unknown_version_rejected() {
        let mut block = encrypt_snapshot(&json!(1), &json!({})).unwrap();
        block.v = 2;
        let result: Result<Value, _> = decrypt_snapshot(&block);
        assert!(matches!(result, Err(CryptoError::UnsupportedVersion(2))));
    }

    #[test]
    fn bad_base64_is_format_error() {
        let mut block = encrypt_snapshot(&json!(1), &json!({})).unwrap();
        block.iv = "!!!".into();
        let result: Result<Value, _> = decrypt_snapshot(&block);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidEncoding { field: "iv" })
        ));
    }

    // ===========================================
    // ECDSA Tests
    // ===========================================

    #[test]
    fn signature_verifies_with_matching_key() {
        let keys = import_signing_keys(&generate_identity()).unwrap();
        let envelope = json!({"v": 1, "type": "snapshot", "projectId": "p1", "meta": {}});
        let private = keys.private_key().unwrap();

        let sig = sign_envelope(&envelope, private).unwrap();
        assert!(verify_envelope(&envelope, &sig, keys.public_key()).unwrap());
    }

    #[test]
    fn mutated_field_fails_verification() {
        let keys = import_signing_keys(&generate_identity()).unwrap();
        let envelope = json!({"v": 1, "type": "snapshot", "projectId": "p1", "meta": {"a": 1}});
        let sig = sign_envelope(&envelope, keys.private_key().unwrap()).unwrap();

        for (field, replacement) in [
            ("v", json!(2)),
            ("type", json!("other")),
            ("projectId", json!("p2")),
            ("meta", json!({"a": 2})),
        ] {
            let mut mutated = envelope.clone();
            mutated[field] = replacement;
            assert!(
                !verify_envelope(&mutated, &sig, keys.public_key()).unwrap(),
                "mutating {field} should break the signature"
            );
        }
    }

    #[test]
    fn different_keypair_fails_verification() {
        let signer = import_signing_keys(&generate_identity()).unwrap();
        let other = import_signing_keys(&generate_identity()).unwrap();
        let envelope = json!({"v": 1});

        let sig = sign_envelope(&envelope, signer.private_key().unwrap()).unwrap();
        assert!(!verify_envelope(&envelope, &sig, other.public_key()).unwrap());
    }

    #[test]
    fn malformed_signature_is_an_error() {
        let keys = import_signing_keys(&generate_identity()).unwrap();
        let envelope = json!({"v": 1});

        assert!(verify_envelope(&envelope, "not base64 !", keys.public_key()).is_err());
        assert!(matches!(
            verify_envelope(&envelope, &b64(&[1u8; 10]), keys.public_key()),
            Err(CryptoError::MalformedSignature)
        ));
    }

    #[test]
    fn canonical_json_sorts_nested_keys() {
        let value = json!({"b": {"y": 1, "x": 2}, "a": [{"d": 1, "c": 2}]});
        let bytes = canonical_json(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":[{"c":2,"d":1}],"b":{"x":2,"y":1}}"#
        );
    }
}
