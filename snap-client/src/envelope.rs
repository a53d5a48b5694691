//! Snapshot envelope protocol.
//!
//! An upload is an unencrypted [`Envelope`] bound to an [`EncryptedBlock`]
//! through the block's AAD, optionally signed as a pair:
//!
//! ```text
//! payload ──encrypt(aad = envelope)──► encrypted
//! sign({envelope, encrypted}) ──────► signature
//! {envelope, encrypted, signature, signer} ──POST──► broker
//! ```

use p256::elliptic_curve::JwkEcKey;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use snap_types::now_millis;

use crate::crypto::{
    decrypt_bound, encrypt_snapshot, sign_envelope, verify_envelope, CryptoError, EncryptedBlock,
};
use crate::identity::{import_verifying_key, SigningKeys};
use crate::keywrap::ClearKey;

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Unencrypted snapshot metadata, bound to its ciphertext via AAD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Format version, currently [`ENVELOPE_VERSION`].
    pub v: u8,
    /// Application-defined snapshot type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Project the snapshot belongs to.
    pub project_id: String,
    /// Client creation time, milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Free-form metadata, visible to the broker and subscribers.
    #[serde(default)]
    pub meta: Value,
}

impl Envelope {
    /// Build an envelope stamped with the current time.
    pub fn new(kind: impl Into<String>, project_id: impl Into<String>, meta: Value) -> Self {
        Self {
            v: ENVELOPE_VERSION,
            kind: kind.into(),
            project_id: project_id.into(),
            created_at: now_millis(),
            meta,
        }
    }
}

/// The portion of an upload covered by the signature.
#[derive(Serialize)]
struct SignedContent<'a> {
    envelope: &'a Envelope,
    encrypted: &'a EncryptedBlock,
}

/// The wire unit posted to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedEnvelopeRequest {
    /// Unencrypted metadata.
    pub envelope: Envelope,
    /// Encrypted payload bound to `envelope`.
    pub encrypted: EncryptedBlock,
    /// Base64url ECDSA signature over `{envelope, encrypted}`, if signed.
    pub signature: Option<String>,
    /// Signer's public JWK, if signed.
    pub signer: Option<JwkEcKey>,
    /// Target room; routing only, not signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

impl SignedEnvelopeRequest {
    /// Encrypt `payload` under `envelope` and sign when a private key is present.
    pub fn seal<P: Serialize + ?Sized>(
        envelope: Envelope,
        payload: &P,
        signing_keys: Option<&SigningKeys>,
    ) -> Result<Self, CryptoError> {
        let encrypted = encrypt_snapshot(payload, &envelope)?;

        let (signature, signer) = match signing_keys {
            Some(keys) => match keys.private_key() {
                Some(private) => {
                    let content = SignedContent {
                        envelope: &envelope,
                        encrypted: &encrypted,
                    };
                    (
                        Some(sign_envelope(&content, private)?),
                        Some(keys.public_jwk().clone()),
                    )
                }
                None => (None, None),
            },
            None => (None, None),
        };

        Ok(Self {
            envelope,
            encrypted,
            signature,
            signer,
            room: None,
        })
    }

    /// Verify the signature against the embedded signer key.
    ///
    /// Unsigned requests verify as `false`.
    pub fn verify(&self) -> Result<bool, CryptoError> {
        let Some(signature) = &self.signature else {
            return Ok(false);
        };
        let signer = self.signer.as_ref().ok_or(CryptoError::MissingSigner)?;
        let public_key = import_verifying_key(signer)?;
        let content = SignedContent {
            envelope: &self.envelope,
            encrypted: &self.encrypted,
        };
        verify_envelope(&content, signature, &public_key)
    }

    /// Decrypt the payload, checking that it is bound to this envelope.
    pub fn open<T: DeserializeOwned>(&self) -> Result<T, CryptoError> {
        decrypt_bound(&self.encrypted, &self.envelope, &ClearKey)
    }

    /// Parse a request from the opaque payload string the broker stores.
    pub fn from_payload(payload: &str) -> Result<Self, CryptoError> {
        Ok(serde_json::from_str(payload)?)
    }
}
