//! ECDSA P-256 identities with JWK import and export.
//!
//! The private half never leaves the process that generated it unless the
//! caller persists [`ExportedIdentity::private_jwk`] itself.

use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::elliptic_curve::JwkEcKey;
use p256::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};

use crate::crypto::CryptoError;

/// A keypair exported as JWK.
///
/// `private_jwk` is optional on import so that verify-only keys can be
/// loaded from a signer's public JWK alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedIdentity {
    /// Public key (`kty: EC`, `crv: P-256`, `x`, `y`).
    pub public_jwk: JwkEcKey,
    /// Private key, additionally carrying `d`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_jwk: Option<JwkEcKey>,
}

impl ExportedIdentity {
    /// Parse an exported identity from JSON text.
    pub fn from_json(text: &str) -> Result<Self, CryptoError> {
        serde_json::from_str(text).map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))
    }

    /// Serialize as pretty JSON for storage.
    pub fn to_json_pretty(&self) -> Result<String, CryptoError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Usable key handles rehydrated from JWK.
#[derive(Clone)]
pub struct SigningKeys {
    private_key: Option<SigningKey>,
    public_key: VerifyingKey,
    public_jwk: JwkEcKey,
}

impl SigningKeys {
    /// Signing key, if the private half was imported.
    pub fn private_key(&self) -> Option<&SigningKey> {
        self.private_key.as_ref()
    }

    /// Verification key.
    pub fn public_key(&self) -> &VerifyingKey {
        &self.public_key
    }

    /// Public key as JWK, suitable for the `signer` field of an upload.
    pub fn public_jwk(&self) -> &JwkEcKey {
        &self.public_jwk
    }
}

// Don't leak keys in debug output
impl std::fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeys")
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_jwk", &self.public_jwk.to_string())
            .finish()
    }
}

/// Generate a fresh P-256 keypair and export both halves as JWK.
///
/// No storage or network side effects.
pub fn generate_identity() -> ExportedIdentity {
    let secret = SecretKey::random(&mut rand::rngs::OsRng);
    ExportedIdentity {
        public_jwk: secret.public_key().to_jwk(),
        private_jwk: Some(secret.to_jwk()),
    }
}

/// Rehydrate key handles from exported JWKs.
///
/// # Errors
///
/// [`CryptoError::InvalidKeyFormat`] if either JWK is not a valid P-256 key,
/// [`CryptoError::KeyMismatch`] if the halves belong to different keypairs.
pub fn import_signing_keys(identity: &ExportedIdentity) -> Result<SigningKeys, CryptoError> {
    let public = PublicKey::from_jwk(&identity.public_jwk)
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("public JWK: {e}")))?;

    let private_key = match &identity.private_jwk {
        Some(jwk) => {
            let secret = SecretKey::from_jwk(jwk)
                .map_err(|e| CryptoError::InvalidKeyFormat(format!("private JWK: {e}")))?;
            if secret.public_key() != public {
                return Err(CryptoError::KeyMismatch);
            }
            Some(SigningKey::from(&secret))
        }
        None => None,
    };

    Ok(SigningKeys {
        private_key,
        public_key: VerifyingKey::from(&public),
        public_jwk: identity.public_jwk.clone(),
    })
}

/// Load verify-only keys from a signer's public JWK.
pub fn import_verifying_key(public_jwk: &JwkEcKey) -> Result<VerifyingKey, CryptoError> {
    PublicKey::from_jwk(public_jwk)
        .map(|public| VerifyingKey::from(&public))
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("public JWK: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_identity_is_p256_jwk() {
        let identity = generate_identity();
        let json: serde_json::Value = serde_json::to_value(&identity).unwrap();

        assert_eq!(json["publicJwk"]["kty"], "EC");
        assert_eq!(json["publicJwk"]["crv"], "P-256");
        assert!(json["publicJwk"].get("d").is_none());
        assert!(json["privateJwk"]["d"].is_string());
    }

    #[test]
    fn identities_are_unique() {
        assert_ne!(generate_identity().public_jwk, generate_identity().public_jwk);
    }

    #[test]
    fn export_import_through_json() {
        let identity = generate_identity();
        let text = identity.to_json_pretty().unwrap();
        let parsed = ExportedIdentity::from_json(&text).unwrap();
        let keys = import_signing_keys(&parsed).unwrap();

        assert!(keys.private_key().is_some());
        assert_eq!(keys.public_jwk(), &identity.public_jwk);
    }

    #[test]
    fn public_only_import_has_no_private_key() {
        let mut identity = generate_identity();
        identity.private_jwk = None;
        let keys = import_signing_keys(&identity).unwrap();
        assert!(keys.private_key().is_none());
    }

    #[test]
    fn mismatched_halves_rejected() {
        let a = generate_identity();
        let b = generate_identity();
        let mixed = ExportedIdentity {
            public_jwk: a.public_jwk,
            private_jwk: b.private_jwk,
        };
        assert!(matches!(
            import_signing_keys(&mixed),
            Err(CryptoError::KeyMismatch)
        ));
    }

    #[test]
    fn malformed_jwk_is_format_error() {
        let text = r#"{"publicJwk":{"kty":"EC","crv":"P-256","x":"AAAA","y":"AAAA"}}"#;
        let parsed = ExportedIdentity::from_json(text);
        // Either serde rejects the coordinates or the curve check does
        match parsed {
            Err(CryptoError::InvalidKeyFormat(_)) => {}
            Ok(identity) => assert!(matches!(
                import_signing_keys(&identity),
                Err(CryptoError::InvalidKeyFormat(_))
            )),
            Err(other) => panic!("unexpected error: {other}"),
        }

        assert!(matches!(
            ExportedIdentity::from_json("{\"publicJwk\": 5}"),
            Err(CryptoError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn debug_is_redacted() {
        let keys = import_signing_keys(&generate_identity()).unwrap();
        let debug = format!("{:?}", keys);
        assert!(debug.contains("REDACTED"));
    }
}
