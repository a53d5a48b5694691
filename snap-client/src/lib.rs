//! # snap-client
//!
//! Client SDK for the blindsnap encrypted snapshot relay.
//!
//! The broker only ever sees ciphertext. Everything that touches plaintext
//! or private keys lives here.
//!
//! ## Features
//!
//! - **Identity**: ECDSA P-256 keypairs with JWK import/export
//! - **E2E Encryption**: AES-256-GCM, fresh key and IV per snapshot, AAD-bound envelope
//! - **Signing**: ECDSA-SHA256 over canonical JSON
//! - **Upload**: [`SnapshotClient::post_snapshot`] runs encrypt → sign → POST
//! - **Subscribe**: [`subscribe_ws`] streams room notifications to a handler
//!
//! ## Example
//!
//! ```ignore
//! use blindsnap_client::{subscribe_ws, SubscribeOptions, SubscriptionHandler};
//!
//! struct Printer;
//! impl SubscriptionHandler for Printer {
//!     fn on_message(&mut self, message: snap_types::ServerMessage) {
//!         println!("{message:?}");
//!     }
//! }
//!
//! let sub = subscribe_ws(
//!     SubscribeOptions { ws_url: "ws://localhost:8787/ws?room=demo".into(), token: None },
//!     Printer,
//! )
//! .await?;
//! // ...
//! sub.unsubscribe().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod crypto;
pub mod envelope;
pub mod identity;
pub mod keywrap;
pub mod subscribe;

pub use client::{ClientError, PostSnapshot, SnapshotClient, API_KEY_HEADER, API_PREFIX};
pub use crypto::{
    canonical_json, decrypt_bound, decrypt_snapshot, encrypt_snapshot, encrypt_snapshot_with,
    sign_envelope, verify_envelope, CryptoError, EncryptedBlock, IV_SIZE, KEY_SIZE,
};
pub use envelope::{Envelope, SignedEnvelopeRequest, ENVELOPE_VERSION};
pub use identity::{
    generate_identity, import_signing_keys, import_verifying_key, ExportedIdentity, SigningKeys,
};
pub use keywrap::{ClearKey, KeyWrap};
pub use subscribe::{
    subscribe_ws, CloseInfo, SubscribeOptions, Subscription, SubscriptionHandler,
    CLOSE_INTERNAL_ERROR, CLOSE_POLICY_VIOLATION,
};
