//! SnapshotClient - HTTP access to a blindsnap broker.
//!
//! Uploads go through [`SnapshotClient::post_snapshot`], which runs the full
//! envelope protocol: build envelope, encrypt, sign, POST.
//!
//! # Example
//!
//! ```ignore
//! use blindsnap_client::{generate_identity, import_signing_keys, PostSnapshot, SnapshotClient};
//!
//! let keys = import_signing_keys(&generate_identity())?;
//! let client = SnapshotClient::new("http://localhost:8787", Some("secret".into()));
//! let created = client
//!     .post_snapshot(PostSnapshot {
//!         project_id: "proj-1",
//!         kind: "snapshot",
//!         payload: &serde_json::json!({"msg": "hello"}),
//!         signing_keys: Some(&keys),
//!         meta: serde_json::json!({}),
//!         room: Some("demo"),
//!     })
//!     .await?;
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value;
use snap_types::{CreateSnapshotResponse, HealthResponse, RoomsResponse, SnapshotId, SnapshotRecord};
use thiserror::Error;

use crate::crypto::CryptoError;
use crate::envelope::{Envelope, SignedEnvelopeRequest};
use crate::identity::SigningKeys;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Path prefix under which the SDK addresses the broker.
pub const API_PREFIX: &str = "/api/v1";

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Broker answered with a non-2xx status.
    #[error("request failed with status {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// WebSocket failure.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A server frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The subscription has already shut down.
    #[error("subscription closed")]
    Closed,
}

/// Arguments for [`SnapshotClient::post_snapshot`].
#[derive(Debug, Clone)]
pub struct PostSnapshot<'a> {
    /// Project the snapshot belongs to.
    pub project_id: &'a str,
    /// Application-defined snapshot type.
    pub kind: &'a str,
    /// Plaintext payload; serialized as JSON before encryption.
    pub payload: &'a Value,
    /// Keys to sign with. Unsigned if `None` or if no private key is loaded.
    pub signing_keys: Option<&'a SigningKeys>,
    /// Unencrypted metadata carried in the envelope.
    pub meta: Value,
    /// Target room (broker default when `None`).
    pub room: Option<&'a str>,
}

impl PostSnapshot<'_> {
    /// Run the envelope protocol without touching the network.
    pub fn seal(&self) -> Result<SignedEnvelopeRequest, CryptoError> {
        let envelope = Envelope::new(self.kind, self.project_id, self.meta.clone());
        let mut request = SignedEnvelopeRequest::seal(envelope, self.payload, self.signing_keys)?;
        request.room = self.room.map(str::to_string);
        Ok(request)
    }
}

/// HTTP client for a single broker.
#[derive(Debug, Clone)]
pub struct SnapshotClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl SnapshotClient {
    /// Create a client for the broker at `base_url`.
    ///
    /// No timeout is configured; use [`SnapshotClient::with_http`] to supply
    /// a `reqwest::Client` carrying the caller's timeout policy.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url, token)
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            token,
        }
    }

    /// Broker base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Encrypt, sign, and upload a snapshot.
    ///
    /// Fails closed: no retry, and any non-2xx status becomes
    /// [`ClientError::Http`] carrying the status and body text.
    pub async fn post_snapshot(
        &self,
        opts: PostSnapshot<'_>,
    ) -> Result<CreateSnapshotResponse, ClientError> {
        let request = opts.seal()?;
        let url = format!("{}{}/snapshots", self.base_url, API_PREFIX);

        let mut builder = self.http.post(&url).json(&request);
        if let Some(token) = &self.token {
            builder = builder.header(API_KEY_HEADER, token);
        }

        tracing::debug!(
            "Posting snapshot: project={} type={} signed={}",
            request.envelope.project_id,
            request.envelope.kind,
            request.signature.is_some()
        );
        let response = builder.send().await?;
        read_json(response).await
    }

    /// Fetch a full record (ciphertext included).
    pub async fn get_snapshot(&self, id: &SnapshotId) -> Result<SnapshotRecord, ClientError> {
        let url = format!("{}{}/snapshots/{}", self.base_url, API_PREFIX, id);
        let response = self.http.get(&url).send().await?;
        read_json(response).await
    }

    /// List active room names.
    pub async fn rooms(&self) -> Result<RoomsResponse, ClientError> {
        let response = self.http.get(format!("{}/rooms", self.base_url)).send().await?;
        read_json(response).await
    }

    /// Probe broker health.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.http.get(format!("{}/health", self.base_url)).send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{generate_identity, import_signing_keys};
    use serde_json::json;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = SnapshotClient::new("http://localhost:8787/", None);
        assert_eq!(client.base_url(), "http://localhost:8787");
    }

    #[test]
    fn seal_builds_signed_request_with_room() {
        let keys = import_signing_keys(&generate_identity()).unwrap();
        let payload = json!({"msg": "hello"});
        let opts = PostSnapshot {
            project_id: "proj-1",
            kind: "snapshot",
            payload: &payload,
            signing_keys: Some(&keys),
            meta: json!({"tag": "x"}),
            room: Some("demo"),
        };

        let request = opts.seal().unwrap();
        assert_eq!(request.room.as_deref(), Some("demo"));
        assert_eq!(request.envelope.kind, "snapshot");
        assert_eq!(request.envelope.meta, json!({"tag": "x"}));
        assert!(request.verify().unwrap());
    }

    #[test]
    fn http_error_message_has_status_and_body() {
        let err = ClientError::Http {
            status: 401,
            body: r#"{"error":"unauthorized"}"#.into(),
        };
        let text = err.to_string();
        assert!(text.contains("401"));
        assert!(text.contains("unauthorized"));
    }

    #[tokio::test]
    async fn unreachable_broker_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let client = SnapshotClient::new("http://127.0.0.1:9", None);
        let payload = json!(1);
        let result = client
            .post_snapshot(PostSnapshot {
                project_id: "p",
                kind: "snapshot",
                payload: &payload,
                signing_keys: None,
                meta: json!({}),
                room: None,
            })
            .await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }
}
