//! Fetch a snapshot, optionally verifying and decrypting it.

use anyhow::{Context, Result};
use serde_json::Value;
use snap_client::{SignedEnvelopeRequest, SnapshotClient};
use snap_types::SnapshotId;

/// Run the get command.
///
/// Without `open`, prints the stored record as the broker returns it. With
/// `open`, treats the payload as a signed envelope request, checks the
/// signature when present, and prints the decrypted plaintext.
pub async fn run(url: &str, id: &str, open: bool) -> Result<Value> {
    let id: SnapshotId = id.parse().context("Invalid snapshot id")?;
    let client = SnapshotClient::new(url, None);
    let record = client
        .get_snapshot(&id)
        .await
        .with_context(|| format!("Failed to fetch snapshot {id}"))?;

    let output = if open {
        open_payload(&record.payload)?
    } else {
        serde_json::to_value(&record)?
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(output)
}

fn open_payload(payload: &str) -> Result<Value> {
    let request = SignedEnvelopeRequest::from_payload(payload)
        .context("Payload is not a signed envelope request")?;

    if request.signature.is_some() {
        if !request.verify().context("Signature check failed")? {
            anyhow::bail!("Signature does not match the embedded signer");
        }
    } else {
        tracing::warn!("Snapshot is unsigned; authenticity not checked");
    }

    request.open().context("Decryption failed")
}
