//! Encrypt, sign and upload a snapshot.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use snap_client::{PostSnapshot, SnapshotClient};
use snap_types::SnapshotId;
use std::path::PathBuf;

use crate::config::load_signing_keys;

/// Arguments for `snap-cli push`.
#[derive(Args, Debug, Clone)]
pub struct PushArgs {
    /// Broker base URL
    #[arg(long, env = "SNAP_URL", default_value = "http://localhost:8787")]
    pub url: String,

    /// Project identifier carried in the envelope
    #[arg(long)]
    pub project: String,

    /// Snapshot type carried in the envelope
    #[arg(long = "type", default_value = "snapshot")]
    pub kind: String,

    /// Target room (broker default when omitted)
    #[arg(long)]
    pub room: Option<String>,

    /// Unencrypted metadata as a JSON object
    #[arg(long)]
    pub meta: Option<String>,

    /// Identity file to sign with (unsigned when omitted)
    #[arg(long)]
    pub identity: Option<PathBuf>,

    /// Broker API key
    #[arg(long, env = "RELAY_API_KEY")]
    pub token: Option<String>,

    /// Plaintext payload as JSON
    pub payload: String,
}

/// Run the push command. Prints and returns the assigned id.
pub async fn run(args: &PushArgs) -> Result<SnapshotId> {
    let payload: Value =
        serde_json::from_str(&args.payload).context("Payload must be valid JSON")?;
    let meta = parse_meta(args.meta.as_deref())?;

    let keys = match &args.identity {
        Some(path) => Some(load_signing_keys(path).await?),
        None => None,
    };

    let client = SnapshotClient::new(&args.url, args.token.clone());
    let response = client
        .post_snapshot(PostSnapshot {
            project_id: &args.project,
            kind: &args.kind,
            payload: &payload,
            signing_keys: keys.as_ref(),
            meta,
            room: args.room.as_deref(),
        })
        .await
        .with_context(|| format!("Upload to {} failed", client.base_url()))?;

    tracing::info!(
        "Stored snapshot {} (signed: {})",
        response.id,
        keys.is_some()
    );
    println!("{}", response.id);
    Ok(response.id)
}

fn parse_meta(meta: Option<&str>) -> Result<Value> {
    let Some(text) = meta else {
        return Ok(Value::Object(Default::default()));
    };
    let value: Value = serde_json::from_str(text).context("--meta must be valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("--meta must be a JSON object");
    }
    Ok(value)
}
