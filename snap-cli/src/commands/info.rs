//! Broker status commands: `rooms` and `health`.

use anyhow::{Context, Result};
use snap_client::SnapshotClient;
use snap_types::{HealthResponse, RoomsResponse};

/// Run the rooms command.
pub async fn rooms(url: &str) -> Result<RoomsResponse> {
    let response = SnapshotClient::new(url, None)
        .rooms()
        .await
        .with_context(|| format!("Failed to list rooms on {url}"))?;

    if response.rooms.is_empty() {
        println!("No active rooms");
    }
    for room in &response.rooms {
        println!("{room}");
    }
    Ok(response)
}

/// Run the health command.
pub async fn health(url: &str) -> Result<HealthResponse> {
    let response = SnapshotClient::new(url, None)
        .health()
        .await
        .with_context(|| format!("Health check against {url} failed"))?;

    println!("=== snap-relay health ===");
    println!();
    println!("  Status:    {}", if response.ok { "OK" } else { "DEGRADED" });
    println!("  Version:   {}", response.version);
    println!("  Uptime:    {}", format_uptime(response.uptime_seconds));
    println!("  Snapshots: {}", response.snapshots);
    println!("  Rooms:     {}", response.rooms.len());
    for room in &response.rooms {
        println!("    - {room}");
    }
    Ok(response)
}

/// Format an uptime in seconds as a short human-readable string.
fn format_uptime(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}
