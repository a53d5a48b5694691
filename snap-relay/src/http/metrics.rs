//! Prometheus metrics endpoint.

use crate::server::SnapshotRelay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::fmt::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<SnapshotRelay>>) -> impl IntoResponse {
    let m = relay.metrics();

    let counters = [
        ("snapshots_created_total", "Snapshots stored", &m.snapshots_created_total),
        ("snapshots_served_total", "Snapshots returned by id", &m.snapshots_served_total),
        (
            "broadcasts_delivered_total",
            "Notifications queued to subscribers",
            &m.broadcasts_delivered_total,
        ),
        (
            "broadcasts_dropped_total",
            "Notifications dropped on full or closed subscriber queues",
            &m.broadcasts_dropped_total,
        ),
        ("auth_failures_total", "Rejected API keys", &m.auth_failures_total),
        ("wal_lines_replayed_total", "WAL lines loaded at startup", &m.wal_lines_replayed_total),
        ("wal_lines_skipped_total", "WAL lines skipped at startup", &m.wal_lines_skipped_total),
        (
            "subscribers_connected_total",
            "Subscribers accepted",
            &m.subscribers_connected_total,
        ),
    ];

    // Best effort: a storage failure reports zero rather than failing the scrape
    let stored = relay.snapshot_count().await.unwrap_or(0);
    let gauges = [
        ("snapshots_stored", "Snapshots currently held", stored),
        ("rooms_active", "Rooms with at least one subscriber", relay.rooms().total_rooms()),
        ("subscribers_active", "Connected subscribers", relay.rooms().total_subscribers()),
    ];

    let mut body = format!(
        "# HELP snap_relay_info Server information\n\
         # TYPE snap_relay_info gauge\n\
         snap_relay_info{{version=\"{}\"}} 1\n",
        env!("CARGO_PKG_VERSION")
    );
    for (name, help, value) in gauges {
        let _ = write!(
            body,
            "\n# HELP snap_relay_{name} {help}\n# TYPE snap_relay_{name} gauge\nsnap_relay_{name} {value}\n"
        );
    }
    for (name, help, counter) in counters {
        let value = counter.load(Ordering::Relaxed);
        let _ = write!(
            body,
            "\n# HELP snap_relay_{name} {help}\n# TYPE snap_relay_{name} counter\nsnap_relay_{name} {value}\n"
        );
    }

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
