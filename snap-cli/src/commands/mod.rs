//! CLI command implementations.

pub mod get;
pub mod info;
pub mod keygen;
pub mod push;
pub mod watch;

#[cfg(test)]
pub(crate) mod testing {
    use snap_relay::{build_router, Config, SnapshotRelay};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    /// Start an in-process relay and return its base URL.
    pub async fn spawn_relay(api_key: Option<&str>) -> (Arc<SnapshotRelay>, String) {
        let mut config = Config::default();
        config.auth.api_key = api_key.map(String::from);
        let relay = Arc::new(SnapshotRelay::open(config).await.unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_router(relay.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (relay, format!("http://{addr}"))
    }
}
