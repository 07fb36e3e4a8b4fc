// crates/hot-updater-server/tests/common/mod.rs
// =============================================================================
// Module: Server Test Helpers
// Description: Ephemeral HTTP server harness and fixtures.
// Purpose: Drive the axum router over loopback with reqwest.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use hot_updater_core::Bundle;
use hot_updater_core::BundleId;
use hot_updater_core::Channel;
use hot_updater_core::Platform;
use hot_updater_server::AuditSink;
use hot_updater_server::CheckUpdateAuditEvent;
use hot_updater_server::DeliveryAuditEvent;
use hot_updater_server::ServerState;
use hot_updater_server::router;
use tokio::runtime::Builder;
use tokio::sync::oneshot;

/// Handle for a running test server.
pub struct TestServer {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    /// Returns the server origin, for example `http://127.0.0.1:4100`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns an absolute URL for a path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Binds a loopback port and serves the router built from `build`.
///
/// `build` receives the server origin so adapters can embed it.
pub fn spawn_server(build: impl FnOnce(&str) -> ServerState) -> TestServer {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind loopback");
    listener.set_nonblocking(true).expect("nonblocking listener");
    let addr = listener.local_addr().expect("local addr");
    let base_url = format!("http://{addr}");
    let app = router("/api", Arc::new(build(&base_url)));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let join = thread::spawn(move || {
        let runtime = Builder::new_current_thread().enable_all().build().expect("runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });
    });
    TestServer {
        base_url,
        shutdown: Some(shutdown_tx),
        join: Some(join),
    }
}

/// Returns the fixture id `00000000-0000-0000-0000-0000000000NN`.
pub fn bundle_id(n: u8) -> String {
    format!("00000000-0000-0000-0000-0000000000{n:02}")
}

/// Builds an enabled iOS production bundle stored under the `s3` scheme.
pub fn sample_bundle(n: u8, target: &str) -> Bundle {
    Bundle {
        id: BundleId::new(bundle_id(n)),
        platform: Platform::Ios,
        channel: Channel::default(),
        enabled: true,
        should_force_update: false,
        file_hash: format!("{n:02}ab"),
        git_commit_hash: None,
        message: Some(format!("bundle {n}")),
        target_app_version: Some(target.to_string()),
        fingerprint_hash: None,
        storage_uri: Some(format!("s3://bundles/{}/bundle.zip", bundle_id(n))),
        rollout_percentage: 100,
        target_device_ids: None,
        metadata: None,
    }
}

/// Audit sink that keeps events in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    pub checks: Mutex<Vec<CheckUpdateAuditEvent>>,
    pub deliveries: Mutex<Vec<DeliveryAuditEvent>>,
}

impl AuditSink for RecordingAuditSink {
    fn record_check_update(&self, event: &CheckUpdateAuditEvent) {
        self.checks.lock().expect("audit lock").push(event.clone());
    }

    fn record_delivery(&self, event: &DeliveryAuditEvent) {
        self.deliveries.lock().expect("audit lock").push(event.clone());
    }
}
