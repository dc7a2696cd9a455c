//! Shared fixtures for integration tests
#![allow(dead_code)]

use sentinel_event_stream::service::{prepare_timeline, ReplayServer, ServiceResult};
use sentinel_event_stream::types::ReplayConfig;
use serde_json::{json, Value};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A server running on an ephemeral port
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: watch::Sender<bool>,
    pub handle: JoinHandle<ServiceResult<()>>,
}

/// Write one JSON value per line
pub fn write_jsonl(dir: &Path, file_name: &str, records: &[Value]) {
    let content: Vec<String> = records.iter().map(|r| r.to_string()).collect();
    fs::write(dir.join(file_name), content.join("\n") + "\n").unwrap();
}

/// Point-of-sale record
pub fn pos(ts: &str, transaction: &str) -> Value {
    json!({
        "timestamp": ts,
        "station_id": "SCC1",
        "status": "Active",
        "data": {"customer_id": "C001", "sku": "PRD_F_01", "transaction_id": transaction}
    })
}

/// RFID record
pub fn rfid(ts: &str, epc: &str) -> Value {
    json!({
        "timestamp": ts,
        "station_id": "SCC1",
        "status": "Active",
        "data": {"epc": epc, "location": "IN_SCAN_AREA", "sku": "PRD_F_01"}
    })
}

/// POS at t=0s and t=5s, RFID at t=2s
pub fn example_data_root() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_jsonl(
        dir.path(),
        "pos_transactions.jsonl",
        &[pos("2025-08-13T16:00:00", "TXN_1"), pos("2025-08-13T16:00:05", "TXN_2")],
    );
    write_jsonl(dir.path(), "rfid_readings.jsonl", &[rfid("2025-08-13T16:00:02", "E200")]);
    dir
}

/// Loopback config over `root` on an ephemeral port
pub fn test_config(root: &Path, speed: f64, loop_enabled: bool) -> ReplayConfig {
    ReplayConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        data_root: root.to_path_buf(),
        speed,
        loop_enabled,
        shutdown_grace_ms: 500,
        service_name: "test-stream".to_string(),
        ..Default::default()
    }
}

/// Validate, load, bind and start serving
pub async fn start_server(config: &ReplayConfig) -> TestServer {
    config.validate().unwrap();
    let timeline = Arc::new(prepare_timeline(config).unwrap());
    let server = ReplayServer::bind(config, timeline).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (shutdown, rx) = watch::channel(false);
    let handle = tokio::spawn(server.run(rx));
    TestServer { addr, shutdown, handle }
}
