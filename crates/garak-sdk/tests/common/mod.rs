#![allow(dead_code)]

use garak_sdk::{ClientConfig, GarakClient};
use httpmock::MockServer;
use serde_json::{json, Value};

pub const KEY: &str = "garak_test_key_1234567890abcdefghijklmnopqrst";

pub fn client_for(server: &MockServer) -> GarakClient {
    GarakClient::new(
        ClientConfig::new()
            .with_base_url(server.base_url())
            .with_api_key(KEY),
    )
    .expect("client should build")
}

pub fn scan_metadata(scan_id: &str, status: &str) -> Value {
    json!({
        "scan_id": scan_id,
        "status": status,
        "generator": "openai",
        "model_name": "gpt-4",
        "probe_categories": ["jailbreak"],
        "probes": [],
        "created_at": "2025-01-01T00:00:00Z",
        "use_free_tier": false
    })
}

pub fn status_body(scan_id: &str, status: &str) -> Value {
    json!({
        "scan_id": scan_id,
        "status": status,
        "progress": { "current": 3, "total": 10, "percentage": 30.0 }
    })
}
