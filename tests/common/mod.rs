//! Shared fixtures for the integration tests.
//!
//! Mock-server helpers mount close-approach responses on a wiremock server.

#![allow(dead_code)]

use cadcheck::config::HttpConfig;
use cadcheck::{CadClient, CadFetcher, RecordingObserver, RetryPolicy};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CAD_PATH: &str = "/cad.api";

pub const FIELDS: [&str; 11] = [
    "des", "orbit_id", "jd", "cd", "dist", "dist_min", "dist_max", "v_rel", "v_inf", "t_sigma_f", "h",
];

pub fn signature() -> Value {
    json!({"version": "1.5", "source": "NASA/JPL SBDB Close Approach Data API"})
}

pub fn sample_body() -> Value {
    json!({
        "signature": signature(),
        "count": "2",
        "fields": FIELDS,
        "data": [
            ["2024 AV2", "5", "2460311.532", "2025-Jan-02 00:47", "0.0123", "0.0122", "0.0124",
             "8.51", "8.49", "< 00:01", "24.7"],
            ["2023 YA1", "9", "2460315.049", "2025-Jan-05 13:10", "0.0356", "0.0355", "0.0357",
             "6.02", "5.98", "00:02", "26.1"]
        ]
    })
}

pub fn empty_body() -> Value {
    json!({"signature": signature(), "count": 0})
}

pub fn error_body(message: &str) -> Value {
    json!({"code": "400", "message": message, "moreinfo": "https://ssd-api.jpl.nasa.gov/doc/cad.html"})
}

pub fn http_config(server: &MockServer) -> HttpConfig {
    HttpConfig {
        base_url: format!("{}{CAD_PATH}", server.uri()),
        timeout_ms: 2_000,
    }
}

pub fn client(server: &MockServer) -> CadClient {
    CadClient::new(&http_config(server)).expect("mock client")
}

pub fn fetcher(server: &MockServer, max_attempts: u32, observer: RecordingObserver) -> CadFetcher {
    CadFetcher::new(
        client(server),
        RetryPolicy::new(max_attempts, Duration::ZERO),
        Arc::new(observer),
    )
}

/// Every GET to the endpoint answers `status` with `body`.
pub async fn mock_cad(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path(CAD_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// GETs carrying `key=value` answer `status` with `body`.
pub async fn mock_cad_with_param(server: &MockServer, key: &str, value: &str, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path(CAD_PATH))
        .and(query_param(key, value))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// The first `fail_count` requests answer `fail_status`, the rest succeed.
pub async fn mock_flaky_cad(server: &MockServer, fail_count: u64, fail_status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path(CAD_PATH))
        .respond_with(ResponseTemplate::new(fail_status))
        .up_to_n_times(fail_count)
        .mount(server)
        .await;

    mock_cad(server, 200, body).await;
}

/// The first `ok_count` requests succeed, every later one is rate limited.
pub async fn mock_rate_limited_cad(server: &MockServer, ok_count: u64) {
    Mock::given(method("GET"))
        .and(path(CAD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
        .up_to_n_times(ok_count)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(CAD_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(server)
        .await;
}
