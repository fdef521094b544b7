// consent-flow-client/tests/common/mod.rs
// ============================================================================
// Module: Client Test Helpers
// Description: Local HTTP server and client builders for REST tests.
// Purpose: Serve canned responses and capture the requests the client sends.
// Dependencies: consent-flow-client, tiny_http
// ============================================================================

//! ## Overview
//! [`serve`] answers a fixed number of requests from a closure and records
//! each request so tests can assert on method, path, headers, and body.

#![allow(dead_code, reason = "Helpers are shared across test crates that use different subsets.")]

use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use consent_flow_client::ApiClient;
use consent_flow_client::ApiClientConfig;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

/// Request captured by the test server.
#[derive(Debug, Clone)]
pub struct Captured {
    /// HTTP method.
    pub method: String,
    /// Path and query.
    pub url: String,
    /// Authorization header, if sent.
    pub authorization: Option<String>,
    /// Content-Type header, if sent.
    pub content_type: Option<String>,
    /// Request body.
    pub body: String,
}

/// Running test server.
pub struct TestServer {
    /// Base URL of the server.
    pub base_url: String,
    /// Requests received so far.
    pub captured: Arc<Mutex<Vec<Captured>>>,
    /// Server thread.
    handle: thread::JoinHandle<()>,
}

impl TestServer {
    /// Waits for the server to answer all expected requests.
    pub fn finish(self) -> Vec<Captured> {
        self.handle.join().expect("server thread");
        let captured = self.captured.lock().expect("lock");
        captured.clone()
    }
}

/// Serves `count` requests, answering each with `(status, json body)`.
pub fn serve<F>(count: usize, respond: F) -> TestServer
where
    F: Fn(&Captured) -> (u16, String) + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").expect("bind");
    let addr = server.server_addr().to_ip().expect("ip addr");
    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);
    let handle = thread::spawn(move || {
        for _ in 0 .. count {
            let Ok(mut request) = server.recv() else {
                return;
            };
            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);
            let header = |name: &'static str| {
                request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv(name))
                    .map(|header| header.value.as_str().to_string())
            };
            let capture = Captured {
                method: request.method().as_str().to_string(),
                url: request.url().to_string(),
                authorization: header("Authorization"),
                content_type: header("Content-Type"),
                body,
            };
            let (status, text) = respond(&capture);
            sink.lock().expect("lock").push(capture);
            let content_type = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).expect("header");
            let response = Response::from_string(text).with_status_code(status).with_header(content_type);
            let _ = request.respond(response);
        }
    });
    TestServer {
        base_url: format!("http://{addr}/api"),
        captured,
        handle,
    }
}

/// Client allowed to reach the local server, without a token.
pub fn client(base_url: &str) -> ApiClient {
    ApiClient::new(ApiClientConfig {
        allow_http: true,
        timeout_ms: 5_000,
        ..ApiClientConfig::new(base_url)
    })
    .expect("client")
}

/// Client carrying a bearer token.
pub fn signed_in_client(base_url: &str) -> ApiClient {
    let mut client = client(base_url);
    client.set_token(Some("token-123".to_string()));
    client
}
