// consent-flow-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and `config validate`.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for Consent Flow configuration. The output is static and
//! is checked against the loader in tests.

/// Returns a canonical example `consent-flow.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[api]
base_url = "https://api.example.com/api"
allow_http = false
timeout_ms = 15000
user_agent = "consent-flow/0.1"
max_response_bytes = 16777216

[storage]
data_dir = ".consent-flow"

[workflow]
signing_path = "multi"
# catalog_path = "catalog.json"

[render]
page_size = "a4"
margin_mm = 15.0

[assistant]
enabled = false
realtime_url = "https://api.openai.com/v1/realtime"
model = "gpt-realtime-mini"
lang = "en"
# connect_timeout_ms = 10000

[audit]
sink = "file"
path = "consent-flow-audit.jsonl"
"#,
    )
}
