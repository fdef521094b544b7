//! Section validation tests for consent-flow-config.
// crates/consent-flow-config/tests/section_validation.rs
// =============================================================================
// Module: Config Section Validation Tests
// Description: Validate per-section bounds and scheme checks.
// Purpose: Ensure out-of-range values reject the whole file.
// =============================================================================

use consent_flow_config::AuditSinkKind;
use consent_flow_config::ConfigError;
use consent_flow_config::ConsentFlowConfig;
use consent_flow_config::PageSize;
use consent_flow_core::SigningPath;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<ConsentFlowConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn api_rejects_cleartext_without_opt_in() -> TestResult {
    assert_invalid(
        ConsentFlowConfig::from_toml("[api]\nbase_url = \"http://localhost:4000\""),
        "api.base_url uses http:// without allow_http",
    )
}

#[test]
fn api_accepts_cleartext_with_opt_in_and_trims_slash() -> TestResult {
    let config = ConsentFlowConfig::from_toml("[api]\nbase_url = \"http://localhost:4000/api/\"\nallow_http = true")
        .map_err(|err| err.to_string())?;
    if config.api.base_url.as_deref() != Some("http://localhost:4000/api") {
        return Err(format!("unexpected base url {:?}", config.api.base_url));
    }
    Ok(())
}

#[test]
fn api_rejects_missing_scheme() -> TestResult {
    assert_invalid(ConsentFlowConfig::from_toml("[api]\nbase_url = \"example.com\""), "must include http://")
}

#[test]
fn api_rejects_timeout_out_of_range() -> TestResult {
    assert_invalid(ConsentFlowConfig::from_toml("[api]\ntimeout_ms = 10"), "api.timeout_ms")?;
    assert_invalid(ConsentFlowConfig::from_toml("[api]\ntimeout_ms = 500000"), "api.timeout_ms")
}

#[test]
fn api_rejects_zero_response_limit() -> TestResult {
    assert_invalid(ConsentFlowConfig::from_toml("[api]\nmax_response_bytes = 0"), "api.max_response_bytes")
}

#[test]
fn storage_rejects_blank_data_dir() -> TestResult {
    assert_invalid(ConsentFlowConfig::from_toml("[storage]\ndata_dir = \"  \""), "storage.data_dir must be non-empty")
}

#[test]
fn workflow_reads_signing_path() -> TestResult {
    let config = ConsentFlowConfig::from_toml("[workflow]\nsigning_path = \"single\"").map_err(|err| err.to_string())?;
    if config.workflow.signing_path != SigningPath::Single {
        return Err("signing path not applied".to_string());
    }
    assert_invalid(ConsentFlowConfig::from_toml("[workflow]\nsigning_path = \"both\""), "config parse error")
}

#[test]
fn render_rejects_margin_out_of_range() -> TestResult {
    assert_invalid(ConsentFlowConfig::from_toml("[render]\nmargin_mm = 1.0"), "render.margin_mm")?;
    let config = ConsentFlowConfig::from_toml("[render]\npage_size = \"letter\"").map_err(|err| err.to_string())?;
    if config.render.page_size != PageSize::Letter {
        return Err("page size not applied".to_string());
    }
    Ok(())
}

#[test]
fn assistant_rejects_bad_language_and_timeout() -> TestResult {
    assert_invalid(ConsentFlowConfig::from_toml("[assistant]\nlang = \"en us\""), "assistant.lang")?;
    assert_invalid(
        ConsentFlowConfig::from_toml("[assistant]\nconnect_timeout_ms = 10"),
        "assistant.connect_timeout_ms",
    )?;
    assert_invalid(
        ConsentFlowConfig::from_toml("[assistant]\nrealtime_url = \"http://localhost:9000\""),
        "assistant.realtime_url uses http://",
    )
}

#[test]
fn audit_file_sink_requires_path() -> TestResult {
    assert_invalid(ConsentFlowConfig::from_toml("[audit]\nsink = \"file\""), "audit.path is required")?;
    let config = ConsentFlowConfig::from_toml("[audit]\nsink = \"none\"").map_err(|err| err.to_string())?;
    if config.audit.sink != AuditSinkKind::None {
        return Err("audit sink not applied".to_string());
    }
    Ok(())
}
