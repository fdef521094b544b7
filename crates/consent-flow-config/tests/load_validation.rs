//! Config load validation tests for consent-flow-config.
// crates/consent-flow-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;

use consent_flow_config::ConfigError;
use consent_flow_config::ConsentFlowConfig;
use consent_flow_config::config_toml_example;
use tempfile::NamedTempFile;

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
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

fn write_config(content: &[u8]) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(content).map_err(|err| err.to_string())?;
    Ok(file)
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    assert_invalid(ConsentFlowConfig::load(Some(Path::new(&long_path))), "config path exceeds max length")
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    assert_invalid(ConsentFlowConfig::load(Some(Path::new(&long_component))), "config path component too long")
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let file = write_config(&vec![b'#'; 1_048_577])?;
    assert_invalid(ConsentFlowConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let file = write_config(&[0xFF, 0xFE, 0xFF])?;
    assert_invalid(ConsentFlowConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn load_rejects_missing_explicit_path() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    assert_invalid(ConsentFlowConfig::load_or_default(Some(&path)), "config io error")
}

#[test]
fn load_rejects_malformed_toml() -> TestResult {
    let file = write_config(b"[api\nbase_url = 3")?;
    assert_invalid(ConsentFlowConfig::load(Some(file.path())), "config parse error")
}

#[test]
fn empty_file_loads_defaults() -> TestResult {
    let file = write_config(b"")?;
    let config = ConsentFlowConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.api.base_url.is_some() || config.assistant.enabled {
        return Err("empty config should leave remote features off".to_string());
    }
    if (config.render.margin_mm - 15.0).abs() > f32::EPSILON {
        return Err(format!("unexpected default margin {}", config.render.margin_mm));
    }
    Ok(())
}

#[test]
fn example_config_loads() -> TestResult {
    let file = write_config(config_toml_example().as_bytes())?;
    let config = ConsentFlowConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.api.base_url.as_deref() != Some("https://api.example.com/api") {
        return Err(format!("unexpected base url {:?}", config.api.base_url));
    }
    if config.audit.path.as_deref() != Some("consent-flow-audit.jsonl") {
        return Err("example audit path missing".to_string());
    }
    Ok(())
}
