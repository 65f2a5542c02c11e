//! Run trigger failures that happen before any crawl starts

use rent_sweep::trigger::{self, TriggerOutcome};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn error_message(outcome: &TriggerOutcome) -> String {
    outcome.to_json()["error"]
        .as_str()
        .expect("error outcome renders an error string")
        .to_string()
}

#[test]
fn test_invalid_config_becomes_error_outcome() {
    let file = write_config(
        r#"
captcha = 1

[[proxies]]
host = "127.0.0.1"
port = 8080
username = "u"
password = "p"
"#,
    );

    let outcome = trigger::load_config_outcome(file.path()).unwrap_err();

    assert!(!outcome.is_success());
    assert_eq!(outcome.exit_code(), 1);
    assert!(error_message(&outcome).starts_with("Failed to load configuration from"));

    let json = outcome.to_json();
    assert_eq!(json.as_object().map(|o| o.len()), Some(1));
    assert!(outcome.to_string().starts_with(r#"{"error":"#));
}

#[test]
fn test_missing_config_file_becomes_error_outcome() {
    let outcome = trigger::load_config_outcome(Path::new("/nonexistent/rent-sweep.toml"))
        .unwrap_err();

    assert_eq!(outcome.exit_code(), 1);
    assert!(error_message(&outcome).contains("/nonexistent/rent-sweep.toml"));
}

#[test]
fn test_valid_config_loads_with_hash() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.toml");

    let (config, hash) = trigger::load_config_outcome(&path).unwrap();

    assert_eq!(config.proxies.len(), 2);
    assert_eq!(hash.len(), 64);
}
