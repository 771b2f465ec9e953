use std::io::Write;
use std::path::Path;

use export_wizard::config::{AppConfig, ExportMode, InitialDevice};
use serde::Serialize;
use tempfile::NamedTempFile;

#[derive(Serialize)]
struct Flags {
    #[serde(skip_serializing_if = "Option::is_none")]
    verbose: Option<bool>,
}

fn write_config(text: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(text.as_bytes()).expect("write temp config");
    file
}

#[test]
fn test_loads_values_from_file() {
    let file = write_config(
        r#"
auto_start_export = false

[simulation]
initial_device = "unlocked"
passphrase = "hunter2"
export_outcome = "succeed"
"#,
    );

    let config = AppConfig::load(Some(file.path()), None::<&Flags>).unwrap();

    assert!(!config.auto_start_export);
    assert_eq!(config.simulation.initial_device, InitialDevice::Unlocked);
    assert_eq!(config.simulation.passphrase.as_deref(), Some("hunter2"));
    assert_eq!(config.simulation.export_outcome, ExportMode::Succeed);
    // Unset keys keep their defaults.
    assert_eq!(config.simulation.probe_delay_ms, 1200);
    assert!(!config.verbose);
}

#[test]
fn test_overrides_win_over_file() {
    let file = write_config("verbose = false\n");
    let flags = Flags {
        verbose: Some(true),
    };

    let config = AppConfig::load(Some(file.path()), Some(&flags)).unwrap();
    assert!(config.verbose);

    let flags = Flags { verbose: None };
    let config = AppConfig::load(Some(file.path()), Some(&flags)).unwrap();
    assert!(!config.verbose);
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let result = AppConfig::load(
        Some(Path::new("/nonexistent/export-wizard.toml")),
        None::<&Flags>,
    );
    assert!(result.is_err());
}

#[test]
fn test_invalid_value_is_an_error() {
    let file = write_config("[simulation]\ninitial_device = \"sideways\"\n");
    assert!(AppConfig::load(Some(file.path()), None::<&Flags>).is_err());
}

#[test]
fn test_printed_config_loads_back() {
    let mut original = AppConfig::default();
    original.simulation.unlock_delay_ms = 42;
    original.simulation.export_outcome = ExportMode::Fail;

    let file = write_config(&original.to_toml().unwrap());
    let loaded = AppConfig::load(Some(file.path()), None::<&Flags>).unwrap();

    assert_eq!(loaded, original);
}
