//! Unit tests for config file resolution and loading
//!
//! Tests that manipulate environment variables are marked with #[serial]
//! so they run sequentially, not in parallel.

use cantor_common::config::{load_config, parse_config, resolve_config_path};
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

const TEST_ENV: &str = "CANTOR_TEST_CONFIG";

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
struct SampleConfig {
    port: u16,
    name: String,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            name: "default".to_string(),
        }
    }
}

#[test]
#[serial]
fn test_cli_arg_has_highest_priority() {
    env::set_var(TEST_ENV, "/tmp/from-env.toml");
    let cli = PathBuf::from("/tmp/from-cli.toml");

    let resolved = resolve_config_path(Some(&cli), TEST_ENV);
    assert_eq!(resolved, Some(cli));

    env::remove_var(TEST_ENV);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_arg() {
    env::set_var(TEST_ENV, "/tmp/from-env.toml");

    let resolved = resolve_config_path(None, TEST_ENV);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-env.toml")));

    env::remove_var(TEST_ENV);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let path = PathBuf::from("/nonexistent/cantor/config.toml");
    let config: SampleConfig = load_config(Some(&path)).unwrap();
    assert_eq!(config, SampleConfig::default());

    let config: SampleConfig = load_config(None).unwrap();
    assert_eq!(config, SampleConfig::default());
}

#[test]
fn test_partial_file_keeps_defaults_for_missing_keys() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = 4100").unwrap();

    let config: SampleConfig = load_config(Some(file.path())).unwrap();
    assert_eq!(config.port, 4100);
    assert_eq!(config.name, "default");
}

#[test]
fn test_malformed_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = \"not a number").unwrap();

    let result: cantor_common::Result<SampleConfig> = load_config(Some(file.path()));
    assert!(result.is_err());
}

#[test]
fn test_parse_config_from_string() {
    let config: SampleConfig = parse_config("name = \"sanctuary\"").unwrap();
    assert_eq!(config.name, "sanctuary");
    assert_eq!(config.port, 3000);
}
