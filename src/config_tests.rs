use crate::config::{Config, ENV_OUTPUT_FILE, ENV_PROCESS_NAME, ENV_SAMPLE_FREQUENCY};
use crate::domain::errors::ConfigError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

const FULL_CONFIG: &str = r#"
sample_frequency = 5
target_output_file = "/var/lib/metrics-agent/metrics.prom"
queue_capacity = 50

[[http_sources]]
endpoint = "http://localhost:8080/metrics"

[[http_sources]]
endpoint = "http://localhost:8080/v2/status"
headers = { "X-API-Key" = "secret" }
timeout_secs = 3

[system]
process_name = "algod"
"#;

fn valid_config() -> Config {
    Config {
        http_sources: vec![crate::config::HttpSourceConfig {
            endpoint: "http://test.com/metrics".to_string(),
            headers: HashMap::from([("test-api-key".to_string(), "api-key".to_string())]),
            timeout_secs: None,
        }],
        sample_frequency: 1,
        target_output_file: PathBuf::from("test_output_file"),
        ..Config::default()
    }
}

#[test]
fn test_parse_full_config() {
    let config: Config = FULL_CONFIG.parse().unwrap();

    assert_eq!(config.sample_frequency, 5);
    assert_eq!(config.sample_interval(), Duration::from_secs(5));
    assert_eq!(config.queue_capacity, 50);
    assert_eq!(config.http_sources.len(), 2);
    assert!(config.http_sources[0].headers.is_empty());
    assert_eq!(config.http_sources[1].headers["X-API-Key"], "secret");
    assert_eq!(config.http_sources[1].timeout(), Some(Duration::from_secs(3)));
    assert!(config.system.enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_minimal_config_uses_defaults() {
    let config: Config = "sample_frequency = 1\ntarget_output_file = \"out.prom\""
        .parse()
        .unwrap();

    assert!(config.http_sources.is_empty());
    assert_eq!(config.queue_capacity, 100);
    assert_eq!(config.system.process_name, "algod");
    assert!(config.validate().is_ok());
}

#[test]
fn test_unknown_fields_are_rejected() {
    let result = "sample_frequency = 1\nsampleFrequency = 2".parse::<Config>();
    assert!(result.is_err());
}

#[test]
fn test_validate_config() {
    let cases: Vec<(&str, Config, Option<fn(&ConfigError) -> bool>)> = vec![
        ("valid config", valid_config(), None),
        (
            "invalid sample frequency config",
            Config {
                sample_frequency: 0,
                ..valid_config()
            },
            Some(|e| matches!(e, ConfigError::InvalidSampleFrequency(0))),
        ),
        (
            "invalid config with no output file",
            Config {
                target_output_file: PathBuf::new(),
                ..valid_config()
            },
            Some(|e| matches!(e, ConfigError::EmptyOutputTarget)),
        ),
        (
            "zero queue capacity",
            Config {
                queue_capacity: 0,
                ..valid_config()
            },
            Some(|e| matches!(e, ConfigError::InvalidQueueCapacity)),
        ),
    ];

    for (desc, config, expected) in cases {
        match (config.validate(), expected) {
            (Ok(()), None) => {}
            (Err(e), Some(check)) => assert!(check(&e), "{}: unexpected error {:?}", desc, e),
            (result, _) => panic!("{}: unexpected result {:?}", desc, result),
        }
    }
}

#[test]
fn test_empty_process_name_only_matters_when_enabled() {
    let mut config = valid_config();
    config.system.process_name = "  ".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::EmptyProcessName)
    ));

    config.system.enabled = false;
    assert!(config.validate().is_ok());
}

#[test]
fn test_env_overrides() {
    let env = HashMap::from([
        (ENV_SAMPLE_FREQUENCY, "30"),
        (ENV_OUTPUT_FILE, "/tmp/override.prom"),
        (ENV_PROCESS_NAME, "node"),
    ]);
    let mut config = valid_config();

    config
        .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
        .unwrap();

    assert_eq!(config.sample_frequency, 30);
    assert_eq!(config.target_output_file, PathBuf::from("/tmp/override.prom"));
    assert_eq!(config.system.process_name, "node");
}

#[test]
fn test_invalid_env_override() {
    let mut config = valid_config();
    let err = config
        .apply_overrides(|key| (key == ENV_SAMPLE_FREQUENCY).then(|| "soon".to_string()))
        .unwrap_err();

    assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    assert_eq!(config.sample_frequency, 1);
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, FULL_CONFIG).unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.http_sources.len(), 2);
    assert_eq!(config.http_sources[1].endpoint, "http://localhost:8080/v2/status");
}

#[test]
fn test_load_missing_file() {
    let err = Config::load(std::path::Path::new("/nonexistent/config.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_load_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "sample_frequency = \"five\"").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
