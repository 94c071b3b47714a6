//! Integration tests for configuration loading

use conveyor_twin::domain::Regime;
use conveyor_twin::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[track]
entry_x = -4.0
exit_x = 30.0

[gate]
enter_x = 20.0
zone_width = 0.5

[jam]
accumulation_x = 15.0
blocking_distance = 1.0
infeed_speed = 0.0

[spawn]
interval_min_secs = 2.0
interval_max_secs = 3.0

[regimes.wear]
speed = 4.0
vibration = 6.0
current = 3.0

[sim]
tick_hz = 30
seed = 99

[metrics]
interval_secs = 15

[egress]
enabled = true
file = "out/run.jsonl"
every_ticks = 10
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.entry_x(), -4.0);
    assert_eq!(config.exit_x(), 30.0);
    assert_eq!(config.gate_enter_x(), 20.0);
    assert_eq!(config.gate_zone_width(), 0.5);
    assert_eq!(config.jam_accumulation_x(), 15.0);
    assert_eq!(config.blocking_distance(), 1.0);
    assert_eq!(config.jam_infeed_speed(), 0.0);
    assert_eq!(config.spawn_interval_min_secs(), 2.0);
    assert_eq!(config.spawn_interval_max_secs(), 3.0);
    assert_eq!(config.tick_hz(), 30);
    assert_eq!(config.seed(), Some(99));
    assert_eq!(config.metrics_interval_secs(), 15);
    assert!(config.egress_enabled());
    assert_eq!(config.egress_file(), "out/run.jsonl");
    assert_eq!(config.egress_every_ticks(), 10);

    let wear = config.regime_profile(Regime::Wear);
    assert_eq!(wear.speed, 4.0);
    assert_eq!(wear.vibration, 6.0);
    assert_eq!(wear.vibration_jitter, 0.0);

    // Untouched sections keep their defaults
    assert_eq!(config.lateral_jitter(), 0.5);
    assert_eq!(config.filter_rate(), 5.0);
    assert_eq!(config.regime_profile(Regime::Normal).speed, 6.0);
    assert!(config.config_file().ends_with(temp_file.path().file_name().unwrap().to_str().unwrap()));
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/path/config.toml");

    assert_eq!(config.entry_x(), -5.0);
    assert_eq!(config.exit_x(), 25.0);
    assert_eq!(config.gate_enter_x(), 14.9);
    assert_eq!(config.tick_hz(), 60);
    assert_eq!(config.seed(), None);
    assert!(!config.egress_enabled());
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_malformed_file_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[track\nentry_x = ").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
    // load_from_path never fails
    assert_eq!(Config::load_from_path(temp_file.path().to_str().unwrap()).entry_x(), -5.0);
}

#[test]
fn test_invalid_values_are_sanitised() {
    let config = Config::from_toml_str(
        r#"
[spawn]
interval_min_secs = 3.0
interval_max_secs = 1.0

[jam]
blocking_distance = -2.0

[sim]
tick_hz = 0
"#,
    )
    .unwrap();

    assert_eq!(config.spawn_interval_min_secs(), 1.0);
    assert_eq!(config.spawn_interval_max_secs(), 3.0);
    assert_eq!(config.blocking_distance(), 0.0);
    assert_eq!(config.tick_hz(), 1);
}

#[test]
fn test_dev_config_parses() {
    let config = Config::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config/dev.toml")).unwrap();
    assert_eq!(config.regime_profile(Regime::Jam).speed, 0.0);
    assert_eq!(config.jam_accumulation_x(), 12.0);
    assert_eq!(config.egress_file(), "output/snapshots.jsonl");
}
