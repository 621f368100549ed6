//! Coordinator configuration tests.

use clap::Parser;
use drover_coordinator::{Cli, CoordinatorConfig};
use std::io::Write;
use std::time::Duration;

#[test]
fn empty_config_uses_defaults() {
    let config = CoordinatorConfig::from_toml("").unwrap();
    assert_eq!(config, CoordinatorConfig::default());
    assert_eq!(config.bind, "0.0.0.0:5000");
    assert_eq!(config.interval(), Duration::from_secs(5));
    assert_eq!(config.stale_after(), Duration::from_secs(15));
    assert_eq!(config.task_duration_secs, 3.0);
    assert_eq!(config.work, "compute_pi");
}

#[test]
fn parse_full_config() {
    let toml = r#"
bind = "127.0.0.1:7000"
interval_secs = 2
stale_after_secs = 6.5
task_duration_secs = 1.25
work = "matrix"
dispatch_timeout_secs = 1
"#;
    let config = CoordinatorConfig::from_toml(toml).unwrap();
    assert_eq!(config.bind, "127.0.0.1:7000");
    assert_eq!(config.interval(), Duration::from_secs(2));
    assert_eq!(config.stale_after(), Duration::from_millis(6500));
    assert_eq!(config.task_duration_secs, 1.25);
    assert_eq!(config.work, "matrix");
    assert_eq!(config.dispatch_timeout(), Duration::from_secs(1));
}

#[test]
fn env_var_expansion() {
    unsafe { std::env::set_var("TEST_DROVER_BIND", "127.0.0.1:6001") };
    let config = CoordinatorConfig::from_toml(r#"bind = "${TEST_DROVER_BIND}""#).unwrap();
    assert_eq!(config.bind, "127.0.0.1:6001");
    unsafe { std::env::remove_var("TEST_DROVER_BIND") };
}

#[test]
fn rejects_zero_interval() {
    let err = CoordinatorConfig::from_toml("interval_secs = 0").unwrap_err();
    assert!(err.to_string().contains("interval_secs"));
}

#[test]
fn rejects_negative_task_duration() {
    assert!(CoordinatorConfig::from_toml("task_duration_secs = -1").is_err());
}

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "interval_secs = 1").unwrap();
    let config = CoordinatorConfig::load(file.path()).unwrap();
    assert_eq!(config.interval(), Duration::from_secs(1));
}

#[test]
fn load_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(CoordinatorConfig::load(&dir.path().join("absent.toml")).is_err());
}

#[test]
fn flags_override_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "bind = \"127.0.0.1:7000\"\ninterval_secs = 9").unwrap();
    let path = file.path().to_str().unwrap().to_owned();

    let cli = Cli::try_parse_from([
        "droverd",
        "--config",
        &path,
        "--interval",
        "2",
        "--stale-after",
        "4",
    ])
    .unwrap();
    let config = cli.resolve().unwrap();

    assert_eq!(config.bind, "127.0.0.1:7000");
    assert_eq!(config.interval(), Duration::from_secs(2));
    assert_eq!(config.stale_after(), Duration::from_secs(4));
}

#[test]
fn cli_without_file_uses_defaults() {
    let cli = Cli::try_parse_from(["droverd", "--bind", "127.0.0.1:5555"]).unwrap();
    let config = cli.resolve().unwrap();
    assert_eq!(config.bind, "127.0.0.1:5555");
    assert_eq!(config.task_duration_secs, 3.0);
}
