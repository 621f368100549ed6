//! Worker configuration tests.

use clap::Parser;
use drover_worker::{Cli, WorkerConfig};
use std::io::Write;
use std::time::Duration;

#[test]
fn defaults() {
    let config = WorkerConfig::from_toml("").unwrap();
    assert_eq!(config, WorkerConfig::default());
    assert_eq!(config.coordinator, "127.0.0.1:5000");

    let timing = config.timing();
    assert_eq!(timing.warmup, Duration::from_millis(500));
    assert_eq!(timing.sample, Duration::from_secs(1));
    assert_eq!(timing.pause, Duration::from_secs(1));
}

#[test]
fn env_var_expansion() {
    unsafe { std::env::set_var("TEST_DROVER_COORDINATOR", "10.1.2.3:5000") };
    let config = WorkerConfig::from_toml(
        r#"
coordinator = "${TEST_DROVER_COORDINATOR}"
id = "node-${TEST_DROVER_UNSET_SUFFIX}a"
"#,
    )
    .unwrap();
    assert_eq!(config.coordinator, "10.1.2.3:5000");
    assert_eq!(config.id.as_deref(), Some("node-a"));
    unsafe { std::env::remove_var("TEST_DROVER_COORDINATOR") };
}

#[test]
fn default_id_uses_pid() {
    let config = WorkerConfig::default();
    assert_eq!(config.worker_id(), format!("worker-{}", std::process::id()));

    let blank = WorkerConfig {
        id: Some("".into()),
        ..WorkerConfig::default()
    };
    assert_eq!(blank.worker_id(), config.worker_id());
}

#[test]
fn parse_full_config() {
    let toml = r#"
coordinator = "10.1.2.3:5000"
id = "render-01"
warmup_ms = 100
sample_ms = 250
pause_ms = 0
"#;
    let config = WorkerConfig::from_toml(toml).unwrap();
    assert_eq!(config.coordinator, "10.1.2.3:5000");
    assert_eq!(config.worker_id(), "render-01");
    assert_eq!(config.timing().sample, Duration::from_millis(250));
    assert_eq!(config.timing().pause, Duration::ZERO);
}

#[test]
fn flags_override_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "coordinator = \"10.0.0.1:5000\"\nid = \"from-file\"").unwrap();
    let path = file.path().to_str().unwrap().to_owned();

    let cli = Cli::try_parse_from(["drover-worker", "--config", &path, "--id", "from-flag"]).unwrap();
    let config = cli.resolve().unwrap();

    assert_eq!(config.coordinator, "10.0.0.1:5000");
    assert_eq!(config.worker_id(), "from-flag");
}

#[test]
fn rejects_unknown_types() {
    assert!(WorkerConfig::from_toml("sample_ms = \"soon\"").is_err());
}
