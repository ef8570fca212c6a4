// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn parse(args: &[&str]) -> Args {
    Args::try_parse_from(std::iter::once("ecld").chain(args.iter().copied())).unwrap()
}

#[test]
fn defaults_without_flags() {
    let settings = parse(&[]).resolve().unwrap();

    assert_eq!(settings.pipeline, PipelineConfig::default());
    assert_eq!(settings.output, PathBuf::from("logs/entity-changes.jsonl"));
    assert_eq!(settings.log, PathBuf::from("logs/ecld.log"));
}

#[test]
fn flags_override_defaults() {
    let settings = parse(&[
        "--wal",
        "/tmp/x/changes.log",
        "--batch-size",
        "7",
        "--workers",
        "2",
        "--queue-capacity",
        "64",
        "--flush-interval",
        "250ms",
    ])
    .resolve()
    .unwrap();

    let p = &settings.pipeline;
    assert_eq!(p.wal_path, PathBuf::from("/tmp/x/changes.log"));
    assert_eq!(p.batch_size, 7);
    assert_eq!(p.worker_threads, 2);
    assert_eq!(p.queue_capacity, 64);
    assert_eq!(p.flush_interval, Duration::from_millis(250));
}

#[test]
fn flags_override_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.toml");
    std::fs::write(&path, "batch_size = 50\nworker_threads = 3\n").unwrap();

    let settings = parse(&["--config", path.to_str().unwrap(), "--batch-size", "9"])
        .resolve()
        .unwrap();

    assert_eq!(settings.pipeline.batch_size, 9);
    assert_eq!(settings.pipeline.worker_threads, 3);
}

#[parameterized(
    zero_batch = { "--batch-size" },
    zero_workers = { "--workers" },
    zero_capacity = { "--queue-capacity" },
)]
fn zero_overrides_are_rejected(flag: &str) {
    let err = parse(&[flag, "0"]).resolve().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn bad_duration_fails_to_parse() {
    assert!(Args::try_parse_from(["ecld", "--flush-interval", "soon"]).is_err());
}

#[test]
fn missing_config_file_is_an_error() {
    let err = parse(&["--config", "/nonexistent/pipeline.toml"])
        .resolve()
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
