// tests/config_loading.rs

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;

use filewatch::config::{load_and_validate, load_or_default};
use filewatch::errors::FileWatchError;
use filewatch::{ExecutionContextKind, SinceWhen};

#[test]
fn full_config_loads() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[watch]
paths = ["/tmp/watch", "/var/log"]
context = "affiliated"
latency_ms = 100
recursive = false
"#
    )
    .unwrap();

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(
        cfg.watch.paths,
        vec![PathBuf::from("/tmp/watch"), PathBuf::from("/var/log")]
    );
    assert_eq!(cfg.watch.context, ExecutionContextKind::Affiliated);
    assert_eq!(cfg.watch.latency, Duration::from_millis(100));
    assert_eq!(cfg.watch.since, SinceWhen::Now);
    assert!(!cfg.watch.recursive);
}

#[test]
fn unknown_context_is_a_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[watch]\ncontext = \"main-thread\"\n").unwrap();

    match load_and_validate(file.path()) {
        Err(FileWatchError::TomlError(_)) => {}
        Err(e) => panic!("Expected TomlError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn bad_since_is_a_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[watch]\nsince = \"yesterday\"\n").unwrap();

    match load_and_validate(file.path()) {
        Err(FileWatchError::ConfigError(msg)) => assert!(msg.contains("since")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn missing_explicit_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    assert!(matches!(
        load_and_validate(&missing),
        Err(FileWatchError::IoError(_))
    ));
}

#[test]
fn missing_default_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_or_default(dir.path().join("Filewatch.toml")).unwrap();

    assert!(cfg.watch.paths.is_empty());
    assert_eq!(cfg.watch.context, ExecutionContextKind::Background);
    assert!(cfg.watch.recursive);
}
