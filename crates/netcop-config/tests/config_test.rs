//! Loading and writing config files on disk.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;

use netcop_config::{Config, ConfigError, init_config, load_config, save_config};

#[test]
fn partial_file_is_layered_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("netcop.toml");
    std::fs::write(
        &path,
        "[interfaces]\noutside = \"ppp0\"\n\n[dispatch]\ninterval_secs = 5\n",
    )
    .unwrap();

    let cfg = load_config(Some(&path)).unwrap();
    assert_eq!(cfg.interfaces.outside, "ppp0");
    assert_eq!(cfg.interfaces.inside, "eth1");
    assert_eq!(cfg.dispatch.interval_secs, 5);
    assert_eq!(cfg.catalog, Config::default().catalog);

    let dispatch = cfg.to_dispatch_config().unwrap();
    assert_eq!(dispatch.interval, Duration::from_secs(5));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}

#[test]
fn wrong_types_fail_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("netcop.toml");
    std::fs::write(&path, "[dispatch]\ninterval_secs = \"soon\"\n").unwrap();
    assert!(matches!(
        load_config(Some(&path)),
        Err(ConfigError::Figment(_))
    ));
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("netcop.toml");

    let mut cfg = Config::default();
    cfg.interfaces.inside = "br-lan".into();
    cfg.catalog.path = dir.path().join("catalog.yaml");
    save_config(&cfg, &path).unwrap();

    assert_eq!(load_config(Some(&path)).unwrap(), cfg);
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("netcop.toml");

    init_config(&path, false).unwrap();
    assert!(matches!(
        init_config(&path, false),
        Err(ConfigError::AlreadyExists { .. })
    ));
    assert_eq!(init_config(&path, true).unwrap(), Config::default());
}
