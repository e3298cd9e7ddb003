//! Loading catalogs from disk in each supported format.
#![allow(clippy::unwrap_used)]

use std::fs;

use netcop_catalog::{Catalog, Error};
use pretty_assertions::assert_eq;

const TOML_CATALOG: &str = r#"
[[traffic_classes]]
id = 1
name = "ssh"
kind = 1

[[ports]]
id = 1
number = 22
protocol = 6

[[class_ports]]
class_id = 1
port_id = 1
group = "o"

[[policies]]
id = 7
name = "limit ssh"
download = 1024

[[targets]]
id = 1
policy_id = 7
class_id = 1
role = "d"

[[time_windows]]
id = 1
policy_id = 7
weekday = 2
start = "09:00"
end = "17:00"
"#;

const JSON_CATALOG: &str = r#"{
  "traffic_classes": [{ "id": 1, "name": "ssh", "kind": 1 }],
  "ports": [{ "id": 1, "number": 22, "protocol": 6 }],
  "class_ports": [{ "class_id": 1, "port_id": 1, "group": "o" }],
  "policies": [{ "id": 7, "name": "limit ssh", "download": 1024 }],
  "targets": [{ "id": 1, "policy_id": 7, "class_id": 1, "role": "d" }],
  "time_windows": [
    { "id": 1, "policy_id": 7, "weekday": 2, "start": "09:00", "end": "17:00" }
  ]
}"#;

const YAML_CATALOG: &str = r#"
traffic_classes:
  - { id: 1, name: ssh, kind: 1 }
ports:
  - { id: 1, number: 22, protocol: 6 }
class_ports:
  - { class_id: 1, port_id: 1, group: o }
policies:
  - { id: 7, name: limit ssh, download: 1024 }
targets:
  - { id: 1, policy_id: 7, class_id: 1, role: d }
time_windows:
  - { id: 1, policy_id: 7, weekday: 2, start: "09:00", end: "17:00" }
"#;

fn write(name: &str, body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    (dir, path)
}

#[test]
fn test_formats_agree() {
    let (_a, toml_path) = write("catalog.toml", TOML_CATALOG);
    let (_b, json_path) = write("catalog.json", JSON_CATALOG);
    let (_c, yaml_path) = write("catalog.yaml", YAML_CATALOG);

    let from_toml = Catalog::from_path(&toml_path).unwrap();
    let from_json = Catalog::from_path(&json_path).unwrap();
    let from_yaml = Catalog::from_path(&yaml_path).unwrap();

    assert_eq!(from_toml, from_json);
    assert_eq!(from_toml, from_yaml);
    assert_eq!(from_toml.policies[0].download, Some(1024));
    assert_eq!(from_toml.time_windows[0].start, "09:00");
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Catalog::from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }), "unexpected error: {err}");
}

#[test]
fn test_unknown_extension_rejected() {
    let (_d, path) = write("catalog.ini", "");
    let err = Catalog::from_path(&path).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { .. }));
}

#[test]
fn test_malformed_document_is_parse_error() {
    let (_d, path) = write("catalog.toml", "[[policies]]\nid = \"one\"\n");
    let err = Catalog::from_path(&path).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }), "unexpected error: {err}");
}
