//! Configuration for netcop.
//!
//! A TOML file layered under `NETCOP_*` environment variables, validated
//! eagerly and translated into `netcop_core::DispatchConfig`. The CLI adds
//! its flag overrides on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use netcop_core::{DEFAULT_SCRIPT_PATH, DispatchConfig, Interfaces};

/// Longest interface name the kernel accepts (IFNAMSIZ minus the NUL).
const MAX_INTERFACE_LEN: usize = 15;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("config file already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub interfaces: InterfacesSection,

    #[serde(default)]
    pub dispatch: DispatchSection,

    #[serde(default)]
    pub catalog: CatalogSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InterfacesSection {
    /// WAN interface.
    #[serde(default = "default_outside")]
    pub outside: String,

    /// LAN interface.
    #[serde(default = "default_inside")]
    pub inside: String,
}

impl Default for InterfacesSection {
    fn default() -> Self {
        Self {
            outside: default_outside(),
            inside: default_inside(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DispatchSection {
    #[serde(default = "default_script_path")]
    pub script_path: PathBuf,

    #[serde(default = "default_shell")]
    pub shell: PathBuf,

    /// Watch-loop period in seconds.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            script_path: default_script_path(),
            shell: default_shell(),
            interval_secs: default_interval(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CatalogSection {
    /// Policy catalog file (`.toml`, `.json`, `.yaml`).
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

fn default_outside() -> String {
    "eth0".into()
}
fn default_inside() -> String {
    "eth1".into()
}
fn default_script_path() -> PathBuf {
    PathBuf::from(DEFAULT_SCRIPT_PATH)
}
fn default_shell() -> PathBuf {
    PathBuf::from("/bin/sh")
}
fn default_interval() -> u64 {
    60
}
fn default_catalog_path() -> PathBuf {
    PathBuf::from("/etc/netcop/catalog.toml")
}

// ── Validation ──────────────────────────────────────────────────────

fn validate_interface(field: &str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(invalid(field, "interface name is empty"));
    }
    if name.len() > MAX_INTERFACE_LEN {
        return Err(invalid(
            field,
            format!("'{name}' is longer than {MAX_INTERFACE_LEN} bytes"),
        ));
    }
    if name.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(invalid(
            field,
            format!("'{name}' contains whitespace or '/'"),
        ));
    }
    Ok(())
}

impl Config {
    /// Validate and translate into the runtime dispatch configuration.
    pub fn to_dispatch_config(&self) -> Result<DispatchConfig, ConfigError> {
        let Self {
            interfaces,
            dispatch,
            ..
        } = self;

        validate_interface("interfaces.outside", &interfaces.outside)?;
        validate_interface("interfaces.inside", &interfaces.inside)?;
        if interfaces.outside == interfaces.inside {
            return Err(invalid(
                "interfaces.inside",
                format!("must differ from outside ('{}')", interfaces.outside),
            ));
        }
        if dispatch.interval_secs == 0 {
            return Err(invalid("dispatch.interval_secs", "must be at least 1"));
        }
        if dispatch.script_path.as_os_str().is_empty() {
            return Err(invalid("dispatch.script_path", "path is empty"));
        }
        if dispatch.shell.as_os_str().is_empty() {
            return Err(invalid("dispatch.shell", "path is empty"));
        }

        Ok(DispatchConfig {
            interfaces: Interfaces {
                outside: interfaces.outside.clone(),
                inside: interfaces.inside.clone(),
            },
            script_path: dispatch.script_path.clone(),
            shell: dispatch.shell.clone(),
            interval: Duration::from_secs(dispatch.interval_secs),
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "netcop", "netcop").map_or_else(
        || PathBuf::from("/etc/netcop/netcop.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered sources: defaults, then the TOML file, then `NETCOP_*` env
/// vars with `__` separating nested keys.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NETCOP_").split("__"))
}

/// Load config from `path`, or from the platform path when `None`.
///
/// An explicit path must exist; a missing platform file just means
/// defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let resolved = match path {
        Some(p) if !p.exists() => {
            return Err(ConfigError::NotFound {
                path: p.to_path_buf(),
            });
        }
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };
    Ok(figment(&resolved).extract()?)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parents.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Write the default configuration to `path`. Refuses to overwrite an
/// existing file unless `force` is set.
pub fn init_config(path: &Path, force: bool) -> Result<Config, ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    let cfg = Config::default();
    save_config(&cfg, path)?;
    Ok(cfg)
}
