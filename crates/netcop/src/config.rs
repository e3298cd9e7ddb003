//! CLI configuration: thin wrapper around `netcop_config`.
//!
//! Adds the resolution step that applies `GlobalOpts` flag overrides
//! (--catalog, --script, --outside, --inside) before validation, plus the
//! `--at` timestamp parser shared by several commands.

use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};

use netcop_config::Config;
use netcop_core::{DispatchConfig, MemoryStore};

use crate::cli::GlobalOpts;
use crate::error::CliError;

const AT_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Everything a store-bound command needs.
#[derive(Debug, Clone)]
pub struct Settings {
    pub dispatch: DispatchConfig,
    pub catalog_path: PathBuf,
}

impl Settings {
    pub fn load_store(&self) -> Result<MemoryStore, CliError> {
        Ok(netcop_core::load_catalog(&self.catalog_path)?)
    }
}

/// The config file in use: `--config` / `NETCOP_CONFIG`, else the
/// platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(netcop_config::config_path)
}

/// Load the layered config file without flag overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(netcop_config::load_config(global.config.as_deref())?)
}

/// Apply flag overrides on top of the loaded config.
pub fn apply_overrides(mut cfg: Config, global: &GlobalOpts) -> Config {
    if let Some(ref path) = global.catalog {
        cfg.catalog.path.clone_from(path);
    }
    if let Some(ref path) = global.script {
        cfg.dispatch.script_path.clone_from(path);
    }
    if let Some(ref name) = global.outside {
        cfg.interfaces.outside.clone_from(name);
    }
    if let Some(ref name) = global.inside {
        cfg.interfaces.inside.clone_from(name);
    }
    cfg
}

/// Load, override, then validate.
pub fn resolve(global: &GlobalOpts) -> Result<Settings, CliError> {
    let cfg = apply_overrides(load(global)?, global);
    let dispatch = cfg.to_dispatch_config()?;
    tracing::debug!(
        catalog = %cfg.catalog.path.display(),
        script = %dispatch.script_path.display(),
        outside = %dispatch.interfaces.outside,
        inside = %dispatch.interfaces.inside,
        "resolved settings"
    );
    Ok(Settings {
        dispatch,
        catalog_path: cfg.catalog.path,
    })
}

/// Parse `--at`, defaulting to the current local time.
pub fn parse_at(at: Option<&str>) -> Result<NaiveDateTime, CliError> {
    let Some(raw) = at else {
        return Ok(Local::now().naive_local());
    };
    let raw = raw.trim();
    AT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| CliError::Validation {
            field: "at".into(),
            reason: format!("'{raw}' is not \"YYYY-MM-DD HH:MM[:SS]\""),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn at_accepts_seconds_or_minutes() {
        let with_secs = parse_at(Some("2024-01-02 09:30:15")).unwrap();
        assert_eq!(
            with_secs,
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 30, 15)
                .unwrap()
        );
        let without = parse_at(Some(" 2024-01-02 09:30 ")).unwrap();
        assert_eq!(without.second(), 0);
        assert_eq!(without.minute(), 30);
    }

    #[test]
    fn at_rejects_other_shapes() {
        for bad in ["yesterday", "2024-01-02", "09:30", "2024-13-01 00:00"] {
            assert!(
                matches!(parse_at(Some(bad)), Err(CliError::Validation { .. })),
                "{bad} parsed"
            );
        }
    }

    #[test]
    fn overrides_replace_config_values() {
        use clap::Parser;

        let cli = crate::cli::Cli::parse_from([
            "netcop",
            "--catalog",
            "/srv/catalog.yaml",
            "--outside",
            "ppp0",
            "status",
        ]);
        let cfg = apply_overrides(Config::default(), &cli.global);
        assert_eq!(cfg.catalog.path, PathBuf::from("/srv/catalog.yaml"));
        assert_eq!(cfg.interfaces.outside, "ppp0");
        assert_eq!(cfg.interfaces.inside, Config::default().interfaces.inside);
    }
}
