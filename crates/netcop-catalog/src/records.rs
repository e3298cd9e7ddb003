// Catalog record types
//
// One struct per table of the policy store. Foreign keys are plain ids and
// numeric fields are wide signed integers so that out-of-range rows survive
// parsing and can be rejected one by one during conversion.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::format::Format;

// ── Document ─────────────────────────────────────────────────────────

/// A complete catalog document. Every table defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub traffic_classes: Vec<TrafficClassRecord>,
    pub cidrs: Vec<CidrRecord>,
    pub ports: Vec<PortRecord>,
    pub class_cidrs: Vec<ClassCidrRecord>,
    pub class_ports: Vec<ClassPortRecord>,
    pub policies: Vec<PolicyRecord>,
    pub targets: Vec<TargetRecord>,
    pub time_windows: Vec<TimeWindowRecord>,
}

impl Catalog {
    /// Read and parse a catalog file, picking the format from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let format = Format::from_path(path).ok_or_else(|| Error::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::parse(format, &text)?;
        debug!(
            path = %path.display(),
            %format,
            policies = catalog.policies.len(),
            classes = catalog.traffic_classes.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse a catalog document held in memory.
    pub fn parse(format: Format, text: &str) -> Result<Self, Error> {
        let parsed = match format {
            Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| Error::Parse { format, message })
    }
}

// ── Traffic classes ──────────────────────────────────────────────────

/// Row of the `traffic_classes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficClassRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 0 = system class, anything else = user-defined.
    #[serde(default)]
    pub kind: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Row of the `cidrs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CidrRecord {
    pub id: i64,
    pub address: String,
    #[serde(default)]
    pub prefix: i64,
}

/// Row of the `ports` table. `protocol` is 0 (both), 6 (TCP) or 17 (UDP).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortRecord {
    pub id: i64,
    pub number: i64,
    #[serde(default)]
    pub protocol: i64,
}

/// Row of the `class_cidrs` association table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassCidrRecord {
    pub class_id: i64,
    pub cidr_id: i64,
    #[serde(default = "default_group")]
    pub group: String,
}

/// Row of the `class_ports` association table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPortRecord {
    pub class_id: i64,
    pub port_id: i64,
    #[serde(default = "default_group")]
    pub group: String,
}

// ── Policies ─────────────────────────────────────────────────────────

/// Row of the `policies` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 1 = high, 3 = normal, 7 = low.
    #[serde(default)]
    pub priority: Option<i64>,
    /// Upload cap in kbit/s.
    #[serde(default)]
    pub upload: Option<i64>,
    /// Download cap in kbit/s.
    #[serde(default)]
    pub download: Option<i64>,
}

/// Row of the `targets` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub id: i64,
    pub policy_id: i64,
    #[serde(default)]
    pub class_id: Option<i64>,
    /// `"o"` / `"source"` or `"d"` / `"destination"`.
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub mac: Option<String>,
}

/// Row of the `time_windows` table.
///
/// `weekday` counts from Sunday (0) to Saturday (6); times are `HH:MM` or
/// `HH:MM:SS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindowRecord {
    pub id: i64,
    pub policy_id: i64,
    pub weekday: i64,
    pub start: String,
    pub end: String,
}

// ── Coded columns ────────────────────────────────────────────────────

/// Decoded value of `TargetRecord::role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCode {
    Source,
    Destination,
}

impl FromStr for RoleCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "o" | "source" => Ok(Self::Source),
            "d" | "destination" => Ok(Self::Destination),
            other => Err(format!("unknown target role '{other}'")),
        }
    }
}

/// Decoded value of the association tables' `group` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCode {
    Inside,
    Outside,
}

impl FromStr for GroupCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "i" | "inside" => Ok(Self::Inside),
            "o" | "outside" => Ok(Self::Outside),
            other => Err(format!("unknown group '{other}'")),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_role() -> String {
    "d".into()
}
fn default_group() -> String {
    "o".into()
}
