// ── Runtime dispatch configuration ──
//
// Describes *where* rules are applied and *how often*. Built and validated
// by netcop-config (or by tests) and handed in; core never reads config
// files itself.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Default location of the generated script. A temporary directory keeps
/// stale rules from surviving a reboot.
pub const DEFAULT_SCRIPT_PATH: &str = "/tmp/netcop-despachar-politicas";

/// The two gateway interfaces traffic is shaped on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interfaces {
    /// WAN side. Upload traffic leaves through it.
    pub outside: String,
    /// LAN side. Download traffic leaves through it.
    pub inside: String,
}

impl Default for Interfaces {
    fn default() -> Self {
        Self {
            outside: "eth0".into(),
            inside: "eth1".into(),
        }
    }
}

/// Validated configuration for a `Dispatcher`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchConfig {
    pub interfaces: Interfaces,
    /// Where the rendered script is written. Its modification time is the
    /// last-dispatch timestamp.
    pub script_path: PathBuf,
    /// Interpreter used to run the script.
    pub shell: PathBuf,
    /// Tick period of the watch loop.
    pub interval: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interfaces: Interfaces::default(),
            script_path: PathBuf::from(DEFAULT_SCRIPT_PATH),
            shell: PathBuf::from("/bin/sh"),
            interval: Duration::from_secs(60),
        }
    }
}
