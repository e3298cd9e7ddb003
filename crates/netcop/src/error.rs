//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable
//! help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use netcop_config::ConfigError;
use netcop_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const STORE: i32 = 5;
    pub const SCRIPT: i32 = 6;
    pub const CONFIG: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Store ────────────────────────────────────────────────────────

    #[error("Policy catalog unavailable")]
    #[diagnostic(
        code(netcop::store),
        help(
            "{message}\n\
             Point [catalog] path in the config at a readable .toml, .json or .yaml file,\n\
             or pass --catalog."
        )
    )]
    StoreUnavailable { message: String },

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(netcop::not_found),
        help("Run: netcop {list_command} to see what the catalog holds")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Invalid {entity_type} {identifier}: {reason}")]
    #[diagnostic(code(netcop::invalid_data))]
    InvalidData {
        entity_type: String,
        identifier: String,
        reason: String,
    },

    // ── Dispatch script ──────────────────────────────────────────────

    #[error("Could not write dispatch script {path}")]
    #[diagnostic(
        code(netcop::script_write),
        help("Check that the directory exists and is writable, or set [dispatch] script_path.")
    )]
    ScriptWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dispatch script failed ({status})")]
    #[diagnostic(
        code(netcop::script_failed),
        help("{stderr}\nThe script is kept on disk; run it by hand to find the failing command.")
    )]
    ScriptFailed { status: String, stderr: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(netcop::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(netcop::config),
        help("Inspect the effective settings with: netcop config show")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON: {0}")]
    #[diagnostic(code(netcop::json))]
    Json(#[from] serde_json::Error),

    #[error("Could not render YAML: {0}")]
    #[diagnostic(code(netcop::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Could not render TOML: {0}")]
    #[diagnostic(code(netcop::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::StoreUnavailable { .. } => exit_code::STORE,
            Self::ScriptWrite { .. } | Self::ScriptFailed { .. } => exit_code::SCRIPT,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Config(_) => exit_code::CONFIG,
            _ => exit_code::GENERAL,
        }
    }
}

fn list_command(entity_type: &str) -> &'static str {
    match entity_type {
        "policy" => "policies list",
        _ => "policies show <ID>",
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::StoreUnavailable { message } => CliError::StoreUnavailable { message },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: list_command(&entity_type).into(),
                resource_type: entity_type,
                identifier,
            },

            CoreError::InvalidData {
                entity_type,
                identifier,
                reason,
            } => CliError::InvalidData {
                entity_type,
                identifier,
                reason,
            },

            CoreError::ScriptWrite { path, source } => CliError::ScriptWrite {
                path: path.display().to_string(),
                source,
            },

            CoreError::ScriptFailed { status, stderr } => CliError::ScriptFailed { status, stderr },

            CoreError::Io(e) => CliError::Io(e),
        }
    }
}
