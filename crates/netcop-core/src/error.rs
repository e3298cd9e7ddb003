// ── Core error types ──
//
// User-facing errors from netcop-core. Catalog parse failures never reach
// consumers raw: the `From<netcop_catalog::Error>` impl folds them into
// `StoreUnavailable`, which aborts the current dispatch cycle only.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Store errors ─────────────────────────────────────────────────
    #[error("Policy store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Invalid {entity_type} {identifier}: {reason}")]
    InvalidData {
        entity_type: String,
        identifier: String,
        reason: String,
    },

    // ── Dispatch errors ──────────────────────────────────────────────
    #[error("Cannot write dispatch script {}: {source}", path.display())]
    ScriptWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dispatch script exited with {status}: {stderr}")]
    ScriptFailed { status: String, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn not_found(entity_type: &str, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.to_string(),
        }
    }

    pub(crate) fn invalid(
        entity_type: &str,
        identifier: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidData {
            entity_type: entity_type.into(),
            identifier: identifier.to_string(),
            reason: reason.into(),
        }
    }
}

// ── Conversion from catalog errors ───────────────────────────────────

impl From<netcop_catalog::Error> for CoreError {
    fn from(err: netcop_catalog::Error) -> Self {
        CoreError::StoreUnavailable {
            message: err.to_string(),
        }
    }
}
