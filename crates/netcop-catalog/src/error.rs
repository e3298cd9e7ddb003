use std::path::PathBuf;

use thiserror::Error;

use crate::format::Format;

/// Top-level error type for the `netcop-catalog` crate.
///
/// `netcop-core` treats every variant as the store being unavailable for
/// the current dispatch cycle.
#[derive(Debug, Error)]
pub enum Error {
    // ── IO ──────────────────────────────────────────────────────────
    /// The catalog file could not be read.
    #[error("Cannot read catalog {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// The document did not parse in the selected format.
    #[error("Invalid {format} catalog: {message}")]
    Parse { format: Format, message: String },

    /// The file extension does not map to a supported format.
    #[error("Unsupported catalog format for {}: expected .toml, .json, .yaml or .yml", path.display())]
    UnsupportedFormat { path: PathBuf },
}
