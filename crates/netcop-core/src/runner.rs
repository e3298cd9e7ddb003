// ── Script runner ──
//
// Persists the rendered script and hands it to the operating system. The
// script file doubles as the dispatch record: its modification time is
// the last-dispatch timestamp. Only a script that exited cleanly is moved
// into place, so a failed cycle leaves the record untouched.

use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::error::CoreError;

/// Executor seam consumed by the dispatcher.
pub trait ScriptRunner {
    /// Local time of the last successful dispatch, or `None` when nothing
    /// was ever dispatched.
    fn last_dispatch(&self) -> Result<Option<NaiveDateTime>, CoreError>;

    /// Execute `script` and record it as dispatched when it succeeds.
    fn apply(&self, script: &str) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Runs the script from `<path>.tmp` with a shell and renames it over
/// `<path>` once it succeeded.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    script_path: PathBuf,
    shell: PathBuf,
}

impl ShellRunner {
    pub fn new(script_path: impl Into<PathBuf>, shell: impl Into<PathBuf>) -> Self {
        Self {
            script_path: script_path.into(),
            shell: shell.into(),
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(&config.script_path, &config.shell)
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.script_path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn write_error(&self, source: io::Error) -> CoreError {
        CoreError::ScriptWrite {
            path: self.script_path.clone(),
            source,
        }
    }

    /// Write `<path>.tmp` and make it executable.
    async fn stage(&self, script: &str) -> Result<PathBuf, CoreError> {
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, script)
            .await
            .map_err(|e| self.write_error(e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o755))
                .await
                .map_err(|e| self.write_error(e))?;
        }
        debug!(path = %tmp.display(), bytes = script.len(), "script staged");
        Ok(tmp)
    }

    async fn run(&self, path: &Path) -> Result<(), CoreError> {
        let output = Command::new(&self.shell)
            .arg(path)
            .output()
            .await
            .map_err(|e| CoreError::ScriptFailed {
                status: format!("could not start {}", self.shell.display()),
                stderr: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(CoreError::ScriptFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

impl ScriptRunner for ShellRunner {
    fn last_dispatch(&self) -> Result<Option<NaiveDateTime>, CoreError> {
        match std::fs::metadata(&self.script_path) {
            Ok(meta) => {
                let modified = DateTime::<Local>::from(meta.modified()?);
                Ok(Some(modified.naive_local()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::Io(e)),
        }
    }

    async fn apply(&self, script: &str) -> Result<(), CoreError> {
        let tmp = self.stage(script).await?;

        if let Err(e) = self.run(&tmp).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                warn!(path = %tmp.display(), error = %cleanup, "could not remove failed script");
            }
            return Err(e);
        }

        tokio::fs::rename(&tmp, &self.script_path)
            .await
            .map_err(|e| self.write_error(e))?;
        info!(path = %self.script_path.display(), "script applied");
        Ok(())
    }
}
