//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod compile;
pub mod config_cmd;
pub mod dispatch;
pub mod policies;
pub mod status;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Settings;
use crate::error::CliError;

/// Dispatch a catalog-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    settings: &Settings,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Policies(args) => policies::handle(settings, args, global),
        Command::Compile(args) => compile::handle(settings, args, global),
        Command::Status(args) => status::handle(settings, args, global),
        Command::Dispatch(args) => dispatch::handle(settings, args, global).await,
        Command::Watch(args) => watch::handle(settings, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
