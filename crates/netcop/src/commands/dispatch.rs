//! Dispatch command handler.

use chrono::Local;

use netcop_core::{DispatchOutcome, Dispatcher};

use crate::cli::{DispatchArgs, GlobalOpts};
use crate::config::Settings;
use crate::error::CliError;
use crate::output::Printer;

fn detail(outcome: &DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Skipped { state } => format!("Nothing to dispatch ({state})"),
        DispatchOutcome::Applied { policies, rules } => {
            format!("Dispatched {policies} policies ({rules} rules)")
        }
    }
}

fn plain(outcome: &DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Skipped { .. } => "skipped".into(),
        DispatchOutcome::Applied { .. } => "applied".into(),
    }
}

pub async fn handle(
    settings: &Settings,
    args: DispatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let store = settings.load_store()?;
    let dispatcher = Dispatcher::new(settings.dispatch.clone());
    let now = Local::now().naive_local();
    let out = Printer::new(global);

    if args.dry_run {
        let script = dispatcher.preview(&store, now)?;
        out.print(script.trim_end());
        return Ok(());
    }

    let outcome = dispatcher.run_cycle(&store, now, args.force).await?;
    out.single(&outcome, detail, plain)
}
