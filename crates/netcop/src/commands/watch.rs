//! Watch command handler: the long-running dispatch loop.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use netcop_core::{Dispatcher, load_catalog};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::config::Settings;
use crate::error::CliError;

pub async fn handle(
    settings: &Settings,
    args: WatchArgs,
    _global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut dispatch = settings.dispatch.clone();
    if let Some(secs) = args.interval {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        dispatch.interval = Duration::from_secs(secs);
    }

    // Fail fast on an unreadable catalog; later ticks only log.
    settings.load_store()?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupted, stopping");
                on_signal.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for ctrl-c"),
        }
    });

    let catalog = settings.catalog_path.clone();
    let dispatcher = Dispatcher::new(dispatch);
    dispatcher.watch(|| load_catalog(&catalog), cancel).await;
    Ok(())
}
