//! Status command handler.

use std::time::Duration;

use chrono::NaiveDateTime;

use netcop_core::{DispatchStatus, Dispatcher};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::config::{self, Settings};
use crate::error::CliError;
use crate::output::Printer;

fn age(last: NaiveDateTime, now: NaiveDateTime) -> String {
    let secs = (now - last).num_seconds();
    if secs < 0 {
        return "in the future".into();
    }
    let secs = u64::try_from(secs).unwrap_or_default();
    format!("{} ago", humantime::format_duration(Duration::from_secs(secs)))
}

fn detail(status: &DispatchStatus, now: NaiveDateTime, out: &Printer) -> String {
    let last = status.last_dispatch.map_or_else(
        || "never".into(),
        |last| format!("{} ({})", last.format("%Y-%m-%d %H:%M:%S"), age(last, now)),
    );
    let changed = status.policy_set_changed.map_or_else(
        || out.dim("not evaluated"),
        |c| if c { "yes" } else { "no" }.to_string(),
    );

    [
        format!("Last dispatch:  {last}"),
        format!(
            "Temporal rules: {}",
            if status.has_temporal_rules { "yes" } else { "no" }
        ),
        format!("Set changed:    {changed}"),
        format!(
            "State:          {}",
            out.paint(status.state, !status.state.needs_dispatch())
        ),
    ]
    .join("\n")
}

pub fn handle(settings: &Settings, args: StatusArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = settings.load_store()?;
    let now = config::parse_at(args.at.as_deref())?;
    let dispatcher = Dispatcher::new(settings.dispatch.clone());
    let status = dispatcher.status(&store, now)?;

    let out = Printer::new(global);
    out.single(&status, |s| detail(s, now, &out), |s| s.state.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clap::Parser;
    use netcop_core::DispatchState;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn age_is_human_readable() {
        assert_eq!(age(at(9, 0), at(10, 30)), "1h 30m ago");
        assert_eq!(age(at(10, 0), at(9, 0)), "in the future");
    }

    #[test]
    fn never_dispatched() {
        let status = DispatchStatus {
            last_dispatch: None,
            has_temporal_rules: true,
            policy_set_changed: None,
            state: DispatchState::NoPriorDispatch,
        };
        let cli = crate::cli::Cli::parse_from(["netcop", "--color", "never", "status"]);
        let text = detail(&status, at(9, 0), &Printer::new(&cli.global));
        assert!(text.contains("Last dispatch:  never"));
        assert!(text.contains("Set changed:    not evaluated"));
        assert!(text.contains("State:          no_prior_dispatch"));
    }
}
