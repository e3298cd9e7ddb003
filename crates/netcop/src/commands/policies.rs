//! Policy command handlers.

use serde::Serialize;
use tabled::Tabled;

use netcop_core::store::parameter_bag;
use netcop_core::{
    EntityId, MemoryStore, ParamKind, ParameterBag, Policy, PolicyStore, Target, schedule,
};

use crate::cli::{GlobalOpts, PoliciesArgs, PoliciesCommand};
use crate::config::{self, Settings};
use crate::error::CliError;
use crate::output::Printer;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PolicyRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Upload")]
    upload: String,
    #[tabled(rename = "Download")]
    download: String,
    #[tabled(rename = "Windows")]
    windows: String,
}

impl From<&Policy> for PolicyRow {
    fn from(p: &Policy) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.clone(),
            enabled: util::yes_no(p.enabled),
            action: util::action(p),
            upload: util::kbps(p.upload_kbps),
            download: util::kbps(p.download_kbps),
            windows: if p.has_windows() {
                p.windows.len().to_string()
            } else {
                "always".into()
            },
        }
    }
}

// ── Detail view ─────────────────────────────────────────────────────

/// A policy with everything compilation reads from it.
#[derive(Serialize)]
struct PolicyDetail {
    #[serde(flatten)]
    policy: Policy,
    targets: Vec<Target>,
    parameters: ParameterBag,
}

fn detail(d: &PolicyDetail) -> String {
    let p = &d.policy;
    let mut lines = vec![
        format!("ID:          {}", p.id),
        format!("Name:        {}", p.name),
        format!("Description: {}", p.description.as_deref().unwrap_or("-")),
        format!("Enabled:     {}", util::yes_no(p.enabled)),
        format!("Action:      {}", util::action(p)),
        format!(
            "Priority:    {}",
            p.priority
                .map_or_else(|| "-".into(), |pr| format!("{pr} ({})", pr.value()))
        ),
        format!("Upload:      {}", util::kbps(p.upload_kbps)),
        format!("Download:    {}", util::kbps(p.download_kbps)),
    ];

    if p.has_windows() {
        lines.push("Windows:".into());
        for w in &p.windows {
            lines.push(format!(
                "  {} {}-{}",
                w.weekday,
                w.start.format("%H:%M"),
                w.end.format("%H:%M")
            ));
        }
    } else {
        lines.push("Windows:     always".into());
    }

    lines.push(format!("Targets:     {}", d.targets.len()));
    for t in &d.targets {
        let class = t
            .class_id
            .map_or_else(|| "-".into(), |c| format!("class {c}"));
        let mac = t.mac.as_ref().map_or_else(|| "-".into(), ToString::to_string);
        lines.push(format!("  #{} {} {class} mac {mac}", t.id, t.role));
    }

    lines.push("Parameters:".into());
    for kind in [
        ParamKind::Mac,
        ParamKind::SourceIp,
        ParamKind::DestinationIp,
        ParamKind::TcpSourcePort,
        ParamKind::TcpDestinationPort,
        ParamKind::UdpSourcePort,
        ParamKind::UdpDestinationPort,
    ] {
        let values = d.parameters.values(kind);
        if !values.is_empty() {
            lines.push(format!("  {kind}: {}", values.join(",")));
        }
    }
    lines.join("\n")
}

fn show(store: &MemoryStore, id: i64) -> Result<PolicyDetail, CliError> {
    let id = EntityId::new(id);
    let policy = store.policy(id)?;
    Ok(PolicyDetail {
        targets: store.targets(id)?,
        parameters: parameter_bag(store, id)?,
        policy,
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    settings: &Settings,
    args: PoliciesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let store = settings.load_store()?;
    let out = Printer::new(global);
    match args.command {
        PoliciesCommand::List { active, at } => {
            let at = config::parse_at(at.as_deref())?;
            let policies: Vec<Policy> = store
                .policies()?
                .into_iter()
                .filter(|p| !active || schedule::is_active(p, at))
                .collect();
            out.list(&policies, |p| PolicyRow::from(p), |p| p.id.to_string())
        }

        PoliciesCommand::Show { id } => {
            let found = show(&store, id)?;
            out.single(&found, detail, |d| d.policy.id.to_string())
        }
    }
}
