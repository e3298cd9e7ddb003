//! Compile command handler: show the classifier rules without dispatching.

use tabled::Tabled;

use netcop_core::dispatch::compile_policies;
use netcop_core::{CompiledPolicy, EntityId, Policy, PolicyStore, RuleFlags, active_policies};

use crate::cli::{CompileArgs, GlobalOpts, OutputFormat};
use crate::config::{self, Settings};
use crate::error::CliError;
use crate::output::{self, Printer};

use super::util;

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "Policy")]
    policy: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Match")]
    rule: String,
}

fn render_rule(rule: &RuleFlags) -> String {
    if rule.is_empty() {
        "(any)".into()
    } else {
        rule.to_string()
    }
}

fn rows(compiled: &[CompiledPolicy]) -> Vec<RuleRow> {
    compiled
        .iter()
        .flat_map(|c| {
            c.rules.iter().enumerate().map(|(i, rule)| RuleRow {
                policy: c.policy.id.to_string(),
                name: c.policy.name.clone(),
                action: util::action(&c.policy),
                index: i + 1,
                rule: render_rule(rule),
            })
        })
        .collect()
}

/// The requested policies in the order given, or every policy active at
/// `at` when none are named.
fn select<S: PolicyStore>(
    store: &S,
    ids: &[i64],
    at: chrono::NaiveDateTime,
) -> Result<Vec<Policy>, CliError> {
    if ids.is_empty() {
        return Ok(active_policies(store, at)?);
    }
    ids.iter()
        .map(|id| store.policy(EntityId::new(*id)).map_err(CliError::from))
        .collect()
}

pub fn handle(settings: &Settings, args: CompileArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = settings.load_store()?;
    let at = config::parse_at(args.at.as_deref())?;
    let compiled = compile_policies(&store, select(&store, &args.ids, at)?)?;

    let out = Printer::new(global);
    let text = match out.format() {
        OutputFormat::Table => output::table(&rows(&compiled)),
        OutputFormat::Plain => compiled
            .iter()
            .flat_map(|c| c.rules.iter().map(render_rule))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => out.structured(&compiled)?,
    };
    out.print(&text);
    Ok(())
}
