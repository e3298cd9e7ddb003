//! Clap derive structures for the `netcop` CLI.
//!
//! Only clap and clap_complete may be used here: build.rs includes this
//! file to render man pages and completion scripts.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// netcop -- compile traffic policies into packet-filter rules
#[derive(Debug, Parser)]
#[command(
    name = "netcop",
    version,
    about = "Compile and dispatch network traffic policies",
    long_about = "Turns bandwidth limits, priority tiers, access restrictions and \
        time-of-day schedules into iptables and tc rules, and re-applies them \
        whenever the set of active policies changes.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "NETCOP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Policy catalog file (overrides [catalog] path)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Dispatch script path (overrides [dispatch] script_path)
    #[arg(long, global = true)]
    pub script: Option<PathBuf>,

    /// Outside (WAN) interface
    #[arg(long, global = true)]
    pub outside: Option<String>,

    /// Inside (LAN) interface
    #[arg(long, global = true)]
    pub inside: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NETCOP_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Colorize status output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print nothing but errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

// ── Output selection ─────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables
    Table,
    /// Pretty-printed JSON
    Json,
    /// JSON on one line
    JsonCompact,
    /// YAML
    Yaml,
    /// Bare ids or words, one per line
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Color when stdout is a terminal and NO_COLOR is unset
    Auto,
    /// Always color
    Always,
    /// Never color
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect catalog policies
    #[command(alias = "pol", alias = "p")]
    Policies(PoliciesArgs),

    /// Show the classifier rules policies compile to
    Compile(CompileArgs),

    /// Show the last dispatch and whether a new one is needed
    Status(StatusArgs),

    /// Run one dispatch cycle
    Dispatch(DispatchArgs),

    /// Dispatch periodically until interrupted
    Watch(WatchArgs),

    /// Manage netcop configuration
    Config(ConfigArgs),

    /// Print a shell completion script
    Completions(CompletionsArgs),
}

// ── Policies ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PoliciesArgs {
    #[command(subcommand)]
    pub command: PoliciesCommand,
}

#[derive(Debug, Subcommand)]
pub enum PoliciesCommand {
    /// List policies in catalog order
    #[command(alias = "ls")]
    List {
        /// Only policies in effect at --at (default: now)
        #[arg(long)]
        active: bool,

        /// Evaluation time, "YYYY-MM-DD HH:MM[:SS]" local time
        #[arg(long)]
        at: Option<String>,
    },

    /// Show a policy with its targets, windows and parameters
    Show {
        /// Policy ID
        id: i64,
    },
}

// ── Compile / Status / Dispatch / Watch ──────────────────────────────

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Policy IDs to compile regardless of schedule (default: all active)
    pub ids: Vec<i64>,

    /// Evaluation time, "YYYY-MM-DD HH:MM[:SS]" local time
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Evaluation time, "YYYY-MM-DD HH:MM[:SS]" local time
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Debug, Args)]
pub struct DispatchArgs {
    /// Apply even when the active policy set is unchanged
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Print the script instead of applying it
    #[arg(long, short = 'n')]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between cycles (overrides [dispatch] interval_secs)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
