//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output::Printer;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let out = Printer::new(global);
    match args.command {
        // ── Show: effective settings, flags applied ─────────────────
        ConfigCommand::Show => {
            let cfg = config::apply_overrides(config::load(global)?, global);
            let text = toml::to_string_pretty(&cfg)?;
            out.single(
                &cfg,
                |_| text.trim_end().to_string(),
                |_| config::config_file(global).display().to_string(),
            )
        }

        ConfigCommand::Path => {
            out.print(&config::config_file(global).display().to_string());
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config::config_file(global);
            netcop_config::init_config(&path, force)?;
            if !global.quiet {
                eprintln!("Configuration written to {}", path.display());
                eprintln!("  Edit [catalog] path, then try: netcop status");
            }
            Ok(())
        }
    }
}
