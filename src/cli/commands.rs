//! Command dispatch: one function per subcommand.

use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use tracing::{debug, instrument};

use crate::application::catalog;
use crate::application::services::{ModelSession, ScriptOp};
use crate::application::ApplicationResult;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::CliResult;
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::TreeArena;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Run { encode, ops }) => run(cli, *encode, ops),
        Some(Commands::Kinds) => kinds(),
        Some(Commands::Config { command }) => config(cli, command),
        Some(Commands::Completion { shell }) => completion(*shell),
        None => {
            Cli::command()
                .print_help()
                .map_err(|e| crate::cli::CliError::Usage(e.to_string()))?;
            Ok(())
        }
    }
}

#[instrument(level = "debug", skip(cli))]
fn run(cli: &Cli, encode: bool, ops: &[String]) -> CliResult<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    debug!("settings: {:?}", settings);
    let ops = ops
        .iter()
        .map(|op| op.parse::<ScriptOp>())
        .collect::<ApplicationResult<Vec<_>>>()?;

    let mut session = ModelSession::new(catalog::demo_registry()?, &settings);
    session.run(&ops)?;
    output::success(&format!("applied {} operation(s)", ops.len()));

    output::info(&session.render_tree()?);
    if encode {
        output::header("# encoding");
        output::info(&session.encode_toml()?);
    }
    Ok(())
}

fn kinds() -> CliResult<()> {
    let registry = catalog::demo_registry()?;
    // Templates are unbound, so an empty tree serves as their lookup
    let empty = TreeArena::new();
    for kind in registry.kinds() {
        output::header(kind.id());
        output::detail(&format!("standard name: {}", kind.standard_name()));
        for (name, template) in kind.property_templates().iter() {
            let shown = match template.as_object_ref() {
                Some(r) => format!("-> {}", r.target_kind()),
                None => template.display(&empty),
            };
            output::detail(&format!("{name} ({}): {shown}", template.kind()));
        }
        if !kind.child_kinds().is_empty() {
            let children: Vec<String> = kind.child_kinds().iter().map(|k| k.name.clone()).collect();
            output::detail(&format!("children: {}", children.join(", ")));
        }
    }
    Ok(())
}

fn config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(cli.config.as_deref())?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::action("global", "<no config directory>"),
            }
            if let Some(path) = &cli.config {
                output::action("explicit", &path.display());
            }
        }
    }
    Ok(())
}

fn completion(shell: Shell) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
