//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Hierarchical object editor: named typed nodes, typed properties, encode/decode and clone
#[derive(Parser, Debug)]
#[command(name = "proptree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub debug: u8,

    /// Config file layered over the global config
    #[arg(short, long, global = true, env = "PROPTREE_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply edit operations to an empty model and print the result
    ///
    /// Each operation is one quoted argument:
    ///   proptree run "insert / A" "insert A B" "clone A/B" "set A/B1 test_float 4.4"
    Run {
        /// Also print the model encoding as TOML
        #[arg(short, long)]
        encode: bool,

        /// Operations: insert <parent|/> <Kind> | clone <path> | remove <path> | set <path> <property> <value>
        #[arg(required = true, num_args = 1..)]
        ops: Vec<String>,
    },

    /// List the registered node kinds
    Kinds,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print a commented config template
    Template,

    /// Show config paths
    Path,
}
