use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

#[derive(Parser, Debug)]
#[command(name = "metamenu")]
#[command(version)]
#[command(about = "Resolve class fields for a vault of markdown documents")]
#[command(long_about = "
metamenu indexes a folder of markdown documents. Class definition documents
declare fields; other documents join classes through their frontmatter,
their tags or configured queries, and get one resolved field list each.

Settings are read from --config (or <vault>/.metamenu.yaml when present),
then from METAMENU_* environment variables.

Example usage:
  metamenu index ~/notes                      # Index and summarize
  metamenu --format=json fields ~/notes a.md  # Fields of one document
  metamenu new-id ~/notes                     # Unused field id
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Settings file (.yaml, .toml or .json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a full index pass and print its report
    Index {
        /// Vault root
        vault: PathBuf,
    },
    /// Print the resolved fields of one document
    Fields {
        /// Vault root
        vault: PathBuf,
        /// Document path relative to the vault root
        document: String,
    },
    /// List classes with their effective fields
    Classes {
        /// Vault root
        vault: PathBuf,
    },
    /// Print a field id unused by any class or preset
    NewId {
        /// Vault root
        vault: PathBuf,
    },
}

impl Commands {
    pub fn vault(&self) -> &PathBuf {
        match self {
            Commands::Index { vault }
            | Commands::Fields { vault, .. }
            | Commands::Classes { vault }
            | Commands::NewId { vault } => vault,
        }
    }
}
