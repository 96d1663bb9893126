use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Bootstrap the factory MongoDB database: application user, collections and indexes.
#[derive(Debug, Parser)]
#[command(name = "factory-db-init", version, about)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// MongoDB connection URI, overrides configuration and environment.
    #[arg(long, global = true)]
    pub uri: Option<String>,

    /// Target database, overrides configuration and environment.
    #[arg(long, global = true)]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create the user, collections and indexes (default). Fails on a non-empty database.
    Init,
    /// Check that an initialized database matches the schema, without changing it.
    Verify,
    /// Print the schema as JSON without connecting.
    Plan,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Init)
    }
}
