use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hearth",
    about = "Accounts, todos and blogs kept in memory and snapshotted to disk",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Open the stores and run autosave until interrupted
    Serve(ServeArgs),
    /// Summarize the snapshot files in a data directory
    Inspect(InspectArgs),
    /// Register an account without starting the backend
    AddAccount(AddAccountArgs),
    /// Print the default configuration as TOML
    DefaultConfig,
}

/// Where to find configuration and data.
#[derive(Args, Clone, Debug, Default)]
pub struct Location {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Data directory, overriding the configuration
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub location: Location,
}

#[derive(Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub location: Location,
}

#[derive(Args)]
pub struct AddAccountArgs {
    #[command(flatten)]
    pub location: Location,
    /// Display name of the new account
    pub name: String,
    /// Secret for the new account
    #[arg(long)]
    pub secret: String,
}
