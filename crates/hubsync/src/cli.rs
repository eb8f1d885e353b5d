//! Clap derive structures for the `hubsync` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// hubsync -- keep a local device cache in sync with a cloud hub app
#[derive(Debug, Parser)]
#[command(
    name = "hubsync",
    version,
    about = "Sync hub devices and serve the hub's direct-connect webhook",
    long_about = "Pulls the device inventory from the hub app on a schedule, applies\n\
        pushed attribute changes as they arrive, and exposes the webhook\n\
        endpoint the hub app talks to.",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    /// Defaults to `run`
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "HUBSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the sync service and webhook listener
    Run,

    /// Fetch the inventory once and print the reconcile report
    Check,

    /// Send a command to a device
    #[command(name = "command")]
    Send(SendArgs),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Hub device id
    pub device_id: String,

    /// Command name, e.g. `on` or `setLevel`
    pub command: String,

    /// Command arguments, each parsed as JSON (plain words become strings)
    pub values: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the resolved configuration with secrets masked
    Show,

    /// Print the config file path
    Path,
}
