use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "arenabot",
    about = "Unattended multi-account battle automation for MoltArena",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the battle scheduler
    Run {
        /// Override the roster file path
        #[arg(long)]
        roster: Option<PathBuf>,

        /// Run a single cycle and exit instead of looping
        #[arg(long)]
        once: bool,
    },

    /// Show effective configuration
    Config {
        /// Emit configuration as JSON
        #[arg(long)]
        json: bool,
    },
}
