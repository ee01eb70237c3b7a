//! Root CLI parser and global options.

use clap::Parser;

use crate::commands::Commands;

/// Multi-tenant gateway that runs tenant code addressed by subdomain.
#[derive(Parser)]
#[command(name = "classio")]
#[command(about = "Run tenant code behind a subdomain gateway")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
