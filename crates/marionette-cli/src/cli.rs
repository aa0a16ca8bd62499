//! Command-line argument definitions using clap.

use clap::{Parser, Subcommand};

/// Marionette - tiered desktop automation
#[derive(Parser, Debug)]
#[command(name = "marionette")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (same as RUST_LOG=debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a request without executing anything
    Classify {
        /// The request, in plain words
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Classify a request and run it through the tier chain
    Run {
        /// The request, in plain words
        #[arg(required = true)]
        text: Vec<String>,

        /// Skip the vision-guided tier even when an API key is set
        #[arg(long)]
        no_vision: bool,
    },

    /// Show the detected platform and its capability flags
    Caps,

    /// List installed applications
    Apps,

    /// Show battery status
    Battery,

    /// Check automation permissions, optionally prompting for missing ones
    Permissions {
        /// Prompt the user toward granting missing permissions
        #[arg(long)]
        request: bool,
    },
}
