//! Root CLI structure for pose-blender

use clap::{Parser, Subcommand};

use crate::commands::blend::BlendArgs;
use crate::commands::inspect::InspectArgs;

#[derive(Parser)]
#[command(name = "pose-blender")]
#[command(about = "Inspect pose libraries and evaluate weighted pose blends", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the poses, bones and mirrored pairs of a rig
    Inspect(InspectArgs),

    /// Blend a rig's poses with the given weights and print the bone transforms
    Blend(BlendArgs),

    /// Print the left/right mirrored form of pose or bone names
    FlipName {
        /// Names to mirror
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
