//! CLI definitions for Formpilot.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Formpilot CLI.
#[derive(Parser)]
#[command(name = "formpilot")]
#[command(about = "Adaptive web form filling with replayable recipes")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.formpilot/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Fill one application form
    Apply {
        /// Form URL
        #[arg(long)]
        url: String,

        /// Platform key, e.g. "greenhouse_acme"
        #[arg(long)]
        platform: String,

        /// Path to the applicant profile JSON file
        #[arg(long)]
        profile: PathBuf,

        /// Resume file to upload (overrides the profile's resume_path)
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Job title, fed to the answer generator
        #[arg(long)]
        job_title: Option<String>,

        /// Company name, fed to the answer generator
        #[arg(long)]
        company: Option<String>,
    },

    /// Recipe inspection commands
    Recipe {
        #[command(subcommand)]
        action: RecipeAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum RecipeAction {
    /// List all stored recipes with usage stats
    List,

    /// Show one recipe in full, steps included
    Show {
        /// Platform key
        platform_key: String,
    },
}
