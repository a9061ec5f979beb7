//! CLI module - Command-line interface for shortplay
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// shortplay - Drama catalog front-end with an episode resolver and media proxy
#[derive(Parser)]
#[command(name = "shortplay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    #[command(alias = "web")]
    Serve,

    /// Resolve a title and print the selected episode as JSON
    #[command(alias = "r")]
    Resolve {
        /// Title identifier
        id: String,
        /// Episode number; defaults to the first episode
        episode: Option<String>,
    },

    /// Search the catalog
    #[command(alias = "s")]
    Search {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
