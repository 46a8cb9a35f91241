use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Traverse, validate and serve a multi-locale style-guide corpus.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the MCP server (default).
    Serve,
    /// Validate every page and report translation coverage.
    Check(CheckArgs),
    /// Print one JSON descriptor per valid page.
    List(ListArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ListArgs {
    /// Docs repository or content root (overrides DOCS_REPO_PATH).
    #[arg(short, long)]
    pub root: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CheckArgs {
    /// Docs repository or content root (overrides DOCS_REPO_PATH).
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Also fail on missing, orphaned or drifted translations.
    #[arg(long)]
    pub strict: bool,
}
