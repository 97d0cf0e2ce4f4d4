use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::SearchProviderKind;
use crate::search::ContentFormat;

#[derive(Parser, Debug)]
#[command(name = "delve", version, about = "Recursive breadth/depth-bounded web research")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a query and print the learnings and visited URLs
    Research(ResearchArgs),
    /// Research a query and write a detailed Markdown report
    Report(ResearchArgs),
    /// Research a query and write a concise final answer
    Answer(ResearchArgs),
}

impl Commands {
    pub fn args(&self) -> &ResearchArgs {
        match self {
            Commands::Research(args) | Commands::Report(args) | Commands::Answer(args) => args,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ResearchArgs {
    /// What to research (5 to 1000 characters)
    #[arg(value_parser = parse_query)]
    pub query: String,

    /// Sub-queries explored per level
    #[arg(short, long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub breadth: u8,

    /// Recursion levels
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub depth: u8,

    /// Model name (e.g., "gpt-4o-mini", "o3-mini", "claude-3-5-haiku-latest")
    #[arg(short, long)]
    pub model: Option<String>,

    /// Search backend
    #[arg(long, value_enum)]
    pub provider: Option<SearchProviderKind>,

    /// Content format of scraped pages
    #[arg(long, value_enum)]
    pub format: Option<ContentFormat>,

    /// Branches in flight per recursion level
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-search timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Write the result to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to config file (overrides ./delve.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

fn parse_query(raw: &str) -> Result<String, String> {
    let len = raw.trim().chars().count();
    if !(5..=1000).contains(&len) {
        return Err(format!("query must be 5 to 1000 characters, got {len}"));
    }
    Ok(raw.trim().to_string())
}
