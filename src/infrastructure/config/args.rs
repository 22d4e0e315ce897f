use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "refract",
    version,
    about = "Loads catalog artwork through a cached, coalescing image pipeline",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Catalog search term.
    #[arg(short, long)]
    pub term: Option<String>,

    /// Maximum number of catalog results.
    #[arg(long)]
    pub limit: Option<u32>,

    /// Maximum concurrent image fetches.
    #[arg(long)]
    pub max_concurrent_fetches: Option<usize>,

    /// Emit pipeline request events.
    #[arg(long)]
    pub pipeline_debug: bool,

    /// Emit cache hit/miss/eviction events.
    #[arg(long)]
    pub cache_debug: bool,
}
