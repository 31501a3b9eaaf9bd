//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Resolve book titles, authors and ISBNs to series membership.
///
/// Reads one JSON request per line (`{"key", "title", "author", "isbn"}`) from
/// the given files or stdin and prints one JSON result per request.
#[derive(Parser, Debug)]
#[command(name = "series-resolver")]
#[command(author, version, about)]
pub struct Args {
    /// Input files of JSON-line requests (reads stdin when omitted)
    pub inputs: Vec<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// SQLite database for resolved links; keys already stored are skipped
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Resolve keys even when the database already has a link for them
    #[arg(long, requires = "db")]
    pub no_skip: bool,

    /// Process at most this many requests
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: Option<u64>,

    /// Resolve each request through the full strategy cascade, one at a time
    #[arg(long)]
    pub single: bool,

    /// Minimum delay between lookups in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub rate_limit: Option<u64>,

    /// Per-request lookup timeout in seconds (1-3600)
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Search hits verified by the fuzzy fallback (1-50)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=50))]
    pub search_limit: Option<u64>,

    /// Lookup values per batched query (1-500)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=500))]
    pub batch_size: Option<u64>,

    /// Skip the per-request fallback strategies after the batch pass
    #[arg(long)]
    pub no_fallback: bool,

    /// Config file path (defaults to the XDG config location)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
