//! `gridfill`: fill card layouts in a document snapshot from a content feed.
//!
//! Documents are JSON snapshots (see `gf_core::snapshot`); items are the
//! normalized records printed by `gridfill fetch`.

mod commands;
mod error;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "gridfill", version)]
#[command(about = "Populate design cards from a GraphQL content feed", long_about = None)]
struct Cli {
    /// Engine config (JSON). Omitted fields keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch one page of the feed and print normalized items
    Fetch {
        #[arg(long)]
        brand: String,
        /// Page size (defaults to the configured page size)
        #[arg(long)]
        size: Option<u32>,
        /// Cursor from a previous page
        #[arg(long)]
        scroll_id: Option<String>,
        /// Print flattened raw hits instead of normalized items
        #[arg(long)]
        raw: bool,
        /// Print the mappable fields of the first item and their types
        #[arg(long, conflicts_with = "raw")]
        fields: bool,
    },

    /// Describe the selected layers of a document
    Introspect {
        #[arg(long)]
        doc: PathBuf,
        /// Comma-separated layer ids replacing the snapshot's selection
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,
    },

    /// Lint field-to-layer pairs against a document without writing
    Check {
        #[arg(long)]
        doc: PathBuf,
        #[command(flatten)]
        pairs: PairArgs,
        /// Items file; the first item is used to check field names
        #[arg(long)]
        items: Option<PathBuf>,
    },

    /// Apply field-to-layer pairs for a window of items
    Apply {
        #[arg(long)]
        doc: PathBuf,
        #[arg(long)]
        items: PathBuf,
        #[command(flatten)]
        pairs: PairArgs,
        #[command(flatten)]
        window: WindowArgs,
        /// Write the updated document here
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Fill the selected cards using a brand's name mapping
    Populate {
        #[arg(long)]
        doc: PathBuf,
        #[arg(long)]
        items: PathBuf,
        #[arg(long)]
        brand: String,
        /// Mapping store; without one the default names are used
        #[arg(long)]
        store: Option<PathBuf>,
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Save or load a brand's name mapping
    #[command(subcommand)]
    Mapping(MappingCommand),
}

#[derive(Subcommand)]
enum MappingCommand {
    /// Store a mapping; omitted names keep the defaults
    Save {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        meta: Option<String>,
        #[arg(long)]
        poster: Option<String>,
    },
    /// Print a brand's mapping (the defaults when none is saved)
    Load {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        store: PathBuf,
    },
}

#[derive(Args)]
struct PairArgs {
    /// JSON file of mapping rows
    #[arg(long, conflicts_with = "pair")]
    pairs: Option<PathBuf>,
    /// Inline pair, e.g. `title -> 12:34 | truncate=20` (repeatable)
    #[arg(long = "pair")]
    pair: Vec<String>,
}

#[derive(Args, Clone, Copy)]
struct WindowArgs {
    /// Index of the first item to use
    #[arg(long, default_value_t = 0)]
    offset: usize,
    /// Number of items to use; 0 means through the end
    #[arg(long, default_value_t = 0)]
    count: usize,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(commands::run(cli)) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
