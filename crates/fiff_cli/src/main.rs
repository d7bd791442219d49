//! `fiff` command-line inspector.
//!
//! # Responsibility
//! - List the tag directory, block tree and projection items of a file.
//! - Map failures to `Error: ...` on stderr and exit code 1.

use clap::{Parser, Subcommand};
use fiff_core::{
    core_version, default_log_level, init_logging, open_fiff, projection_summary,
    read_projections, LogTarget, MissingFieldPolicy, ReadOptions,
};
use log::debug;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fiff")]
#[command(version = core_version())]
#[command(about = "Inspect FIFF tagged binary files", long_about = None)]
struct Cli {
    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Write rolling log files to this absolute directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one line per tag: offset, kind, type and size
    Dir {
        /// File to inspect
        file: PathBuf,
    },

    /// Print the block tree with per-block tag counts
    Tree {
        /// File to inspect
        file: PathBuf,
    },

    /// Print projection item summaries
    Proj {
        /// File to inspect
        file: PathBuf,

        /// Skip items with missing required tags instead of failing
        #[arg(long)]
        skip_invalid_items: bool,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or_else(|| default_log_level());
    let target = match cli.log_dir {
        Some(dir) => LogTarget::Directory(dir),
        None => LogTarget::Stderr,
    };
    init_logging(level, target)?;
    debug!("event=cli_start module=cli version={}", core_version());

    match cli.command {
        Commands::Dir { file } => {
            let reader = open_fiff(&file)?;
            debug!(
                "event=cli_dir module=cli source={:?}",
                reader.directory_source()
            );
            println!("{:>10}  {:>6}  {:>10}  {:>8}", "offset", "kind", "type", "size");
            for tag in reader.directory() {
                println!(
                    "{:>10}  {:>6}  {:#010x}  {:>8}",
                    tag.pos, tag.kind, tag.type_code, tag.size
                );
            }
        }

        Commands::Tree { file } => {
            let reader = open_fiff(&file)?;
            let tree = reader.tree();
            for (id, depth) in tree.walk() {
                let node = tree.block(id);
                println!(
                    "{}block {} ({} tags, {} children)",
                    "  ".repeat(depth),
                    node.kind,
                    node.tags.len(),
                    node.children.len()
                );
            }
        }

        Commands::Proj {
            file,
            skip_invalid_items,
        } => {
            let options = ReadOptions {
                missing_fields: if skip_invalid_items {
                    MissingFieldPolicy::SkipItem
                } else {
                    MissingFieldPolicy::Abort
                },
            };
            let mut reader = open_fiff(&file)?;
            let root = reader.tree().root();
            let items = read_projections(&mut reader, root, &options)?;
            for line in projection_summary(&items) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
