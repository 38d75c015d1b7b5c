//! Weir CLI - segment inspection and replay tools

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use weir_core::{EventPointer, RecordBody};
use weir_log::{factory, meta};

#[derive(Parser)]
#[command(name = "weir")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a segment from the start, printing one line per record
    Replay {
        /// Path to the segment file
        file: PathBuf,
    },

    /// Print a segment's metadata sidecar
    Meta {
        /// Path to the segment file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    match cli.command {
        Commands::Replay { file } => replay(&file),
        Commands::Meta { file } => show_meta(&file),
    }
}

fn replay(file: &Path) -> Result<()> {
    let mut reader = factory::sequential_reader(file)?;
    let file_id = reader.log_file_id();

    let mut read_count = 0u64;
    let mut put_count = 0u64;
    let mut take_count = 0u64;
    let mut rollback_count = 0u64;
    let mut commit_count = 0u64;

    while let Some(entry) = reader.next()? {
        read_count += 1;
        // For puts the pointer is the record's own location; for takes it is
        // the put being consumed.
        let pointer = match &entry.record.body {
            RecordBody::Put(_) => {
                put_count += 1;
                Some(EventPointer::new(file_id, entry.offset))
            }
            RecordBody::Take(back) => {
                take_count += 1;
                Some(*back)
            }
            RecordBody::Rollback => {
                rollback_count += 1;
                None
            }
            RecordBody::Commit => {
                commit_count += 1;
                None
            }
        };

        let mut line = format!(
            "{}, {}, {}, {}, {}",
            entry.record.transaction_id,
            entry.record.write_order_id,
            file_id,
            entry.offset,
            entry.record.record_type().name()
        );
        if let Some(pointer) = pointer {
            line.push_str(&format!(", {pointer}"));
        }
        println!("{line}");
    }

    println!(
        "Replayed {} from {} read: {}, put: {}, take: {}, rollback: {}, commit: {}",
        read_count,
        file.display(),
        read_count,
        put_count,
        take_count,
        rollback_count,
        commit_count
    );
    Ok(())
}

fn show_meta(file: &Path) -> Result<()> {
    let meta = meta::read_metadata(file)?;
    println!("segment:                        {}", file.display());
    println!("version:                        {}", meta.version);
    println!("log file id:                    {}", meta.log_file_id);
    println!("last checkpoint offset:         {}", meta.last_checkpoint_offset);
    println!("last checkpoint write order id: {}", meta.last_checkpoint_write_order_id);
    Ok(())
}
