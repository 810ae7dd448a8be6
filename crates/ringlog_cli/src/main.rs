//! ringlog daemon
//!
//! Runs the ringlog TCP line service and inspects its data files.
//!
//! # Commands
//!
//! - `serve` - Accept connections until SIGINT or SIGTERM
//! - `inspect` - Show the records a data file would restore

mod commands;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ringlog command-line daemon.
#[derive(Parser)]
#[command(name = "ringlogd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the TCP line service
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "0.0.0.0:9000")]
        bind: SocketAddr,

        /// Number of records kept
        #[arg(short, long, default_value = "10")]
        capacity: usize,

        /// File the records are mirrored to
        #[arg(short, long, default_value = ringlog_server::DEFAULT_DATA_FILE)]
        data_file: PathBuf,

        /// Keep records in memory only
        #[arg(long, conflicts_with = "data_file")]
        in_memory: bool,

        /// Leave the data file in place on exit
        #[arg(long)]
        keep_data_file: bool,

        /// Seconds between timestamp records (0 disables them)
        #[arg(short, long, default_value = "10")]
        timestamp_interval: u64,

        /// Reply after every committed record instead of at end of input
        #[arg(long)]
        reply_on_commit: bool,

        /// Maximum concurrent sessions
        #[arg(long, default_value = "1000")]
        max_sessions: usize,
    },

    /// Show the records a data file would restore
    Inspect {
        /// Data file to read
        #[arg(short, long, default_value = ringlog_server::DEFAULT_DATA_FILE)]
        data_file: PathBuf,

        /// Number of records kept
        #[arg(short, long, default_value = "10")]
        capacity: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve {
            bind,
            capacity,
            data_file,
            in_memory,
            keep_data_file,
            timestamp_interval,
            reply_on_commit,
            max_sessions,
        } => {
            let options = commands::serve::ServeOptions {
                bind,
                capacity,
                data_file: (!in_memory).then_some(data_file),
                keep_data_file,
                timestamp_interval,
                reply_on_commit,
                max_sessions,
            };
            commands::serve::run(options).await?;
        }
        Commands::Inspect {
            data_file,
            capacity,
            format,
        } => {
            commands::inspect::run(&data_file, capacity, &format)?;
        }
    }

    Ok(())
}
