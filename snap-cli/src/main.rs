//! # snap-cli
//!
//! CLI tool for the blindsnap encrypted snapshot relay.
//!
//! ## Commands
//!
//! - `keygen`: Generate a P-256 signing identity
//! - `push`: Encrypt, sign and upload a snapshot
//! - `get`: Fetch a snapshot (and optionally decrypt it)
//! - `watch`: Stream a room's notifications
//! - `rooms`, `health`: Broker status
//!
//! ## Example
//!
//! ```bash
//! # Generate an identity
//! snap-cli keygen --out id.json
//!
//! # Push a snapshot to room "demo"
//! snap-cli push --project p1 --room demo --identity id.json '{"msg":"hello"}'
//!
//! # In another terminal, watch the room
//! snap-cli watch --ws-url ws://localhost:8787/ws --room demo
//!
//! # Read it back
//! snap-cli get <ID> --open
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{get, info, keygen, push, watch};

/// CLI tool for the blindsnap encrypted snapshot relay.
#[derive(Parser, Debug)]
#[command(name = "snap-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a signing identity
    Keygen {
        /// Where to write the identity (default: platform data directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Encrypt, sign and upload a snapshot
    Push(push::PushArgs),

    /// Fetch a snapshot by id
    Get {
        /// Broker base URL
        #[arg(long, env = "SNAP_URL", default_value = "http://localhost:8787")]
        url: String,

        /// Snapshot id
        id: String,

        /// Verify and decrypt the payload, printing the plaintext
        #[arg(long)]
        open: bool,
    },

    /// Print a room's notifications as JSON lines until Ctrl-C
    Watch {
        /// Broker WebSocket URL
        #[arg(long, default_value = "ws://localhost:8787/ws")]
        ws_url: String,

        /// Room to join (broker default when omitted)
        #[arg(long)]
        room: Option<String>,

        /// Broker API key
        #[arg(long, env = "RELAY_API_KEY")]
        token: Option<String>,
    },

    /// List active rooms
    Rooms {
        /// Broker base URL
        #[arg(long, env = "SNAP_URL", default_value = "http://localhost:8787")]
        url: String,
    },

    /// Show broker health
    Health {
        /// Broker base URL
        #[arg(long, env = "SNAP_URL", default_value = "http://localhost:8787")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { out } => {
            let out = match out {
                Some(path) => path,
                None => config::default_identity_path()?,
            };
            keygen::run(&out).await?;
        }
        Commands::Push(args) => {
            push::run(&args).await?;
        }
        Commands::Get { url, id, open } => {
            get::run(&url, &id, open).await?;
        }
        Commands::Watch {
            ws_url,
            room,
            token,
        } => {
            watch::run(&ws_url, room.as_deref(), token).await?;
        }
        Commands::Rooms { url } => {
            info::rooms(&url).await?;
        }
        Commands::Health { url } => {
            info::health(&url).await?;
        }
    }

    Ok(())
}
