//! Command-line front end for the filesync watcher.
//!
//! ```text
//! filesync <ROOT> [PORT] [--config <FILE>] [--log-dir <DIR>] [--log-level <FILTER>]
//! ```
//!
//! With a `PORT` the watcher connects to the peer on `localhost:<PORT>`.
//! Without one it talks to its parent process over stdin/stdout, so nothing
//! but frames may ever be written to stdout.

pub mod logging;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use filesync_directory_watcher::{ExitReason, WatcherSettings, run_session};
use filesync_protocol::Carrier;
use tokio::net::TcpStream;
use tracing::info;

/// Watch a project tree and report changed source files to a peer.
#[derive(Debug, Parser)]
#[command(name = "filesync", version)]
pub struct Cli {
    /// Project root to watch.
    pub root: PathBuf,

    /// Connect to the peer on this localhost TCP port instead of using stdin/stdout.
    pub port: Option<u16>,

    /// TOML settings file (debounce window, idle sleep, extensions).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also write logs to a daily rolling file in this directory.
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, value_name = "FILTER", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// The carrier selected by the arguments.
    pub fn carrier(&self) -> Carrier {
        match self.port {
            Some(_) => Carrier::Socket,
            None => Carrier::Pipe,
        }
    }

    /// Settings from `--config`, or the defaults.
    pub fn settings(&self) -> anyhow::Result<WatcherSettings> {
        match &self.config {
            Some(path) => WatcherSettings::load(path)
                .with_context(|| format!("failed to load settings from {}", path.display())),
            None => Ok(WatcherSettings::default()),
        }
    }
}

/// Run one session on the carrier the arguments select.
pub async fn run(cli: &Cli) -> anyhow::Result<ExitReason> {
    let settings = cli.settings()?;
    info!("Watching {} over {}", cli.root.display(), cli.carrier());

    let reason = match cli.port {
        Some(port) => {
            let stream = TcpStream::connect(("localhost", port))
                .await
                .with_context(|| format!("failed to connect to localhost:{port}"))?;
            let (reader, writer) = stream.into_split();
            run_session(&cli.root, Carrier::Socket, reader, writer, &settings).await
        }
        None => {
            run_session(
                &cli.root,
                Carrier::Pipe,
                tokio::io::stdin(),
                tokio::io::stdout(),
                &settings,
            )
            .await
        }
    };

    reason.with_context(|| format!("watch session for {} failed", cli.root.display()))
}
