use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Parser)]
#[command(name = "framectl", about = "Control a running mail-frame kiosk")]
struct Args {
    /// Kiosk control socket.
    #[arg(long, default_value = "/run/mail-frame/control.sock")]
    socket: PathBuf,

    /// Logging level (error|warn|info|debug|trace).
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Show the next image and restart the advance timer.
    Next,
    /// Show the previous image and restart the advance timer.
    Previous,
    /// Stop the slideshow.
    Close,
}

impl Command {
    fn wire_name(self) -> &'static str {
        match self {
            Command::Next => "next",
            Command::Previous => "previous",
            Command::Close => "close",
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;
    send(&args.socket, args.command)
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::builder()
        .parse(level)
        .with_context(|| format!("invalid log level '{level}'"))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn encode(command: Command) -> Vec<u8> {
    serde_json::json!({ "command": command.wire_name() })
        .to_string()
        .into_bytes()
}

fn send(socket: &Path, command: Command) -> Result<()> {
    let mut stream = UnixStream::connect(socket).with_context(|| {
        format!("failed to connect to control socket at {}", socket.display())
    })?;
    stream
        .write_all(&encode(command))
        .with_context(|| format!("failed to send {} command", command.wire_name()))?;
    debug!(?command, socket = %socket.display(), "command sent");
    Ok(())
}
