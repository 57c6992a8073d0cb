use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use tokio::io::AsyncReadExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::ControlCommand;

/// Accepts JSON control commands on a Unix socket and forwards them to the
/// slideshow thread.
///
/// Each connection carries one or more `{"command": "..."}` objects and is
/// read to EOF. Malformed input is logged and dropped. The socket file is
/// removed on shutdown.
pub async fn run(
    socket_path: PathBuf,
    to_slideshow: Sender<ControlCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    if let Some(parent) = socket_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    remove_stale_socket(&socket_path)?;

    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("failed to bind control socket {}", socket_path.display()))?;
    info!(path = %socket_path.display(), "control socket listening");

    loop {
        select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let to_slideshow = to_slideshow.clone();
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(stream, to_slideshow).await {
                            warn!("control connection failed: {err:?}");
                        }
                    });
                }
                Err(err) => warn!("control socket accept failed: {err}"),
            },
        }
    }

    drop(listener);
    if let Err(err) = std::fs::remove_file(&socket_path) {
        if err.kind() != io::ErrorKind::NotFound {
            warn!(path = %socket_path.display(), "failed to remove control socket: {err}");
        }
    }
    debug!("control socket closed");
    Ok(())
}

async fn handle_connection(
    mut stream: UnixStream,
    to_slideshow: Sender<ControlCommand>,
) -> Result<()> {
    let mut raw = Vec::new();
    stream
        .read_to_end(&mut raw)
        .await
        .context("failed to read control message")?;

    for command in parse_commands(&raw) {
        info!(?command, "control command accepted");
        if to_slideshow.send(command).is_err() {
            warn!("slideshow is gone; dropping control command");
            break;
        }
    }
    Ok(())
}

/// Parses a stream of concatenated JSON commands, stopping at the first
/// malformed one.
pub fn parse_commands(raw: &[u8]) -> Vec<ControlCommand> {
    let mut commands = Vec::new();
    for parsed in serde_json::Deserializer::from_slice(raw).into_iter::<ControlCommand>() {
        match parsed {
            Ok(command) => commands.push(command),
            Err(err) => {
                warn!("ignoring malformed control message: {err}");
                break;
            }
        }
    }
    commands
}

fn remove_stale_socket(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale control socket");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("failed to remove stale socket {}", path.display()))
        }
    }
}
