use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::Sender;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use mail_frame::config::Configuration;
use mail_frame::controller::{SlideshowController, SlideshowOptions};
use mail_frame::events::ControlCommand;
use mail_frame::render::file::FileRenderer;
use mail_frame::source::MessageSource;
use mail_frame::source::spool::SpoolSource;
use mail_frame::store::AttachmentStore;
use mail_frame::tasks;

#[derive(Debug, Parser)]
#[command(
    name = "mail-frame",
    version,
    about = "Kiosk slideshow of image attachments from a labeled mail folder"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Override the time each image stays on screen
    #[arg(long = "seconds-per-image", value_name = "SECONDS")]
    seconds_per_image: Option<u64>,
    /// Render the first displayable image (or the empty screen) and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls level, default = info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let Args {
        config,
        seconds_per_image,
        once,
    } = Args::parse();

    let mut cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?;
    if let Some(seconds) = seconds_per_image {
        cfg.seconds_per_image = seconds;
    }
    let cfg = cfg.validated().context("invalid configuration values")?;
    tracing::info!(
        "Loaded configuration from {}:\n{:#?}",
        config.display(),
        cfg
    );

    let mut source = SpoolSource::new(&cfg.spool_path);
    let messages = match source.list_messages(&cfg.query) {
        Ok(messages) => messages,
        Err(err) => {
            tracing::warn!("initial listing failed; starting empty: {err}");
            Vec::new()
        }
    };
    let store = AttachmentStore::new(&cfg.cache_path);
    let renderer = FileRenderer::new(&cfg.display.output_path, cfg.display.bounds());
    let mut controller = SlideshowController::new(
        source,
        store,
        renderer,
        SlideshowOptions::from(&cfg),
        messages,
    );

    if once {
        controller.start();
        controller.close();
        return Ok(());
    }

    let (command_tx, command_rx) = crossbeam_channel::unbounded::<ControlCommand>();
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        let command_tx = command_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            let _ = command_tx.send(ControlCommand::Close);
            cancel.cancel();
        });
    }

    #[cfg(unix)]
    {
        forward_signal(SignalKind::user_defined1(), ControlCommand::Next, &command_tx, &cancel);
        forward_signal(
            SignalKind::user_defined2(),
            ControlCommand::Previous,
            &command_tx,
            &cancel,
        );
    }

    let mut tasks: JoinSet<Result<()>> = JoinSet::new();

    #[cfg(unix)]
    tasks.spawn({
        let socket_path = cfg.control_socket_path.clone();
        let command_tx = command_tx.clone();
        let cancel = cancel.clone();
        async move {
            tasks::control::run(socket_path, command_tx, cancel)
                .await
                .context("control task failed")
        }
    });

    // The slideshow thread stops once it sees Close or every sender is gone.
    drop(command_tx);
    let empty_refresh = cfg.empty_refresh_interval;
    let slideshow = tokio::task::spawn_blocking(move || {
        tasks::slideshow::run(&mut controller, &command_rx, empty_refresh);
    });
    if let Err(e) = slideshow.await {
        tracing::error!("slideshow thread failed: {e}");
    }
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}

#[cfg(unix)]
fn forward_signal(
    kind: SignalKind,
    command: ControlCommand,
    to_slideshow: &Sender<ControlCommand>,
    cancel: &CancellationToken,
) {
    let to_slideshow = to_slideshow.clone();
    let cancel = cancel.clone();
    tokio::spawn(async move {
        match signal(kind) {
            Ok(mut stream) => loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = stream.recv() => {
                        if received.is_none() {
                            break;
                        }
                        tracing::info!(?command, "signal received");
                        if to_slideshow.send(command).is_err() {
                            tracing::warn!("slideshow is gone; dropping {command:?}");
                            break;
                        }
                    }
                }
            },
            Err(err) => tracing::warn!("failed to register {kind:?} handler: {err}"),
        }
    });
}
