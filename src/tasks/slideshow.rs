use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, at, never, select};
use tracing::{debug, info};

use crate::controller::{SlideshowController, SlideshowState};
use crate::events::ControlCommand;
use crate::render::Renderer;
use crate::source::MessageSource;

/// Drives the controller on the current thread until it is closed.
///
/// Rules:
/// - Commands, the controller's advance timer, and the empty-state retry are
///   the only wake-ups; each is handled to completion before the next.
/// - Fetching and decoding block this thread, so run it off the async runtime.
/// - While empty, the listing is retried every `empty_refresh`.
/// - Dropping every command sender closes the slideshow.
pub fn run<S, R>(
    controller: &mut SlideshowController<S, R>,
    commands: &Receiver<ControlCommand>,
    empty_refresh: Duration,
) where
    S: MessageSource,
    R: Renderer,
{
    controller.start();
    let mut retry_at: Option<Instant> = None;

    loop {
        match controller.state() {
            SlideshowState::Closed => break,
            SlideshowState::Empty => {
                retry_at.get_or_insert_with(|| Instant::now() + empty_refresh);
            }
            _ => retry_at = None,
        }

        let timer = controller
            .timer()
            .map(|timer| timer.receiver().clone())
            .unwrap_or_else(never);
        let retry = retry_at.map(at).unwrap_or_else(never);

        select! {
            recv(commands) -> command => match command {
                Ok(command) => {
                    debug!(?command, "control command received");
                    controller.handle(command);
                }
                Err(_) => {
                    info!("command channel closed; stopping slideshow");
                    controller.close();
                }
            },
            recv(timer) -> _ => controller.on_timer(),
            recv(retry) -> _ => {
                retry_at = None;
                debug!("retrying listing from empty state");
                controller.refresh_empty();
            }
        }
    }
}
