//! Slideshow navigation engine.
//!
//! Owns the message list, the cursor, and the auto-advance timer handle, and
//! turns navigation requests into frames: resolve the attachment, read it
//! through the cache, decode, fit, hand it to the renderer, re-arm the timer.
//!
//! Rules:
//! - Manual navigation cancels the pending timer before anything else and the
//!   completed transition arms a fresh one, so the clock restarts from zero.
//! - Wrapping past either end of the list re-lists messages first (when
//!   enabled) and computes the new cursor against the new length.
//! - Messages without a usable attachment are skipped in the direction of
//!   travel; a full cycle of failures ends in the empty state, reported once.
//! - An unreachable source keeps the current frame and retries the same
//!   target on the next tick, up to [`MAX_STALLED_RETRIES`] times before the
//!   target is skipped.

use std::fmt;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::decode::{DecodedImage, ImageDecoder};
use crate::error::FrameError;
use crate::events::{ControlCommand, MessageId, MessageList};
use crate::render::{Bounds, Frame, Renderer};
use crate::source::MessageSource;
use crate::store::{AttachmentStore, BlobOrigin};

/// Consecutive timer retries spent on one unreachable target before moving past it.
pub const MAX_STALLED_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct SlideshowOptions {
    /// Listing query sent to the source on every refresh.
    pub query: String,
    /// Auto-advance interval.
    pub time_per_image: Duration,
    pub auto_refresh_on_wraparound: bool,
}

impl From<&Configuration> for SlideshowOptions {
    fn from(cfg: &Configuration) -> Self {
        Self {
            query: cfg.query.clone(),
            time_per_image: cfg.time_per_image(),
            auto_refresh_on_wraparound: cfg.auto_refresh_on_wraparound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideshowState {
    /// Constructed, not started.
    Idle,
    /// Fetching and decoding the next frame.
    Transitioning,
    /// The frame for this cursor is on screen and the timer is armed.
    Showing(usize),
    /// The source failed while moving to this index. The previous frame stays
    /// up and the next timer tick retries the same index.
    Stalled(usize),
    /// Nothing to show; auto-advance is suspended.
    Empty,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Manual,
    Timer,
}

/// Pending auto-advance. Dropping the handle cancels it.
#[derive(Debug)]
pub struct AdvanceTimer {
    fires: Receiver<Instant>,
    deadline: Instant,
}

impl AdvanceTimer {
    fn arm(delay: Duration) -> Self {
        Self {
            fires: crossbeam_channel::after(delay),
            deadline: Instant::now() + delay,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Yields exactly once, when the timer expires.
    pub fn receiver(&self) -> &Receiver<Instant> {
        &self.fires
    }
}

#[derive(Debug, Default)]
struct NavigationState {
    messages: MessageList,
    cursor: usize,
    timer: Option<AdvanceTimer>,
}

enum FrameFailure {
    NoAttachment,
    Unusable(FrameError),
    SourceDown(FrameError),
}

impl fmt::Display for FrameFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAttachment => f.write_str("message has no attachment"),
            Self::Unusable(err) | Self::SourceDown(err) => err.fmt(f),
        }
    }
}

pub struct SlideshowController<S, R> {
    source: S,
    store: AttachmentStore,
    decoder: ImageDecoder,
    renderer: R,
    options: SlideshowOptions,
    nav: NavigationState,
    state: SlideshowState,
    bounds: Bounds,
    empty_shown: bool,
    dry_cycle_reported: bool,
    stalled_retries: u32,
}

impl<S, R> SlideshowController<S, R>
where
    S: MessageSource,
    R: Renderer,
{
    /// Builds an idle controller over the startup listing. Display bounds are
    /// read from the renderer once, here.
    pub fn new(
        source: S,
        store: AttachmentStore,
        renderer: R,
        options: SlideshowOptions,
        messages: MessageList,
    ) -> Self {
        let bounds = renderer.bounds();
        Self {
            source,
            store,
            decoder: ImageDecoder,
            renderer,
            options,
            nav: NavigationState {
                messages,
                ..NavigationState::default()
            },
            state: SlideshowState::Idle,
            bounds,
            empty_shown: false,
            dry_cycle_reported: false,
            stalled_retries: 0,
        }
    }

    pub fn state(&self) -> SlideshowState {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.nav.cursor
    }

    pub fn messages(&self) -> &[MessageId] {
        &self.nav.messages
    }

    pub fn timer(&self) -> Option<&AdvanceTimer> {
        self.nav.timer.as_ref()
    }

    pub fn is_timer_armed(&self) -> bool {
        self.nav.timer.is_some()
    }

    /// True once a full pass over the list produced nothing to show; cleared
    /// by the next frame that makes it to the screen.
    pub fn is_dry_cycle_reported(&self) -> bool {
        self.dry_cycle_reported
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn store(&self) -> &AttachmentStore {
        &self.store
    }

    pub fn start(&mut self) {
        if self.state != SlideshowState::Idle {
            debug!(state = ?self.state, "slideshow already started");
            return;
        }
        info!(
            messages = self.nav.messages.len(),
            interval = %humantime::format_duration(self.options.time_per_image),
            width = self.bounds.width,
            height = self.bounds.height,
            "starting slideshow"
        );
        if self.nav.messages.is_empty() {
            self.enter_empty();
            return;
        }
        self.show_from(0, Direction::Forward);
    }

    pub fn next(&mut self) {
        self.navigate(Direction::Forward, Trigger::Manual);
    }

    pub fn previous(&mut self) {
        self.navigate(Direction::Backward, Trigger::Manual);
    }

    /// Auto-advance; called when the armed timer fires. Ticks arriving with no
    /// armed timer are stale and ignored.
    pub fn on_timer(&mut self) {
        if self.nav.timer.take().is_none() {
            debug!("ignoring timer tick with no armed timer");
            return;
        }
        self.navigate(Direction::Forward, Trigger::Timer);
    }

    /// Re-lists messages while in the empty state and resumes from the first
    /// message once the listing has content.
    pub fn refresh_empty(&mut self) {
        if self.state != SlideshowState::Empty {
            return;
        }
        if !self.reload_messages() {
            return;
        }
        if self.nav.messages.is_empty() {
            debug!("listing still empty");
            return;
        }
        self.nav.cursor = 0;
        self.show_from(0, Direction::Forward);
    }

    pub fn close(&mut self) {
        if self.state == SlideshowState::Closed {
            return;
        }
        self.cancel_timer();
        self.state = SlideshowState::Closed;
        info!("slideshow closed");
    }

    pub fn handle(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::Next => self.next(),
            ControlCommand::Previous => self.previous(),
            ControlCommand::Close => self.close(),
        }
    }

    fn navigate(&mut self, direction: Direction, trigger: Trigger) {
        let stalled_target = match self.state {
            SlideshowState::Showing(_) => None,
            SlideshowState::Stalled(target) => Some(target),
            SlideshowState::Empty => {
                debug!(?direction, "no content; navigation ignored");
                return;
            }
            SlideshowState::Idle | SlideshowState::Transitioning | SlideshowState::Closed => {
                debug!(state = ?self.state, ?direction, "navigation ignored");
                return;
            }
        };

        // A timer tick has already consumed its handle; manual input drops the pending one.
        self.cancel_timer();

        let target = match (trigger, stalled_target) {
            (Trigger::Timer, Some(target)) if target < self.nav.messages.len() => {
                self.stalled_retries += 1;
                if self.stalled_retries <= MAX_STALLED_RETRIES {
                    Some(target)
                } else {
                    warn!(
                        cursor = target,
                        retries = MAX_STALLED_RETRIES,
                        "source keeps failing for this message; moving past it"
                    );
                    self.stalled_retries = 0;
                    self.step(target, direction)
                }
            }
            _ => {
                self.stalled_retries = 0;
                self.step(self.nav.cursor, direction)
            }
        };
        match target {
            Some(target) => self.show_from(target, direction),
            None => self.enter_empty(),
        }
    }

    /// Index after `from` in `direction`. Wrapping refreshes the list when
    /// enabled; `None` means the list is empty.
    fn step(&mut self, from: usize, direction: Direction) -> Option<usize> {
        let len = self.nav.messages.len();
        match direction {
            Direction::Forward if from + 1 < len => return Some(from + 1),
            Direction::Backward if from > 0 && from < len => return Some(from - 1),
            _ => {}
        }

        debug!(?direction, len, "cursor wrapped");
        if self.options.auto_refresh_on_wraparound {
            self.reload_messages();
        }
        let len = self.nav.messages.len();
        if len == 0 {
            return None;
        }
        Some(match direction {
            Direction::Forward => 0,
            Direction::Backward => len - 1,
        })
    }

    fn reload_messages(&mut self) -> bool {
        match self.source.list_messages(&self.options.query) {
            Ok(messages) => {
                info!(
                    previous = self.nav.messages.len(),
                    current = messages.len(),
                    "message list refreshed"
                );
                self.nav.messages = messages;
                true
            }
            Err(err) => {
                warn!(
                    error = %err,
                    kept = self.nav.messages.len(),
                    "message list refresh failed; keeping previous list"
                );
                false
            }
        }
    }

    fn show_from(&mut self, start: usize, direction: Direction) {
        self.state = SlideshowState::Transitioning;
        let mut target = start;
        let mut attempts = 0usize;

        loop {
            let len = self.nav.messages.len();
            if len == 0 {
                self.enter_empty();
                return;
            }
            if attempts >= len {
                if !self.dry_cycle_reported {
                    warn!(
                        messages = len,
                        "no message has a displayable attachment; pausing auto-advance"
                    );
                    self.dry_cycle_reported = true;
                }
                self.enter_empty();
                return;
            }
            attempts += 1;
            target = target.min(len - 1);

            let message_id = self.nav.messages[target].clone();
            match self.prepare_frame(&message_id) {
                Ok(image) => {
                    self.present(target, message_id, image);
                    return;
                }
                Err(FrameFailure::SourceDown(err)) => {
                    warn!(
                        message_id = %message_id,
                        cursor = target,
                        error = %err,
                        "message source unavailable; keeping current frame"
                    );
                    self.nav.cursor = self.nav.cursor.min(len - 1);
                    self.state = SlideshowState::Stalled(target);
                    self.arm_timer();
                    return;
                }
                Err(failure) => {
                    warn!(
                        message_id = %message_id,
                        cursor = target,
                        reason = %failure,
                        "skipping message"
                    );
                    match self.step(target, direction) {
                        Some(next) => target = next,
                        None => {
                            self.enter_empty();
                            return;
                        }
                    }
                }
            }
        }
    }

    fn prepare_frame(&mut self, message_id: &MessageId) -> Result<DecodedImage, FrameFailure> {
        let attachment_id = match self.source.resolve_attachment(message_id) {
            Ok(Some(attachment_id)) => attachment_id,
            Ok(None) => return Err(FrameFailure::NoAttachment),
            Err(err @ FrameError::SourceUnavailable(_)) => {
                return Err(FrameFailure::SourceDown(err));
            }
            Err(err) => return Err(FrameFailure::Unusable(err)),
        };

        let source = &mut self.source;
        let blob = self
            .store
            .get(message_id, || {
                source.fetch_attachment(message_id, &attachment_id)
            })
            .map_err(FrameFailure::Unusable)?;
        if let BlobOrigin::Fetched { persisted } = blob.origin {
            debug!(
                message_id = %message_id,
                bytes = blob.bytes.len(),
                persisted,
                "attachment downloaded"
            );
        }

        let image = self
            .decoder
            .decode(&blob.bytes)
            .map_err(FrameFailure::Unusable)?;
        Ok(self
            .decoder
            .fit(image, self.bounds.width, self.bounds.height))
    }

    fn present(&mut self, cursor: usize, message_id: MessageId, image: DecodedImage) {
        self.nav.cursor = cursor;
        let (width, height) = image.dimensions();
        let frame = Frame {
            message_id: message_id.clone(),
            image,
        };
        if let Err(err) = self.renderer.on_frame(frame) {
            warn!(message_id = %message_id, error = %err, "renderer rejected frame");
        }
        self.empty_shown = false;
        self.dry_cycle_reported = false;
        self.stalled_retries = 0;
        self.state = SlideshowState::Showing(cursor);
        self.arm_timer();
        info!(
            message_id = %message_id,
            cursor,
            len = self.nav.messages.len(),
            width,
            height,
            "showing message"
        );
    }

    fn enter_empty(&mut self) {
        self.cancel_timer();
        self.state = SlideshowState::Empty;
        if self.empty_shown {
            return;
        }
        self.empty_shown = true;
        info!(
            messages = self.nav.messages.len(),
            "no content to show; auto-advance suspended"
        );
        if let Err(err) = self.renderer.on_empty() {
            warn!(error = %err, "renderer failed to show empty state");
        }
    }

    fn arm_timer(&mut self) {
        self.nav.timer = Some(AdvanceTimer::arm(self.options.time_per_image));
    }

    fn cancel_timer(&mut self) {
        if self.nav.timer.take().is_some() {
            debug!("auto-advance timer cancelled");
        }
    }
}
