#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};
use mail_frame::controller::{SlideshowController, SlideshowOptions};
use mail_frame::error::{FrameError, Result};
use mail_frame::events::{AttachmentId, MessageId, MessageList};
use mail_frame::render::{Bounds, Frame, Renderer};
use mail_frame::source::MessageSource;
use mail_frame::store::AttachmentStore;

pub enum Payload {
    Bytes(Vec<u8>),
    NoAttachment,
    FetchFails,
}

#[derive(Default)]
pub struct FakeState {
    pub listing: Vec<MessageId>,
    pub listing_fails: bool,
    pub payloads: HashMap<MessageId, Payload>,
    pub unavailable: HashSet<MessageId>,
    pub list_calls: usize,
    pub fetches: Vec<MessageId>,
}

impl FakeState {
    pub fn set_listing(&mut self, ids: &[&str]) {
        self.listing = ids.iter().map(|id| MessageId::from(*id)).collect();
    }

    pub fn add(&mut self, id: &str, payload: Payload) {
        self.payloads.insert(MessageId::from(id), payload);
    }
}

/// In-memory source; clones share state so tests can change it while the
/// controller owns a handle.
#[derive(Clone, Default)]
pub struct FakeSource {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSource {
    pub fn with_messages(entries: Vec<(&str, Payload)>) -> Self {
        let source = Self::default();
        {
            let mut state = source.state();
            for (id, payload) in entries {
                state.listing.push(MessageId::from(id));
                state.add(id, payload);
            }
        }
        source
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn listing(&self) -> MessageList {
        self.state().listing.clone()
    }
}

impl MessageSource for FakeSource {
    fn list_messages(&mut self, _query: &str) -> Result<MessageList> {
        let mut state = self.state();
        state.list_calls += 1;
        if state.listing_fails {
            return Err(FrameError::SourceUnavailable("listing offline".into()));
        }
        Ok(state.listing.clone())
    }

    fn resolve_attachment(&mut self, message_id: &MessageId) -> Result<Option<AttachmentId>> {
        let state = self.state();
        if state.unavailable.contains(message_id) {
            return Err(FrameError::SourceUnavailable("connection reset".into()));
        }
        Ok(match state.payloads.get(message_id) {
            Some(Payload::Bytes(_)) | Some(Payload::FetchFails) => {
                Some(AttachmentId::new(format!("att-{message_id}")))
            }
            Some(Payload::NoAttachment) | None => None,
        })
    }

    fn fetch_attachment(
        &mut self,
        message_id: &MessageId,
        _attachment_id: &AttachmentId,
    ) -> Result<Vec<u8>> {
        let mut state = self.state();
        state.fetches.push(message_id.clone());
        match state.payloads.get(message_id) {
            Some(Payload::Bytes(bytes)) => Ok(bytes.clone()),
            _ => Err(FrameError::SourceUnavailable("attachment download failed".into())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Frame {
        message_id: String,
        width: u32,
        height: u32,
    },
    Empty,
}

impl Rendered {
    pub fn frame_id(&self) -> Option<&str> {
        match self {
            Rendered::Frame { message_id, .. } => Some(message_id),
            Rendered::Empty => None,
        }
    }
}

pub struct RecordingRenderer {
    pub bounds: Bounds,
    pub events: Vec<Rendered>,
}

impl RecordingRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            bounds: Bounds::new(width, height),
            events: Vec::new(),
        }
    }

    pub fn shown(&self) -> Vec<&str> {
        self.events.iter().filter_map(Rendered::frame_id).collect()
    }

    pub fn empties(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Rendered::Empty))
            .count()
    }
}

impl Renderer for RecordingRenderer {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn on_frame(&mut self, frame: Frame) -> anyhow::Result<()> {
        let (width, height) = frame.image.dimensions();
        self.events.push(Rendered::Frame {
            message_id: frame.message_id.to_string(),
            width,
            height,
        });
        Ok(())
    }

    fn on_empty(&mut self) -> anyhow::Result<()> {
        self.events.push(Rendered::Empty);
        Ok(())
    }
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn image(id: &str) -> (&str, Payload) {
    (id, Payload::Bytes(png(8, 6)))
}

pub fn options(time_per_image: Duration, auto_refresh_on_wraparound: bool) -> SlideshowOptions {
    SlideshowOptions {
        query: "label:jordscreen".into(),
        time_per_image,
        auto_refresh_on_wraparound,
    }
}

pub type TestController = SlideshowController<FakeSource, RecordingRenderer>;

pub fn controller(source: &FakeSource, cache: &Path, options: SlideshowOptions) -> TestController {
    let messages = source.listing();
    SlideshowController::new(
        source.clone(),
        AttachmentStore::new(cache),
        RecordingRenderer::new(64, 64),
        options,
        messages,
    )
}
