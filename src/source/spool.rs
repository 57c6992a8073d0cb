//! A [`MessageSource`] backed by a local mirror of Gmail API responses.
//!
//! Layout under the spool root, written by an external sync job:
//!
//! ```text
//! messages/<messageId>.json         users.messages.get resource
//! attachments/<attachmentId>.json   users.messages.attachments.get resource
//! ```
//!
//! Label ids in the mirrored messages are matched against `label:` query
//! terms case-insensitively. Listings are ordered newest first, like the API.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use super::gmail::{Message, MessagePartBody};
use super::{LabelQuery, MessageSource};
use crate::error::{FrameError, Result};
use crate::events::{AttachmentId, MessageId, MessageList};

const MESSAGES_DIR: &str = "messages";
const ATTACHMENTS_DIR: &str = "attachments";

#[derive(Debug, Clone)]
pub struct SpoolSource {
    root: PathBuf,
}

impl SpoolSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn message_path(&self, message_id: &MessageId) -> Result<PathBuf> {
        if !message_id.is_path_safe() {
            return Err(FrameError::InvalidMessageId(message_id.as_str().to_owned()));
        }
        Ok(self
            .root
            .join(MESSAGES_DIR)
            .join(format!("{message_id}.json")))
    }

    fn read_message(&self, path: &Path) -> Result<Message> {
        let raw = fs::read(path).map_err(|err| unavailable(path, &err))?;
        serde_json::from_slice(&raw).map_err(|err| unavailable(path, &err))
    }
}

impl MessageSource for SpoolSource {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn list_messages(&mut self, query: &str) -> Result<MessageList> {
        let dir = self.root.join(MESSAGES_DIR);
        if !dir.is_dir() {
            return Err(FrameError::SourceUnavailable(format!(
                "spool directory {} is missing",
                dir.display()
            )));
        }

        let query = LabelQuery::parse(query);
        let mut listed: Vec<(i64, String)> = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| is_json(entry.path()))
        {
            let message = match self.read_message(entry.path()) {
                Ok(message) => message,
                Err(err) => {
                    warn!(path = %entry.path().display(), error = %err, "skipping unreadable spool message");
                    continue;
                }
            };
            if query.matches(message.labels()) {
                listed.push((message.internal_date_ms(), message.id));
            }
        }

        listed.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        debug!(count = listed.len(), "spool listing complete");
        Ok(listed.into_iter().map(|(_, id)| MessageId::new(id)).collect())
    }

    fn resolve_attachment(&mut self, message_id: &MessageId) -> Result<Option<AttachmentId>> {
        let path = self.message_path(message_id)?;
        if !path.exists() {
            warn!(message_id = %message_id, "message vanished from spool");
            return Ok(None);
        }
        // Unreadable is an outage; unparseable is permanent, so report no attachment.
        let raw = fs::read(&path).map_err(|err| unavailable(&path, &err))?;
        let message: Message = match serde_json::from_slice(&raw) {
            Ok(message) => message,
            Err(err) => {
                warn!(message_id = %message_id, error = %err, "unparseable spool message; skipping");
                return Ok(None);
            }
        };
        let attachment = message.attachment_id();
        if attachment.is_none() {
            debug!(message_id = %message_id, "no attachment in message");
        }
        Ok(attachment)
    }

    fn fetch_attachment(
        &mut self,
        message_id: &MessageId,
        attachment_id: &AttachmentId,
    ) -> Result<Vec<u8>> {
        if !attachment_id.is_path_safe() {
            return Err(FrameError::SourceUnavailable(format!(
                "attachment id {attachment_id:?} of message {message_id} is not a spool file name"
            )));
        }
        let path = self
            .root
            .join(ATTACHMENTS_DIR)
            .join(format!("{attachment_id}.json"));
        let raw = fs::read(&path).map_err(|err| unavailable(&path, &err))?;
        let body: MessagePartBody =
            serde_json::from_slice(&raw).map_err(|err| unavailable(&path, &err))?;
        let bytes = body.decoded_data().map_err(|err| unavailable(&path, &err))?;
        debug!(message_id = %message_id, bytes = bytes.len(), "attachment read from spool");
        Ok(bytes)
    }
}

fn unavailable(path: &Path, err: &dyn std::fmt::Display) -> FrameError {
    FrameError::SourceUnavailable(format!("{}: {err}", path.display()))
}

#[inline]
fn is_json(p: &Path) -> bool {
    p.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
