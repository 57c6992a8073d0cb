use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a mail message; doubles as the attachment cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the id can be used verbatim as a single file name.
    pub fn is_path_safe(&self) -> bool {
        is_flat_file_name(&self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for MessageId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Identifier of a binary body part, scoped to one message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(String);

impl AttachmentId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_path_safe(&self) -> bool {
        is_flat_file_name(&self.0)
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttachmentId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Navigation order as returned by the source listing.
pub type MessageList = Vec<MessageId>;

/// Commands delivered to the slideshow loop from the control socket,
/// signal handlers, or the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum ControlCommand {
    Next,
    Previous,
    Close,
}

// Hidden names are reserved for in-flight cache writes.
fn is_flat_file_name(raw: &str) -> bool {
    !raw.is_empty()
        && !raw.starts_with('.')
        && !raw.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_commands_parse_from_kebab_case_json() {
        let next: ControlCommand = serde_json::from_str(r#"{"command":"next"}"#).unwrap();
        let prev: ControlCommand = serde_json::from_str(r#"{"command":"previous"}"#).unwrap();
        let close: ControlCommand = serde_json::from_str(r#"{"command":"close"}"#).unwrap();
        assert_eq!(next, ControlCommand::Next);
        assert_eq!(prev, ControlCommand::Previous);
        assert_eq!(close, ControlCommand::Close);
        assert!(serde_json::from_str::<ControlCommand>(r#"{"command":"toggle-state"}"#).is_err());
    }

    #[test]
    fn path_safety_rejects_traversal_and_hidden_names() {
        assert!(MessageId::from("18c2f0a9d1e4b7c3").is_path_safe());
        assert!(!MessageId::from("").is_path_safe());
        assert!(!MessageId::from("..").is_path_safe());
        assert!(!MessageId::from(".part").is_path_safe());
        assert!(!MessageId::from("a/b").is_path_safe());
        assert!(!MessageId::from("a\\b").is_path_safe());
        assert!(AttachmentId::from("ANGjdJ8_x-9Q").is_path_safe());
    }
}
