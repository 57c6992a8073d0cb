//! Boundary to the mail provider.
//!
//! The slideshow never looks at mail metadata beyond the three answers this
//! trait gives. Calls are blocking; the slideshow loop runs on its own thread.

pub mod gmail;
pub mod spool;

use crate::error::Result;
use crate::events::{AttachmentId, MessageId, MessageList};

pub trait MessageSource {
    /// Lists message ids matching `query`, in the order the provider returns them.
    fn list_messages(&mut self, query: &str) -> Result<MessageList>;

    /// Resolves the binary body part of a message, if it has one.
    fn resolve_attachment(&mut self, message_id: &MessageId) -> Result<Option<AttachmentId>>;

    /// Downloads the raw attachment payload.
    fn fetch_attachment(
        &mut self,
        message_id: &MessageId,
        attachment_id: &AttachmentId,
    ) -> Result<Vec<u8>>;
}

/// Parsed form of a listing query. Only `label:<name>` terms are understood;
/// several terms must all match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelQuery {
    labels: Vec<String>,
}

impl LabelQuery {
    pub fn parse(query: &str) -> Self {
        let mut labels = Vec::new();
        for term in query.split_whitespace() {
            match term.split_once(':') {
                Some((key, value)) if key.eq_ignore_ascii_case("label") && !value.is_empty() => {
                    labels.push(value.to_ascii_lowercase());
                }
                _ => tracing::debug!(term, "ignoring unsupported query term"),
            }
        }
        Self { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn matches<'a, I>(&self, message_labels: I) -> bool
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        self.labels.iter().all(|wanted| {
            message_labels
                .clone()
                .into_iter()
                .any(|label| label.eq_ignore_ascii_case(wanted))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_label_terms_and_ignores_others() {
        let query = LabelQuery::parse("label:JordScreen has:attachment label:family");
        assert_eq!(query.labels(), ["jordscreen", "family"]);
    }

    #[test]
    fn all_labels_must_match() {
        let query = LabelQuery::parse("label:jordscreen label:family");
        assert!(query.matches(["INBOX", "jordscreen", "Family"]));
        assert!(!query.matches(["jordscreen"]));
        assert!(LabelQuery::parse("").matches(std::iter::empty::<&str>()));
    }
}
