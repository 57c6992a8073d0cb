//! Gmail REST resource shapes (`users.messages.get`, `users.messages.attachments.get`).
//!
//! Only the fields needed to find an attachment and order a listing are modelled.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::Deserialize;

use crate::events::AttachmentId;

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
    /// Milliseconds since the epoch, serialized as a decimal string.
    #[serde(default)]
    pub internal_date: Option<String>,
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub body: Option<MessagePartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePartBody {
    #[serde(default)]
    pub attachment_id: Option<String>,
    /// base64url payload, present on attachment downloads and small inline bodies.
    #[serde(default)]
    pub data: Option<String>,
}

impl Message {
    /// First body part, depth-first, that carries an attachment id.
    pub fn attachment_id(&self) -> Option<AttachmentId> {
        self.payload
            .as_ref()
            .and_then(MessagePart::first_attachment)
            .map(AttachmentId::new)
    }

    pub fn internal_date_ms(&self) -> i64 {
        self.internal_date
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + Clone {
        self.label_ids.iter().map(String::as_str)
    }
}

impl MessagePart {
    fn first_attachment(&self) -> Option<&str> {
        if let Some(id) = self
            .body
            .as_ref()
            .and_then(|body| body.attachment_id.as_deref())
            .filter(|id| !id.is_empty())
        {
            return Some(id);
        }
        self.parts.iter().find_map(MessagePart::first_attachment)
    }
}

impl MessagePartBody {
    pub fn decoded_data(&self) -> Result<Vec<u8>, base64::DecodeError> {
        decode_base64url(self.data.as_deref().unwrap_or_default())
    }
}

/// Decodes Gmail's base64url payloads; padding and embedded whitespace are tolerated.
pub fn decode_base64url(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    URL_SAFE_LENIENT.decode(compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_attachment_in_second_part_of_simple_message() {
        let raw = r#"{
            "id": "18c2f0a9d1e4b7c3",
            "labelIds": ["Label_7", "jordscreen"],
            "internalDate": "1700000000000",
            "payload": {
                "mimeType": "multipart/mixed",
                "parts": [
                    {"partId": "0", "mimeType": "text/plain", "body": {"size": 3, "data": "aGk"}},
                    {"partId": "1", "mimeType": "image/jpeg", "filename": "a.jpg",
                     "body": {"attachmentId": "ANGjdJ8_x-9Q", "size": 2048}}
                ]
            }
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.attachment_id(), Some(AttachmentId::from("ANGjdJ8_x-9Q")));
        assert_eq!(msg.internal_date_ms(), 1_700_000_000_000);
    }

    #[test]
    fn nested_parts_are_searched_depth_first() {
        let raw = r#"{
            "id": "m",
            "payload": {"parts": [
                {"parts": [{"body": {"attachmentId": "inner"}}]},
                {"body": {"attachmentId": "outer"}}
            ]}
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.attachment_id(), Some(AttachmentId::from("inner")));
    }

    #[test]
    fn text_only_message_has_no_attachment() {
        let raw = r#"{"id": "m", "payload": {"body": {"size": 5, "data": "aGVsbG8"}}}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.attachment_id(), None);

        let bare: Message = serde_json::from_str(r#"{"id": "m"}"#).unwrap();
        assert_eq!(bare.attachment_id(), None);
        assert_eq!(bare.internal_date_ms(), 0);
    }

    #[test]
    fn base64url_accepts_missing_padding_and_url_alphabet() {
        assert_eq!(decode_base64url("aGk").unwrap(), b"hi");
        assert_eq!(decode_base64url("aGk=").unwrap(), b"hi");
        assert_eq!(decode_base64url("-_8").unwrap(), vec![0xFB, 0xFF]);
        assert_eq!(decode_base64url("aGVs\nbG8").unwrap(), b"hello");
        assert!(decode_base64url("***").is_err());
    }
}
