use std::path::PathBuf;

use thiserror::Error;

use crate::events::MessageId;

/// Library error type for mail-frame operations.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Listing, metadata lookup, or attachment download against the mail source failed.
    #[error("message source unavailable: {0}")]
    SourceUnavailable(String),

    /// The attachment body for a message could not be fetched.
    #[error("failed to fetch attachment for message {message_id}: {reason}")]
    FetchFailed {
        message_id: MessageId,
        reason: String,
    },

    /// The payload is not a recognized image encoding.
    #[error("attachment is not a decodable image: {0}")]
    DecodeFailed(#[from] image::ImageError),

    /// The fetched payload could not be written to the attachment cache.
    #[error("failed to write cache entry {}: {source}", path.display())]
    CacheWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The identifier cannot be used as a flat file name.
    #[error("identifier {0:?} is not usable as a cache key")]
    InvalidMessageId(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;
