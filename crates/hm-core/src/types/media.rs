use crate::types::ids::MediaId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Largest chunk the blob store writes, matching GridFS's default.
pub const MEDIA_CHUNK_SIZE: usize = 255 * 1024;

/// Attachments accepted on a single event.
pub const MAX_MEDIA_PER_EVENT: usize = 5;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Non-owning pointer from an event to a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub media_id: MediaId,
    pub filename: String,
    pub content_type: String,
}

/// Blob metadata as kept by the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub id: MediaId,
    pub filename: String,
    pub content_type: String,
    pub length: u64,
    pub chunk_size: u32,
    /// Hex SHA-256 of the full content.
    pub checksum: String,
    pub uploaded_at: DateTime<Utc>,
}

impl MediaFile {
    pub fn chunk_count(&self) -> u32 {
        if self.length == 0 || self.chunk_size == 0 {
            return 0;
        }
        let count = self.length.div_ceil(u64::from(self.chunk_size));
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub fn to_ref(&self) -> MediaRef {
        MediaRef {
            media_id: self.id.clone(),
            filename: self.filename.clone(),
            content_type: self.content_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// An opened blob: metadata plus the number of chunks to read in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDownload {
    pub file: MediaFile,
    pub chunks: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(length: u64, chunk_size: u32) -> MediaFile {
        MediaFile {
            id: MediaId::generate(),
            filename: "a.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            length,
            chunk_size,
            checksum: String::new(),
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn chunk_count_rounds_up() {
        assert_eq!(file(0, 10).chunk_count(), 0);
        assert_eq!(file(1, 10).chunk_count(), 1);
        assert_eq!(file(10, 10).chunk_count(), 1);
        assert_eq!(file(11, 10).chunk_count(), 2);
    }
}
