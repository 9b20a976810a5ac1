use crate::error::MediaError;
use crate::types::{MediaFile, MediaId, MediaRef, MediaUpload};
use chrono::{DateTime, Utc};

/// Blob storage addressed by `MediaId`. Events only hold references into it.
pub trait MediaRepository {
    fn put(&self, upload: MediaUpload, now: DateTime<Utc>) -> Result<MediaRef, MediaError>;
    fn file(&self, id: &MediaId) -> Result<Option<MediaFile>, MediaError>;
    /// Chunk `n` of the blob, or `None` once past the end or if it vanished.
    fn read_chunk(&self, id: &MediaId, n: u32) -> Result<Option<Vec<u8>>, MediaError>;
    /// Fails with `MediaError::NotFound` when nothing was stored under `id`.
    fn delete(&self, id: &MediaId) -> Result<(), MediaError>;
}
