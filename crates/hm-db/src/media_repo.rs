use crate::util::{from_millis, to_millis, DbError};
use chrono::{DateTime, Utc};
use hm_core::error::MediaError;
use hm_core::media::MediaRepository;
use hm_core::types::media::MEDIA_CHUNK_SIZE;
use hm_core::types::{MediaFile, MediaId, MediaRef, MediaUpload};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

/// Chunked blob store in the same database as the events, laid out like
/// GridFS: one `media_files` row per object and ordered `media_chunks`.
pub struct MediaRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> MediaRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl From<DbError> for MediaError {
    fn from(value: DbError) -> Self {
        MediaError::Storage {
            message: value.to_string(),
        }
    }
}

fn storage(err: rusqlite::Error) -> MediaError {
    MediaError::Storage {
        message: err.to_string(),
    }
}

impl MediaRepository for MediaRepo<'_> {
    fn put(&self, upload: MediaUpload, now: DateTime<Utc>) -> Result<MediaRef, MediaError> {
        let length = u64::try_from(upload.data.len()).map_err(|_| MediaError::InvalidInput {
            message: "media too large".to_string(),
        })?;
        let chunk_size = u32::try_from(MEDIA_CHUNK_SIZE).unwrap_or(u32::MAX);
        let file = MediaFile {
            id: MediaId::generate(),
            filename: upload.filename,
            content_type: upload.content_type,
            length,
            chunk_size,
            checksum: hex::encode(Sha256::digest(&upload.data)),
            uploaded_at: now,
        };

        let sql = "INSERT INTO media_files (id, filename, content_type, length, chunk_size, checksum, uploaded_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
        self.conn
            .execute(
                sql,
                params![
                    file.id.as_str(),
                    &file.filename,
                    &file.content_type,
                    i64::try_from(file.length).unwrap_or(i64::MAX),
                    file.chunk_size,
                    &file.checksum,
                    to_millis(&file.uploaded_at),
                ],
            )
            .map_err(storage)?;

        let mut stmt = self
            .conn
            .prepare("INSERT INTO media_chunks (media_id, n, data) VALUES (?1, ?2, ?3)")
            .map_err(storage)?;
        for (n, chunk) in upload.data.chunks(MEDIA_CHUNK_SIZE).enumerate() {
            stmt.execute(params![file.id.as_str(), n as i64, chunk])
                .map_err(storage)?;
        }

        Ok(file.to_ref())
    }

    fn file(&self, id: &MediaId) -> Result<Option<MediaFile>, MediaError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, filename, content_type, length, chunk_size, checksum, uploaded_at FROM media_files WHERE id = ?1")
            .map_err(storage)?;
        let mut rows = stmt.query([id.as_str()]).map_err(storage)?;
        let Some(row) = rows.next().map_err(storage)? else {
            return Ok(None);
        };
        map_file_row(row).map(Some)
    }

    fn read_chunk(&self, id: &MediaId, n: u32) -> Result<Option<Vec<u8>>, MediaError> {
        self.conn
            .query_row(
                "SELECT data FROM media_chunks WHERE media_id = ?1 AND n = ?2",
                params![id.as_str(), n],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
            .map_err(storage)
    }

    fn delete(&self, id: &MediaId) -> Result<(), MediaError> {
        // Chunks follow through ON DELETE CASCADE.
        let affected = self
            .conn
            .execute("DELETE FROM media_files WHERE id = ?1", [id.as_str()])
            .map_err(storage)?;
        if affected == 0 {
            return Err(MediaError::NotFound);
        }
        Ok(())
    }
}

fn map_file_row(row: &rusqlite::Row<'_>) -> Result<MediaFile, MediaError> {
    let id: String = row.get(0).map_err(storage)?;
    let filename: String = row.get(1).map_err(storage)?;
    let content_type: String = row.get(2).map_err(storage)?;
    let length: i64 = row.get(3).map_err(storage)?;
    let chunk_size: u32 = row.get(4).map_err(storage)?;
    let checksum: String = row.get(5).map_err(storage)?;
    let uploaded_at: i64 = row.get(6).map_err(storage)?;

    let id = MediaId::new(id).map_err(|err| DbError::InvalidId {
        message: err.to_string(),
    })?;
    let length = u64::try_from(length).map_err(|_| MediaError::Storage {
        message: format!("negative length recorded for {id}"),
    })?;

    Ok(MediaFile {
        id,
        filename,
        content_type,
        length,
        chunk_size,
        checksum,
        uploaded_at: from_millis(uploaded_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::with_test_db;

    fn upload(data: Vec<u8>) -> MediaUpload {
        MediaUpload {
            filename: "clip.mp4".to_string(),
            content_type: "video/mp4".to_string(),
            data,
        }
    }

    fn read_all(repo: &MediaRepo<'_>, file: &MediaFile) -> Vec<u8> {
        let mut out = Vec::new();
        for n in 0..file.chunk_count() {
            out.extend(repo.read_chunk(&file.id, n).unwrap().unwrap());
        }
        out
    }

    #[test]
    fn stores_large_objects_across_chunks() {
        let conn = with_test_db().unwrap();
        let repo = MediaRepo::new(&conn);
        let data: Vec<u8> = (0..MEDIA_CHUNK_SIZE * 2 + 17)
            .map(|n| (n % 251) as u8)
            .collect();
        let media_ref = repo.put(upload(data.clone()), Utc::now()).unwrap();

        let file = repo.file(&media_ref.media_id).unwrap().unwrap();
        assert_eq!(file.length, data.len() as u64);
        assert_eq!(file.chunk_count(), 3);
        assert_eq!(file.content_type, "video/mp4");
        assert_eq!(file.checksum, hex::encode(Sha256::digest(&data)));
        assert_eq!(read_all(&repo, &file), data);
        assert!(repo.read_chunk(&file.id, 3).unwrap().is_none());
    }

    #[test]
    fn empty_objects_have_no_chunks() {
        let conn = with_test_db().unwrap();
        let repo = MediaRepo::new(&conn);
        let media_ref = repo.put(upload(Vec::new()), Utc::now()).unwrap();
        let file = repo.file(&media_ref.media_id).unwrap().unwrap();
        assert_eq!(file.length, 0);
        assert_eq!(file.chunk_count(), 0);
    }

    #[test]
    fn delete_drops_metadata_and_chunks() {
        let conn = with_test_db().unwrap();
        let repo = MediaRepo::new(&conn);
        let media_ref = repo.put(upload(vec![1, 2, 3]), Utc::now()).unwrap();
        repo.delete(&media_ref.media_id).unwrap();

        assert!(repo.file(&media_ref.media_id).unwrap().is_none());
        let chunks: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM media_chunks WHERE media_id = ?1",
                [media_ref.media_id.as_str()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(chunks, 0);
        assert!(matches!(
            repo.delete(&media_ref.media_id),
            Err(MediaError::NotFound)
        ));
    }

    #[test]
    fn unknown_media_has_no_file() {
        let conn = with_test_db().unwrap();
        let repo = MediaRepo::new(&conn);
        assert!(repo.file(&MediaId::generate()).unwrap().is_none());
        assert!(repo.read_chunk(&MediaId::generate(), 0).unwrap().is_none());
    }
}
