use crate::clock::{Clock, SystemClock};
use crate::error::{EventError, HazardError, MediaError};
use crate::events::EventRepository;
use crate::media::MediaRepository;
use crate::store::Store;
use crate::types::{
    CreateEventInput, Event, EventId, MediaDownload, MediaId, MediaRef, MediaUpload, NearbyQuery,
    UserId,
};
use crate::validation::{validate_media_count, validate_new_event};
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub actor: UserId,
    pub correlation_id: Option<String>,
}

impl RequestContext {
    pub fn new(actor: UserId, correlation_id: Option<String>) -> Self {
        Self {
            actor,
            correlation_id,
        }
    }

    pub fn anonymous(correlation_id: Option<String>) -> Self {
        Self::new(UserId::anonymous(), correlation_id)
    }

    fn correlation(&self) -> &str {
        self.correlation_id.as_deref().unwrap_or("-")
    }
}

pub struct Hazardmap<S: Store> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: Store> Hazardmap<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn events(&self) -> EventsApi<'_, S> {
        EventsApi { core: self }
    }

    pub fn media(&self) -> MediaApi<'_, S> {
        MediaApi { core: self }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current time at the precision timestamps are persisted with.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(3)
    }
}

pub struct EventsApi<'a, S: Store> {
    core: &'a Hazardmap<S>,
}

impl<S: Store> EventsApi<'_, S> {
    /// Validates the submission, stores its attachments, then persists the
    /// event. Attachments stored for a submission that fails to persist are
    /// released again before the error is returned.
    pub fn create(
        &self,
        ctx: &RequestContext,
        input: &CreateEventInput,
        uploads: Vec<MediaUpload>,
    ) -> Result<Event, HazardError> {
        let mut new_event = validate_new_event(input, ctx.actor.clone())?;
        validate_media_count(uploads.len())?;

        let now = self.core.now();
        let media = self.core.media();
        let mut stored: Vec<MediaRef> = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match media.upload(upload, now) {
                Ok(media_ref) => stored.push(media_ref),
                Err(err) => {
                    media.discard(ctx, &stored);
                    return Err(err);
                }
            }
        }

        new_event.media.clone_from(&stored);
        match self.core.store.events().insert(new_event, now) {
            Ok(event) => {
                info!(
                    correlation_id = ctx.correlation(),
                    event_id = %event.id,
                    category = %event.category,
                    media = event.media.len(),
                    "event created"
                );
                Ok(event)
            }
            Err(err) => {
                media.discard(ctx, &stored);
                Err(err.into())
            }
        }
    }

    pub fn get(&self, id: &EventId) -> Result<Event, HazardError> {
        let now = self.core.now();
        self.core
            .store
            .events()
            .get(id, now)?
            .ok_or(HazardError::Event(EventError::NotFound))
    }

    pub fn nearby(&self, query: &NearbyQuery) -> Result<Vec<Event>, HazardError> {
        let now = self.core.now();
        self.core
            .store
            .events()
            .near(query, now)
            .map_err(HazardError::from)
    }

    /// Releases every attachment, then removes the record. If any release
    /// fails the record is kept so the deletion can be retried.
    pub fn delete(&self, ctx: &RequestContext, id: &EventId) -> Result<(), HazardError> {
        let event = self.get(id)?;
        self.core.media().release_all(ctx, &event)?;
        self.core.store.events().delete(id)?;
        info!(
            correlation_id = ctx.correlation(),
            event_id = %id,
            media = event.media.len(),
            "event deleted"
        );
        Ok(())
    }

    /// Sweeps expired records. Their attachments stay in the blob store.
    pub fn purge_expired(&self) -> Result<u64, HazardError> {
        let now = self.core.now();
        let purged = self.core.store.events().purge_expired(now)?;
        if purged > 0 {
            info!(purged, "expired events purged");
        }
        Ok(purged)
    }
}

pub struct MediaApi<'a, S: Store> {
    core: &'a Hazardmap<S>,
}

impl<S: Store> MediaApi<'_, S> {
    pub fn upload(&self, upload: MediaUpload, now: DateTime<Utc>) -> Result<MediaRef, HazardError> {
        if upload.filename.trim().is_empty() {
            return Err(MediaError::InvalidInput {
                message: "filename must not be empty".to_string(),
            }
            .into());
        }
        self.core
            .store
            .with_tx(|store| store.media().put(upload, now).map_err(HazardError::from))
    }

    /// Looks up a blob for streaming. Chunks are then pulled with `read_chunk`.
    pub fn open(&self, id: &MediaId) -> Result<MediaDownload, HazardError> {
        let file = self
            .core
            .store
            .media()
            .file(id)?
            .ok_or(HazardError::Media(MediaError::NotFound))?;
        let chunks = file.chunk_count();
        Ok(MediaDownload { file, chunks })
    }

    pub fn read_chunk(&self, id: &MediaId, n: u32) -> Result<Option<Vec<u8>>, HazardError> {
        self.core
            .store
            .media()
            .read_chunk(id, n)
            .map_err(HazardError::from)
    }

    /// Deletes every blob the event references. All deletes are attempted;
    /// blobs that are already gone count as released.
    pub fn release_all(&self, ctx: &RequestContext, event: &Event) -> Result<(), HazardError> {
        let media = self.core.store.media();
        let mut failed = Vec::new();
        for media_ref in &event.media {
            match media.delete(&media_ref.media_id) {
                Ok(()) => {}
                Err(MediaError::NotFound) => {
                    debug!(
                        correlation_id = ctx.correlation(),
                        media_id = %media_ref.media_id,
                        "media already released"
                    );
                }
                Err(err) => {
                    warn!(
                        correlation_id = ctx.correlation(),
                        event_id = %event.id,
                        media_id = %media_ref.media_id,
                        error = %err,
                        "media release failed"
                    );
                    failed.push(media_ref.media_id.clone());
                }
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(MediaError::ReleaseFailed {
                attempted: event.media.len(),
                failed,
            }
            .into())
        }
    }

    fn discard(&self, ctx: &RequestContext, stored: &[MediaRef]) {
        let media = self.core.store.media();
        for media_ref in stored {
            if let Err(err) = media.delete(&media_ref.media_id) {
                warn!(
                    correlation_id = ctx.correlation(),
                    media_id = %media_ref.media_id,
                    error = %err,
                    "orphaned upload could not be discarded"
                );
            }
        }
    }
}
