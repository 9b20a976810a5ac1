//! In-memory `Store` with failure injection for facade tests.

use crate::error::{EventError, HazardError, MediaError};
use crate::events::EventRepository;
use crate::geo::distance_m;
use crate::media::MediaRepository;
use crate::store::Store;
use crate::types::media::MEDIA_CHUNK_SIZE;
use crate::types::{
    expiry_cutoff, Event, EventId, MediaFile, MediaId, MediaRef, MediaUpload, NearbyQuery,
    NewEvent,
};
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

#[derive(Default)]
pub struct MemoryStore {
    events: RefCell<BTreeMap<EventId, Event>>,
    blobs: RefCell<BTreeMap<MediaId, (MediaFile, Vec<u8>)>>,
    fail_inserts: Cell<bool>,
    failing_deletes: RefCell<HashSet<MediaId>>,
    delete_calls: RefCell<Vec<MediaId>>,
}

impl MemoryStore {
    pub fn fail_inserts(&self) {
        self.fail_inserts.set(true);
    }

    pub fn fail_delete_of(&self, id: &MediaId) {
        self.failing_deletes.borrow_mut().insert(id.clone());
    }

    pub fn heal_deletes(&self) {
        self.failing_deletes.borrow_mut().clear();
    }

    pub fn delete_calls(&self) -> Vec<MediaId> {
        self.delete_calls.borrow().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.borrow().len()
    }
}

pub struct MemoryEvents<'a> {
    store: &'a MemoryStore,
}

pub struct MemoryMedia<'a> {
    store: &'a MemoryStore,
}

impl EventRepository for MemoryEvents<'_> {
    fn insert(&self, event: NewEvent, now: DateTime<Utc>) -> Result<Event, EventError> {
        if self.store.fail_inserts.get() {
            return Err(EventError::Storage {
                message: "insert refused".to_string(),
            });
        }
        let event = Event {
            id: EventId::generate(),
            location: event.location,
            category: event.category,
            description: event.description,
            media: event.media,
            upvotes: 0,
            downvotes: 0,
            created_by: event.created_by,
            resolved: false,
            created_at: now,
        };
        self.store
            .events
            .borrow_mut()
            .insert(event.id.clone(), event.clone());
        Ok(event)
    }

    fn get(&self, id: &EventId, now: DateTime<Utc>) -> Result<Option<Event>, EventError> {
        Ok(self
            .store
            .events
            .borrow()
            .get(id)
            .filter(|event| !event.is_expired(now))
            .cloned())
    }

    fn near(&self, query: &NearbyQuery, now: DateTime<Utc>) -> Result<Vec<Event>, EventError> {
        let mut hits: Vec<Event> = self
            .store
            .events
            .borrow()
            .values()
            .filter(|event| !event.is_expired(now))
            .filter(|event| distance_m(query.center, event.location) <= f64::from(query.radius_m))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(hits)
    }

    fn delete(&self, id: &EventId) -> Result<(), EventError> {
        self.store
            .events
            .borrow_mut()
            .remove(id)
            .map(|_| ())
            .ok_or(EventError::NotFound)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, EventError> {
        let cutoff = expiry_cutoff(now);
        let mut events = self.store.events.borrow_mut();
        let before = events.len();
        events.retain(|_, event| event.created_at > cutoff);
        Ok((before - events.len()) as u64)
    }
}

impl MediaRepository for MemoryMedia<'_> {
    fn put(&self, upload: MediaUpload, now: DateTime<Utc>) -> Result<MediaRef, MediaError> {
        let file = MediaFile {
            id: MediaId::generate(),
            filename: upload.filename,
            content_type: upload.content_type,
            length: upload.data.len() as u64,
            chunk_size: MEDIA_CHUNK_SIZE as u32,
            checksum: String::new(),
            uploaded_at: now,
        };
        let media_ref = file.to_ref();
        self.store
            .blobs
            .borrow_mut()
            .insert(file.id.clone(), (file, upload.data));
        Ok(media_ref)
    }

    fn file(&self, id: &MediaId) -> Result<Option<MediaFile>, MediaError> {
        Ok(self.store.blobs.borrow().get(id).map(|(file, _)| file.clone()))
    }

    fn read_chunk(&self, id: &MediaId, n: u32) -> Result<Option<Vec<u8>>, MediaError> {
        let blobs = self.store.blobs.borrow();
        let Some((_, data)) = blobs.get(id) else {
            return Ok(None);
        };
        Ok(data
            .chunks(MEDIA_CHUNK_SIZE)
            .nth(n as usize)
            .map(<[u8]>::to_vec))
    }

    fn delete(&self, id: &MediaId) -> Result<(), MediaError> {
        self.store.delete_calls.borrow_mut().push(id.clone());
        if self.store.failing_deletes.borrow().contains(id) {
            return Err(MediaError::Storage {
                message: "blob backend unavailable".to_string(),
            });
        }
        self.store
            .blobs
            .borrow_mut()
            .remove(id)
            .map(|_| ())
            .ok_or(MediaError::NotFound)
    }
}

impl Store for MemoryStore {
    type Events<'a>
        = MemoryEvents<'a>
    where
        Self: 'a;
    type Media<'a>
        = MemoryMedia<'a>
    where
        Self: 'a;

    fn events(&self) -> Self::Events<'_> {
        MemoryEvents { store: self }
    }

    fn media(&self) -> Self::Media<'_> {
        MemoryMedia { store: self }
    }

    fn with_tx<F, T>(&self, f: F) -> Result<T, HazardError>
    where
        F: FnOnce(&Self) -> Result<T, HazardError>,
    {
        f(self)
    }
}
