use crate::util::{
    decode_enum, decode_json, encode_enum, encode_json, from_millis, to_millis, DbError,
};
use chrono::{DateTime, Utc};
use hm_core::error::EventError;
use hm_core::events::EventRepository;
use hm_core::geo::{distance_m, BoundingBox, GeoPoint};
use hm_core::types::{
    expiry_cutoff, Event, EventId, MediaRef, NearbyQuery, NewEvent, UserId,
};
use hm_core::validation::validate_event_record;
use rusqlite::{params, Connection};

const EVENT_COLUMNS: &str = "id, lat, lng, category, description, media_json, upvotes, downvotes, created_by, resolved, created_at";

pub struct EventRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> EventRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl From<DbError> for EventError {
    fn from(value: DbError) -> Self {
        EventError::Storage {
            message: value.to_string(),
        }
    }
}

fn storage(err: rusqlite::Error) -> EventError {
    EventError::Storage {
        message: err.to_string(),
    }
}

impl EventRepository for EventRepo<'_> {
    fn insert(&self, event: NewEvent, now: DateTime<Utc>) -> Result<Event, EventError> {
        validate_event_record(&event)?;
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

        let sql = "INSERT INTO events (id, lat, lng, category, description, media_json, upvotes, downvotes, created_by, resolved, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";
        self.conn
            .execute(
                sql,
                params![
                    event.id.as_str(),
                    event.location.lat(),
                    event.location.lng(),
                    encode_enum(&event.category)?,
                    &event.description,
                    encode_json(&event.media)?,
                    event.upvotes,
                    event.downvotes,
                    event.created_by.as_str(),
                    event.resolved,
                    to_millis(&event.created_at),
                ],
            )
            .map_err(storage)?;
        Ok(event)
    }

    fn get(&self, id: &EventId, now: DateTime<Utc>) -> Result<Option<Event>, EventError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1 AND created_at > ?2");
        let mut stmt = self.conn.prepare(&sql).map_err(storage)?;
        let mut rows = stmt
            .query(params![id.as_str(), to_millis(&expiry_cutoff(now))])
            .map_err(storage)?;
        let Some(row) = rows.next().map_err(storage)? else {
            return Ok(None);
        };
        map_event_row(row).map(Some)
    }

    fn near(&self, query: &NearbyQuery, now: DateTime<Utc>) -> Result<Vec<Event>, EventError> {
        let bbox = BoundingBox::around(query.center, query.radius_m);
        let (west, east) = bbox.lng_ranges[0];
        let (wrap_west, wrap_east) = bbox.lng_ranges.get(1).copied().unwrap_or((west, east));

        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE created_at > ?1 \
               AND lat BETWEEN ?2 AND ?3 \
               AND ((lng BETWEEN ?4 AND ?5) OR (lng BETWEEN ?6 AND ?7)) \
             ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(storage)?;
        let mut rows = stmt
            .query(params![
                to_millis(&expiry_cutoff(now)),
                bbox.min_lat,
                bbox.max_lat,
                west,
                east,
                wrap_west,
                wrap_east,
            ])
            .map_err(storage)?;

        let radius = f64::from(query.radius_m);
        let mut events = Vec::new();
        while let Some(row) = rows.next().map_err(storage)? {
            let event = map_event_row(row)?;
            if distance_m(query.center, event.location) <= radius {
                events.push(event);
            }
        }
        Ok(events)
    }

    fn delete(&self, id: &EventId) -> Result<(), EventError> {
        let affected = self
            .conn
            .execute("DELETE FROM events WHERE id = ?1", [id.as_str()])
            .map_err(storage)?;
        if affected == 0 {
            return Err(EventError::NotFound);
        }
        Ok(())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, EventError> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM events WHERE created_at <= ?1",
                [to_millis(&expiry_cutoff(now))],
            )
            .map_err(storage)?;
        Ok(affected as u64)
    }
}

fn map_event_row(row: &rusqlite::Row<'_>) -> Result<Event, EventError> {
    let id: String = row.get(0).map_err(storage)?;
    let lat: f64 = row.get(1).map_err(storage)?;
    let lng: f64 = row.get(2).map_err(storage)?;
    let category: String = row.get(3).map_err(storage)?;
    let description: String = row.get(4).map_err(storage)?;
    let media_json: String = row.get(5).map_err(storage)?;
    let upvotes: u32 = row.get(6).map_err(storage)?;
    let downvotes: u32 = row.get(7).map_err(storage)?;
    let created_by: String = row.get(8).map_err(storage)?;
    let resolved: bool = row.get(9).map_err(storage)?;
    let created_at: i64 = row.get(10).map_err(storage)?;

    let id = EventId::new(id).map_err(|err| DbError::InvalidId {
        message: err.to_string(),
    })?;
    let created_by = UserId::new(created_by).map_err(|err| DbError::InvalidId {
        message: err.to_string(),
    })?;
    let location = GeoPoint::new(lat, lng).map_err(|err| EventError::Storage {
        message: format!("corrupt location for {id}: {err}"),
    })?;
    let media: Vec<MediaRef> = decode_json(&media_json)?;

    Ok(Event {
        id,
        location,
        category: decode_enum(&category)?,
        description,
        media,
        upvotes,
        downvotes,
        created_by,
        resolved,
        created_at: from_millis(created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::with_test_db;
    use chrono::{TimeDelta, TimeZone};
    use hm_core::types::{Category, MediaId, EVENT_TTL_SECS};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 8, 30, 0).unwrap()
    }

    fn new_event(lat: f64, lng: f64, description: &str) -> NewEvent {
        NewEvent {
            location: GeoPoint::new(lat, lng).unwrap(),
            category: Category::Hazard,
            description: description.to_string(),
            media: Vec::new(),
            created_by: UserId::anonymous(),
        }
    }

    fn query(lat: f64, lng: f64, radius_m: u32) -> NearbyQuery {
        NearbyQuery::new(GeoPoint::new(lat, lng).unwrap(), Some(radius_m))
    }

    #[test]
    fn insert_then_get_round_trips_every_field() {
        let conn = with_test_db().unwrap();
        let repo = EventRepo::new(&conn);
        let mut input = new_event(40.0, -73.0, "pothole");
        input.category = Category::RoadClosure;
        input.media = vec![MediaRef {
            media_id: MediaId::generate(),
            filename: "hole.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
        }];
        let created = repo.insert(input, t0()).unwrap();
        let fetched = repo.get(&created.id, t0()).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.created_at, t0());
    }

    #[test]
    fn store_refuses_blank_description() {
        let conn = with_test_db().unwrap();
        let repo = EventRepo::new(&conn);
        let err = repo.insert(new_event(1.0, 1.0, "  "), t0()).unwrap_err();
        assert!(matches!(err, EventError::InvalidInput { .. }));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn get_hides_expired_rows_before_they_are_swept() {
        let conn = with_test_db().unwrap();
        let repo = EventRepo::new(&conn);
        let created = repo.insert(new_event(1.0, 1.0, "x"), t0()).unwrap();
        let ttl = TimeDelta::seconds(EVENT_TTL_SECS);
        assert!(repo
            .get(&created.id, t0() + ttl - TimeDelta::milliseconds(1))
            .unwrap()
            .is_some());
        assert!(repo.get(&created.id, t0() + ttl).unwrap().is_none());
    }

    #[test]
    fn near_filters_by_true_distance() {
        let conn = with_test_db().unwrap();
        let repo = EventRepo::new(&conn);
        let inside = repo.insert(new_event(40.0, -73.0, "pothole"), t0()).unwrap();
        repo.insert(new_event(41.0, -73.0, "far"), t0()).unwrap();
        // Inside the bounding box corner but outside the circle.
        repo.insert(new_event(40.0025, -72.998, "corner"), t0())
            .unwrap();

        let hits = repo.near(&query(40.001, -73.0, 200), t0()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, inside.id);
        for event in &hits {
            assert!(distance_m(GeoPoint::new(40.001, -73.0).unwrap(), event.location) <= 200.0);
        }

        assert_eq!(repo.near(&query(41.0, -73.0, 200), t0()).unwrap().len(), 1);
        assert!(repo.near(&query(42.0, -73.0, 200), t0()).unwrap().is_empty());
    }

    #[test]
    fn near_orders_newest_first_and_skips_expired() {
        let conn = with_test_db().unwrap();
        let repo = EventRepo::new(&conn);
        let old = repo.insert(new_event(10.0, 10.0, "old"), t0()).unwrap();
        let mid = repo
            .insert(new_event(10.0, 10.001, "mid"), t0() + TimeDelta::hours(1))
            .unwrap();
        let new = repo
            .insert(new_event(10.001, 10.0, "new"), t0() + TimeDelta::hours(2))
            .unwrap();

        let ids: Vec<_> = repo
            .near(&query(10.0, 10.0, 1_000), t0() + TimeDelta::hours(3))
            .unwrap()
            .into_iter()
            .map(|event| event.id)
            .collect();
        assert_eq!(ids, vec![new.id.clone(), mid.id.clone(), old.id]);

        let later = t0() + TimeDelta::hours(24) + TimeDelta::minutes(30);
        let ids: Vec<_> = repo
            .near(&query(10.0, 10.0, 1_000), later)
            .unwrap()
            .into_iter()
            .map(|event| event.id)
            .collect();
        assert_eq!(ids, vec![new.id, mid.id]);
    }

    #[test]
    fn near_ties_break_by_id_descending() {
        let conn = with_test_db().unwrap();
        let repo = EventRepo::new(&conn);
        let a = repo.insert(new_event(0.0, 0.0, "a"), t0()).unwrap();
        let b = repo.insert(new_event(0.0, 0.0, "b"), t0()).unwrap();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        expected.reverse();
        let ids: Vec<_> = repo
            .near(&query(0.0, 0.0, 10), t0())
            .unwrap()
            .into_iter()
            .map(|event| event.id)
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn near_crosses_the_antimeridian() {
        let conn = with_test_db().unwrap();
        let repo = EventRepo::new(&conn);
        let east = repo.insert(new_event(0.0, 179.9995, "east"), t0()).unwrap();
        let west = repo.insert(new_event(0.0, -179.9995, "west"), t0()).unwrap();
        let hits = repo.near(&query(0.0, 180.0, 500), t0()).unwrap();
        let ids: Vec<_> = hits.into_iter().map(|event| event.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&east.id));
        assert!(ids.contains(&west.id));
    }

    #[test]
    fn zero_radius_matches_exact_location_only() {
        let conn = with_test_db().unwrap();
        let repo = EventRepo::new(&conn);
        repo.insert(new_event(3.0, 3.0, "here"), t0()).unwrap();
        repo.insert(new_event(3.0001, 3.0, "close"), t0()).unwrap();
        let hits = repo.near(&query(3.0, 3.0, 0), t0()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].description, "here");
    }

    #[test]
    fn delete_reports_missing_rows() {
        let conn = with_test_db().unwrap();
        let repo = EventRepo::new(&conn);
        let created = repo.insert(new_event(1.0, 1.0, "x"), t0()).unwrap();
        repo.delete(&created.id).unwrap();
        assert!(matches!(repo.delete(&created.id), Err(EventError::NotFound)));
    }

    #[test]
    fn purge_removes_only_expired_rows() {
        let conn = with_test_db().unwrap();
        let repo = EventRepo::new(&conn);
        repo.insert(new_event(1.0, 1.0, "old"), t0()).unwrap();
        let fresh = repo
            .insert(new_event(1.0, 1.0, "fresh"), t0() + TimeDelta::hours(12))
            .unwrap();
        let now = t0() + TimeDelta::hours(24);
        assert_eq!(repo.purge_expired(now).unwrap(), 1);
        assert_eq!(repo.purge_expired(now).unwrap(), 0);
        assert!(repo.get(&fresh.id, now).unwrap().is_some());
    }
}
