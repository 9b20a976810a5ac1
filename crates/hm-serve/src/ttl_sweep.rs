use crate::{AppState, build_hazardmap};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Periodically removes expired events. Reads already hide them, so the
/// sweep only reclaims space. Media referenced by swept events is kept.
pub async fn run(state: AppState, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        sweep_once(&state);
    }
}

pub fn sweep_once(state: &AppState) -> Option<u64> {
    let core = match build_hazardmap(state) {
        Ok(core) => core,
        Err(err) => {
            warn!(error = %err, "ttl sweep could not open the store");
            return None;
        }
    };
    match core.events().purge_expired() {
        Ok(purged) => {
            if purged > 0 {
                info!(purged, "ttl sweep removed expired events, attached media retained");
            } else {
                debug!("ttl sweep found nothing to remove");
            }
            Some(purged)
        }
        Err(err) => {
            warn!(error = %err, "ttl sweep failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};
    use hm_core::types::{CreateEventInput, EVENT_TTL_SECS, MediaUpload};
    use hm_core::{FixedClock, RequestContext};
    use std::sync::Arc;

    #[test]
    fn sweeps_only_expired_events() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("events.db").to_string_lossy().into_owned();
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 6, 1, 7, 0, 0).unwrap(),
        ));
        let state = AppState::new(db_path).with_clock(clock.clone());

        let core = build_hazardmap(&state).unwrap();
        let input = CreateEventInput {
            lat: Some(40.0),
            lng: Some(-73.0),
            category: Some("HAZARD".to_string()),
            description: Some("downed wire".to_string()),
        };
        let photo = MediaUpload {
            filename: "wire.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            data: b"jpeg".to_vec(),
        };
        let stale = core
            .events()
            .create(&RequestContext::anonymous(None), &input, vec![photo])
            .unwrap();

        clock.advance(TimeDelta::seconds(EVENT_TTL_SECS));
        core.events()
            .create(&RequestContext::anonymous(None), &input, Vec::new())
            .unwrap();

        assert_eq!(sweep_once(&state), Some(1));
        assert_eq!(sweep_once(&state), Some(0));
        assert!(core.media().open(&stale.media[0].media_id).is_ok());
    }
}
