use hm_core::error::HazardError;
use hm_core::store::Store;
use rusqlite::Connection;
use tracing::warn;

use crate::event_repo::EventRepo;
use crate::media_repo::MediaRepo;

pub struct DbStore {
    conn: Connection,
}

impl DbStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn tx_error(err: &rusqlite::Error) -> HazardError {
    HazardError::Internal {
        message: format!("transaction failed: {err}"),
    }
}

impl Store for DbStore {
    type Events<'a>
        = EventRepo<'a>
    where
        Self: 'a;
    type Media<'a>
        = MediaRepo<'a>
    where
        Self: 'a;

    fn events(&self) -> Self::Events<'_> {
        EventRepo::new(&self.conn)
    }

    fn media(&self) -> Self::Media<'_> {
        MediaRepo::new(&self.conn)
    }

    fn with_tx<F, T>(&self, f: F) -> Result<T, HazardError>
    where
        F: FnOnce(&Self) -> Result<T, HazardError>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|err| tx_error(&err))?;
        match f(self) {
            Ok(value) => {
                self.conn
                    .execute_batch("COMMIT")
                    .map_err(|err| tx_error(&err))?;
                Ok(value)
            }
            Err(err) => {
                // The caller's error wins over a failed rollback.
                if let Err(rollback_err) = self.conn.execute_batch("ROLLBACK") {
                    warn!(error = %err, rollback_error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
