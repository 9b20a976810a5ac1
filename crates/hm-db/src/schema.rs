use rusqlite::{Connection, Result};

/// Ordered migrations; `PRAGMA user_version` records how many are applied.
const MIGRATIONS: &[&str] = &[include_str!("../migrations/0001_init.sql")];

/// Concurrent request connections and the sweeper wait this long on a
/// locked database before failing.
pub const BUSY_TIMEOUT_MS: u32 = 5_000;

pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS)?;
    // Media chunks rely on ON DELETE CASCADE.
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

pub fn schema_version(conn: &Connection) -> Result<usize> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(usize::try_from(version).unwrap_or(0))
}

/// Applies pending migrations. Every request opens a fresh connection, so
/// an up-to-date database costs a single pragma read.
pub fn migrate(conn: &Connection) -> Result<()> {
    let applied = schema_version(conn)?;
    for (index, sql) in MIGRATIONS.iter().enumerate().skip(applied) {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", u32::try_from(index + 1).unwrap_or(u32::MAX))?;
        tx.commit()?;
    }
    Ok(())
}

pub fn open_and_migrate(path: &str) -> Result<Connection> {
    let conn = open(path)?;
    migrate(&conn)?;
    Ok(conn)
}

pub fn with_test_db() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    migrate(&conn)?;
    Ok(conn)
}
