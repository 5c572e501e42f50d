//! Ordered schema scripts and the runner that applies them.
//!
//! # Invariants
//! - Script versions start at 1 and increase by one.
//! - All pending scripts run in a single transaction; `user_version` is
//!   bumped after each script inside it.
//!
//! # Schema history
//! - Version 1 creates the durable submission queue.
//! - Version 2 adds the per-plan owner directory cache.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

const SCRIPTS: &[(u32, &str)] = &[
    (1, include_str!("0001_submission_queue.sql")),
    (2, include_str!("0002_owner_cache.sql")),
];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    SCRIPTS.last().map_or(0, |(version, _)| *version)
}

/// Schema version recorded in the store.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Upgrades `conn` to `latest_version()`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the store is ahead of this build.
/// - `MigrationFailed` naming the first script that failed; nothing from the
///   upgrade is kept in that case.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = schema_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending: Vec<(u32, &str)> = SCRIPTS
        .iter()
        .copied()
        .filter(|(version, _)| *version > from_version)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in &pending {
        tx.execute_batch(sql)
            .and_then(|()| tx.pragma_update(None, "user_version", version))
            .map_err(|source| DbError::MigrationFailed {
                version: *version,
                source,
            })?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        from_version, latest
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{latest_version, SCRIPTS};

    #[test]
    fn script_versions_are_contiguous() {
        for (index, (version, _)) in SCRIPTS.iter().enumerate() {
            assert_eq!(*version as usize, index + 1);
        }
        assert_eq!(latest_version(), SCRIPTS.len() as u32);
    }
}
