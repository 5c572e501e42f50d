//! Owner directory cache persistence.
//!
//! # Responsibility
//! - Keep the last fetched owners directory per plan on the device, so lot
//!   lookups and classification keep working offline.
//!
//! # Invariants
//! - `store_directory` replaces a plan's rows in one transaction.
//! - Freshness is decided by callers from `fetched_at`; this layer never
//!   expires rows on its own.

use crate::db::DbError;
use crate::model::owner::{OwnerContactInfo, OwnerDirectoryEntry};
use crate::model::submission::LotNumber;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type OwnerCacheResult<T> = Result<T, OwnerCacheError>;

#[derive(Debug)]
pub enum OwnerCacheError {
    Db(DbError),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for OwnerCacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid cached owner data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "owner cache storage is not ready: missing table `{table}`")
            }
        }
    }
}

impl Error for OwnerCacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<rusqlite::Error> for OwnerCacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Owners directory snapshot for one plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedOwnerDirectory {
    pub plan_id: String,
    /// Unix epoch milliseconds of the fetch that produced these rows.
    pub fetched_at: i64,
    /// Rows sorted by lot ascending.
    pub entries: Vec<OwnerDirectoryEntry>,
}

impl CachedOwnerDirectory {
    /// Returns whether the snapshot is younger than `ttl_ms` at `now_ms`.
    pub fn is_fresh(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.fetched_at) < ttl_ms
    }
}

pub trait OwnerCacheRepository {
    /// Replaces the cached directory for `plan_id`.
    fn store_directory(
        &self,
        plan_id: &str,
        entries: &[OwnerDirectoryEntry],
        fetched_at: i64,
    ) -> OwnerCacheResult<()>;
    /// Loads the cached directory for `plan_id`, if one was ever stored.
    fn load_directory(&self, plan_id: &str) -> OwnerCacheResult<Option<CachedOwnerDirectory>>;
}

/// SQLite-backed owner directory cache.
pub struct SqliteOwnerCacheRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOwnerCacheRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> OwnerCacheResult<Self> {
        for table in ["owner_cache", "owner_cache_meta"] {
            let exists: i64 = conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
                );",
                [table],
                |row| row.get(0),
            )?;
            if exists != 1 {
                return Err(OwnerCacheError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }
}

impl OwnerCacheRepository for SqliteOwnerCacheRepository<'_> {
    fn store_directory(
        &self,
        plan_id: &str,
        entries: &[OwnerDirectoryEntry],
        fetched_at: i64,
    ) -> OwnerCacheResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM owner_cache WHERE plan_id = ?1;", [plan_id])?;
        for entry in entries {
            if entry.lot == 0 {
                continue;
            }
            tx.execute(
                "INSERT OR REPLACE INTO owner_cache (
                    plan_id,
                    lot,
                    main_contact,
                    title_name,
                    unit_number
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    plan_id,
                    i64::from(entry.lot),
                    entry.contact.main_contact_raw.as_deref(),
                    entry.contact.title_name_raw.as_deref(),
                    entry.contact.unit_number.as_deref(),
                ],
            )?;
        }
        tx.execute(
            "INSERT INTO owner_cache_meta (plan_id, fetched_at)
             VALUES (?1, ?2)
             ON CONFLICT(plan_id) DO UPDATE SET fetched_at = excluded.fetched_at;",
            params![plan_id, fetched_at],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn load_directory(&self, plan_id: &str) -> OwnerCacheResult<Option<CachedOwnerDirectory>> {
        let fetched_at: Option<i64> = self
            .conn
            .query_row(
                "SELECT fetched_at FROM owner_cache_meta WHERE plan_id = ?1;",
                [plan_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(fetched_at) = fetched_at else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT lot, main_contact, title_name, unit_number
             FROM owner_cache
             WHERE plan_id = ?1
             ORDER BY lot ASC;",
        )?;
        let mut rows = stmt.query([plan_id])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let lot_value: i64 = row.get("lot")?;
            let lot = LotNumber::try_from(lot_value).map_err(|_| {
                OwnerCacheError::InvalidData(format!("invalid lot `{lot_value}` in owner_cache.lot"))
            })?;
            entries.push(OwnerDirectoryEntry {
                lot,
                contact: OwnerContactInfo {
                    main_contact_raw: row.get("main_contact")?,
                    title_name_raw: row.get("title_name")?,
                    unit_number: row.get("unit_number")?,
                },
            });
        }

        Ok(Some(CachedOwnerDirectory {
            plan_id: plan_id.to_string(),
            fetched_at,
            entries,
        }))
    }
}
