//! Owner directory loading and lot lookup.
//!
//! # Responsibility
//! - Serve a plan's owners directory from the device cache while it is fresh.
//! - Refetch through the gateway when stale, falling back to the stale cache
//!   when the network is unavailable.
//! - Answer per-lot identity and unit-number lookups for the check-in form.
//!
//! # Invariants
//! - A successful fetch always replaces the cached rows for the plan.
//! - Cache write failures are logged and never fail the load.

use crate::identity::owner_classifier::{classify, OwnerIdentity};
use crate::model::owner::{OwnerContactInfo, OwnerDirectoryEntry};
use crate::model::submission::LotNumber;
use crate::repo::owner_cache_repo::{OwnerCacheError, OwnerCacheRepository};
use crate::sync::gateway::{AttendanceGateway, GatewayError};
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Where the loaded directory came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorySource {
    /// Cached rows younger than the TTL.
    FreshCache,
    /// Fetched from the attendance store just now.
    Remote,
    /// Cached rows past the TTL, served because the fetch failed.
    StaleCache,
}

impl DirectorySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FreshCache => "fresh_cache",
            Self::Remote => "remote",
            Self::StaleCache => "stale_cache",
        }
    }
}

#[derive(Debug)]
pub enum OwnerDirectoryError {
    /// No cached copy exists and the fetch failed.
    Unavailable(GatewayError),
    Cache(OwnerCacheError),
}

impl Display for OwnerDirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(err) => write!(f, "owners directory unavailable: {err}"),
            Self::Cache(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OwnerDirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable(err) => Some(err),
            Self::Cache(err) => Some(err),
        }
    }
}

impl From<OwnerCacheError> for OwnerDirectoryError {
    fn from(value: OwnerCacheError) -> Self {
        Self::Cache(value)
    }
}

/// Owners directory for one plan, indexed by lot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerDirectory {
    plan_id: String,
    fetched_at: i64,
    source: DirectorySource,
    entries: BTreeMap<LotNumber, OwnerContactInfo>,
}

impl OwnerDirectory {
    /// Builds a directory from raw rows; later rows win on duplicate lots.
    pub fn from_entries(
        plan_id: impl Into<String>,
        fetched_at: i64,
        source: DirectorySource,
        entries: Vec<OwnerDirectoryEntry>,
    ) -> Self {
        Self {
            plan_id: plan_id.into(),
            fetched_at,
            source,
            entries: entries
                .into_iter()
                .map(|entry| (entry.lot, entry.contact))
                .collect(),
        }
    }

    /// Loads `plan_id`'s directory using the cache-then-network policy.
    ///
    /// # Errors
    /// - `Unavailable` when nothing is cached and the fetch fails.
    /// - `Cache` when the cache itself cannot be read.
    pub fn load<G, C>(
        gateway: &G,
        cache: &C,
        plan_id: &str,
        now_ms: i64,
        ttl_ms: i64,
    ) -> Result<Self, OwnerDirectoryError>
    where
        G: AttendanceGateway + ?Sized,
        C: OwnerCacheRepository + ?Sized,
    {
        let cached = cache.load_directory(plan_id)?;
        if let Some(cached) = &cached {
            if cached.is_fresh(now_ms, ttl_ms) {
                info!(
                    "event=owner_directory_load module=service status=ok source=fresh_cache lots={}",
                    cached.entries.len()
                );
                return Ok(Self::from_entries(
                    plan_id,
                    cached.fetched_at,
                    DirectorySource::FreshCache,
                    cached.entries.clone(),
                ));
            }
        }

        match gateway.fetch_owners(plan_id) {
            Ok(entries) => {
                if let Err(err) = cache.store_directory(plan_id, &entries, now_ms) {
                    warn!(
                        "event=owner_cache_store module=service status=error error={}",
                        err
                    );
                }
                info!(
                    "event=owner_directory_load module=service status=ok source=remote lots={}",
                    entries.len()
                );
                Ok(Self::from_entries(
                    plan_id,
                    now_ms,
                    DirectorySource::Remote,
                    entries,
                ))
            }
            Err(err) => match cached {
                Some(cached) => {
                    warn!(
                        "event=owner_directory_load module=service status=degraded source=stale_cache lots={} error_code={}",
                        cached.entries.len(),
                        err.code
                    );
                    Ok(Self::from_entries(
                        plan_id,
                        cached.fetched_at,
                        DirectorySource::StaleCache,
                        cached.entries,
                    ))
                }
                None => {
                    warn!(
                        "event=owner_directory_load module=service status=error error_code={}",
                        err.code
                    );
                    Err(OwnerDirectoryError::Unavailable(err))
                }
            },
        }
    }

    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }

    pub fn fetched_at(&self) -> i64 {
        self.fetched_at
    }

    pub fn source(&self) -> DirectorySource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contact(&self, lot: LotNumber) -> Option<&OwnerContactInfo> {
        self.entries.get(&lot)
    }

    /// Identity choices for `lot`; `Unknown` when the lot is not listed.
    pub fn identity(&self, lot: LotNumber) -> OwnerIdentity {
        classify(self.contact(lot))
    }

    pub fn unit_number(&self, lot: LotNumber) -> Option<&str> {
        self.contact(lot)
            .and_then(|contact| contact.unit_number.as_deref())
            .map(str::trim)
            .filter(|unit| !unit.is_empty())
    }

    /// Listed lots in ascending order.
    pub fn lots(&self) -> impl Iterator<Item = LotNumber> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::{DirectorySource, OwnerDirectory, OwnerDirectoryError};
    use crate::db::open_db_in_memory;
    use crate::identity::owner_classifier::OwnerIdentity;
    use crate::model::owner::{OwnerContactInfo, OwnerDirectoryEntry};
    use crate::repo::owner_cache_repo::{OwnerCacheRepository, SqliteOwnerCacheRepository};
    use crate::sync::memory_store::InMemoryAttendanceStore;

    const TTL: i64 = 1_000;

    fn entry(lot: u32, main: &str, unit: &str) -> OwnerDirectoryEntry {
        OwnerDirectoryEntry {
            lot,
            contact: OwnerContactInfo {
                main_contact_raw: Some(main.to_string()),
                title_name_raw: None,
                unit_number: Some(unit.to_string()),
            },
        }
    }

    #[test]
    fn fresh_cache_skips_network() {
        let conn = open_db_in_memory().unwrap();
        let cache = SqliteOwnerCacheRepository::try_new(&conn).unwrap();
        cache
            .store_directory("SP1", &[entry(1, "Jane Doe", "1A")], 100)
            .unwrap();
        let store = InMemoryAttendanceStore::new();

        let directory = OwnerDirectory::load(&store, &cache, "SP1", 500, TTL).unwrap();

        assert_eq!(directory.source(), DirectorySource::FreshCache);
        assert_eq!(store.fetch_owner_calls(), 0);
        assert_eq!(directory.unit_number(1), Some("1A"));
    }

    #[test]
    fn stale_cache_refetches_and_replaces_rows() {
        let conn = open_db_in_memory().unwrap();
        let cache = SqliteOwnerCacheRepository::try_new(&conn).unwrap();
        cache
            .store_directory("SP1", &[entry(1, "Old Owner", "1")], 100)
            .unwrap();
        let store = InMemoryAttendanceStore::new();
        store.set_owners("SP1", vec![entry(2, "ACME PTY LTD", "2")]);

        let directory = OwnerDirectory::load(&store, &cache, "SP1", 5_000, TTL).unwrap();

        assert_eq!(directory.source(), DirectorySource::Remote);
        assert_eq!(directory.identity(1), OwnerIdentity::Unknown);
        assert_eq!(
            directory.identity(2),
            OwnerIdentity::Company {
                name: "ACME PTY LTD".to_string()
            }
        );
        let cached = cache.load_directory("SP1").unwrap().unwrap();
        assert_eq!(cached.fetched_at, 5_000);
        assert_eq!(cached.entries.len(), 1);
    }

    #[test]
    fn offline_falls_back_to_stale_cache_or_fails_without_one() {
        let conn = open_db_in_memory().unwrap();
        let cache = SqliteOwnerCacheRepository::try_new(&conn).unwrap();
        let store = InMemoryAttendanceStore::new();
        store.set_online(false);

        let err = OwnerDirectory::load(&store, &cache, "SP1", 5_000, TTL).unwrap_err();
        assert!(matches!(err, OwnerDirectoryError::Unavailable(_)));

        cache
            .store_directory("SP1", &[entry(7, "Jane Doe", " ")], 100)
            .unwrap();
        let directory = OwnerDirectory::load(&store, &cache, "SP1", 5_000, TTL).unwrap();
        assert_eq!(directory.source(), DirectorySource::StaleCache);
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.unit_number(7), None);
    }
}
