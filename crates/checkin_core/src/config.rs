//! Runtime configuration for a check-in session.
//!
//! Values arrive from the host app; `normalize` clamps them into supported
//! ranges instead of failing, matching how list limits are handled elsewhere.

use crate::quorum::QuorumPolicy;

/// Default periodic flush interval (one minute).
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 60_000;
/// Shortest accepted flush interval.
pub const MIN_SYNC_INTERVAL_MS: u64 = 5_000;
/// Longest accepted flush interval.
pub const MAX_SYNC_INTERVAL_MS: u64 = 30 * 60_000;
/// Default owners-directory cache lifetime (six hours).
pub const DEFAULT_OWNER_CACHE_TTL_MS: i64 = 6 * 60 * 60 * 1000;

/// Session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckinConfig {
    /// Interval between scheduled flushes.
    pub sync_interval_ms: u64,
    /// How long a cached owners directory is served without refetching.
    pub owner_cache_ttl_ms: i64,
    /// Attendance ratio used for the quorum badge.
    pub quorum: QuorumPolicy,
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: DEFAULT_SYNC_INTERVAL_MS,
            owner_cache_ttl_ms: DEFAULT_OWNER_CACHE_TTL_MS,
            quorum: QuorumPolicy::default(),
        }
    }
}

impl CheckinConfig {
    /// Returns a copy with every field clamped into its supported range.
    pub fn normalize(self) -> Self {
        let sync_interval_ms = match self.sync_interval_ms {
            0 => DEFAULT_SYNC_INTERVAL_MS,
            value => value.clamp(MIN_SYNC_INTERVAL_MS, MAX_SYNC_INTERVAL_MS),
        };
        let owner_cache_ttl_ms = if self.owner_cache_ttl_ms < 0 {
            DEFAULT_OWNER_CACHE_TTL_MS
        } else {
            self.owner_cache_ttl_ms
        };
        let threshold_percent = match self.quorum.threshold_percent {
            0 => QuorumPolicy::default().threshold_percent,
            value => value.min(100),
        };

        Self {
            sync_interval_ms,
            owner_cache_ttl_ms,
            quorum: QuorumPolicy { threshold_percent },
        }
    }
}
