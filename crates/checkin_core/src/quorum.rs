//! Quorum computation.
//!
//! # Invariants
//! - Never divides by zero; `total <= 0` is "no quorum possible".
//! - `percentage` is floored and clamped to `0..=100`.
//! - `threshold_met` compares raw counts, not the rounded percentage.

use serde::{Deserialize, Serialize};

/// Default share of lots that must attend, in whole percent.
pub const DEFAULT_QUORUM_PERCENT: u8 = 25;

/// Bylaw-dependent attendance ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumPolicy {
    /// Required attendance in whole percent of total lots (1..=100).
    pub threshold_percent: u8,
}

impl Default for QuorumPolicy {
    fn default() -> Self {
        Self {
            threshold_percent: DEFAULT_QUORUM_PERCENT,
        }
    }
}

/// Quorum badge state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumStatus {
    /// Floor of `attended * 100 / total`, clamped to 0..=100.
    pub percentage: u8,
    pub attended: i64,
    pub total: i64,
    /// Minimum attended count needed, `ceil(total * ratio)`.
    pub threshold: i64,
    pub threshold_met: bool,
}

impl QuorumPolicy {
    /// Computes quorum for `attended` out of `total` lots under this policy.
    pub fn compute(&self, attended: i64, total: i64) -> QuorumStatus {
        let attended = attended.max(0);
        if total <= 0 {
            return QuorumStatus {
                percentage: 0,
                attended,
                total,
                threshold: 0,
                threshold_met: false,
            };
        }

        let percent = i64::from(self.threshold_percent.clamp(1, 100));
        let threshold = total.saturating_mul(percent).saturating_add(99) / 100;
        let percentage = (attended.saturating_mul(100) / total).clamp(0, 100) as u8;

        QuorumStatus {
            percentage,
            attended,
            total,
            threshold,
            threshold_met: attended >= threshold,
        }
    }
}

/// Computes quorum under the default 25% policy.
pub fn compute(attended: i64, total: i64) -> QuorumStatus {
    QuorumPolicy::default().compute(attended, total)
}
