//! Confirmed/pending attendance reconciliation.
//!
//! # Responsibility
//! - Merge server-confirmed records with locally queued check-ins into one
//!   display-ordered list.
//! - Hold the last confirmed snapshot fetched for the active meeting.
//!
//! # Invariants
//! - `merge` never deduplicates across states; the remote upsert collapses a
//!   pending duplicate once it is confirmed.
//! - A failed refresh keeps the previous snapshot and never touches the queue.

use crate::model::attendance::{AttendanceRecord, MergedAttendee};
use crate::model::submission::{LotNumber, Submission};
use crate::sync::gateway::{AttendanceGateway, GatewayResult};
use log::{info, warn};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::time::Instant;

/// Merges confirmed and pending rows, sorted by lot ascending.
///
/// Rows for the same lot list confirmed before pending; otherwise input order
/// is preserved.
pub fn merge(confirmed: &[AttendanceRecord], pending: &[Submission]) -> Vec<MergedAttendee> {
    let mut merged: Vec<MergedAttendee> = confirmed
        .iter()
        .cloned()
        .map(MergedAttendee::Confirmed)
        .chain(pending.iter().cloned().map(MergedAttendee::Pending))
        .collect();
    merged.sort_by_key(|attendee| (attendee.lot(), attendee.status()));
    merged
}

/// Distinct lots present in a merged view, for quorum counting.
pub fn attended_lots(merged: &[MergedAttendee]) -> BTreeSet<LotNumber> {
    merged.iter().map(MergedAttendee::lot).collect()
}

/// Holder of the confirmed snapshot for one meeting.
#[derive(Debug, Default)]
pub struct AttendanceReconciler {
    confirmed: RefCell<Vec<AttendanceRecord>>,
}

impl AttendanceReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last confirmed snapshot.
    pub fn confirmed(&self) -> Vec<AttendanceRecord> {
        self.confirmed.borrow().clone()
    }

    /// Pulls confirmed attendance once and stores it as the new snapshot.
    ///
    /// # Errors
    /// - Returns the gateway error unchanged; the old snapshot stays in place.
    pub fn refresh_confirmed<G: AttendanceGateway + ?Sized>(
        &self,
        gateway: &G,
        plan_id: &str,
        meeting_date: &str,
    ) -> GatewayResult<Vec<AttendanceRecord>> {
        let started_at = Instant::now();
        match gateway.fetch_meeting_attendance(plan_id, meeting_date) {
            Ok(records) => {
                info!(
                    "event=attendance_refresh module=reconciler status=ok records={} duration_ms={}",
                    records.len(),
                    started_at.elapsed().as_millis()
                );
                *self.confirmed.borrow_mut() = records.clone();
                Ok(records)
            }
            Err(err) => {
                warn!(
                    "event=attendance_refresh module=reconciler status=error duration_ms={} error_code={} retryable={}",
                    started_at.elapsed().as_millis(),
                    err.code,
                    err.retryable
                );
                Err(err)
            }
        }
    }

    /// Merges the current snapshot with `pending`.
    pub fn merged_view(&self, pending: &[Submission]) -> Vec<MergedAttendee> {
        merge(&self.confirmed.borrow(), pending)
    }

    /// Drops the snapshot, e.g. when the meeting changes.
    pub fn reset(&self) {
        self.confirmed.borrow_mut().clear();
    }
}
