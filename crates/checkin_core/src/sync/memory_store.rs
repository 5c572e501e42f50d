//! In-process attendance store.
//!
//! # Responsibility
//! - Implement `AttendanceGateway` with the receiver-side contract: batch
//!   upsert keyed by (plan, lot, meeting date), delete-then-insert, whole
//!   batch applied or nothing.
//! - Back the CLI demo and boundary tests without a network.
//!
//! # Invariants
//! - At most one record exists per (plan, lot, meeting date).
//! - A rejected batch leaves stored records untouched.
//! - While offline every operation fails with a retryable error.

use crate::model::attendance::AttendanceRecord;
use crate::model::owner::OwnerDirectoryEntry;
use crate::model::submission::{LotNumber, Submission};
use crate::sync::gateway::{
    AttendanceGateway, BatchAck, GatewayError, GatewayOperation, GatewayResult,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

const RECORDED_AT_BASE_MS: i64 = 1_700_000_000_000;

#[derive(Debug, Clone)]
struct MeetingRow {
    plan_id: String,
    meeting_date: String,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    meeting_date: String,
    record: AttendanceRecord,
}

#[derive(Debug, Default)]
struct StoreState {
    offline: bool,
    owners: BTreeMap<String, Vec<OwnerDirectoryEntry>>,
    meetings: BTreeMap<String, MeetingRow>,
    records: Vec<StoredRecord>,
    rejected_lots: BTreeSet<LotNumber>,
    next_record_id: u64,
    submit_calls: usize,
    fetch_attendance_calls: usize,
    fetch_owner_calls: usize,
}

/// Attendance store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryAttendanceStore {
    state: RefCell<StoreState>,
}

impl InMemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a meeting so batches addressed to `meeting_id` resolve to
    /// its plan and date.
    pub fn register_meeting(&self, meeting_id: &str, plan_id: &str, meeting_date: &str) {
        self.state.borrow_mut().meetings.insert(
            meeting_id.to_string(),
            MeetingRow {
                plan_id: plan_id.to_string(),
                meeting_date: meeting_date.to_string(),
            },
        );
    }

    /// Replaces the owners directory served for `plan_id`.
    pub fn set_owners(&self, plan_id: &str, entries: Vec<OwnerDirectoryEntry>) {
        self.state
            .borrow_mut()
            .owners
            .insert(plan_id.to_string(), entries);
    }

    /// Simulates losing or regaining connectivity.
    pub fn set_online(&self, online: bool) {
        self.state.borrow_mut().offline = !online;
    }

    /// Makes any batch containing `lot` fail its transaction.
    pub fn reject_lot(&self, lot: LotNumber) {
        self.state.borrow_mut().rejected_lots.insert(lot);
    }

    /// Clears lots registered through `reject_lot`.
    pub fn clear_rejections(&self) {
        self.state.borrow_mut().rejected_lots.clear();
    }

    /// Number of batch submit requests received, including failed ones.
    pub fn submit_calls(&self) -> usize {
        self.state.borrow().submit_calls
    }

    /// Number of attendance fetch requests received.
    pub fn fetch_attendance_calls(&self) -> usize {
        self.state.borrow().fetch_attendance_calls
    }

    /// Number of owners directory fetch requests received.
    pub fn fetch_owner_calls(&self) -> usize {
        self.state.borrow().fetch_owner_calls
    }

    /// All stored records, in insertion order.
    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.state
            .borrow()
            .records
            .iter()
            .map(|stored| stored.record.clone())
            .collect()
    }

    fn ensure_online(&self, operation: GatewayOperation) -> GatewayResult<()> {
        if self.state.borrow().offline {
            return Err(GatewayError::unavailable(
                operation,
                "attendance store is unreachable",
            ));
        }
        Ok(())
    }
}

impl AttendanceGateway for InMemoryAttendanceStore {
    fn fetch_owners(&self, plan_id: &str) -> GatewayResult<Vec<OwnerDirectoryEntry>> {
        self.state.borrow_mut().fetch_owner_calls += 1;
        self.ensure_online(GatewayOperation::FetchOwners)?;
        Ok(self
            .state
            .borrow()
            .owners
            .get(plan_id)
            .cloned()
            .unwrap_or_default())
    }

    fn fetch_meeting_attendance(
        &self,
        plan_id: &str,
        meeting_date: &str,
    ) -> GatewayResult<Vec<AttendanceRecord>> {
        self.state.borrow_mut().fetch_attendance_calls += 1;
        self.ensure_online(GatewayOperation::FetchAttendance)?;
        Ok(self
            .state
            .borrow()
            .records
            .iter()
            .filter(|stored| stored.record.plan_id == plan_id && stored.meeting_date == meeting_date)
            .map(|stored| stored.record.clone())
            .collect())
    }

    fn submit_attendance_batch(
        &self,
        meeting_id: &str,
        batch: &[Submission],
    ) -> GatewayResult<BatchAck> {
        self.state.borrow_mut().submit_calls += 1;
        self.ensure_online(GatewayOperation::SubmitBatch)?;

        let mut state = self.state.borrow_mut();
        let Some(meeting) = state.meetings.get(meeting_id).cloned() else {
            return Ok(BatchAck::rejected(format!("meeting not found: {meeting_id}")));
        };

        // Work on a copy; only a fully valid batch replaces the stored rows.
        let mut records = state.records.clone();
        let mut next_record_id = state.next_record_id;
        for submission in batch {
            if submission.meeting_id != meeting_id || submission.plan_id != meeting.plan_id {
                return Ok(BatchAck::rejected(format!(
                    "submission {} does not belong to meeting {meeting_id}",
                    submission.id
                )));
            }
            if state.rejected_lots.contains(&submission.lot) {
                return Ok(BatchAck::rejected(format!(
                    "lot {} rejected by store",
                    submission.lot
                )));
            }

            records.retain(|stored| {
                !(stored.record.plan_id == submission.plan_id
                    && stored.record.lot == submission.lot
                    && stored.meeting_date == meeting.meeting_date)
            });
            next_record_id += 1;
            records.push(StoredRecord {
                meeting_date: meeting.meeting_date.clone(),
                record: AttendanceRecord {
                    server_id: next_record_id.to_string(),
                    plan_id: submission.plan_id.clone(),
                    lot: submission.lot,
                    owner_name: submission.owner_name.clone(),
                    rep_name: submission.rep_name.clone(),
                    is_financial: submission.is_financial,
                    is_proxy: submission.is_proxy,
                    recorded_at: RECORDED_AT_BASE_MS + next_record_id as i64,
                },
            });
        }

        state.records = records;
        state.next_record_id = next_record_id;
        Ok(BatchAck::accepted())
    }

    fn delete_attendance(&self, record_id: &str) -> GatewayResult<()> {
        self.ensure_online(GatewayOperation::DeleteAttendance)?;
        let mut state = self.state.borrow_mut();
        let before = state.records.len();
        state
            .records
            .retain(|stored| stored.record.server_id != record_id);
        if state.records.len() == before {
            return Err(GatewayError::new(
                GatewayOperation::DeleteAttendance,
                "record_not_found",
                format!("attendance record not found: {record_id}"),
                false,
            ));
        }
        Ok(())
    }
}
