//! Attendance table projection.
//!
//! # Responsibility
//! - Project merged attendee rows, owner directory data and queue state into
//!   the snapshot rendered by the check-in screen.
//!
//! # Invariants
//! - Quorum counts distinct lots across confirmed and pending rows.
//! - The person count covers confirmed rows only; pending rows are not yet
//!   attendance of record.

use crate::model::attendance::{AttendeeRole, AttendeeStatus, DeleteTarget, MergedAttendee};
use crate::model::meeting::MeetingContext;
use crate::quorum::{QuorumPolicy, QuorumStatus};
use crate::service::owner_directory::OwnerDirectory;
use crate::sync::engine::SyncIndicator;
use crate::sync::reconciler::attended_lots;

/// One rendered attendee row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendeeRow {
    pub attendee: MergedAttendee,
    pub role: AttendeeRole,
    /// Unit number from the owners directory, when listed.
    pub unit_number: Option<String>,
}

impl AttendeeRow {
    pub fn status(&self) -> AttendeeStatus {
        self.attendee.status()
    }

    pub fn delete_target(&self) -> DeleteTarget {
        self.attendee.delete_target()
    }
}

/// Snapshot of the check-in screen for one meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceView {
    pub rows: Vec<AttendeeRow>,
    /// Confirmed attendee rows.
    pub synced_person_count: usize,
    pub quorum: QuorumStatus,
    /// Caption for the quorum total, depends on meeting type.
    pub quorum_label: &'static str,
    pub sync: SyncIndicator,
}

impl AttendanceView {
    /// Builds the view from an already merged, lot-ordered row list.
    pub fn build(
        merged: Vec<MergedAttendee>,
        context: &MeetingContext,
        policy: &QuorumPolicy,
        directory: Option<&OwnerDirectory>,
        sync: SyncIndicator,
    ) -> Self {
        let attended = attended_lots(&merged).len();
        let quorum = policy.compute(
            i64::try_from(attended).unwrap_or(i64::MAX),
            context.quorum_total(),
        );
        let synced_person_count = merged
            .iter()
            .filter(|attendee| attendee.status() == AttendeeStatus::Confirmed)
            .count();

        let rows = merged
            .into_iter()
            .map(|attendee| {
                let unit_number = directory
                    .and_then(|directory| directory.unit_number(attendee.lot()))
                    .map(str::to_string);
                AttendeeRow {
                    role: attendee.role(),
                    unit_number,
                    attendee,
                }
            })
            .collect();

        Self {
            rows,
            synced_person_count,
            quorum,
            quorum_label: context.meeting_type().quorum_total_label(),
            sync,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.rows.len() - self.synced_person_count
    }
}

#[cfg(test)]
mod tests {
    use super::AttendanceView;
    use crate::model::attendance::{AttendanceRecord, AttendeeRole, MergedAttendee};
    use crate::model::meeting::{MeetingContext, MeetingType};
    use crate::model::owner::{OwnerContactInfo, OwnerDirectoryEntry};
    use crate::model::submission::NewSubmission;
    use crate::quorum::QuorumPolicy;
    use crate::service::owner_directory::{DirectorySource, OwnerDirectory};
    use crate::sync::engine::{indicator_label, SyncIndicator, SyncState};
    use crate::sync::reconciler::merge;
    use uuid::Uuid;

    fn indicator(queue_len: usize) -> SyncIndicator {
        SyncIndicator {
            state: SyncState::Idle,
            queue_len,
            label: indicator_label(SyncState::Idle, queue_len),
        }
    }

    #[test]
    fn build_counts_distinct_lots_and_confirmed_people() {
        let context =
            MeetingContext::new("SP1", "SP1:d", "d", MeetingType::Scm, 4).unwrap();
        let confirmed = vec![AttendanceRecord {
            server_id: "1".to_string(),
            plan_id: "SP1".to_string(),
            lot: 2,
            owner_name: "Sam Rep".to_string(),
            rep_name: "ACME PTY LTD".to_string(),
            is_financial: true,
            is_proxy: false,
            recorded_at: 1,
        }];
        let pending = vec![
            NewSubmission::new("SP1", "SP1:d", 2, "Second Person").into_submission(Uuid::new_v4(), 1),
            NewSubmission::new("SP1", "SP1:d", 3, "Jane Doe").into_submission(Uuid::new_v4(), 2),
        ];
        let directory = OwnerDirectory::from_entries(
            "SP1",
            0,
            DirectorySource::Remote,
            vec![OwnerDirectoryEntry {
                lot: 3,
                contact: OwnerContactInfo {
                    unit_number: Some("3B".to_string()),
                    ..OwnerContactInfo::default()
                },
            }],
        );

        let view = AttendanceView::build(
            merge(&confirmed, &pending),
            &context,
            &QuorumPolicy::default(),
            Some(&directory),
            indicator(2),
        );

        assert_eq!(view.rows.len(), 3);
        assert_eq!(view.synced_person_count, 1);
        assert_eq!(view.pending_count(), 2);
        assert_eq!(view.quorum.attended, 2);
        assert_eq!(view.quorum.percentage, 50);
        assert!(view.quorum.threshold_met);
        assert_eq!(view.quorum_label, "Number of Committee Members");
        assert_eq!(view.rows[0].role, AttendeeRole::Company);
        assert_eq!(view.rows[2].unit_number.as_deref(), Some("3B"));
        assert!(matches!(view.rows[1].attendee, MergedAttendee::Pending(_)));
        assert_eq!(view.sync.label, "Sync 2 Items");
    }
}
