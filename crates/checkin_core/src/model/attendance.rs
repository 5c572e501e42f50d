//! Confirmed attendance and merged display model.
//!
//! # Responsibility
//! - Define the server-owned `AttendanceRecord` shape.
//! - Define `MergedAttendee`, the tagged union rendered by attendance views.
//!
//! # Invariants
//! - `AttendanceRecord` is read-only to the device; only the remote store
//!   creates or destroys it.
//! - A merged row is either confirmed or pending, never both.

use crate::model::submission::{LotNumber, Submission, SubmissionId, NO_REPRESENTATIVE};
use serde::{Deserialize, Serialize};

/// Attendance row confirmed by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Opaque server-side record identifier.
    pub server_id: String,
    pub plan_id: String,
    pub lot: LotNumber,
    pub owner_name: String,
    pub rep_name: String,
    pub is_financial: bool,
    pub is_proxy: bool,
    /// Unix epoch milliseconds assigned by the server.
    pub recorded_at: i64,
}

/// Confirmation state of a merged attendee row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeStatus {
    /// Accepted by the remote store.
    Confirmed,
    /// Still in the local submission queue.
    Pending,
}

/// How the attendee relates to the lot, used for row styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeRole {
    Individual,
    Company,
    Proxy,
}

/// What a delete action on a row removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    /// Local queue entry, removed without a network call.
    Queued(SubmissionId),
    /// Server record, removed through the gateway.
    Confirmed(String),
}

/// One row of the merged attendee view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergedAttendee {
    Confirmed(AttendanceRecord),
    Pending(Submission),
}

impl MergedAttendee {
    pub fn status(&self) -> AttendeeStatus {
        match self {
            Self::Confirmed(_) => AttendeeStatus::Confirmed,
            Self::Pending(_) => AttendeeStatus::Pending,
        }
    }

    pub fn lot(&self) -> LotNumber {
        match self {
            Self::Confirmed(record) => record.lot,
            Self::Pending(submission) => submission.lot,
        }
    }

    pub fn plan_id(&self) -> &str {
        match self {
            Self::Confirmed(record) => &record.plan_id,
            Self::Pending(submission) => &submission.plan_id,
        }
    }

    pub fn owner_name(&self) -> &str {
        match self {
            Self::Confirmed(record) => &record.owner_name,
            Self::Pending(submission) => &submission.owner_name,
        }
    }

    pub fn rep_name(&self) -> &str {
        match self {
            Self::Confirmed(record) => &record.rep_name,
            Self::Pending(submission) => &submission.rep_name,
        }
    }

    pub fn is_proxy(&self) -> bool {
        match self {
            Self::Confirmed(record) => record.is_proxy,
            Self::Pending(submission) => submission.is_proxy,
        }
    }

    pub fn is_financial(&self) -> bool {
        match self {
            Self::Confirmed(record) => record.is_financial,
            Self::Pending(submission) => submission.is_financial,
        }
    }

    /// Classifies the row as proxy, company representative or individual.
    ///
    /// A non-proxy row with a real `rep_name` is a company lot: the company
    /// name travels in `rep_name` and the representative in `owner_name`.
    pub fn role(&self) -> AttendeeRole {
        if self.is_proxy() {
            return AttendeeRole::Proxy;
        }
        let rep_name = self.rep_name().trim();
        if !rep_name.is_empty() && rep_name != NO_REPRESENTATIVE {
            AttendeeRole::Company
        } else {
            AttendeeRole::Individual
        }
    }

    /// Company name column for display; empty unless the row is a company lot.
    pub fn company_name(&self) -> &str {
        match self.role() {
            AttendeeRole::Company => self.rep_name(),
            AttendeeRole::Individual | AttendeeRole::Proxy => "",
        }
    }

    pub fn delete_target(&self) -> DeleteTarget {
        match self {
            Self::Confirmed(record) => DeleteTarget::Confirmed(record.server_id.clone()),
            Self::Pending(submission) => DeleteTarget::Queued(submission.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AttendanceRecord, AttendeeRole, AttendeeStatus, DeleteTarget, MergedAttendee};

    fn record(rep_name: &str, is_proxy: bool) -> AttendanceRecord {
        AttendanceRecord {
            server_id: "42".to_string(),
            plan_id: "SP1".to_string(),
            lot: 3,
            owner_name: "Jane Doe".to_string(),
            rep_name: rep_name.to_string(),
            is_financial: true,
            is_proxy,
            recorded_at: 1,
        }
    }

    #[test]
    fn role_distinguishes_proxy_company_and_individual() {
        assert_eq!(
            MergedAttendee::Confirmed(record("Bob Proxy", true)).role(),
            AttendeeRole::Proxy
        );
        assert_eq!(
            MergedAttendee::Confirmed(record("ACME PTY LTD", false)).role(),
            AttendeeRole::Company
        );
        assert_eq!(
            MergedAttendee::Confirmed(record("N/A", false)).role(),
            AttendeeRole::Individual
        );
        assert_eq!(
            MergedAttendee::Confirmed(record("", false)).role(),
            AttendeeRole::Individual
        );
    }

    #[test]
    fn confirmed_row_targets_server_record() {
        let row = MergedAttendee::Confirmed(record("N/A", false));
        assert_eq!(row.status(), AttendeeStatus::Confirmed);
        assert_eq!(row.delete_target(), DeleteTarget::Confirmed("42".to_string()));
        assert_eq!(row.company_name(), "");
    }
}
