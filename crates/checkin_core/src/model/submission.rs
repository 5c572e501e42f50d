//! Check-in submission model.
//!
//! # Responsibility
//! - Define the pre-enqueue (`NewSubmission`) and queued (`Submission`) shapes.
//! - Validate check-in payloads before they reach persistence.
//!
//! # Invariants
//! - `Submission::id` is generated on the device and never reused.
//! - A `Submission` is immutable once queued; edits are delete + re-enqueue.
//! - `rep_name` uses `NO_REPRESENTATIVE` when nobody attends on the owner's behalf.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Device-unique identifier of one queued check-in.
pub type SubmissionId = Uuid;

/// Lot number within a strata plan.
pub type LotNumber = u32;

/// Placeholder stored in `rep_name` for owners attending in person.
pub const NO_REPRESENTATIVE: &str = "N/A";

/// Check-in payload produced by the attendance form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubmission {
    /// Optional caller-chosen id. The queue generates one when absent.
    pub id: Option<SubmissionId>,
    /// Strata plan the lot belongs to.
    pub plan_id: String,
    /// Meeting this check-in is recorded against.
    pub meeting_id: String,
    /// Lot being checked in.
    pub lot: LotNumber,
    /// Attending owner names, or the company representative.
    pub owner_name: String,
    /// Company name, proxy holder, or `NO_REPRESENTATIVE`.
    pub rep_name: String,
    /// Whether the lot's levies are paid up.
    pub is_financial: bool,
    /// Whether a proxy attends for the owner.
    pub is_proxy: bool,
}

impl NewSubmission {
    /// Creates an in-person owner check-in with no representative.
    pub fn new(
        plan_id: impl Into<String>,
        meeting_id: impl Into<String>,
        lot: LotNumber,
        owner_name: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            plan_id: plan_id.into(),
            meeting_id: meeting_id.into(),
            lot,
            owner_name: owner_name.into(),
            rep_name: NO_REPRESENTATIVE.to_string(),
            is_financial: false,
            is_proxy: false,
        }
    }

    /// Validates required fields before enqueue.
    pub fn validate(&self) -> Result<(), SubmissionValidationError> {
        validate_fields(
            &self.plan_id,
            &self.meeting_id,
            self.lot,
            &self.owner_name,
        )
    }

    /// Freezes the payload into a queue entry.
    pub fn into_submission(self, id: SubmissionId, enqueued_at: i64) -> Submission {
        Submission {
            id,
            plan_id: self.plan_id,
            meeting_id: self.meeting_id,
            lot: self.lot,
            owner_name: self.owner_name,
            rep_name: self.rep_name,
            is_financial: self.is_financial,
            is_proxy: self.is_proxy,
            enqueued_at,
        }
    }
}

/// One check-in waiting for server confirmation.
///
/// Serialized with snake_case keys; this is also the batch-submit wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(rename = "submission_id")]
    pub id: SubmissionId,
    pub plan_id: String,
    pub meeting_id: String,
    pub lot: LotNumber,
    pub owner_name: String,
    pub rep_name: String,
    pub is_financial: bool,
    pub is_proxy: bool,
    /// Unix epoch milliseconds when the entry was first queued.
    pub enqueued_at: i64,
}

impl Submission {
    /// Validates a persisted entry read back from storage.
    pub fn validate(&self) -> Result<(), SubmissionValidationError> {
        validate_fields(
            &self.plan_id,
            &self.meeting_id,
            self.lot,
            &self.owner_name,
        )
    }
}

/// Validation failures for check-in payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionValidationError {
    EmptyPlanId,
    EmptyMeetingId,
    InvalidLot(LotNumber),
    EmptyOwnerName,
}

impl Display for SubmissionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPlanId => write!(f, "plan_id must not be empty"),
            Self::EmptyMeetingId => write!(f, "meeting_id must not be empty"),
            Self::InvalidLot(lot) => write!(f, "lot must be greater than zero, got {lot}"),
            Self::EmptyOwnerName => write!(f, "owner_name must not be empty"),
        }
    }
}

impl Error for SubmissionValidationError {}

fn validate_fields(
    plan_id: &str,
    meeting_id: &str,
    lot: LotNumber,
    owner_name: &str,
) -> Result<(), SubmissionValidationError> {
    if plan_id.trim().is_empty() {
        return Err(SubmissionValidationError::EmptyPlanId);
    }
    if meeting_id.trim().is_empty() {
        return Err(SubmissionValidationError::EmptyMeetingId);
    }
    if lot == 0 {
        return Err(SubmissionValidationError::InvalidLot(lot));
    }
    if owner_name.trim().is_empty() {
        return Err(SubmissionValidationError::EmptyOwnerName);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{NewSubmission, SubmissionValidationError, NO_REPRESENTATIVE};

    #[test]
    fn new_defaults_to_in_person_owner() {
        let draft = NewSubmission::new("SP1234", "agm-2026", 7, "Jane Doe");
        assert!(draft.id.is_none());
        assert_eq!(draft.rep_name, NO_REPRESENTATIVE);
        assert!(!draft.is_proxy);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let mut draft = NewSubmission::new("SP1234", "agm-2026", 0, "Jane Doe");
        assert_eq!(
            draft.validate(),
            Err(SubmissionValidationError::InvalidLot(0))
        );

        draft.lot = 3;
        draft.owner_name = "   ".to_string();
        assert_eq!(
            draft.validate(),
            Err(SubmissionValidationError::EmptyOwnerName)
        );

        draft.owner_name = "Jane".to_string();
        draft.meeting_id.clear();
        assert_eq!(
            draft.validate(),
            Err(SubmissionValidationError::EmptyMeetingId)
        );
    }
}
