//! Remote attendance store port.
//!
//! # Responsibility
//! - Define the operations the core needs from the central attendance store.
//! - Carry transport failures as one error envelope so sync code can treat
//!   them uniformly.
//!
//! # Invariants
//! - `submit_attendance_batch` receivers apply an idempotent upsert keyed by
//!   (plan, lot, meeting): delete any existing record for the key, then
//!   insert, with the whole batch in one all-or-nothing transaction.
//! - A non-success `BatchAck` means nothing from the batch was applied.

use crate::model::attendance::AttendanceRecord;
use crate::model::owner::OwnerDirectoryEntry;
use crate::model::submission::Submission;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Remote operation a gateway error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayOperation {
    FetchOwners,
    FetchAttendance,
    SubmitBatch,
    DeleteAttendance,
}

impl GatewayOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FetchOwners => "fetch_owners",
            Self::FetchAttendance => "fetch_attendance",
            Self::SubmitBatch => "submit_batch",
            Self::DeleteAttendance => "delete_attendance",
        }
    }
}

/// Failure envelope returned by gateway implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub operation: GatewayOperation,
    /// Stable machine-readable code, e.g. `network_unavailable`.
    pub code: String,
    /// Human-readable message suitable for a transient notice.
    pub message: String,
    /// Whether retrying later may succeed.
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(
        operation: GatewayOperation,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            operation,
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }

    /// Network-level failure; always retryable.
    pub fn unavailable(operation: GatewayOperation, message: impl Into<String>) -> Self {
        Self::new(operation, "network_unavailable", message, true)
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} failed ({}): {}",
            self.operation.as_str(),
            self.code,
            self.message
        )
    }
}

impl Error for GatewayError {}

/// Server response to a batch submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchAck {
    pub fn accepted() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Operations consumed from the central attendance store.
pub trait AttendanceGateway {
    /// Reads a plan's owners directory.
    fn fetch_owners(&self, plan_id: &str) -> GatewayResult<Vec<OwnerDirectoryEntry>>;

    /// Reads confirmed attendance for one plan on one meeting date.
    fn fetch_meeting_attendance(
        &self,
        plan_id: &str,
        meeting_date: &str,
    ) -> GatewayResult<Vec<AttendanceRecord>>;

    /// Submits a batch of check-ins for `meeting_id` in one request.
    fn submit_attendance_batch(
        &self,
        meeting_id: &str,
        batch: &[Submission],
    ) -> GatewayResult<BatchAck>;

    /// Removes one confirmed attendance record.
    fn delete_attendance(&self, record_id: &str) -> GatewayResult<()>;
}

impl<G: AttendanceGateway + ?Sized> AttendanceGateway for &G {
    fn fetch_owners(&self, plan_id: &str) -> GatewayResult<Vec<OwnerDirectoryEntry>> {
        (**self).fetch_owners(plan_id)
    }

    fn fetch_meeting_attendance(
        &self,
        plan_id: &str,
        meeting_date: &str,
    ) -> GatewayResult<Vec<AttendanceRecord>> {
        (**self).fetch_meeting_attendance(plan_id, meeting_date)
    }

    fn submit_attendance_batch(
        &self,
        meeting_id: &str,
        batch: &[Submission],
    ) -> GatewayResult<BatchAck> {
        (**self).submit_attendance_batch(meeting_id, batch)
    }

    fn delete_attendance(&self, record_id: &str) -> GatewayResult<()> {
        (**self).delete_attendance(record_id)
    }
}
