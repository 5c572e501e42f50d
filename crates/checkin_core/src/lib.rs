//! Core domain logic for meeting check-in.
//! This crate is the single source of truth for queueing, quorum and sync
//! invariants; UI and FFI layers only render and forward.

pub mod config;
pub mod db;
pub mod identity;
pub mod logging;
pub mod model;
pub mod quorum;
pub mod repo;
pub mod service;
pub mod sync;

pub use config::CheckinConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use identity::owner_classifier::{classify, OwnerIdentity};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::attendance::{
    AttendanceRecord, AttendeeRole, AttendeeStatus, DeleteTarget, MergedAttendee,
};
pub use model::meeting::{
    meeting_key, MeetingContext, MeetingDetails, MeetingSelectionError, MeetingType,
    PromptOutcome,
};
pub use model::owner::{OwnerContactInfo, OwnerDirectoryEntry};
pub use model::submission::{
    LotNumber, NewSubmission, Submission, SubmissionId, SubmissionValidationError,
    NO_REPRESENTATIVE,
};
pub use quorum::{QuorumPolicy, QuorumStatus};
pub use repo::queue_repo::{
    now_epoch_ms, QueueError, QueueFilter, QueueResult, SqliteSubmissionQueue, SubmissionQueue,
};
pub use service::attendance_view::{AttendanceView, AttendeeRow};
pub use service::checkin_service::{AttendeeSelection, CheckInError, CheckInRequest};
pub use service::session::{
    CheckinSession, MeetingPrompt, ReferenceDataReport, SessionError, SessionResult,
};
pub use sync::engine::{FlushOutcome, FlushReport, FlushTrigger, SyncEngine, SyncError, SyncState};
pub use sync::gateway::{AttendanceGateway, BatchAck, GatewayError, GatewayOperation};
pub use sync::memory_store::InMemoryAttendanceStore;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
