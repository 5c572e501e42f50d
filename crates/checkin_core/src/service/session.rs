//! Check-in session orchestration.
//!
//! # Responsibility
//! - Open a meeting (prompting the clerk for type and quorum total) and wire
//!   the queue, owner cache, reconciler and sync engine to it.
//! - Expose the screen-level operations: check in, delete, sync, snapshot.
//!
//! # Invariants
//! - One session serves exactly one `MeetingContext`.
//! - Ending a session cancels the schedule; queued entries stay on disk and
//!   reappear when the same meeting is reopened.

use crate::config::CheckinConfig;
use crate::identity::owner_classifier::OwnerIdentity;
use crate::model::meeting::{
    MeetingContext, MeetingDetails, MeetingSelectionError, PromptOutcome,
};
use crate::model::submission::{LotNumber, Submission, SubmissionId};
use crate::repo::owner_cache_repo::{OwnerCacheError, SqliteOwnerCacheRepository};
use crate::repo::queue_repo::{QueueError, SqliteSubmissionQueue, SubmissionQueue};
use crate::service::attendance_view::AttendanceView;
use crate::service::checkin_service::{build_submission, CheckInError, CheckInRequest};
use crate::service::owner_directory::{DirectorySource, OwnerDirectory, OwnerDirectoryError};
use crate::sync::engine::{FlushReport, FlushTrigger, RefreshStatus, SyncEngine, SyncError};
use crate::sync::gateway::{AttendanceGateway, GatewayError};
use crate::sync::schedule::SyncSchedule;
use log::{info, warn};
use rusqlite::Connection;
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SessionResult<T> = Result<T, SessionError>;

/// Asks the clerk for meeting metadata when a meeting is opened.
pub trait MeetingPrompt {
    fn request_meeting_details(
        &self,
        plan_id: &str,
        meeting_date: &str,
    ) -> PromptOutcome<MeetingDetails>;
}

#[derive(Debug)]
pub enum SessionError {
    Meeting(MeetingSelectionError),
    CheckIn(CheckInError),
    Queue(QueueError),
    OwnerCache(OwnerCacheError),
    Sync(SyncError),
    Gateway(GatewayError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Meeting(err) => write!(f, "{err}"),
            Self::CheckIn(err) => write!(f, "{err}"),
            Self::Queue(err) => write!(f, "{err}"),
            Self::OwnerCache(err) => write!(f, "{err}"),
            Self::Sync(err) => write!(f, "{err}"),
            Self::Gateway(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Meeting(err) => Some(err),
            Self::CheckIn(err) => Some(err),
            Self::Queue(err) => Some(err),
            Self::OwnerCache(err) => Some(err),
            Self::Sync(err) => Some(err),
            Self::Gateway(err) => Some(err),
        }
    }
}

impl From<MeetingSelectionError> for SessionError {
    fn from(value: MeetingSelectionError) -> Self {
        Self::Meeting(value)
    }
}

impl From<CheckInError> for SessionError {
    fn from(value: CheckInError) -> Self {
        Self::CheckIn(value)
    }
}

impl From<QueueError> for SessionError {
    fn from(value: QueueError) -> Self {
        Self::Queue(value)
    }
}

impl From<OwnerCacheError> for SessionError {
    fn from(value: OwnerCacheError) -> Self {
        Self::OwnerCache(value)
    }
}

impl From<SyncError> for SessionError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

/// Outcome of loading owners and confirmed attendance for a meeting.
#[derive(Debug)]
pub struct ReferenceDataReport {
    pub owners: Result<DirectorySource, OwnerDirectoryError>,
    pub attendance: RefreshStatus,
}

/// Active check-in session for one meeting.
pub struct CheckinSession<'conn, G: AttendanceGateway> {
    config: CheckinConfig,
    engine: SyncEngine<SqliteSubmissionQueue<'conn>, G>,
    owner_cache: SqliteOwnerCacheRepository<'conn>,
    directory: RefCell<Option<OwnerDirectory>>,
    schedule: SyncSchedule,
}

impl<'conn, G: AttendanceGateway> CheckinSession<'conn, G> {
    /// Prompts for meeting details, opens the session and loads its
    /// reference data.
    ///
    /// The report tells the host whether owners and confirmed attendance
    /// actually loaded. Returns `Ok(None)` when the clerk cancels the
    /// prompt; nothing is opened and no network call is made in that case.
    pub fn start<P: MeetingPrompt + ?Sized>(
        conn: &'conn Connection,
        gateway: G,
        prompt: &P,
        plan_id: &str,
        meeting_date: &str,
        config: CheckinConfig,
        now_ms: i64,
    ) -> SessionResult<Option<(Self, ReferenceDataReport)>> {
        let details = match prompt.request_meeting_details(plan_id, meeting_date) {
            PromptOutcome::Submitted(details) => details,
            PromptOutcome::Cancelled => {
                info!("event=meeting_open module=session status=cancelled");
                return Ok(None);
            }
        };

        let context = MeetingContext::for_date(plan_id, meeting_date, details)?;
        let session = Self::open(conn, gateway, context, config, now_ms)?;
        let report = session.load_reference_data(now_ms);
        Ok(Some((session, report)))
    }

    /// Opens a session for an already resolved meeting and arms the schedule.
    ///
    /// # Errors
    /// - Storage tables are missing from `conn`.
    pub fn open(
        conn: &'conn Connection,
        gateway: G,
        context: MeetingContext,
        config: CheckinConfig,
        now_ms: i64,
    ) -> SessionResult<Self> {
        let config = config.normalize();
        let queue = SqliteSubmissionQueue::try_new(conn)?;
        let owner_cache = SqliteOwnerCacheRepository::try_new(conn)?;
        let schedule = SyncSchedule::new(config.sync_interval_ms);
        schedule.start(now_ms);

        info!(
            "event=meeting_open module=session status=ok meeting_type={} quorum_total={} sync_interval_ms={}",
            context.meeting_type().label(),
            context.quorum_total(),
            config.sync_interval_ms
        );

        Ok(Self {
            config,
            engine: SyncEngine::new(queue, gateway, context),
            owner_cache,
            directory: RefCell::new(None),
            schedule,
        })
    }

    pub fn context(&self) -> &MeetingContext {
        self.engine.context()
    }

    pub fn config(&self) -> &CheckinConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        self.engine.gateway()
    }

    pub fn engine(&self) -> &SyncEngine<SqliteSubmissionQueue<'conn>, G> {
        &self.engine
    }

    /// Loads the owners directory and confirmed attendance.
    ///
    /// Failures are reported, not raised: the session stays usable with
    /// whatever was loaded before.
    pub fn load_reference_data(&self, now_ms: i64) -> ReferenceDataReport {
        let owners = OwnerDirectory::load(
            self.engine.gateway(),
            &self.owner_cache,
            self.context().plan_id(),
            now_ms,
            self.config.owner_cache_ttl_ms,
        )
        .map(|directory| {
            let source = directory.source();
            *self.directory.borrow_mut() = Some(directory);
            source
        });
        if let Err(err) = &owners {
            warn!(
                "event=reference_data_load module=session status=degraded part=owners error={}",
                err
            );
        }

        ReferenceDataReport {
            owners,
            attendance: self.engine.refresh(),
        }
    }

    /// Identity choices for `lot`; `Unknown` until the directory is loaded.
    pub fn owner_identity(&self, lot: LotNumber) -> OwnerIdentity {
        self.directory
            .borrow()
            .as_ref()
            .map(|directory| directory.identity(lot))
            .unwrap_or(OwnerIdentity::Unknown)
    }

    pub fn unit_number(&self, lot: LotNumber) -> Option<String> {
        self.directory
            .borrow()
            .as_ref()
            .and_then(|directory| directory.unit_number(lot).map(str::to_string))
    }

    /// Queues a check-in for the active meeting. Never touches the network.
    pub fn check_in(&self, request: &CheckInRequest) -> SessionResult<Submission> {
        let submission = build_submission(self.context(), request)?;
        let queued = self.engine.queue().enqueue(submission)?;
        info!(
            "event=check_in module=session status=queued is_proxy={} is_financial={}",
            queued.is_proxy, queued.is_financial
        );
        Ok(queued)
    }

    /// Removes a queued check-in locally. Returns `false` if it already left
    /// the queue.
    pub fn delete_pending(&self, id: SubmissionId) -> SessionResult<bool> {
        Ok(self.engine.queue().remove_by_id(id)?)
    }

    /// Deletes a confirmed record remotely, then pulls confirmed state again.
    ///
    /// # Errors
    /// - `Gateway` when the delete request fails; the snapshot is untouched.
    pub fn delete_confirmed(&self, record_id: &str) -> SessionResult<RefreshStatus> {
        self.engine
            .gateway()
            .delete_attendance(record_id)
            .map_err(SessionError::Gateway)?;
        info!("event=attendance_delete module=session status=ok");
        Ok(self.engine.refresh())
    }

    /// Current screen snapshot.
    pub fn view(&self) -> SessionResult<AttendanceView> {
        let pending = self.engine.queue().peek_all(&self.engine.scope())?;
        let merged = self.engine.reconciler().merged_view(&pending);
        let indicator = self.engine.indicator()?;
        Ok(AttendanceView::build(
            merged,
            self.context(),
            &self.config.quorum,
            self.directory.borrow().as_ref(),
            indicator,
        ))
    }

    /// Flushes now, on the clerk's request.
    pub fn sync_now(&self) -> SessionResult<FlushReport> {
        Ok(self.engine.flush(FlushTrigger::Manual)?)
    }

    /// Runs a scheduled flush when one is due at `now_ms`.
    pub fn tick(&self, now_ms: i64) -> SessionResult<Option<FlushReport>> {
        if !self.schedule.poll(now_ms) {
            return Ok(None);
        }
        Ok(Some(self.engine.flush(FlushTrigger::Scheduled)?))
    }

    pub fn is_scheduled(&self) -> bool {
        self.schedule.is_active()
    }

    pub fn next_sync_due_at_ms(&self) -> Option<i64> {
        self.schedule.next_due_at_ms()
    }

    /// Closes the session and cancels scheduled flushes.
    pub fn end(self) {
        self.schedule.stop();
        info!("event=meeting_close module=session status=ok");
    }
}

#[cfg(test)]
mod tests {
    use super::{CheckinSession, MeetingPrompt};
    use crate::config::CheckinConfig;
    use crate::db::open_db_in_memory;
    use crate::model::meeting::{MeetingDetails, MeetingType, PromptOutcome};
    use crate::service::owner_directory::{DirectorySource, OwnerDirectoryError};
    use crate::sync::engine::RefreshStatus;
    use crate::sync::memory_store::InMemoryAttendanceStore;

    struct FixedPrompt(Option<MeetingDetails>);

    impl MeetingPrompt for FixedPrompt {
        fn request_meeting_details(
            &self,
            _plan_id: &str,
            _meeting_date: &str,
        ) -> PromptOutcome<MeetingDetails> {
            match &self.0 {
                Some(details) => PromptOutcome::Submitted(details.clone()),
                None => PromptOutcome::Cancelled,
            }
        }
    }

    #[test]
    fn cancelled_prompt_opens_nothing() {
        let conn = open_db_in_memory().unwrap();
        let store = InMemoryAttendanceStore::new();
        let session = CheckinSession::start(
            &conn,
            &store,
            &FixedPrompt(None),
            "SP1",
            "2026-10-19",
            CheckinConfig::default(),
            0,
        )
        .unwrap();

        assert!(session.is_none());
        assert_eq!(store.fetch_attendance_calls(), 0);
        assert_eq!(store.fetch_owner_calls(), 0);
    }

    #[test]
    fn submitted_prompt_opens_meeting_and_loads_reference_data() {
        let conn = open_db_in_memory().unwrap();
        let store = InMemoryAttendanceStore::new();
        let prompt = FixedPrompt(Some(MeetingDetails {
            meeting_type: MeetingType::Egm,
            quorum_total: 12,
        }));

        let (session, report) = CheckinSession::start(
            &conn,
            &store,
            &prompt,
            "SP1",
            "2026-10-19",
            CheckinConfig::default(),
            0,
        )
        .unwrap()
        .unwrap();

        assert!(matches!(report.owners, Ok(DirectorySource::Remote)));
        assert_eq!(report.attendance, RefreshStatus::Refreshed { confirmed: 0 });
        assert_eq!(session.context().meeting_id(), "SP1:2026-10-19");
        assert_eq!(session.context().quorum_total(), 12);
        assert_eq!(store.fetch_attendance_calls(), 1);
        assert_eq!(store.fetch_owner_calls(), 1);
        assert!(session.is_scheduled());
        assert_eq!(session.next_sync_due_at_ms(), Some(60_000));
    }

    #[test]
    fn blank_other_meeting_type_is_rejected() {
        let conn = open_db_in_memory().unwrap();
        let store = InMemoryAttendanceStore::new();
        let prompt = FixedPrompt(Some(MeetingDetails {
            meeting_type: MeetingType::Other("  ".to_string()),
            quorum_total: 12,
        }));

        let err = CheckinSession::start(
            &conn,
            &store,
            &prompt,
            "SP1",
            "2026-10-19",
            CheckinConfig::default(),
            0,
        )
        .err()
        .unwrap();
        assert_eq!(err.to_string(), "Please specify a meeting type.");
    }

    #[test]
    fn offline_start_reports_missing_reference_data() {
        let conn = open_db_in_memory().unwrap();
        let store = InMemoryAttendanceStore::new();
        store.set_online(false);
        let prompt = FixedPrompt(Some(MeetingDetails {
            meeting_type: MeetingType::Agm,
            quorum_total: 12,
        }));

        let (session, report) = CheckinSession::start(
            &conn,
            &store,
            &prompt,
            "SP1",
            "2026-10-19",
            CheckinConfig::default(),
            0,
        )
        .unwrap()
        .unwrap();

        assert!(matches!(
            report.owners,
            Err(OwnerDirectoryError::Unavailable(_))
        ));
        assert!(matches!(report.attendance, RefreshStatus::Stale { .. }));
        assert!(session.is_scheduled());
    }
}
