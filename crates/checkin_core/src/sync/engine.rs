//! Queue flush orchestration.
//!
//! # Responsibility
//! - Drain the active meeting's queued check-ins into an isolated batch and
//!   submit it in one gateway request.
//! - Return the batch to the front of the queue on any failure.
//! - Refresh the confirmed snapshot after a successful submit.
//!
//! # Invariants
//! - At most one flush is in `Flushing`; overlapping requests are dropped.
//! - Items enqueued while a batch is in flight are never part of that batch.
//! - A submission leaves the device only through an accepted batch or an
//!   explicit delete; every failure path requeues the batch.
//! - A failed refresh after an accepted batch never rolls the batch back.

use crate::model::meeting::MeetingContext;
use crate::model::submission::Submission;
use crate::repo::queue_repo::{QueueError, QueueFilter, SubmissionQueue};
use crate::sync::gateway::{AttendanceGateway, GatewayError};
use crate::sync::reconciler::AttendanceReconciler;
use log::{error, info, warn};
use std::cell::Cell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

pub type SyncResult<T> = Result<T, SyncError>;

/// Flush state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Flushing,
}

/// What started a flush; only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Scheduled,
    Manual,
}

impl FlushTrigger {
    fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another flush is in progress.
    AlreadyFlushing,
    /// Nothing queued for the active meeting.
    EmptyQueue,
}

/// Result of the post-submit confirmed-state pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshStatus {
    Refreshed { confirmed: usize },
    /// The view keeps the previous snapshot until a later fetch succeeds.
    Stale { error: GatewayError },
}

/// Why a submitted batch was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushFailure {
    /// Network or transport error.
    Transport(GatewayError),
    /// The server answered but did not apply the batch.
    Rejected(String),
    /// The gateway panicked mid-request.
    Panicked(String),
}

impl Display for FlushFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "{}", err.message),
            Self::Rejected(message) => write!(f, "{message}"),
            Self::Panicked(message) => write!(f, "unexpected gateway failure: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Skipped(SkipReason),
    Synced {
        submitted: usize,
        refresh: RefreshStatus,
    },
    Failed {
        requeued: usize,
        failure: FlushFailure,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient user-facing message (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Everything a caller needs to redraw after a flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub outcome: FlushOutcome,
    /// Queue length for the active meeting after the flush settled.
    pub queue_len: usize,
    pub notice: Option<Notice>,
}

/// Sync-status indicator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncIndicator {
    pub state: SyncState,
    pub queue_len: usize,
    pub label: String,
}

/// Failures that prevented a flush from settling.
#[derive(Debug)]
pub enum SyncError {
    Queue(QueueError),
    /// The batch could not be put back; it is handed to the caller so it is
    /// not lost.
    RequeueFailed {
        batch: Vec<Submission>,
        source: QueueError,
    },
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queue(err) => write!(f, "{err}"),
            Self::RequeueFailed { batch, source } => write!(
                f,
                "failed to requeue {} submission(s) after sync failure: {source}",
                batch.len()
            ),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Queue(err) => Some(err),
            Self::RequeueFailed { source, .. } => Some(source),
        }
    }
}

impl From<QueueError> for SyncError {
    fn from(value: QueueError) -> Self {
        Self::Queue(value)
    }
}

/// Flushes one meeting's queued check-ins to the attendance store.
pub struct SyncEngine<Q: SubmissionQueue, G: AttendanceGateway> {
    queue: Q,
    gateway: G,
    context: MeetingContext,
    reconciler: AttendanceReconciler,
    state: Cell<SyncState>,
}

impl<Q: SubmissionQueue, G: AttendanceGateway> SyncEngine<Q, G> {
    pub fn new(queue: Q, gateway: G, context: MeetingContext) -> Self {
        Self {
            queue,
            gateway,
            context,
            reconciler: AttendanceReconciler::new(),
            state: Cell::new(SyncState::Idle),
        }
    }

    pub fn context(&self) -> &MeetingContext {
        &self.context
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn reconciler(&self) -> &AttendanceReconciler {
        &self.reconciler
    }

    pub fn state(&self) -> SyncState {
        self.state.get()
    }

    /// Queue filter for the active meeting.
    pub fn scope(&self) -> QueueFilter {
        QueueFilter::meeting(self.context.plan_id(), self.context.meeting_id())
    }

    /// Pulls confirmed attendance for the active meeting.
    pub fn refresh(&self) -> RefreshStatus {
        match self.reconciler.refresh_confirmed(
            &self.gateway,
            self.context.plan_id(),
            self.context.meeting_date(),
        ) {
            Ok(records) => RefreshStatus::Refreshed {
                confirmed: records.len(),
            },
            Err(error) => RefreshStatus::Stale { error },
        }
    }

    /// Current indicator state for the active meeting.
    pub fn indicator(&self) -> SyncResult<SyncIndicator> {
        let queue_len = self.queue.len(&self.scope())?;
        let state = self.state.get();
        Ok(SyncIndicator {
            state,
            queue_len,
            label: indicator_label(state, queue_len),
        })
    }

    /// Runs one flush of the active meeting's queue.
    ///
    /// # Errors
    /// - Queue storage failures while checking or draining the queue.
    /// - `SyncError::RequeueFailed` when a failed batch could not be put back.
    ///
    /// Gateway failures are not errors; they yield `FlushOutcome::Failed`.
    pub fn flush(&self, trigger: FlushTrigger) -> SyncResult<FlushReport> {
        let scope = self.scope();
        let Some(_flight) = FlightGuard::try_begin(&self.state) else {
            info!(
                "event=sync_flush module=sync status=skipped trigger={} reason=already_flushing",
                trigger.as_str()
            );
            return Ok(FlushReport {
                outcome: FlushOutcome::Skipped(SkipReason::AlreadyFlushing),
                queue_len: self.queue.len(&scope)?,
                notice: None,
            });
        };

        if self.queue.is_empty(&scope)? {
            return Ok(FlushReport {
                outcome: FlushOutcome::Skipped(SkipReason::EmptyQueue),
                queue_len: 0,
                notice: None,
            });
        }

        let started_at = Instant::now();
        let batch = self.queue.drain(&scope)?;
        info!(
            "event=sync_flush module=sync status=start trigger={} meeting_id={} batch_size={}",
            trigger.as_str(),
            self.context.meeting_id(),
            batch.len()
        );

        let submitted = catch_unwind(AssertUnwindSafe(|| {
            self.gateway
                .submit_attendance_batch(self.context.meeting_id(), &batch)
        }));
        let failure = match submitted {
            Ok(Ok(ack)) if ack.success => None,
            Ok(Ok(ack)) => Some(FlushFailure::Rejected(
                ack.error
                    .unwrap_or_else(|| "server did not accept the batch".to_string()),
            )),
            Ok(Err(err)) => Some(FlushFailure::Transport(err)),
            Err(payload) => Some(FlushFailure::Panicked(panic_message(payload.as_ref()))),
        };

        let outcome = match failure {
            None => {
                let refresh = self.refresh();
                info!(
                    "event=sync_flush module=sync status=ok trigger={} batch_size={} refreshed={} duration_ms={}",
                    trigger.as_str(),
                    batch.len(),
                    matches!(refresh, RefreshStatus::Refreshed { .. }),
                    started_at.elapsed().as_millis()
                );
                FlushOutcome::Synced {
                    submitted: batch.len(),
                    refresh,
                }
            }
            Some(failure) => {
                let requeued = batch.len();
                if let Err(source) = self.queue.requeue(&batch) {
                    error!(
                        "event=sync_requeue module=sync status=error batch_size={} error={}",
                        requeued, source
                    );
                    return Err(SyncError::RequeueFailed { batch, source });
                }
                warn!(
                    "event=sync_flush module=sync status=error trigger={} batch_size={} duration_ms={} error_code={}",
                    trigger.as_str(),
                    requeued,
                    started_at.elapsed().as_millis(),
                    failure_code(&failure)
                );
                FlushOutcome::Failed { requeued, failure }
            }
        };

        let notice = notice_for(&outcome);
        Ok(FlushReport {
            outcome,
            queue_len: self.queue.len(&scope)?,
            notice,
        })
    }
}

/// Holds the engine in `Flushing` and returns it to `Idle` when dropped.
struct FlightGuard<'a> {
    state: &'a Cell<SyncState>,
}

impl<'a> FlightGuard<'a> {
    fn try_begin(state: &'a Cell<SyncState>) -> Option<Self> {
        if state.get() == SyncState::Flushing {
            return None;
        }
        state.set(SyncState::Flushing);
        Some(Self { state })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.state.set(SyncState::Idle);
    }
}

/// Sync button caption for a state and queue length.
pub fn indicator_label(state: SyncState, queue_len: usize) -> String {
    match (state, queue_len) {
        (_, 0) => "Synced".to_string(),
        (SyncState::Flushing, _) => "Syncing...".to_string(),
        (SyncState::Idle, 1) => "Sync 1 Item".to_string(),
        (SyncState::Idle, count) => format!("Sync {count} Items"),
    }
}

fn notice_for(outcome: &FlushOutcome) -> Option<Notice> {
    match outcome {
        FlushOutcome::Skipped(_) => None,
        FlushOutcome::Synced { submitted, .. } => Some(Notice {
            level: NoticeLevel::Success,
            message: format!("Synced {submitted} item(s)."),
        }),
        FlushOutcome::Failed { requeued, failure } => Some(Notice {
            level: NoticeLevel::Error,
            message: format!("Sync failed: {failure}. {requeued} item(s) kept for retry."),
        }),
    }
}

fn failure_code(failure: &FlushFailure) -> &str {
    match failure {
        FlushFailure::Transport(err) => err.code.as_str(),
        FlushFailure::Rejected(_) => "batch_rejected",
        FlushFailure::Panicked(_) => "gateway_panicked",
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
