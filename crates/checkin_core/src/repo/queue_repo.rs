//! Durable submission queue contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist pending check-ins so they survive restarts and network loss.
//! - Provide the batch isolation primitives (`drain` / `requeue`) used by sync.
//!
//! # Invariants
//! - The `submission_queue` table is the only source of truth; nothing is
//!   cached between calls.
//! - Every mutating call runs in one immediate transaction, so `drain` can
//!   never observe half of an `enqueue`.
//! - Queue order is `queue_position ASC`; `requeue` places items before every
//!   existing entry while keeping their relative order.

use crate::db::DbError;
use crate::model::submission::{
    LotNumber, NewSubmission, Submission, SubmissionId, SubmissionValidationError,
};
use log::{debug, error, info};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const QUEUE_SELECT_SQL: &str = "SELECT
    submission_id,
    plan_id,
    meeting_id,
    lot,
    owner_name,
    rep_name,
    is_financial,
    is_proxy,
    enqueued_at
FROM submission_queue
WHERE (?1 IS NULL OR plan_id = ?1)
  AND (?2 IS NULL OR meeting_id = ?2)
ORDER BY queue_position ASC";

pub type QueueResult<T> = Result<T, QueueError>;

/// Errors from submission queue operations.
#[derive(Debug)]
pub enum QueueError {
    Validation(SubmissionValidationError),
    Db(DbError),
    /// A caller-supplied id is already queued.
    DuplicateId(SubmissionId),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for QueueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateId(id) => write!(f, "submission already queued: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted submission data: {message}")
            }
            Self::MissingRequiredTable(table) => {
                write!(f, "queue storage is not ready: missing table `{table}`")
            }
        }
    }
}

impl Error for QueueError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::DuplicateId(_) | Self::InvalidData(_) | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<SubmissionValidationError> for QueueError {
    fn from(value: SubmissionValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for QueueError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for QueueError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Plan/meeting scope filter for queue reads and drains.
///
/// `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueFilter {
    pub plan_id: Option<String>,
    pub meeting_id: Option<String>,
}

impl QueueFilter {
    /// Matches every queued entry.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches entries for one meeting of one plan.
    pub fn meeting(plan_id: impl Into<String>, meeting_id: impl Into<String>) -> Self {
        Self {
            plan_id: Some(plan_id.into()),
            meeting_id: Some(meeting_id.into()),
        }
    }
}

/// Durable FIFO of check-ins not yet confirmed by the server.
pub trait SubmissionQueue {
    /// Validates, assigns an id if absent, and persists before returning.
    fn enqueue(&self, submission: NewSubmission) -> QueueResult<Submission>;
    /// Returns matching entries in queue order without mutating the queue.
    fn peek_all(&self, filter: &QueueFilter) -> QueueResult<Vec<Submission>>;
    /// Deletes one entry. Returns `false` when the id was not queued.
    fn remove_by_id(&self, id: SubmissionId) -> QueueResult<bool>;
    /// Atomically returns and removes every matching entry.
    fn drain(&self, filter: &QueueFilter) -> QueueResult<Vec<Submission>>;
    /// Puts items back at the front of the queue in their given order.
    ///
    /// An item whose id is queued again already is skipped and keeps its
    /// current position, so it no longer sits next to the rest of the batch.
    fn requeue(&self, items: &[Submission]) -> QueueResult<()>;
    /// Counts matching entries.
    fn len(&self, filter: &QueueFilter) -> QueueResult<usize>;

    fn is_empty(&self, filter: &QueueFilter) -> QueueResult<bool> {
        Ok(self.len(filter)? == 0)
    }
}

impl<Q: SubmissionQueue + ?Sized> SubmissionQueue for &Q {
    fn enqueue(&self, submission: NewSubmission) -> QueueResult<Submission> {
        (**self).enqueue(submission)
    }

    fn peek_all(&self, filter: &QueueFilter) -> QueueResult<Vec<Submission>> {
        (**self).peek_all(filter)
    }

    fn remove_by_id(&self, id: SubmissionId) -> QueueResult<bool> {
        (**self).remove_by_id(id)
    }

    fn drain(&self, filter: &QueueFilter) -> QueueResult<Vec<Submission>> {
        (**self).drain(filter)
    }

    fn requeue(&self, items: &[Submission]) -> QueueResult<()> {
        (**self).requeue(items)
    }

    fn len(&self, filter: &QueueFilter) -> QueueResult<usize> {
        (**self).len(filter)
    }
}

/// SQLite-backed submission queue.
///
/// Several instances may share one connection; they all observe the same
/// persisted queue.
pub struct SqliteSubmissionQueue<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSubmissionQueue<'conn> {
    /// Constructs a queue over a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> QueueResult<Self> {
        ensure_queue_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn begin(&self) -> QueueResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl SubmissionQueue for SqliteSubmissionQueue<'_> {
    fn enqueue(&self, submission: NewSubmission) -> QueueResult<Submission> {
        submission.validate()?;

        let id = submission.id.unwrap_or_else(Uuid::new_v4);
        let queued = submission.into_submission(id, now_epoch_ms());

        let tx = self.begin()?;
        if submission_exists(&tx, id)? {
            return Err(QueueError::DuplicateId(id));
        }
        let position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(queue_position), 0) + 1 FROM submission_queue;",
            [],
            |row| row.get(0),
        )?;
        insert_submission(&tx, &queued, position)?;
        if let Err(err) = tx.commit() {
            error!(
                "event=queue_enqueue module=queue status=error submission_id={} error={}",
                id, err
            );
            return Err(err.into());
        }

        info!(
            "event=queue_enqueue module=queue status=ok submission_id={} lot={} position={}",
            id, queued.lot, position
        );
        Ok(queued)
    }

    fn peek_all(&self, filter: &QueueFilter) -> QueueResult<Vec<Submission>> {
        select_matching(self.conn, filter)
    }

    fn remove_by_id(&self, id: SubmissionId) -> QueueResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM submission_queue WHERE submission_id = ?1;",
            [id.to_string()],
        )?;
        debug!(
            "event=queue_remove module=queue status=ok submission_id={} removed={}",
            id,
            changed > 0
        );
        Ok(changed > 0)
    }

    fn drain(&self, filter: &QueueFilter) -> QueueResult<Vec<Submission>> {
        let tx = self.begin()?;
        let batch = select_matching(&tx, filter)?;
        for submission in &batch {
            tx.execute(
                "DELETE FROM submission_queue WHERE submission_id = ?1;",
                [submission.id.to_string()],
            )?;
        }
        tx.commit()?;

        info!(
            "event=queue_drain module=queue status=ok batch_size={}",
            batch.len()
        );
        Ok(batch)
    }

    fn requeue(&self, items: &[Submission]) -> QueueResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let tx = self.begin()?;
        let front: i64 = tx.query_row(
            "SELECT COALESCE(MIN(queue_position), 1) FROM submission_queue;",
            [],
            |row| row.get(0),
        )?;
        let start = front - items.len() as i64;
        let mut restored = 0_usize;
        for (offset, submission) in items.iter().enumerate() {
            // Entries still queued under the same id stay where they are.
            if submission_exists(&tx, submission.id)? {
                continue;
            }
            insert_submission(&tx, submission, start + offset as i64)?;
            restored += 1;
        }
        tx.commit()?;

        info!(
            "event=queue_requeue module=queue status=ok batch_size={} restored={}",
            items.len(),
            restored
        );
        Ok(())
    }

    fn len(&self, filter: &QueueFilter) -> QueueResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM submission_queue
             WHERE (?1 IS NULL OR plan_id = ?1)
               AND (?2 IS NULL OR meeting_id = ?2);",
            params![filter.plan_id.as_deref(), filter.meeting_id.as_deref()],
            |row| row.get(0),
        )?;
        usize::try_from(count)
            .map_err(|_| QueueError::InvalidData(format!("negative queue count {count}")))
    }
}

fn select_matching(conn: &Connection, filter: &QueueFilter) -> QueueResult<Vec<Submission>> {
    let mut stmt = conn.prepare(&format!("{QUEUE_SELECT_SQL};"))?;
    let mut rows = stmt.query(params![
        filter.plan_id.as_deref(),
        filter.meeting_id.as_deref()
    ])?;
    let mut submissions = Vec::new();
    while let Some(row) = rows.next()? {
        submissions.push(parse_submission_row(row)?);
    }
    Ok(submissions)
}

fn insert_submission(tx: &Transaction<'_>, submission: &Submission, position: i64) -> QueueResult<()> {
    tx.execute(
        "INSERT INTO submission_queue (
            submission_id,
            queue_position,
            plan_id,
            meeting_id,
            lot,
            owner_name,
            rep_name,
            is_financial,
            is_proxy,
            enqueued_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            submission.id.to_string(),
            position,
            submission.plan_id.as_str(),
            submission.meeting_id.as_str(),
            i64::from(submission.lot),
            submission.owner_name.as_str(),
            submission.rep_name.as_str(),
            bool_to_int(submission.is_financial),
            bool_to_int(submission.is_proxy),
            submission.enqueued_at,
        ],
    )?;
    Ok(())
}

fn submission_exists(tx: &Transaction<'_>, id: SubmissionId) -> QueueResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM submission_queue WHERE submission_id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_submission_row(row: &Row<'_>) -> QueueResult<Submission> {
    let id_text: String = row.get("submission_id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        QueueError::InvalidData(format!(
            "invalid uuid value `{id_text}` in submission_queue.submission_id"
        ))
    })?;

    let lot_value: i64 = row.get("lot")?;
    let lot = LotNumber::try_from(lot_value).map_err(|_| {
        QueueError::InvalidData(format!("invalid lot `{lot_value}` in submission_queue.lot"))
    })?;

    let submission = Submission {
        id,
        plan_id: row.get("plan_id")?,
        meeting_id: row.get("meeting_id")?,
        lot,
        owner_name: row.get("owner_name")?,
        rep_name: row.get("rep_name")?,
        is_financial: int_to_bool(row.get("is_financial")?, "is_financial")?,
        is_proxy: int_to_bool(row.get("is_proxy")?, "is_proxy")?,
        enqueued_at: row.get("enqueued_at")?,
    };
    submission.validate()?;
    Ok(submission)
}

fn ensure_queue_connection_ready(conn: &Connection) -> QueueResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'submission_queue'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(QueueError::MissingRequiredTable("submission_queue"));
    }
    Ok(())
}

fn int_to_bool(value: i64, column: &str) -> QueueResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(QueueError::InvalidData(format!(
            "invalid {column} value `{other}` in submission_queue.{column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// Current Unix time in milliseconds; 0 if the clock is before the epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
