//! FFI use-case API for the Flutter check-in screen.
//!
//! # Responsibility
//! - Expose queue, classification and quorum calls to Dart via FRB.
//! - Flatten core results into plain response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Failures are reported through `ok=false` + `message`, never by throwing.
//! - Queue calls open the device store per call; no connection outlives a call.

use checkin_core::identity::owner_classifier::classify_contact;
use checkin_core::sync::engine::{indicator_label, SyncState};
use checkin_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, open_db,
    ping as ping_inner, NewSubmission, OwnerContactInfo, OwnerIdentity, QueueFilter,
    QuorumPolicy, SqliteSubmissionQueue, Submission, SubmissionQueue,
};
use log::warn;
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

const QUEUE_DB_FILE_NAME: &str = "checkin_queue.sqlite3";
static QUEUE_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Health-check call for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Core crate version.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Starts core file logging once per process.
///
/// # FFI contract
/// - Sync call; may create `log_dir`.
/// - Idempotent for the same `level + log_dir`.
/// - Returns an empty string on success and the error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Identity choices for one owners-directory row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerIdentityResponse {
    /// `company`, `individuals` or `unknown`.
    pub kind: String,
    /// Company name, or individual owner names sorted ascending.
    pub names: Vec<String>,
}

/// Classifies raw owner contact strings.
#[flutter_rust_bridge::frb(sync)]
pub fn classify_owner(
    main_contact: Option<String>,
    title_name: Option<String>,
) -> OwnerIdentityResponse {
    let contact = OwnerContactInfo {
        main_contact_raw: main_contact,
        title_name_raw: title_name,
        unit_number: None,
    };
    match classify_contact(&contact) {
        OwnerIdentity::Company { name } => OwnerIdentityResponse {
            kind: "company".to_string(),
            names: vec![name],
        },
        OwnerIdentity::Individuals { names } => OwnerIdentityResponse {
            kind: "individuals".to_string(),
            names: names.into_iter().collect(),
        },
        OwnerIdentity::Unknown => OwnerIdentityResponse {
            kind: "unknown".to_string(),
            names: Vec::new(),
        },
    }
}

/// Quorum badge values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuorumResponse {
    pub percentage: u8,
    pub threshold: i64,
    pub threshold_met: bool,
}

/// Computes quorum; `threshold_percent` defaults to the 25% policy.
#[flutter_rust_bridge::frb(sync)]
pub fn compute_quorum(attended: i64, total: i64, threshold_percent: Option<u8>) -> QuorumResponse {
    let policy = match threshold_percent {
        Some(value) if (1..=100).contains(&value) => QuorumPolicy {
            threshold_percent: value,
        },
        _ => QuorumPolicy::default(),
    };
    let status = policy.compute(attended, total);
    QuorumResponse {
        percentage: status.percentage,
        threshold: status.threshold,
        threshold_met: status.threshold_met,
    }
}

/// Queued check-in as shown to Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub submission_id: String,
    pub lot: u32,
    pub owner_name: String,
    pub rep_name: String,
    pub is_financial: bool,
    pub is_proxy: bool,
    pub enqueued_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueActionResponse {
    pub ok: bool,
    pub submission_id: Option<String>,
    pub message: String,
}

impl QueueActionResponse {
    fn success(message: impl Into<String>, submission_id: Option<String>) -> Self {
        Self {
            ok: true,
            submission_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            submission_id: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueListResponse {
    pub ok: bool,
    /// Items in queue (submission) order.
    pub items: Vec<QueueItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueCountResponse {
    pub ok: bool,
    pub count: u32,
    /// Sync button caption, e.g. `Sync 2 Items`.
    pub label: String,
    pub message: String,
}

/// Adds a check-in to the device queue.
///
/// # FFI contract
/// - Sync call, DB-backed; never touches the network.
/// - Returns the generated submission id on success.
#[flutter_rust_bridge::frb(sync)]
#[allow(clippy::too_many_arguments)]
pub fn queue_enqueue(
    plan_id: String,
    meeting_id: String,
    lot: u32,
    owner_name: String,
    rep_name: Option<String>,
    is_financial: bool,
    is_proxy: bool,
) -> QueueActionResponse {
    let mut submission = NewSubmission::new(
        plan_id.trim(),
        meeting_id.trim(),
        lot,
        owner_name.trim(),
    );
    if let Some(rep_name) = rep_name.map(|value| value.trim().to_string()) {
        if !rep_name.is_empty() {
            submission.rep_name = rep_name;
        }
    }
    submission.is_financial = is_financial;
    submission.is_proxy = is_proxy;

    match with_queue(|queue| queue.enqueue(submission).map_err(|err| err.to_string())) {
        Ok(queued) => QueueActionResponse::success("Check-in queued.", Some(queued.id.to_string())),
        Err(err) => QueueActionResponse::failure(format!("queue_enqueue failed: {err}")),
    }
}

/// Lists queued check-ins for one meeting.
#[flutter_rust_bridge::frb(sync)]
pub fn queue_list(plan_id: String, meeting_id: String) -> QueueListResponse {
    let filter = QueueFilter::meeting(plan_id.trim(), meeting_id.trim());
    match with_queue(|queue| queue.peek_all(&filter).map_err(|err| err.to_string())) {
        Ok(items) => {
            let message = if items.is_empty() {
                "Queue is empty.".to_string()
            } else {
                format!("{} item(s) queued.", items.len())
            };
            QueueListResponse {
                ok: true,
                items: items.into_iter().map(to_queue_item).collect(),
                message,
            }
        }
        Err(err) => QueueListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("queue_list failed: {err}"),
        },
    }
}

/// Removes a queued check-in by id. Unknown ids succeed with a message.
#[flutter_rust_bridge::frb(sync)]
pub fn queue_delete(submission_id: String) -> QueueActionResponse {
    let id = match Uuid::parse_str(submission_id.trim()) {
        Ok(id) => id,
        Err(err) => {
            return QueueActionResponse::failure(format!(
                "queue_delete failed: invalid submission id: {err}"
            ))
        }
    };
    match with_queue(|queue| queue.remove_by_id(id).map_err(|err| err.to_string())) {
        Ok(true) => QueueActionResponse::success("Check-in removed.", Some(id.to_string())),
        Ok(false) => QueueActionResponse::success("Check-in was no longer queued.", None),
        Err(err) => QueueActionResponse::failure(format!("queue_delete failed: {err}")),
    }
}

/// Queue length and sync caption for one meeting.
#[flutter_rust_bridge::frb(sync)]
pub fn queue_count(plan_id: String, meeting_id: String) -> QueueCountResponse {
    let filter = QueueFilter::meeting(plan_id.trim(), meeting_id.trim());
    match with_queue(|queue| queue.len(&filter).map_err(|err| err.to_string())) {
        Ok(count) => QueueCountResponse {
            ok: true,
            count: u32::try_from(count).unwrap_or(u32::MAX),
            label: indicator_label(SyncState::Idle, count),
            message: String::new(),
        },
        Err(err) => QueueCountResponse {
            ok: false,
            count: 0,
            label: indicator_label(SyncState::Idle, 0),
            message: format!("queue_count failed: {err}"),
        },
    }
}

fn resolve_queue_db_path() -> PathBuf {
    QUEUE_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("CHECKIN_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(QUEUE_DB_FILE_NAME)
        })
        .clone()
}

fn with_queue<T>(
    f: impl FnOnce(&SqliteSubmissionQueue<'_>) -> Result<T, String>,
) -> Result<T, String> {
    let conn = open_db(resolve_queue_db_path()).map_err(|err| {
        warn!("event=ffi_queue_open module=ffi status=error error={err}");
        format!("queue DB open failed: {err}")
    })?;
    let queue = SqliteSubmissionQueue::try_new(&conn)
        .map_err(|err| format!("queue init failed: {err}"))?;
    f(&queue)
}

fn to_queue_item(submission: Submission) -> QueueItem {
    QueueItem {
        submission_id: submission.id.to_string(),
        lot: submission.lot,
        owner_name: submission.owner_name,
        rep_name: submission.rep_name,
        is_financial: submission.is_financial,
        is_proxy: submission.is_proxy,
        enqueued_at: submission.enqueued_at,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        classify_owner, compute_quorum, core_version, init_logging, ping, queue_count,
        queue_delete, queue_enqueue, queue_list, resolve_queue_db_path,
    };
    use checkin_core::open_db;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn classify_owner_reports_company_and_individuals() {
        let company = classify_owner(Some("Harbour Investments".to_string()), None);
        assert_eq!(company.kind, "company");
        assert_eq!(company.names, vec!["Harbour Investments".to_string()]);

        let people = classify_owner(
            Some("Mr J S Smith".to_string()),
            Some("John Smith & Jane Smith".to_string()),
        );
        assert_eq!(people.kind, "individuals");
        assert_eq!(
            people.names,
            vec!["Jane Smith".to_string(), "John Smith".to_string()]
        );
    }

    #[test]
    fn compute_quorum_falls_back_to_default_policy() {
        let response = compute_quorum(3, 10, None);
        assert_eq!(response.percentage, 30);
        assert_eq!(response.threshold, 3);
        assert!(response.threshold_met);

        let invalid = compute_quorum(3, 10, Some(0));
        assert_eq!(invalid.threshold, 3);

        let strict = compute_quorum(3, 10, Some(50));
        assert!(!strict.threshold_met);
    }

    #[test]
    fn queue_round_trip_through_device_store() {
        let meeting = unique_token("ffi-queue");
        let first = queue_enqueue(
            "SP1".to_string(),
            meeting.clone(),
            4,
            "Jane Doe".to_string(),
            None,
            true,
            false,
        );
        assert!(first.ok, "{}", first.message);
        let second = queue_enqueue(
            "SP1".to_string(),
            meeting.clone(),
            2,
            "Sam Rep".to_string(),
            Some("ACME PTY LTD".to_string()),
            false,
            false,
        );
        assert!(second.ok, "{}", second.message);

        let listed = queue_list("SP1".to_string(), meeting.clone());
        assert!(listed.ok);
        let lots: Vec<u32> = listed.items.iter().map(|item| item.lot).collect();
        assert_eq!(lots, vec![4, 2]);
        assert_eq!(listed.items[0].rep_name, "N/A");
        assert_eq!(listed.items[1].rep_name, "ACME PTY LTD");

        let count = queue_count("SP1".to_string(), meeting.clone());
        assert_eq!(count.count, 2);
        assert_eq!(count.label, "Sync 2 Items");

        let first_id = first.submission_id.unwrap();
        assert!(queue_delete(first_id.clone()).submission_id.is_some());
        let repeat = queue_delete(first_id);
        assert!(repeat.ok);
        assert!(repeat.submission_id.is_none());

        let conn = open_db(resolve_queue_db_path()).unwrap();
        let remaining: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM submission_queue WHERE meeting_id = ?1",
                [meeting.as_str()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 1);
    }

    #[test]
    fn queue_enqueue_rejects_invalid_lot_and_delete_rejects_bad_id() {
        let response = queue_enqueue(
            "SP1".to_string(),
            unique_token("ffi-invalid"),
            0,
            "Jane Doe".to_string(),
            None,
            false,
            false,
        );
        assert!(!response.ok);
        assert!(response.message.starts_with("queue_enqueue failed"));

        assert!(!queue_delete("not-a-uuid".to_string()).ok);
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
