use checkin_core::db::{open_db, open_db_in_memory};
use checkin_core::{
    NewSubmission, QueueError, QueueFilter, SqliteSubmissionQueue, Submission, SubmissionQueue,
    SubmissionValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

fn submission(meeting: &str, lot: u32) -> NewSubmission {
    NewSubmission::new("SP1", meeting, lot, format!("Owner {lot}"))
}

fn lots(items: &[Submission]) -> Vec<u32> {
    items.iter().map(|item| item.lot).collect()
}

#[test]
fn enqueue_persists_in_fifo_order() {
    let conn = open_db_in_memory().unwrap();
    let queue = SqliteSubmissionQueue::try_new(&conn).unwrap();

    for lot in [7, 3, 9] {
        queue.enqueue(submission("m1", lot)).unwrap();
    }

    let items = queue.peek_all(&QueueFilter::all()).unwrap();
    assert_eq!(lots(&items), vec![7, 3, 9]);
    assert_eq!(queue.len(&QueueFilter::all()).unwrap(), 3);
    assert!(items.iter().all(|item| item.rep_name == "N/A"));
}

#[test]
fn enqueue_rejects_invalid_payload_and_duplicate_ids() {
    let conn = open_db_in_memory().unwrap();
    let queue = SqliteSubmissionQueue::try_new(&conn).unwrap();

    let err = queue.enqueue(submission("m1", 0)).unwrap_err();
    assert!(matches!(
        err,
        QueueError::Validation(SubmissionValidationError::InvalidLot(0))
    ));

    let id = Uuid::new_v4();
    let mut first = submission("m1", 1);
    first.id = Some(id);
    queue.enqueue(first.clone()).unwrap();
    let err = queue.enqueue(first).unwrap_err();
    assert!(matches!(err, QueueError::DuplicateId(dup) if dup == id));
    assert_eq!(queue.len(&QueueFilter::all()).unwrap(), 1);
}

#[test]
fn remove_by_id_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let queue = SqliteSubmissionQueue::try_new(&conn).unwrap();
    let queued = queue.enqueue(submission("m1", 4)).unwrap();

    assert!(queue.remove_by_id(queued.id).unwrap());
    assert!(!queue.remove_by_id(queued.id).unwrap());
    assert!(!queue.remove_by_id(Uuid::new_v4()).unwrap());
    assert!(queue.is_empty(&QueueFilter::all()).unwrap());
}

#[test]
fn drain_then_requeue_restores_original_order_ahead_of_new_items() {
    let conn = open_db_in_memory().unwrap();
    let queue = SqliteSubmissionQueue::try_new(&conn).unwrap();
    for lot in [1, 2, 3] {
        queue.enqueue(submission("m1", lot)).unwrap();
    }

    let batch = queue.drain(&QueueFilter::all()).unwrap();
    assert_eq!(lots(&batch), vec![1, 2, 3]);
    assert!(queue.is_empty(&QueueFilter::all()).unwrap());

    queue.enqueue(submission("m1", 4)).unwrap();
    queue.requeue(&batch).unwrap();

    let items = queue.peek_all(&QueueFilter::all()).unwrap();
    assert_eq!(lots(&items), vec![1, 2, 3, 4]);
    assert_eq!(items[0].id, batch[0].id);
    assert_eq!(items[0].enqueued_at, batch[0].enqueued_at);
}

#[test]
fn requeue_skips_ids_that_are_still_queued() {
    let conn = open_db_in_memory().unwrap();
    let queue = SqliteSubmissionQueue::try_new(&conn).unwrap();
    let kept = queue.enqueue(submission("m1", 1)).unwrap();

    queue.requeue(&[kept.clone()]).unwrap();

    let items = queue.peek_all(&QueueFilter::all()).unwrap();
    assert_eq!(items, vec![kept]);
}

#[test]
fn requeue_leaves_requeued_id_at_its_later_position() {
    let conn = open_db_in_memory().unwrap();
    let queue = SqliteSubmissionQueue::try_new(&conn).unwrap();
    for lot in [1, 2] {
        queue.enqueue(submission("m1", lot)).unwrap();
    }
    let batch = queue.drain(&QueueFilter::all()).unwrap();

    queue.enqueue(submission("m1", 5)).unwrap();
    let mut again = submission("m1", 2);
    again.id = Some(batch[1].id);
    queue.enqueue(again).unwrap();
    queue.requeue(&batch).unwrap();

    let items = queue.peek_all(&QueueFilter::all()).unwrap();
    assert_eq!(lots(&items), vec![1, 5, 2]);
    assert_eq!(items[2].id, batch[1].id);
}

#[test]
fn filters_scope_peek_drain_and_len_to_one_meeting() {
    let conn = open_db_in_memory().unwrap();
    let queue = SqliteSubmissionQueue::try_new(&conn).unwrap();
    queue.enqueue(submission("m1", 1)).unwrap();
    queue.enqueue(submission("m2", 2)).unwrap();
    queue.enqueue(submission("m1", 3)).unwrap();
    queue
        .enqueue(NewSubmission::new("SP2", "m1", 5, "Other Plan"))
        .unwrap();

    let m1 = QueueFilter::meeting("SP1", "m1");
    assert_eq!(queue.len(&m1).unwrap(), 2);
    assert_eq!(lots(&queue.drain(&m1).unwrap()), vec![1, 3]);

    let rest = queue.peek_all(&QueueFilter::all()).unwrap();
    assert_eq!(lots(&rest), vec![2, 5]);
}

#[test]
fn queued_items_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.db");

    let queued_ids: Vec<Uuid> = {
        let conn = open_db(&path).unwrap();
        let queue = SqliteSubmissionQueue::try_new(&conn).unwrap();
        [10, 11]
            .into_iter()
            .map(|lot| queue.enqueue(submission("m1", lot)).unwrap().id)
            .collect()
    };

    let conn = open_db(&path).unwrap();
    let queue = SqliteSubmissionQueue::try_new(&conn).unwrap();
    let items = queue.peek_all(&QueueFilter::meeting("SP1", "m1")).unwrap();
    assert_eq!(
        items.iter().map(|item| item.id).collect::<Vec<_>>(),
        queued_ids
    );
}

#[test]
fn queue_over_unmigrated_connection_is_rejected() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteSubmissionQueue::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        QueueError::MissingRequiredTable("submission_queue")
    ));
}

#[test]
fn corrupted_row_surfaces_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let queue = SqliteSubmissionQueue::try_new(&conn).unwrap();
    conn.execute(
        "INSERT INTO submission_queue (
            submission_id, queue_position, plan_id, meeting_id, lot,
            owner_name, rep_name, is_financial, is_proxy, enqueued_at
        ) VALUES ('not-a-uuid', 1, 'SP1', 'm1', 3, 'Jane', 'N/A', 0, 0, 0);",
        [],
    )
    .unwrap();

    let err = queue.peek_all(&QueueFilter::all()).unwrap_err();
    assert!(matches!(err, QueueError::InvalidData(_)));
}

#[test]
fn submission_wire_shape_uses_snake_case_keys() {
    let id = Uuid::new_v4();
    let queued = NewSubmission::new("SP1", "SP1:2026-10-19", 12, "Jane Doe").into_submission(id, 5);

    let value = serde_json::to_value(&queued).unwrap();
    assert_eq!(value["submission_id"], serde_json::json!(id.to_string()));
    assert_eq!(value["plan_id"], "SP1");
    assert_eq!(value["lot"], 12);
    assert_eq!(value["rep_name"], "N/A");
    assert_eq!(value["is_proxy"], false);

    let decoded: Submission = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, queued);
}
