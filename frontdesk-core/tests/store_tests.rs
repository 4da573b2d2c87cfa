//! Record store integration tests: envelope invariants for both record kinds,
//! on-disk sharing, and pending-queue ordering.

use assert_fs::prelude::*;
use chrono::{Duration, TimeZone, Utc};
use frontdesk_core::{
    NewCheckin, NewMailRecord, RecordId, RecordKind, RecordStore, StoreError, SyncStatus,
};
use predicates::prelude::predicate;
use rstest::rstest;

fn insert(store: &RecordStore, kind: RecordKind, client: &str, minutes: i64) -> RecordId {
    let at = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap() + Duration::minutes(minutes);
    match kind {
        RecordKind::Checkin => {
            store
                .insert_checkin_at(
                    NewCheckin {
                        client_name: client.to_string(),
                        staff_name: "Jane Doe".to_string(),
                        ..NewCheckin::default()
                    },
                    at,
                )
                .expect("insert check-in")
                .id
        }
        RecordKind::Mail => {
            store
                .insert_mail_at(
                    NewMailRecord {
                        client_name: client.to_string(),
                        staff_name: "Jane Doe".to_string(),
                        ..NewMailRecord::default()
                    },
                    at,
                )
                .expect("insert mail")
                .id
        }
    }
}

// ---------------------------------------------------------------------------
// 1. Envelope transitions
// ---------------------------------------------------------------------------

#[rstest]
#[case::checkin(RecordKind::Checkin)]
#[case::mail(RecordKind::Mail)]
fn failure_then_success_transitions(#[case] kind: RecordKind) {
    let store = RecordStore::open_in_memory().expect("store");
    let id = insert(&store, kind, "Grace", 0);

    store
        .record_failure(kind, &id, "remote returned status 500: server error")
        .expect("record failure");
    let failed = store.get(kind, &id).expect("load");
    assert_eq!(failed.envelope().status, SyncStatus::Failed);
    assert!(failed
        .envelope()
        .last_error
        .as_deref()
        .is_some_and(|e| e.contains("500")));
    assert_eq!(failed.envelope().synced_at, None);

    store.record_success(kind, &id).expect("record success");
    let synced = store.get(kind, &id).expect("load");
    assert_eq!(synced.envelope().status, SyncStatus::Success);
    assert_eq!(synced.envelope().last_error, None);
    let synced_at = synced.envelope().synced_at.expect("synced_at set");
    assert!(synced_at >= synced.created_at());
}

#[rstest]
#[case::checkin(RecordKind::Checkin)]
#[case::mail(RecordKind::Mail)]
fn repeated_failures_keep_latest_error(#[case] kind: RecordKind) {
    let store = RecordStore::open_in_memory().expect("store");
    let id = insert(&store, kind, "Grace", 0);

    store.record_failure(kind, &id, "first").expect("first");
    store.record_failure(kind, &id, "second").expect("second");

    let record = store.get(kind, &id).expect("load");
    assert_eq!(record.envelope().last_error.as_deref(), Some("second"));
}

#[rstest]
#[case::checkin(RecordKind::Checkin)]
#[case::mail(RecordKind::Mail)]
fn ids_are_scoped_to_their_table(#[case] kind: RecordKind) {
    let store = RecordStore::open_in_memory().expect("store");
    let id = insert(&store, kind, "Grace", 0);
    let other = match kind {
        RecordKind::Checkin => RecordKind::Mail,
        RecordKind::Mail => RecordKind::Checkin,
    };
    let err = store.record_success(other, &id).unwrap_err();
    assert!(matches!(err, StoreError::RecordNotFound { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Pending queue
// ---------------------------------------------------------------------------

#[rstest]
#[case::checkin(RecordKind::Checkin)]
#[case::mail(RecordKind::Mail)]
fn pending_queue_drains_in_creation_order(#[case] kind: RecordKind) {
    let store = RecordStore::open_in_memory().expect("store");
    let third = insert(&store, kind, "third", 20);
    let first = insert(&store, kind, "first", 0);
    let second = insert(&store, kind, "second", 10);

    let mut order = Vec::new();
    loop {
        let page = store.fetch_pending(kind, 1).expect("page");
        let Some(next) = page.into_iter().next() else { break };
        store.record_success(kind, next.id()).expect("success");
        order.push(next.id().clone());
    }
    assert_eq!(order, vec![first, second, third]);
}

// ---------------------------------------------------------------------------
// 3. On-disk store
// ---------------------------------------------------------------------------

#[test]
fn open_at_creates_database_file_and_parent_dirs() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let db = home.child("var").child("frontdesk").child("frontdesk.db");

    let store = RecordStore::open_at(db.path()).expect("open");
    insert(&store, RecordKind::Checkin, "Ada", 0);
    drop(store);

    db.assert(predicate::path::exists());
    let reopened = RecordStore::open_at(db.path()).expect("reopen");
    let counts = reopened.status_counts(RecordKind::Checkin).expect("counts");
    assert_eq!(counts.pending, 1);
}

#[test]
fn open_at_fails_when_parent_is_a_file() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let blocker = home.child("blocker");
    blocker.write_str("not a directory").expect("write");

    let err = RecordStore::open_at(&blocker.path().join("frontdesk.db")).unwrap_err();
    assert!(matches!(err, StoreError::Open { .. }), "got: {err}");
    assert!(err.to_string().contains("frontdesk.db"));
}
