#![allow(clippy::unwrap_used, clippy::expect_used)]

use claritydash_core::errors::{ExErrorKind, StoreError};
use claritydash_core::logging_facility::test_capture::init_test_capture;
use claritydash_core::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use claritydash_core::{log_op_end, log_op_error, log_op_start, EntityKey, User};
use std::time::{Duration, Instant};

fn key(raw: &str) -> EntityKey {
    EntityKey::parse(raw).unwrap()
}

#[test]
fn test_log_op_start_without_entity_context() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name);

    let events = capture.for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event(), Some(EVENT_START));
    assert_eq!(events[0].entity_type(), None);
    assert!(events[0].field("component").is_some());
}

#[test]
fn test_entity_and_key_fields_come_from_the_type() {
    let capture = init_test_capture();
    let op_name = "test_log_entity_fields_unique_2";
    let user_key = key("typed-fields@example.com");

    log_op_start!(op_name, entity = User, key = &user_key);

    let events = capture.for_key(op_name, "typed-fields@example.com");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity_type(), Some("user"));
}

#[test]
fn test_log_op_end_records_elapsed_duration() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_3";
    let start = Instant::now() - Duration::from_millis(25);

    log_op_end!(op_name, since = start, entity = User, key_count = 4);

    let events = capture.for_type(op_name, "user");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event(), Some(EVENT_END));
    assert!(events[0].duration_ms().unwrap() >= 25);
    assert_eq!(events[0].field("key_count"), Some("4"));
}

#[test]
fn test_log_op_error_includes_kind_and_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_4";
    let ghost = key("ghost@example.com");

    let err = StoreError::NotFound {
        entity_type: "user".to_string(),
        key: ghost.to_string(),
    };
    log_op_error!(op_name, err, since = Instant::now(), entity = User, key = &ghost);

    let events = capture.for_key(op_name, "ghost@example.com");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event(), Some(EVENT_END_ERROR));
    assert_eq!(events[0].err_code(), Some("ERR_NOT_FOUND"));
    assert_eq!(events[0].field("err_kind"), Some("NotFound"));
    assert!(events[0].duration_ms().is_some());
}

#[test]
fn test_storage_failure_code_logged() {
    let capture = init_test_capture();
    let op_name = "test_storage_failure_unique_5";

    let err = StoreError::Storage {
        op: "put_entity".to_string(),
        message: "disk I/O error".to_string(),
    };
    log_op_error!(op_name, err.clone(), since = Instant::now());

    let events = capture.for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].err_code(), Some("ERR_STORAGE_FAILURE"));

    let ex_err: claritydash_core::ExError = err.into();
    assert_eq!(ex_err.kind(), ExErrorKind::StorageFailure);
}

#[test]
fn test_lifecycle_keeps_operations_apart() {
    let capture = init_test_capture();
    let shared = key("lifecycle@example.com");

    log_op_start!("test_lifecycle_create_unique_6", entity = User, key = &shared);
    log_op_end!(
        "test_lifecycle_create_unique_6",
        since = Instant::now(),
        entity = User,
        key = &shared
    );
    log_op_start!("test_lifecycle_patch_unique_6", entity = User, key = &shared);

    assert_eq!(
        capture.lifecycle("test_lifecycle_create_unique_6", "lifecycle@example.com"),
        vec![EVENT_START, EVENT_END]
    );
    assert_eq!(
        capture.lifecycle("test_lifecycle_patch_unique_6", "lifecycle@example.com"),
        vec![EVENT_START]
    );
}
