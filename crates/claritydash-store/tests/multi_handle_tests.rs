// Integration tests for several independently opened handles on one file.
// Each handle has its own connections and in-process mutexes, the way two
// CLI processes on the same database do.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use claritydash_core::model::{EntityKey, User};
use claritydash_store::{Storage, StoreConfig};
use common::Note;
use std::thread;
use tempfile::TempDir;

fn open_pair(tmp: &TempDir) -> (Storage, Storage) {
    let config = StoreConfig::file(tmp.path().join("store.db"));
    (
        Storage::open(&config).unwrap(),
        Storage::open(&config).unwrap(),
    )
}

#[test]
fn test_concurrent_inserts_through_separate_handles_stay_indexed() {
    let tmp = TempDir::new().unwrap();
    let (first, second) = open_pair(&tmp);

    thread::scope(|s| {
        for (tag, storage) in [("a", &first), ("b", &second)] {
            let notes = storage.entities::<Note>();
            s.spawn(move || {
                for i in 0..40 {
                    notes
                        .insert(&Note::new(&format!("{}{}", tag, i), "t", "b"))
                        .unwrap();
                }
            });
        }
    });

    for storage in [&first, &second] {
        let notes = storage.entities::<Note>();
        assert_eq!(notes.count().unwrap(), 80);
        assert_eq!(notes.list_entities().unwrap().len(), 80);
        notes.check_consistency().unwrap();
    }
}

#[test]
fn test_inserts_and_deletes_across_handles_stay_consistent() {
    let tmp = TempDir::new().unwrap();
    let (first, second) = open_pair(&tmp);
    let seeded = first.entities::<Note>();
    for i in 0..20 {
        seeded
            .insert(&Note::new(&format!("old{}", i), "t", "b"))
            .unwrap();
    }

    thread::scope(|s| {
        let writer = first.entities::<Note>();
        s.spawn(move || {
            for i in 0..20 {
                writer
                    .insert(&Note::new(&format!("new{}", i), "t", "b"))
                    .unwrap();
            }
        });
        let remover = second.entities::<Note>();
        s.spawn(move || {
            for i in 0..20 {
                let key = EntityKey::parse(format!("old{}", i)).unwrap();
                remover.delete(&key).unwrap();
            }
        });
    });

    let notes = second.entities::<Note>();
    let listed: Vec<String> = notes
        .list()
        .unwrap()
        .into_iter()
        .map(EntityKey::into_string)
        .collect();
    let expected: Vec<String> = (0..20).map(|i| format!("new{}", i)).collect();
    assert_eq!(listed, expected);
    notes.check_consistency().unwrap();
}

#[test]
fn test_concurrent_seed_through_separate_handles_inserts_once() {
    let tmp = TempDir::new().unwrap();
    let (first, second) = open_pair(&tmp);

    let reports = thread::scope(|s| {
        let workers: Vec<_> = [&first, &second, &first, &second]
            .into_iter()
            .map(|storage| {
                let users = storage.entities::<User>();
                s.spawn(move || users.ensure_default_seed().unwrap())
            })
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().unwrap())
            .collect::<Vec<_>>()
    });

    let created: usize = reports.iter().map(|r| r.created.len()).sum();
    assert_eq!(created, 2);

    for storage in [&first, &second] {
        let users = storage.entities::<User>();
        assert_eq!(users.count().unwrap(), 2);
        assert!(users.index().is_seeded().unwrap());
        users.check_consistency().unwrap();
    }

    let again = second.entities::<User>().ensure_default_seed().unwrap();
    assert!(!again.seeded);
    assert!(again.created.is_empty());
}
