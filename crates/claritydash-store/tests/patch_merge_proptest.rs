// Property tests for shallow-merge patches.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use claritydash_core::model::EntityKey;
use claritydash_store::Storage;
use common::Note;
use proptest::prelude::*;
use serde_json::{Map, Value};

proptest! {
    #[test]
    fn patch_replaces_supplied_fields_and_keeps_the_rest(
        title in "[a-zA-Z0-9 ]{0,16}",
        body in "[a-zA-Z0-9 ]{0,16}",
        new_title in proptest::option::of("[a-zA-Z0-9 ]{0,16}"),
        new_body in proptest::option::of("[a-zA-Z0-9 ]{0,16}"),
    ) {
        let notes = Storage::in_memory().entities::<Note>();
        let key = EntityKey::parse("n1").unwrap();
        notes.insert(&Note::new("n1", &title, &body)).unwrap();

        let mut partial = Map::new();
        if let Some(t) = &new_title {
            partial.insert("title".to_string(), Value::String(t.clone()));
        }
        if let Some(b) = &new_body {
            partial.insert("body".to_string(), Value::String(b.clone()));
        }

        let patched = notes.patch(&key, &Value::Object(partial)).unwrap();

        let expected = Note::new(
            "n1",
            new_title.as_deref().unwrap_or(&title),
            new_body.as_deref().unwrap_or(&body),
        );
        prop_assert_eq!(&patched, &expected);
        prop_assert_eq!(notes.read(&key).unwrap(), expected);
    }

    #[test]
    fn list_order_matches_first_successful_insert(
        slugs in proptest::collection::vec("[a-e]", 1..20),
    ) {
        let notes = Storage::in_memory().entities::<Note>();
        let mut expected: Vec<String> = Vec::new();

        for slug in &slugs {
            if notes.insert(&Note::new(slug, "t", "b")).is_ok() {
                expected.push(slug.clone());
            }
        }

        let listed: Vec<String> = notes
            .list()
            .unwrap()
            .into_iter()
            .map(EntityKey::into_string)
            .collect();
        prop_assert_eq!(listed, expected);
    }
}
