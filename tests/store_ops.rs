//! End-to-end tests over the concrete effect and pedalboard stores,
//! exercising the open-or-build lifecycle, CRUD, and search against real
//! storage directories.

use std::collections::BTreeMap;
use std::fs;

use serde_json::{json, Value};
use tempfile::TempDir;

use pedaldex::stores::{EffectSpec, PedalboardSpec};
use pedaldex::{Document, Error, IndexStore, TermQuery};

struct Dirs {
    _root: TempDir,
    storage: std::path::PathBuf,
    data: std::path::PathBuf,
}

fn dirs() -> Dirs {
    let root = tempfile::tempdir().unwrap();
    let storage = root.path().join("index");
    let data = root.path().join("data");
    Dirs {
        _root: root,
        storage,
        data,
    }
}

fn effect_store(dirs: &Dirs) -> IndexStore<EffectSpec> {
    IndexStore::open(EffectSpec::new(&dirs.storage, &dirs.data)).unwrap()
}

fn sample_effect(id: &str, name: &str, category: &str) -> Value {
    json!({
        "_id": id,
        "name": name,
        "label": name,
        "category": category,
        "author": "Aidan",
        "description": format!("a {category} style unit"),
        "ports": {"audio": {"input": ["in"], "output": ["out_l", "out_r"]}}
    })
}

fn find_one(store: &IndexStore<EffectSpec>, field: &str, value: &str) -> Vec<Document> {
    let mut constraints = BTreeMap::new();
    constraints.insert(field.to_string(), value.to_string());
    store.find(&constraints).unwrap().collect()
}

#[test]
fn test_upsert_then_find() {
    let dirs = dirs();
    let store = effect_store(&dirs);

    store.upsert(&sample_effect("e1", "Echo Delay", "Delay")).unwrap();

    let docs = find_one(&store, "name", "Echo Delay");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id(), Some("e1"));
    assert_eq!(docs[0].get("category"), Some(&json!("Delay")));
}

#[test]
fn test_results_hold_only_stored_fields() {
    let dirs = dirs();
    let store = effect_store(&dirs);
    store.upsert(&sample_effect("e1", "Echo Delay", "Delay")).unwrap();

    let docs = find_one(&store, "category", "Delay");
    // description is indexed but not stored
    assert!(docs[0].get("description").is_none());
    assert!(docs[0].get("author").is_some());
}

#[test]
fn test_upsert_is_idempotent_per_id() {
    let dirs = dirs();
    let store = effect_store(&dirs);

    let effect = sample_effect("e1", "Echo Delay", "Delay");
    store.upsert(&effect).unwrap();
    store.upsert(&effect).unwrap();

    assert_eq!(store.every().count(), 1);
}

#[test]
fn test_upsert_replaces_old_terms() {
    let dirs = dirs();
    let store = effect_store(&dirs);

    store.upsert(&sample_effect("e1", "Echo Delay", "Delay")).unwrap();
    store.upsert(&sample_effect("e1", "Spring Verb", "Reverb")).unwrap();

    assert!(find_one(&store, "category", "Delay").is_empty());
    assert_eq!(find_one(&store, "category", "Reverb").len(), 1);
}

#[test]
fn test_delete() {
    let dirs = dirs();
    let store = effect_store(&dirs);
    store.upsert(&sample_effect("e1", "Echo Delay", "Delay")).unwrap();

    assert!(store.delete("e1").unwrap());
    assert!(!store.delete("e1").unwrap());
    assert_eq!(store.every().count(), 0);
    assert!(find_one(&store, "category", "Delay").is_empty());
}

#[test]
fn test_port_counts_and_default_score() {
    let dirs = dirs();
    let store = effect_store(&dirs);
    store.upsert(&sample_effect("e1", "Echo Delay", "Delay")).unwrap();

    let docs = find_one(&store, "name", "Echo Delay");
    assert_eq!(docs[0].get("input_ports"), Some(&json!(1)));
    assert_eq!(docs[0].get("output_ports"), Some(&json!(2)));
    assert_eq!(docs[0].get("score"), Some(&json!(0)));
}

#[test]
fn test_term_search_with_category_constraint() {
    let dirs = dirs();
    let store = effect_store(&dirs);
    store.upsert(&sample_effect("e1", "Echo Delay", "Delay")).unwrap();
    store.upsert(&sample_effect("e2", "Echo Chamber", "Reverb")).unwrap();

    let mut query: TermQuery = BTreeMap::new();
    query.insert("term".to_string(), vec!["delay".to_string()]);
    query.insert("category".to_string(), vec!["Delay".to_string()]);

    let docs: Vec<_> = store.term_search(&query).unwrap().collect();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id(), Some("e1"));
}

#[test]
fn test_term_search_free_text_ranks_matches() {
    let dirs = dirs();
    let store = effect_store(&dirs);
    store.upsert(&sample_effect("e1", "Echo Delay", "Delay")).unwrap();
    store.upsert(&sample_effect("e2", "Echo Chamber", "Reverb")).unwrap();
    store.upsert(&sample_effect("e3", "Fuzz Face", "Distortion")).unwrap();

    let mut query: TermQuery = BTreeMap::new();
    query.insert("term".to_string(), vec!["echo".to_string()]);

    let ids: Vec<_> = store
        .term_search(&query)
        .unwrap()
        .map(|d| d.id().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"e1".to_string()));
    assert!(ids.contains(&"e2".to_string()));
}

#[test]
fn test_reindex_skips_malformed_files() {
    let dirs = dirs();
    fs::create_dir_all(&dirs.data).unwrap();
    fs::write(
        dirs.data.join("a.json"),
        serde_json::to_vec(&sample_effect("e1", "Echo Delay", "Delay")).unwrap(),
    )
    .unwrap();
    fs::write(dirs.data.join("b.json"), b"{ not json").unwrap();

    let store = effect_store(&dirs);
    store.reindex().unwrap();

    let docs: Vec<_> = store.every().collect();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id(), Some("e1"));
}

#[test]
fn test_reindex_without_data_source_keeps_index() {
    let dirs = dirs();
    let store = effect_store(&dirs);
    store.upsert(&sample_effect("e1", "Echo Delay", "Delay")).unwrap();

    // data source dir was never created
    store.reindex().unwrap();
    assert_eq!(store.every().count(), 1);
}

#[test]
fn test_index_survives_reopen() {
    let dirs = dirs();
    {
        let store = effect_store(&dirs);
        store.upsert(&sample_effect("e1", "Echo Delay", "Delay")).unwrap();
    }

    let store = effect_store(&dirs);
    let docs = find_one(&store, "category", "Delay");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id(), Some("e1"));
}

#[test]
fn test_corrupt_index_rebuilds_from_data_source() {
    let dirs = dirs();
    fs::create_dir_all(&dirs.data).unwrap();
    fs::write(
        dirs.data.join("a.json"),
        serde_json::to_vec(&sample_effect("e1", "Echo Delay", "Delay")).unwrap(),
    )
    .unwrap();

    {
        let store = effect_store(&dirs);
        assert_eq!(store.every().count(), 1);
    }
    fs::write(dirs.storage.join("meta.json"), b"garbage").unwrap();

    let store = effect_store(&dirs);
    let docs = find_one(&store, "name", "Echo Delay");
    assert_eq!(docs.len(), 1);
}

#[test]
fn test_over_long_exact_value_survives_reopen() {
    let dirs = dirs();
    {
        let store = effect_store(&dirs);
        let mut effect = sample_effect("e1", "Echo Delay", "Delay");
        effect["url"] = json!("u".repeat(70_000));
        store.upsert(&effect).unwrap();
        assert_eq!(store.every().count(), 1);
    }

    let store = effect_store(&dirs);
    let docs: Vec<_> = store.every().collect();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id(), Some("e1"));
    // the raw value is still stored and retrievable
    assert_eq!(docs[0].get("url"), Some(&json!("u".repeat(70_000))));
}

#[test]
fn test_open_or_build_does_not_clobber_concurrent_writes() {
    use std::sync::Arc;
    use std::thread;

    let dirs = dirs();
    let store = Arc::new(effect_store(&dirs));

    let mut handles = Vec::new();
    for worker in 0..4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for n in 0..5 {
                let id = format!("e{worker}-{n}");
                store
                    .upsert(&sample_effect(&id, "Echo Delay", "Delay"))
                    .unwrap();
            }
        }));
    }
    let reopener = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..10 {
                store.open_or_build().unwrap();
            }
        })
    };
    for handle in handles {
        handle.join().unwrap();
    }
    reopener.join().unwrap();

    // every committed upsert is visible regardless of interleaving
    assert_eq!(store.every().count(), 20);
    for worker in 0..4 {
        for n in 0..5 {
            assert!(store.delete(&format!("e{worker}-{n}")).unwrap());
        }
    }
}

#[test]
fn test_invalid_source_object_rejected() {
    let dirs = dirs();
    let store = effect_store(&dirs);

    let err = store.upsert(&json!(["not", "an", "object"])).unwrap_err();
    assert!(matches!(err, Error::InvalidDocument(_)));

    let err = store.upsert(&json!({"name": "no id here"})).unwrap_err();
    assert!(matches!(err, Error::InvalidDocument(_)));
}

#[test]
fn test_invalid_queries_rejected() {
    let dirs = dirs();
    let store = effect_store(&dirs);

    let mut unknown = BTreeMap::new();
    unknown.insert("bogus".to_string(), "x".to_string());
    assert!(matches!(
        store.find(&unknown).unwrap_err(),
        Error::InvalidQuery(_)
    ));

    let mut stored_only = BTreeMap::new();
    stored_only.insert("pedalColor".to_string(), "red".to_string());
    assert!(matches!(
        store.find(&stored_only).unwrap_err(),
        Error::InvalidQuery(_)
    ));

    assert!(matches!(
        store.term_search(&TermQuery::new()).unwrap_err(),
        Error::InvalidQuery(_)
    ));
}

#[test]
fn test_pedalboard_title_words_search() {
    let dirs = dirs();
    let store = IndexStore::open(PedalboardSpec::new(&dirs.storage, &dirs.data)).unwrap();

    store
        .upsert(&json!({"id": "p1", "title": "My Board", "description": "clean tone"}))
        .unwrap();
    store
        .upsert(&json!({"id": "p2", "title": "Shoegaze Wall", "description": "fuzz"}))
        .unwrap();

    let mut query: TermQuery = BTreeMap::new();
    query.insert("term".to_string(), vec!["board".to_string()]);

    let docs: Vec<_> = store.term_search(&query).unwrap().collect();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id(), Some("p1"));
    assert_eq!(docs[0].get("title_words"), Some(&json!("My Board")));
    // title itself stays exact-match
    assert_eq!(find_one_pb(&store, "title", "My Board").len(), 1);
}

fn find_one_pb(store: &IndexStore<PedalboardSpec>, field: &str, value: &str) -> Vec<Document> {
    let mut constraints = BTreeMap::new();
    constraints.insert(field.to_string(), value.to_string());
    store.find(&constraints).unwrap().collect()
}
