//! The index store: open-or-build lifecycle, CRUD, and search primitives.
//!
//! An [`IndexStore`] is a long-lived handle over one persisted index, bound
//! to one schema and one storage location by its [`IndexSpec`]. Readers take
//! a cheap `Arc` snapshot and never block; writers serialize on a mutex,
//! persist durably, then swap the snapshot in, so a commit becomes visible
//! atomically.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::index::persist;
use crate::index::snapshot::{DocSlot, Snapshot};
use crate::query;
use crate::schema::{Document, Schema};

/// Term query: field name to accepted values, with the reserved
/// [`query::TERM_KEY`] carrying free-text phrases
pub type TermQuery = BTreeMap<String, Vec<String>>;

/// Static description of one concrete index type
pub trait IndexSpec {
    fn schema(&self) -> &Schema;

    /// Directory holding the persisted index
    fn storage_location(&self) -> &Path;

    /// Directory of source JSON documents, one object per file
    fn data_source_dir(&self) -> &Path;

    /// Fields eligible for free-text matching
    fn term_fields(&self) -> &[&str];

    /// Adjust a projected document before it is written. The default keeps
    /// the plain schema projection.
    fn prepare(&self, source: &Map<String, Value>, doc: &mut Document) -> Result<()> {
        let _ = (source, doc);
        Ok(())
    }
}

pub struct IndexStore<S: IndexSpec> {
    spec: S,
    state: RwLock<Arc<Snapshot>>,
    write_lock: Mutex<()>,
}

impl<S: IndexSpec> IndexStore<S> {
    /// Open the index, building it from the data source if the storage
    /// location is absent or unusable.
    pub fn open(spec: S) -> Result<Self> {
        let store = Self {
            spec,
            state: RwLock::new(Arc::new(Snapshot::empty())),
            write_lock: Mutex::new(()),
        };
        store.open_or_build()?;
        Ok(store)
    }

    pub fn spec(&self) -> &S {
        &self.spec
    }

    /// Ensure a valid persisted index exists. Idempotent; may delete and
    /// recreate the storage location. Serializes with other writers, so a
    /// concurrent upsert or delete cannot be overwritten by a stale load.
    pub fn open_or_build(&self) -> Result<()> {
        let _write = self.write_lock.lock().expect("index write lock poisoned");
        let dir = self.spec.storage_location();
        if dir.exists() {
            match persist::load(dir, self.spec.schema()) {
                Ok(snapshot) => {
                    debug!(path = %dir.display(), docs = snapshot.doc_count(), "opened index");
                    self.publish(snapshot);
                    return Ok(());
                }
                Err(err) => {
                    warn!(path = %dir.display(), error = %err, "index unusable, rebuilding");
                }
            }
        }
        self.rebuild()
    }

    /// Insert or replace the document derived from a source JSON object.
    /// The commit is durable before this returns.
    pub fn upsert(&self, source: &Value) -> Result<()> {
        let doc = self.project(source)?;

        let _write = self.write_lock.lock().expect("index write lock poisoned");
        let mut snapshot = (*self.snapshot()).clone();
        snapshot.insert(self.spec.schema(), &doc);
        persist::save(self.spec.storage_location(), self.spec.schema(), &snapshot)?;
        self.publish(snapshot);
        Ok(())
    }

    /// Remove a document by id. Returns whether one was removed; a missing
    /// id is not an error.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let _write = self.write_lock.lock().expect("index write lock poisoned");
        let mut snapshot = (*self.snapshot()).clone();
        if !snapshot.remove(id) {
            return Ok(false);
        }
        persist::save(self.spec.storage_location(), self.spec.schema(), &snapshot)?;
        self.publish(snapshot);
        Ok(true)
    }

    /// Documents matching every constraint exactly, in index order
    pub fn find(&self, constraints: &BTreeMap<String, String>) -> Result<SearchResults> {
        let snapshot = self.snapshot();
        let node = query::conjunction(self.spec.schema(), constraints)?;
        let slots = query::evaluate(&node, &snapshot).slots();
        Ok(SearchResults::new(snapshot, slots))
    }

    /// All documents currently in the index, in index order
    pub fn every(&self) -> SearchResults {
        let snapshot = self.snapshot();
        let slots = snapshot.live().iter().collect();
        SearchResults::new(snapshot, slots)
    }

    /// Structured free-text query, ordered by relevance score
    pub fn term_search(&self, term_query: &TermQuery) -> Result<SearchResults> {
        let snapshot = self.snapshot();
        let node = query::term_query(self.spec.schema(), self.spec.term_fields(), term_query)?;
        let slots = query::evaluate(&node, &snapshot).ranked_slots();
        Ok(SearchResults::new(snapshot, slots))
    }

    /// Destroy the current index and reconstruct it from the data source
    /// directory, skipping files that fail to parse. A no-op when the data
    /// source directory does not exist.
    pub fn reindex(&self) -> Result<()> {
        if !self.spec.data_source_dir().exists() {
            return Ok(());
        }
        let _write = self.write_lock.lock().expect("index write lock poisoned");
        self.rebuild()
    }

    /// Rebuild from whatever the data source holds (nothing, if it is
    /// absent), replacing the storage location with a fresh valid index.
    /// The caller holds the write lock.
    fn rebuild(&self) -> Result<()> {
        let mut snapshot = Snapshot::empty();
        let source_dir = self.spec.data_source_dir();
        if source_dir.exists() {
            let mut paths: Vec<_> = fs::read_dir(source_dir)
                .map_err(|e| Error::io(source_dir, e))?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .collect();
            paths.sort();

            for path in paths {
                if path.is_dir() {
                    continue;
                }
                match self.load_source(&path) {
                    Ok(doc) => snapshot.insert(self.spec.schema(), &doc),
                    Err(reason) => {
                        warn!(path = %path.display(), %reason, "skipping source document");
                    }
                }
            }
        }

        let dir = self.spec.storage_location();
        if dir.exists() {
            fs::remove_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        persist::save(dir, self.spec.schema(), &snapshot)?;
        info!(path = %dir.display(), docs = snapshot.doc_count(), "index rebuilt");
        self.publish(snapshot);
        Ok(())
    }

    fn load_source(&self, path: &Path) -> std::result::Result<Document, String> {
        let bytes = fs::read(path).map_err(|e| e.to_string())?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;
        self.project(&value).map_err(|e| e.to_string())
    }

    fn project(&self, source: &Value) -> Result<Document> {
        let object = source.as_object().ok_or_else(|| {
            Error::InvalidDocument("source must be a JSON object".to_string())
        })?;
        let mut doc = self.spec.schema().project(object)?;
        self.spec.prepare(object, &mut doc)?;
        Ok(doc)
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        self.state.read().expect("index state lock poisoned").clone()
    }

    fn publish(&self, snapshot: Snapshot) {
        *self.state.write().expect("index state lock poisoned") = Arc::new(snapshot);
    }
}

/// Lazy sequence of stored-field documents backed by the snapshot taken when
/// the search ran. Later writes do not affect an iterator already handed out.
#[derive(Debug)]
pub struct SearchResults {
    snapshot: Arc<Snapshot>,
    slots: std::vec::IntoIter<DocSlot>,
}

impl SearchResults {
    fn new(snapshot: Arc<Snapshot>, slots: Vec<DocSlot>) -> Self {
        Self {
            snapshot,
            slots: slots.into_iter(),
        }
    }
}

impl Iterator for SearchResults {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        loop {
            let slot = self.slots.next()?;
            if let Some(doc) = self.snapshot.doc(slot) {
                return Some(doc.clone());
            }
        }
    }
}
