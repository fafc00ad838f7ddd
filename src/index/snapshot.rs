//! Immutable in-memory realization of one index.
//!
//! A snapshot owns the stored documents, the per-term posting bitmaps, and
//! the bookkeeping needed to reverse a document's terms on upsert or delete.
//! Writers clone the current snapshot, mutate the clone, persist it, then
//! publish it; readers keep using the snapshot they started with.

use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;

use crate::schema::{Document, Schema};

/// Slot of a document within a snapshot. Slots are never reused across
/// different ids; a rebuild starts numbering from zero again.
pub type DocSlot = u32;

/// Longest term the postings file can frame (term lengths are u16).
/// Over-long values stay retrievable but index no term.
pub(crate) const MAX_TERM_BYTES: usize = u16::MAX as usize;

/// Posting key: compact field position plus the term text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermKey {
    pub field: u16,
    pub term: String,
}

impl TermKey {
    pub fn new(field: u16, term: impl Into<String>) -> Self {
        Self {
            field,
            term: term.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Stored-field documents by slot; tombstoned slots are None
    docs: Vec<Option<Document>>,
    id_to_slot: FxHashMap<String, DocSlot>,
    postings: FxHashMap<TermKey, RoaringBitmap>,
    /// Terms indexed per slot, kept so an upsert/delete can retract them
    doc_terms: Vec<Vec<TermKey>>,
    live: RoaringBitmap,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Insert or replace a projected document.
    ///
    /// The document carries every schema field (projection guarantees that);
    /// only stored fields are retained for retrieval, but all indexed fields
    /// contribute terms.
    pub fn insert(&mut self, schema: &Schema, doc: &Document) {
        let Some(id) = doc.id().map(str::to_string) else {
            // projection always sets an id; nothing sane to do without one
            return;
        };

        let slot = match self.id_to_slot.get(&id) {
            Some(&slot) => {
                self.retract_slot(slot);
                slot
            }
            None => {
                let slot = self.docs.len() as DocSlot;
                self.docs.push(None);
                self.doc_terms.push(Vec::new());
                slot
            }
        };

        let mut keys = Vec::new();
        for (pos, spec) in schema.fields().iter().enumerate() {
            let Some(value) = doc.get(spec.name) else {
                continue;
            };
            let mut terms = spec.kind.index_terms(value);
            terms.retain(|t| t.len() <= MAX_TERM_BYTES);
            terms.sort_unstable();
            terms.dedup();
            for term in terms {
                let key = TermKey::new(pos as u16, term);
                self.postings.entry(key.clone()).or_default().insert(slot);
                keys.push(key);
            }
        }

        self.docs[slot as usize] = Some(schema.stored_view(doc));
        self.doc_terms[slot as usize] = keys;
        self.id_to_slot.insert(id, slot);
        self.live.insert(slot);
    }

    /// Remove a document by id. Returns whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(slot) = self.id_to_slot.remove(id) else {
            return false;
        };
        self.retract_slot(slot);
        self.docs[slot as usize] = None;
        self.live.remove(slot);
        true
    }

    /// Retract a slot's terms from the postings
    fn retract_slot(&mut self, slot: DocSlot) {
        let keys = std::mem::take(&mut self.doc_terms[slot as usize]);
        for key in keys {
            if let Some(bitmap) = self.postings.get_mut(&key) {
                bitmap.remove(slot);
                if bitmap.is_empty() {
                    self.postings.remove(&key);
                }
            }
        }
    }

    pub fn term_docs(&self, key: &TermKey) -> Option<&RoaringBitmap> {
        self.postings.get(key)
    }

    /// Number of live documents containing the term
    pub fn doc_freq(&self, key: &TermKey) -> u64 {
        self.postings.get(key).map_or(0, RoaringBitmap::len)
    }

    pub fn live(&self) -> &RoaringBitmap {
        &self.live
    }

    pub fn doc_count(&self) -> u64 {
        self.live.len()
    }

    pub fn doc(&self, slot: DocSlot) -> Option<&Document> {
        self.docs.get(slot as usize)?.as_ref()
    }

    pub fn docs(&self) -> &[Option<Document>] {
        &self.docs
    }

    pub fn postings(&self) -> impl Iterator<Item = (&TermKey, &RoaringBitmap)> {
        self.postings.iter()
    }

    /// Reassemble a snapshot from its persisted parts, validating internal
    /// consistency. An `Err` means the persisted index is corrupt.
    pub(crate) fn from_parts(
        docs: Vec<Option<Document>>,
        postings: Vec<(TermKey, Vec<DocSlot>)>,
    ) -> std::result::Result<Self, String> {
        let mut snapshot = Snapshot {
            doc_terms: vec![Vec::new(); docs.len()],
            ..Snapshot::default()
        };

        for (slot, doc) in docs.iter().enumerate() {
            let Some(doc) = doc else { continue };
            let id = doc
                .id()
                .ok_or_else(|| format!("document in slot {slot} has no id"))?;
            if snapshot
                .id_to_slot
                .insert(id.to_string(), slot as DocSlot)
                .is_some()
            {
                return Err(format!("duplicate document id '{id}'"));
            }
            snapshot.live.insert(slot as DocSlot);
        }
        snapshot.docs = docs;

        for (key, slots) in postings {
            let mut bitmap = RoaringBitmap::new();
            for slot in slots {
                if slot as usize >= snapshot.docs.len() {
                    return Err(format!("posting slot {slot} out of range"));
                }
                snapshot.doc_terms[slot as usize].push(key.clone());
                bitmap.insert(slot);
            }
            if !bitmap.is_empty() {
                snapshot.postings.insert(key, bitmap);
            }
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, FieldSpec, Schema};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::new("id", FieldKind::Id),
            FieldSpec::new("name", FieldKind::Ngram { min: 3, max: 5 }),
            FieldSpec::new("description", FieldKind::Text { stored: false }),
        ])
    }

    fn doc(id: &str, name: &str, description: &str) -> Document {
        let s = schema();
        s.project(
            json!({"_id": id, "name": name, "description": description})
                .as_object()
                .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_insert_and_lookup() {
        let s = schema();
        let mut snap = Snapshot::empty();
        snap.insert(&s, &doc("e1", "Echo", "tape echo"));

        assert_eq!(snap.doc_count(), 1);
        let key = TermKey::new(s.position("description").unwrap(), "tape");
        assert_eq!(snap.doc_freq(&key), 1);
    }

    #[test]
    fn test_upsert_replaces_slot_and_terms() {
        let s = schema();
        let mut snap = Snapshot::empty();
        snap.insert(&s, &doc("e1", "Echo", "tape echo"));
        snap.insert(&s, &doc("e1", "Chorus", "wide chorus"));

        assert_eq!(snap.doc_count(), 1);
        let old = TermKey::new(s.position("description").unwrap(), "tape");
        let new = TermKey::new(s.position("description").unwrap(), "wide");
        assert_eq!(snap.doc_freq(&old), 0);
        assert_eq!(snap.doc_freq(&new), 1);
    }

    #[test]
    fn test_remove() {
        let s = schema();
        let mut snap = Snapshot::empty();
        snap.insert(&s, &doc("e1", "Echo", "tape echo"));

        assert!(snap.remove("e1"));
        assert!(!snap.remove("e1"));
        assert_eq!(snap.doc_count(), 0);
        let key = TermKey::new(s.position("description").unwrap(), "tape");
        assert_eq!(snap.doc_freq(&key), 0);
    }

    #[test]
    fn test_over_long_terms_are_not_indexed() {
        let s = Schema::new(vec![
            FieldSpec::new("id", FieldKind::Id),
            FieldSpec::new("url", FieldKind::Exact),
        ]);
        let long_url = "u".repeat(MAX_TERM_BYTES + 1);
        let doc = s
            .project(
                json!({"_id": "e1", "url": long_url})
                    .as_object()
                    .unwrap(),
            )
            .unwrap();

        let mut snap = Snapshot::empty();
        snap.insert(&s, &doc);

        assert_eq!(snap.doc_count(), 1);
        assert!(snap.doc(0).unwrap().get("url").is_some());
        let pos = s.position("url").unwrap();
        assert!(snap.postings().all(|(key, _)| key.field != pos));
    }

    #[test]
    fn test_from_parts_rejects_out_of_range_slot() {
        let err = Snapshot::from_parts(vec![], vec![(TermKey::new(0, "x"), vec![3])]);
        assert!(err.is_err());
    }

    #[test]
    fn test_from_parts_rejects_duplicate_ids() {
        let s = schema();
        let d = s.stored_view(&doc("e1", "Echo", ""));
        let err = Snapshot::from_parts(vec![Some(d.clone()), Some(d)], vec![]);
        assert!(err.is_err());
    }

    #[test]
    fn test_from_parts_roundtrip() {
        let s = schema();
        let mut snap = Snapshot::empty();
        snap.insert(&s, &doc("e1", "Echo", "tape echo"));
        snap.insert(&s, &doc("e2", "Chorus", "wide"));
        snap.remove("e1");

        let docs = snap.docs().to_vec();
        let postings = snap
            .postings()
            .map(|(k, bm)| (k.clone(), bm.iter().collect()))
            .collect();
        let rebuilt = Snapshot::from_parts(docs, postings).unwrap();

        assert_eq!(rebuilt.doc_count(), 1);
        assert!(rebuilt.doc(1).is_some());
        assert!(rebuilt.doc(0).is_none());
    }
}
