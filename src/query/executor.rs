//! Query evaluation against a snapshot.
//!
//! Produces the matching slot set plus a relevance score per slot. The score
//! is an inverse-document-frequency weight per matched term, summed across
//! clauses, so documents hit by rarer terms and by more clauses rank higher.
//! Exact lookups ignore the scores and keep slot order.

use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;

use crate::index::snapshot::{DocSlot, Snapshot};
use crate::query::QueryNode;

/// Result of evaluating a query node
#[derive(Debug, Default)]
pub struct Evaluation {
    pub docs: RoaringBitmap,
    scores: FxHashMap<DocSlot, f32>,
}

impl Evaluation {
    pub fn score(&self, slot: DocSlot) -> f32 {
        self.scores.get(&slot).copied().unwrap_or(0.0)
    }

    /// Matching slots in ascending slot order
    pub fn slots(&self) -> Vec<DocSlot> {
        self.docs.iter().collect()
    }

    /// Matching slots ordered by score descending, slot ascending on ties
    pub fn ranked_slots(&self) -> Vec<DocSlot> {
        let mut slots: Vec<DocSlot> = self.docs.iter().collect();
        slots.sort_by(|&a, &b| {
            self.score(b)
                .partial_cmp(&self.score(a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        slots
    }
}

/// Evaluate a query tree against a snapshot
pub fn evaluate(node: &QueryNode, snapshot: &Snapshot) -> Evaluation {
    match node {
        QueryNode::Term(key) => {
            let mut docs = snapshot
                .term_docs(key)
                .cloned()
                .unwrap_or_default();
            docs &= snapshot.live();

            let total = snapshot.doc_count().max(1) as f32;
            let freq = docs.len().max(1) as f32;
            let weight = 1.0 + (total / freq).ln();

            let scores = docs.iter().map(|slot| (slot, weight)).collect();
            Evaluation { docs, scores }
        }

        QueryNode::And(children) => {
            let mut iter = children.iter().map(|c| evaluate(c, snapshot));
            let Some(mut acc) = iter.next() else {
                return every(snapshot);
            };
            for child in iter {
                acc.docs &= &child.docs;
                for (slot, weight) in child.scores {
                    if acc.docs.contains(slot) {
                        *acc.scores.entry(slot).or_insert(0.0) += weight;
                    }
                }
            }
            acc.scores.retain(|slot, _| acc.docs.contains(*slot));
            acc
        }

        QueryNode::Or(children) => {
            let mut acc = Evaluation::default();
            for child in children {
                let child = evaluate(child, snapshot);
                acc.docs |= &child.docs;
                for (slot, weight) in child.scores {
                    *acc.scores.entry(slot).or_insert(0.0) += weight;
                }
            }
            acc
        }

        QueryNode::Every => every(snapshot),

        QueryNode::Nothing => Evaluation::default(),
    }
}

fn every(snapshot: &Snapshot) -> Evaluation {
    Evaluation {
        docs: snapshot.live().clone(),
        scores: FxHashMap::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::snapshot::TermKey;
    use crate::query;
    use crate::schema::{FieldKind, FieldSpec, Schema};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::new("id", FieldKind::Id),
            FieldSpec::new("name", FieldKind::Ngram { min: 3, max: 5 }),
            FieldSpec::new("category", FieldKind::Exact),
        ])
    }

    fn snapshot() -> (Schema, Snapshot) {
        let s = schema();
        let mut snap = Snapshot::empty();
        for (id, name, category) in [
            ("e1", "Echo Delay", "Delay"),
            ("e2", "Echo Chamber", "Reverb"),
            ("e3", "Fuzz Face", "Distortion"),
        ] {
            let doc = s
                .project(
                    json!({"_id": id, "name": name, "category": category})
                        .as_object()
                        .unwrap(),
                )
                .unwrap();
            snap.insert(&s, &doc);
        }
        (s, snap)
    }

    #[test]
    fn test_term_respects_live_set() {
        let (s, mut snap) = snapshot();
        snap.remove("e1");
        let key = TermKey::new(s.position("category").unwrap(), "Delay");
        let eval = evaluate(&QueryNode::Term(key), &snap);
        assert!(eval.docs.is_empty());
    }

    #[test]
    fn test_and_intersects() {
        let (s, snap) = snapshot();
        let node = query::free_text(&s, &["name"], "echo delay").unwrap();
        let eval = evaluate(&node, &snap);
        assert_eq!(eval.slots(), vec![0]);
    }

    #[test]
    fn test_or_unions() {
        let (s, snap) = snapshot();
        let node = query::any_of(
            &s,
            "category",
            &["Delay".to_string(), "Reverb".to_string()],
        )
        .unwrap();
        let eval = evaluate(&node, &snap);
        assert_eq!(eval.slots(), vec![0, 1]);
    }

    #[test]
    fn test_ranking_prefers_more_clauses() {
        let (s, snap) = snapshot();
        // "echo" hits e1 and e2 on name; the category clause only e1
        let mut q = BTreeMap::new();
        q.insert("term".to_string(), vec!["echo".to_string()]);
        let free = query::term_query(&s, &["name", "category"], &q).unwrap();
        let with_cat = QueryNode::Or(vec![
            free,
            query::exact(&s, "category", "Delay").unwrap(),
        ]);
        let eval = evaluate(&with_cat, &snap);
        assert_eq!(eval.ranked_slots()[0], 0);
        assert!(eval.score(0) > eval.score(1));
    }

    #[test]
    fn test_nothing_matches_nothing() {
        let (_, snap) = snapshot();
        let eval = evaluate(&QueryNode::Nothing, &snap);
        assert!(eval.docs.is_empty());
    }

    #[test]
    fn test_every_matches_live() {
        let (_, snap) = snapshot();
        let eval = evaluate(&QueryNode::Every, &snap);
        assert_eq!(eval.docs.len(), 3);
    }
}
