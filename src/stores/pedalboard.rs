//! Index over pedalboard (signal-chain preset) descriptors.
//!
//! The `title` field is exact-match only; the derivation step copies it into
//! `title_words` so fuzzy fragment matching still applies to title text.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::index::{IndexSpec, IndexStore};
use crate::schema::{Document, FieldKind, FieldSpec, Schema};

pub const PEDALBOARD_TERM_FIELDS: &[&str] = &["title_words", "description"];

pub fn pedalboard_schema() -> Schema {
    Schema::new(vec![
        FieldSpec::new("id", FieldKind::Id),
        FieldSpec::new("title", FieldKind::Exact),
        FieldSpec::new("title_words", FieldKind::Ngram { min: 3, max: 5 }),
        FieldSpec::new("description", FieldKind::Text { stored: false }),
    ])
}

pub struct PedalboardSpec {
    schema: Schema,
    storage: PathBuf,
    data_source: PathBuf,
}

impl PedalboardSpec {
    pub fn new(storage: impl Into<PathBuf>, data_source: impl Into<PathBuf>) -> Self {
        Self {
            schema: pedalboard_schema(),
            storage: storage.into(),
            data_source: data_source.into(),
        }
    }
}

impl IndexSpec for PedalboardSpec {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn storage_location(&self) -> &Path {
        &self.storage
    }

    fn data_source_dir(&self) -> &Path {
        &self.data_source
    }

    fn term_fields(&self) -> &[&str] {
        PEDALBOARD_TERM_FIELDS
    }

    fn prepare(&self, source: &Map<String, Value>, doc: &mut Document) -> Result<()> {
        let title = source.get("title").cloned().unwrap_or_else(|| Value::from(""));
        doc.set("title_words", title);
        Ok(())
    }
}

pub type PedalboardIndexStore = IndexStore<PedalboardSpec>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_title_words_copied_from_title() {
        let spec = PedalboardSpec::new("unused", "unused");
        let source = json!({"id": "p1", "title": "My Board", "description": "clean tone"});
        let object = source.as_object().unwrap();
        let mut doc = spec.schema().project(object).unwrap();
        spec.prepare(object, &mut doc).unwrap();

        assert_eq!(doc.get("title_words"), Some(&json!("My Board")));
        assert_eq!(doc.get("title"), Some(&json!("My Board")));
    }

    #[test]
    fn test_missing_title_leaves_empty_words() {
        let spec = PedalboardSpec::new("unused", "unused");
        let source = json!({"id": "p1"});
        let object = source.as_object().unwrap();
        let mut doc = spec.schema().project(object).unwrap();
        spec.prepare(object, &mut doc).unwrap();

        assert_eq!(doc.get("title_words"), Some(&json!("")));
    }
}
