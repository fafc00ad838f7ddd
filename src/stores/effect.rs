//! Index over audio-processing effect descriptors.
//!
//! Effects carry rich display metadata plus derived port counts: the number
//! of entries in the source object's `ports.audio.input` / `ports.audio.output`
//! lists, computed at upsert time and overriding whatever the projection
//! copied for those fields.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::index::{IndexSpec, IndexStore};
use crate::schema::{Document, FieldKind, FieldSpec, Schema};

pub const EFFECT_TERM_FIELDS: &[&str] = &["label", "name", "category", "author", "description"];

pub fn effect_schema() -> Schema {
    Schema::new(vec![
        FieldSpec::new("id", FieldKind::Id),
        FieldSpec::new("url", FieldKind::Exact),
        FieldSpec::new("name", FieldKind::Ngram { min: 3, max: 5 }),
        FieldSpec::new("label", FieldKind::Ngram { min: 2, max: 4 }),
        FieldSpec::new("author", FieldKind::Text { stored: true }),
        FieldSpec::new("package", FieldKind::Exact),
        FieldSpec::new("category", FieldKind::Exact),
        FieldSpec::new("description", FieldKind::Text { stored: false }),
        FieldSpec::new("version", FieldKind::Numeric { decimals: 5 }),
        FieldSpec::new("stability", FieldKind::Exact),
        FieldSpec::new("input_ports", FieldKind::Numeric { decimals: 0 }),
        FieldSpec::new("output_ports", FieldKind::Numeric { decimals: 0 }),
        FieldSpec::new("pedalModel", FieldKind::Stored),
        FieldSpec::new("pedalColor", FieldKind::Stored),
        FieldSpec::new("pedalLabel", FieldKind::Text { stored: true }),
        FieldSpec::new("smallLabel", FieldKind::Stored),
        FieldSpec::new("brand", FieldKind::Exact),
        FieldSpec::new("score", FieldKind::Numeric { decimals: 0 }),
    ])
}

pub struct EffectSpec {
    schema: Schema,
    storage: PathBuf,
    data_source: PathBuf,
}

impl EffectSpec {
    pub fn new(storage: impl Into<PathBuf>, data_source: impl Into<PathBuf>) -> Self {
        Self {
            schema: effect_schema(),
            storage: storage.into(),
            data_source: data_source.into(),
        }
    }
}

impl IndexSpec for EffectSpec {
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
        EFFECT_TERM_FIELDS
    }

    fn prepare(&self, source: &Map<String, Value>, doc: &mut Document) -> Result<()> {
        // score defaults to zero when the source omits it
        let score = source.get("score").cloned().unwrap_or_else(|| Value::from(0));
        doc.set("score", score);

        doc.set("input_ports", Value::from(audio_port_count(source, "input")));
        doc.set("output_ports", Value::from(audio_port_count(source, "output")));
        Ok(())
    }
}

/// Count the entries of one direction of the nested audio port lists
fn audio_port_count(source: &Map<String, Value>, direction: &str) -> u64 {
    source
        .get("ports")
        .and_then(|ports| ports.pointer(&format!("/audio/{direction}")))
        .and_then(Value::as_array)
        .map_or(0, |ports| ports.len() as u64)
}

pub type EffectIndexStore = IndexStore<EffectSpec>;
