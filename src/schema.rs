//! Field strategies, document schemas, and source-object projection.
//!
//! A [`Schema`] is a statically ordered list of [`FieldSpec`] entries, one of
//! which is the unique [`FieldKind::Id`] key. Arbitrary source JSON objects
//! are projected through a schema into [`Document`] records before indexing;
//! each [`FieldKind`] also defines how values are broken into index terms.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::utils::ngram::{text_ngrams, word_ngrams};
use crate::utils::tokenizer::tokenize;

/// Name of the unique-key field every schema must carry.
pub const ID_FIELD: &str = "id";

/// Indexing strategy for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Unique document key, stored, exact match
    Id,
    /// Stored, exact match only
    Exact,
    /// Tokenized full text
    Text { stored: bool },
    /// Stored, word-fragment match with fragment sizes in `min..=max` chars
    Ngram { min: usize, max: usize },
    /// Stored, exact match on the canonical fixed-point form
    Numeric { decimals: u32 },
    /// Retrievable from results, never searchable
    Stored,
}

impl FieldKind {
    /// Whether the raw value is retrievable from search results
    pub fn is_stored(&self) -> bool {
        !matches!(self, FieldKind::Text { stored: false })
    }

    /// Whether the field participates in any query
    pub fn is_indexed(&self) -> bool {
        !matches!(self, FieldKind::Stored)
    }

    /// Terms written to the index for one field value.
    ///
    /// Exact-match fields additionally index a case-folded alias of the value
    /// so lowercase free-text tokens can hit them.
    pub fn index_terms(&self, value: &Value) -> Vec<String> {
        match *self {
            FieldKind::Id | FieldKind::Exact => {
                let text = value_text(value);
                if text.is_empty() {
                    return Vec::new();
                }
                let folded = text.to_lowercase();
                if folded == text {
                    vec![text]
                } else {
                    vec![text, folded]
                }
            }
            FieldKind::Text { .. } => tokenize(&value_text(value)),
            FieldKind::Ngram { min, max } => text_ngrams(&value_text(value), min, max),
            FieldKind::Numeric { decimals } => {
                canonical_number(value, decimals).into_iter().collect()
            }
            FieldKind::Stored => Vec::new(),
        }
    }

    /// Terms a lookup value must ALL hit for this field to match.
    ///
    /// Mirrors [`Self::index_terms`] on the query side: an exact field needs
    /// the single verbatim term, a text field every word of the value, an
    /// n-gram field every fragment of every word. An empty return means the
    /// value cannot match anything on this field.
    pub fn lookup_terms(&self, text: &str) -> Vec<String> {
        match *self {
            FieldKind::Id | FieldKind::Exact => {
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![text.to_string()]
                }
            }
            FieldKind::Text { .. } => tokenize(text),
            FieldKind::Ngram { min, max } => text_ngrams(text, min, max),
            FieldKind::Numeric { decimals } => {
                canonical_number(&Value::String(text.to_string()), decimals)
                    .into_iter()
                    .collect()
            }
            FieldKind::Stored => Vec::new(),
        }
    }

    /// Value substituted when a source object omits the field
    pub fn default_value(&self) -> Value {
        match self {
            FieldKind::Numeric { .. } => Value::from(0),
            _ => Value::from(""),
        }
    }
}

/// One field of a schema
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Serializable schema descriptor, persisted alongside the index so a stored
/// index built against a different schema is detected on open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

/// Ordered field list defining one document type
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Build a schema from an ordered field list.
    ///
    /// Panics if the field set does not carry exactly one `Id` field named
    /// `id`, or if field names repeat. Schemas are static program data, so
    /// violations are programming errors rather than runtime conditions.
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        let ids: Vec<_> = fields
            .iter()
            .filter(|f| f.kind == FieldKind::Id)
            .collect();
        assert!(
            ids.len() == 1 && ids[0].name == ID_FIELD,
            "schema must have exactly one Id field named '{ID_FIELD}'"
        );
        for (i, field) in fields.iter().enumerate() {
            assert!(
                fields[..i].iter().all(|f| f.name != field.name),
                "duplicate schema field '{}'",
                field.name
            );
        }
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a field in the schema order, used as its compact id in
    /// postings
    pub fn position(&self, name: &str) -> Option<u16> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .map(|p| p as u16)
    }

    pub fn descriptor(&self) -> Vec<FieldDescriptor> {
        self.fields
            .iter()
            .map(|f| FieldDescriptor {
                name: f.name.to_string(),
                kind: f.kind,
            })
            .collect()
    }

    /// Project a source JSON object into a document record.
    ///
    /// Every schema field is populated: present source values are copied,
    /// absent ones get the field kind's default. The id is taken from the
    /// source's `_id` (falling back to `id`) and coerced to text.
    pub fn project(&self, source: &Map<String, Value>) -> Result<Document> {
        let mut doc = Document::default();

        for spec in &self.fields {
            if spec.kind == FieldKind::Id {
                doc.set(ID_FIELD, Value::String(source_id(source)?));
                continue;
            }
            let value = source
                .get(spec.name)
                .cloned()
                .unwrap_or_else(|| spec.kind.default_value());
            doc.set(spec.name, value);
        }

        Ok(doc)
    }

    /// Restrict a document to its retrievable fields
    pub fn stored_view(&self, doc: &Document) -> Document {
        let mut stored = Document::default();
        for spec in &self.fields {
            if spec.kind.is_stored() {
                if let Some(value) = doc.get(spec.name) {
                    stored.set(spec.name, value.clone());
                }
            }
        }
        stored
    }
}

/// A field-name → value record, the unit stored in and returned from an index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: BTreeMap<String, Value>,
}

impl Document {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// The unique key, present on every projected document
    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Extract and coerce the identity key of a source object
fn source_id(source: &Map<String, Value>) -> Result<String> {
    let raw = source
        .get("_id")
        .or_else(|| source.get(ID_FIELD))
        .ok_or_else(|| Error::InvalidDocument("missing '_id' or 'id' key".to_string()))?;

    match raw {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::InvalidDocument(format!(
            "id must be a non-empty string or number, got {raw}"
        ))),
    }
}

/// Flatten a JSON value to the text form used for term extraction
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Nulls and containers have no text form
        _ => String::new(),
    }
}

/// Canonical fixed-point term for a numeric value: `round(value * 10^decimals)`.
///
/// Accepts JSON numbers and numeric strings; anything else has no canonical
/// form and indexes nothing.
fn canonical_number(value: &Value, decimals: u32) -> Option<String> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    let scaled = (number * 10f64.powi(decimals as i32)).round();
    Some((scaled as i64).to_string())
}

// word_ngrams is re-exported for term-field matching on single tokens
pub(crate) fn token_terms(kind: &FieldKind, token: &str) -> Vec<String> {
    match *kind {
        FieldKind::Ngram { min, max } => word_ngrams(token, min, max),
        _ => kind.lookup_terms(token),
    }
}
