//! Query combinators layered on the raw search primitives.
//!
//! Builders translate caller-facing constraints into a [`QueryNode`] tree of
//! exact index terms, validating field names against the schema as they go.
//! The [`executor`] evaluates a tree against a snapshot.

pub mod executor;

pub use executor::{evaluate, Evaluation};

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::index::snapshot::TermKey;
use crate::schema::{token_terms, FieldSpec, Schema};
use crate::utils::tokenizer::tokenize;

/// Reserved key carrying free-text phrases in a term query
pub const TERM_KEY: &str = "term";

/// Query tree over exact index terms
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// A single posting lookup
    Term(TermKey),
    /// All children must match
    And(Vec<QueryNode>),
    /// Any child may match
    Or(Vec<QueryNode>),
    /// Every live document
    Every,
    /// No document
    Nothing,
}

fn and(mut nodes: Vec<QueryNode>) -> QueryNode {
    match nodes.len() {
        0 => QueryNode::Every,
        1 => nodes.pop().unwrap(),
        _ => QueryNode::And(nodes),
    }
}

fn or(mut nodes: Vec<QueryNode>) -> QueryNode {
    match nodes.len() {
        0 => QueryNode::Nothing,
        1 => nodes.pop().unwrap(),
        _ => QueryNode::Or(nodes),
    }
}

fn searchable_field<'a>(schema: &'a Schema, field: &str) -> Result<(u16, &'a FieldSpec)> {
    let pos = schema
        .position(field)
        .ok_or_else(|| Error::InvalidQuery(format!("unknown field '{field}'")))?;
    let spec = &schema.fields()[pos as usize];
    if !spec.kind.is_indexed() {
        return Err(Error::InvalidQuery(format!(
            "field '{field}' is stored-only and cannot be searched"
        )));
    }
    Ok((pos, spec))
}

/// Match one field against one value, analyzed per the field's strategy.
///
/// Exact fields need the verbatim term; text and n-gram fields need every
/// term the value analyzes into, so `find` behaves sensibly on them too.
pub fn exact(schema: &Schema, field: &str, value: &str) -> Result<QueryNode> {
    let (pos, spec) = searchable_field(schema, field)?;
    let terms = spec.kind.lookup_terms(value);
    if terms.is_empty() {
        return Ok(QueryNode::Nothing);
    }
    Ok(and(terms
        .into_iter()
        .map(|t| QueryNode::Term(TermKey::new(pos, t)))
        .collect()))
}

/// Logical AND of exact matches, one per constraint
pub fn conjunction(schema: &Schema, constraints: &BTreeMap<String, String>) -> Result<QueryNode> {
    if constraints.is_empty() {
        return Err(Error::InvalidQuery("no constraints given".to_string()));
    }
    let mut nodes = Vec::with_capacity(constraints.len());
    for (field, value) in constraints {
        nodes.push(exact(schema, field, value)?);
    }
    Ok(and(nodes))
}

/// Match one field against any of the supplied values
pub fn any_of(schema: &Schema, field: &str, values: &[String]) -> Result<QueryNode> {
    if values.is_empty() {
        return Err(Error::InvalidQuery(format!(
            "empty value list for field '{field}'"
        )));
    }
    let mut nodes = Vec::with_capacity(values.len());
    for value in values {
        nodes.push(exact(schema, field, value)?);
    }
    Ok(or(nodes))
}

/// Parse a free-text phrase against the term fields: AND over phrase tokens,
/// each token an OR across the fields, analyzed per field strategy.
pub fn free_text(schema: &Schema, term_fields: &[&str], phrase: &str) -> Result<QueryNode> {
    let tokens = tokenize(phrase);
    if tokens.is_empty() {
        return Ok(QueryNode::Nothing);
    }

    let mut token_nodes = Vec::with_capacity(tokens.len());
    for token in &tokens {
        let mut field_nodes = Vec::new();
        for &field in term_fields {
            let (pos, spec) = searchable_field(schema, field)?;
            let terms = token_terms(&spec.kind, token);
            if terms.is_empty() {
                continue;
            }
            field_nodes.push(and(terms
                .into_iter()
                .map(|t| QueryNode::Term(TermKey::new(pos, t)))
                .collect()));
        }
        token_nodes.push(or(field_nodes));
    }

    Ok(and(token_nodes))
}

/// Translate a structured term query: the reserved `term` key carries
/// free-text phrases matched across the term fields, every other key is a
/// per-field disjunction, and all clauses are ANDed.
pub fn term_query(
    schema: &Schema,
    term_fields: &[&str],
    query: &BTreeMap<String, Vec<String>>,
) -> Result<QueryNode> {
    if query.is_empty() {
        return Err(Error::InvalidQuery("query has no clauses".to_string()));
    }

    let mut clauses = Vec::new();
    for (key, values) in query {
        if values.is_empty() {
            return Err(Error::InvalidQuery(format!(
                "empty value list for '{key}'"
            )));
        }
        if key == TERM_KEY {
            for phrase in values {
                clauses.push(free_text(schema, term_fields, phrase)?);
            }
        } else {
            clauses.push(any_of(schema, key, values)?);
        }
    }

    Ok(and(clauses))
}
