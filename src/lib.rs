//! # pedaldex - searchable audio plugin metadata indexes
//!
//! pedaldex maintains persistent, searchable indexes over two families of
//! JSON metadata documents that otherwise live as one file per document on
//! disk: audio-processing **effect** descriptors and **pedalboard**
//! (signal-chain preset) descriptors.
//!
//! ## Architecture
//!
//! - [`schema`] - Field strategies, schemas, source-object projection
//! - [`index`] - Snapshot state, on-disk persistence, the store lifecycle
//! - [`query`] - Exact and free-text query combinators plus the executor
//! - [`stores`] - The concrete effect and pedalboard index types
//! - [`utils`] - Tokenization, n-grams, postings encoding, path defaults
//!
//! ## Quick start
//!
//! ```no_run
//! use pedaldex::index::IndexStore;
//! use pedaldex::stores::EffectSpec;
//! use std::collections::BTreeMap;
//!
//! let spec = EffectSpec::new("/data/effects.index", "/data/effects");
//! let store = IndexStore::open(spec).unwrap();
//!
//! let mut by_name = BTreeMap::new();
//! by_name.insert("name".to_string(), "Echo Delay".to_string());
//! for doc in store.find(&by_name).unwrap() {
//!     println!("{}", doc.id().unwrap_or("?"));
//! }
//! ```
//!
//! Opening a store runs the open-or-build lifecycle: a missing, unreadable,
//! corrupt, or schema-mismatched persisted index is rebuilt transparently
//! from the data source directory, skipping unparseable files.

pub mod error;
pub mod index;
pub mod query;
pub mod schema;
pub mod stores;
pub mod utils;

pub use error::{Error, Result};
pub use index::{IndexSpec, IndexStore, SearchResults, TermQuery};
pub use schema::{Document, FieldKind, FieldSpec, Schema};
