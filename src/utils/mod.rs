//! Shared utilities.
//!
//! - [`encoding`] - Variable-length integer and delta encoding for postings
//! - [`ngram`] - Character n-gram extraction for fuzzy field matching
//! - [`paths`] - Application data directory resolution
//! - [`tokenizer`] - Lowercase word tokenization

pub mod encoding;
pub mod ngram;
pub mod paths;
pub mod tokenizer;

pub use encoding::*;
pub use ngram::*;
pub use paths::*;
pub use tokenizer::*;
