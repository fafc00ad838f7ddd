pub mod persist;
pub mod snapshot;
pub mod store;

pub use snapshot::{DocSlot, Snapshot, TermKey};
pub use store::{IndexSpec, IndexStore, SearchResults, TermQuery};
