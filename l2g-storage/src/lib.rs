//! Catalog storage for local2global: the store trait the engine depends on,
//! an in-memory implementation and JSON catalog snapshots

pub mod error;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, StoreOp, MAX_TAXONOMY_KEY_LEN};
pub use snapshot::{attribute_key, ChildDocument, ParentDocument, Snapshot, TaxonomyDocument, TermDocument};
pub use traits::CatalogStore;
