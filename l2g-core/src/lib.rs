//! Core utilities and types shared across all local2global crates

pub mod audit;
pub mod config;
pub mod error;
pub mod normalize;
pub mod types;

// Re-export commonly used types
pub use config::{default_config, load_config, save_config, Config};
pub use error::{ApiError, ErrorCode, L2gError, L2gResult};

pub use types::{
    AttributeArgs, AttributeDefinition, AttributeId, AttributeMapping, ChildId, ChildRecord,
    LocalAttribute, NewTaxonomy, ParentId, ParentRecord, ProductKind, RawAttribute,
    ResolvedTerm, TargetAttribute, Taxonomy, Term, TermId, TermMapping,
};

/// Version information for the local2global project
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Value attached as `source` to every audit record
pub const LOG_SOURCE: &str = "local2global";
