/// Data model shared by the store, the engine and the CLI
pub mod catalog;
pub mod mapping;

pub use catalog::{
    AttributeDefinition, AttributeId, ChildId, ChildRecord, LegacyAttribute, NewTaxonomy,
    ParentId, ParentRecord, ProductKind, RawAttribute, Taxonomy, Term, TermId,
};
pub use mapping::{
    AttributeArgs, AttributeMapping, LocalAttribute, ResolvedTerm, TargetAttribute, TermMapping,
};
