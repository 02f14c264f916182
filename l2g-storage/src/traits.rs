/// The record/taxonomy store the engine runs against
use crate::error::StoreResult;
use l2g_core::{ChildId, ChildRecord, NewTaxonomy, ParentId, ParentRecord, Taxonomy, Term, TermId};
use serde_json::Value;
use std::collections::BTreeMap;

/// Synchronous catalog store.
///
/// Methods take `&self`; implementations use interior mutability. Taxonomies
/// must be registered before their terms can be created, listed or assigned.
pub trait CatalogStore {
    // Parents

    fn get_parent(&self, id: ParentId) -> StoreResult<Option<ParentRecord>>;

    fn save_parent(&self, parent: &ParentRecord) -> StoreResult<()>;

    fn children_of(&self, id: ParentId) -> StoreResult<Vec<ChildId>>;

    /// Host-level variation sync (refreshes denormalized child data)
    fn sync_variations(&self, id: ParentId) -> StoreResult<()>;

    fn invalidate_parent_caches(&self, id: ParentId);

    fn parent_meta(&self, id: ParentId, key: &str) -> StoreResult<Option<Value>>;

    fn put_parent_meta(&self, id: ParentId, key: &str, value: Value) -> StoreResult<()>;

    // Taxonomies and terms

    fn find_taxonomy(&self, key: &str) -> StoreResult<Option<Taxonomy>>;

    fn taxonomy_registered(&self, key: &str) -> bool;

    fn create_taxonomy(&self, request: &NewTaxonomy) -> StoreResult<Taxonomy>;

    /// Make a created taxonomy queryable in the current process
    fn register_taxonomy(&self, key: &str) -> StoreResult<()>;

    fn list_taxonomies(&self) -> StoreResult<Vec<Taxonomy>>;

    fn find_term_by_slug(&self, taxonomy: &str, slug: &str) -> StoreResult<Option<Term>>;

    fn get_term(&self, taxonomy: &str, id: TermId) -> StoreResult<Option<Term>>;

    fn create_term(&self, taxonomy: &str, name: &str, slug: &str) -> StoreResult<Term>;

    fn list_terms(&self, taxonomy: &str) -> StoreResult<Vec<Term>>;

    fn assigned_terms(&self, parent: ParentId, taxonomy: &str) -> StoreResult<Vec<Term>>;

    /// Replace the parent's term set for `taxonomy`
    fn assign_terms(&self, parent: ParentId, taxonomy: &str, terms: &[TermId]) -> StoreResult<()>;

    // Children

    fn get_child(&self, id: ChildId) -> StoreResult<Option<ChildRecord>>;

    fn child_meta(&self, id: ChildId, key: &str) -> StoreResult<Option<String>>;

    /// Unconditional upsert
    fn put_child_meta(&self, id: ChildId, key: &str, value: &str) -> StoreResult<()>;

    fn delete_child_meta(&self, id: ChildId, key: &str) -> StoreResult<()>;

    fn set_child_attributes(&self, id: ChildId, attributes: &BTreeMap<String, String>) -> StoreResult<()>;

    /// Denormalized "all current attribute values" snapshot kept by the host
    fn native_attributes(&self, id: ChildId) -> StoreResult<BTreeMap<String, String>>;

    // Write hooks and caches

    fn suspend_write_hooks(&self);

    fn resume_write_hooks(&self);

    fn invalidate_child_caches(&self, id: ChildId);
}
