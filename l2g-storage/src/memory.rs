//! In-memory catalog store.
//!
//! Behaves like the host platform where it matters to the engine: child reads
//! go through a per-child object cache, taxonomies must be registered before
//! use, and a write hook re-saves the cached child object after every child
//! write unless hooks are suspended. That hook is what silently reverts naive
//! writes, so the engine has to suspend hooks and verify what it wrote.

use crate::error::{StoreError, StoreResult};
use crate::traits::CatalogStore;
use indexmap::IndexMap;
use l2g_core::normalize::slug;
use l2g_core::{
    AttributeId, ChildId, ChildRecord, NewTaxonomy, ParentId, ParentRecord, Taxonomy, Term, TermId,
};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Longest taxonomy key the store accepts
pub const MAX_TAXONOMY_KEY_LEN: usize = 32;

/// Store operations, for call recording and fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetParent,
    SaveParent,
    ChildrenOf,
    SyncVariations,
    InvalidateParentCaches,
    PutParentMeta,
    FindTaxonomy,
    CreateTaxonomy,
    RegisterTaxonomy,
    FindTerm,
    CreateTerm,
    AssignTerms,
    GetChild,
    PutChildMeta,
    DeleteChildMeta,
    SetChildAttributes,
    NativeAttributes,
    InvalidateChildCaches,
}

#[derive(Debug, Clone)]
struct Fault {
    op: StoreOp,
    /// Calls allowed to succeed before the fault fires
    skip: usize,
    message: String,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct CatalogState {
    pub(crate) parents: BTreeMap<ParentId, ParentRecord>,
    pub(crate) parent_meta: BTreeMap<ParentId, BTreeMap<String, Value>>,
    pub(crate) children: BTreeMap<ChildId, ChildRecord>,
    pub(crate) native: BTreeMap<ChildId, BTreeMap<String, String>>,
    pub(crate) taxonomies: IndexMap<String, Taxonomy>,
    pub(crate) registered: BTreeSet<String>,
    pub(crate) terms: BTreeMap<TermId, Term>,
    pub(crate) assignments: BTreeMap<(ParentId, String), Vec<TermId>>,
    next_term_id: u64,
    next_attribute_id: u64,
}

impl CatalogState {
    fn next_term_id(&mut self) -> TermId {
        self.next_term_id = self
            .next_term_id
            .max(self.terms.keys().map(|id| id.0).max().unwrap_or(0))
            + 1;
        TermId(self.next_term_id)
    }

    fn next_attribute_id(&mut self) -> AttributeId {
        self.next_attribute_id = self
            .next_attribute_id
            .max(self.taxonomies.values().map(|t| t.attribute_id.0).max().unwrap_or(0))
            + 1;
        AttributeId(self.next_attribute_id)
    }

    fn term_in(&self, taxonomy: &str, id: TermId) -> Option<&Term> {
        self.terms.get(&id).filter(|t| t.taxonomy == taxonomy)
    }
}

/// Catalog store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<CatalogState>,
    child_cache: RwLock<HashMap<ChildId, ChildRecord>>,
    hooks_suspended: Mutex<usize>,
    faults: Mutex<Vec<Fault>>,
    dropped_meta_writes: Mutex<usize>,
    calls: Mutex<Vec<StoreOp>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_state(state: CatalogState) -> Self {
        Self {
            state: RwLock::new(state),
            ..Self::default()
        }
    }

    pub(crate) fn state(&self) -> CatalogState {
        self.state.read().clone()
    }

    // Seeding helpers

    /// Insert or replace a parent record
    pub fn insert_parent(&self, parent: ParentRecord) {
        self.state.write().parents.insert(parent.id, parent);
    }

    /// Insert a child and attach it to its parent
    pub fn insert_child(&self, child: ChildRecord) {
        let mut state = self.state.write();
        if let Some(parent) = state.parents.get_mut(&child.parent_id) {
            if !parent.children.contains(&child.id) {
                parent.children.push(child.id);
            }
        }
        state.children.insert(child.id, child);
    }

    /// Create and register a taxonomy in one go
    pub fn insert_taxonomy(&self, key: &str, label: &str) -> Taxonomy {
        let mut state = self.state.write();
        if let Some(existing) = state.taxonomies.get(key) {
            return existing.clone();
        }
        let taxonomy = Taxonomy {
            attribute_id: state.next_attribute_id(),
            key: key.to_string(),
            label: label.to_string(),
            order_by: "name".to_string(),
            has_archives: false,
        };
        state.taxonomies.insert(key.to_string(), taxonomy.clone());
        state.registered.insert(key.to_string());
        taxonomy
    }

    pub fn insert_term(&self, taxonomy: &str, name: &str, term_slug: &str) -> Term {
        let mut state = self.state.write();
        let term = Term {
            id: state.next_term_id(),
            taxonomy: taxonomy.to_string(),
            name: name.to_string(),
            slug: term_slug.to_string(),
        };
        state.terms.insert(term.id, term.clone());
        term
    }

    pub fn set_native_attributes(&self, id: ChildId, attributes: BTreeMap<String, String>) {
        self.state.write().native.insert(id, attributes);
    }

    // Inspection helpers (bypass caches and call recording)

    pub fn parent(&self, id: ParentId) -> Option<ParentRecord> {
        self.state.read().parents.get(&id).cloned()
    }

    pub fn child(&self, id: ChildId) -> Option<ChildRecord> {
        self.state.read().children.get(&id).cloned()
    }

    pub fn assignment(&self, parent: ParentId, taxonomy: &str) -> Vec<TermId> {
        self.state
            .read()
            .assignments
            .get(&(parent, taxonomy.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn term_count(&self, taxonomy: &str) -> usize {
        self.state
            .read()
            .terms
            .values()
            .filter(|t| t.taxonomy == taxonomy)
            .count()
    }

    pub fn is_child_cached(&self, id: ChildId) -> bool {
        self.child_cache.read().contains_key(&id)
    }

    pub fn hooks_active(&self) -> bool {
        *self.hooks_suspended.lock() == 0
    }

    // Fault injection and call recording

    /// Make every call of `op` fail with a backend error carrying `message`
    pub fn inject_failure(&self, op: StoreOp, message: &str) {
        self.inject_failure_after(op, 0, message);
    }

    /// Let `skip` calls of `op` succeed, then fail every following one
    pub fn inject_failure_after(&self, op: StoreOp, skip: usize, message: &str) {
        self.faults.lock().push(Fault {
            op,
            skip,
            message: message.to_string(),
        });
    }

    pub fn clear_failures(&self) {
        self.faults.lock().clear();
    }

    /// Silently discard the next child meta write, as a reverting host would
    pub fn drop_next_meta_write(&self) {
        *self.dropped_meta_writes.lock() += 1;
    }

    pub fn call_count(&self, op: StoreOp) -> usize {
        self.calls.lock().iter().filter(|c| **c == op).count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn enter(&self, op: StoreOp) -> StoreResult<()> {
        self.calls.lock().push(op);

        let mut faults = self.faults.lock();
        if let Some(fault) = faults.iter_mut().find(|f| f.op == op) {
            if fault.skip > 0 {
                fault.skip -= 1;
            } else {
                return Err(StoreError::Backend(fault.message.clone()));
            }
        }
        Ok(())
    }

    fn require_registered(&self, taxonomy: &str) -> StoreResult<()> {
        if self.state.read().registered.contains(taxonomy) {
            Ok(())
        } else {
            Err(StoreError::Rejected(format!("Invalid taxonomy: {}", taxonomy)))
        }
    }

    /// Stale-object save performed by the host after child writes: the cached
    /// copy is written back over whatever was just stored.
    fn run_write_hook(&self, id: ChildId) {
        if !self.hooks_active() {
            return;
        }
        let cached = self.child_cache.read().get(&id).cloned();
        if let Some(cached) = cached {
            tracing::debug!(child_id = id.0, "store.write_hook.resave");
            self.state.write().children.insert(id, cached);
        }
    }
}

impl CatalogStore for MemoryStore {
    fn get_parent(&self, id: ParentId) -> StoreResult<Option<ParentRecord>> {
        self.enter(StoreOp::GetParent)?;
        Ok(self.state.read().parents.get(&id).cloned())
    }

    fn save_parent(&self, parent: &ParentRecord) -> StoreResult<()> {
        self.enter(StoreOp::SaveParent)?;
        let mut state = self.state.write();
        if !state.parents.contains_key(&parent.id) {
            return Err(StoreError::NotFound(format!("parent {}", parent.id)));
        }
        state.parents.insert(parent.id, parent.clone());
        Ok(())
    }

    fn children_of(&self, id: ParentId) -> StoreResult<Vec<ChildId>> {
        self.enter(StoreOp::ChildrenOf)?;
        let state = self.state.read();
        Ok(state
            .parents
            .get(&id)
            .map(|p| {
                p.children
                    .iter()
                    .copied()
                    .filter(|c| state.children.contains_key(c))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn sync_variations(&self, id: ParentId) -> StoreResult<()> {
        self.enter(StoreOp::SyncVariations)?;
        let mut state = self.state.write();
        let children: Vec<ChildId> = state
            .parents
            .get(&id)
            .map(|p| p.children.clone())
            .unwrap_or_default();

        for child_id in children {
            let snapshot: Option<BTreeMap<String, String>> =
                state.children.get(&child_id).map(|child| {
                    child
                        .meta
                        .iter()
                        .filter(|(k, v)| k.starts_with(l2g_core::normalize::CHILD_META_PREFIX) && !v.is_empty())
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                });
            if let Some(snapshot) = snapshot {
                state.native.insert(child_id, snapshot);
            }
        }
        drop(state);

        self.child_cache.write().retain(|_, child| child.parent_id != id);
        Ok(())
    }

    fn invalidate_parent_caches(&self, _id: ParentId) {
        self.calls.lock().push(StoreOp::InvalidateParentCaches);
    }

    fn parent_meta(&self, id: ParentId, key: &str) -> StoreResult<Option<Value>> {
        Ok(self
            .state
            .read()
            .parent_meta
            .get(&id)
            .and_then(|meta| meta.get(key))
            .cloned())
    }

    fn put_parent_meta(&self, id: ParentId, key: &str, value: Value) -> StoreResult<()> {
        self.enter(StoreOp::PutParentMeta)?;
        let mut state = self.state.write();
        if !state.parents.contains_key(&id) {
            return Err(StoreError::NotFound(format!("parent {}", id)));
        }
        let meta = state.parent_meta.entry(id).or_default();
        if value.is_null() {
            meta.remove(key);
        } else {
            meta.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn find_taxonomy(&self, key: &str) -> StoreResult<Option<Taxonomy>> {
        self.enter(StoreOp::FindTaxonomy)?;
        Ok(self.state.read().taxonomies.get(key).cloned())
    }

    fn taxonomy_registered(&self, key: &str) -> bool {
        self.state.read().registered.contains(key)
    }

    fn create_taxonomy(&self, request: &NewTaxonomy) -> StoreResult<Taxonomy> {
        self.enter(StoreOp::CreateTaxonomy)?;

        if request.key.trim().is_empty() {
            return Err(StoreError::Rejected("Please, provide an attribute name.".to_string()));
        }
        if request.key.len() > MAX_TAXONOMY_KEY_LEN {
            return Err(StoreError::Rejected(format!(
                "Slug \"{}\" is too long ({} characters max).",
                request.key, MAX_TAXONOMY_KEY_LEN
            )));
        }

        let mut state = self.state.write();
        if state.taxonomies.contains_key(&request.key) {
            return Err(StoreError::Conflict(format!(
                "Slug \"{}\" is already in use. Change it, please.",
                request.key
            )));
        }

        let taxonomy = Taxonomy {
            attribute_id: state.next_attribute_id(),
            key: request.key.clone(),
            label: request.label.clone(),
            order_by: request.order_by.clone(),
            has_archives: request.has_archives,
        };
        state.taxonomies.insert(request.key.clone(), taxonomy.clone());
        Ok(taxonomy)
    }

    fn register_taxonomy(&self, key: &str) -> StoreResult<()> {
        self.enter(StoreOp::RegisterTaxonomy)?;
        let mut state = self.state.write();
        if !state.taxonomies.contains_key(key) {
            return Err(StoreError::NotFound(format!("attribute {}", key)));
        }
        state.registered.insert(key.to_string());
        Ok(())
    }

    fn list_taxonomies(&self) -> StoreResult<Vec<Taxonomy>> {
        Ok(self.state.read().taxonomies.values().cloned().collect())
    }

    fn find_term_by_slug(&self, taxonomy: &str, term_slug: &str) -> StoreResult<Option<Term>> {
        self.enter(StoreOp::FindTerm)?;
        self.require_registered(taxonomy)?;
        Ok(self
            .state
            .read()
            .terms
            .values()
            .find(|t| t.taxonomy == taxonomy && t.slug == term_slug)
            .cloned())
    }

    fn get_term(&self, taxonomy: &str, id: TermId) -> StoreResult<Option<Term>> {
        self.enter(StoreOp::FindTerm)?;
        self.require_registered(taxonomy)?;
        Ok(self.state.read().term_in(taxonomy, id).cloned())
    }

    fn create_term(&self, taxonomy: &str, name: &str, term_slug: &str) -> StoreResult<Term> {
        self.enter(StoreOp::CreateTerm)?;
        self.require_registered(taxonomy)?;

        if name.trim().is_empty() {
            return Err(StoreError::Rejected("A name is required for this term.".to_string()));
        }
        let term_slug = if term_slug.trim().is_empty() {
            slug(name)
        } else {
            term_slug.to_string()
        };
        if term_slug.is_empty() {
            return Err(StoreError::Rejected(format!("Cannot derive a slug from \"{}\"", name)));
        }

        let mut state = self.state.write();
        if state
            .terms
            .values()
            .any(|t| t.taxonomy == taxonomy && t.slug == term_slug)
        {
            return Err(StoreError::Conflict(format!(
                "A term with the name provided already exists in this taxonomy: {}",
                term_slug
            )));
        }

        let term = Term {
            id: state.next_term_id(),
            taxonomy: taxonomy.to_string(),
            name: name.trim().to_string(),
            slug: term_slug,
        };
        state.terms.insert(term.id, term.clone());
        Ok(term)
    }

    fn list_terms(&self, taxonomy: &str) -> StoreResult<Vec<Term>> {
        self.require_registered(taxonomy)?;
        Ok(self
            .state
            .read()
            .terms
            .values()
            .filter(|t| t.taxonomy == taxonomy)
            .cloned()
            .collect())
    }

    fn assigned_terms(&self, parent: ParentId, taxonomy: &str) -> StoreResult<Vec<Term>> {
        let state = self.state.read();
        Ok(state
            .assignments
            .get(&(parent, taxonomy.to_string()))
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.term_in(taxonomy, *id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn assign_terms(&self, parent: ParentId, taxonomy: &str, terms: &[TermId]) -> StoreResult<()> {
        self.enter(StoreOp::AssignTerms)?;
        self.require_registered(taxonomy)?;

        let mut state = self.state.write();
        if !state.parents.contains_key(&parent) {
            return Err(StoreError::NotFound(format!("parent {}", parent)));
        }
        if let Some(bad) = terms.iter().find(|id| state.term_in(taxonomy, **id).is_none()) {
            return Err(StoreError::Rejected(format!(
                "Term {} does not belong to {}",
                bad, taxonomy
            )));
        }

        let mut ids: Vec<TermId> = Vec::with_capacity(terms.len());
        for id in terms {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        state.assignments.insert((parent, taxonomy.to_string()), ids);
        Ok(())
    }

    fn get_child(&self, id: ChildId) -> StoreResult<Option<ChildRecord>> {
        self.enter(StoreOp::GetChild)?;

        if let Some(cached) = self.child_cache.read().get(&id) {
            return Ok(Some(cached.clone()));
        }

        let child = self.state.read().children.get(&id).cloned();
        if let Some(child) = &child {
            self.child_cache.write().insert(id, child.clone());
        }
        Ok(child)
    }

    fn child_meta(&self, id: ChildId, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .get_child(id)?
            .and_then(|child| child.meta.get(key).cloned()))
    }

    fn put_child_meta(&self, id: ChildId, key: &str, value: &str) -> StoreResult<()> {
        self.enter(StoreOp::PutChildMeta)?;

        {
            let mut dropped = self.dropped_meta_writes.lock();
            if *dropped > 0 {
                *dropped -= 1;
                return Ok(());
            }
        }

        {
            let mut state = self.state.write();
            let child = state
                .children
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(format!("child {}", id)))?;
            child.meta.insert(key.to_string(), value.to_string());
        }

        self.run_write_hook(id);
        Ok(())
    }

    fn delete_child_meta(&self, id: ChildId, key: &str) -> StoreResult<()> {
        self.enter(StoreOp::DeleteChildMeta)?;

        {
            let mut state = self.state.write();
            let child = state
                .children
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(format!("child {}", id)))?;
            child.meta.remove(key);
        }

        self.run_write_hook(id);
        Ok(())
    }

    fn set_child_attributes(&self, id: ChildId, attributes: &BTreeMap<String, String>) -> StoreResult<()> {
        self.enter(StoreOp::SetChildAttributes)?;

        {
            let mut state = self.state.write();
            let child = state
                .children
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(format!("child {}", id)))?;
            child.attributes = attributes.clone();
        }

        self.run_write_hook(id);
        Ok(())
    }

    fn native_attributes(&self, id: ChildId) -> StoreResult<BTreeMap<String, String>> {
        self.enter(StoreOp::NativeAttributes)?;
        Ok(self.state.read().native.get(&id).cloned().unwrap_or_default())
    }

    fn suspend_write_hooks(&self) {
        *self.hooks_suspended.lock() += 1;
    }

    fn resume_write_hooks(&self) {
        let mut suspended = self.hooks_suspended.lock();
        *suspended = suspended.saturating_sub(1);
    }

    fn invalidate_child_caches(&self, id: ChildId) {
        self.calls.lock().push(StoreOp::InvalidateChildCaches);
        self.child_cache.write().remove(&id);
    }
}
