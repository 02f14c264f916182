//! JSON catalog files.
//!
//! A snapshot is the human-editable form of a whole catalog: taxonomies with
//! their terms, and parents with their attributes, term assignments and
//! children. Attributes may use the legacy flat shape; they are converted to
//! canonical definitions on load.

use crate::memory::{CatalogState, MemoryStore};
use indexmap::IndexMap;
use l2g_core::normalize::slug;
use l2g_core::{
    AttributeDefinition, AttributeId, ChildId, ChildRecord, L2gError, L2gResult, ParentId,
    ParentRecord, ProductKind, RawAttribute, Taxonomy, Term, TermId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub taxonomies: Vec<TaxonomyDocument>,
    #[serde(default)]
    pub parents: Vec<ParentDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyDocument {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_id: Option<AttributeId>,
    #[serde(default = "default_order_by")]
    pub order_by: String,
    #[serde(default)]
    pub has_archives: bool,
    #[serde(default)]
    pub terms: Vec<TermDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TermId>,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentDocument {
    pub id: ParentId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub kind: ProductKind,
    #[serde(default)]
    pub attributes: IndexMap<String, RawAttribute>,
    /// Taxonomy key to assigned term slugs
    #[serde(default)]
    pub assigned_terms: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
    #[serde(default)]
    pub children: Vec<ChildDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildDocument {
    pub id: ChildId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_attributes: Option<BTreeMap<String, String>>,
}

fn default_order_by() -> String {
    "name".to_string()
}

impl Snapshot {
    pub fn load<P: AsRef<Path>>(path: P) -> L2gResult<Snapshot> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> L2gResult<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Build a store from this snapshot.
    ///
    /// Missing term ids and attribute ids are allocated; missing slugs are
    /// derived from the term name. Every listed taxonomy is registered.
    pub fn into_store(self) -> L2gResult<MemoryStore> {
        let mut state = CatalogState::default();

        let mut next_attribute = self
            .taxonomies
            .iter()
            .filter_map(|t| t.attribute_id.map(|id| id.0))
            .max()
            .unwrap_or(0);
        let mut next_term = self
            .taxonomies
            .iter()
            .flat_map(|t| t.terms.iter().filter_map(|term| term.id.map(|id| id.0)))
            .max()
            .unwrap_or(0);

        for doc in self.taxonomies {
            if state.taxonomies.contains_key(&doc.key) {
                return Err(L2gError::InvalidInput(format!("duplicate taxonomy {}", doc.key)));
            }

            let attribute_id = doc.attribute_id.unwrap_or_else(|| {
                next_attribute += 1;
                AttributeId(next_attribute)
            });

            for term in doc.terms {
                let id = term.id.unwrap_or_else(|| {
                    next_term += 1;
                    TermId(next_term)
                });
                if state.terms.contains_key(&id) {
                    return Err(L2gError::InvalidInput(format!("duplicate term id {}", id)));
                }
                let term_slug = if term.slug.is_empty() { slug(&term.name) } else { term.slug };
                state.terms.insert(
                    id,
                    Term {
                        id,
                        taxonomy: doc.key.clone(),
                        name: term.name,
                        slug: term_slug,
                    },
                );
            }

            state.registered.insert(doc.key.clone());
            state.taxonomies.insert(
                doc.key.clone(),
                Taxonomy {
                    attribute_id,
                    key: doc.key,
                    label: doc.label,
                    order_by: doc.order_by,
                    has_archives: doc.has_archives,
                },
            );
        }

        for doc in self.parents {
            let parent_id = doc.id;
            if state.parents.contains_key(&parent_id) {
                return Err(L2gError::InvalidInput(format!("duplicate parent {}", parent_id)));
            }

            for (taxonomy, slugs) in &doc.assigned_terms {
                let mut ids = Vec::new();
                for term_slug in slugs {
                    let term = state
                        .terms
                        .values()
                        .find(|t| &t.taxonomy == taxonomy && &t.slug == term_slug)
                        .ok_or_else(|| {
                            L2gError::NotFound(format!("term {} in {}", term_slug, taxonomy))
                        })?;
                    ids.push(term.id);
                }
                state.assignments.insert((parent_id, taxonomy.clone()), ids);
            }

            let mut attributes = IndexMap::new();
            for (_, raw) in doc.attributes {
                let definition = match raw.into_definition() {
                    AttributeDefinition::Taxonomy {
                        attribute_id,
                        taxonomy,
                        options,
                        visible,
                        variation,
                        position,
                    } => {
                        // Legacy entries leave ids to the catalog
                        let attribute_id = if attribute_id.0 == 0 {
                            state
                                .taxonomies
                                .get(&taxonomy)
                                .map(|t| t.attribute_id)
                                .unwrap_or_default()
                        } else {
                            attribute_id
                        };
                        let options = if options.is_empty() {
                            state
                                .assignments
                                .get(&(parent_id, taxonomy.clone()))
                                .cloned()
                                .unwrap_or_default()
                        } else {
                            options
                        };
                        AttributeDefinition::Taxonomy {
                            attribute_id,
                            taxonomy,
                            options,
                            visible,
                            variation,
                            position,
                        }
                    }
                    free_text => free_text,
                };
                let key = attribute_key(&definition);
                attributes.insert(key, definition);
            }

            let mut children = Vec::with_capacity(doc.children.len());
            for child in doc.children {
                if let Some(native) = child.native_attributes {
                    state.native.insert(child.id, native);
                }
                children.push(child.id);
                state.children.insert(
                    child.id,
                    ChildRecord {
                        id: child.id,
                        parent_id,
                        title: child.title,
                        sku: child.sku,
                        meta: child.meta,
                        attributes: child.attributes,
                    },
                );
            }

            if !doc.meta.is_empty() {
                state
                    .parent_meta
                    .insert(parent_id, doc.meta.into_iter().collect());
            }

            state.parents.insert(
                parent_id,
                ParentRecord {
                    id: parent_id,
                    title: doc.title,
                    kind: doc.kind,
                    attributes,
                    children,
                },
            );
        }

        Ok(MemoryStore::from_state(state))
    }

    /// Capture the current contents of a store
    pub fn from_store(store: &MemoryStore) -> Snapshot {
        let state = store.state();

        let taxonomies: Vec<TaxonomyDocument> = state
            .taxonomies
            .values()
            .map(|t| TaxonomyDocument {
                key: t.key.clone(),
                label: t.label.clone(),
                attribute_id: Some(t.attribute_id),
                order_by: t.order_by.clone(),
                has_archives: t.has_archives,
                terms: state
                    .terms
                    .values()
                    .filter(|term| term.taxonomy == t.key)
                    .map(|term| TermDocument {
                        id: Some(term.id),
                        name: term.name.clone(),
                        slug: term.slug.clone(),
                    })
                    .collect(),
            })
            .collect();

        let parents: Vec<ParentDocument> = state
            .parents
            .values()
            .map(|parent| {
                let assigned_terms: BTreeMap<String, Vec<String>> = state
                    .assignments
                    .iter()
                    .filter(|((pid, _), _)| *pid == parent.id)
                    .map(|((_, taxonomy), ids)| {
                        let slugs: Vec<String> = ids
                            .iter()
                            .filter_map(|id| state.terms.get(id).map(|t| t.slug.clone()))
                            .collect();
                        (taxonomy.clone(), slugs)
                    })
                    .collect();

                let children: Vec<ChildDocument> = parent
                    .children
                    .iter()
                    .filter_map(|id| state.children.get(id))
                    .map(|child| ChildDocument {
                        id: child.id,
                        title: child.title.clone(),
                        sku: child.sku.clone(),
                        meta: child.meta.clone(),
                        attributes: child.attributes.clone(),
                        native_attributes: state.native.get(&child.id).cloned(),
                    })
                    .collect();

                ParentDocument {
                    id: parent.id,
                    title: parent.title.clone(),
                    kind: parent.kind,
                    attributes: parent
                        .attributes
                        .iter()
                        .map(|(k, def)| (k.clone(), RawAttribute::Typed(def.clone())))
                        .collect(),
                    assigned_terms,
                    meta: state
                        .parent_meta
                        .get(&parent.id)
                        .map(|m| m.clone().into_iter().collect())
                        .unwrap_or_default(),
                    children,
                }
            })
            .collect();

        Snapshot { taxonomies, parents }
    }
}

/// Map key of a parent attribute: taxonomy key, or slug of the free-text name
pub fn attribute_key(definition: &AttributeDefinition) -> String {
    match definition {
        AttributeDefinition::Taxonomy { taxonomy, .. } => taxonomy.clone(),
        AttributeDefinition::FreeText { name, .. } => slug(name),
    }
}
