//! Idempotent resolution of shared attributes and their terms.
//!
//! A [`ResolverCache`] is created once per invocation and handed to every
//! call, so an attribute or term referenced several times in one run is
//! created at most once.

use l2g_core::config::TaxonomyConfig;
use l2g_core::normalize::{slug, taxonomy_key};
use l2g_core::{AttributeArgs, AttributeId, NewTaxonomy, ResolvedTerm, TermId, TermMapping};
use l2g_storage::{CatalogStore, StoreError};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{0}")]
    AttributeMissing(String),

    #[error("Term \"{slug}\" does not exist in {taxonomy} and is not marked for creation")]
    TermMissing { taxonomy: String, slug: String },

    #[error("Term for local value \"{0}\" has no usable key")]
    InvalidTermKey(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResolveError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ResolveError::Store(e) if e.is_conflict())
    }
}

/// Identity of a resolved shared attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttribute {
    pub attribute_id: AttributeId,
    pub taxonomy_key: String,
    pub created: bool,
}

#[derive(Debug, Clone)]
struct CachedTerm {
    id: TermId,
    slug: String,
    created: bool,
}

/// Per-invocation memo of resolved attributes and terms
#[derive(Debug, Default)]
pub struct ResolverCache {
    attributes: HashMap<String, ResolvedAttribute>,
    terms: HashMap<(String, String), CachedTerm>,
}

impl ResolverCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(&self, taxonomy: &str) -> Option<&ResolvedAttribute> {
        self.attributes.get(taxonomy)
    }

    pub fn term(&self, taxonomy: &str, slug: &str) -> Option<TermId> {
        self.terms
            .get(&(taxonomy.to_string(), slug.to_string()))
            .map(|t| t.id)
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    fn put_term(&mut self, taxonomy: &str, key: &str, term: CachedTerm) {
        self.terms.insert((taxonomy.to_string(), key.to_string()), term);
    }
}

/// Resolves and, when allowed, creates attributes and terms in a store
pub struct TermResolver<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
    config: &'a TaxonomyConfig,
}

impl<'a, S: CatalogStore + ?Sized> TermResolver<'a, S> {
    pub fn new(store: &'a S, config: &'a TaxonomyConfig) -> Self {
        Self { store, config }
    }

    /// Normalize a raw taxonomy identifier with the configured prefix
    pub fn taxonomy_key(&self, raw: &str) -> String {
        taxonomy_key(raw, &self.config.prefix)
    }

    pub fn ensure_attribute(
        &self,
        cache: &mut ResolverCache,
        raw_key: &str,
        label: &str,
        create_if_missing: bool,
        args: &AttributeArgs,
    ) -> Result<ResolvedAttribute, ResolveError> {
        let key = self.taxonomy_key(raw_key);
        if key.is_empty() {
            return Err(ResolveError::AttributeMissing(format!(
                "Invalid taxonomy key \"{}\"",
                raw_key
            )));
        }

        if let Some(cached) = cache.attribute(&key) {
            tracing::debug!(taxonomy = %key, source = "cache", "attribute.reuse");
            return Ok(cached.clone());
        }

        let resolved = match self.store.find_taxonomy(&key)? {
            Some(existing) => {
                if !self.store.taxonomy_registered(&key) {
                    self.store.register_taxonomy(&key)?;
                }
                tracing::info!(
                    taxonomy = %key,
                    attribute_id = existing.attribute_id.0,
                    "attribute.reuse"
                );
                ResolvedAttribute {
                    attribute_id: existing.attribute_id,
                    taxonomy_key: key.clone(),
                    created: false,
                }
            }
            None if !create_if_missing => {
                return Err(ResolveError::AttributeMissing(format!(
                    "Attribute {} does not exist and creation is disabled",
                    key
                )));
            }
            None => {
                let bare = key.strip_prefix(&self.config.prefix).unwrap_or(&key);
                let label = if label.trim().is_empty() { bare } else { label.trim() };
                let request = NewTaxonomy {
                    key: key.clone(),
                    label: label.to_string(),
                    order_by: args
                        .order_by
                        .clone()
                        .unwrap_or_else(|| self.config.default_order_by.clone()),
                    has_archives: args.enable_archive.unwrap_or(self.config.enable_archives),
                };
                let created = self.store.create_taxonomy(&request)?;
                self.store.register_taxonomy(&created.key)?;
                tracing::info!(
                    taxonomy = %key,
                    attribute_id = created.attribute_id.0,
                    label = %request.label,
                    "attribute.created"
                );
                ResolvedAttribute {
                    attribute_id: created.attribute_id,
                    taxonomy_key: key.clone(),
                    created: true,
                }
            }
        };

        cache.attributes.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Resolve every mapping in order; the first failure aborts.
    ///
    /// `allow_creation` is the run-level default that also permits creating
    /// terms not individually marked `create`.
    pub fn ensure_terms(
        &self,
        cache: &mut ResolverCache,
        raw_key: &str,
        mappings: &[TermMapping],
        allow_creation: bool,
    ) -> Result<Vec<ResolvedTerm>, ResolveError> {
        let taxonomy = self.taxonomy_key(raw_key);
        let mut resolved = Vec::with_capacity(mappings.len());

        for mapping in mappings {
            let desired = match slug(&mapping.desired_term_key) {
                s if s.is_empty() => slug(&mapping.local_value),
                s => s,
            };
            if desired.is_empty() {
                return Err(ResolveError::InvalidTermKey(mapping.local_value.clone()));
            }

            let term = self.resolve_one(cache, &taxonomy, &desired, mapping, allow_creation)?;
            resolved.push(ResolvedTerm {
                local_value: mapping.local_value.clone(),
                term_id: term.id,
                term_key: term.slug.clone(),
                created: term.created,
            });
        }

        Ok(resolved)
    }

    fn resolve_one(
        &self,
        cache: &mut ResolverCache,
        taxonomy: &str,
        desired: &str,
        mapping: &TermMapping,
        allow_creation: bool,
    ) -> Result<CachedTerm, ResolveError> {
        if let Some(cached) = cache.terms.get(&(taxonomy.to_string(), desired.to_string())) {
            tracing::info!(taxonomy, slug = %cached.slug, term_id = cached.id.0, source = "cache", "term.reuse");
            return Ok(cached.clone());
        }

        let mut found = None;
        if let Some(id) = mapping.term_id {
            if let Some(term) = self.store.get_term(taxonomy, id)? {
                tracing::info!(taxonomy, slug = %term.slug, term_id = term.id.0, source = "id", "term.reuse");
                found = Some(term);
            }
        }
        if found.is_none() {
            if let Some(term) = self.store.find_term_by_slug(taxonomy, desired)? {
                tracing::info!(taxonomy, slug = %term.slug, term_id = term.id.0, source = "lookup", "term.reuse");
                found = Some(term);
            }
        }

        let result = match found {
            Some(term) => CachedTerm {
                id: term.id,
                slug: term.slug,
                created: false,
            },
            None if mapping.create || allow_creation => {
                let term = self.store.create_term(taxonomy, mapping.display_name(), desired)?;
                tracing::info!(
                    taxonomy,
                    slug = %term.slug,
                    term_id = term.id.0,
                    local_value = %mapping.local_value,
                    "term.created"
                );
                CachedTerm {
                    id: term.id,
                    slug: term.slug,
                    created: true,
                }
            }
            None => {
                return Err(ResolveError::TermMissing {
                    taxonomy: taxonomy.to_string(),
                    slug: desired.to_string(),
                });
            }
        };

        cache.put_term(taxonomy, &result.slug, result.clone());
        if result.slug != desired {
            cache.put_term(taxonomy, desired, result.clone());
        }
        Ok(result)
    }
}
