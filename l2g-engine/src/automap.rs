//! Default mapping suggestions built from discovery and similarity
//!
//! This is the caller-facing layer in front of planning: it proposes a
//! mapping, the caller reviews it, and only then is it planned or applied.

use crate::discovery::discover_in;
use crate::similarity::{best_match, Candidate};
use l2g_core::config::{MatchingConfig, TaxonomyConfig};
use l2g_core::normalize::{slug, taxonomy_key};
use l2g_core::{AttributeMapping, LocalAttribute, ParentRecord, TargetAttribute, Taxonomy, Term, TermMapping};
use l2g_storage::{CatalogStore, StoreResult};

pub struct AutoMapper<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
    taxonomy: &'a TaxonomyConfig,
    matching: &'a MatchingConfig,
}

impl<'a, S: CatalogStore + ?Sized> AutoMapper<'a, S> {
    pub fn new(store: &'a S, taxonomy: &'a TaxonomyConfig, matching: &'a MatchingConfig) -> Self {
        Self {
            store,
            taxonomy,
            matching,
        }
    }

    /// One suggested mapping per free-text attribute of `parent`
    pub fn suggest(&self, parent: &ParentRecord) -> StoreResult<Vec<AttributeMapping>> {
        let locals = discover_in(self.store, parent)?;
        let taxonomies = self.store.list_taxonomies()?;

        locals
            .into_iter()
            .map(|local| self.suggest_one(local, &taxonomies))
            .collect()
    }

    fn suggest_one(&self, local: LocalAttribute, taxonomies: &[Taxonomy]) -> StoreResult<AttributeMapping> {
        let candidates: Vec<Candidate> = taxonomies
            .iter()
            .map(|t| {
                let bare = t.key.strip_prefix(self.taxonomy.prefix.as_str()).unwrap_or(t.key.as_str());
                Candidate::new(bare, t.label.as_str())
            })
            .collect();

        let matched = best_match(&local.name, &candidates)
            .filter(|m| m.accepted(self.matching.attribute_threshold))
            .and_then(|m| taxonomies.get(m.index));

        let (target, create_attribute) = match matched {
            Some(taxonomy) => (
                TargetAttribute {
                    taxonomy_key: taxonomy.key.clone(),
                    label: taxonomy.label.clone(),
                    exists: true,
                },
                false,
            ),
            None => (
                TargetAttribute {
                    taxonomy_key: taxonomy_key(&local.name, &self.taxonomy.prefix),
                    label: local.label.clone(),
                    exists: false,
                },
                true,
            ),
        };

        let existing_terms: Vec<Term> = if target.exists && self.store.taxonomy_registered(&target.taxonomy_key) {
            self.store.list_terms(&target.taxonomy_key)?
        } else {
            Vec::new()
        };

        tracing::debug!(
            local_attribute = %local.name,
            taxonomy = %target.taxonomy_key,
            exists = target.exists,
            "automap.attribute"
        );

        let terms = local
            .values
            .iter()
            .map(|value| self.suggest_term(value, &existing_terms))
            .collect();

        Ok(AttributeMapping {
            local,
            target,
            create_attribute_if_missing: create_attribute,
            terms,
            attribute_args: Default::default(),
        })
    }

    fn suggest_term(&self, value: &str, existing: &[Term]) -> TermMapping {
        let candidates: Vec<Candidate> = existing
            .iter()
            .map(|t| Candidate::new(t.slug.as_str(), t.name.as_str()))
            .collect();

        let matched = best_match(value, &candidates)
            .filter(|m| m.accepted(self.matching.term_threshold))
            .and_then(|m| existing.get(m.index));

        match matched {
            Some(term) => {
                let mut mapping = TermMapping::new(value, term.slug.as_str(), false);
                mapping.term_id = Some(term.id);
                mapping
            }
            None => TermMapping::new(value, slug(value), true),
        }
    }
}
