//! Apply: resolve, rewrite the parent, assign terms, remap children.
//!
//! Each attribute mapping is all-or-nothing up to the point where it is
//! recorded. Finalization (assignment, child remapping, save, sync) runs only
//! once every mapping resolved, and is best effort: a failure there surfaces
//! as [`MappingError::ApplyFailed`] after earlier steps may have persisted.

use crate::backup;
use crate::error::MappingError;
use crate::remap::{ChildRemapper, RemapJob};
use crate::report::MigrationReport;
use crate::resolver::{ResolverCache, TermResolver};
use indexmap::IndexMap;
use l2g_core::normalize::slug;
use l2g_core::{AttributeDefinition, AttributeMapping, Config, ParentRecord, TermId};
use l2g_storage::CatalogStore;
use serde::{Deserialize, Serialize};

/// Per-call overrides of the `[apply]` configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOptions {
    #[serde(default)]
    pub auto_create_terms: Option<bool>,
    #[serde(default)]
    pub create_backup: Option<bool>,
    /// Reuse a caller-provided correlation id
    #[serde(default)]
    pub corr_id: Option<String>,
}

impl ApplyOptions {
    pub fn auto_create(mut self, enabled: bool) -> Self {
        self.auto_create_terms = Some(enabled);
        self
    }

    pub fn backup(mut self, enabled: bool) -> Self {
        self.create_backup = Some(enabled);
        self
    }
}

/// Work recorded per mapping and carried out during finalization
#[derive(Debug, Default)]
struct PendingWork {
    assignments: IndexMap<String, Vec<TermId>>,
    jobs: Vec<RemapJob>,
}

pub struct Executor<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
    config: &'a Config,
    auto_create_terms: bool,
    create_backup: bool,
}

impl<'a, S: CatalogStore + ?Sized> Executor<'a, S> {
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self {
            store,
            config,
            auto_create_terms: config.apply.auto_create_terms,
            create_backup: config.apply.create_backup,
        }
    }

    /// Apply the config defaults overridden by `options`
    pub fn with_options(mut self, options: &ApplyOptions) -> Self {
        if let Some(auto) = options.auto_create_terms {
            self.auto_create_terms = auto;
        }
        if let Some(backup) = options.create_backup {
            self.create_backup = backup;
        }
        self
    }

    pub fn apply(&self, mut parent: ParentRecord, mappings: &[AttributeMapping]) -> Result<MigrationReport, MappingError> {
        let mut report = MigrationReport::default();

        if self.create_backup {
            let id = backup::create(self.store, &parent).map_err(|e| MappingError::apply_failed(e.to_string()))?;
            report.backup_id = Some(id);
        }

        let resolver = TermResolver::new(self.store, &self.config.taxonomy);
        let mut cache = ResolverCache::new();
        let mut pending = PendingWork::default();

        for mapping in mappings {
            self.apply_mapping(&resolver, &mut cache, &mut parent, mapping, &mut report, &mut pending)?;
        }

        self.finalize(&parent, pending, &mut report)?;
        Ok(report)
    }

    fn apply_mapping(
        &self,
        resolver: &TermResolver<'_, S>,
        cache: &mut ResolverCache,
        parent: &mut ParentRecord,
        mapping: &AttributeMapping,
        report: &mut MigrationReport,
        pending: &mut PendingWork,
    ) -> Result<(), MappingError> {
        let local_name = mapping.local.name.trim();
        if local_name.is_empty() {
            return Err(MappingError::Validation("Local attribute name is required".to_string()));
        }
        let key = resolver.taxonomy_key(&mapping.target.taxonomy_key);
        if key.is_empty() {
            return Err(MappingError::Validation(format!(
                "Target taxonomy is required for local attribute \"{}\"",
                local_name
            )));
        }

        let Some(index) = find_definition(parent, local_name, &key) else {
            return Err(MappingError::AttributeMissing(format!(
                "Local attribute \"{}\" not found on product {}",
                local_name, parent.id
            )));
        };

        let attribute = resolver
            .ensure_attribute(
                cache,
                &key,
                mapping.target_label(),
                mapping.create_attribute_if_missing,
                &mapping.attribute_args,
            )
            .map_err(|e| MappingError::AttributeMissing(e.to_string()))?;

        let resolved = resolver
            .ensure_terms(cache, &key, &mapping.terms, self.auto_create_terms)
            .map_err(|e| MappingError::TermsMissing {
                conflict: e.is_conflict(),
                message: format!("Failed to resolve terms for {}: {}", key, e),
            })?;

        let mut term_ids: Vec<TermId> = Vec::with_capacity(resolved.len());
        for term in &resolved {
            if !term_ids.contains(&term.term_id) {
                term_ids.push(term.term_id);
            }
        }
        if term_ids.is_empty() {
            return Err(MappingError::Validation(format!(
                "No terms resolved for local attribute \"{}\"",
                local_name
            )));
        }

        let (previous_key, previous) = match parent.attributes.get_index(index) {
            Some((k, d)) => (k.clone(), d.clone()),
            None => {
                return Err(MappingError::AttributeMissing(format!(
                    "Local attribute \"{}\" not found on product {}",
                    local_name, parent.id
                )))
            }
        };

        let replacement = AttributeDefinition::Taxonomy {
            attribute_id: attribute.attribute_id,
            taxonomy: key.clone(),
            options: term_ids.clone(),
            visible: previous.visible(),
            variation: previous.variation(),
            position: previous.position(),
        };
        let mut rebuilt = IndexMap::with_capacity(parent.attributes.len());
        for (i, (k, definition)) in parent.attributes.drain(..).enumerate() {
            if i == index {
                rebuilt.insert(key.clone(), replacement.clone());
            } else if k != key {
                rebuilt.insert(k, definition);
            }
        }
        parent.attributes = rebuilt;

        tracing::info!(
            parent_id = parent.id.0,
            local_attribute = %local_name,
            previous_key = %previous_key,
            taxonomy = %key,
            attribute_id = attribute.attribute_id.0,
            terms = term_ids.len(),
            "apply.attribute_replaced"
        );

        let mut job = RemapJob::new(key.clone(), local_name);
        for term in &resolved {
            job.map_value(&term.local_value, &term.term_key);
            report.record_term(&key, &term.term_key, term.created);
        }
        job.options = if previous.text_options().is_empty() {
            mapping.local.values.clone()
        } else {
            previous.text_options().to_vec()
        };
        pending.jobs.push(job);

        let assigned = pending.assignments.entry(key.clone()).or_default();
        for id in term_ids {
            if !assigned.contains(&id) {
                assigned.push(id);
            }
        }
        if !report.updated_attributes.contains(&key) {
            report.updated_attributes.push(key);
        }
        Ok(())
    }

    fn finalize(&self, parent: &ParentRecord, pending: PendingWork, report: &mut MigrationReport) -> Result<(), MappingError> {
        let mut failures = Vec::new();
        for (taxonomy, ids) in &pending.assignments {
            if let Err(e) = self.store.assign_terms(parent.id, taxonomy, ids) {
                failures.push(format!("{}: {}", taxonomy, e));
            }
        }
        if !failures.is_empty() {
            return Err(MappingError::TermAssignment(format!(
                "Failed to assign terms: {}",
                failures.join("; ")
            )));
        }

        let remapper = ChildRemapper::new(&self.config.inference);
        for job in &pending.jobs {
            let stats = remapper
                .run(self.store, parent, job)
                .map_err(|e| MappingError::apply_failed(e.to_string()))?;
            match report.per_child_stats.get_mut(&job.taxonomy) {
                Some(existing) => existing.merge(&stats),
                None => {
                    report.per_child_stats.insert(job.taxonomy.clone(), stats);
                }
            }
        }

        self.store
            .save_parent(parent)
            .map_err(|e| MappingError::apply_failed(e.to_string()))?;
        if parent.is_variable() && self.config.apply.sync_variations {
            self.store
                .sync_variations(parent.id)
                .map_err(|e| MappingError::apply_failed(e.to_string()))?;
        }
        self.store.invalidate_parent_caches(parent.id);
        Ok(())
    }
}

/// Index of the free-text definition named `local_name`, else of an already
/// migrated definition for `taxonomy`
fn find_definition(parent: &ParentRecord, local_name: &str, taxonomy: &str) -> Option<usize> {
    let wanted = slug(local_name);
    parent
        .attributes
        .values()
        .position(|d| !d.is_taxonomy() && slug(d.name()) == wanted)
        .or_else(|| {
            parent
                .attributes
                .values()
                .position(|d| d.is_taxonomy() && d.name() == taxonomy)
        })
}
