//! Caller-facing facade over the engine.
//!
//! Every operation gets a correlation id, runs inside an
//! [`OperationScope`] so every event it emits carries that id, and reports
//! failures as [`ApiError`].

use crate::automap::AutoMapper;
use crate::backup::{self, Backup};
use crate::catalog::{self, TermSummary};
use crate::discovery;
use crate::error::MappingError;
use crate::executor::{ApplyOptions, Executor};
use crate::planner::Planner;
use crate::remap::{ChildRemapper, RemapJob};
use crate::report::{MigrationPreview, MigrationReport, ResyncReport};
use l2g_core::audit::OperationScope;
use l2g_core::normalize::taxonomy_key;
use l2g_core::{ApiError, AttributeDefinition, AttributeMapping, Config, LocalAttribute, ParentId, ParentRecord};
use l2g_storage::{CatalogStore, StoreError};
use uuid::Uuid;

/// Fresh correlation id: `l2g_` followed by a v4 UUID in simple form
pub fn new_corr_id() -> String {
    format!("l2g_{}", Uuid::new_v4().simple())
}

fn store_failure(e: StoreError) -> MappingError {
    MappingError::apply_failed(e.to_string())
}

pub struct MappingService<S: CatalogStore> {
    store: S,
    config: Config,
}

impl<S: CatalogStore> MappingService<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn discover(&self, parent_id: ParentId) -> Result<Vec<LocalAttribute>, ApiError> {
        let corr_id = new_corr_id();
        OperationScope::new(corr_id.as_str(), parent_id.0, "discover").run(|| {
            let result = validate_id(parent_id)
                .and_then(|_| discovery::discover(&self.store, parent_id).map_err(store_failure));
            result.map_err(|e| self.reject(&corr_id, e))
        })
    }

    pub fn suggest(&self, parent_id: ParentId) -> Result<Vec<AttributeMapping>, ApiError> {
        let corr_id = new_corr_id();
        OperationScope::new(corr_id.as_str(), parent_id.0, "suggest").run(|| {
            let result = self.load_parent(parent_id).and_then(|parent| {
                AutoMapper::new(&self.store, &self.config.taxonomy, &self.config.matching)
                    .suggest(&parent)
                    .map_err(store_failure)
            });
            result.map_err(|e| self.reject(&corr_id, e))
        })
    }

    pub fn plan(&self, parent_id: ParentId, mappings: &[AttributeMapping]) -> Result<MigrationPreview, ApiError> {
        self.plan_with(parent_id, mappings, &ApplyOptions::default())
    }

    /// Dry run; never writes to the store
    pub fn plan_with(
        &self,
        parent_id: ParentId,
        mappings: &[AttributeMapping],
        options: &ApplyOptions,
    ) -> Result<MigrationPreview, ApiError> {
        let corr_id = options.corr_id.clone().unwrap_or_else(new_corr_id);
        OperationScope::new(corr_id.as_str(), parent_id.0, "plan").run(|| {
            tracing::info!(mappings = mappings.len(), dry_run = true, "map.request_received");

            let auto_create = options
                .auto_create_terms
                .unwrap_or(self.config.apply.auto_create_terms);
            let result = self.load_parent(parent_id).and_then(|parent| {
                validate_mappings(mappings)?;
                Planner::new(&self.store, &self.config)
                    .plan(&parent, mappings, auto_create)
                    .map_err(store_failure)
            });

            match result {
                Ok(mut preview) => {
                    preview.corr_id = corr_id.clone();
                    Ok(preview)
                }
                Err(e) => Err(self.reject(&corr_id, e)),
            }
        })
    }

    pub fn apply(&self, parent_id: ParentId, mappings: &[AttributeMapping]) -> Result<MigrationReport, ApiError> {
        self.apply_with(parent_id, mappings, ApplyOptions::default())
    }

    pub fn apply_with(
        &self,
        parent_id: ParentId,
        mappings: &[AttributeMapping],
        options: ApplyOptions,
    ) -> Result<MigrationReport, ApiError> {
        let corr_id = options.corr_id.clone().unwrap_or_else(new_corr_id);
        OperationScope::new(corr_id.as_str(), parent_id.0, "apply").run(|| {
            tracing::info!(mappings = mappings.len(), dry_run = false, "map.request_received");

            let result = self.load_parent(parent_id).and_then(|parent| {
                validate_mappings(mappings)?;
                Executor::new(&self.store, &self.config)
                    .with_options(&options)
                    .apply(parent, mappings)
            });

            match result {
                Ok(mut report) => {
                    report.corr_id = corr_id.clone();
                    tracing::info!(
                        attributes = report.updated_attributes.len(),
                        created_terms = report.created_count(),
                        "apply.completed"
                    );
                    Ok(report)
                }
                Err(e) => Err(self.reject(&corr_id, e)),
            }
        })
    }

    /// Re-run child remapping for taxonomies already on the parent, using
    /// the parent's assigned terms as the slug map.
    ///
    /// `taxonomies` limits the run; unknown keys are ignored.
    pub fn resync_children(&self, parent_id: ParentId, taxonomies: Option<&[String]>) -> Result<ResyncReport, ApiError> {
        let corr_id = new_corr_id();
        OperationScope::new(corr_id.as_str(), parent_id.0, "resync").run(|| {
            tracing::info!(filter = ?taxonomies, "resync.request");
            let result = self
                .load_parent(parent_id)
                .and_then(|parent| self.resync(&parent, taxonomies).map_err(store_failure));
            match result {
                Ok(mut report) => {
                    report.corr_id = corr_id.clone();
                    Ok(report)
                }
                Err(e) => Err(self.reject(&corr_id, e)),
            }
        })
    }

    fn resync(&self, parent: &ParentRecord, taxonomies: Option<&[String]>) -> Result<ResyncReport, StoreError> {
        let prefix = self.config.taxonomy.prefix.as_str();
        let wanted: Option<Vec<String>> = taxonomies.map(|keys| {
            keys.iter()
                .map(|k| taxonomy_key(k, prefix))
                .filter(|k| !k.is_empty())
                .collect()
        });

        let remapper = ChildRemapper::new(&self.config.inference);
        let mut report = ResyncReport::default();

        for definition in parent.attributes.values() {
            let AttributeDefinition::Taxonomy { taxonomy, .. } = definition else {
                continue;
            };
            if wanted.as_ref().is_some_and(|w| !w.contains(taxonomy)) {
                continue;
            }

            let terms = self.store.assigned_terms(parent.id, taxonomy)?;
            let local_name = taxonomy.strip_prefix(prefix).unwrap_or(taxonomy.as_str());
            let mut job = RemapJob::new(taxonomy.as_str(), local_name);
            for term in &terms {
                job.map_value(&term.name, &term.slug);
            }
            job.options = terms.iter().map(|t| t.name.clone()).collect();

            let stats = remapper.run(&self.store, parent, &job)?;
            report.aggregate.merge(&stats);
            report.per_taxonomy.insert(taxonomy.clone(), stats);
        }

        if !report.per_taxonomy.is_empty() && parent.is_variable() && self.config.apply.sync_variations {
            self.store.sync_variations(parent.id)?;
        }
        self.store.invalidate_parent_caches(parent.id);
        Ok(report)
    }

    pub fn terms(&self, taxonomy: &str, search: Option<&str>, limit: Option<usize>) -> Result<Vec<TermSummary>, ApiError> {
        let corr_id = new_corr_id();
        OperationScope::new(corr_id.as_str(), 0, "terms").run(|| {
            let key = taxonomy_key(taxonomy, &self.config.taxonomy.prefix);
            let result = if key.is_empty() {
                Err(MappingError::Validation("Taxonomy is required".to_string()))
            } else {
                match self.store.find_taxonomy(&key) {
                    Ok(Some(_)) => catalog::list_terms(&self.store, &key, search, limit).map_err(store_failure),
                    Ok(None) => Err(MappingError::AttributeMissing(format!("Attribute {} does not exist", key))),
                    Err(e) => Err(store_failure(e)),
                }
            };
            result.map_err(|e| self.reject(&corr_id, e))
        })
    }

    pub fn backups(&self, parent_id: ParentId) -> Result<Vec<Backup>, ApiError> {
        let corr_id = new_corr_id();
        OperationScope::new(corr_id.as_str(), parent_id.0, "backups").run(|| {
            let result = self
                .load_parent(parent_id)
                .and_then(|parent| backup::list(&self.store, parent.id).map_err(store_failure));
            result.map_err(|e| self.reject(&corr_id, e))
        })
    }

    /// `Ok(false)` when the backup id is unknown
    pub fn rollback(&self, parent_id: ParentId, backup_id: &str) -> Result<bool, ApiError> {
        let corr_id = new_corr_id();
        OperationScope::new(corr_id.as_str(), parent_id.0, "rollback").run(|| {
            let result = self
                .load_parent(parent_id)
                .and_then(|parent| backup::rollback(&self.store, parent.id, backup_id).map_err(store_failure));
            result.map_err(|e| self.reject(&corr_id, e))
        })
    }

    fn load_parent(&self, parent_id: ParentId) -> Result<ParentRecord, MappingError> {
        validate_id(parent_id)?;
        match self.store.get_parent(parent_id) {
            Ok(Some(parent)) => Ok(parent),
            Ok(None) => Err(MappingError::InvalidProduct {
                message: format!("Product {} not found", parent_id),
                status: 404,
            }),
            Err(e) => Err(store_failure(e)),
        }
    }

    fn reject(&self, corr_id: &str, error: MappingError) -> ApiError {
        let code = error.code();
        let status = error.status();
        if status < 500 {
            tracing::warn!(code = %code, status, message = %error, "map.validation_failed");
        } else {
            tracing::error!(code = %code, status, message = %error, "apply.failed");
        }
        error.into_api(corr_id)
    }
}

fn validate_id(parent_id: ParentId) -> Result<(), MappingError> {
    if parent_id.is_valid() {
        Ok(())
    } else {
        Err(MappingError::InvalidProduct {
            message: format!("Invalid product id {}", parent_id),
            status: 400,
        })
    }
}

fn validate_mappings(mappings: &[AttributeMapping]) -> Result<(), MappingError> {
    if mappings.is_empty() {
        return Err(MappingError::Validation("Mapping is empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use l2g_core::ErrorCode;
    use l2g_storage::MemoryStore;

    #[test]
    fn test_corr_id_shape() {
        let id = new_corr_id();
        assert!(id.starts_with("l2g_"));
        assert_eq!(id.len(), 4 + 32);
        assert_ne!(id, new_corr_id());
    }

    #[test]
    fn test_invalid_and_missing_parent() {
        let service = MappingService::new(MemoryStore::new(), Config::default());
        let mapping = vec![AttributeMapping::new("Cor", "pa_cor")];

        let err = service.apply(ParentId(0), &mapping).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidProduct);
        assert_eq!(err.status, 400);
        assert!(err.corr_id.starts_with("l2g_"));

        let err = service.plan(ParentId(99), &mapping).unwrap_err();
        assert_eq!(err.status, 404);
    }

    #[test]
    fn test_empty_mapping() {
        let store = MemoryStore::new();
        store.insert_parent(ParentRecord::new(ParentId(1), "Camiseta", l2g_core::ProductKind::Variable));
        let service = MappingService::new(store, Config::default());

        let err = service.apply(ParentId(1), &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.message, "Mapping is empty");
    }

    #[test]
    fn test_supplied_corr_id_is_kept() {
        let service = MappingService::new(MemoryStore::new(), Config::default());
        let options = ApplyOptions {
            corr_id: Some("l2g_fixed".to_string()),
            ..ApplyOptions::default()
        };
        let err = service.apply_with(ParentId(-3), &[], options).unwrap_err();
        assert_eq!(err.corr_id, "l2g_fixed");
    }

    #[test]
    fn test_terms_of_unknown_taxonomy() {
        let service = MappingService::new(MemoryStore::new(), Config::default());
        let err = service.terms("pa_nope", None, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::AttributeMissing);
        assert_eq!(err.status, 400);
    }
}
