//! Child remapping: move each child's pointer from the free-text meta key to
//! the taxonomy meta key.
//!
//! Every child is run through an ordered list of [`Strategy`] values. The
//! first one that produces an update (or finds the child already migrated)
//! wins; otherwise the child is skipped with the first reason reported.
//! Updates go through [`AtomicMetaWriter`], which verifies that the write
//! survived the host's write hooks and caches.

pub mod inference;
pub mod strategies;
pub mod writer;

pub use inference::{TokenInferrer, ValueInferrer};
pub use strategies::{DirectMeta, InferenceStrategy, NativeAttributes, Strategy, StrategyKind, VariationAttributes};
pub use writer::{AtomicMetaWriter, WriteStatus};

use crate::report::{ChildStats, ReasonCode};
use l2g_core::config::InferenceConfig;
use l2g_core::normalize::{child_meta_key, normalize, slug, taxonomy_meta_key};
use l2g_core::{ChildId, ChildRecord, ParentRecord};
use l2g_storage::{CatalogStore, StoreResult};
use std::collections::BTreeMap;

/// One taxonomy's worth of child remapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemapJob {
    pub taxonomy: String,
    /// Free-text attribute name the children were keyed by
    pub local_name: String,
    /// normalized local value -> term slug
    pub slug_map: BTreeMap<String, String>,
    /// Values the inference strategy may pick from
    pub options: Vec<String>,
}

impl RemapJob {
    pub fn new(taxonomy: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            local_name: local_name.into(),
            ..Self::default()
        }
    }

    /// Map `value` to `term_slug`; the slug also maps to itself unless
    /// already taken by a value
    pub fn map_value(&mut self, value: &str, term_slug: &str) {
        let key = normalize(value);
        if !key.is_empty() {
            self.slug_map.insert(key, term_slug.to_string());
        }
        let slug_key = normalize(term_slug);
        if !slug_key.is_empty() {
            self.slug_map.entry(slug_key).or_insert_with(|| term_slug.to_string());
        }
    }

    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.slug_map.get(&normalize(raw)).map(String::as_str)
    }
}

/// Everything a strategy may look at for one child
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildSnapshot {
    pub id: ChildId,
    pub title: String,
    pub sku: String,
    pub meta: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, String>,
    /// Host-maintained denormalized attribute values
    pub native: BTreeMap<String, String>,
}

impl ChildSnapshot {
    pub fn new(record: ChildRecord, native: BTreeMap<String, String>) -> Self {
        Self {
            id: record.id,
            title: record.title,
            sku: record.sku,
            meta: record.meta,
            attributes: record.attributes,
            native,
        }
    }

    /// Trimmed, non-empty meta value
    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Keys derived from a job, shared by every strategy
#[derive(Debug, Clone)]
pub struct RemapContext<'a> {
    pub job: &'a RemapJob,
    pub old_key: String,
    pub new_key: String,
    pub local_slug: String,
}

impl<'a> RemapContext<'a> {
    pub fn new(job: &'a RemapJob) -> Self {
        Self {
            job,
            old_key: child_meta_key(&job.local_name),
            new_key: taxonomy_meta_key(&job.taxonomy),
            local_slug: slug(&job.local_name),
        }
    }
}

/// What a strategy decided to write
#[derive(Debug, Clone, PartialEq)]
pub struct WritePlan {
    pub strategy: StrategyKind,
    pub value: String,
    pub remove_old_meta: bool,
    /// Replacement structured attributes, when the strategy rewrote them
    pub attributes: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Update(WritePlan),
    /// The new key already holds the mapped value; `stale_old_key` marks a
    /// leftover old key that still has to go
    AlreadyOk { stale_old_key: bool },
    Skip(ReasonCode),
}

/// Runs the strategy chain over every child of a parent
pub struct ChildRemapper {
    strategies: Vec<Box<dyn Strategy>>,
}

impl ChildRemapper {
    /// Direct meta, structured attributes, title/SKU inference (when
    /// enabled), then the host's native snapshot
    pub fn new(config: &InferenceConfig) -> Self {
        let mut strategies: Vec<Box<dyn Strategy>> = vec![Box::new(DirectMeta), Box::new(VariationAttributes)];
        if config.enabled {
            strategies.push(Box::new(InferenceStrategy::new(Box::new(TokenInferrer::new(
                config.max_title_length,
                config.max_candidates,
            )))));
        }
        strategies.push(Box::new(NativeAttributes));
        Self { strategies }
    }

    pub fn with_strategies(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// First update or `AlreadyOk` wins; otherwise the first skip reason
    pub fn evaluate(&self, child: &ChildSnapshot, ctx: &RemapContext<'_>) -> Outcome {
        let mut first_skip = None;
        for strategy in &self.strategies {
            match strategy.attempt(child, ctx) {
                Outcome::Skip(reason) => {
                    first_skip.get_or_insert(reason);
                }
                decided => return decided,
            }
        }
        Outcome::Skip(first_skip.unwrap_or(ReasonCode::MissingSourceMeta))
    }

    pub fn run<S: CatalogStore + ?Sized>(
        &self,
        store: &S,
        parent: &ParentRecord,
        job: &RemapJob,
    ) -> StoreResult<ChildStats> {
        let mut stats = ChildStats::default();
        if !parent.is_variable() {
            return Ok(stats);
        }

        let children = store.children_of(parent.id)?;
        let ctx = RemapContext::new(job);
        let writer = AtomicMetaWriter::new(store);

        tracing::info!(
            taxonomy = %job.taxonomy,
            local_attribute = %job.local_name,
            old_key = %ctx.old_key,
            new_key = %ctx.new_key,
            children = children.len(),
            "variation.process.start"
        );

        for child_id in children {
            let Some(record) = store.get_child(child_id)? else {
                stats.record_skip(ReasonCode::MissingSourceMeta);
                continue;
            };
            let native = store.native_attributes(child_id)?;
            let snapshot = ChildSnapshot::new(record, native);

            match self.evaluate(&snapshot, &ctx) {
                Outcome::Update(plan) => match writer.write(child_id, &ctx, &plan)? {
                    WriteStatus::Verified | WriteStatus::Corrected => {
                        log_update(child_id, &ctx, &plan);
                        stats.record_update(plan.strategy.is_fallback());
                    }
                    WriteStatus::Unverified => {
                        tracing::warn!(
                            child_id = child_id.0,
                            taxonomy = %job.taxonomy,
                            reason = ReasonCode::PersistenceFailed.as_str(),
                            "variation.skip.unverified"
                        );
                        stats.record_skip(ReasonCode::PersistenceFailed);
                    }
                },
                Outcome::AlreadyOk { stale_old_key } => {
                    if stale_old_key {
                        writer.remove_old_key(child_id, &ctx)?;
                        tracing::info!(
                            child_id = child_id.0,
                            taxonomy = %job.taxonomy,
                            old_key = %ctx.old_key,
                            "variation.cleanup.stale_meta"
                        );
                    }
                    tracing::debug!(child_id = child_id.0, taxonomy = %job.taxonomy, "variation.skip.already_ok");
                    stats.record_skip(ReasonCode::AlreadyOk);
                }
                Outcome::Skip(reason) => {
                    tracing::info!(
                        child_id = child_id.0,
                        taxonomy = %job.taxonomy,
                        reason = reason.as_str(),
                        "variation.skip.no_strategy"
                    );
                    stats.record_skip(reason);
                }
            }
        }

        tracing::info!(
            taxonomy = %job.taxonomy,
            updated = stats.updated,
            skipped = stats.skipped,
            total = stats.total,
            updated_pct = stats.updated_pct,
            "variation.update.summary"
        );
        Ok(stats)
    }
}

fn log_update(child_id: ChildId, ctx: &RemapContext<'_>, plan: &WritePlan) {
    let child_id = child_id.0;
    let taxonomy = ctx.job.taxonomy.as_str();
    let value = plan.value.as_str();
    match plan.strategy {
        StrategyKind::DirectMeta => tracing::info!(child_id, taxonomy, value, "variation.update.direct_meta"),
        StrategyKind::VariationAttributes => tracing::info!(child_id, taxonomy, value, "variation.update.fallback"),
        StrategyKind::Inference => tracing::info!(child_id, taxonomy, value, "variation.update.inference"),
        StrategyKind::Native => tracing::info!(child_id, taxonomy, value, "variation.update.native"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l2g_core::{ParentId, ProductKind};
    use l2g_storage::MemoryStore;

    fn job() -> RemapJob {
        let mut job = RemapJob::new("pa_cor", "Cor");
        job.map_value("Azul", "azul-marinho");
        job.map_value("Preto", "preto");
        job.options = vec!["Azul".to_string(), "Preto".to_string()];
        job
    }

    fn child(id: u64, meta: &[(&str, &str)]) -> ChildRecord {
        let mut child = ChildRecord::new(ChildId(id), ParentId(1));
        for (k, v) in meta {
            child.meta.insert(k.to_string(), v.to_string());
        }
        child
    }

    fn seeded(children: Vec<ChildRecord>) -> (MemoryStore, ParentRecord) {
        let store = MemoryStore::new();
        let parent = ParentRecord::new(ParentId(1), "Camiseta", ProductKind::Variable);
        store.insert_parent(parent);
        for c in children {
            store.insert_child(c);
        }
        let parent = store.parent(ParentId(1)).unwrap();
        (store, parent)
    }

    #[test]
    fn test_slug_map_lookup_is_normalized() {
        let job = job();
        assert_eq!(job.lookup("  AZUL "), Some("azul-marinho"));
        assert_eq!(job.lookup("azul-marinho"), Some("azul-marinho"));
        assert_eq!(job.lookup("Verde"), None);
    }

    #[test]
    fn test_value_mapping_wins_over_slug_identity() {
        let mut job = RemapJob::new("pa_cor", "Cor");
        job.map_value("preto", "preto");
        job.map_value("Preto", "preto-fosco");
        assert_eq!(job.lookup("preto"), Some("preto-fosco"));
    }

    #[test]
    fn test_default_order() {
        let remapper = ChildRemapper::new(&InferenceConfig::default());
        assert_eq!(
            remapper.strategy_kinds(),
            vec![
                StrategyKind::DirectMeta,
                StrategyKind::VariationAttributes,
                StrategyKind::Inference,
                StrategyKind::Native
            ]
        );

        let disabled = InferenceConfig {
            enabled: false,
            ..InferenceConfig::default()
        };
        assert!(!ChildRemapper::new(&disabled).strategy_kinds().contains(&StrategyKind::Inference));
    }

    #[test]
    fn test_direct_meta_migrates_child() {
        let (store, parent) = seeded(vec![child(10, &[("attribute_cor", "Azul")])]);
        let stats = ChildRemapper::new(&InferenceConfig::default())
            .run(&store, &parent, &job())
            .unwrap();

        assert_eq!(stats.updated, 1);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.updated_pct, 100.0);
        let stored = store.child(ChildId(10)).unwrap();
        assert_eq!(stored.meta.get("attribute_pa_cor").map(String::as_str), Some("azul-marinho"));
        assert!(!stored.meta.contains_key("attribute_cor"));
    }

    #[test]
    fn test_lost_write_is_not_counted_as_update() {
        let (store, parent) = seeded(vec![child(10, &[("attribute_cor", "Azul")])]);
        store.drop_next_meta_write();
        store.drop_next_meta_write();

        let stats = ChildRemapper::new(&InferenceConfig::default())
            .run(&store, &parent, &job())
            .unwrap();

        assert_eq!(stats.updated, 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.updated_pct, 0.0);
        assert_eq!(stats.reason(ReasonCode::PersistenceFailed), 1);
        let stored = store.child(ChildId(10)).unwrap();
        assert_eq!(stored.meta.get("attribute_cor").map(String::as_str), Some("Azul"));
        assert!(!stored.meta.contains_key("attribute_pa_cor"));
    }

    #[test]
    fn test_already_migrated_child_drops_old_key() {
        let (store, parent) = seeded(vec![child(
            10,
            &[("attribute_cor", "Azul"), ("attribute_pa_cor", "azul-marinho")],
        )]);

        let stats = ChildRemapper::new(&InferenceConfig::default())
            .run(&store, &parent, &job())
            .unwrap();

        assert_eq!(stats.updated, 0);
        assert_eq!(stats.reason(ReasonCode::AlreadyOk), 1);
        let stored = store.child(ChildId(10)).unwrap();
        assert_eq!(stored.meta.get("attribute_pa_cor").map(String::as_str), Some("azul-marinho"));
        assert!(!stored.meta.contains_key("attribute_cor"));
        assert!(store.hooks_active());
    }

    #[test]
    fn test_first_skip_reason_is_kept() {
        let (store, parent) = seeded(vec![
            child(10, &[("attribute_cor", "Verde")]),
            child(11, &[]),
        ]);
        let stats = ChildRemapper::new(&InferenceConfig::default())
            .run(&store, &parent, &job())
            .unwrap();

        assert_eq!(stats.updated, 0);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.reason(ReasonCode::NoSlugMatch), 1);
        assert_eq!(stats.reason(ReasonCode::MissingSourceMeta), 1);
    }

    #[test]
    fn test_simple_parent_yields_zero_stats() {
        let store = MemoryStore::new();
        let parent = ParentRecord::new(ParentId(2), "Caneca", ProductKind::Simple);
        store.insert_parent(parent.clone());
        let stats = ChildRemapper::new(&InferenceConfig::default())
            .run(&store, &parent, &job())
            .unwrap();
        assert_eq!(stats, ChildStats::default());
    }

    #[test]
    fn test_inference_counts_as_fallback() {
        let mut titled = child(12, &[]);
        titled.title = "Camiseta - Preto".to_string();
        let (store, parent) = seeded(vec![titled]);

        let stats = ChildRemapper::new(&InferenceConfig::default())
            .run(&store, &parent, &job())
            .unwrap();
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.reason(ReasonCode::FallbackUpdated), 1);
        assert_eq!(
            store.child(ChildId(12)).unwrap().meta.get("attribute_pa_cor").map(String::as_str),
            Some("preto")
        );
    }
}
