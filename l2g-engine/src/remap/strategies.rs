//! The individual child resolution strategies

use super::{ChildSnapshot, Outcome, RemapContext, ValueInferrer, WritePlan};
use crate::report::ReasonCode;
use l2g_core::normalize::{normalize, slug, CHILD_META_PREFIX};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    DirectMeta,
    VariationAttributes,
    Inference,
    Native,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::DirectMeta => "direct_meta",
            StrategyKind::VariationAttributes => "variation_attributes",
            StrategyKind::Inference => "inference",
            StrategyKind::Native => "native",
        }
    }

    /// Everything after the direct lookup counts as a fallback update
    pub fn is_fallback(&self) -> bool {
        !matches!(self, StrategyKind::DirectMeta)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One way of finding a child's value.
///
/// Attempts are pure: they only look at the snapshot and decide what should
/// be written.
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn attempt(&self, child: &ChildSnapshot, ctx: &RemapContext<'_>) -> Outcome;
}

/// Shared tail of every strategy once a raw value has been found
fn resolve_value(
    kind: StrategyKind,
    child: &ChildSnapshot,
    ctx: &RemapContext<'_>,
    raw: &str,
    remove_old_meta: bool,
) -> Outcome {
    let Some(target) = ctx.job.lookup(raw) else {
        tracing::warn!(
            child_id = child.id.0,
            taxonomy = %ctx.job.taxonomy,
            strategy = kind.as_str(),
            raw = %raw,
            normalized = %normalize(raw),
            "variation.slug_map_missing"
        );
        return Outcome::Skip(ReasonCode::NoSlugMatch);
    };

    if child.meta_value(&ctx.new_key) == Some(target) {
        let stale_old_key =
            remove_old_meta && ctx.old_key != ctx.new_key && child.meta.contains_key(&ctx.old_key);
        return Outcome::AlreadyOk { stale_old_key };
    }

    Outcome::Update(WritePlan {
        strategy: kind,
        value: target.to_string(),
        remove_old_meta,
        attributes: None,
    })
}

/// Read the old free-text meta key
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectMeta;

impl Strategy for DirectMeta {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectMeta
    }

    fn attempt(&self, child: &ChildSnapshot, ctx: &RemapContext<'_>) -> Outcome {
        match child.meta_value(&ctx.old_key) {
            Some(raw) => resolve_value(self.kind(), child, ctx, raw, true),
            None if child.meta_value(&ctx.new_key).is_some() => Outcome::AlreadyOk {
                stale_old_key: child.meta.contains_key(&ctx.old_key),
            },
            None => Outcome::Skip(ReasonCode::MissingSourceMeta),
        }
    }
}

/// Look for the local attribute among the child's structured attributes
#[derive(Debug, Clone, Copy, Default)]
pub struct VariationAttributes;

impl Strategy for VariationAttributes {
    fn kind(&self) -> StrategyKind {
        StrategyKind::VariationAttributes
    }

    fn attempt(&self, child: &ChildSnapshot, ctx: &RemapContext<'_>) -> Outcome {
        if child.meta_value(&ctx.old_key).is_some() {
            return Outcome::Skip(ReasonCode::MissingSourceMeta);
        }

        let found = child.attributes.iter().find(|(name, value)| {
            let bare = name.strip_prefix(CHILD_META_PREFIX).unwrap_or(name.as_str());
            slug(bare) == ctx.local_slug && !value.trim().is_empty()
        });
        let Some((name, raw)) = found else {
            return Outcome::Skip(ReasonCode::MissingSourceMeta);
        };

        match resolve_value(self.kind(), child, ctx, raw.trim(), false) {
            Outcome::Update(mut plan) => {
                let mut attributes = child.attributes.clone();
                attributes.remove(name);
                attributes.insert(ctx.job.taxonomy.clone(), plan.value.clone());
                plan.attributes = Some(attributes);
                Outcome::Update(plan)
            }
            other => other,
        }
    }
}

/// Infer the option from the child's title and SKU
pub struct InferenceStrategy {
    inferrer: Box<dyn ValueInferrer>,
}

impl InferenceStrategy {
    pub fn new(inferrer: Box<dyn ValueInferrer>) -> Self {
        Self { inferrer }
    }
}

impl Strategy for InferenceStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Inference
    }

    fn attempt(&self, child: &ChildSnapshot, ctx: &RemapContext<'_>) -> Outcome {
        if ctx.job.options.is_empty() {
            return Outcome::Skip(ReasonCode::MissingSourceMeta);
        }
        match self.inferrer.infer(&child.title, &child.sku, &ctx.job.options) {
            Some(option) => {
                let remove_old = child.meta.contains_key(&ctx.old_key);
                resolve_value(self.kind(), child, ctx, &option, remove_old)
            }
            None => Outcome::Skip(ReasonCode::MissingSourceMeta),
        }
    }
}

/// Last resort: the host's denormalized attribute snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeAttributes;

impl Strategy for NativeAttributes {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Native
    }

    fn attempt(&self, child: &ChildSnapshot, ctx: &RemapContext<'_>) -> Outcome {
        match child.native.get(&ctx.old_key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            Some(raw) => {
                let remove_old = child.meta.contains_key(&ctx.old_key);
                resolve_value(self.kind(), child, ctx, raw, remove_old)
            }
            None => Outcome::Skip(ReasonCode::MissingSourceMeta),
        }
    }
}
