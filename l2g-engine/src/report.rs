//! Result payloads: per-child counters, migration report, dry-run preview

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Why a child was (or was not) migrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    MissingSourceMeta,
    NoSlugMatch,
    AlreadyOk,
    FallbackUpdated,
    /// The new value did not read back even after the corrective rewrite
    PersistenceFailed,
}

impl ReasonCode {
    pub const ALL: [ReasonCode; 5] = [
        ReasonCode::MissingSourceMeta,
        ReasonCode::NoSlugMatch,
        ReasonCode::AlreadyOk,
        ReasonCode::FallbackUpdated,
        ReasonCode::PersistenceFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::MissingSourceMeta => "missing_source_meta",
            ReasonCode::NoSlugMatch => "no_slug_match",
            ReasonCode::AlreadyOk => "already_ok",
            ReasonCode::FallbackUpdated => "fallback_updated",
            ReasonCode::PersistenceFailed => "persistence_failed",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one child-remapping job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildStats {
    pub updated: usize,
    pub skipped: usize,
    pub total: usize,
    pub updated_pct: f64,
    pub reasons: BTreeMap<ReasonCode, usize>,
}

impl Default for ChildStats {
    fn default() -> Self {
        Self {
            updated: 0,
            skipped: 0,
            total: 0,
            updated_pct: 0.0,
            reasons: ReasonCode::ALL.iter().map(|r| (*r, 0)).collect(),
        }
    }
}

impl ChildStats {
    pub fn record_update(&mut self, via_fallback: bool) {
        self.updated += 1;
        self.total += 1;
        if via_fallback {
            *self.reasons.entry(ReasonCode::FallbackUpdated).or_insert(0) += 1;
        }
        self.refresh_pct();
    }

    pub fn record_skip(&mut self, reason: ReasonCode) {
        self.skipped += 1;
        self.total += 1;
        *self.reasons.entry(reason).or_insert(0) += 1;
        self.refresh_pct();
    }

    pub fn reason(&self, reason: ReasonCode) -> usize {
        self.reasons.get(&reason).copied().unwrap_or(0)
    }

    /// Add another job's counters and recompute the percentage
    pub fn merge(&mut self, other: &ChildStats) {
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.total += other.total;
        for (reason, count) in &other.reasons {
            *self.reasons.entry(*reason).or_insert(0) += count;
        }
        self.refresh_pct();
    }

    fn refresh_pct(&mut self) {
        self.updated_pct = if self.total == 0 {
            0.0
        } else {
            ((self.updated as f64 / self.total as f64) * 100.0 * 100.0).round() / 100.0
        };
    }
}

/// Outcome of a successful apply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub corr_id: String,
    pub created_terms: BTreeMap<String, Vec<String>>,
    pub existing_terms: BTreeMap<String, Vec<String>>,
    pub updated_attributes: Vec<String>,
    pub per_child_stats: BTreeMap<String, ChildStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,
}

impl MigrationReport {
    pub fn record_term(&mut self, taxonomy: &str, term_key: &str, created: bool) {
        let bucket = if created {
            &mut self.created_terms
        } else {
            &mut self.existing_terms
        };
        let keys = bucket.entry(taxonomy.to_string()).or_default();
        if !keys.iter().any(|k| k == term_key) {
            keys.push(term_key.to_string());
        }
    }

    pub fn created_count(&self) -> usize {
        self.created_terms.values().map(Vec::len).sum()
    }
}

/// Dry-run classification of one attribute mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributePreview {
    pub local_attribute: String,
    pub taxonomy: String,
    pub attribute_exists: bool,
    pub will_create_attribute: bool,
    pub existing_terms: Vec<String>,
    pub create_terms: Vec<String>,
    pub errors: Vec<String>,
}

/// Dry-run output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationPreview {
    pub corr_id: String,
    pub attributes: Vec<AttributePreview>,
    /// Every attribute's errors, flattened
    pub errors: Vec<String>,
}

impl MigrationPreview {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcome of re-running child remapping on assigned taxonomies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResyncReport {
    pub corr_id: String,
    pub per_taxonomy: BTreeMap<String, ChildStats>,
    pub aggregate: ChildStats,
}
