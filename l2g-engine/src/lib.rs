//! Mapping and migration engine for local2global.
//!
//! Turns a caller-supplied [`AttributeMapping`] into either a dry-run
//! [`MigrationPreview`] or a real migration of a parent record, its taxonomy
//! assignments and every child's meta pointer. [`MappingService`] is the
//! entry point; the individual stages are public for callers that need them.

pub mod automap;
pub mod backup;
pub mod catalog;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod planner;
pub mod remap;
pub mod report;
pub mod resolver;
pub mod service;
pub mod similarity;

pub use l2g_core::normalize;

pub use automap::AutoMapper;
pub use backup::{Backup, BACKUP_META_KEY};
pub use catalog::{list_terms, TermSummary, DEFAULT_TERM_LIMIT};
pub use discovery::discover;
pub use error::MappingError;
pub use executor::{ApplyOptions, Executor};
pub use planner::Planner;
pub use remap::{ChildRemapper, RemapJob, Strategy, StrategyKind};
pub use report::{AttributePreview, ChildStats, MigrationPreview, MigrationReport, ReasonCode, ResyncReport};
pub use resolver::{ResolveError, ResolverCache, TermResolver};
pub use service::{new_corr_id, MappingService};
pub use similarity::{best_match, similarity, Candidate, Match};

pub use l2g_core::{AttributeMapping, TermMapping};
