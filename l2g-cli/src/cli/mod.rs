pub mod commands;
pub mod mapping;
pub mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use l2g_core::Config;
use l2g_engine::MappingService;
use l2g_storage::{MemoryStore, Snapshot};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "l2g",
    version,
    about = "Migrate local product attributes into shared taxonomies",
    long_about = "local2global moves a product's free-text attributes into shared, \
                  taxonomy-backed attributes: it resolves or creates the taxonomy and its \
                  terms, rewrites the parent record and repoints every variation's meta."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Catalog snapshot (JSON) to read and update
    #[arg(long, global = true, env = "L2G_STORE", default_value = "catalog.json", value_name = "FILE")]
    pub store: PathBuf,

    /// Configuration file (TOML); falls back to $L2G_CONFIG, then defaults
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write audit records as JSON lines
    #[arg(long, global = true, help = "Enable audit logging of every engine event")]
    pub audit: bool,

    /// Custom audit log file path (defaults to logging.audit_file, then l2g-audit.jsonl)
    #[arg(long, global = true, value_name = "PATH")]
    pub audit_file: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the local attributes of a product
    Discover(commands::discover::DiscoverArgs),

    /// Propose a mapping for every local attribute
    Suggest(commands::suggest::SuggestArgs),

    /// Dry-run a mapping without touching the catalog
    Plan(commands::plan::PlanArgs),

    /// Apply a mapping and migrate the product's variations
    Apply(commands::apply::ApplyArgs),

    /// Re-run variation remapping for already mapped taxonomies
    Resync(commands::resync::ResyncArgs),

    /// List the terms of a taxonomy
    Terms(commands::terms::TermsArgs),

    /// List the backups stored on a product
    Backups(commands::rollback::BackupsArgs),

    /// Restore a product from a backup
    Rollback(commands::rollback::RollbackArgs),

    /// Seed a test product and run a full mapping on it
    Simulate(commands::simulate::SimulateArgs),
}

/// Loaded catalog plus the service operating on it
pub struct Session {
    pub service: MappingService<MemoryStore>,
    /// Print JSON instead of tables and trees
    pub json: bool,
    path: PathBuf,
}

impl Session {
    /// Load the catalog at `path`. With `allow_missing`, a missing file
    /// starts an empty catalog that is created on [`Session::save`].
    pub fn open(path: &Path, config: Config, allow_missing: bool) -> Result<Self> {
        let snapshot = if path.exists() {
            Snapshot::load(path).with_context(|| format!("Failed to read catalog {}", path.display()))?
        } else if allow_missing {
            Snapshot::default()
        } else {
            anyhow::bail!("Catalog file not found: {}", path.display());
        };

        let store = snapshot
            .into_store()
            .with_context(|| format!("Invalid catalog {}", path.display()))?;
        tracing::debug!(path = %path.display(), "catalog.loaded");

        Ok(Self {
            service: MappingService::new(store, config),
            json: false,
            path: path.to_path_buf(),
        })
    }

    pub fn store(&self) -> &MemoryStore {
        self.service.store()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the catalog back to where it was loaded from
    pub fn save(&self) -> Result<()> {
        Snapshot::from_store(self.store())
            .save(&self.path)
            .with_context(|| format!("Failed to write catalog {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "catalog.saved");
        Ok(())
    }
}
