use anyhow::Result;
use clap::Args;
use colored::*;
use l2g_core::ParentId;
use l2g_engine::{ApplyOptions, MigrationReport};

use crate::cli::mapping::MappingArgs;
use crate::cli::output::{child_stats_table, info, join_or_dash, print_json, section_header, success};
use crate::cli::Session;

#[derive(Args)]
pub struct ApplyArgs {
    /// Product id
    #[arg(short, long, value_name = "ID")]
    pub parent: i64,

    #[command(flatten)]
    pub mapping: MappingArgs,

    /// Create terms that are missing even when the mapping does not ask to
    #[arg(long)]
    pub auto_create: bool,

    /// Store a backup of the product and its variations first
    #[arg(long)]
    pub backup: bool,
}

pub fn run(args: ApplyArgs, session: Session) -> Result<()> {
    let mappings = args.mapping.load()?;
    let mut options = ApplyOptions::default();
    if args.auto_create || args.mapping.create_missing {
        options = options.auto_create(true);
    }
    if args.backup {
        options = options.backup(true);
    }

    let report = match session.service.apply_with(ParentId(args.parent), &mappings, options) {
        Ok(report) => report,
        // Finalization failures leave earlier writes in the store; keep them
        Err(e) if e.status >= 500 => {
            session.save()?;
            tracing::warn!(code = %e.code, corr_id = %e.corr_id, "catalog.saved_partial");
            eprintln!(
                "{} Partial changes were written to {}",
                "⚠".yellow(),
                session.path().display()
            );
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    session.save()?;

    if session.json {
        print_json(&report)
    } else {
        print_report(args.parent, &report);
        Ok(())
    }
}

pub fn print_report(parent: i64, report: &MigrationReport) {
    section_header(&format!("Mapping applied to product {} ({})", parent, report.corr_id));
    for taxonomy in &report.updated_attributes {
        let created = report.created_terms.get(taxonomy).cloned().unwrap_or_default();
        let existing = report.existing_terms.get(taxonomy).cloned().unwrap_or_default();
        info(&format!(
            "{}: created [{}], reused [{}]",
            taxonomy,
            join_or_dash(&created),
            join_or_dash(&existing)
        ));
    }
    if !report.per_child_stats.is_empty() {
        println!("{}", child_stats_table(&report.per_child_stats));
    }
    if let Some(backup) = &report.backup_id {
        info(&format!("Backup {}", backup));
    }
    success(&format!("{} attribute(s) migrated", report.updated_attributes.len()));
}
