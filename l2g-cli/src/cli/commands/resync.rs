use anyhow::Result;
use clap::Args;
use l2g_core::ParentId;

use crate::cli::output::{child_stats_table, empty, print_json, section_header};
use crate::cli::Session;

#[derive(Args)]
pub struct ResyncArgs {
    /// Product id
    #[arg(short, long, value_name = "ID")]
    pub parent: i64,

    /// Only these taxonomies (prefix optional), repeatable
    #[arg(long = "tax", value_name = "PA_TAX")]
    pub taxonomies: Vec<String>,
}

pub fn run(args: ResyncArgs, session: Session) -> Result<()> {
    let filter = (!args.taxonomies.is_empty()).then_some(args.taxonomies.as_slice());
    let report = session.service.resync_children(ParentId(args.parent), filter)?;
    session.save()?;

    if session.json {
        return print_json(&report);
    }

    if report.per_taxonomy.is_empty() {
        empty("No mapped taxonomies to resync");
        return Ok(());
    }
    section_header(&format!("Variations resynced ({})", report.corr_id));
    println!("{}", child_stats_table(&report.per_taxonomy));
    println!(
        "Total: {} of {} updated ({:.2}%)",
        report.aggregate.updated, report.aggregate.total, report.aggregate.updated_pct
    );
    Ok(())
}
