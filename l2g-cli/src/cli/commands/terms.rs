use anyhow::Result;
use clap::Args;
use comfy_table::Cell;

use crate::cli::output::{create_standard_table, empty, header_cell, print_json};
use crate::cli::Session;

#[derive(Args)]
pub struct TermsArgs {
    /// Taxonomy key, with or without the prefix
    pub taxonomy: String,

    /// Case- and accent-insensitive filter on name or slug
    #[arg(short, long)]
    pub search: Option<String>,

    /// Maximum number of terms
    #[arg(short, long)]
    pub limit: Option<usize>,
}

pub fn run(args: TermsArgs, session: &Session) -> Result<()> {
    let terms = session
        .service
        .terms(&args.taxonomy, args.search.as_deref(), args.limit)?;

    if session.json {
        return print_json(&terms);
    }
    if terms.is_empty() {
        empty("No terms found");
        return Ok(());
    }

    let mut table = create_standard_table();
    table.set_header(vec![header_cell("Id"), header_cell("Name"), header_cell("Slug")]);
    for term in &terms {
        table.add_row(vec![
            Cell::new(term.term_id),
            Cell::new(&term.name),
            Cell::new(&term.slug),
        ]);
    }
    println!("{table}");
    Ok(())
}
