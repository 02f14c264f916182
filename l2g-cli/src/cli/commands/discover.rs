use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use l2g_core::ParentId;

use crate::cli::output::{create_standard_table, empty, header_cell, print_json, section_header};
use crate::cli::Session;

#[derive(Args)]
pub struct DiscoverArgs {
    /// Product id
    #[arg(short, long, value_name = "ID")]
    pub parent: i64,
}

pub fn run(args: DiscoverArgs, session: &Session) -> Result<()> {
    let locals = session.service.discover(ParentId(args.parent))?;

    if session.json {
        return print_json(&locals);
    }

    if locals.is_empty() {
        empty(&format!("No local attributes on product {}", args.parent));
        return Ok(());
    }

    section_header(&format!("Local attributes of product {}", args.parent));
    let mut table = create_standard_table();
    table.set_header(vec![
        header_cell("Attribute"),
        header_cell("Values"),
        header_cell("Used by variations"),
    ]);
    for local in &locals {
        table.add_row(vec![
            Cell::new(&local.name),
            Cell::new(local.values.join(" | ")),
            Cell::new(if local.used_in_children { "yes" } else { "no" }),
        ]);
    }
    println!("{table}");
    Ok(())
}
