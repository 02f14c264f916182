use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use l2g_core::ParentId;

use crate::cli::output::{create_standard_table, empty, header_cell, print_json, success};
use crate::cli::Session;

#[derive(Args)]
pub struct BackupsArgs {
    /// Product id
    #[arg(short, long, value_name = "ID")]
    pub parent: i64,
}

#[derive(Args)]
pub struct RollbackArgs {
    /// Product id
    #[arg(short, long, value_name = "ID")]
    pub parent: i64,

    /// Backup id, as listed by `backups`
    #[arg(short, long, value_name = "UUID")]
    pub backup: String,
}

pub fn list(args: BackupsArgs, session: &Session) -> Result<()> {
    let backups = session.service.backups(ParentId(args.parent))?;

    if session.json {
        return print_json(&backups);
    }
    if backups.is_empty() {
        empty(&format!("No backups on product {}", args.parent));
        return Ok(());
    }

    let mut table = create_standard_table();
    table.set_header(vec![
        header_cell("Backup"),
        header_cell("Created"),
        header_cell("Attributes"),
        header_cell("Variations"),
    ]);
    for backup in &backups {
        table.add_row(vec![
            Cell::new(&backup.id),
            Cell::new(backup.created_at.to_rfc3339()),
            Cell::new(backup.attributes.keys().cloned().collect::<Vec<_>>().join(", ")),
            Cell::new(backup.children.len()),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run(args: RollbackArgs, session: Session) -> Result<()> {
    let restored = session.service.rollback(ParentId(args.parent), &args.backup)?;
    if !restored {
        anyhow::bail!("Backup {} not found on product {}", args.backup, args.parent);
    }
    session.save()?;

    if session.json {
        print_json(&serde_json::json!({ "restored": true, "backup_id": args.backup }))
    } else {
        success(&format!("Product {} restored from backup {}", args.parent, args.backup));
        Ok(())
    }
}
