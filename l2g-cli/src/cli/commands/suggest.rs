use anyhow::{Context, Result};
use clap::Args;
use l2g_core::ParentId;
use std::path::PathBuf;

use crate::cli::output::{print_json, success};
use crate::cli::Session;

#[derive(Args)]
pub struct SuggestArgs {
    /// Product id
    #[arg(short, long, value_name = "ID")]
    pub parent: i64,

    /// Write the mapping to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

pub fn run(args: SuggestArgs, session: &Session) -> Result<()> {
    let mappings = session.service.suggest(ParentId(args.parent))?;

    match args.out {
        Some(path) => {
            let contents = serde_json::to_string_pretty(&mappings)?;
            std::fs::write(&path, contents)
                .with_context(|| format!("Failed to write mapping {}", path.display()))?;
            success(&format!("{} mapping(s) written to {}", mappings.len(), path.display()));
            Ok(())
        }
        None => print_json(&mappings),
    }
}
