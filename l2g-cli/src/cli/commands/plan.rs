use anyhow::Result;
use clap::Args;
use l2g_core::ParentId;
use l2g_engine::ApplyOptions;

use crate::cli::mapping::MappingArgs;
use crate::cli::output::{print_json, print_preview};
use crate::cli::Session;

#[derive(Args)]
pub struct PlanArgs {
    /// Product id
    #[arg(short, long, value_name = "ID")]
    pub parent: i64,

    #[command(flatten)]
    pub mapping: MappingArgs,

    /// Preview as if missing terms were created automatically
    #[arg(long)]
    pub auto_create: bool,
}

pub fn run(args: PlanArgs, session: &Session) -> Result<()> {
    let mappings = args.mapping.load()?;
    let mut options = ApplyOptions::default();
    if args.auto_create || args.mapping.create_missing {
        options = options.auto_create(true);
    }

    let preview = session.service.plan_with(ParentId(args.parent), &mappings, &options)?;

    if session.json {
        print_json(&preview)
    } else {
        print_preview(&preview);
        Ok(())
    }
}
