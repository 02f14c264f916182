use anyhow::Result;
use clap::Args;
use l2g_core::normalize::{child_meta_key, slug};
use l2g_core::{AttributeDefinition, ChildId, ChildRecord, ParentId, ParentRecord, ProductKind};
use l2g_engine::ApplyOptions;
use l2g_storage::{MemoryStore, Snapshot};

use crate::cli::commands::apply::print_report;
use crate::cli::mapping::inline_mappings;
use crate::cli::output::{info, print_json, print_preview};
use crate::cli::Session;

#[derive(Args)]
pub struct SimulateArgs {
    /// Local attribute and target taxonomy, repeatable [default: Cor:pa_cor]
    #[arg(long, value_name = "LOCAL:PA_SLUG")]
    pub attr: Vec<String>,

    /// Local value and target term slug, repeatable [default: Azul:azul Vermelho:vermelho]
    #[arg(long, value_name = "VALUE:SLUG")]
    pub val: Vec<String>,

    /// Number of variations to create (at least one)
    #[arg(long, default_value_t = 2)]
    pub variations: usize,

    /// Id of the test product; defaults to the next free id
    #[arg(short, long, value_name = "ID")]
    pub parent: Option<i64>,

    /// Only plan the mapping
    #[arg(long)]
    pub dry_run: bool,
}

fn or_default(values: &[String], default: &[&str]) -> Vec<String> {
    if values.is_empty() {
        default.iter().map(|s| s.to_string()).collect()
    } else {
        values.to_vec()
    }
}

pub fn run(args: SimulateArgs, session: Session) -> Result<()> {
    let attrs = or_default(&args.attr, &["Cor:pa_cor"]);
    let vals = or_default(&args.val, &["Azul:azul", "Vermelho:vermelho"]);
    let mappings = inline_mappings(&attrs, &vals, true);
    if mappings.is_empty() {
        anyhow::bail!("No valid --attr given");
    }

    let store = session.store();
    let parent_id = match args.parent {
        Some(id) => ParentId(id),
        None => next_parent_id(store),
    };
    if store.parent(parent_id).is_some() {
        anyhow::bail!("Product {} already exists", parent_id);
    }

    let mut parent = ParentRecord::new(
        parent_id,
        format!("Produto Teste Local2Global {}", parent_id),
        ProductKind::Variable,
    );
    for (index, mapping) in mappings.iter().enumerate() {
        parent.attributes.insert(
            slug(&mapping.local.name),
            AttributeDefinition::FreeText {
                name: mapping.local.name.clone(),
                options: mapping.local.values.clone(),
                visible: true,
                variation: true,
                position: index as u32,
            },
        );
    }
    store.insert_parent(parent);

    // variations carry a value for the first attribute only
    let first = &mappings[0];
    let meta_key = child_meta_key(&first.local.name);
    let mut next_child = next_child_id(store);
    for value in first.local.values.iter().take(args.variations.max(1)) {
        let mut child = ChildRecord::new(ChildId(next_child), parent_id);
        child.title = format!("Variação {}", value);
        child.meta.insert(meta_key.clone(), value.clone());
        store.insert_child(child);
        next_child += 1;
    }
    tracing::info!(parent_id = parent_id.0, "simulate.product_created");
    if !session.json {
        info(&format!("Test product created: {}", parent_id));
    }

    let options = ApplyOptions::default().auto_create(true).backup(!args.dry_run);
    if args.dry_run {
        let preview = session.service.plan_with(parent_id, &mappings, &options)?;
        session.save()?;
        if session.json {
            return print_json(&preview);
        }
        print_preview(&preview);
    } else {
        let report = session.service.apply_with(parent_id, &mappings, options)?;
        session.save()?;
        if session.json {
            return print_json(&report);
        }
        print_report(parent_id.0, &report);
    }
    Ok(())
}

fn next_parent_id(store: &MemoryStore) -> ParentId {
    let snapshot = Snapshot::from_store(store);
    ParentId(snapshot.parents.iter().map(|p| p.id.0).max().unwrap_or(0) + 1)
}

fn next_child_id(store: &MemoryStore) -> u64 {
    let snapshot = Snapshot::from_store(store);
    snapshot
        .parents
        .iter()
        .flat_map(|p| p.children.iter().map(|c| c.id.0))
        .max()
        .unwrap_or(0)
        + 1
}
