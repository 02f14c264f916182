/// Terminal output helpers shared by every command
use anyhow::Result;
use colored::*;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color as TableColor, ContentArrangement, Table};
use l2g_engine::{ChildStats, MigrationPreview, ReasonCode};
use serde::Serialize;

pub fn section_header(title: &str) {
    println!("\n{}", title.bold().cyan());
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn info(message: &str) {
    println!("{} {}", "●".blue(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

pub fn empty(message: &str) {
    println!("{} {}", "◌".dimmed(), message);
}

pub fn tree_item(is_last: bool, label: &str, value: Option<&str>) {
    let prefix = if is_last { "└─" } else { "├─" };
    match value {
        Some(val) => println!("{} {}: {}", prefix.dimmed(), label, val),
        None => println!("{} {}", prefix.dimmed(), label),
    }
}

/// Nested items under a tree entry
pub fn tree_section(title: &str, items: &[(&str, String)], is_last: bool) {
    tree_item(is_last, title, None);
    let continuation = if is_last { "   " } else { "│  " };

    for (i, (label, value)) in items.iter().enumerate() {
        let prefix = if i + 1 == items.len() { "└─" } else { "├─" };
        println!("{}{} {}: {}", continuation.dimmed(), prefix.dimmed(), label, value);
    }
}

pub fn create_standard_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .add_attribute(Attribute::Bold)
        .fg(TableColor::Cyan)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Comma-joined list, or a dash when empty
pub fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

/// Dry-run result as a tree, one branch per attribute
pub fn print_preview(preview: &MigrationPreview) {
    section_header(&format!("Dry run ({})", preview.corr_id));

    for (i, attribute) in preview.attributes.iter().enumerate() {
        let status = if attribute.attribute_exists {
            "exists".green().to_string()
        } else if attribute.will_create_attribute {
            "will be created".yellow().to_string()
        } else {
            "missing".red().to_string()
        };
        let mut items = vec![
            ("attribute", status),
            ("existing terms", join_or_dash(&attribute.existing_terms)),
            ("terms to create", join_or_dash(&attribute.create_terms)),
        ];
        for error in &attribute.errors {
            items.push(("error", error.red().to_string()));
        }
        let title = format!("{} → {}", attribute.local_attribute, attribute.taxonomy);
        tree_section(&title, &items, i + 1 == preview.attributes.len());
    }

    if preview.is_valid() {
        success("Mapping is valid");
    } else {
        warning(&format!("{} problem(s) found", preview.errors.len()));
    }
}

/// One row per taxonomy with the child counters
pub fn child_stats_table<'a>(rows: impl IntoIterator<Item = (&'a String, &'a ChildStats)>) -> Table {
    let mut table = create_standard_table();
    table.set_header(vec![
        header_cell("Taxonomy"),
        header_cell("Updated"),
        header_cell("Skipped"),
        header_cell("Total"),
        header_cell("Updated %"),
        header_cell("Reasons"),
    ]);

    for (taxonomy, stats) in rows {
        let reasons: Vec<String> = ReasonCode::ALL
            .iter()
            .filter(|r| stats.reason(**r) > 0)
            .map(|r| format!("{}={}", r, stats.reason(*r)))
            .collect();
        table.add_row(vec![
            Cell::new(taxonomy),
            Cell::new(stats.updated),
            Cell::new(stats.skipped),
            Cell::new(stats.total),
            Cell::new(format!("{:.2}", stats.updated_pct)),
            Cell::new(join_or_dash(&reasons)),
        ]);
    }
    table
}
