//! Mapping input: a JSON file or inline `--attr`/`--term` pairs

use anyhow::{Context, Result};
use clap::Args;
use l2g_core::{AttributeMapping, TermMapping};
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone, Default)]
pub struct MappingArgs {
    /// Mapping file (JSON array, as written by `suggest --out`)
    #[arg(short, long, value_name = "FILE", conflicts_with = "attr")]
    pub mapping: Option<PathBuf>,

    /// Inline attribute mapping, repeatable
    #[arg(long, value_name = "LOCAL:PA_SLUG")]
    pub attr: Vec<String>,

    /// Inline term mapping applied to every --attr, repeatable
    #[arg(long, value_name = "VALUE:SLUG")]
    pub term: Vec<String>,

    /// Create missing attributes and terms for inline mappings
    #[arg(long)]
    pub create_missing: bool,
}

impl MappingArgs {
    pub fn load(&self) -> Result<Vec<AttributeMapping>> {
        match &self.mapping {
            Some(path) => read_mapping_file(path),
            None => {
                if self.attr.is_empty() {
                    anyhow::bail!("Provide --mapping <FILE> or at least one --attr local:pa_slug");
                }
                let mappings = inline_mappings(&self.attr, &self.term, self.create_missing);
                if mappings.is_empty() {
                    anyhow::bail!("Invalid mapping: every --attr must look like local:pa_slug");
                }
                Ok(mappings)
            }
        }
    }
}

pub fn read_mapping_file(path: &Path) -> Result<Vec<AttributeMapping>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mapping {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid mapping file {}", path.display()))
}

/// Split `left:right`; pairs with an empty side are dropped
pub fn split_pair(input: &str) -> Option<(&str, &str)> {
    let (left, right) = input.split_once(':')?;
    let (left, right) = (left.trim(), right.trim());
    if left.is_empty() || right.is_empty() {
        None
    } else {
        Some((left, right))
    }
}

/// Build one mapping per valid `attrs` pair, each carrying every valid term pair
pub fn inline_mappings(attrs: &[String], terms: &[String], create: bool) -> Vec<AttributeMapping> {
    let terms: Vec<TermMapping> = terms
        .iter()
        .filter_map(|t| split_pair(t))
        .map(|(value, slug)| TermMapping::new(value, slug, create))
        .collect();

    attrs
        .iter()
        .filter_map(|a| split_pair(a))
        .map(|(local, taxonomy)| {
            let mut mapping = AttributeMapping::new(local, taxonomy).create_attribute(create);
            for term in &terms {
                mapping = mapping.with_term(term.local_value.clone(), term.desired_term_key.clone(), term.create);
            }
            mapping
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("Cor:pa_cor"), Some(("Cor", "pa_cor")));
        assert_eq!(split_pair("Azul: azul-marinho "), Some(("Azul", "azul-marinho")));
        assert_eq!(split_pair("Cor:"), None);
        assert_eq!(split_pair("Cor"), None);
    }

    #[test]
    fn test_inline_mappings_share_terms() {
        let attrs = vec!["Cor:pa_cor".to_string(), "bad".to_string(), "Tom:pa_tom".to_string()];
        let terms = vec!["Azul:azul".to_string(), ":x".to_string()];

        let mappings = inline_mappings(&attrs, &terms, true);

        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[1].target.taxonomy_key, "pa_tom");
        assert!(mappings[0].create_attribute_if_missing);
        assert_eq!(mappings[0].terms.len(), 1);
        assert_eq!(mappings[0].terms[0].desired_term_key, "azul");
        assert_eq!(mappings[0].local.values, vec!["Azul".to_string()]);
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let args = MappingArgs::default();
        assert!(args.load().is_err());
    }
}
