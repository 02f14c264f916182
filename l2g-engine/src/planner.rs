//! Dry-run planning: classify a mapping against current taxonomy state
//! without touching the store

use crate::report::{AttributePreview, MigrationPreview};
use l2g_core::normalize::{slug, taxonomy_key};
use l2g_core::{AttributeMapping, Config, ParentRecord};
use l2g_storage::{CatalogStore, StoreResult};

pub struct Planner<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S: CatalogStore + ?Sized> Planner<'a, S> {
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// Preview what an apply would create and reuse.
    ///
    /// Only read operations are issued, so repeated calls with the same input
    /// return the same preview.
    pub fn plan(
        &self,
        parent: &ParentRecord,
        mappings: &[AttributeMapping],
        auto_create_terms: bool,
    ) -> StoreResult<MigrationPreview> {
        let mut preview = MigrationPreview::default();

        for mapping in mappings {
            let attribute = self.plan_attribute(parent, mapping, auto_create_terms)?;
            preview.errors.extend(attribute.errors.iter().cloned());
            preview.attributes.push(attribute);
        }

        Ok(preview)
    }

    fn plan_attribute(
        &self,
        parent: &ParentRecord,
        mapping: &AttributeMapping,
        auto_create_terms: bool,
    ) -> StoreResult<AttributePreview> {
        let local_name = mapping.local.name.trim();
        let key = taxonomy_key(&mapping.target.taxonomy_key, &self.config.taxonomy.prefix);

        let mut preview = AttributePreview {
            local_attribute: local_name.to_string(),
            taxonomy: key.clone(),
            ..AttributePreview::default()
        };

        if local_name.is_empty() {
            preview.errors.push("Local attribute name is required".to_string());
        }
        if key.is_empty() {
            preview.errors.push(format!(
                "Target taxonomy is required for local attribute \"{}\"",
                local_name
            ));
        }
        if !preview.errors.is_empty() {
            return Ok(preview);
        }

        if !has_replaceable_definition(parent, local_name, &key) {
            preview.errors.push(format!(
                "Local attribute \"{}\" not found on product {}",
                local_name, parent.id
            ));
        }

        preview.attribute_exists = self.store.find_taxonomy(&key)?.is_some();
        let queryable = preview.attribute_exists && self.store.taxonomy_registered(&key);
        if !preview.attribute_exists {
            if mapping.create_attribute_if_missing {
                preview.will_create_attribute = true;
            } else {
                preview.errors.push(format!(
                    "Attribute {} does not exist and creation is disabled",
                    key
                ));
            }
        }

        for term in &mapping.terms {
            let desired = match slug(&term.desired_term_key) {
                s if s.is_empty() => slug(&term.local_value),
                s => s,
            };
            if desired.is_empty() {
                preview.errors.push(format!(
                    "Term for local value \"{}\" has no usable key",
                    term.local_value
                ));
                continue;
            }

            let existing = if queryable {
                let by_id = match term.term_id {
                    Some(id) => self.store.get_term(&key, id)?,
                    None => None,
                };
                match by_id {
                    Some(found) => Some(found.slug),
                    None => self.store.find_term_by_slug(&key, &desired)?.map(|t| t.slug),
                }
            } else {
                None
            };

            match existing {
                Some(existing_slug) => push_unique(&mut preview.existing_terms, existing_slug),
                None if term.create || !preview.attribute_exists || auto_create_terms => {
                    push_unique(&mut preview.create_terms, desired)
                }
                None => preview.errors.push(format!(
                    "Term \"{}\" ({}) not found in {} and not marked for creation",
                    term.local_value, desired, key
                )),
            }
        }

        Ok(preview)
    }
}

/// The parent carries a free-text attribute with this name, or was already
/// migrated to `taxonomy`
pub(crate) fn has_replaceable_definition(parent: &ParentRecord, local_name: &str, taxonomy: &str) -> bool {
    let wanted = slug(local_name);
    parent.attributes.values().any(|def| {
        if def.is_taxonomy() {
            def.name() == taxonomy
        } else {
            slug(def.name()) == wanted
        }
    })
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l2g_core::{AttributeDefinition, ParentId, ProductKind};
    use l2g_storage::{MemoryStore, StoreOp};

    fn parent() -> ParentRecord {
        let mut parent = ParentRecord::new(ParentId(1), "Camiseta", ProductKind::Variable);
        parent.attributes.insert(
            "cor".to_string(),
            AttributeDefinition::FreeText {
                name: "Cor".to_string(),
                options: vec!["Azul".to_string(), "Preto".to_string()],
                visible: true,
                variation: true,
                position: 0,
            },
        );
        parent
    }

    #[test]
    fn test_new_attribute_forces_term_creation() {
        let store = MemoryStore::new();
        let config = Config::default();
        let mapping = AttributeMapping::new("Cor", "pa_cor")
            .create_attribute(true)
            .with_term("Azul", "azul", false)
            .with_term("Preto", "preto", true);

        let preview = Planner::new(&store, &config)
            .plan(&parent(), &[mapping], false)
            .unwrap();

        let attr = &preview.attributes[0];
        assert!(!attr.attribute_exists);
        assert!(attr.will_create_attribute);
        assert_eq!(attr.create_terms, vec!["azul", "preto"]);
        assert!(preview.is_valid());
    }

    #[test]
    fn test_existing_terms_partitioned() {
        let store = MemoryStore::new();
        store.insert_taxonomy("pa_cor", "Cor");
        store.insert_term("pa_cor", "Azul", "azul");
        let config = Config::default();

        let mapping = AttributeMapping::new("Cor", "pa_cor")
            .with_term("Azul", "azul", false)
            .with_term("Preto", "preto", true)
            .with_term("Verde", "verde", false);

        let preview = Planner::new(&store, &config)
            .plan(&parent(), &[mapping.clone()], false)
            .unwrap();

        let attr = &preview.attributes[0];
        assert!(attr.attribute_exists);
        assert_eq!(attr.existing_terms, vec!["azul"]);
        assert_eq!(attr.create_terms, vec!["preto"]);
        assert_eq!(preview.errors.len(), 1);
        assert!(preview.errors[0].contains("not marked for creation"));

        let auto = Planner::new(&store, &config)
            .plan(&parent(), &[mapping], true)
            .unwrap();
        assert_eq!(auto.attributes[0].create_terms, vec!["preto", "verde"]);
        assert!(auto.is_valid());
    }

    #[test]
    fn test_validation_errors() {
        let store = MemoryStore::new();
        let config = Config::default();
        let missing_target = AttributeMapping::new("Cor", "");
        let missing_local = AttributeMapping::new("Material", "pa_material").create_attribute(true);
        let missing_attr = AttributeMapping::new("Cor", "pa_cor");

        let preview = Planner::new(&store, &config)
            .plan(&parent(), &[missing_target, missing_local, missing_attr], false)
            .unwrap();

        assert_eq!(preview.attributes.len(), 3);
        assert!(preview.attributes[0].errors[0].contains("Target taxonomy is required"));
        assert!(preview.attributes[1].errors[0].contains("not found on product"));
        assert!(preview.attributes[2].errors[0].contains("creation is disabled"));
        assert_eq!(preview.errors.len(), 3);
    }

    #[test]
    fn test_plan_never_writes() {
        let store = MemoryStore::new();
        store.insert_taxonomy("pa_cor", "Cor");
        let config = Config::default();
        let mapping = AttributeMapping::new("Cor", "pa_cor").with_term("Azul", "azul", true);
        let planner = Planner::new(&store, &config);

        let first = planner.plan(&parent(), &[mapping.clone()], false).unwrap();
        let second = planner.plan(&parent(), &[mapping], false).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.call_count(StoreOp::CreateTerm), 0);
        assert_eq!(store.call_count(StoreOp::CreateTaxonomy), 0);
        assert_eq!(store.call_count(StoreOp::AssignTerms), 0);
        assert_eq!(store.term_count("pa_cor"), 0);
    }
}
