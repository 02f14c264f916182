/// Catalog records: parents, children, taxonomies and terms
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            pub fn value(&self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Parent record id. Signed so that non-positive ids from callers can be
    /// rejected as invalid input rather than failing to parse.
    ParentId(i64)
);
id_type!(
    /// Child (variation) record id
    ChildId(u64)
);
id_type!(
    /// Opaque store identifier of a term
    TermId(u64)
);
id_type!(
    /// Store identifier of a shared attribute
    AttributeId(u64)
);

impl ParentId {
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

/// Shared attribute backed by a taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub attribute_id: AttributeId,
    pub key: String,
    pub label: String,
    #[serde(default = "default_order_by")]
    pub order_by: String,
    #[serde(default)]
    pub has_archives: bool,
}

/// Request to create a taxonomy-backed attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaxonomy {
    pub key: String,
    pub label: String,
    pub order_by: String,
    pub has_archives: bool,
}

fn default_order_by() -> String {
    "name".to_string()
}

/// Controlled-vocabulary value within a taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    #[default]
    Simple,
    Variable,
}

/// A parent attribute definition, either shared or local free text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeDefinition {
    Taxonomy {
        attribute_id: AttributeId,
        taxonomy: String,
        #[serde(default)]
        options: Vec<TermId>,
        #[serde(default)]
        visible: bool,
        #[serde(default)]
        variation: bool,
        #[serde(default)]
        position: u32,
    },
    FreeText {
        name: String,
        #[serde(default)]
        options: Vec<String>,
        #[serde(default)]
        visible: bool,
        #[serde(default)]
        variation: bool,
        #[serde(default)]
        position: u32,
    },
}

impl AttributeDefinition {
    /// Display name for free text, taxonomy key for shared attributes
    pub fn name(&self) -> &str {
        match self {
            AttributeDefinition::Taxonomy { taxonomy, .. } => taxonomy,
            AttributeDefinition::FreeText { name, .. } => name,
        }
    }

    pub fn is_taxonomy(&self) -> bool {
        matches!(self, AttributeDefinition::Taxonomy { .. })
    }

    pub fn visible(&self) -> bool {
        match self {
            AttributeDefinition::Taxonomy { visible, .. }
            | AttributeDefinition::FreeText { visible, .. } => *visible,
        }
    }

    pub fn variation(&self) -> bool {
        match self {
            AttributeDefinition::Taxonomy { variation, .. }
            | AttributeDefinition::FreeText { variation, .. } => *variation,
        }
    }

    pub fn position(&self) -> u32 {
        match self {
            AttributeDefinition::Taxonomy { position, .. }
            | AttributeDefinition::FreeText { position, .. } => *position,
        }
    }

    /// Free-text option values; empty for taxonomy-backed definitions
    pub fn text_options(&self) -> &[String] {
        match self {
            AttributeDefinition::FreeText { options, .. } => options,
            AttributeDefinition::Taxonomy { .. } => &[],
        }
    }
}

/// Legacy flat attribute shape: values joined with `|`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyAttribute {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub is_variation: bool,
    #[serde(default)]
    pub is_taxonomy: bool,
    #[serde(default)]
    pub position: Option<u32>,
}

/// Attribute as found in stored data, in either shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAttribute {
    Typed(AttributeDefinition),
    Legacy(LegacyAttribute),
}

impl RawAttribute {
    /// Convert into the canonical tagged definition.
    ///
    /// Legacy taxonomy entries carry no attribute id or option list; those are
    /// left at zero/empty and filled by the store's term assignments.
    pub fn into_definition(self) -> AttributeDefinition {
        match self {
            RawAttribute::Typed(def) => def,
            RawAttribute::Legacy(legacy) => {
                let position = legacy.position.unwrap_or(0);
                if legacy.is_taxonomy {
                    AttributeDefinition::Taxonomy {
                        attribute_id: AttributeId::default(),
                        taxonomy: legacy.name,
                        options: Vec::new(),
                        visible: legacy.is_visible,
                        variation: legacy.is_variation,
                        position,
                    }
                } else {
                    let options = legacy
                        .value
                        .split('|')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                        .collect();
                    AttributeDefinition::FreeText {
                        name: legacy.name,
                        options,
                        visible: legacy.is_visible,
                        variation: legacy.is_variation,
                        position,
                    }
                }
            }
        }
    }
}

/// The record being reclassified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRecord {
    pub id: ParentId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub kind: ProductKind,
    /// Keyed by slug of the free-text name or by taxonomy key
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeDefinition>,
    #[serde(default)]
    pub children: Vec<ChildId>,
}

impl ParentRecord {
    pub fn new(id: ParentId, title: impl Into<String>, kind: ProductKind) -> Self {
        Self {
            id,
            title: title.into(),
            kind,
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn is_variable(&self) -> bool {
        self.kind == ProductKind::Variable
    }

    /// Free-text definitions in declaration order
    pub fn free_text_attributes(&self) -> impl Iterator<Item = (&String, &AttributeDefinition)> {
        self.attributes.iter().filter(|(_, def)| !def.is_taxonomy())
    }
}

/// A dependent (variation) record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRecord {
    pub id: ChildId,
    pub parent_id: ParentId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sku: String,
    /// Scalar meta values, including `attribute_*` pointers
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    /// Declared variation attributes: attribute name or taxonomy key to value
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ChildRecord {
    pub fn new(id: ChildId, parent_id: ParentId) -> Self {
        Self {
            id,
            parent_id,
            title: String::new(),
            sku: String::new(),
            meta: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_attribute_conversion() {
        let json = r#"{"name":"Cor","value":"Azul | Preto |  ","is_visible":true,"is_variation":true,"is_taxonomy":false}"#;
        let raw: RawAttribute = serde_json::from_str(json).unwrap();

        match raw.into_definition() {
            AttributeDefinition::FreeText { name, options, visible, variation, position } => {
                assert_eq!(name, "Cor");
                assert_eq!(options, vec!["Azul".to_string(), "Preto".to_string()]);
                assert!(visible);
                assert!(variation);
                assert_eq!(position, 0);
            }
            other => panic!("Expected free text, got {:?}", other),
        }
    }

    #[test]
    fn test_typed_attribute_passthrough() {
        let json = r#"{"type":"taxonomy","attribute_id":3,"taxonomy":"pa_cor","options":[10,11],"visible":true,"variation":false,"position":2}"#;
        let raw: RawAttribute = serde_json::from_str(json).unwrap();
        let def = raw.into_definition();

        assert!(def.is_taxonomy());
        assert_eq!(def.name(), "pa_cor");
        assert_eq!(def.position(), 2);
        assert!(def.text_options().is_empty());
    }

    #[test]
    fn test_legacy_taxonomy_shape() {
        let json = r#"{"name":"pa_tamanho","is_taxonomy":true,"position":4}"#;
        let def = serde_json::from_str::<RawAttribute>(json).unwrap().into_definition();

        assert!(def.is_taxonomy());
        assert_eq!(def.position(), 4);
    }

    #[test]
    fn test_parent_id_validity() {
        assert!(ParentId(1).is_valid());
        assert!(!ParentId(0).is_valid());
        assert!(!ParentId(-3).is_valid());
        assert_eq!(ParentId::from(9).to_string(), "9");
    }
}
