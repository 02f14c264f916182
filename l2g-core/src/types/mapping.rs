/// Caller-supplied mapping requests and resolution results
use super::catalog::TermId;
use serde::{Deserialize, Serialize};

/// Free-text attribute discovered on a parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAttribute {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub used_in_children: bool,
}

impl LocalAttribute {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            values: Vec::new(),
            used_in_children: false,
        }
    }
}

/// Shared attribute a local attribute is migrated into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAttribute {
    #[serde(default)]
    pub taxonomy_key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub exists: bool,
}

/// Optional creation arguments for a new shared attribute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_archive: Option<bool>,
}

/// One local value and the term it should become
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermMapping {
    pub local_value: String,
    #[serde(default)]
    pub desired_term_key: String,
    #[serde(default)]
    pub create: bool,
    /// Display name used when the term is created; defaults to the local value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_name: Option<String>,
    /// Explicit existing term, tried before the slug lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_id: Option<TermId>,
}

impl TermMapping {
    pub fn new(local_value: impl Into<String>, desired_term_key: impl Into<String>, create: bool) -> Self {
        Self {
            local_value: local_value.into(),
            desired_term_key: desired_term_key.into(),
            create,
            term_name: None,
            term_id: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.term_name.as_deref().unwrap_or(&self.local_value)
    }
}

/// Unit of migration submitted by callers: one local attribute to one taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMapping {
    pub local: LocalAttribute,
    pub target: TargetAttribute,
    #[serde(default)]
    pub create_attribute_if_missing: bool,
    #[serde(default)]
    pub terms: Vec<TermMapping>,
    #[serde(default)]
    pub attribute_args: AttributeArgs,
}

impl AttributeMapping {
    pub fn new(local_name: impl Into<String>, taxonomy_key: impl Into<String>) -> Self {
        let local = LocalAttribute::named(local_name);
        Self {
            target: TargetAttribute {
                taxonomy_key: taxonomy_key.into(),
                label: local.label.clone(),
                exists: false,
            },
            local,
            create_attribute_if_missing: false,
            terms: Vec::new(),
            attribute_args: AttributeArgs::default(),
        }
    }

    pub fn create_attribute(mut self, create: bool) -> Self {
        self.create_attribute_if_missing = create;
        self
    }

    pub fn with_term(mut self, local_value: impl Into<String>, term_key: impl Into<String>, create: bool) -> Self {
        let term = TermMapping::new(local_value, term_key, create);
        self.local.values.push(term.local_value.clone());
        self.terms.push(term);
        self
    }

    /// Label for a newly created attribute: target label, else local label, else name
    pub fn target_label(&self) -> &str {
        [&self.target.label, &self.local.label, &self.local.name]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Outcome of resolving one term mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTerm {
    pub local_value: String,
    pub term_id: TermId,
    pub term_key: String,
    pub created: bool,
}
