//! Shared catalog fixtures for engine integration tests
#![allow(dead_code)]

use l2g_core::{AttributeDefinition, AttributeMapping, ChildId, ChildRecord, Config, ParentId, ParentRecord, ProductKind};
use l2g_engine::MappingService;
use l2g_storage::MemoryStore;

pub const PARENT: ParentId = ParentId(100);

pub fn free_text(name: &str, options: &[&str], position: u32) -> AttributeDefinition {
    AttributeDefinition::FreeText {
        name: name.to_string(),
        options: options.iter().map(|s| s.to_string()).collect(),
        visible: true,
        variation: true,
        position,
    }
}

pub fn child(id: u64, title: &str, meta: &[(&str, &str)]) -> ChildRecord {
    let mut child = ChildRecord::new(ChildId(id), PARENT);
    child.title = title.to_string();
    for (key, value) in meta {
        child.meta.insert(key.to_string(), value.to_string());
    }
    child
}

/// Variable "Camiseta" with free-text Cor and Tamanho and three children:
/// two with Cor meta, one carrying nothing at all
pub fn camiseta() -> MemoryStore {
    let store = MemoryStore::new();
    let mut parent = ParentRecord::new(PARENT, "Camiseta Básica", ProductKind::Variable);
    parent.attributes.insert("cor".to_string(), free_text("Cor", &["Azul", "Preto"], 0));
    parent.attributes.insert("tamanho".to_string(), free_text("Tamanho", &["P", "M"], 1));
    store.insert_parent(parent);

    store.insert_child(child(101, "Camiseta Básica", &[("attribute_cor", "Azul"), ("attribute_tamanho", "P")]));
    store.insert_child(child(102, "Camiseta Básica", &[("attribute_cor", "Preto"), ("attribute_tamanho", "M")]));
    store.insert_child(child(103, "Camiseta Básica", &[]));
    store
}

pub fn service(store: MemoryStore) -> MappingService<MemoryStore> {
    MappingService::new(store, Config::default())
}

/// Cor -> pa_cor, creating the attribute and both terms
pub fn cor_mapping() -> AttributeMapping {
    AttributeMapping::new("Cor", "pa_cor")
        .create_attribute(true)
        .with_term("Azul", "azul", true)
        .with_term("Preto", "preto", true)
}

pub fn meta(store: &MemoryStore, id: u64, key: &str) -> Option<String> {
    store.child(ChildId(id)).and_then(|c| c.meta.get(key).cloned())
}
