//! Local attribute discovery on a parent record

use l2g_core::normalize::child_meta_key;
use l2g_core::{LocalAttribute, ParentId, ParentRecord};
use l2g_storage::{CatalogStore, StoreResult};

/// Free-text attributes of a parent, in declaration order.
///
/// A missing parent yields an empty list.
pub fn discover<S: CatalogStore + ?Sized>(store: &S, parent_id: ParentId) -> StoreResult<Vec<LocalAttribute>> {
    match store.get_parent(parent_id)? {
        Some(parent) => discover_in(store, &parent),
        None => Ok(Vec::new()),
    }
}

pub fn discover_in<S: CatalogStore + ?Sized>(store: &S, parent: &ParentRecord) -> StoreResult<Vec<LocalAttribute>> {
    let children = if parent.is_variable() {
        store.children_of(parent.id)?
    } else {
        Vec::new()
    };

    let mut locals = Vec::new();
    for (_, definition) in parent.free_text_attributes() {
        let name = definition.name().trim();
        if name.is_empty() {
            continue;
        }

        let mut values: Vec<String> = Vec::new();
        for value in definition.text_options() {
            let value = value.trim();
            if !value.is_empty() && !values.iter().any(|v| v == value) {
                values.push(value.to_string());
            }
        }

        let meta_key = child_meta_key(name);
        let mut used_in_children = false;
        for child in &children {
            if store
                .child_meta(*child, &meta_key)?
                .is_some_and(|v| !v.trim().is_empty())
            {
                used_in_children = true;
                break;
            }
        }

        locals.push(LocalAttribute {
            name: name.to_string(),
            label: name.to_string(),
            values,
            used_in_children,
        });
    }

    Ok(locals)
}
