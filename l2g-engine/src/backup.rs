//! Pre-apply snapshots of a parent and its children, and rollback

use crate::remap::writer::HookGuard;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use l2g_core::normalize::CHILD_META_PREFIX;
use l2g_core::{AttributeDefinition, ChildId, ParentId, ParentRecord};
use l2g_storage::{CatalogStore, StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Parent meta key holding every backup of that parent, keyed by backup id
pub const BACKUP_META_KEY: &str = "_local2global_backups";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildBackup {
    pub id: ChildId,
    /// Only `attribute_*` keys
    pub meta: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Stored as key/definition pairs so the order survives JSON objects
    #[serde(with = "indexmap::map::serde_seq")]
    pub attributes: IndexMap<String, AttributeDefinition>,
    pub children: Vec<ChildBackup>,
}

fn backups_of<S: CatalogStore + ?Sized>(store: &S, parent: ParentId) -> StoreResult<Map<String, Value>> {
    match store.parent_meta(parent, BACKUP_META_KEY)? {
        Some(Value::Object(map)) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn store_backups<S: CatalogStore + ?Sized>(
    store: &S,
    parent: ParentId,
    backups: Map<String, Value>,
) -> StoreResult<()> {
    let value = if backups.is_empty() {
        Value::Null
    } else {
        Value::Object(backups)
    };
    store.put_parent_meta(parent, BACKUP_META_KEY, value)
}

/// Snapshot the parent's attribute definitions and every child's
/// `attribute_*` meta and structured attributes. Returns the backup id.
pub fn create<S: CatalogStore + ?Sized>(store: &S, parent: &ParentRecord) -> StoreResult<String> {
    let mut children = Vec::new();
    for child_id in store.children_of(parent.id)? {
        if let Some(child) = store.get_child(child_id)? {
            children.push(ChildBackup {
                id: child.id,
                meta: child
                    .meta
                    .into_iter()
                    .filter(|(k, _)| k.starts_with(CHILD_META_PREFIX))
                    .collect(),
                attributes: child.attributes,
            });
        }
    }

    let backup = Backup {
        id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        attributes: parent.attributes.clone(),
        children,
    };
    let encoded = serde_json::to_value(&backup).map_err(|e| StoreError::Backend(e.to_string()))?;

    let mut backups = backups_of(store, parent.id)?;
    backups.insert(backup.id.clone(), encoded);
    store_backups(store, parent.id, backups)?;

    tracing::info!(
        parent_id = parent.id.0,
        backup_id = %backup.id,
        children = backup.children.len(),
        "backup.created"
    );
    Ok(backup.id)
}

/// Backups of a parent, oldest first
pub fn list<S: CatalogStore + ?Sized>(store: &S, parent: ParentId) -> StoreResult<Vec<Backup>> {
    let mut backups = Vec::new();
    for (_, value) in backups_of(store, parent)? {
        let backup: Backup = serde_json::from_value(value).map_err(|e| StoreError::Backend(e.to_string()))?;
        backups.push(backup);
    }
    backups.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(backups)
}

/// Restore a backup and discard it. `false` when `backup_id` is unknown.
pub fn rollback<S: CatalogStore + ?Sized>(store: &S, parent_id: ParentId, backup_id: &str) -> StoreResult<bool> {
    let mut backups = backups_of(store, parent_id)?;
    let Some(value) = backups.remove(backup_id) else {
        return Ok(false);
    };
    let backup: Backup = serde_json::from_value(value).map_err(|e| StoreError::Backend(e.to_string()))?;

    let mut parent = store
        .get_parent(parent_id)?
        .ok_or_else(|| StoreError::NotFound(format!("parent {}", parent_id)))?;
    parent.attributes = backup.attributes.clone();
    store.save_parent(&parent)?;

    for saved in &backup.children {
        let Some(current) = store.get_child(saved.id)? else {
            continue;
        };
        let _hooks = HookGuard::suspend(store, saved.id);
        for key in current.meta.keys().filter(|k| k.starts_with(CHILD_META_PREFIX)) {
            if !saved.meta.contains_key(key) {
                store.delete_child_meta(saved.id, key)?;
            }
        }
        for (key, value) in &saved.meta {
            store.put_child_meta(saved.id, key, value)?;
        }
        store.set_child_attributes(saved.id, &saved.attributes)?;
        store.invalidate_child_caches(saved.id);
    }

    if parent.is_variable() {
        store.sync_variations(parent_id)?;
    }
    store.invalidate_parent_caches(parent_id);
    store_backups(store, parent_id, backups)?;

    tracing::info!(
        parent_id = parent_id.0,
        backup_id = %backup_id,
        children = backup.children.len(),
        "backup.restored"
    );
    Ok(true)
}
