//! Verified child writes.
//!
//! Hosts may re-save a stale cached child right after a meta write, silently
//! undoing it. Writes here run with write hooks suspended, bust the child
//! cache, read the value back and rewrite once if it did not stick. The old
//! key is only removed once the new one holds its value.

use super::{RemapContext, WritePlan};
use l2g_core::ChildId;
use l2g_storage::{CatalogStore, StoreResult};

/// Suspends the store's write hooks until dropped
pub(crate) struct HookGuard<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
    child: ChildId,
}

impl<'a, S: CatalogStore + ?Sized> HookGuard<'a, S> {
    pub(crate) fn suspend(store: &'a S, child: ChildId) -> Self {
        store.suspend_write_hooks();
        tracing::debug!(child_id = child.0, "variation.hooks.suspended");
        Self { store, child }
    }
}

impl<S: CatalogStore + ?Sized> Drop for HookGuard<'_, S> {
    fn drop(&mut self) {
        self.store.resume_write_hooks();
        tracing::debug!(child_id = self.child.0, "variation.hooks.restored");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Read back as written on the first try
    Verified,
    /// Needed the corrective rewrite
    Corrected,
    /// Still wrong after the corrective rewrite
    Unverified,
}

pub struct AtomicMetaWriter<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: CatalogStore + ?Sized> AtomicMetaWriter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Write the new key, verify it, then retire the old key. The old key
    /// and the structured attributes are only touched once the new value
    /// reads back, so an unverified write leaves the child as it was.
    pub fn write(&self, child: ChildId, ctx: &RemapContext<'_>, plan: &WritePlan) -> StoreResult<WriteStatus> {
        self.put(child, ctx, plan)?;
        let status = if self.holds_value(child, ctx, plan)? {
            tracing::debug!(child_id = child.0, key = %ctx.new_key, value = %plan.value, "variation.persistence_verified");
            WriteStatus::Verified
        } else {
            tracing::warn!(
                child_id = child.0,
                key = %ctx.new_key,
                expected = %plan.value,
                "variation.persistence_failure"
            );
            self.put(child, ctx, plan)?;
            if !self.holds_value(child, ctx, plan)? {
                tracing::error!(child_id = child.0, key = %ctx.new_key, corrected = false, "variation.persistence_failure");
                return Ok(WriteStatus::Unverified);
            }
            tracing::info!(child_id = child.0, key = %ctx.new_key, corrected = true, "variation.persistence_verified");
            WriteStatus::Corrected
        };

        self.finish(child, ctx, plan)?;
        Ok(status)
    }

    /// Drop a leftover old key from a child whose new key is already right
    pub fn remove_old_key(&self, child: ChildId, ctx: &RemapContext<'_>) -> StoreResult<()> {
        if ctx.old_key == ctx.new_key {
            return Ok(());
        }
        let _hooks = HookGuard::suspend(self.store, child);
        self.store.delete_child_meta(child, &ctx.old_key)?;
        self.store.invalidate_child_caches(child);
        Ok(())
    }

    fn put(&self, child: ChildId, ctx: &RemapContext<'_>, plan: &WritePlan) -> StoreResult<()> {
        let _hooks = HookGuard::suspend(self.store, child);
        self.store.put_child_meta(child, &ctx.new_key, &plan.value)?;
        self.store.invalidate_child_caches(child);
        Ok(())
    }

    fn finish(&self, child: ChildId, ctx: &RemapContext<'_>, plan: &WritePlan) -> StoreResult<()> {
        if let Some(attributes) = &plan.attributes {
            let _hooks = HookGuard::suspend(self.store, child);
            self.store.set_child_attributes(child, attributes)?;
            self.store.invalidate_child_caches(child);
        }
        if plan.remove_old_meta {
            self.remove_old_key(child, ctx)?;
        }
        Ok(())
    }

    fn holds_value(&self, child: ChildId, ctx: &RemapContext<'_>, plan: &WritePlan) -> StoreResult<bool> {
        let written = self.store.child_meta(child, &ctx.new_key)?;
        Ok(written.as_deref() == Some(plan.value.as_str()))
    }
}
