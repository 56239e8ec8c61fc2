use crate::resource::{Resource, ResourceKey};
use ahash::AHashMap as HashMap;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Remove the configuration of the resource.
    Delete,
    /// Add or replace the configuration of the resource.
    AddOrUpdate,
}

/// A change to a resource that the configuration renderer must apply.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceChange {
    pub op: Operation,
    pub resource: Arc<Resource>,
    /// Set on the Delete of a resource that was rejected by validation.
    pub error: Option<String>,
}

// === impl ResourceChange ===

impl ResourceChange {
    pub fn delete(resource: Arc<Resource>) -> Self {
        Self {
            op: Operation::Delete,
            resource,
            error: None,
        }
    }

    pub fn add_or_update(resource: Arc<Resource>) -> Self {
        Self {
            op: Operation::AddOrUpdate,
            resource,
            error: None,
        }
    }

    pub fn key(&self) -> ResourceKey {
        self.resource.key()
    }
}

/// Collapses a change list to one change per resource.
///
/// The last change for each resource is kept. All deletes are emitted before
/// all updates, each group in the order its resources first appeared, so
/// that a host released by a delete is free before an update claims it.
pub fn squash_resource_changes(changes: Vec<ResourceChange>) -> Vec<ResourceChange> {
    let mut last = HashMap::<ResourceKey, ResourceChange>::with_capacity(changes.len());
    let mut order = Vec::with_capacity(changes.len());
    for change in changes {
        let key = change.key();
        if last.insert(key.clone(), change).is_none() {
            order.push(key);
        }
    }

    let mut deletes = Vec::new();
    let mut updates = Vec::new();
    for key in order {
        if let Some(change) = last.remove(&key) {
            match change.op {
                Operation::Delete => deletes.push(change),
                Operation::AddOrUpdate => updates.push(change),
            }
        }
    }

    deletes.extend(updates);
    deletes
}
