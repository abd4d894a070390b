// ── In-memory resource cache ──
//
// Process-wide store of resolved payloads keyed by `(resource type, id)`.
// No persistence and no expiry: entries live until removed or cleared.

use std::collections::HashMap;

use dashmap::DashMap;
use serde_json::Value;
use tracing::trace;

use crate::resource::ResourceType;

/// Partitioned cache of resource payloads.
///
/// Only the types in [`ResourceType::CACHED`] own a partition. Lookups on
/// any other type miss, and writes to them are silently dropped. Writes
/// always replace the whole entry. Operations never suspend; callers must
/// not assume a read followed by a write is atomic across an `.await`.
#[derive(Debug)]
pub struct ResourceCache {
    partitions: HashMap<ResourceType, DashMap<String, Value>>,
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceCache {
    pub fn new() -> Self {
        let partitions = ResourceType::CACHED
            .into_iter()
            .map(|resource| (resource, DashMap::new()))
            .collect();
        Self { partitions }
    }

    /// Whether an entry exists. Unpartitioned types always yield `false`.
    pub fn has(&self, resource: ResourceType, id: &str) -> bool {
        self.partitions
            .get(&resource)
            .is_some_and(|partition| partition.contains_key(id))
    }

    /// The cached payload, or `None` on a miss.
    pub fn get(&self, resource: ResourceType, id: &str) -> Option<Value> {
        let value = self
            .partitions
            .get(&resource)?
            .get(id)
            .map(|entry| entry.value().clone())?;
        trace!(%resource, id = %id, "cache hit");
        Some(value)
    }

    /// The cached payload, or `default` on a miss.
    pub fn get_or_default(&self, resource: ResourceType, id: &str, default: Value) -> Value {
        self.get(resource, id).unwrap_or(default)
    }

    /// Store a payload, replacing any previous entry.
    ///
    /// No-op for resource types without a partition.
    pub fn set(&self, resource: ResourceType, id: impl Into<String>, payload: Value) {
        if let Some(partition) = self.partitions.get(&resource) {
            let id = id.into();
            trace!(%resource, id = %id, "cache store");
            partition.insert(id, payload);
        }
    }

    /// Drop an entry. No-op if absent.
    pub fn remove(&self, resource: ResourceType, id: &str) {
        if let Some(partition) = self.partitions.get(&resource) {
            if partition.remove(id).is_some() {
                trace!(%resource, id = %id, "cache remove");
            }
        }
    }

    /// Empty one partition, or every partition when `resource` is `None`.
    pub fn clear(&self, resource: Option<ResourceType>) {
        trace!(resource = ?resource, "cache clear");
        match resource {
            Some(resource) => {
                if let Some(partition) = self.partitions.get(&resource) {
                    partition.clear();
                }
            }
            None => self.partitions.values().for_each(DashMap::clear),
        }
    }

    /// Without an argument, the partition names; with one, the ids cached
    /// in that partition. Order is unspecified.
    pub fn keys(&self, resource: Option<ResourceType>) -> Vec<String> {
        match resource {
            None => self.partitions.keys().map(|r| String::from(*r)).collect(),
            Some(resource) => self
                .partitions
                .get(&resource)
                .map(|partition| partition.iter().map(|entry| entry.key().clone()).collect())
                .unwrap_or_default(),
        }
    }
}
