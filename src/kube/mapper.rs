//! Kind → resource mapping for manifests of arbitrary kinds
//!
//! Discovery results are cached per group/version/kind. An entry is dropped
//! when the server reports that the resource type no longer exists, so the
//! next lookup rediscovers it.

use std::collections::HashMap;
use std::sync::Mutex;

use kube::Client;
use kube::core::{ApiResource, GroupVersionKind};
use kube::discovery::{self, ApiCapabilities};

use super::errors::classify;
use crate::error::{Error, Result};

type Key = (String, String, String);

fn key_of(gvk: &GroupVersionKind) -> Key {
    (gvk.group.clone(), gvk.version.clone(), gvk.kind.clone())
}

/// Readable `group/version/Kind` label
pub fn describe(gvk: &GroupVersionKind) -> String {
    if gvk.group.is_empty() {
        format!("{}/{}", gvk.version, gvk.kind)
    } else {
        format!("{}/{}/{}", gvk.group, gvk.version, gvk.kind)
    }
}

/// Thread-safe mapping cache
#[derive(Default)]
pub struct MappingCache {
    entries: Mutex<HashMap<Key, (ApiResource, ApiCapabilities)>>,
}

impl MappingCache {
    pub fn get(&self, gvk: &GroupVersionKind) -> Option<(ApiResource, ApiCapabilities)> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key_of(gvk))
            .cloned()
    }

    pub fn insert(&self, gvk: &GroupVersionKind, mapping: (ApiResource, ApiCapabilities)) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key_of(gvk), mapping);
    }

    pub fn invalidate(&self, gvk: &GroupVersionKind) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&key_of(gvk));
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Discovery-backed resolver with a shared cache
pub struct RestMapper {
    client: Client,
    cache: MappingCache,
}

impl RestMapper {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cache: MappingCache::default(),
        }
    }

    /// Resolve a kind to its resource and scope
    pub async fn resolve(&self, gvk: &GroupVersionKind) -> Result<(ApiResource, ApiCapabilities)> {
        if let Some(hit) = self.cache.get(gvk) {
            return Ok(hit);
        }

        tracing::debug!("Discovering resource for {}", describe(gvk));
        let mapping = discovery::pinned_kind(&self.client, gvk)
            .await
            .map_err(|e| match e {
                kube::Error::Discovery(_) => Error::not_found("resource type", describe(gvk)),
                other => classify(other, "resource type", &describe(gvk)),
            })?;
        self.cache.insert(gvk, mapping.clone());
        Ok(mapping)
    }

    pub fn invalidate(&self, gvk: &GroupVersionKind) {
        tracing::debug!("Dropping cached mapping for {}", describe(gvk));
        self.cache.invalidate(gvk);
    }
}
