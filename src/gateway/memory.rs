//! In-process [`CacheGateway`] backed by a string map.
//!
//! Uses the same key layout as the Redis backend so tests can inspect raw
//! keys with [`MemoryCache::raw`].

use crate::gateway::{keys, CacheGateway, GatewayError};
use crate::model::{OrderId, Stage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Shared key/value map. Clones share the same storage.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value stored under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, String>> {
        // A poisoned map still holds valid strings
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn put(&self, key: String, value: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, value.to_string());
    }
}

#[async_trait]
impl CacheGateway for MemoryCache {
    async fn set_cancelled(&self, order_id: OrderId) -> Result<(), GatewayError> {
        self.put(keys::cancelled(order_id), keys::CANCELLED_FLAG);
        Ok(())
    }

    async fn get_cancelled(&self, order_id: OrderId) -> Result<bool, GatewayError> {
        Ok(self.raw(&keys::cancelled(order_id)).as_deref() == Some(keys::CANCELLED_FLAG))
    }

    async fn set_live_stage(&self, order_id: OrderId, stage: Stage) -> Result<(), GatewayError> {
        self.put(keys::status(order_id), stage.as_str());
        Ok(())
    }

    async fn get_live_stage(&self, order_id: OrderId) -> Result<Option<Stage>, GatewayError> {
        self.raw(&keys::status(order_id))
            .map(|value| {
                value
                    .parse::<Stage>()
                    .map_err(|e| GatewayError::Decode(e.to_string()))
            })
            .transpose()
    }
}
