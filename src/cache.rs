//! Read-through relation cache
//!
//! `EdgeCache` maps entity ids to the edges and classification last
//! fetched for them. It may be shared across concurrent branches and
//! queries. Entries are inserted whole under the write lock; a missing or
//! stale entry simply behaves like a miss. Failures are never cached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::ProviderResult;
use crate::model::{EntityKind, OwnershipEdge};
use crate::providers::RelationFetch;

/// Shared `entity id -> relations` store
#[derive(Debug, Default)]
pub struct EdgeCache {
    edges: RwLock<HashMap<String, Arc<Vec<OwnershipEdge>>>>,
    kinds: RwLock<HashMap<String, EntityKind>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl EdgeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_edges(&self, entity_id: &str) -> Option<Arc<Vec<OwnershipEdge>>> {
        let found = self.edges.read().await.get(entity_id).cloned();
        self.record(found.is_some());
        found
    }

    pub async fn put_edges(&self, entity_id: &str, edges: Vec<OwnershipEdge>) {
        self.edges
            .write()
            .await
            .insert(entity_id.to_string(), Arc::new(edges));
    }

    pub async fn get_kind(&self, entity_id: &str) -> Option<EntityKind> {
        let found = self.kinds.read().await.get(entity_id).copied();
        self.record(found.is_some());
        found
    }

    pub async fn put_kind(&self, entity_id: &str, kind: EntityKind) {
        self.kinds.write().await.insert(entity_id.to_string(), kind);
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.edges.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        self.edges.write().await.clear();
        self.kinds.write().await.clear();
    }

    fn record(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Wraps a `RelationFetch` with a shared `EdgeCache`
pub struct CachedRelations {
    inner: Arc<dyn RelationFetch>,
    cache: Arc<EdgeCache>,
}

impl CachedRelations {
    pub fn new(inner: Arc<dyn RelationFetch>, cache: Arc<EdgeCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &Arc<EdgeCache> {
        &self.cache
    }
}

#[async_trait]
impl RelationFetch for CachedRelations {
    fn source_id(&self) -> &str {
        self.inner.source_id()
    }

    async fn fetch_edges(&self, entity_id: &str) -> ProviderResult<Vec<OwnershipEdge>> {
        if let Some(edges) = self.cache.get_edges(entity_id).await {
            return Ok(edges.as_ref().clone());
        }
        let edges = self.inner.fetch_edges(entity_id).await?;
        self.cache.put_edges(entity_id, edges.clone()).await;
        Ok(edges)
    }

    async fn classify_entity(&self, entity_id: &str) -> ProviderResult<EntityKind> {
        if let Some(kind) = self.cache.get_kind(entity_id).await {
            return Ok(kind);
        }
        let kind = self.inner.classify_entity(entity_id).await?;
        self.cache.put_kind(entity_id, kind).await;
        Ok(kind)
    }
}
