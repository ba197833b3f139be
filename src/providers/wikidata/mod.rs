//! Wikidata knowledge-graph provider
//!
//! This module provides:
//! - API types and SPARQL query builders for ownership properties
//! - A rate-limited client for search, labels and SPARQL
//! - `WikidataProvider`, the `EntityLookup` + `RelationFetch` adapter used
//!   by the graph walker

pub mod client;
pub mod types;

use async_trait::async_trait;

pub use client::WikidataClient;
pub use types::*;

use super::{EntityLookup, RelationFetch};
use crate::config::ResolverConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::model::{Entity, EntityKind, OwnershipEdge, RelationKind};

pub const SOURCE_ID: &str = "wikidata";

const OWNERSHIP_CONFIDENCE: f64 = 0.9;
const FOUNDER_CONFIDENCE: f64 = 0.4;

pub struct WikidataProvider {
    client: WikidataClient,
    languages: Vec<String>,
    include_founders: bool,
}

impl WikidataProvider {
    pub fn new(config: &ResolverConfig) -> ProviderResult<Self> {
        let client =
            WikidataClient::new(config).map_err(|e| ProviderError::unavailable(SOURCE_ID, e))?;
        Ok(Self::with_client(client, config))
    }

    /// Create with an existing client
    pub fn with_client(client: WikidataClient, config: &ResolverConfig) -> Self {
        Self {
            client,
            languages: config
                .languages
                .iter()
                .filter(|l| !l.trim().is_empty())
                .cloned()
                .collect(),
            include_founders: config.include_founders,
        }
    }

    fn search_language(&self) -> &str {
        self.languages.first().map(String::as_str).unwrap_or("en")
    }

    fn properties(&self) -> Vec<&'static str> {
        let mut props = vec![PROP_OWNED_BY, PROP_PARENT_ORG];
        if self.include_founders {
            props.push(PROP_FOUNDED_BY);
        }
        props
    }
}

fn relation_for(property: &str) -> RelationKind {
    match property {
        PROP_PARENT_ORG => RelationKind::ParentOrg,
        PROP_FOUNDED_BY => RelationKind::Founder,
        _ => RelationKind::OwnedBy,
    }
}

/// Turn owner rows into edges; founders only count when nothing else does
fn edges_from_rows(from: &Entity, rows: Vec<OwnerRow>) -> Vec<OwnershipEdge> {
    let has_owner = rows.iter().any(|r| r.property != PROP_FOUNDED_BY);
    rows.into_iter()
        .filter(|r| !(has_owner && r.property == PROP_FOUNDED_BY))
        .map(|r| {
            let relation = relation_for(&r.property);
            let confidence = match relation {
                RelationKind::Founder => FOUNDER_CONFIDENCE,
                _ => OWNERSHIP_CONFIDENCE,
            };
            // P31 without Q5 still leaves the kind open; the walker classifies
            let kind = if r.is_human {
                EntityKind::Human
            } else {
                EntityKind::Unknown
            };
            OwnershipEdge::new(
                from.clone(),
                Entity::new(r.owner_id, r.owner_label, kind),
                relation,
                confidence,
                SOURCE_ID,
            )
        })
        .collect()
}

fn ensure_qid(entity_id: &str) -> ProviderResult<()> {
    if is_valid_qid(entity_id) {
        Ok(())
    } else {
        Err(ProviderError::malformed(
            SOURCE_ID,
            format!("not a Wikidata item id: {}", entity_id),
        ))
    }
}

#[async_trait]
impl EntityLookup for WikidataProvider {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    async fn lookup_entity(&self, name: &str) -> ProviderResult<Option<Entity>> {
        let hits = self
            .client
            .search_entities(name, self.search_language())
            .await
            .map_err(|e| ProviderError::unavailable(SOURCE_ID, e))?;

        let Some(hit) = pick_best_hit(&hits, name) else {
            tracing::debug!(query = %name, "No Wikidata entity found");
            return Ok(None);
        };

        let label = match hit.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => self
                .client
                .entity_label(&hit.id, &self.languages)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(entity = %hit.id, error = %e, "Label fetch failed");
                    hit.id.clone()
                }),
        };

        Ok(Some(Entity::new(hit.id.clone(), label, EntityKind::Unknown)))
    }
}

#[async_trait]
impl RelationFetch for WikidataProvider {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    async fn fetch_edges(&self, entity_id: &str) -> ProviderResult<Vec<OwnershipEdge>> {
        ensure_qid(entity_id)?;
        let rows = self
            .client
            .owners(entity_id, &self.properties(), &self.languages)
            .await
            .map_err(|e| ProviderError::unavailable(SOURCE_ID, e))?;

        let from = Entity::new(entity_id, entity_id, EntityKind::Unknown);
        Ok(edges_from_rows(&from, rows))
    }

    async fn classify_entity(&self, entity_id: &str) -> ProviderResult<EntityKind> {
        ensure_qid(entity_id)?;
        let human = self
            .client
            .is_human(entity_id)
            .await
            .map_err(|e| ProviderError::unavailable(SOURCE_ID, e))?;
        Ok(if human {
            EntityKind::Human
        } else {
            EntityKind::Organization
        })
    }
}
