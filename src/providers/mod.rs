//! Provider contracts
//!
//! The core abstraction for pluggable ownership sources. Each external
//! directory (Wikidata, Wikipedia, market data, in-memory fixtures) plugs
//! into the engine through one or more of these traits and normalizes its
//! data to `Entity`, `OwnershipEdge` and `CandidatePath` at the boundary.
//!
//! # Implementation Notes
//!
//! - Return `Ok(None)` / empty `Vec` for "nothing found", errors only for
//!   transport or parse failures
//! - Errors never abort a resolution; the walker and aggregator degrade them
//! - Implementations must be `Send + Sync` so branches can share them

pub mod fixture;
pub mod market;
pub mod wikidata;
pub mod wikipedia;

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::model::{CandidatePath, Entity, EntityKind, OwnershipEdge};

pub use fixture::FixtureGraph;
pub use market::MarketDataProvider;
pub use wikidata::WikidataProvider;
pub use wikipedia::{InfoboxProvider, TextSearchProvider};

/// Resolves free text to the best-matching entity of a directory
#[async_trait]
pub trait EntityLookup: Send + Sync {
    /// Unique identifier for this source (e.g., "wikidata")
    fn source_id(&self) -> &str;

    /// Look up the best match for `name`
    ///
    /// `name` is already trimmed and non-empty.
    async fn lookup_entity(&self, name: &str) -> ProviderResult<Option<Entity>>;
}

/// Outgoing ownership edges and classification for a known entity
///
/// Calls must be idempotent: repeating them for the same id returns the
/// same answer against unchanged upstream data.
#[async_trait]
pub trait RelationFetch: Send + Sync {
    fn source_id(&self) -> &str;

    /// Edges from `entity_id` toward its owners or parents
    async fn fetch_edges(&self, entity_id: &str) -> ProviderResult<Vec<OwnershipEdge>>;

    /// Whether `entity_id` is a person or an organization
    async fn classify_entity(&self, entity_id: &str) -> ProviderResult<EntityKind>;
}

/// Flat strategy answering a query with ready-made candidate paths
#[async_trait]
pub trait FlatProvider: Send + Sync {
    fn source_id(&self) -> &str;

    /// Candidate paths for `name`; every path starts with `name`
    async fn quick_lookup(&self, name: &str) -> ProviderResult<Vec<CandidatePath>>;
}
