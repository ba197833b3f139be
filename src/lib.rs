//! Ownership Resolver - ultimate-owner resolution engine
//!
//! Answers "who ultimately owns X?" by walking ownership and parent
//! organization relations in a public knowledge graph, cross-checking the
//! answer against independent flat sources and ranking the resulting
//! candidate chains.
//!
//! ## Pipeline
//! Query -> Aggregator -> {Entity Lookup + Graph Walker, flat providers}
//! -> Scorer & Fuser -> ResolutionResult
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ownership_resolver::{OwnershipResolver, ResolverConfig};
//!
//! # async fn run() -> Result<(), ownership_resolver::ResolveError> {
//! let config = ResolverConfig::default().with_env_overrides()?;
//! let resolver = OwnershipResolver::from_config(&config)?;
//! let result = resolver.resolve_ownership("Kitupé").await?;
//! if let Some(best) = result.best_result {
//!     println!("{}", best.labels.join(" -> "));
//! }
//! # Ok(())
//! # }
//! ```

// Core types and errors
pub mod config;
pub mod error;
pub mod model;

// Provider contracts and adapters
pub mod providers;

// Heuristic owner extraction shared by flat providers
pub mod extract;

// Engine
pub mod aggregator;
pub mod cache;
pub mod resolver;
pub mod scoring;
pub mod walker;

pub use config::{ProviderSettings, ResolverConfig};
pub use error::{ProviderError, ProviderResult, ResolveError};
pub use model::{
    CandidatePath, Confidence, Entity, EntityKind, OwnershipEdge, RelationKind,
    ResolutionResult, TerminalKind, Termination,
};
pub use resolver::{GraphProviders, OwnershipResolver};
pub use scoring::{rank, Ranking};
pub use walker::GraphWalker;
