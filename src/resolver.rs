//! Ownership resolver
//!
//! Entry point of the engine. Wires providers from configuration, runs the
//! aggregator for a query and ranks what comes back.

use std::sync::Arc;

use crate::aggregator::{Aggregator, GraphSource};
use crate::cache::{CachedRelations, EdgeCache};
use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::model::ResolutionResult;
use crate::providers::fixture::FixtureFile;
use crate::providers::wikipedia::WikipediaClient;
use crate::providers::{
    EntityLookup, FlatProvider, InfoboxProvider, MarketDataProvider, RelationFetch,
    TextSearchProvider, WikidataProvider,
};
use crate::scoring;
use crate::walker::GraphWalker;

/// Knowledge-graph capabilities handed to the resolver
pub struct GraphProviders {
    pub lookup: Arc<dyn EntityLookup>,
    pub relations: Arc<dyn RelationFetch>,
}

pub struct OwnershipResolver {
    aggregator: Aggregator,
    max_alternatives: usize,
    cache: Option<Arc<EdgeCache>>,
}

impl OwnershipResolver {
    /// Build with live providers enabled by `config`
    pub fn from_config(config: &ResolverConfig) -> Result<Self, ResolveError> {
        config.validate()?;
        let languages = config.languages.clone();

        let graph = if config.providers.wikidata {
            let wikidata = Arc::new(
                WikidataProvider::new(config).map_err(|e| ResolveError::Config(e.to_string()))?,
            );
            Some(GraphProviders {
                lookup: wikidata.clone(),
                relations: wikidata,
            })
        } else {
            None
        };

        let mut flat: Vec<Arc<dyn FlatProvider>> = Vec::new();
        if config.providers.infobox || config.providers.text_search {
            let wikipedia = Arc::new(
                WikipediaClient::new(config)
                    .map_err(|e| ResolveError::Config(format!("{:#}", e)))?,
            );
            if config.providers.infobox {
                flat.push(Arc::new(InfoboxProvider::new(
                    wikipedia.clone(),
                    languages.clone(),
                )));
            }
            if config.providers.text_search {
                flat.push(Arc::new(TextSearchProvider::new(wikipedia, languages)));
            }
        }
        if let Some(market) = MarketDataProvider::from_config(config)
            .map_err(|e| ResolveError::Config(e.to_string()))?
        {
            flat.push(Arc::new(market));
        }

        Ok(Self::with_providers(config, graph, flat))
    }

    /// Build over an in-memory fixture instead of live services
    pub fn from_fixture(config: &ResolverConfig, fixture: FixtureFile) -> Self {
        let (graph, flat) = fixture.into_providers();
        let graph = Arc::new(graph);
        let flat = flat
            .into_iter()
            .map(|p| Arc::new(p) as Arc<dyn FlatProvider>)
            .collect();
        Self::with_providers(
            config,
            Some(GraphProviders {
                lookup: graph.clone(),
                relations: graph,
            }),
            flat,
        )
    }

    /// Build with explicit providers
    pub fn with_providers(
        config: &ResolverConfig,
        graph: Option<GraphProviders>,
        flat: Vec<Arc<dyn FlatProvider>>,
    ) -> Self {
        let cache = config.cache_enabled.then(|| Arc::new(EdgeCache::new()));

        let graph = graph.map(|providers| {
            let relations: Arc<dyn RelationFetch> = match &cache {
                Some(cache) => Arc::new(CachedRelations::new(providers.relations, cache.clone())),
                None => providers.relations,
            };
            GraphSource::new(
                providers.lookup,
                GraphWalker::new(relations, config.max_depth)
                    .with_timeouts(config.call_timeout(), config.provider_timeout()),
            )
        });

        tracing::debug!(
            graph = graph.is_some(),
            flat = flat.len(),
            cache = cache.is_some(),
            "Resolver initialised"
        );

        Self {
            aggregator: Aggregator::new(
                graph,
                flat,
                config.provider_timeout(),
                config.query_deadline(),
            ),
            max_alternatives: config.max_alternatives,
            cache,
        }
    }

    /// Shared relation cache, when enabled
    pub fn cache(&self) -> Option<&Arc<EdgeCache>> {
        self.cache.as_ref()
    }

    /// Resolve the ultimate owner of `query`
    ///
    /// Fails only for a blank query. A query nothing can resolve returns an
    /// empty result.
    pub async fn resolve_ownership(&self, query: &str) -> Result<ResolutionResult, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::invalid_query("query must not be blank"));
        }

        tracing::info!(
            query = %query,
            providers = self.aggregator.provider_count(),
            "Resolving ownership"
        );
        let candidates = self.aggregator.aggregate(query).await;
        let ranking = scoring::rank(candidates, self.max_alternatives);

        tracing::info!(
            query = %query,
            candidates = ranking.candidates.len(),
            best = ranking.best.as_ref().map(|b| b.terminal_label()).unwrap_or("-"),
            "Resolution complete"
        );

        Ok(ResolutionResult {
            query: query.to_string(),
            candidates: ranking.candidates,
            best_result: ranking.best,
            alternatives: ranking.alternatives,
        })
    }
}
