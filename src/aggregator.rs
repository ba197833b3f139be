//! Multi-source aggregation
//!
//! Fans one query out to the knowledge-graph walk and every flat provider
//! at once. Each contribution runs under its own timeout and the whole
//! fan-out under a per-query deadline; a provider that fails or runs out of
//! time contributes nothing. Contributions are merged in registration
//! order, so the union never depends on which provider answered first.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::time::{timeout, timeout_at, Instant};
use unicode_normalization::UnicodeNormalization;

use crate::error::{ProviderError, ProviderResult};
use crate::model::CandidatePath;
use crate::providers::{EntityLookup, FlatProvider};
use crate::walker::GraphWalker;

/// Slack on top of the walk budget before the graph contribution is abandoned
const WALK_GRACE: Duration = Duration::from_secs(1);

/// Entity lookup paired with the walker that expands its hits
pub struct GraphSource {
    lookup: Arc<dyn EntityLookup>,
    walker: GraphWalker,
}

impl GraphSource {
    pub fn new(lookup: Arc<dyn EntityLookup>, walker: GraphWalker) -> Self {
        Self { lookup, walker }
    }

    pub fn source_id(&self) -> &str {
        self.lookup.source_id()
    }

    /// Upper bound on one contribution: the lookup call plus the walk budget
    pub fn time_bound(&self) -> Duration {
        self.walker.call_timeout() + self.walker.walk_budget() + WALK_GRACE
    }

    /// Resolve `query` to an entity and walk its owners
    ///
    /// A query the directory cannot resolve contributes nothing.
    pub async fn candidates(&self, query: &str) -> ProviderResult<Vec<CandidatePath>> {
        let lookup = timeout(self.walker.call_timeout(), self.lookup.lookup_entity(query))
            .await
            .map_err(|_| ProviderError::timeout(self.source_id()))??;
        match lookup {
            Some(entity) => {
                tracing::debug!(query = %query, entity = %entity.id, "Starting graph walk");
                Ok(self.walker.walk(&entity, query).await)
            }
            None => {
                tracing::debug!(query = %query, provider = self.source_id(), "No entity found");
                Ok(Vec::new())
            }
        }
    }
}

struct Contribution {
    index: usize,
    source: String,
    result: ProviderResult<Vec<CandidatePath>>,
}

/// Concurrent fan-out over all configured providers
pub struct Aggregator {
    graph: Option<GraphSource>,
    flat: Vec<Arc<dyn FlatProvider>>,
    provider_timeout: Duration,
    query_deadline: Duration,
}

impl Aggregator {
    pub fn new(
        graph: Option<GraphSource>,
        flat: Vec<Arc<dyn FlatProvider>>,
        provider_timeout: Duration,
        query_deadline: Duration,
    ) -> Self {
        Self {
            graph,
            flat,
            provider_timeout,
            query_deadline,
        }
    }

    /// Number of registered contributions (graph walk counts as one)
    pub fn provider_count(&self) -> usize {
        self.flat.len() + usize::from(self.graph.is_some())
    }

    /// Every candidate path for `query`, graph paths first
    pub async fn aggregate(&self, query: &str) -> Vec<CandidatePath> {
        let deadline = Instant::now() + self.query_deadline;
        let mut pending = FuturesUnordered::new();

        let mut index = 0;
        if let Some(graph) = &self.graph {
            pending.push(Self::guarded(
                index,
                graph.source_id().to_string(),
                graph.time_bound(),
                graph.candidates(query),
            ));
            index += 1;
        }
        for provider in &self.flat {
            pending.push(Self::guarded(
                index,
                provider.source_id().to_string(),
                self.provider_timeout,
                provider.quick_lookup(query),
            ));
            index += 1;
        }

        let mut contributions = Vec::with_capacity(index);
        loop {
            match timeout_at(deadline, pending.next()).await {
                Ok(Some(contribution)) => contributions.push(contribution),
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        query = %query,
                        dropped = pending.len(),
                        "Query deadline reached, dropping pending providers"
                    );
                    break;
                }
            }
        }
        drop(pending);

        contributions.sort_by_key(|c| c.index);
        self.merge(query, contributions)
    }

    /// Wrap a provider call in its timeout
    fn guarded<'a, F>(
        index: usize,
        source: String,
        limit: Duration,
        call: F,
    ) -> BoxFuture<'a, Contribution>
    where
        F: std::future::Future<Output = ProviderResult<Vec<CandidatePath>>> + Send + 'a,
    {
        async move {
            let result = match timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::timeout(&source)),
            };
            Contribution {
                index,
                source,
                result,
            }
        }
        .boxed()
    }

    fn merge(&self, query: &str, contributions: Vec<Contribution>) -> Vec<CandidatePath> {
        let graph_count = usize::from(self.graph.is_some());
        let mut graph_paths = Vec::new();
        let mut flat_paths = Vec::new();

        for contribution in contributions {
            let paths = match contribution.result {
                Ok(paths) => paths,
                Err(e) => {
                    tracing::warn!(
                        query = %query,
                        provider = %contribution.source,
                        error = %e,
                        "Provider failed, contributing nothing"
                    );
                    continue;
                }
            };
            tracing::debug!(
                provider = %contribution.source,
                count = paths.len(),
                "Provider contribution"
            );

            let paths = paths
                .into_iter()
                .filter(|p| !p.labels.is_empty())
                .map(|p| anchor_to_query(p, query));
            if contribution.index < graph_count {
                graph_paths.extend(paths);
            } else {
                flat_paths.extend(paths);
            }
        }

        cross_verify(&mut flat_paths, &mut graph_paths);
        graph_paths.extend(flat_paths);
        graph_paths
    }
}

/// First label is always the query text as the caller typed it
fn anchor_to_query(mut path: CandidatePath, query: &str) -> CandidatePath {
    if let Some(first) = path.labels.first_mut() {
        if first.as_str() != query {
            *first = query.to_string();
        }
    }
    path
}

/// Mark candidates on which the knowledge graph and a flat source agree
///
/// A flat candidate agrees with a graph path when its terminal owner appears
/// on that path after the query; both sides are then marked verified.
pub fn cross_verify(flat: &mut [CandidatePath], graph: &mut [CandidatePath]) {
    for flat_path in flat.iter_mut().filter(|p| p.hops() > 0) {
        let owner = normalize_label(flat_path.terminal_label());
        for graph_path in graph.iter_mut() {
            if graph_path
                .labels
                .iter()
                .skip(1)
                .any(|label| normalize_label(label) == owner)
            {
                flat_path.verified = true;
                graph_path.verified = true;
            }
        }
    }
}

/// Composed, trimmed, lowercased
fn normalize_label(label: &str) -> String {
    label.trim().nfc().collect::<String>().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Confidence, RelationKind, TerminalKind};
    use crate::providers::fixture::FixtureFlatProvider;
    use crate::providers::FixtureGraph;
    use async_trait::async_trait;

    struct Slow;

    #[async_trait]
    impl FlatProvider for Slow {
        fn source_id(&self) -> &str {
            "slow"
        }

        async fn quick_lookup(&self, name: &str) -> ProviderResult<Vec<CandidatePath>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![CandidatePath::root(name, "slow")])
        }
    }

    fn acme_graph() -> GraphSource {
        let graph = Arc::new(
            FixtureGraph::builder()
                .organization("acme", "Acme Co")
                .organization("holdco", "Holdco")
                .edge("acme", "holdco", RelationKind::OwnedBy)
                .build(),
        );
        GraphSource::new(graph.clone(), GraphWalker::new(graph, 10))
    }

    fn answer(query: &str, owner: &str, source: &str) -> CandidatePath {
        CandidatePath::single_hop(
            query,
            owner,
            TerminalKind::Organization,
            RelationKind::OwnedBy,
            Confidence::Medium,
            source,
        )
    }

    #[tokio::test]
    async fn test_graph_and_flat_are_unioned() {
        let flat = FixtureFlatProvider::new("infobox")
            .answer("Acme Co", answer("Acme Co", "Other", "infobox"));
        let aggregator = Aggregator::new(
            Some(acme_graph()),
            vec![Arc::new(flat)],
            Duration::from_secs(5),
            Duration::from_secs(10),
        );

        let paths = aggregator.aggregate("Acme Co").await;
        assert_eq!(aggregator.provider_count(), 2);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].labels, vec!["Acme Co", "Holdco"]);
        assert_eq!(paths[1].labels, vec!["Acme Co", "Other"]);
        assert!(!paths[1].verified);
    }

    #[tokio::test]
    async fn test_cross_verification() {
        let flat = FixtureFlatProvider::new("text_search")
            .answer("Acme Co", answer("Acme Co", "holdco", "text_search"));
        let aggregator = Aggregator::new(
            Some(acme_graph()),
            vec![Arc::new(flat)],
            Duration::from_secs(5),
            Duration::from_secs(10),
        );

        let paths = aggregator.aggregate("Acme Co").await;
        let flat_path = paths.iter().find(|p| p.source == "text_search").unwrap();
        assert!(flat_path.verified);
    }

    #[tokio::test]
    async fn test_failing_provider_contributes_nothing() {
        let aggregator = Aggregator::new(
            Some(acme_graph()),
            vec![Arc::new(FixtureFlatProvider::new("infobox").failing())],
            Duration::from_secs(5),
            Duration::from_secs(10),
        );

        let paths = aggregator.aggregate("Acme Co").await;
        assert_eq!(paths.len(), 1);
    }

    #[tokio::test]
    async fn test_labels_anchored_to_query() {
        let flat = FixtureFlatProvider::new("infobox")
            .answer("acme co", answer("ACME CO", "Other", "infobox"));
        let aggregator = Aggregator::new(
            None,
            vec![Arc::new(flat)],
            Duration::from_secs(5),
            Duration::from_secs(10),
        );

        let paths = aggregator.aggregate("Acme Co").await;
        assert_eq!(paths[0].labels, vec!["Acme Co", "Other"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout() {
        let aggregator = Aggregator::new(
            Some(acme_graph()),
            vec![Arc::new(Slow)],
            Duration::from_secs(1),
            Duration::from_secs(30),
        );

        let paths = aggregator.aggregate("Acme Co").await;
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].source, "fixture");
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_deadline_drops_pending() {
        let aggregator = Aggregator::new(
            Some(acme_graph()),
            vec![Arc::new(Slow)],
            Duration::from_secs(120),
            Duration::from_secs(2),
        );

        let started = Instant::now();
        let paths = aggregator.aggregate("Acme Co").await;
        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn test_cross_verify_ignores_bare_roots() {
        let mut graph = vec![CandidatePath::root("Acme", "fixture")];
        let mut flat = vec![CandidatePath::root("Acme", "infobox")];
        cross_verify(&mut flat, &mut graph);
        assert!(!flat[0].verified);
        assert!(!graph[0].verified);
    }

    #[test]
    fn test_cross_verify_marks_both_sides() {
        let mut graph = vec![
            CandidatePath {
                labels: vec!["A".into(), "Holdco".into(), "Pat".into()],
                ..CandidatePath::root("A", "fixture")
            },
            CandidatePath {
                labels: vec!["A".into(), "Other".into()],
                ..CandidatePath::root("A", "fixture")
            },
        ];
        let mut flat = vec![answer("A", "HOLDCO ", "infobox")];
        cross_verify(&mut flat, &mut graph);
        assert!(flat[0].verified);
        assert!(graph[0].verified);
        assert!(!graph[1].verified);
    }

    #[test]
    fn test_cross_verify_matches_decomposed_accents() {
        let mut graph = vec![CandidatePath {
            labels: vec!["Evian".into(), "Danone Société".into()],
            ..CandidatePath::root("Evian", "fixture")
        }];
        let mut flat = vec![answer("Evian", "Danone Socie\u{301}te\u{301}", "text_search")];
        cross_verify(&mut flat, &mut graph);
        assert!(flat[0].verified);
        assert!(graph[0].verified);
    }
}
