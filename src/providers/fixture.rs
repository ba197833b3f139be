//! In-memory ownership graph
//!
//! Implements every provider contract over a static graph, loaded from YAML
//! or assembled with the builder. Used for offline runs of the CLI and as
//! the test double for the walker, aggregator and resolver.
//!
//! ```yaml
//! entities:
//!   acme: { label: "Acme Co", kind: organization }
//!   holdco: { label: "Holdco" }
//! edges:
//!   - { from: acme, to: holdco, relation: owned_by }
//! flat:
//!   infobox:
//!     "Acme Co":
//!       - { owner: "Jane Doe", terminal_kind: human, confidence: high }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;

use super::{EntityLookup, FlatProvider, RelationFetch};
use crate::error::{ProviderError, ProviderResult, ResolveError};
use crate::model::{
    CandidatePath, Confidence, Entity, EntityKind, OwnershipEdge, RelationKind, TerminalKind,
};

const FIXTURE_SOURCE: &str = "fixture";
const DEFAULT_EDGE_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureEntity {
    pub label: String,
    #[serde(default)]
    pub kind: EntityKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureEdge {
    pub from: String,
    pub to: String,
    #[serde(default = "default_relation")]
    pub relation: RelationKind,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_relation() -> RelationKind {
    RelationKind::OwnedBy
}

fn default_confidence() -> f64 {
    DEFAULT_EDGE_CONFIDENCE
}

/// Canned flat-provider answer for one query
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureAnswer {
    pub owner: String,
    #[serde(default = "default_terminal")]
    pub terminal_kind: TerminalKind,
    #[serde(default = "default_relation")]
    pub relation: RelationKind,
    #[serde(default = "default_answer_confidence")]
    pub confidence: Confidence,
}

fn default_terminal() -> TerminalKind {
    TerminalKind::Unknown
}

fn default_answer_confidence() -> Confidence {
    Confidence::Medium
}

/// On-disk fixture format
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureFile {
    #[serde(default)]
    pub entities: BTreeMap<String, FixtureEntity>,
    #[serde(default)]
    pub edges: Vec<FixtureEdge>,
    /// Entity ids whose edge fetch fails
    #[serde(default)]
    pub failing: BTreeSet<String>,
    /// provider name -> query -> answers
    #[serde(default)]
    pub flat: BTreeMap<String, BTreeMap<String, Vec<FixtureAnswer>>>,
}

impl FixtureFile {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ResolveError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ResolveError::Config(format!("Failed to read fixture {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&content)
            .map_err(|e| ResolveError::Config(format!("Invalid fixture {}: {}", path.display(), e)))
    }

    /// Split into the knowledge graph and one flat provider per entry
    pub fn into_providers(self) -> (FixtureGraph, Vec<FixtureFlatProvider>) {
        let flat = self
            .flat
            .iter()
            .map(|(name, answers)| {
                let mut provider = FixtureFlatProvider::new(name.clone());
                for (query, rows) in answers {
                    for row in rows {
                        provider = provider.answer(
                            query,
                            CandidatePath::single_hop(
                                query.clone(),
                                row.owner.clone(),
                                row.terminal_kind,
                                row.relation,
                                row.confidence,
                                name.clone(),
                            ),
                        );
                    }
                }
                provider
            })
            .collect();
        (FixtureGraph::from_file_data(self), flat)
    }
}

/// Static knowledge graph
#[derive(Debug, Default)]
pub struct FixtureGraph {
    entities: BTreeMap<String, FixtureEntity>,
    edges: Vec<FixtureEdge>,
    failing: BTreeSet<String>,
    /// Report every edge target as `Unknown` so callers must classify
    opaque_kinds: bool,
    fetch_calls: AtomicUsize,
    classify_calls: AtomicUsize,
}

impl FixtureGraph {
    pub fn builder() -> FixtureGraphBuilder {
        FixtureGraphBuilder::default()
    }

    fn from_file_data(file: FixtureFile) -> Self {
        Self {
            entities: file.entities,
            edges: file.edges,
            failing: file.failing,
            ..Default::default()
        }
    }

    /// Number of `fetch_edges` calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn classify_count(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    fn entity(&self, id: &str) -> Entity {
        match self.entities.get(id) {
            Some(e) => Entity::new(id, e.label.clone(), e.kind),
            None => Entity::new(id, id, EntityKind::Unknown),
        }
    }
}

#[async_trait]
impl EntityLookup for FixtureGraph {
    fn source_id(&self) -> &str {
        FIXTURE_SOURCE
    }

    async fn lookup_entity(&self, name: &str) -> ProviderResult<Option<Entity>> {
        let needle = name.trim().to_lowercase();
        let exact = self
            .entities
            .iter()
            .find(|(id, e)| e.label.to_lowercase() == needle || id.to_lowercase() == needle);
        let found = exact.or_else(|| {
            self.entities
                .iter()
                .find(|(_, e)| e.label.to_lowercase().contains(&needle))
        });
        Ok(found.map(|(id, e)| Entity::new(id.clone(), e.label.clone(), e.kind)))
    }
}

#[async_trait]
impl RelationFetch for FixtureGraph {
    fn source_id(&self) -> &str {
        FIXTURE_SOURCE
    }

    async fn fetch_edges(&self, entity_id: &str) -> ProviderResult<Vec<OwnershipEdge>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(entity_id) {
            return Err(ProviderError::Unavailable {
                provider: FIXTURE_SOURCE.to_string(),
                message: format!("injected failure for {}", entity_id),
            });
        }

        let from = self.entity(entity_id);
        Ok(self
            .edges
            .iter()
            .filter(|e| e.from == entity_id)
            .map(|e| {
                let mut to = self.entity(&e.to);
                if self.opaque_kinds {
                    to.kind = EntityKind::Unknown;
                }
                OwnershipEdge::new(from.clone(), to, e.relation, e.confidence, FIXTURE_SOURCE)
            })
            .collect())
    }

    async fn classify_entity(&self, entity_id: &str) -> ProviderResult<EntityKind> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .entities
            .get(entity_id)
            .map(|e| e.kind)
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct FixtureGraphBuilder {
    file: FixtureFile,
    opaque_kinds: bool,
}

impl FixtureGraphBuilder {
    pub fn entity(mut self, id: &str, label: &str, kind: EntityKind) -> Self {
        self.file.entities.insert(
            id.to_string(),
            FixtureEntity {
                label: label.to_string(),
                kind,
            },
        );
        self
    }

    pub fn organization(self, id: &str, label: &str) -> Self {
        self.entity(id, label, EntityKind::Organization)
    }

    pub fn human(self, id: &str, label: &str) -> Self {
        self.entity(id, label, EntityKind::Human)
    }

    pub fn edge(self, from: &str, to: &str, relation: RelationKind) -> Self {
        self.edge_with_confidence(from, to, relation, DEFAULT_EDGE_CONFIDENCE)
    }

    pub fn edge_with_confidence(
        mut self,
        from: &str,
        to: &str,
        relation: RelationKind,
        confidence: f64,
    ) -> Self {
        self.file.edges.push(FixtureEdge {
            from: from.to_string(),
            to: to.to_string(),
            relation,
            confidence,
        });
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.file.failing.insert(id.to_string());
        self
    }

    pub fn opaque_kinds(mut self) -> Self {
        self.opaque_kinds = true;
        self
    }

    pub fn build(self) -> FixtureGraph {
        let mut graph = FixtureGraph::from_file_data(self.file);
        graph.opaque_kinds = self.opaque_kinds;
        graph
    }
}

/// Flat provider returning canned paths per query (case-insensitive)
#[derive(Debug, Clone)]
pub struct FixtureFlatProvider {
    name: String,
    answers: BTreeMap<String, Vec<CandidatePath>>,
    fail: bool,
}

impl FixtureFlatProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            answers: BTreeMap::new(),
            fail: false,
        }
    }

    pub fn answer(mut self, query: &str, path: CandidatePath) -> Self {
        self.answers
            .entry(query.trim().to_lowercase())
            .or_default()
            .push(path);
        self
    }

    /// Make every lookup fail with `Unavailable`
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl FlatProvider for FixtureFlatProvider {
    fn source_id(&self) -> &str {
        &self.name
    }

    async fn quick_lookup(&self, name: &str) -> ProviderResult<Vec<CandidatePath>> {
        if self.fail {
            return Err(ProviderError::Unavailable {
                provider: self.name.clone(),
                message: "injected failure".to_string(),
            });
        }
        Ok(self
            .answers
            .get(&name.trim().to_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
entities:
  acme: { label: "Acme Co", kind: organization }
  holdco: { label: "Holdco" }
edges:
  - { from: acme, to: holdco, relation: owned_by }
flat:
  infobox:
    "Acme Co":
      - { owner: "Jane Doe", terminal_kind: human, confidence: high }
"#;

    #[tokio::test]
    async fn test_fixture_file_into_providers() {
        let file: FixtureFile = serde_yaml::from_str(YAML).unwrap();
        let (graph, flat) = file.into_providers();

        let acme = graph.lookup_entity("acme co").await.unwrap().unwrap();
        assert_eq!(acme.id, "acme");

        let edges = graph.fetch_edges("acme").await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to.label, "Holdco");
        assert_eq!(edges[0].relation, RelationKind::OwnedBy);
        assert_eq!(edges[0].to.kind, EntityKind::Unknown);

        assert_eq!(flat.len(), 1);
        let paths = flat[0].quick_lookup("Acme Co").await.unwrap();
        assert_eq!(paths[0].labels, vec!["Acme Co", "Jane Doe"]);
        assert_eq!(paths[0].terminal_kind, TerminalKind::Human);
        assert_eq!(paths[0].source, "infobox");
    }

    #[tokio::test]
    async fn test_failing_entity() {
        let graph = FixtureGraph::builder()
            .organization("a", "A")
            .failing("a")
            .build();
        assert!(graph.fetch_edges("a").await.is_err());
        assert_eq!(graph.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_opaque_kinds_hide_target_kind() {
        let graph = FixtureGraph::builder()
            .organization("a", "A")
            .human("p", "Pat")
            .edge("a", "p", RelationKind::OwnedBy)
            .opaque_kinds()
            .build();
        let edges = graph.fetch_edges("a").await.unwrap();
        assert_eq!(edges[0].to.kind, EntityKind::Unknown);
        assert_eq!(graph.classify_entity("p").await.unwrap(), EntityKind::Human);
    }

    #[tokio::test]
    async fn test_unknown_lookup() {
        let graph = FixtureGraph::builder().organization("a", "A").build();
        assert_eq!(graph.lookup_entity("zzz").await.unwrap(), None);
    }
}
