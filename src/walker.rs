//! Ownership graph walker
//!
//! Breadth-ordered traversal from a starting entity toward its owners,
//! driven by an explicit worklist rather than call recursion. Each level of
//! the worklist is fetched concurrently; the visited map is owned by the
//! traversal task and only mutated between levels, in path order, so the
//! emitted candidates do not depend on which fetch finishes first.
//!
//! Per entity the traversal moves `Unvisited -> Visiting -> Resolved`.
//! A branch ends when it reaches:
//! - a human owner (`Termination::Human`)
//! - an entity with no ownership edges (`Termination::NoFurtherOwners`)
//! - an entity already on the path or claimed by another branch
//!   (`Termination::Cycle`)
//! - the hop limit while owners remain (`Termination::DepthExceeded`)
//!
//! Every relation call runs under its own timeout, capped by the budget of
//! the whole walk; a call that fails or times out ends only its own branch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::{timeout, Instant};

use crate::model::{
    CandidatePath, Confidence, Entity, EntityKind, OwnershipEdge, RelationKind, TerminalKind,
    Termination, RELATION_UNKNOWN,
};
use crate::error::ProviderError;
use crate::providers::RelationFetch;
use crate::scoring::relation_weight;

/// Outbound calls in flight per traversal level
const BRANCH_CONCURRENCY: usize = 8;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_WALK_BUDGET: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Resolved,
}

/// One pending branch of the traversal
#[derive(Debug, Clone)]
struct Frame {
    entity: Entity,
    labels: Vec<String>,
    ids: Vec<String>,
    weakest: Option<f64>,
    last_relation: Option<RelationKind>,
}

impl Frame {
    fn root(entity: &Entity, label: &str) -> Self {
        Self {
            entity: entity.clone(),
            labels: vec![label.to_string()],
            ids: vec![entity.id.clone()],
            weakest: None,
            last_relation: None,
        }
    }

    fn depth(&self) -> usize {
        self.ids.len() - 1
    }

    fn extend(&self, edge: &OwnershipEdge) -> Self {
        let mut labels = self.labels.clone();
        labels.push(edge.to.label.clone());
        let mut ids = self.ids.clone();
        ids.push(edge.to.id.clone());
        Self {
            entity: edge.to.clone(),
            labels,
            ids,
            weakest: Some(self.weakest.map_or(edge.confidence, |w| w.min(edge.confidence))),
            last_relation: Some(edge.relation),
        }
    }

    fn finish(
        &self,
        terminal_kind: TerminalKind,
        termination: Termination,
        source: &str,
    ) -> CandidatePath {
        CandidatePath {
            labels: self.labels.clone(),
            terminal_kind,
            verified: false,
            confidence: self
                .weakest
                .map_or(Confidence::Medium, Confidence::from_score),
            relation_type: self
                .last_relation
                .map_or_else(|| RELATION_UNKNOWN.to_string(), |r| r.as_str().to_string()),
            source: source.to_string(),
            termination,
        }
    }
}

/// Cycle-safe, depth-bounded ownership traversal
pub struct GraphWalker {
    relations: Arc<dyn RelationFetch>,
    max_depth: usize,
    call_timeout: Duration,
    walk_budget: Duration,
}

impl GraphWalker {
    pub fn new(relations: Arc<dyn RelationFetch>, max_depth: usize) -> Self {
        Self {
            relations,
            max_depth: max_depth.max(1),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            walk_budget: DEFAULT_WALK_BUDGET,
        }
    }

    /// Bound each relation call by `call_timeout` and the whole walk by `walk_budget`
    ///
    /// A call that runs out of time degrades its branch to
    /// `NoFurtherOwners`; once the budget is spent, calls that are not
    /// immediately ready degrade the same way.
    pub fn with_timeouts(mut self, call_timeout: Duration, walk_budget: Duration) -> Self {
        self.call_timeout = call_timeout;
        self.walk_budget = walk_budget;
        self
    }

    pub(crate) fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub(crate) fn walk_budget(&self) -> Duration {
        self.walk_budget
    }

    /// Walk from `root` and return every candidate path found
    ///
    /// `root_label` becomes the first label of every path. The result is
    /// never empty.
    pub async fn walk(&self, root: &Entity, root_label: &str) -> Vec<CandidatePath> {
        let source = self.relations.source_id().to_string();
        let deadline = Instant::now() + self.walk_budget;
        let root_frame = Frame::root(root, root_label);

        let root_kind = match root.kind {
            EntityKind::Unknown => self.classify(root.id.clone(), deadline).await,
            known => known,
        };
        if root_kind == EntityKind::Human {
            return vec![root_frame.finish(TerminalKind::Human, Termination::Human, &source)];
        }

        let mut visited: HashMap<String, VisitState> = HashMap::new();
        visited.insert(root.id.clone(), VisitState::Visiting);

        let mut paths: Vec<CandidatePath> = Vec::new();
        let mut frontier = vec![root_frame];

        while !frontier.is_empty() {
            let edge_sets = self.fetch_level(&frontier, deadline).await;

            let mut expand: Vec<(Frame, Vec<OwnershipEdge>)> = Vec::new();
            for (frame, edges) in frontier.into_iter().zip(edge_sets) {
                if edges.is_empty() {
                    visited.insert(frame.entity.id.clone(), VisitState::Resolved);
                    paths.push(frame.finish(
                        TerminalKind::Organization,
                        Termination::NoFurtherOwners,
                        &source,
                    ));
                } else if frame.depth() >= self.max_depth {
                    tracing::debug!(
                        entity = %frame.entity.id,
                        depth = frame.depth(),
                        "Depth limit reached, terminating branch"
                    );
                    visited.insert(frame.entity.id.clone(), VisitState::Resolved);
                    paths.push(frame.finish(
                        TerminalKind::Organization,
                        Termination::DepthExceeded,
                        &source,
                    ));
                } else {
                    expand.push((frame, strongest_per_owner(edges)));
                }
            }

            let kinds = self.classify_targets(&expand, deadline).await;

            let mut next = Vec::new();
            for (frame, edges) in expand {
                for edge in &edges {
                    let kind = match edge.to.kind {
                        EntityKind::Unknown => kinds
                            .get(edge.to.id.as_str())
                            .copied()
                            .unwrap_or(EntityKind::Unknown),
                        known => known,
                    };

                    if kind == EntityKind::Human {
                        paths.push(frame.extend(edge).finish(
                            TerminalKind::Human,
                            Termination::Human,
                            &source,
                        ));
                        continue;
                    }

                    if frame.ids.contains(&edge.to.id) {
                        tracing::debug!(
                            entity = %frame.entity.id,
                            target = %edge.to.id,
                            "Ownership cycle detected"
                        );
                        paths.push(frame.finish(
                            TerminalKind::Organization,
                            Termination::Cycle,
                            &source,
                        ));
                        continue;
                    }

                    if visited.contains_key(&edge.to.id) {
                        tracing::debug!(
                            entity = %frame.entity.id,
                            target = %edge.to.id,
                            "Owner already reached by another branch"
                        );
                        paths.push(frame.extend(edge).finish(
                            TerminalKind::Organization,
                            Termination::Cycle,
                            &source,
                        ));
                        continue;
                    }

                    visited.insert(edge.to.id.clone(), VisitState::Visiting);
                    next.push(frame.extend(edge));
                }

                visited.insert(frame.entity.id.clone(), VisitState::Resolved);
            }

            frontier = next;
        }

        debug_assert!(visited.values().all(|s| *s == VisitState::Resolved));
        dedup_exact(paths)
    }

    /// Fetch edges for every frame, in frame order
    async fn fetch_level(&self, frames: &[Frame], deadline: Instant) -> Vec<Vec<OwnershipEdge>> {
        let calls: Vec<_> = frames
            .iter()
            .map(|f| self.fetch_edges(f.entity.id.clone(), deadline))
            .collect();
        stream::iter(calls).buffered(BRANCH_CONCURRENCY).collect().await
    }

    /// Time left for one call: the per-call limit, capped by the walk budget
    fn call_limit(&self, deadline: Instant) -> Duration {
        self.call_timeout
            .min(deadline.saturating_duration_since(Instant::now()))
    }

    async fn fetch_edges(&self, entity_id: String, deadline: Instant) -> Vec<OwnershipEdge> {
        let call = self.relations.fetch_edges(&entity_id);
        let result = match timeout(self.call_limit(deadline), call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(self.relations.source_id())),
        };
        match result {
            Ok(edges) => edges
                .into_iter()
                .filter(|e| !e.to.id.is_empty() && e.to.id != entity_id)
                .collect(),
            Err(e) => {
                tracing::warn!(
                    entity = %entity_id,
                    provider = e.provider(),
                    error = %e,
                    "Relation fetch failed, treating as no further owners"
                );
                Vec::new()
            }
        }
    }

    /// Classify targets whose kind the edge provider did not supply
    async fn classify_targets(
        &self,
        expand: &[(Frame, Vec<OwnershipEdge>)],
        deadline: Instant,
    ) -> HashMap<String, EntityKind> {
        let mut seen = HashSet::new();
        let pending: Vec<String> = expand
            .iter()
            .flat_map(|(_, edges)| edges)
            .filter(|e| e.to.kind == EntityKind::Unknown)
            .filter(|e| seen.insert(e.to.id.clone()))
            .map(|e| e.to.id.clone())
            .collect();

        let calls: Vec<_> = pending
            .iter()
            .map(|id| self.classify(id.clone(), deadline))
            .collect();
        let kinds: Vec<EntityKind> = stream::iter(calls)
            .buffered(BRANCH_CONCURRENCY)
            .collect()
            .await;

        pending.into_iter().zip(kinds).collect()
    }

    async fn classify(&self, entity_id: String, deadline: Instant) -> EntityKind {
        let call = self.relations.classify_entity(&entity_id);
        let result = match timeout(self.call_limit(deadline), call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(self.relations.source_id())),
        };
        match result {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(
                    entity = %entity_id,
                    provider = e.provider(),
                    error = %e,
                    "Classification failed"
                );
                EntityKind::Unknown
            }
        }
    }
}

/// One edge per owner: strongest relation, then highest confidence
///
/// Directories often state the same owner twice (owned-by and parent
/// organization); a second edge must not look like a shared owner.
fn strongest_per_owner(mut edges: Vec<OwnershipEdge>) -> Vec<OwnershipEdge> {
    edges.sort_by(|a, b| {
        a.to.id
            .cmp(&b.to.id)
            .then_with(|| {
                relation_weight(b.relation.as_str()).cmp(&relation_weight(a.relation.as_str()))
            })
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| a.relation.as_str().cmp(b.relation.as_str()))
    });
    edges.dedup_by(|later, kept| later.to.id == kept.to.id);
    edges
}

fn dedup_exact(paths: Vec<CandidatePath>) -> Vec<CandidatePath> {
    let mut seen = HashSet::new();
    paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
}
