//! Ownership domain types
//!
//! Entities and edges are transient values produced by provider lookups.
//! `CandidatePath` is the single shape every provider contributes, and
//! `ResolutionResult` is the only artifact handed back to callers.

use serde::{Deserialize, Serialize};

/// Coarse classification of an entity as reported by a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Human,
    Organization,
    #[default]
    Unknown,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Organization => write!(f, "organization"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A person or organization identified by an external directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Directory identifier (Wikidata QID, fixture key, ...)
    pub id: String,
    /// Human-readable label; falls back to the id when the directory has none
    pub label: String,
    #[serde(default)]
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
        }
    }
}

/// Typed relation carried by an ownership edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    OwnedBy,
    ParentOrg,
    Founder,
    BrandOf,
    Subsidiary,
    Shareholder,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OwnedBy => "owned_by",
            Self::ParentOrg => "parent_org",
            Self::Founder => "founder",
            Self::BrandOf => "brand_of",
            Self::Subsidiary => "subsidiary",
            Self::Shareholder => "shareholder",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed edge from an owned entity toward its owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipEdge {
    pub from: Entity,
    pub to: Entity,
    pub relation: RelationKind,
    /// Provider confidence in `[0, 1]`
    pub confidence: f64,
    /// Name of the provider that asserted the edge
    pub provenance: String,
}

impl OwnershipEdge {
    pub fn new(
        from: Entity,
        to: Entity,
        relation: RelationKind,
        confidence: f64,
        provenance: impl Into<String>,
    ) -> Self {
        Self {
            from,
            to,
            relation,
            confidence: confidence.clamp(0.0, 1.0),
            provenance: provenance.into(),
        }
    }
}

/// Classification of the last node of a candidate path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalKind {
    Human,
    Organization,
    Public,
    Unknown,
}

/// Coarse confidence bucket used for ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Bucket a numeric edge confidence
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Self::High
        } else if score >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 2,
            Self::Medium => 1,
            Self::Low => 0,
        }
    }
}

/// Why a path stopped where it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Reached an entity classified as a person
    Human,
    /// Reached an entity with no outgoing ownership edges
    NoFurtherOwners,
    /// Revisited an entity already seen in this traversal
    Cycle,
    /// Hit the hop limit
    DepthExceeded,
    /// Listing signal found; ownership is dispersed
    PubliclyTraded,
    /// Heuristic single-hop guess from a flat provider
    Extracted,
}

/// Relation label for a path whose relation could not be determined
pub const RELATION_UNKNOWN: &str = "unknown";
/// Relation label for a publicly traded terminal
pub const RELATION_PUBLIC: &str = "public";

/// One ownership chain from the queried entity to a terminal owner
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidatePath {
    /// Query label first, terminal owner label last. Never empty.
    pub labels: Vec<String>,
    pub terminal_kind: TerminalKind,
    /// Confirmed by the structured knowledge-graph source
    pub verified: bool,
    pub confidence: Confidence,
    pub relation_type: String,
    /// Provider that produced the path
    pub source: String,
    pub termination: Termination,
}

impl CandidatePath {
    /// Path consisting only of the queried label
    pub fn root(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            labels: vec![label.into()],
            terminal_kind: TerminalKind::Organization,
            verified: false,
            confidence: Confidence::Medium,
            relation_type: RELATION_UNKNOWN.to_string(),
            source: source.into(),
            termination: Termination::NoFurtherOwners,
        }
    }

    /// Single-hop path produced by a flat provider
    pub fn single_hop(
        query: impl Into<String>,
        owner: impl Into<String>,
        terminal_kind: TerminalKind,
        relation: RelationKind,
        confidence: Confidence,
        source: impl Into<String>,
    ) -> Self {
        Self {
            labels: vec![query.into(), owner.into()],
            terminal_kind,
            verified: false,
            confidence,
            relation_type: relation.as_str().to_string(),
            source: source.into(),
            termination: Termination::Extracted,
        }
    }

    /// Candidate asserting the queried entity is publicly traded
    pub fn publicly_traded(
        query: impl Into<String>,
        listing: Option<&str>,
        confidence: Confidence,
        source: impl Into<String>,
    ) -> Self {
        let owner = match listing {
            Some(l) if !l.trim().is_empty() => format!("Publicly traded ({})", l.trim()),
            _ => "Publicly traded".to_string(),
        };
        Self {
            labels: vec![query.into(), owner],
            terminal_kind: TerminalKind::Public,
            verified: false,
            confidence,
            relation_type: RELATION_PUBLIC.to_string(),
            source: source.into(),
            termination: Termination::PubliclyTraded,
        }
    }

    /// Label of the terminal owner
    pub fn terminal_label(&self) -> &str {
        self.labels.last().map(String::as_str).unwrap_or_default()
    }

    /// Number of ownership hops in the path
    pub fn hops(&self) -> usize {
        self.labels.len().saturating_sub(1)
    }
}

/// Outcome of one `resolve_ownership` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub query: String,
    /// Every distinct chain found, in rank order
    pub candidates: Vec<CandidatePath>,
    pub best_result: Option<CandidatePath>,
    pub alternatives: Vec<CandidatePath>,
}

impl ResolutionResult {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            candidates: Vec::new(),
            best_result: None,
            alternatives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_buckets() {
        assert_eq!(Confidence::from_score(0.9), Confidence::High);
        assert_eq!(Confidence::from_score(0.8), Confidence::High);
        assert_eq!(Confidence::from_score(0.6), Confidence::Medium);
        assert_eq!(Confidence::from_score(0.4), Confidence::Low);
        assert_eq!(Confidence::High.rank(), 2);
        assert_eq!(Confidence::Low.rank(), 0);
    }

    #[test]
    fn test_edge_confidence_is_clamped() {
        let a = Entity::new("Q1", "A", EntityKind::Organization);
        let b = Entity::new("Q2", "B", EntityKind::Unknown);
        let edge = OwnershipEdge::new(a, b, RelationKind::OwnedBy, 1.7, "wikidata");
        assert_eq!(edge.confidence, 1.0);
    }

    #[test]
    fn test_publicly_traded_label() {
        let c = CandidatePath::publicly_traded("Acme", Some("NYSE: ACME"), Confidence::High, "infobox");
        assert_eq!(c.labels, vec!["Acme", "Publicly traded (NYSE: ACME)"]);
        assert_eq!(c.terminal_kind, TerminalKind::Public);
        assert_eq!(c.relation_type, RELATION_PUBLIC);

        let bare = CandidatePath::publicly_traded("Acme", None, Confidence::Medium, "search");
        assert_eq!(bare.terminal_label(), "Publicly traded");
        assert_eq!(bare.hops(), 1);
    }

    #[test]
    fn test_serialized_field_names() {
        let c = CandidatePath::root("Acme", "wikidata");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["terminal_kind"], "organization");
        assert_eq!(json["termination"], "no_further_owners");
        assert_eq!(json["labels"][0], "Acme");
    }
}
