//! Candidate scoring and fusion
//!
//! Orders candidate paths by a fixed priority list, picks the best one and
//! folds the rest into a deduplicated alternatives list. The order is total,
//! so the outcome depends only on the set of candidates, never on the order
//! providers happened to deliver them in.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::model::{CandidatePath, TerminalKind, RELATION_PUBLIC};

/// Weight of a path's relation type (higher is stronger)
pub fn relation_weight(relation_type: &str) -> u8 {
    match relation_type {
        "owned_by" | "parent_org" | "subsidiary" => 4,
        "brand_of" => 3,
        "founder" | "shareholder" => 2,
        RELATION_PUBLIC => 1,
        _ => 0,
    }
}

/// Ranking order: `Less` means `a` ranks ahead of `b`
///
/// Priority: verified, confidence, relation weight, human terminal, longer
/// chain. Remaining ties fall back to labels, source and the other fields
/// so that distinct candidates never compare equal.
pub fn compare(a: &CandidatePath, b: &CandidatePath) -> Ordering {
    b.verified
        .cmp(&a.verified)
        .then_with(|| b.confidence.rank().cmp(&a.confidence.rank()))
        .then_with(|| relation_weight(&b.relation_type).cmp(&relation_weight(&a.relation_type)))
        .then_with(|| is_human(b).cmp(&is_human(a)))
        .then_with(|| b.labels.len().cmp(&a.labels.len()))
        .then_with(|| a.labels.cmp(&b.labels))
        .then_with(|| a.source.cmp(&b.source))
        .then_with(|| a.relation_type.cmp(&b.relation_type))
        .then_with(|| a.terminal_kind.cmp(&b.terminal_kind))
        .then_with(|| a.termination.cmp(&b.termination))
}

fn is_human(path: &CandidatePath) -> bool {
    path.terminal_kind == TerminalKind::Human
}

/// Outcome of ranking a candidate pile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    /// One path per distinct label chain, best first
    pub candidates: Vec<CandidatePath>,
    pub best: Option<CandidatePath>,
    /// Distinct from `best` and from each other, capped
    pub alternatives: Vec<CandidatePath>,
}

/// Sort, select the best candidate and deduplicate the remainder
pub fn rank(mut candidates: Vec<CandidatePath>, max_alternatives: usize) -> Ranking {
    candidates.sort_by(compare);

    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let distinct: Vec<CandidatePath> = candidates
        .into_iter()
        .filter(|c| !c.labels.is_empty())
        .filter(|c| seen.insert(c.labels.clone()))
        .collect();

    let best = distinct.first().cloned();
    let alternatives = distinct
        .iter()
        .skip(1)
        .take(max_alternatives)
        .cloned()
        .collect();

    Ranking {
        candidates: distinct,
        best,
        alternatives,
    }
}
