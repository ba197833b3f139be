//! Full-text search provider
//!
//! Finds the best article for a name and runs the pattern rules over its
//! plain-text introduction.

use std::sync::Arc;

use async_trait::async_trait;

use super::client::WikipediaClient;
use crate::error::{ProviderError, ProviderResult};
use crate::extract::{find_owner_mention, listing_signal};
use crate::model::{CandidatePath, Confidence, TerminalKind};
use crate::providers::FlatProvider;

pub const SOURCE_ID: &str = "text_search";

/// Candidates read from an article introduction
pub fn candidates_from_text(query: &str, text: &str) -> Vec<CandidatePath> {
    if let Some(signal) = listing_signal(text) {
        let confidence = if signal.venue.is_some() {
            Confidence::Medium
        } else {
            Confidence::Low
        };
        return vec![CandidatePath::publicly_traded(
            query,
            signal.venue.as_deref(),
            confidence,
            SOURCE_ID,
        )];
    }

    match find_owner_mention(text) {
        Some(mention) if !mention.owner.eq_ignore_ascii_case(query) => {
            let kind = if mention.person {
                TerminalKind::Human
            } else {
                TerminalKind::Unknown
            };
            vec![CandidatePath::single_hop(
                query,
                mention.owner,
                kind,
                mention.relation,
                mention.confidence,
                SOURCE_ID,
            )]
        }
        _ => Vec::new(),
    }
}

pub struct TextSearchProvider {
    client: Arc<WikipediaClient>,
    languages: Vec<String>,
}

impl TextSearchProvider {
    pub fn new(client: Arc<WikipediaClient>, languages: Vec<String>) -> Self {
        Self { client, languages }
    }

    async fn lookup_in(&self, lang: &str, name: &str) -> anyhow::Result<Vec<CandidatePath>> {
        let Some(title) = self.client.top_search_hit(lang, name).await? else {
            return Ok(Vec::new());
        };
        let Some(extract) = self.client.intro_extract(lang, &title).await? else {
            return Ok(Vec::new());
        };
        tracing::debug!(lang = %lang, title = %title, "Scanning article introduction");
        Ok(candidates_from_text(name, &extract))
    }
}

#[async_trait]
impl FlatProvider for TextSearchProvider {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    async fn quick_lookup(&self, name: &str) -> ProviderResult<Vec<CandidatePath>> {
        for lang in &self.languages {
            let candidates = self
                .lookup_in(lang, name)
                .await
                .map_err(|e| ProviderError::unavailable(SOURCE_ID, e))?;
            if !candidates.is_empty() {
                return Ok(candidates);
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Termination;

    #[test]
    fn test_owner_from_text() {
        let text = "Kitupé is a yogurt brand owned by Holdco Group since 2019.";
        let candidates = candidates_from_text("Kitupé", text);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].labels, vec!["Kitupé", "Holdco Group"]);
        assert_eq!(candidates[0].termination, Termination::Extracted);
        assert!(!candidates[0].verified);
    }

    #[test]
    fn test_person_owner() {
        let text = "The magazine is owned by businesswoman Jane Doe.";
        let candidates = candidates_from_text("Mag", text);
        assert_eq!(candidates[0].terminal_kind, TerminalKind::Human);
        assert_eq!(candidates[0].labels[1], "Jane Doe");
    }

    #[test]
    fn test_listing_short_circuits() {
        let text = "Acme (NASDAQ: ACME) is owned by Someone Else.";
        let candidates = candidates_from_text("Acme", text);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].terminal_kind, TerminalKind::Public);
        assert_eq!(candidates[0].confidence, Confidence::Medium);
    }

    #[test]
    fn test_self_reference_ignored() {
        assert!(candidates_from_text("Acme", "It is owned by Acme.").is_empty());
        assert!(candidates_from_text("Acme", "A small family bakery.").is_empty());
    }
}
