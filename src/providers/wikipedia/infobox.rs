//! Infobox provider
//!
//! Reads the owner, parent and listing fields from the first infobox of a
//! Wikipedia article.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use super::client::WikipediaClient;
use crate::error::{ProviderError, ProviderResult};
use crate::extract::{clean_owner, first_value_item, listing_signal};
use crate::model::{CandidatePath, Confidence, RelationKind, TerminalKind};
use crate::providers::FlatProvider;

pub const SOURCE_ID: &str = "infobox";

const LISTING_FIELDS: &[&str] = &["traded as", "cotation", "action"];
const OWNER_FIELDS: &[&str] = &["owner", "owners", "propriétaire", "propriétaires"];
const PARENT_FIELDS: &[&str] = &["parent", "société mère", "maison mère"];

// =============================================================================
// PARSING
// =============================================================================

static INFOBOX_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{\{\s*infobox").unwrap());

/// Normalize a field name: lowercase, underscores and runs of spaces folded
fn normalize_key(key: &str) -> String {
    key.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Body of the first `{{Infobox ...}}` template, braces balanced
fn infobox_body(wikitext: &str) -> Option<&str> {
    let start = INFOBOX_START.find(wikitext)?.start();

    let bytes = wikitext.as_bytes();
    let mut depth = 0usize;
    let mut i = start;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'{', b'{') => {
                depth += 1;
                i += 2;
            }
            (b'}', b'}') => {
                depth = depth.saturating_sub(1);
                i += 2;
                if depth == 0 {
                    return Some(&wikitext[start + 2..i - 2]);
                }
            }
            _ => i += 1,
        }
    }
    None
}

/// Split a template body into top-level `key = value` fields
///
/// Pipes inside nested templates and links do not split.
pub fn infobox_fields(wikitext: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let Some(body) = infobox_body(wikitext) else {
        return fields;
    };

    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut braces = 0usize;
    let mut brackets = 0usize;
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                braces += 1;
                current.push_str("{{");
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                braces = braces.saturating_sub(1);
                current.push_str("}}");
            }
            '[' if chars.peek() == Some(&'[') => {
                chars.next();
                brackets += 1;
                current.push_str("[[");
            }
            ']' if chars.peek() == Some(&']') => {
                chars.next();
                brackets = brackets.saturating_sub(1);
                current.push_str("]]");
            }
            '|' if braces == 0 && brackets == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    parts.push(current);

    // first part is the template name
    for part in parts.into_iter().skip(1) {
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim();
            if !value.is_empty() {
                fields
                    .entry(normalize_key(key))
                    .or_insert_with(|| value.to_string());
            }
        }
    }
    fields
}

fn field<'a>(fields: &'a HashMap<String, String>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| fields.get(*name))
        .map(String::as_str)
}

/// Candidates implied by an infobox
///
/// A listing field wins outright; otherwise one owner edge, with `owner`
/// preferred over `parent`.
pub fn candidates_from_infobox(query: &str, wikitext: &str) -> Vec<CandidatePath> {
    let fields = infobox_fields(wikitext);

    if let Some(value) = field(&fields, LISTING_FIELDS) {
        if let Some(item) = first_value_item(value) {
            let venue = listing_signal(value).and_then(|s| s.venue).unwrap_or(item);
            return vec![CandidatePath::publicly_traded(
                query,
                Some(&venue),
                Confidence::Medium,
                SOURCE_ID,
            )];
        }
    }

    let edge = field(&fields, OWNER_FIELDS)
        .and_then(|v| first_value_item(v).map(|item| (item, RelationKind::OwnedBy)))
        .or_else(|| {
            field(&fields, PARENT_FIELDS)
                .and_then(|v| first_value_item(v).map(|item| (item, RelationKind::ParentOrg)))
        });

    let Some((raw, relation)) = edge else {
        return Vec::new();
    };
    let Some((owner, person)) = clean_owner(&raw) else {
        return Vec::new();
    };
    if owner.eq_ignore_ascii_case(query) {
        return Vec::new();
    }

    let kind = if person {
        TerminalKind::Human
    } else {
        TerminalKind::Unknown
    };
    vec![CandidatePath::single_hop(
        query,
        owner,
        kind,
        relation,
        Confidence::Medium,
        SOURCE_ID,
    )]
}

// =============================================================================
// PROVIDER
// =============================================================================

pub struct InfoboxProvider {
    client: Arc<WikipediaClient>,
    languages: Vec<String>,
}

impl InfoboxProvider {
    pub fn new(client: Arc<WikipediaClient>, languages: Vec<String>) -> Self {
        Self { client, languages }
    }
}

#[async_trait]
impl FlatProvider for InfoboxProvider {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    async fn quick_lookup(&self, name: &str) -> ProviderResult<Vec<CandidatePath>> {
        for lang in &self.languages {
            let page = self
                .client
                .page_wikitext(lang, name)
                .await
                .map_err(|e| ProviderError::unavailable(SOURCE_ID, e))?;

            if let Some(page) = page {
                let candidates = candidates_from_infobox(name, &page.wikitext);
                tracing::debug!(
                    lang = %lang,
                    title = %page.title,
                    count = candidates.len(),
                    "Infobox read"
                );
                if !candidates.is_empty() {
                    return Ok(candidates);
                }
            }
        }
        Ok(Vec::new())
    }
}
