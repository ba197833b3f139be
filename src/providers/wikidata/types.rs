//! Wikidata API response types
//!
//! Reference: https://www.wikidata.org/w/api.php (wbsearchentities),
//! Special:EntityData and the query.wikidata.org SPARQL JSON results format.

use std::collections::HashMap;

use serde::Deserialize;

/// Instance of (P31) value marking a person
pub const HUMAN_CLASS: &str = "Q5";

/// Ownership properties walked by default
pub const PROP_OWNED_BY: &str = "P127";
pub const PROP_PARENT_ORG: &str = "P749";
/// Only walked on request, see `ResolverConfig::include_founders`
pub const PROP_FOUNDED_BY: &str = "P112";

/// wbsearchentities response
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub search: Vec<SearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Special:EntityData/{id}.json response
#[derive(Debug, Clone, Deserialize)]
pub struct EntityDataResponse {
    #[serde(default)]
    pub entities: HashMap<String, EntityDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityDocument {
    #[serde(default)]
    pub labels: HashMap<String, LanguageValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageValue {
    pub language: String,
    pub value: String,
}

/// SPARQL SELECT results
#[derive(Debug, Clone, Deserialize)]
pub struct SparqlResponse {
    pub results: SparqlResults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub bindings: Vec<HashMap<String, SparqlValue>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SparqlValue {
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: String,
}

/// SPARQL ASK result
#[derive(Debug, Clone, Deserialize)]
pub struct SparqlAskResponse {
    pub boolean: bool,
}

/// Extract the trailing id from an entity URI
///
/// `http://www.wikidata.org/entity/Q42` -> `Q42`
pub fn extract_qid_from_uri(uri: &str) -> Option<String> {
    uri.split('/')
        .next_back()
        .filter(|s| is_valid_qid(s))
        .map(|s| s.to_string())
}

/// `Q` followed by digits; anything else (blank nodes, lexemes) is rejected
pub fn is_valid_qid(id: &str) -> bool {
    id.strip_prefix('Q')
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

/// SELECT owners of `qid` over the given properties
pub fn owners_query(qid: &str, properties: &[&str], languages: &[String]) -> String {
    let values = properties
        .iter()
        .map(|p| format!("wdt:{}", p))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        r#"SELECT ?prop ?owner ?ownerLabel ?ownerType WHERE {{
  VALUES ?prop {{ {values} }}
  wd:{qid} ?prop ?owner .
  OPTIONAL {{ ?owner wdt:P31 ?ownerType . }}
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "{langs}". }}
}}"#,
        values = values,
        qid = qid,
        langs = languages.join(","),
    )
}

/// ASK whether `qid` is an instance of human
pub fn is_human_query(qid: &str) -> String {
    format!("ASK {{ wd:{} wdt:P31 wd:{} . }}", qid, HUMAN_CLASS)
}

/// One owner row grouped across its `?ownerType` bindings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRow {
    pub property: String,
    pub owner_id: String,
    pub owner_label: String,
    pub is_human: bool,
}

/// Group SPARQL bindings into one row per (property, owner)
///
/// Bindings without a usable owner id are skipped. Output order follows
/// the first appearance of each pair.
pub fn group_owner_bindings(bindings: &[HashMap<String, SparqlValue>]) -> Vec<OwnerRow> {
    let mut rows: Vec<OwnerRow> = Vec::new();
    for binding in bindings {
        let Some(owner_id) = binding
            .get("owner")
            .and_then(|v| extract_qid_from_uri(&v.value))
        else {
            continue;
        };
        let property = binding
            .get("prop")
            .and_then(|v| v.value.split('/').next_back())
            .unwrap_or(PROP_OWNED_BY)
            .to_string();
        let is_human = binding
            .get("ownerType")
            .and_then(|v| extract_qid_from_uri(&v.value))
            .is_some_and(|t| t == HUMAN_CLASS);

        match rows
            .iter_mut()
            .find(|r| r.owner_id == owner_id && r.property == property)
        {
            Some(row) => row.is_human |= is_human,
            None => {
                let owner_label = binding
                    .get("ownerLabel")
                    .map(|v| v.value.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| owner_id.clone());
                rows.push(OwnerRow {
                    property,
                    owner_id,
                    owner_label,
                    is_human,
                });
            }
        }
    }
    rows
}

const ORGANIZATION_TERMS: &[&str] = &[
    "company",
    "corporation",
    "organization",
    "organisation",
    "business",
    "brand",
    "conglomerate",
    "group",
    "manufacturer",
    "entreprise",
    "société",
    "marque",
    "groupe",
    "fabricant",
];

/// Minimum Jaro-Winkler similarity for a label to count as a near match
const NEAR_MATCH_THRESHOLD: f64 = 0.85;

/// Pick the most plausible hit for an ownership query
///
/// Organization-like descriptions rank first, then exact label matches,
/// then near matches, then the directory's own order.
pub fn pick_best_hit<'a>(hits: &'a [SearchHit], query: &str) -> Option<&'a SearchHit> {
    let query = query.trim().to_lowercase();
    hits.iter()
        .enumerate()
        .max_by_key(|(index, hit)| {
            let description = hit.description.as_deref().unwrap_or_default().to_lowercase();
            let organization = ORGANIZATION_TERMS.iter().any(|t| description.contains(t));
            let label = hit.label.as_deref().unwrap_or_default().trim().to_lowercase();
            let exact = label == query;
            let near = strsim::jaro_winkler(&label, &query) >= NEAR_MATCH_THRESHOLD;
            (organization, exact, near, std::cmp::Reverse(*index))
        })
        .map(|(_, hit)| hit)
}

/// Label in the first available language, else the id
pub fn label_for(document: &EntityDocument, id: &str, languages: &[String]) -> String {
    languages
        .iter()
        .find_map(|lang| document.labels.get(lang))
        .map(|v| v.value.clone())
        .unwrap_or_else(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(pairs: &[(&str, &str)]) -> HashMap<String, SparqlValue> {
        pairs
            .iter()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    SparqlValue {
                        value_type: "uri".to_string(),
                        value: v.to_string(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_extract_qid_from_uri() {
        assert_eq!(
            extract_qid_from_uri("http://www.wikidata.org/entity/Q42"),
            Some("Q42".to_string())
        );
        assert_eq!(
            extract_qid_from_uri("http://www.wikidata.org/.well-known/genid/abc123"),
            None
        );
        assert_eq!(extract_qid_from_uri("Q"), None);
    }

    #[test]
    fn test_owners_query_shape() {
        let q = owners_query("Q95", &[PROP_OWNED_BY, PROP_PARENT_ORG], &["fr".into(), "en".into()]);
        assert!(q.contains("VALUES ?prop { wdt:P127 wdt:P749 }"));
        assert!(q.contains("wd:Q95 ?prop ?owner ."));
        assert!(q.contains("wikibase:language \"fr,en\""));
    }

    #[test]
    fn test_group_owner_bindings_merges_types() {
        let bindings = vec![
            binding(&[
                ("prop", "http://www.wikidata.org/prop/direct/P127"),
                ("owner", "http://www.wikidata.org/entity/Q1"),
                ("ownerLabel", "Jane Doe"),
                ("ownerType", "http://www.wikidata.org/entity/Q215627"),
            ]),
            binding(&[
                ("prop", "http://www.wikidata.org/prop/direct/P127"),
                ("owner", "http://www.wikidata.org/entity/Q1"),
                ("ownerLabel", "Jane Doe"),
                ("ownerType", "http://www.wikidata.org/entity/Q5"),
            ]),
            binding(&[
                ("prop", "http://www.wikidata.org/prop/direct/P749"),
                ("owner", "http://www.wikidata.org/entity/Q2"),
            ]),
            binding(&[("owner", "http://www.wikidata.org/.well-known/genid/x")]),
        ];

        let rows = group_owner_bindings(&bindings);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].owner_id, "Q1");
        assert!(rows[0].is_human);
        assert_eq!(rows[1].property, PROP_PARENT_ORG);
        assert_eq!(rows[1].owner_label, "Q2");
        assert!(!rows[1].is_human);
    }

    #[test]
    fn test_pick_best_hit_prefers_companies() {
        let hits = vec![
            SearchHit {
                id: "Q1".into(),
                label: Some("Apple".into()),
                description: Some("fruit of the apple tree".into()),
            },
            SearchHit {
                id: "Q2".into(),
                label: Some("Apple Inc.".into()),
                description: Some("American technology company".into()),
            },
        ];
        assert_eq!(pick_best_hit(&hits, "Apple").map(|h| h.id.as_str()), Some("Q2"));
    }

    #[test]
    fn test_pick_best_hit_keeps_directory_order_on_ties() {
        let hits = vec![
            SearchHit {
                id: "Q1".into(),
                label: Some("Foo".into()),
                description: None,
            },
            SearchHit {
                id: "Q2".into(),
                label: Some("Foo bar".into()),
                description: None,
            },
        ];
        assert_eq!(pick_best_hit(&hits, "zzz").map(|h| h.id.as_str()), Some("Q1"));
        assert!(pick_best_hit(&[], "x").is_none());
    }

    #[test]
    fn test_pick_best_hit_prefers_near_label() {
        let hits = vec![
            SearchHit {
                id: "Q1".into(),
                label: Some("Groupe Bel".into()),
                description: Some("French cheese company".into()),
            },
            SearchHit {
                id: "Q2".into(),
                label: Some("Danone S.A.".into()),
                description: Some("French food company".into()),
            },
        ];
        assert_eq!(pick_best_hit(&hits, "Danone").map(|h| h.id.as_str()), Some("Q2"));
    }

    #[test]
    fn test_label_fallback() {
        let doc: EntityDocument = serde_json::from_str(
            r#"{"labels": {"en": {"language": "en", "value": "Danone"}}}"#,
        )
        .unwrap();
        assert_eq!(label_for(&doc, "Q1", &["fr".into(), "en".into()]), "Danone");
        assert_eq!(label_for(&doc, "Q1", &["de".into()]), "Q1");
    }
}
