//! Wikidata provider against a mock HTTP server

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use ownership_resolver::providers::{EntityLookup, RelationFetch, WikidataProvider};
use ownership_resolver::{
    EntityKind, OwnershipResolver, ProviderError, RelationKind, ResolverConfig, TerminalKind,
    Termination,
};

/// Matches SPARQL requests whose query text contains `needle`
struct SparqlContains(&'static str);

impl Match for SparqlContains {
    fn matches(&self, request: &Request) -> bool {
        request
            .url
            .query_pairs()
            .any(|(k, v)| k == "query" && v.contains(self.0))
    }
}

fn config_for(server: &MockServer) -> ResolverConfig {
    let mut config = ResolverConfig::default();
    config.providers.wikidata_api_url = format!("{}/w/api.php", server.uri());
    config.providers.wikidata_sparql_url = format!("{}/sparql", server.uri());
    config.providers.wikidata_entity_url = format!("{}/entity", server.uri());
    config.providers.infobox = false;
    config.providers.text_search = false;
    config
}

fn owner_binding(prop: &str, owner: &str, label: &str, owner_type: &str) -> serde_json::Value {
    json!({
        "prop": { "type": "uri", "value": format!("http://www.wikidata.org/prop/direct/{}", prop) },
        "owner": { "type": "uri", "value": format!("http://www.wikidata.org/entity/{}", owner) },
        "ownerLabel": { "type": "literal", "xml:lang": "fr", "value": label },
        "ownerType": { "type": "uri", "value": format!("http://www.wikidata.org/entity/{}", owner_type) }
    })
}

fn select_response(bindings: Vec<serde_json::Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "head": { "vars": ["prop", "owner", "ownerLabel", "ownerType"] },
        "results": { "bindings": bindings }
    }))
}

fn ask_response(answer: bool) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "head": {}, "boolean": answer }))
}

async fn mount_search(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("action", "wbsearchentities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "search": [
                { "id": "Q10", "label": "Acme", "description": "fictional item in Looney Tunes" },
                { "id": "Q1", "label": "Acme Co", "description": "American holding company" }
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_lookup_prefers_organization_hit() {
    let server = MockServer::start().await;
    mount_search(&server).await;

    let provider = WikidataProvider::new(&config_for(&server)).unwrap();
    let entity = provider.lookup_entity("Acme").await.unwrap().unwrap();

    assert_eq!(entity.id, "Q1");
    assert_eq!(entity.label, "Acme Co");
    assert_eq!(entity.kind, EntityKind::Unknown);
}

#[tokio::test]
async fn test_fetch_edges_parses_sparql_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .and(SparqlContains("wd:Q1 ?prop"))
        .respond_with(select_response(vec![
            owner_binding("P127", "Q2", "Holdco", "Q4830453"),
            owner_binding("P749", "Q3", "Jane Doe", "Q5"),
        ]))
        .mount(&server)
        .await;

    let provider = WikidataProvider::new(&config_for(&server)).unwrap();
    let edges = provider.fetch_edges("Q1").await.unwrap();

    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0].to.id, "Q2");
    assert_eq!(edges[0].to.label, "Holdco");
    assert_eq!(edges[0].relation, RelationKind::OwnedBy);
    assert_eq!(edges[0].to.kind, EntityKind::Unknown);
    assert_eq!(edges[1].relation, RelationKind::ParentOrg);
    assert_eq!(edges[1].to.kind, EntityKind::Human);
    assert_eq!(edges[1].provenance, "wikidata");
}

#[tokio::test]
async fn test_classify_uses_ask_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .and(SparqlContains("ASK { wd:Q3 wdt:P31 wd:Q5"))
        .respond_with(ask_response(true))
        .mount(&server)
        .await;

    let provider = WikidataProvider::new(&config_for(&server)).unwrap();
    assert_eq!(provider.classify_entity("Q3").await.unwrap(), EntityKind::Human);
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .mount(&server)
        .await;

    let provider = WikidataProvider::new(&config_for(&server)).unwrap();
    let err = provider.fetch_edges("Q1").await.unwrap_err();

    assert!(matches!(err, ProviderError::Unavailable { .. }));
    assert_eq!(err.provider(), "wikidata");
}

#[tokio::test]
async fn test_malformed_payload_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let provider = WikidataProvider::new(&config_for(&server)).unwrap();
    assert!(provider.classify_entity("Q1").await.is_err());
}

#[tokio::test]
async fn test_resolver_walks_live_graph() {
    let server = MockServer::start().await;
    mount_search(&server).await;
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .and(SparqlContains("ASK"))
        .respond_with(ask_response(false))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .and(SparqlContains("wd:Q1 ?prop"))
        .respond_with(select_response(vec![owner_binding(
            "P127", "Q2", "Holdco", "Q4830453",
        )]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .and(SparqlContains("wd:Q2 ?prop"))
        .respond_with(select_response(vec![]))
        .mount(&server)
        .await;

    let resolver = OwnershipResolver::from_config(&config_for(&server)).unwrap();
    let result = resolver.resolve_ownership("Acme").await.unwrap();
    let best = result.best_result.unwrap();

    assert_eq!(best.labels, vec!["Acme", "Holdco"]);
    assert_eq!(best.terminal_kind, TerminalKind::Organization);
    assert_eq!(best.termination, Termination::NoFurtherOwners);
    assert_eq!(best.source, "wikidata");
}
