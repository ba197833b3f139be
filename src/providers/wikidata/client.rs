//! Wikidata API client
//!
//! Rate-limited HTTP client for entity search, entity labels and SPARQL
//! queries against Wikidata.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

use super::types::*;
use crate::config::ResolverConfig;

const RATE_LIMIT_DELAY_MS: u64 = 200; // 5 req/sec, well inside the public quota
const SEARCH_LIMIT: usize = 10;

pub struct WikidataClient {
    http: Client,
    api_url: String,
    sparql_url: String,
    entity_url: String,
    /// Earliest instant the next request may start
    next_slot: Mutex<Instant>,
}

impl WikidataClient {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_url: config.providers.wikidata_api_url.clone(),
            sparql_url: config.providers.wikidata_sparql_url.clone(),
            entity_url: config
                .providers
                .wikidata_entity_url
                .trim_end_matches('/')
                .to_string(),
            next_slot: Mutex::new(Instant::now()),
        })
    }

    /// Reserve a request slot; concurrent callers are spaced, not serialized
    async fn rate_limit(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + Duration::from_millis(RATE_LIMIT_DELAY_MS);
            slot
        };
        sleep_until(slot).await;
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        accept: &str,
    ) -> Result<T> {
        self.rate_limit().await;

        let response = self
            .http
            .get(url)
            .query(query)
            .header("Accept", accept)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Wikidata API error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            ));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    /// Search entities by free text
    pub async fn search_entities(&self, name: &str, language: &str) -> Result<Vec<SearchHit>> {
        let limit = SEARCH_LIMIT.to_string();
        let response: SearchResponse = self
            .get_json(
                &self.api_url,
                &[
                    ("action", "wbsearchentities"),
                    ("search", name),
                    ("language", language),
                    ("uselang", language),
                    ("type", "item"),
                    ("limit", &limit),
                    ("format", "json"),
                ],
                "application/json",
            )
            .await
            .context("Failed to search Wikidata entities")?;

        Ok(response.search)
    }

    /// Fetch the label of an entity in the first available language
    pub async fn entity_label(&self, qid: &str, languages: &[String]) -> Result<String> {
        let url = format!("{}/{}.json", self.entity_url, qid);
        let response: EntityDataResponse = self
            .get_json(&url, &[], "application/json")
            .await
            .context("Failed to fetch entity data")?;

        Ok(response
            .entities
            .get(qid)
            .map(|doc| label_for(doc, qid, languages))
            .unwrap_or_else(|| qid.to_string()))
    }

    /// Run a SELECT query and return its bindings
    pub async fn select(&self, query: &str) -> Result<SparqlResponse> {
        self.get_json(
            &self.sparql_url,
            &[("query", query), ("format", "json")],
            "application/sparql-results+json",
        )
        .await
        .context("Failed to run SPARQL query")
    }

    /// Run an ASK query
    pub async fn ask(&self, query: &str) -> Result<bool> {
        let response: SparqlAskResponse = self
            .get_json(
                &self.sparql_url,
                &[("query", query), ("format", "json")],
                "application/sparql-results+json",
            )
            .await
            .context("Failed to run SPARQL ASK query")?;
        Ok(response.boolean)
    }

    /// Owner rows of `qid` over the given properties
    pub async fn owners(
        &self,
        qid: &str,
        properties: &[&str],
        languages: &[String],
    ) -> Result<Vec<OwnerRow>> {
        let response = self
            .select(&owners_query(qid, properties, languages))
            .await?;
        Ok(group_owner_bindings(&response.results.bindings))
    }

    pub async fn is_human(&self, qid: &str) -> Result<bool> {
        self.ask(&is_human_query(qid)).await
    }
}
