//! Market data API client

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::types::*;
use crate::config::ResolverConfig;

const SEARCH_LIMIT: &str = "10";

pub struct MarketDataClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl MarketDataClient {
    pub fn new(config: &ResolverConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config
                .providers
                .market_data_url
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("Failed to fetch {}", path))?;

        let status = response.status();
        if !status.is_success() {
            // the URL carries the key
            return Err(anyhow!("Market data API error {} on {}", status, path));
        }

        response
            .json()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("Failed to parse response from {}", path))
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>> {
        self.get("search", &[("query", query), ("limit", SEARCH_LIMIT)])
            .await
    }

    pub async fn institutional_holders(&self, symbol: &str) -> Result<Vec<InstitutionalHolder>> {
        self.get(&format!("institutional-holder/{}", symbol), &[])
            .await
    }
}
