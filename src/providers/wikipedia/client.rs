//! Wikipedia API client
//!
//! Thin wrapper over the MediaWiki action API: page wikitext, full-text
//! search and plain-text extracts. Uses `formatversion=2` responses.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::{ProviderSettings, ResolverConfig};

// =============================================================================
// RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    #[serde(default)]
    parse: Option<ParsedPage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ParsedPage {
    title: String,
    #[serde(default)]
    wikitext: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryBody>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryBody {
    #[serde(default)]
    search: Vec<SearchResult>,
    #[serde(default)]
    pages: Vec<PageExtract>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageExtract {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    extract: Option<String>,
}

/// Wikitext of a resolved page
#[derive(Debug, Clone)]
pub struct PageSource {
    pub title: String,
    pub wikitext: String,
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct WikipediaClient {
    http: Client,
    settings: ProviderSettings,
}

impl WikipediaClient {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            settings: config.providers.clone(),
        })
    }

    fn endpoint(&self, lang: &str) -> String {
        self.settings.wikipedia_api_for(lang)
    }

    async fn get_json<T: DeserializeOwned>(&self, lang: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = self.endpoint(lang);
        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("format", "json"), ("formatversion", "2")])
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Wikipedia API error {} from {}", status, url));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    /// Raw wikitext of `title`, following redirects
    ///
    /// Returns `None` when the page does not exist.
    pub async fn page_wikitext(&self, lang: &str, title: &str) -> Result<Option<PageSource>> {
        let response: ParseResponse = self
            .get_json(
                lang,
                &[
                    ("action", "parse"),
                    ("page", title),
                    ("prop", "wikitext"),
                    ("redirects", "1"),
                ],
            )
            .await?;

        match (response.parse, response.error) {
            (Some(page), _) => Ok(Some(PageSource {
                title: page.title,
                wikitext: page.wikitext,
            })),
            (None, Some(err)) if err.code == "missingtitle" || err.code == "invalidtitle" => {
                Ok(None)
            }
            (None, Some(err)) => Err(anyhow!("Wikipedia parse error {}: {}", err.code, err.info)),
            (None, None) => Ok(None),
        }
    }

    /// Title of the best full-text search hit
    pub async fn top_search_hit(&self, lang: &str, text: &str) -> Result<Option<String>> {
        let response: QueryResponse = self
            .get_json(
                lang,
                &[
                    ("action", "query"),
                    ("list", "search"),
                    ("srsearch", text),
                    ("srlimit", "1"),
                ],
            )
            .await?;

        if let Some(err) = response.error {
            return Err(anyhow!("Wikipedia search error {}: {}", err.code, err.info));
        }
        Ok(response
            .query
            .unwrap_or_default()
            .search
            .into_iter()
            .next()
            .map(|hit| hit.title))
    }

    /// Plain-text introduction of `title`
    pub async fn intro_extract(&self, lang: &str, title: &str) -> Result<Option<String>> {
        let response: QueryResponse = self
            .get_json(
                lang,
                &[
                    ("action", "query"),
                    ("prop", "extracts"),
                    ("exintro", "1"),
                    ("explaintext", "1"),
                    ("redirects", "1"),
                    ("titles", title),
                ],
            )
            .await?;

        if let Some(err) = response.error {
            return Err(anyhow!("Wikipedia extract error {}: {}", err.code, err.info));
        }
        Ok(response
            .query
            .unwrap_or_default()
            .pages
            .into_iter()
            .filter(|p| !p.missing)
            .find_map(|p| p.extract)
            .filter(|e| !e.trim().is_empty()))
    }
}
