//! Market data API response types

use serde::Deserialize;

/// Entry of `search?query=`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolMatch {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exchange_short_name: Option<String>,
    #[serde(default)]
    pub stock_exchange: Option<String>,
}

impl SymbolMatch {
    /// Venue tag such as `NYSE: KO`
    pub fn listing(&self) -> String {
        match self.exchange_short_name.as_deref().map(str::trim) {
            Some(exchange) if !exchange.is_empty() => format!("{}: {}", exchange, self.symbol),
            _ => self.symbol.clone(),
        }
    }

    /// Traded on a regulated exchange (not OTC, funds or crypto)
    pub fn is_listed(&self) -> bool {
        match self.exchange_short_name.as_deref().map(str::trim) {
            Some(exchange) if !exchange.is_empty() => !UNLISTED_VENUES
                .iter()
                .any(|v| v.eq_ignore_ascii_case(exchange)),
            _ => false,
        }
    }
}

const UNLISTED_VENUES: &[&str] = &["OTC", "PNK", "CRYPTO", "FOREX", "MUTUAL_FUND", "COMMODITY"];

/// Entry of `institutional-holder/{symbol}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionalHolder {
    pub holder: String,
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub date_reported: Option<String>,
}

/// Minimum Jaro-Winkler similarity between company name and query
const NAME_SIMILARITY_THRESHOLD: f64 = 0.85;

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == ',' || c == '.')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether `query` appears in `name` as a run of whole words
fn contains_words(name: &[String], query: &[String]) -> bool {
    !query.is_empty() && name.windows(query.len()).any(|w| w == query)
}

/// Search hit whose name matches the query, in directory order
///
/// A hit matches on its exact symbol, when the query appears in its name as
/// whole words, or when name and query are near-identical.
pub fn matching_symbol<'a>(matches: &'a [SymbolMatch], query: &str) -> Option<&'a SymbolMatch> {
    let query = query.trim();
    let query_words = words(query);
    let query_lower = query.to_lowercase();
    matches.iter().find(|m| {
        m.symbol.eq_ignore_ascii_case(query)
            || m.name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .is_some_and(|name| {
                    contains_words(&words(name), &query_words)
                        || strsim::jaro_winkler(&name.to_lowercase(), &query_lower)
                            >= NAME_SIMILARITY_THRESHOLD
                })
    })
}

/// Largest holders first, ties by name
pub fn top_holders(mut holders: Vec<InstitutionalHolder>, limit: usize) -> Vec<InstitutionalHolder> {
    holders.retain(|h| !h.holder.trim().is_empty());
    holders.sort_by(|a, b| b.shares.cmp(&a.shares).then_with(|| a.holder.cmp(&b.holder)));
    holders.truncate(limit);
    holders
}
