//! Market data provider
//!
//! Resolves a name to an exchange listing, then reports the largest
//! institutional holders. Only registered when an API key is configured.

pub mod client;
pub mod types;

use async_trait::async_trait;

pub use client::MarketDataClient;
pub use types::*;

use crate::config::ResolverConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::model::{CandidatePath, Confidence, RelationKind, TerminalKind};
use crate::providers::FlatProvider;

pub const SOURCE_ID: &str = "market_data";

const MAX_HOLDERS: usize = 3;

pub struct MarketDataProvider {
    client: MarketDataClient,
}

impl MarketDataProvider {
    /// Returns `Ok(None)` when market data is disabled or has no key
    pub fn from_config(config: &ResolverConfig) -> ProviderResult<Option<Self>> {
        if !config.providers.market_data_enabled() {
            return Ok(None);
        }
        let key = config
            .providers
            .market_data_api_key
            .clone()
            .unwrap_or_default();
        let client = MarketDataClient::new(config, key)
            .map_err(|e| ProviderError::unavailable(SOURCE_ID, e))?;
        Ok(Some(Self { client }))
    }
}

/// One public candidate plus the largest holders
pub fn candidates_from_listing(
    query: &str,
    listing: &SymbolMatch,
    holders: Vec<InstitutionalHolder>,
) -> Vec<CandidatePath> {
    let mut candidates = vec![CandidatePath::publicly_traded(
        query,
        Some(&listing.listing()),
        Confidence::Medium,
        SOURCE_ID,
    )];
    candidates.extend(top_holders(holders, MAX_HOLDERS).into_iter().map(|h| {
        CandidatePath::single_hop(
            query,
            h.holder.trim(),
            TerminalKind::Organization,
            RelationKind::Shareholder,
            Confidence::Low,
            SOURCE_ID,
        )
    }));
    candidates
}

#[async_trait]
impl FlatProvider for MarketDataProvider {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    async fn quick_lookup(&self, name: &str) -> ProviderResult<Vec<CandidatePath>> {
        let matches = self
            .client
            .search(name)
            .await
            .map_err(|e| ProviderError::unavailable(SOURCE_ID, e))?;

        let Some(listing) = matching_symbol(&matches, name).filter(|m| m.is_listed()) else {
            return Ok(Vec::new());
        };

        let holders = match self.client.institutional_holders(&listing.symbol).await {
            Ok(holders) => holders,
            Err(e) => {
                tracing::warn!(symbol = %listing.symbol, error = %e, "Holder lookup failed");
                Vec::new()
            }
        };

        Ok(candidates_from_listing(name, listing, holders))
    }
}
