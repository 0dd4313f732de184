/// Domain queries
///
/// Every function normalizes its inputs, serves through the cache and
/// returns a [`GatewayResponse`]. None of them returns an error or panics on
/// provider failure.
use super::{keys, Gateway, GatewayResponse};
use crate::apis::coingecko::MAX_PER_PAGE;
use crate::apis::coinmarketcap::{MAX_GAINERS_LOSERS_LIMIT, MAX_LISTINGS_LIMIT};
use crate::apis::types::{
    CoinListing, GainersLosers, SearchResult, TokenAnalysis, TokenPool, TokenProfile, TrendingCoin,
};
use crate::errors::{GatewayError, VoteError};
use crate::logger::{self, LogTag};
use crate::votes::VoteTally;

/// Longest accepted search query
const MAX_QUERY_LENGTH: usize = 64;

pub(crate) fn normalize_chain(chain_id: &str) -> Result<String, GatewayError> {
    let chain = chain_id.trim().to_lowercase();
    if chain.is_empty() || !chain.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(GatewayError::InvalidInput(format!("invalid chain id '{}'", chain_id)));
    }
    Ok(chain)
}

pub(crate) fn normalize_address(token_address: &str) -> Result<String, GatewayError> {
    let address = token_address.trim();
    if address.is_empty() || !address.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(GatewayError::InvalidInput(format!(
            "invalid token address '{}'",
            token_address
        )));
    }
    Ok(address.to_string())
}

pub(crate) fn normalize_token(chain_id: &str, token_address: &str) -> Result<(String, String), GatewayError> {
    Ok((normalize_chain(chain_id)?, normalize_address(token_address)?))
}

pub(crate) fn normalize_query(query: &str) -> Result<String, GatewayError> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Err(GatewayError::InvalidInput("search query must not be empty".to_string()));
    }
    if query.chars().count() > MAX_QUERY_LENGTH {
        return Err(GatewayError::InvalidInput(format!(
            "search query longer than {} characters",
            MAX_QUERY_LENGTH
        )));
    }
    Ok(query)
}

impl Gateway {
    /// Top coins by market cap; `page` >= 1, `per_page` clamped to 1..=250
    pub async fn get_top_coins(&self, page: u32, per_page: u32) -> GatewayResponse<Vec<CoinListing>> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);

        self.cached(
            &keys::top_coins(page, per_page),
            self.config.cache.top_coins_ttl_secs,
            || async {
                self.apis
                    .coingecko
                    .fetch_markets(page, per_page)
                    .await
                    .map_err(GatewayError::from)
            },
        )
        .await
    }

    pub async fn get_trending_coins(&self) -> GatewayResponse<Vec<TrendingCoin>> {
        self.cached(
            keys::TRENDING_COINS,
            self.config.cache.trending_ttl_secs,
            || async { self.apis.coingecko.fetch_trending().await.map_err(GatewayError::from) },
        )
        .await
    }

    /// All DEX pools for a token; chain id is case-insensitive, address is not
    pub async fn get_token_pools(&self, chain_id: &str, token_address: &str) -> GatewayResponse<Vec<TokenPool>> {
        let (chain, address) = match normalize_token(chain_id, token_address) {
            Ok(normalized) => normalized,
            Err(e) => return GatewayResponse::failure(e.to_string()),
        };

        self.cached(
            &keys::token_pools(&chain, &address),
            self.config.cache.token_pools_ttl_secs,
            || async {
                self.apis
                    .dexscreener
                    .fetch_token_pools(&chain, &address)
                    .await
                    .map_err(GatewayError::from)
            },
        )
        .await
    }

    /// Latest listings; `limit` clamped to 1..=5000, `start` >= 1
    pub async fn get_latest_listings(&self, limit: u32, start: u32) -> GatewayResponse<Vec<CoinListing>> {
        let limit = limit.clamp(1, MAX_LISTINGS_LIMIT);
        let start = start.max(1);

        self.cached(
            &keys::latest_listings(limit, start),
            self.config.cache.listings_ttl_secs,
            || async {
                self.apis
                    .coinmarketcap
                    .fetch_listings(limit, start)
                    .await
                    .map_err(GatewayError::from)
            },
        )
        .await
    }

    /// 24h gainers and losers; `limit` clamped to 1..=200
    pub async fn get_gainers_losers(&self, limit: u32) -> GatewayResponse<GainersLosers> {
        let limit = limit.clamp(1, MAX_GAINERS_LOSERS_LIMIT);

        self.cached(
            &keys::gainers_losers(limit),
            self.config.cache.gainers_losers_ttl_secs,
            || async {
                self.apis
                    .coinmarketcap
                    .fetch_gainers_losers(limit)
                    .await
                    .map_err(GatewayError::from)
            },
        )
        .await
    }

    /// Coin search; the query is trimmed and lower-cased
    pub async fn search(&self, query: &str) -> GatewayResponse<Vec<SearchResult>> {
        let query = match normalize_query(query) {
            Ok(query) => query,
            Err(e) => return GatewayResponse::failure(e.to_string()),
        };

        self.cached(
            &keys::search(&query),
            self.config.cache.search_ttl_secs,
            || async { self.apis.coingecko.search(&query).await.map_err(GatewayError::from) },
        )
        .await
    }

    /// Token profiles collected by the discovery scan (newest first)
    pub async fn get_discovered_tokens(&self) -> GatewayResponse<Vec<TokenProfile>> {
        self.cached(
            keys::DISCOVERED_TOKENS,
            self.config.cache.discovery_ttl_secs,
            || async { self.discover_once().await.map(|(merged, _)| merged) },
        )
        .await
    }

    /// Pool summary for one token, computed from its DEX pools
    pub async fn get_token_analysis(&self, chain_id: &str, token_address: &str) -> GatewayResponse<TokenAnalysis> {
        let (chain, address) = match normalize_token(chain_id, token_address) {
            Ok(normalized) => normalized,
            Err(e) => return GatewayResponse::failure(e.to_string()),
        };

        self.cached(
            &keys::token_analysis(&chain, &address),
            self.config.cache.analysis_ttl_secs,
            || async {
                let pools = self.apis.dexscreener.fetch_token_pools(&chain, &address).await?;
                Ok::<_, GatewayError>(TokenAnalysis::from_pools(&chain, &address, &pools))
            },
        )
        .await
    }

    /// Cast a vote; `data` is the subject's count after the attempt
    pub async fn vote(&self, subject_id: &str, voter_key: &str) -> GatewayResponse<u64> {
        let subject = subject_id.trim();

        match self.ledger.vote(subject, voter_key) {
            Ok(count) => {
                if let Err(e) = self.cache.delete(&keys::votes(subject)).await {
                    logger::warning(
                        LogTag::Votes,
                        &format!("Failed to invalidate vote count for {}: {}", subject, e),
                    );
                }
                GatewayResponse::ok(count)
            }
            Err(err @ VoteError::AlreadyVoted { .. }) => {
                let current = self.ledger.get_votes(subject).unwrap_or(0);
                GatewayResponse::failure_with(err.to_string(), current)
            }
            Err(e) => {
                if matches!(e, VoteError::Storage(_)) {
                    logger::error(LogTag::Votes, &format!("Vote for {} failed: {}", subject, e));
                }
                GatewayResponse::failure(e.to_string())
            }
        }
    }

    /// Vote count for a subject, cached for `votes_ttl_secs`
    pub async fn get_votes(&self, subject_id: &str) -> GatewayResponse<u64> {
        let subject = subject_id.trim();
        self.cached(
            &keys::votes(subject),
            self.config.cache.votes_ttl_secs,
            || async { self.ledger.get_votes(subject).map_err(GatewayError::from) },
        )
        .await
    }

    pub async fn get_top_voted(&self, limit: usize) -> GatewayResponse<Vec<VoteTally>> {
        GatewayResponse::from_result(
            self.ledger
                .top_voted(limit.clamp(1, 100))
                .map_err(GatewayError::from),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_normalization() {
        assert_eq!(normalize_chain(" Solana ").unwrap(), "solana");
        assert!(normalize_chain("").is_err());
        assert!(normalize_chain("sol/ana").is_err());

        assert_eq!(normalize_address(" So11111111111111111111111111111111111111112 ").unwrap(),
            "So11111111111111111111111111111111111111112");
        assert!(normalize_address("../etc").is_err());

        assert_eq!(normalize_query("  BTC ").unwrap(), "btc");
        assert!(normalize_query("   ").is_err());
        assert!(normalize_query(&"x".repeat(65)).is_err());
    }
}
