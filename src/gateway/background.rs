/// Background refresh work driven by the scheduler
///
/// These run through the same provider queues and cache as user queries.
/// Writes are plain `set`s, so whichever of a background refresh and a user
/// load finishes last wins.
use super::queries::normalize_token;
use super::{keys, Gateway};
use crate::apis::types::{TokenAnalysis, TokenProfile};
use crate::errors::GatewayError;
use crate::logger::{self, LogTag};
use std::collections::HashSet;

/// Upper bound on remembered discovered tokens
const MAX_DISCOVERED_TOKENS: usize = 500;

/// Gainers/losers list length kept warm by repriming
const REPRIME_GAINERS_LOSERS_LIMIT: u32 = 10;

fn profile_id(profile: &TokenProfile) -> (String, String) {
    (profile.chain_id.to_lowercase(), profile.token_address.clone())
}

/// Merge `fresh` profiles in front of `known`, dropping duplicates
pub(crate) fn merge_discovered(known: Vec<TokenProfile>, fresh: Vec<TokenProfile>) -> (Vec<TokenProfile>, usize) {
    let known_ids: HashSet<(String, String)> = known.iter().map(profile_id).collect();
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(known.len() + fresh.len());
    let mut new_count = 0;

    for profile in fresh.into_iter().chain(known) {
        let id = profile_id(&profile);
        if !seen.insert(id.clone()) {
            continue;
        }
        if !known_ids.contains(&id) {
            new_count += 1;
        }
        merged.push(profile);
    }
    merged.truncate(MAX_DISCOVERED_TOKENS);
    (merged, new_count)
}

impl Gateway {
    /// Latest profiles merged into the cached list; nothing is written
    pub(crate) async fn discover_once(&self) -> Result<(Vec<TokenProfile>, usize), GatewayError> {
        let fresh = self.apis.dexscreener.fetch_latest_profiles().await?;
        let known: Vec<TokenProfile> = self
            .cache
            .get(keys::DISCOVERED_TOKENS)
            .await
            .unwrap_or_default();
        Ok(merge_discovered(known, fresh))
    }

    /// Fetch the latest token profiles and fold them into `discovered_tokens`
    ///
    /// Returns how many tokens were not seen before.
    pub async fn run_discovery_scan(&self) -> Result<usize, GatewayError> {
        let (merged, new_count) = self.discover_once().await?;
        self.cache
            .set(keys::DISCOVERED_TOKENS, &merged, self.config.cache.discovery_ttl_secs)
            .await?;

        logger::info(
            LogTag::Gateway,
            &format!(
                "Discovery scan: {} new tokens ({} tracked)",
                new_count,
                merged.len()
            ),
        );
        Ok(new_count)
    }

    /// Recompute pool analysis for the most recently discovered tokens
    ///
    /// Per-token failures are logged and skipped; the run fails only when
    /// every token failed.
    pub async fn run_analysis_refresh(&self) -> Result<usize, GatewayError> {
        let discovered: Vec<TokenProfile> = self
            .cache
            .get(keys::DISCOVERED_TOKENS)
            .await
            .unwrap_or_default();
        let targets: Vec<&TokenProfile> = discovered
            .iter()
            .take(self.config.scheduler.analysis_max_tokens)
            .collect();

        if targets.is_empty() {
            logger::debug(LogTag::Gateway, "Analysis refresh: no discovered tokens yet");
            return Ok(0);
        }

        let mut analysed = 0usize;
        let mut last_error = None;

        for profile in &targets {
            let (chain, address) = match normalize_token(&profile.chain_id, &profile.token_address) {
                Ok(normalized) => normalized,
                Err(e) => {
                    logger::debug(LogTag::Gateway, &format!("Skipping malformed profile: {}", e));
                    continue;
                }
            };

            let pools = self
                .cache
                .refresh(
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
                .await;

            match pools {
                Ok(pools) => {
                    let analysis = TokenAnalysis::from_pools(&chain, &address, &pools);
                    self.cache
                        .set(
                            &keys::token_analysis(&chain, &address),
                            &analysis,
                            self.config.cache.analysis_ttl_secs,
                        )
                        .await?;
                    analysed += 1;
                }
                Err(e) => {
                    logger::warning(
                        LogTag::Gateway,
                        &format!("Analysis of {}/{} failed: {}", chain, address, e),
                    );
                    last_error = Some(e);
                }
            }
        }

        logger::info(
            LogTag::Gateway,
            &format!("Analysis refresh: {}/{} tokens analysed", analysed, targets.len()),
        );

        match last_error {
            Some(e) if analysed == 0 => Err(e),
            _ => Ok(analysed),
        }
    }

    /// Overwrite the hot listing keys with fresh provider data
    ///
    /// Returns the number of keys refreshed; fails with the first error when
    /// any key failed.
    pub async fn reprime_hot_keys(&self) -> Result<usize, GatewayError> {
        let per_page = self.config.scheduler.reprime_per_page;
        let cache_config = &self.config.cache;
        let mut refreshed = 0usize;
        let mut failures = Vec::new();

        let top = self
            .cache
            .refresh(
                &keys::top_coins(1, per_page.clamp(1, crate::apis::coingecko::MAX_PER_PAGE)),
                cache_config.top_coins_ttl_secs,
                || async {
                    self.apis
                        .coingecko
                        .fetch_markets(1, per_page)
                        .await
                        .map_err(GatewayError::from)
                },
            )
            .await;
        tally(top.map(|_| ()), "top coins", &mut refreshed, &mut failures);

        let trending = self
            .cache
            .refresh(keys::TRENDING_COINS, cache_config.trending_ttl_secs, || async {
                self.apis
                    .coingecko
                    .fetch_trending()
                    .await
                    .map_err(GatewayError::from)
            })
            .await;
        tally(trending.map(|_| ()), "trending", &mut refreshed, &mut failures);

        let listings = self
            .cache
            .refresh(
                &keys::latest_listings(per_page.clamp(1, crate::apis::coinmarketcap::MAX_LISTINGS_LIMIT), 1),
                cache_config.listings_ttl_secs,
                || async {
                    self.apis
                        .coinmarketcap
                        .fetch_listings(per_page, 1)
                        .await
                        .map_err(GatewayError::from)
                },
            )
            .await;
        tally(listings.map(|_| ()), "latest listings", &mut refreshed, &mut failures);

        let movers = self
            .cache
            .refresh(
                &keys::gainers_losers(REPRIME_GAINERS_LOSERS_LIMIT),
                cache_config.gainers_losers_ttl_secs,
                || async {
                    self.apis
                        .coinmarketcap
                        .fetch_gainers_losers(REPRIME_GAINERS_LOSERS_LIMIT)
                        .await
                        .map_err(GatewayError::from)
                },
            )
            .await;
        tally(movers.map(|_| ()), "gainers/losers", &mut refreshed, &mut failures);

        logger::debug(
            LogTag::Gateway,
            &format!("Repriming refreshed {} hot keys", refreshed),
        );

        if failures.is_empty() {
            return Ok(refreshed);
        }
        for (label, e) in &failures {
            logger::warning(LogTag::Gateway, &format!("Repriming {} failed: {}", label, e));
        }
        Err(failures.remove(0).1)
    }

    /// Drop expired entries from the cache backend
    pub async fn purge_expired_cache(&self) -> Result<usize, GatewayError> {
        Ok(self.cache.purge_expired().await?)
    }
}

fn tally(
    result: Result<(), GatewayError>,
    label: &'static str,
    refreshed: &mut usize,
    failures: &mut Vec<(&'static str, GatewayError)>,
) {
    match result {
        Ok(()) => *refreshed += 1,
        Err(e) => failures.push((label, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(chain: &str, address: &str) -> TokenProfile {
        TokenProfile {
            chain_id: chain.to_string(),
            token_address: address.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_puts_fresh_first_and_counts_new() {
        let known = vec![profile("solana", "A"), profile("solana", "B")];
        let fresh = vec![profile("solana", "C"), profile("Solana", "A")];

        let (merged, new_count) = merge_discovered(known, fresh);
        let addresses: Vec<&str> = merged.iter().map(|p| p.token_address.as_str()).collect();
        assert_eq!(addresses, vec!["C", "A", "B"]);
        assert_eq!(new_count, 1);
    }
}
