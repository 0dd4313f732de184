//! Cache key layout
//!
//! Keys are built from already-normalized inputs so that equivalent requests
//! share an entry.

pub const TRENDING_COINS: &str = "trending_coins";
pub const DISCOVERED_TOKENS: &str = "discovered_tokens";

pub fn top_coins(page: u32, per_page: u32) -> String {
    format!("top_coins_{}_{}", page, per_page)
}

pub fn latest_listings(limit: u32, start: u32) -> String {
    format!("latest_listings_{}_{}", limit, start)
}

pub fn gainers_losers(limit: u32) -> String {
    format!("gainers_losers_{}", limit)
}

pub fn token_pools(chain_id: &str, token_address: &str) -> String {
    format!("token_pools_{}_{}", chain_id, token_address)
}

pub fn search(query: &str) -> String {
    format!("search_{}", query)
}

pub fn votes(subject_id: &str) -> String {
    format!("votes_{}", subject_id)
}

pub fn token_analysis(chain_id: &str, token_address: &str) -> String {
    format!("token_analysis_{}_{}", chain_id, token_address)
}
