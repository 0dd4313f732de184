/// CoinGecko wire types
use crate::apis::types::{CoinListing, SearchResult, TrendingCoin};
use serde::Deserialize;

/// Row of `/coins/markets`
#[derive(Debug, Deserialize)]
pub struct CoinGeckoMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub total_volume: Option<f64>,
    pub price_change_percentage_1h_in_currency: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_7d_in_currency: Option<f64>,
}

impl CoinGeckoMarket {
    pub fn to_listing(&self) -> CoinListing {
        CoinListing {
            id: self.id.clone(),
            name: self.name.clone(),
            symbol: self.symbol.to_lowercase(),
            slug: self.id.clone(),
            rank: self.market_cap_rank,
            price_usd: self.current_price,
            market_cap_usd: self.market_cap,
            volume_24h_usd: self.total_volume,
            percent_change_1h: self.price_change_percentage_1h_in_currency,
            percent_change_24h: self.price_change_percentage_24h,
            percent_change_7d: self.price_change_percentage_7d_in_currency,
            date_added: None,
        }
    }
}

/// `/search/trending`
#[derive(Debug, Deserialize)]
pub struct TrendingResponse {
    #[serde(default)]
    pub coins: Vec<TrendingItemWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingItemWrapper {
    pub item: TrendingItem,
}

#[derive(Debug, Deserialize)]
pub struct TrendingItem {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
    pub thumb: Option<String>,
    pub price_btc: Option<f64>,
    #[serde(default)]
    pub score: u32,
}

impl TrendingItem {
    pub fn to_trending(&self) -> TrendingCoin {
        TrendingCoin {
            id: self.id.clone(),
            name: self.name.clone(),
            symbol: self.symbol.to_lowercase(),
            market_cap_rank: self.market_cap_rank,
            thumb: self.thumb.clone(),
            price_btc: self.price_btc,
            score: self.score,
        }
    }
}

/// `/search?query=`
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub coins: Vec<SearchCoin>,
}

#[derive(Debug, Deserialize)]
pub struct SearchCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
    pub thumb: Option<String>,
}

impl SearchCoin {
    pub fn to_result(&self) -> SearchResult {
        SearchResult {
            id: self.id.clone(),
            name: self.name.clone(),
            symbol: self.symbol.to_lowercase(),
            market_cap_rank: self.market_cap_rank,
            thumb: self.thumb.clone(),
        }
    }
}
