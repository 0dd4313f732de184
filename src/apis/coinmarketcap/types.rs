/// CoinMarketCap wire types
use crate::apis::types::CoinListing;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct CmcResponse<T> {
    pub data: T,
    #[serde(default)]
    pub status: Option<CmcStatus>,
}

#[derive(Debug, Deserialize)]
pub struct CmcStatus {
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CmcCoin {
    pub id: u64,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub slug: String,
    pub cmc_rank: Option<u32>,
    pub date_added: Option<String>,
    #[serde(default)]
    pub quote: HashMap<String, CmcQuote>,
}

#[derive(Debug, Deserialize)]
pub struct CmcQuote {
    pub price: Option<f64>,
    pub volume_24h: Option<f64>,
    pub market_cap: Option<f64>,
    pub percent_change_1h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
}

impl CmcCoin {
    pub fn to_listing(&self) -> CoinListing {
        let usd = self.quote.get("USD");
        CoinListing {
            id: self.id.to_string(),
            name: self.name.clone(),
            symbol: self.symbol.to_lowercase(),
            slug: self.slug.clone(),
            rank: self.cmc_rank,
            price_usd: usd.and_then(|q| q.price),
            market_cap_usd: usd.and_then(|q| q.market_cap),
            volume_24h_usd: usd.and_then(|q| q.volume_24h),
            percent_change_1h: usd.and_then(|q| q.percent_change_1h),
            percent_change_24h: usd.and_then(|q| q.percent_change_24h),
            percent_change_7d: usd.and_then(|q| q.percent_change_7d),
            date_added: self.date_added.clone(),
        }
    }
}
