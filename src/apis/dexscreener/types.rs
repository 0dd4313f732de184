/// DexScreener wire types
use crate::apis::types::{parse_f64, TokenPool, TokenProfile};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexScreenerPairRaw {
    pub chain_id: Option<String>,
    pub dex_id: Option<String>,
    pub url: Option<String>,
    pub pair_address: Option<String>,
    pub base_token: Option<PairToken>,
    pub quote_token: Option<PairToken>,
    pub price_usd: Option<String>,
    pub volume: Option<Windowed>,
    pub price_change: Option<Windowed>,
    pub liquidity: Option<LiquidityData>,
    pub market_cap: Option<f64>,
    pub pair_created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PairToken {
    pub address: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Windowed {
    pub h24: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct LiquidityData {
    pub usd: Option<f64>,
}

impl DexScreenerPairRaw {
    pub fn to_pool(&self) -> TokenPool {
        let mut pool = TokenPool {
            chain_id: self.chain_id.clone().unwrap_or_default(),
            dex_id: self.dex_id.clone().unwrap_or_default(),
            pair_address: self.pair_address.clone().unwrap_or_default(),
            url: self.url.clone(),
            price_usd: parse_f64(self.price_usd.as_deref()),
            liquidity_usd: self.liquidity.as_ref().and_then(|l| l.usd),
            volume_h24: self.volume.as_ref().and_then(|v| v.h24),
            price_change_h24: self.price_change.as_ref().and_then(|p| p.h24),
            market_cap: self.market_cap,
            pair_created_at: self.pair_created_at,
            ..Default::default()
        };

        if let Some(ref base) = self.base_token {
            pool.base_token_address = base.address.clone().unwrap_or_default();
            pool.base_token_symbol = base.symbol.clone().unwrap_or_default().to_lowercase();
        }
        if let Some(ref quote) = self.quote_token {
            pool.quote_token_address = quote.address.clone().unwrap_or_default();
            pool.quote_token_symbol = quote.symbol.clone().unwrap_or_default().to_lowercase();
        }

        pool
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenProfileRaw {
    pub chain_id: String,
    pub token_address: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl TokenProfileRaw {
    pub fn to_profile(&self) -> TokenProfile {
        TokenProfile {
            chain_id: self.chain_id.clone(),
            token_address: self.token_address.clone(),
            url: self.url.clone(),
            description: self.description.clone(),
            icon: self.icon.clone(),
        }
    }
}
