use super::*;
use crate::apis::client::testing::MockTransport;
use crate::cache::testing::UnavailableStore;
use crate::cache::MemoryStore;
use crate::scheduler::schedule_default_tasks;
use std::time::Duration;
use tokio::time::Instant;

const CMC_LISTINGS: &str = r#"{"data":[
    {"id":1,"name":"Bitcoin","symbol":"BTC","slug":"bitcoin","cmc_rank":1,
     "quote":{"USD":{"price":65000.0,"percent_change_24h":2.0}}},
    {"id":52,"name":"XRP","symbol":"XRP","slug":"xrp","cmc_rank":7,
     "quote":{"USD":{"price":0.5,"percent_change_24h":-1.0}}}
]}"#;

const GECKO_MARKETS: &str = r#"[{"id":"bitcoin","symbol":"btc","name":"Bitcoin","current_price":65000.0,"market_cap_rank":1}]"#;

const GECKO_TRENDING: &str = r#"{"coins":[{"item":{"id":"pepe","name":"Pepe","symbol":"PEPE","score":0}}]}"#;

const DEX_PROFILES: &str = r#"[{"chainId":"solana","tokenAddress":"MINT1","url":"https://dexscreener.com/solana/mint1"}]"#;

const DEX_PAIRS: &str = r#"[
    {"chainId":"solana","dexId":"raydium","pairAddress":"P1","liquidity":{"usd":1000.0},"volume":{"h24":10.0}},
    {"chainId":"solana","dexId":"orca","pairAddress":"P2","liquidity":{"usd":5000.0},"volume":{"h24":30.0}}
]"#;

fn test_config(cmc_interval_ms: u64) -> Config {
    let mut config = Config::default();
    config.providers.coinmarketcap.base_url = "https://cmc.test".to_string();
    config.providers.coinmarketcap.min_interval_ms = cmc_interval_ms;
    config.providers.coingecko.base_url = "https://gecko.test/api/v3".to_string();
    config.providers.coingecko.min_interval_ms = 0;
    config.providers.dexscreener.base_url = "https://dex.test".to_string();
    config.providers.dexscreener.min_interval_ms = 0;
    config
}

fn gateway_with(config: Config, transport: Arc<MockTransport>) -> Gateway {
    Gateway::with_parts(
        config,
        transport,
        Arc::new(MemoryStore::new()),
        VoteLedger::in_memory(128).unwrap(),
    )
}

#[tokio::test]
async fn test_three_listing_pages_are_throttled() {
    let transport = Arc::new(MockTransport::new().route("listings/latest", 200, CMC_LISTINGS));
    let gateway = gateway_with(test_config(1500), transport.clone());

    let started = Instant::now();
    let (a, b, c) = tokio::join!(
        gateway.get_latest_listings(100, 1),
        gateway.get_latest_listings(100, 101),
        gateway.get_latest_listings(100, 201)
    );
    assert!(started.elapsed() >= Duration::from_millis(3000));

    for page in [&a, &b, &c] {
        assert!(page.success);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].symbol, "btc");
    }

    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    for pair in calls.windows(2) {
        assert!(pair[1].0.duration_since(pair[0].0) >= Duration::from_millis(1500));
    }
}

#[tokio::test]
async fn test_simulated_500s_yield_empty_envelopes() {
    let transport = Arc::new(MockTransport::new().route("listings/latest", 500, "upstream error"));
    let gateway = gateway_with(test_config(1500), transport.clone());

    let started = Instant::now();
    for start in [1, 101, 201] {
        let page = gateway.get_latest_listings(100, start).await;
        assert!(!page.success);
        assert!(page.data.is_empty());
        assert!(page.message.unwrap_or_default().contains("HTTP 500"));
    }
    assert!(started.elapsed() >= Duration::from_millis(3000));
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test]
async fn test_cache_hit_skips_provider() {
    let transport = Arc::new(MockTransport::new().route("coins/markets", 200, GECKO_MARKETS));
    let gateway = gateway_with(test_config(0), transport.clone());

    let first = gateway.get_top_coins(1, 50).await;
    let second = gateway.get_top_coins(1, 50).await;
    assert!(first.success && second.success);
    assert_eq!(first.data, second.data);
    assert_eq!(transport.call_count(), 1);

    // Different page is a different key
    gateway.get_top_coins(2, 50).await;
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let transport = Arc::new(
        MockTransport::new()
            .route("search/trending", 503, "busy")
            .route("search/trending", 200, GECKO_TRENDING),
    );
    let gateway = gateway_with(test_config(0), transport.clone());

    let failed = gateway.get_trending_coins().await;
    assert!(!failed.success);
    assert!(failed.data.is_empty());

    let recovered = gateway.get_trending_coins().await;
    assert!(recovered.success);
    assert_eq!(recovered.data[0].id, "pepe");
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_stale_copy_served_when_provider_fails() {
    let transport = Arc::new(
        MockTransport::new()
            .route("coins/markets", 200, GECKO_MARKETS)
            .route("coins/markets", 500, "down"),
    );
    let mut config = test_config(0);
    config.cache.top_coins_ttl_secs = 1;
    config.cache.stale_ttl_secs = 3600;
    let gateway = gateway_with(config, transport);

    assert!(gateway.get_top_coins(1, 10).await.success);
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let degraded = gateway.get_top_coins(1, 10).await;
    assert!(!degraded.success);
    assert_eq!(degraded.data.len(), 1);
    assert_eq!(degraded.data[0].id, "bitcoin");
}

#[tokio::test]
async fn test_vote_flow_invalidates_cached_count() {
    let gateway = gateway_with(test_config(0), Arc::new(MockTransport::new()));

    let before = gateway.get_votes("bitcoin").await;
    assert!(before.success);
    assert_eq!(before.data, 0);

    let voted = gateway.vote("bitcoin", "203.0.113.7").await;
    assert!(voted.success);
    assert_eq!(voted.data, 1);

    // Cached 0 was dropped by the vote
    assert_eq!(gateway.get_votes("bitcoin").await.data, 1);

    let again = gateway.vote("bitcoin", "203.0.113.7").await;
    assert!(!again.success);
    assert_eq!(again.data, 1);
    assert!(again.message.unwrap_or_default().contains("already voted"));

    let top = gateway.get_top_voted(10).await;
    assert_eq!(top.data.len(), 1);
    assert_eq!(top.data[0].subject_id, "bitcoin");
}

#[tokio::test]
async fn test_invalid_inputs_never_call_out() {
    let transport = Arc::new(MockTransport::new());
    let gateway = gateway_with(test_config(0), transport.clone());

    let search = gateway.search("   ").await;
    assert!(!search.success);
    assert!(search.data.is_empty());

    let pools = gateway.get_token_pools("", "MINT").await;
    assert!(!pools.success);

    let vote = gateway.vote("", "voter").await;
    assert!(!vote.success);

    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_search_normalizes_query() {
    let body = r#"{"coins":[{"id":"solana","name":"Solana","symbol":"SOL"}]}"#;
    let transport = Arc::new(MockTransport::new().route("/search?", 200, body));
    let gateway = gateway_with(test_config(0), transport.clone());

    assert!(gateway.search("  SOL ").await.success);
    assert!(gateway.search("sol").await.success);
    assert_eq!(transport.call_count(), 1);
    assert!(transport.calls()[0].1.url.contains("query=sol"));
}

#[tokio::test]
async fn test_unavailable_cache_still_serves() {
    let transport = Arc::new(MockTransport::new().route("search/trending", 200, GECKO_TRENDING));
    let gateway = Gateway::with_parts(
        test_config(0),
        transport.clone(),
        Arc::new(UnavailableStore),
        VoteLedger::in_memory(128).unwrap(),
    );

    assert!(gateway.get_trending_coins().await.success);
    assert!(gateway.get_trending_coins().await.success);
    // Every request is a forced miss
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_discovery_then_analysis() {
    let transport = Arc::new(
        MockTransport::new()
            .route("token-profiles/latest", 200, DEX_PROFILES)
            .route("token-pairs/v1/solana/MINT1", 200, DEX_PAIRS),
    );
    let gateway = gateway_with(test_config(0), transport.clone());

    assert_eq!(gateway.run_discovery_scan().await.unwrap(), 1);
    assert_eq!(gateway.run_discovery_scan().await.unwrap(), 0);
    assert_eq!(gateway.run_analysis_refresh().await.unwrap(), 1);
    let calls_after_refresh = transport.call_count();

    let analysis = gateway.get_token_analysis("solana", "MINT1").await;
    assert!(analysis.success);
    assert_eq!(analysis.data.pool_count, 2);
    assert_eq!(analysis.data.best_pair_address.as_deref(), Some("P2"));

    let pools = gateway.get_token_pools("SOLANA", "MINT1").await;
    assert_eq!(pools.data.len(), 2);
    assert_eq!(transport.call_count(), calls_after_refresh);

    let discovered = gateway.get_discovered_tokens().await;
    assert_eq!(discovered.data[0].token_address, "MINT1");
}

#[tokio::test]
async fn test_cold_discovered_tokens_are_deduplicated() {
    let repeated = r#"[
        {"chainId":"solana","tokenAddress":"MINT1"},
        {"chainId":"Solana","tokenAddress":"MINT1"},
        {"chainId":"solana","tokenAddress":"MINT1"}
    ]"#;
    let transport = Arc::new(MockTransport::new().route("token-profiles/latest", 200, repeated));
    let gateway = gateway_with(test_config(0), transport.clone());

    let discovered = gateway.get_discovered_tokens().await;
    assert!(discovered.success);
    assert_eq!(discovered.data.len(), 1);
    assert_eq!(discovered.data[0].token_address, "MINT1");

    // The cold load stored the merged list, so a scan finds nothing new
    assert_eq!(gateway.run_discovery_scan().await.unwrap(), 0);
    assert_eq!(gateway.get_discovered_tokens().await.data.len(), 1);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_reprime_warms_hot_keys() {
    let transport = Arc::new(
        MockTransport::new()
            .route("coins/markets", 200, GECKO_MARKETS)
            .route("search/trending", 200, GECKO_TRENDING)
            .route("listings/latest", 200, CMC_LISTINGS)
            .route("gainers-losers", 200, CMC_LISTINGS),
    );
    let gateway = gateway_with(test_config(0), transport.clone());

    assert_eq!(gateway.reprime_hot_keys().await.unwrap(), 4);
    assert_eq!(transport.call_count(), 4);

    let per_page = gateway.config().scheduler.reprime_per_page;
    assert!(gateway.get_top_coins(1, per_page).await.success);
    assert!(gateway.get_trending_coins().await.success);
    assert!(gateway.get_latest_listings(per_page, 1).await.success);
    assert!(gateway.get_gainers_losers(10).await.success);
    assert_eq!(transport.call_count(), 4);

    let status = gateway.status().await;
    assert_eq!(status.queues.len(), 3);
    assert_eq!(status.cache.backend, "memory");
    assert_eq!(status.cache.entries, Some(4));
    assert_eq!(status.providers.coinmarketcap.successful_requests, 2);
}

#[tokio::test]
async fn test_reprime_reports_failures() {
    let transport = Arc::new(MockTransport::new().route("search/trending", 200, GECKO_TRENDING));
    let gateway = gateway_with(test_config(0), transport);

    let err = gateway.reprime_hot_keys().await.unwrap_err();
    assert!(matches!(err, GatewayError::Provider(_)));
    // The one healthy key was still refreshed
    assert!(gateway.cache().get::<Vec<crate::apis::TrendingCoin>>(keys::TRENDING_COINS).await.is_some());
}

#[tokio::test]
async fn test_default_tasks_run_and_shut_down() {
    let transport = Arc::new(MockTransport::new().route("token-profiles/latest", 200, DEX_PROFILES));
    let config = test_config(0);
    let scheduler_config = config.scheduler.clone();
    let gateway = Arc::new(gateway_with(config, transport));

    assert_eq!(schedule_default_tasks(&gateway, &scheduler_config).unwrap(), 4);
    tokio::time::sleep(Duration::from_millis(300)).await;

    let statuses = gateway.scheduler().statuses();
    assert_eq!(statuses.len(), 4);
    assert!(statuses.iter().all(|s| s.runs >= 1));
    // Repriming hits unrouted endpoints and fails, but stays armed
    let reprime = statuses.iter().find(|s| s.name == "cache_reprime").unwrap();
    assert!(reprime.failures >= 1);

    gateway.shutdown().await;
    assert!(gateway.scheduler().statuses().is_empty());
    assert!(gateway.status().await.queues.iter().all(|q| q.closed));
}

#[tokio::test]
async fn test_disabled_scheduler_arms_nothing() {
    let mut config = test_config(0);
    config.scheduler.enabled = false;
    let scheduler_config = config.scheduler.clone();
    let gateway = Arc::new(gateway_with(config, Arc::new(MockTransport::new())));

    assert_eq!(schedule_default_tasks(&gateway, &scheduler_config).unwrap(), 0);
    assert!(gateway.scheduler().statuses().is_empty());
}
