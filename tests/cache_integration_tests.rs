//! Integration tests for the tiered cache
//!
//! These tests verify the complete cache behavior including:
//! - TTL expiration across tiers
//! - LRU eviction per tier
//! - Promotion into faster tiers
//! - Write-through independence
//! - Delete/clear semantics and metrics bounds
//! - Background sweep lifecycle

use ouroboros_cache::cache::{
    CacheConfig, CacheOrchestrator, ManualClock, MemoryTier, TierBackend, TierLevel,
};
use std::sync::Arc;
use std::time::Duration;

fn config(fast: usize, medium: usize, slow: usize) -> CacheConfig {
    CacheConfig::builder()
        .capacities(fast, medium, slow)
        .default_ttl(Duration::from_secs(300))
        .enable_auto_cleanup(false)
        .build()
}

fn build(config: CacheConfig) -> (CacheOrchestrator<i32>, ManualClock) {
    let clock = ManualClock::new();
    let cache = CacheOrchestrator::builder(config)
        .clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    (cache, clock)
}

/// Cache whose tiers the test can inspect directly
fn build_with_tiers(
    config: CacheConfig,
) -> (CacheOrchestrator<i32>, ManualClock, [Arc<MemoryTier<i32>>; 3]) {
    let clock = ManualClock::new();
    let [fast, medium, slow] = config.capacities();
    let tiers = [
        Arc::new(MemoryTier::new(TierLevel::Fast, fast)),
        Arc::new(MemoryTier::new(TierLevel::Medium, medium)),
        Arc::new(MemoryTier::new(TierLevel::Slow, slow)),
    ];

    let mut builder = CacheOrchestrator::builder(config).clock(Arc::new(clock.clone()));
    for tier in &tiers {
        let backend: Arc<dyn TierBackend<i32>> = tier.clone();
        builder = builder.tier(tier.level(), backend);
    }

    (builder.build().unwrap(), clock, tiers)
}

async fn keys_in(tier: &MemoryTier<i32>) -> Vec<String> {
    let mut keys = tier.lru_order().await;
    keys.sort();
    keys
}

#[tokio::test]
async fn test_ttl_expiration_in_every_tier() {
    let (cache, clock) = build(config(10, 10, 10));

    cache
        .set_with_ttl("k", 7, Some(Duration::from_secs(30)))
        .await
        .unwrap();
    assert_eq!(cache.get("k").await, Some(7));

    clock.advance(Duration::from_secs(31));
    assert_eq!(cache.get("k").await, None);
    assert!(!cache.contains("k").await);

    let metrics = cache.get_metrics().await;
    assert_eq!(metrics.fast_hits, 1);
    assert_eq!(metrics.misses, 1);
}

#[tokio::test]
async fn test_reads_do_not_extend_ttl() {
    let (cache, clock) = build(config(10, 10, 10));
    cache
        .set_with_ttl("k", 1, Some(Duration::from_secs(60)))
        .await
        .unwrap();

    for _ in 0..59 {
        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get("k").await, Some(1));
    }

    clock.advance(Duration::from_secs(2));
    assert_eq!(cache.get("k").await, None);
}

#[tokio::test]
async fn test_default_ttl_applies() {
    let (cache, clock) = build(config(10, 10, 10));
    cache.set("k", 1).await.unwrap();

    clock.advance(Duration::from_secs(299));
    assert_eq!(cache.get("k").await, Some(1));

    clock.advance(Duration::from_secs(2));
    assert_eq!(cache.get("k").await, None);
}

#[tokio::test]
async fn test_lru_eviction_in_fast_tier() {
    let (cache, _, [fast, _, _]) = build_with_tiers(config(3, 10, 10));

    for (key, value) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
        cache.set(key, value).await.unwrap();
    }

    assert_eq!(keys_in(&fast).await, vec!["b", "c", "d"]);
}

#[tokio::test]
async fn test_touch_changes_eviction_victim() {
    let (cache, _, [fast, _, _]) = build_with_tiers(config(3, 10, 10));

    cache.set("a", 1).await.unwrap();
    cache.set("b", 2).await.unwrap();
    cache.set("c", 3).await.unwrap();

    assert_eq!(cache.get("a").await, Some(1));
    cache.set("d", 4).await.unwrap();

    // b is now the least recently touched
    assert_eq!(keys_in(&fast).await, vec!["a", "c", "d"]);
}

#[tokio::test]
async fn test_promotion_from_slow_tier() {
    let (cache, _, [fast, medium, slow]) = build_with_tiers(config(10, 10, 10));

    cache.set("k", 42).await.unwrap();
    fast.remove("k").await.unwrap();
    medium.remove("k").await.unwrap();

    assert_eq!(cache.get("k").await, Some(42));
    let metrics = cache.get_metrics().await;
    assert_eq!(metrics.slow_hits, 1);
    assert_eq!(metrics.fast_hits, 0);

    // Copied into both faster tiers, slow copy untouched
    assert!(fast.lookup("k").await.unwrap().is_some());
    assert!(medium.lookup("k").await.unwrap().is_some());
    assert_eq!(slow.lookup("k").await.unwrap().unwrap().metadata.access_count, 1);

    assert_eq!(cache.get("k").await, Some(42));
    let metrics = cache.get_metrics().await;
    assert_eq!(metrics.fast_hits, 1);
    assert_eq!(metrics.slow_hits, 1);
}

#[tokio::test]
async fn test_promoted_copy_gets_fresh_window() {
    let (cache, clock, [fast, medium, _]) = build_with_tiers(config(10, 10, 10));

    cache
        .set_with_ttl("k", 5, Some(Duration::from_secs(60)))
        .await
        .unwrap();
    fast.remove("k").await.unwrap();
    medium.remove("k").await.unwrap();

    clock.advance(Duration::from_secs(50));
    assert_eq!(cache.get("k").await, Some(5));

    // Slow copy has expired, the promoted copy has not
    clock.advance(Duration::from_secs(20));
    assert_eq!(cache.get("k").await, Some(5));
    assert_eq!(cache.get_metrics().await.fast_hits, 1);
}

#[tokio::test]
async fn test_scenario_promotion_evicts_least_recent() {
    let (cache, _, [fast, _, _]) = build_with_tiers(config(2, 10, 10));

    cache.set("a", 1).await.unwrap();
    cache.set("b", 2).await.unwrap();
    cache.set("c", 3).await.unwrap();
    assert_eq!(keys_in(&fast).await, vec!["b", "c"]);

    assert_eq!(cache.get("a").await, Some(1));
    assert_eq!(cache.get_metrics().await.medium_hits, 1);
    assert_eq!(keys_in(&fast).await, vec!["a", "c"]);
}

#[tokio::test]
async fn test_write_through_independence() {
    let (cache, _, tiers) = build_with_tiers(config(1, 1, 1));

    // A different prior occupant in each tier
    for (tier, key) in tiers.iter().zip(["x", "y", "z"]) {
        tier.put(ouroboros_cache::CacheEntry::new(
            key.to_string(),
            0,
            None,
            chrono::Utc::now(),
        ))
        .await
        .unwrap();
    }

    cache.set("k", 9).await.unwrap();

    for tier in &tiers {
        assert_eq!(keys_in(tier).await, vec!["k"]);
        assert_eq!(tier.stats().await.unwrap().evictions, 1);
    }
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (cache, _) = build(config(10, 10, 10));

    cache.set("k", 1).await.unwrap();
    assert!(cache.delete("k").await.unwrap());
    assert!(!cache.delete("k").await.unwrap());
    assert_eq!(cache.get("k").await, None);

    for level in TierLevel::ALL {
        assert_eq!(cache.tier_len(level).await.unwrap(), 0);
    }
}

#[tokio::test]
async fn test_delete_finds_key_in_any_tier() {
    let (cache, _, [fast, medium, _]) = build_with_tiers(config(10, 10, 10));

    cache.set("k", 1).await.unwrap();
    fast.remove("k").await.unwrap();
    medium.remove("k").await.unwrap();

    assert!(cache.delete("k").await.unwrap());
}

#[tokio::test]
async fn test_clear_does_not_reset_metrics() {
    let (cache, _) = build(config(10, 10, 10));

    cache.set("a", 1).await.unwrap();
    cache.set("b", 2).await.unwrap();
    cache.get("a").await;

    cache.clear().await.unwrap();
    for level in TierLevel::ALL {
        assert_eq!(cache.tier_len(level).await.unwrap(), 0);
    }
    assert_eq!(cache.get_metrics().await.fast_hits, 1);
}

#[tokio::test]
async fn test_metrics_bounds_hold() {
    let (cache, clock, [fast, medium, _]) = build_with_tiers(config(2, 4, 8));

    for i in 0..20 {
        let key = format!("k{}", i % 7);
        match i % 4 {
            0 => cache.set(key.clone(), i).await.unwrap(),
            1 => {
                cache.get(&key).await;
            }
            2 => {
                fast.remove(&key).await.unwrap();
                medium.remove(&key).await.unwrap();
                cache.get(&key).await;
            }
            _ => {
                cache.delete(&key).await.unwrap();
                clock.advance(Duration::from_secs(40));
                cache.get("k0").await;
            }
        }

        let m = cache.get_metrics().await;
        assert!((0.0..=1.0).contains(&m.hit_rate));
        assert_eq!(m.total_queries, m.fast_hits + m.medium_hits + m.slow_hits + m.misses);
    }
}

#[tokio::test]
async fn test_health_derivation() {
    let (cache, _) = build(config(10, 10, 10));

    // No queries yet: hit rate 0
    assert_eq!(
        cache.get_health().await.status,
        ouroboros_cache::HealthStatus::Unhealthy
    );

    cache.set("k", 1).await.unwrap();
    for _ in 0..9 {
        cache.get("k").await;
    }
    cache.get("missing").await;

    let health = cache.get_health().await;
    assert_eq!(health.details.total_queries, 10);
    assert!((health.details.hit_rate - 0.9).abs() < 1e-9);
    assert_eq!(health.status, ouroboros_cache::HealthStatus::Healthy);
}

#[tokio::test(start_paused = true)]
async fn test_background_sweep_removes_expired() {
    let clock = ManualClock::new();
    let cache: CacheOrchestrator<i32> = CacheOrchestrator::builder(
        CacheConfig::builder()
            .cleanup_interval(Duration::from_secs(10))
            .build(),
    )
    .clock(Arc::new(clock.clone()))
    .build()
    .unwrap();
    assert!(cache.is_running());

    cache
        .set_with_ttl("k", 1, Some(Duration::from_secs(5)))
        .await
        .unwrap();
    clock.advance(Duration::from_secs(6));

    tokio::time::sleep(Duration::from_secs(11)).await;

    for level in TierLevel::ALL {
        assert_eq!(cache.tier_len(level).await.unwrap(), 0);
    }
    cache.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_twice_stops_sweeping() {
    let clock = ManualClock::new();
    let cache: CacheOrchestrator<i32> = CacheOrchestrator::builder(
        CacheConfig::builder()
            .cleanup_interval(Duration::from_secs(10))
            .build(),
    )
    .clock(Arc::new(clock.clone()))
    .build()
    .unwrap();

    cache
        .set_with_ttl("k", 1, Some(Duration::from_secs(5)))
        .await
        .unwrap();

    cache.shutdown().await;
    cache.shutdown().await;
    assert!(!cache.is_running());

    clock.advance(Duration::from_secs(6));
    tokio::time::sleep(Duration::from_secs(60)).await;

    // Never swept, but invalid on read
    assert_eq!(cache.tier_len(TierLevel::Fast).await.unwrap(), 1);
    assert_eq!(cache.get("k").await, None);

    // Still usable after shutdown
    cache.set("fresh", 2).await.unwrap();
    assert_eq!(cache.get("fresh").await, Some(2));
}
