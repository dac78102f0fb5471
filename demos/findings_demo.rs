//! Walk-through of the tiered cache and the findings store
//!
//! Run with: RUST_LOG=ouroboros_cache=debug cargo run --example findings_demo

use anyhow::Result;
use ouroboros_cache::{
    CacheConfig, CacheOrchestrator, Finding, FindingsConfig, FindingsStore, Importance,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ouroboros_cache=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env()?;
    let cache = Arc::new(CacheOrchestrator::new(config)?);
    let store = FindingsStore::new(cache.clone(), FindingsConfig::default())?;

    let finding = Finding::new("p99 latency doubled after deploy", "performance")
        .with_metadata("service", "gateway");
    let id = finding.id.clone();

    let importance = Importance::from_score(0.95);
    store.store(finding, importance).await?;
    println!("Stored finding {} (ttl {:?})", id, store.ttl_for(importance));

    if let Some(found) = store.get(&id).await {
        println!("Fetched: {}", found.content);
    }

    // First search goes downstream and finds nothing
    let results = store
        .search("memory leak in worker", |query| async move {
            println!("Downstream search for '{}'", query);
            Ok::<_, anyhow::Error>(Vec::new())
        })
        .await?;
    println!("Results: {}", results.len());

    // Second search is answered by the negative marker
    let results = store
        .search("memory leak in worker", |_| async {
            Err::<Vec<Finding>, _>(anyhow::anyhow!("downstream should not be called"))
        })
        .await?;
    println!("Results (cached miss): {}", results.len());

    println!("{}", cache.get_metrics().await);
    let health = cache.get_health().await;
    println!("Health: {} (hit rate {:.2})", health.status, health.details.hit_rate);

    cache.shutdown().await;
    Ok(())
}
