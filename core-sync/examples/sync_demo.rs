//! # Theme Sync Demo
//!
//! This example drives the full sync pipeline against an in-memory theme
//! store: rate-limited admission, text/binary classification, per-change
//! settlement, bounded retry of a transient failure, and the batch totals.
//!
//! The burst capacity is lowered to 4 so the throttle becomes visible with
//! a handful of changes; positions past the burst wait out their leak-rate
//! slot before dispatching.
//!
//! Run with: `cargo run --example sync_demo --package core-sync`

use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::{
    AssetKey, AssetReceipt, BridgeError, RemoteAsset, StoreError, StoreResult, ThemeStore,
    ThemeTarget,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventSeverity, EventStream};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_sync::{ChangeEvent, RetryPolicy, SettledChange, SyncQueue};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// In-Memory Theme Store (for demonstration)
// ============================================================================

/// Store that keeps "uploaded" assets in a map and plays back the remote
/// API's interesting behaviors: a little latency per call, one key that
/// fails transiently once before succeeding, and one key the backend always
/// rejects as invalid.
struct InMemoryThemeStore {
    assets: Mutex<BTreeMap<String, String>>,
    transient_failures: Mutex<u32>,
}

impl InMemoryThemeStore {
    fn new() -> Self {
        // Seed one asset so the removal below has something to remove.
        let mut assets = BTreeMap::new();
        assets.insert("snippets/promo-banner.liquid".to_string(), "text, 64 B".to_string());

        Self {
            assets: Mutex::new(assets),
            transient_failures: Mutex::new(1),
        }
    }

    fn respond(&self, key: &AssetKey) -> StoreResult<()> {
        if key.as_str() == "layout/checkout.liquid" {
            return Err(StoreError::InvalidRequest {
                detail: "this theme does not support checkout layouts".to_string(),
            });
        }

        if key.as_str() == "assets/app.js" {
            let mut remaining = self.transient_failures.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Remote {
                    status: 500,
                    message: "temporary backend hiccup".to_string(),
                });
            }
        }

        Ok(())
    }

    fn asset_count(&self) -> usize {
        self.assets.lock().unwrap().len()
    }

    fn describe(&self) -> Vec<String> {
        self.assets
            .lock()
            .unwrap()
            .iter()
            .map(|(key, detail)| format!("{} ({})", key, detail))
            .collect()
    }
}

#[async_trait::async_trait]
impl ThemeStore for InMemoryThemeStore {
    async fn update_asset(
        &self,
        _target: &ThemeTarget,
        asset: &RemoteAsset,
    ) -> StoreResult<AssetReceipt> {
        // A touch of latency so settlements visibly interleave.
        tokio::time::sleep(Duration::from_millis(40)).await;
        self.respond(&asset.key)?;

        self.assets.lock().unwrap().insert(
            asset.key.to_string(),
            format!("{}, {} B", asset.content.kind_str(), asset.content.len()),
        );
        Ok(AssetReceipt::new(asset.key.clone()))
    }

    async fn delete_asset(&self, _target: &ThemeTarget, key: &AssetKey) -> StoreResult<()> {
        tokio::time::sleep(Duration::from_millis(40)).await;
        self.respond(key)?;
        self.assets.lock().unwrap().remove(key.as_str());
        Ok(())
    }
}

/// The in-memory store above replaces the HTTP layer entirely; the config
/// still wants a client, so hand it one that never gets called.
struct NullHttpClient;

#[async_trait::async_trait]
impl HttpClient for NullHttpClient {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, BridgeError> {
        Ok(HttpResponse {
            status: 200,
            headers: Default::default(),
            body: Default::default(),
        })
    }
}

// ============================================================================
// Demo Flow
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))?;

    println!("🚀 Theme sync demo\n");

    let store = Arc::new(InMemoryThemeStore::new());
    println!("🗂️  Remote theme starts with {} asset(s)", store.asset_count());

    let config = CoreConfig::builder()
        .api_key("demo-key")
        .password("demo-password")
        .host("demo-store.myshopify.com")
        .theme_id("148460")
        .base_path("/tmp/demo-store/theme")
        .burst_capacity(4)
        .http_client(Arc::new(NullHttpClient))
        .build()?;

    // Two attempts per change, so the flaky app.js recovers on its retry.
    let retry = RetryPolicy::new(2).with_base_delay(Duration::from_millis(200));
    let (queue, mut settled) = SyncQueue::with_retry_policy(config, store.clone(), retry)?;

    // Watch only the wrinkles: retries, rejections, and failures pass the
    // severity filter, routine progress is consumed and dropped.
    let mut alerts = EventStream::new(queue.event_bus().subscribe())
        .filter(|event| event.severity() >= EventSeverity::Warning);
    let watcher = tokio::spawn(async move {
        while let Ok(event) = alerts.recv().await {
            println!("   ⚠️  {}", event.description());
        }
    });

    // Settlements arrive as each change's own call finishes, not in
    // admission order; consume them concurrently with dispatch.
    let consumer = tokio::spawn(async move {
        let mut outcomes: Vec<SettledChange> = Vec::new();
        while let Some(change) = settled.recv().await {
            let mark = if change.is_success() { "✅" } else { "❌" };
            println!(
                "   {} position {} settled: {} -> {:?}",
                mark, change.position, change.key, change.outcome
            );
            outcomes.push(change);
        }
        outcomes
    });

    println!("\n📦 Enqueueing changes (burst capacity 4, leak rate 2/s)...");
    let changes = vec![
        ChangeEvent::upsert("assets/site.css", "body { color: #222; }"),
        ChangeEvent::upsert("assets/logo.png", vec![0x89, 0x50, 0x4E, 0x47, 0xFF, 0xFE]),
        ChangeEvent::upsert("assets/app.js", "console.log('hi');"),
        ChangeEvent::upsert("layout/checkout.liquid", "{{ content_for_layout }}"),
        ChangeEvent::delete("snippets/promo-banner.liquid"),
        ChangeEvent::upsert("templates/product.liquid", "{% section 'product' %}"),
        ChangeEvent::streamed("assets/huge-video.mp4"),
    ];

    for change in changes {
        let path = change.path_display();
        match queue.enqueue(change).await {
            Ok(slot) => println!(
                "   admitted {} at position {} (delay {} ms)",
                path,
                slot.sequence_position,
                slot.scheduled_delay.as_millis()
            ),
            Err(err) => println!("   refused  {}: {}", path, err),
        }
    }

    println!("\n⏳ Waiting for every dispatch to settle...");
    queue.drain().await;

    let stats = queue.stats();
    println!("\n📊 Batch totals");
    println!("   uploaded:  {}", stats.uploaded);
    println!("   removed:   {}", stats.removed);
    println!("   rejected:  {}", stats.rejected);
    println!("   failed:    {}", stats.failed);
    println!("   cancelled: {}", stats.cancelled);
    println!("   elapsed:   {:.2}s", stats.elapsed.as_secs_f64());

    // Dropping the queue closes the settled channel and the event bus,
    // ending both background tasks.
    drop(queue);
    let outcomes = consumer.await?;
    watcher.await?;
    println!("\n🗂️  Remote theme now holds {} asset(s):", store.asset_count());
    for line in store.describe() {
        println!("   {}", line);
    }

    let successes = outcomes.iter().filter(|s| s.is_success()).count();
    println!(
        "\n🎉 Demo complete: {}/{} settled changes succeeded",
        successes,
        outcomes.len()
    );

    Ok(())
}
