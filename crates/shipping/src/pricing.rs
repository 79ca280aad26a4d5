//! Cached, hot-reloadable carrier pricing.
//!
//! The parsed document is held as an immutable [`PricingSnapshot`] behind an
//! `Arc`. A reload builds a complete new snapshot and swaps the reference in
//! one step, so readers see either the old table or the new one.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::PricingError;
use crate::profile::{CarrierDocument, CarrierProfile, FreeShipping};

/// Default lifetime of a cached snapshot.
pub const DEFAULT_PRICING_TTL: Duration = Duration::from_secs(60);

const BUNDLED_DOCUMENT: &str = include_str!("../config/carriers.default.json");

static BUNDLED: LazyLock<CarrierDocument> = LazyLock::new(|| {
    CarrierDocument::from_json(BUNDLED_DOCUMENT).expect("bundled carrier document must be valid")
});

/// The carrier document compiled into the binary.
pub fn bundled_default() -> CarrierDocument {
    BUNDLED.clone()
}

/// Where carrier pricing comes from.
#[async_trait]
pub trait PricingSource: Send + Sync {
    /// Fetches the current document.
    async fn load(&self) -> Result<CarrierDocument, PricingError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Reads a JSON document from disk on every load.
#[derive(Debug, Clone)]
pub struct FilePricingSource {
    path: PathBuf,
}

impl FilePricingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PricingSource for FilePricingSource {
    async fn load(&self) -> Result<CarrierDocument, PricingError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        CarrierDocument::from_json(&raw)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Always serves the bundled document.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledPricingSource;

#[async_trait]
impl PricingSource for BundledPricingSource {
    async fn load(&self) -> Result<CarrierDocument, PricingError> {
        Ok(bundled_default())
    }

    fn describe(&self) -> String {
        "bundled".to_string()
    }
}

#[derive(Debug, Default)]
struct InMemorySourceState {
    document: Option<CarrierDocument>,
    loads: u64,
}

/// Mutable in-memory source for tests and embedding.
///
/// An empty source behaves like an unreachable configuration store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPricingSource {
    state: Arc<RwLock<InMemorySourceState>>,
}

impl InMemoryPricingSource {
    pub fn new(document: CarrierDocument) -> Self {
        let source = Self::default();
        source.set(document);
        source
    }

    /// Replaces the served document.
    pub fn set(&self, document: CarrierDocument) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).document = Some(document);
    }

    /// Makes subsequent loads fail.
    pub fn set_unavailable(&self) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).document = None;
    }

    /// Number of load calls served so far.
    pub fn load_count(&self) -> u64 {
        self.state.read().unwrap_or_else(|e| e.into_inner()).loads
    }
}

#[async_trait]
impl PricingSource for InMemoryPricingSource {
    async fn load(&self) -> Result<CarrierDocument, PricingError> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.loads += 1;
        let document = state
            .document
            .clone()
            .ok_or_else(|| PricingError::Unavailable("in-memory source is empty".to_string()))?;
        document.validate()?;
        Ok(document)
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

/// Where a snapshot's document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingOrigin {
    Source,
    BundledDefault,
}

/// One immutable generation of the pricing table.
#[derive(Debug, Clone, Serialize)]
pub struct PricingSnapshot {
    pub version: u64,
    pub origin: PricingOrigin,
    pub loaded_at: DateTime<Utc>,
    pub document: CarrierDocument,
}

impl PricingSnapshot {
    pub fn carriers(&self) -> &[CarrierProfile] {
        &self.document.carriers
    }

    pub fn markup_percent(&self) -> u32 {
        self.document.markup_percent
    }

    pub fn free_shipping(&self) -> FreeShipping {
        self.document.free_shipping
    }
}

struct CachedSnapshot {
    snapshot: Arc<PricingSnapshot>,
    fetched_at: Instant,
}

#[derive(Default)]
struct CacheState {
    current: Option<CachedSnapshot>,
    /// Highest version handed out when the cache was last invalidated.
    /// Loads at or below it started before the invalidation and are never
    /// installed.
    floor: u64,
}

/// Process-wide carrier pricing with a bounded-TTL cache.
///
/// Never fails: when the source is unreachable or serves an invalid
/// document, the bundled default is used until the next reload.
pub struct CarrierPricingTable {
    source: Arc<dyn PricingSource>,
    ttl: Duration,
    cache: RwLock<CacheState>,
    generation: AtomicU64,
}

impl CarrierPricingTable {
    pub fn new(source: Arc<dyn PricingSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: RwLock::new(CacheState::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// A table serving only the bundled document.
    pub fn bundled() -> Self {
        Self::new(Arc::new(BundledPricingSource), DEFAULT_PRICING_TTL)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current snapshot, reloading from the source if the cache is stale.
    ///
    /// The source is read without holding any lock, so concurrent callers on
    /// a stale cache may each fetch once. Only the newest load is installed:
    /// a load that started before an [`invalidate`](Self::invalidate), or
    /// before the load already cached, gives way to the newer snapshot.
    pub async fn snapshot(&self) -> Arc<PricingSnapshot> {
        if let Some(snapshot) = self.fresh_cached() {
            return snapshot;
        }

        let loaded = Arc::new(self.load().await);
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        if let Some(newer) = cache
            .current
            .as_ref()
            .filter(|cached| cached.snapshot.version > loaded.version)
        {
            return Arc::clone(&newer.snapshot);
        }
        if loaded.version <= cache.floor {
            tracing::debug!(
                version = loaded.version,
                floor = cache.floor,
                "discarding pricing load that predates invalidation"
            );
            return loaded;
        }

        cache.current = Some(CachedSnapshot {
            snapshot: Arc::clone(&loaded),
            fetched_at: Instant::now(),
        });
        loaded
    }

    /// Carrier profiles of the current snapshot, in declaration order.
    pub async fn profiles(&self) -> Vec<CarrierProfile> {
        self.snapshot().await.carriers().to_vec()
    }

    /// Forces the next read to bypass the cache.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.current = None;
        cache.floor = self.generation.load(Ordering::SeqCst);
        tracing::info!(
            source = %self.source.describe(),
            floor = cache.floor,
            "pricing cache invalidated"
        );
    }

    /// Drops the cached snapshot and loads a fresh one.
    pub async fn reload(&self) -> Arc<PricingSnapshot> {
        self.invalidate();
        self.snapshot().await
    }

    fn fresh_cached(&self) -> Option<Arc<PricingSnapshot>> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache
            .current
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| Arc::clone(&cached.snapshot))
    }

    async fn load(&self) -> PricingSnapshot {
        let version = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (document, origin) = match self.source.load().await {
            Ok(document) => {
                metrics::counter!("pricing_reloads_total").increment(1);
                tracing::info!(
                    source = %self.source.describe(),
                    version,
                    carriers = document.carriers.len(),
                    "carrier pricing loaded"
                );
                (document, PricingOrigin::Source)
            }
            Err(e) => {
                metrics::counter!("pricing_fallbacks_total").increment(1);
                tracing::warn!(
                    source = %self.source.describe(),
                    error = %e,
                    version,
                    "carrier pricing unavailable, using bundled default"
                );
                (bundled_default(), PricingOrigin::BundledDefault)
            }
        };

        PricingSnapshot {
            version,
            origin,
            loaded_at: Utc::now(),
            document,
        }
    }
}
