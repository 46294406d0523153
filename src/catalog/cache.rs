//! The shared, refreshable fund catalog.
//!
//! A [`CatalogGeneration`] bundles a snapshot with the index and lookup table
//! built from it. The cache publishes generations through an atomic pointer
//! swap, so readers never lock and always see a complete generation.
//!
//! Refreshes are single-flight and run on their own task, so a refresh that
//! has started publishes its result even if the caller that started it goes
//! away.
//!
//! - With a stale generation present, the first caller to notice refreshes;
//!   anyone arriving while that refresh runs is served the stale generation
//!   immediately. A failed refresh keeps the stale generation and leaves its
//!   fetch time untouched, so the next caller tries again.
//! - With nothing cached, callers queue behind the refresh lock and share the
//!   outcome of the attempt in flight when they arrived: its generation if it
//!   succeeded, its error if it failed. A caller only fetches when no attempt
//!   finished while it waited.

use super::index::{CodeLookupTable, IndexStats, InvertedIndex, build_index};
use super::scanner::{self, Keyword};
use super::snapshot::CatalogSnapshot;
use crate::core::config::CatalogConfig;
use crate::core::query::{MIN_KEYWORD_CHARS, is_searchable_keyword};
use crate::core::{CatalogError, CatalogSource, FundRecord, RawFundRow};
use anyhow::{Context, anyhow, bail};
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

/// One refresh cycle's immutable catalog, index and lookup table.
#[derive(Debug)]
pub struct CatalogGeneration {
    snapshot: CatalogSnapshot,
    index: InvertedIndex,
    lookup: CodeLookupTable,
    stats: IndexStats,
    fetched_at: Instant,
    fetched_at_utc: DateTime<Utc>,
}

impl CatalogGeneration {
    /// Validates `rows` and indexes the result. CPU bound.
    pub fn build(rows: Vec<RawFundRow>, fetched_at: Instant, fetched_at_utc: DateTime<Utc>) -> Self {
        let snapshot = CatalogSnapshot::ingest(rows);
        let (index, lookup, stats) = build_index(&snapshot);
        CatalogGeneration {
            snapshot,
            index,
            lookup,
            stats,
            fetched_at,
            fetched_at_utc,
        }
    }

    pub fn snapshot(&self) -> &CatalogSnapshot {
        &self.snapshot
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }

    pub fn lookup(&self, code: &str) -> Option<&FundRecord> {
        let code = code.trim();
        self.lookup
            .get(code)
            .and_then(|slot| self.snapshot.get(slot))
            .or_else(|| scanner::find_code(self.snapshot.records(), code))
    }

    /// Index-backed search, topped up by a linear scan when the index yields
    /// fewer than `limit` records. Exact code and direct token hits come first.
    pub fn search(&self, keyword: &str, limit: usize) -> Vec<FundRecord> {
        let keyword = Keyword::new(keyword);
        if keyword.char_count() < MIN_KEYWORD_CHARS {
            return Vec::new();
        }
        let limit = limit.max(1);

        let mut candidates = Candidates::default();
        if keyword.is_numeric()
            && let Some(slot) = self.lookup.get(&keyword.raw)
        {
            candidates.extend(&[slot as u32]);
        }
        if let Some(slots) = self.index.get(&keyword.lower) {
            candidates.extend(slots);
        }
        if let Some(slots) = self.index.get(&keyword.upper) {
            candidates.extend(slots);
        }
        if keyword.char_count() > MIN_KEYWORD_CHARS {
            let budget = limit.saturating_mul(2);
            for slots in self.index.tokens_containing(&keyword.lower, &keyword.upper) {
                if candidates.len() >= budget {
                    break;
                }
                candidates.extend(slots);
            }
        }

        let mut results: Vec<&FundRecord> = candidates
            .slots
            .iter()
            .filter_map(|&slot| self.snapshot.get(slot as usize))
            .take(limit)
            .collect();

        if results.len() < limit {
            let collected: HashSet<&str> = results.iter().map(|r| r.code.as_str()).collect();
            let extra = scanner::scan(
                self.snapshot.records(),
                &keyword,
                limit - results.len(),
                |record| collected.contains(record.code.as_str()),
            );
            if !extra.is_empty() {
                debug!(
                    keyword = %keyword.raw,
                    indexed = results.len(),
                    scanned = extra.len(),
                    "Supplemented index results with linear scan"
                );
            }
            results.extend(extra);
        }

        results.into_iter().cloned().collect()
    }
}

#[derive(Default)]
struct Candidates {
    slots: Vec<u32>,
    seen: HashSet<u32>,
}

impl Candidates {
    fn extend(&mut self, slots: &[u32]) {
        for &slot in slots {
            if self.seen.insert(slot) {
                self.slots.push(slot);
            }
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

#[derive(Debug, Clone)]
pub struct CatalogStatus {
    pub records: usize,
    pub tokens: usize,
    pub skipped: usize,
    pub fetched_at: DateTime<Utc>,
    pub age: Duration,
}

/// State shared with refresh tasks.
struct Shared {
    source: Arc<dyn CatalogSource>,
    fetch_timeout: Duration,
    current: ArcSwapOption<CatalogGeneration>,
    /// Finished refresh attempts, successful or not.
    attempts: AtomicU64,
}

impl Shared {
    /// Fetches and builds a new generation and publishes it. Callers must
    /// hold the refresh lock.
    #[instrument(skip(self))]
    async fn refresh(&self) -> anyhow::Result<Arc<CatalogGeneration>> {
        info!("Refreshing fund catalog");
        let fetched_at = Instant::now();
        let fetched_at_utc = Utc::now();

        let rows = tokio::time::timeout(self.fetch_timeout, self.source.fetch_catalog())
            .await
            .map_err(|_| {
                anyhow!(
                    "catalog fetch timed out after {}s",
                    self.fetch_timeout.as_secs_f64()
                )
            })??;
        debug!(rows = rows.len(), elapsed_ms = fetched_at.elapsed().as_millis() as u64, "Fetched catalog rows");

        let generation = tokio::task::spawn_blocking(move || {
            CatalogGeneration::build(rows, fetched_at, fetched_at_utc)
        })
        .await
        .context("Index build aborted")?;

        if generation.snapshot.is_empty() {
            bail!(
                "catalog source returned no usable records ({} skipped)",
                generation.snapshot.skipped()
            );
        }

        let generation = Arc::new(generation);
        self.current.store(Some(Arc::clone(&generation)));
        info!(
            records = generation.stats.records,
            skipped = generation.snapshot.skipped(),
            "Fund catalog updated"
        );
        Ok(generation)
    }
}

/// Held behind the refresh lock.
#[derive(Default)]
struct RefreshState {
    last_error: Option<String>,
}

pub struct CatalogCache {
    shared: Arc<Shared>,
    ttl: Duration,
    refresh_lock: Arc<Mutex<RefreshState>>,
}

impl CatalogCache {
    pub fn new(source: Arc<dyn CatalogSource>, ttl: Duration, fetch_timeout: Duration) -> Self {
        CatalogCache {
            shared: Arc::new(Shared {
                source,
                fetch_timeout,
                current: ArcSwapOption::empty(),
                attempts: AtomicU64::new(0),
            }),
            ttl,
            refresh_lock: Arc::new(Mutex::new(RefreshState::default())),
        }
    }

    pub fn from_config(source: Arc<dyn CatalogSource>, config: &CatalogConfig) -> Self {
        Self::new(source, config.ttl(), config.fetch_timeout())
    }

    /// Returns a generation no older than the TTL when possible, refreshing
    /// from the source if needed. Fails only when nothing has ever been
    /// fetched successfully.
    pub async fn ensure_fresh(&self) -> Result<Arc<CatalogGeneration>, CatalogError> {
        match self.shared.current.load_full() {
            Some(current) if !current.is_expired(self.ttl) => Ok(current),
            Some(stale) => Ok(self.refresh_stale(stale).await),
            None => self.refresh_empty().await,
        }
    }

    /// Exact lookup by fund code.
    pub async fn lookup(&self, code: &str) -> Result<Option<FundRecord>, CatalogError> {
        let generation = self.ensure_fresh().await?;
        Ok(generation.lookup(code).cloned())
    }

    /// At most `limit` records matching `keyword` by code, name or phonetic
    /// abbreviation. Keywords shorter than two characters match nothing.
    pub async fn search(&self, keyword: &str, limit: usize) -> Result<Vec<FundRecord>, CatalogError> {
        if !is_searchable_keyword(keyword) {
            return Ok(Vec::new());
        }
        let generation = self.ensure_fresh().await?;
        Ok(generation.search(keyword, limit))
    }

    /// Describes the published generation without refreshing it.
    pub fn status(&self) -> Option<CatalogStatus> {
        self.shared.current.load_full().map(|generation| CatalogStatus {
            records: generation.stats.records,
            tokens: generation.stats.tokens,
            skipped: generation.snapshot.skipped(),
            fetched_at: generation.fetched_at_utc,
            age: generation.age(),
        })
    }

    async fn refresh_stale(&self, stale: Arc<CatalogGeneration>) -> Arc<CatalogGeneration> {
        let Ok(guard) = Arc::clone(&self.refresh_lock).try_lock_owned() else {
            debug!("Catalog refresh already in flight, serving stale catalog");
            return stale;
        };
        if let Some(latest) = self.shared.current.load_full()
            && !latest.is_expired(self.ttl)
        {
            return latest;
        }

        match self.spawn_refresh(guard).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(
                    error = %e,
                    age_secs = stale.age().as_secs(),
                    "Catalog refresh failed, serving stale catalog"
                );
                stale
            }
        }
    }

    async fn refresh_empty(&self) -> Result<Arc<CatalogGeneration>, CatalogError> {
        let seen_attempts = self.shared.attempts.load(Ordering::Acquire);
        let guard = Arc::clone(&self.refresh_lock).lock_owned().await;
        if let Some(current) = self.shared.current.load_full() {
            debug!("Catalog published while waiting for refresh lock");
            return Ok(current);
        }
        if self.shared.attempts.load(Ordering::Acquire) != seen_attempts {
            debug!("Catalog refresh failed while waiting for refresh lock");
            let reason = guard
                .last_error
                .clone()
                .unwrap_or_else(|| "catalog refresh failed".to_string());
            return Err(CatalogError::SourceUnavailable(anyhow!(reason)));
        }
        self.spawn_refresh(guard).await
    }

    /// Runs one refresh attempt on its own task, which keeps `guard` until
    /// the attempt is recorded.
    async fn spawn_refresh(
        &self,
        mut guard: OwnedMutexGuard<RefreshState>,
    ) -> Result<Arc<CatalogGeneration>, CatalogError> {
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            let outcome = shared.refresh().await;
            guard.last_error = outcome.as_ref().err().map(|e| format!("{e:#}"));
            shared.attempts.fetch_add(1, Ordering::Release);
            drop(guard);
            outcome.map_err(CatalogError::SourceUnavailable)
        });
        task.await.map_err(|e| {
            CatalogError::SourceUnavailable(anyhow::Error::new(e).context("Catalog refresh task failed"))
        })?
    }
}
