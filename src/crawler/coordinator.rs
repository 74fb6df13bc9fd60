//! Frontier coordinator - main crawl orchestration logic
//!
//! A run moves through three states:
//! - `Running`: claiming batches from the store and dispatching workers
//! - `Draining`: the queue is empty, waiting for in-flight workers
//! - `Stopped`: queue exhausted, page limit reached, or cancelled
//!
//! Each claimed entry is handled by its own task: concurrency permit, scope
//! check, robots check, rate limit wait, fetch, link extraction, and finally
//! the status write. Store failures are fatal and abort the whole run.

use crate::config::{validate_crawl_config, CrawlConfig};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::LinkExtractor;
use crate::crawler::rate_limit::RateLimiter;
use crate::crawler::scope::CrawlScope;
use crate::robots::RobotsChecker;
use crate::state::EntryStatus;
use crate::storage::{CrawlStore, QueueEntry, QueueStats, RunStatus};
use crate::url::{normalize_url_with, politeness_key};
use crate::{FrontierError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No pending entries and nothing in flight
    QueueExhausted,
    /// `max-pages` entries resolved
    PageLimit,
    /// The cancellation token fired
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::QueueExhausted => "queue exhausted",
            Self::PageLimit => "page limit reached",
            Self::Cancelled => "cancelled",
        })
    }
}

/// Scheduler state, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Running,
    Draining,
    Stopped,
}

/// Summary of one `start_run` invocation
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub stop_reason: StopReason,
    /// Pages fetched successfully
    pub fetched: u64,
    /// Entries completed without fetching (robots or scope)
    pub skipped: u64,
    /// Failed attempts, including ones that were requeued
    pub failed: u64,
    /// New entries enqueued from extracted links
    pub discovered: u64,
    /// Store counts when the run stopped
    pub stats: QueueStats,
}

/// What a worker did with its entry
#[derive(Debug, Clone, Copy)]
enum Outcome {
    Fetched { discovered: u64 },
    Skipped,
    Failed { status: EntryStatus },
    /// Cancelled before fetching; the entry stays `in_progress`
    Abandoned,
}

#[derive(Debug, Default)]
struct Counters {
    fetched: u64,
    skipped: u64,
    failed: u64,
    discovered: u64,
    resolved: u64,
}

/// Everything a worker needs, shared across the run
struct RunContext {
    run_id: String,
    config: CrawlConfig,
    store: Arc<dyn CrawlStore>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn LinkExtractor>,
    robots: RobotsChecker,
    limiter: RateLimiter,
    scope: CrawlScope,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

/// The crawl frontier: drives runs against a store and its collaborators
pub struct Frontier {
    store: Arc<dyn CrawlStore>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn LinkExtractor>,
    cancel: CancellationToken,
}

impl Frontier {
    pub fn new(
        store: Arc<dyn CrawlStore>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn LinkExtractor>,
    ) -> Self {
        Self {
            store,
            fetcher,
            extractor,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `token` to stop runs from outside, e.g. on Ctrl-C
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Begins or resumes the run `run_id`
    ///
    /// Seeds are normalized and enqueued at depth 0; seeds already known to
    /// the run are left alone. Entries a crashed process left `in_progress`
    /// are reclaimed first.
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - The run stopped normally or was cancelled
    /// * `Err(FrontierError)` - Invalid config or seeds, or a fatal store error
    pub async fn start_run(
        &self,
        run_id: &str,
        seeds: &[String],
        config: &CrawlConfig,
    ) -> Result<RunReport> {
        validate_crawl_config(config)?;
        let seeds = seeds
            .iter()
            .map(|seed| normalize_url_with(seed, &config.tracking_params))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let fingerprint = config.fingerprint()?;
        let robots = RobotsChecker::new(config)?;
        if !robots.is_enabled() {
            info!("robots.txt checks are disabled for run {}", run_id);
        }

        if let Some(previous) = self.store.get_run(run_id)? {
            info!(
                "Resuming run {} (last status: {})",
                run_id,
                previous.status.to_db_string()
            );
            if previous.config_hash != fingerprint {
                warn!("Crawler configuration changed since run {} started", run_id);
            }
        }
        self.store.begin_run(run_id, &fingerprint)?;

        let reclaimed = self.store.resume(run_id)?;
        if reclaimed > 0 {
            info!("Reclaimed {} entries left in progress", reclaimed);
        }

        let mut new_seeds = 0;
        for seed in &seeds {
            if self.store.enqueue(run_id, seed, 0)? {
                new_seeds += 1;
            }
        }

        let seed_urls = self.store.seed_urls(run_id)?;
        if seed_urls.is_empty() {
            warn!("Run {} has no seeds", run_id);
        }
        info!(
            "Starting {} crawl for run {} ({} seeds, {} new)",
            config.crawl_type,
            run_id,
            seed_urls.len(),
            new_seeds
        );

        let ctx = Arc::new(RunContext {
            run_id: run_id.to_string(),
            config: config.clone(),
            store: Arc::clone(&self.store),
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            robots,
            limiter: RateLimiter::new(config.respect_rate_limits, config.default_crawl_delay()),
            scope: CrawlScope::new(config.crawl_type, &seed_urls),
            permits: Arc::new(Semaphore::new(config.max_parallel as usize)),
            cancel: self.cancel.clone(),
        });

        let mut tasks = JoinSet::new();
        let mut counters = Counters::default();
        let started = Instant::now();

        let result = match drive(&ctx, &mut tasks, &mut counters, started).await {
            Ok(reason) => drain(&ctx, &mut tasks, &mut counters, started)
                .await
                .map(|()| reason),
            Err(e) => Err(e),
        };

        let stop_reason = match result {
            Ok(reason) => reason,
            Err(e) => {
                error!("Run {} aborted: {}", run_id, e);
                tasks.shutdown().await;
                if let Err(finish_err) = self.store.finish_run(run_id, RunStatus::Failed) {
                    error!("Failed to record failure of run {}: {}", run_id, finish_err);
                }
                return Err(e);
            }
        };

        let run_status = match stop_reason {
            StopReason::Cancelled => RunStatus::Interrupted,
            StopReason::QueueExhausted | StopReason::PageLimit => RunStatus::Completed,
        };
        self.store.finish_run(run_id, run_status)?;
        let stats = self.store.stats(run_id)?;

        log_state(RunState::Stopped, run_id);
        info!(
            "Run {} stopped ({}): {} fetched, {} skipped, {} failed attempts, {} discovered in {:?}",
            run_id,
            stop_reason,
            counters.fetched,
            counters.skipped,
            counters.failed,
            counters.discovered,
            started.elapsed()
        );

        Ok(RunReport {
            run_id: run_id.to_string(),
            stop_reason,
            fetched: counters.fetched,
            skipped: counters.skipped,
            failed: counters.failed,
            discovered: counters.discovered,
            stats,
        })
    }
}

fn log_state(state: RunState, run_id: &str) {
    info!("Run {} is now {:?}", run_id, state);
}

/// Claims and dispatches entries until the run should stop
async fn drive(
    ctx: &Arc<RunContext>,
    tasks: &mut JoinSet<Result<Outcome>>,
    counters: &mut Counters,
    started: Instant,
) -> Result<StopReason> {
    let max_pages = u64::from(ctx.config.max_pages);
    let max_parallel = ctx.config.max_parallel as usize;
    let mut state = RunState::Running;
    log_state(state, &ctx.run_id);

    loop {
        if ctx.cancel.is_cancelled() {
            return Ok(StopReason::Cancelled);
        }

        let stats = ctx.store.stats(&ctx.run_id)?;
        if stats.resolved() >= max_pages {
            return Ok(StopReason::PageLimit);
        }

        if tasks.len() < max_parallel {
            let in_flight = tasks.len() as u64;
            let budget = max_pages
                .saturating_sub(stats.resolved())
                .saturating_sub(in_flight);
            let limit = budget.min(u64::from(ctx.config.batch_size)) as u32;

            let batch = if limit > 0 {
                ctx.store.claim_batch(&ctx.run_id, limit)?
            } else {
                Vec::new()
            };

            if !batch.is_empty() {
                if state != RunState::Running {
                    state = RunState::Running;
                    log_state(state, &ctx.run_id);
                }
                debug!("Claimed {} entries", batch.len());
                for entry in batch {
                    tasks.spawn(process_entry(Arc::clone(ctx), entry));
                }
                continue;
            }

            if tasks.is_empty() {
                return Ok(StopReason::QueueExhausted);
            }

            if limit > 0 && state == RunState::Running {
                state = RunState::Draining;
                log_state(state, &ctx.run_id);
            }
        }

        tokio::select! {
            _ = ctx.cancel.cancelled() => return Ok(StopReason::Cancelled),
            joined = tasks.join_next() => {
                if let Some(joined) = joined {
                    absorb(ctx, joined, counters, started)?;
                }
            }
        }
    }
}

/// Lets in-flight workers finish after the loop stopped claiming
async fn drain(
    ctx: &Arc<RunContext>,
    tasks: &mut JoinSet<Result<Outcome>>,
    counters: &mut Counters,
    started: Instant,
) -> Result<()> {
    if !tasks.is_empty() {
        debug!("Waiting for {} in-flight entries", tasks.len());
    }
    while let Some(joined) = tasks.join_next().await {
        absorb(ctx, joined, counters, started)?;
    }
    Ok(())
}

/// Folds a finished worker into the counters; worker errors are fatal
fn absorb(
    ctx: &RunContext,
    joined: std::result::Result<Result<Outcome>, JoinError>,
    counters: &mut Counters,
    started: Instant,
) -> Result<()> {
    let outcome = match joined {
        Ok(result) => result?,
        Err(e) if e.is_cancelled() => return Ok(()),
        Err(e) => return Err(FrontierError::Worker(e.to_string())),
    };

    match outcome {
        Outcome::Fetched { discovered } => {
            counters.fetched += 1;
            counters.discovered += discovered;
            counters.resolved += 1;
        }
        Outcome::Skipped => {
            counters.skipped += 1;
            counters.resolved += 1;
        }
        Outcome::Failed { status } => {
            counters.failed += 1;
            if status.is_terminal() {
                counters.resolved += 1;
            }
        }
        Outcome::Abandoned => return Ok(()),
    }

    if counters.resolved > 0 && counters.resolved % 10 == 0 {
        let stats = ctx.store.stats(&ctx.run_id)?;
        let rate = counters.resolved as f64 / started.elapsed().as_secs_f64().max(f64::EPSILON);
        info!(
            "Progress: {} resolved, {} pending, {} in flight, {:.2} pages/sec",
            counters.resolved, stats.pending, stats.in_progress, rate
        );
    }
    Ok(())
}

/// Handles one claimed entry from permit to status write
async fn process_entry(ctx: Arc<RunContext>, entry: QueueEntry) -> Result<Outcome> {
    let _permit = tokio::select! {
        _ = ctx.cancel.cancelled() => return Ok(Outcome::Abandoned),
        permit = Arc::clone(&ctx.permits).acquire_owned() => {
            permit.map_err(|e| FrontierError::Worker(e.to_string()))?
        }
    };

    if !ctx.scope.admits_entry(&entry.url, entry.depth) {
        debug!("Out of scope, skipping {}", entry.url);
        ctx.store.mark_complete(&ctx.run_id, &entry.url)?;
        return Ok(Outcome::Skipped);
    }

    let url = match Url::parse(&entry.url) {
        Ok(url) => url,
        Err(e) => return fail(&ctx, &entry, &format!("invalid URL: {}", e), 0),
    };
    let domain = politeness_key(&url).unwrap_or_else(|| entry.url.clone());

    // Fail-closed retries ask the server again instead of reusing a cached failure
    let verdict = if entry.retry_count > 0 && !ctx.config.robots_fail_open {
        ctx.robots.recheck(&url, &ctx.config.user_agent).await
    } else {
        ctx.robots.check(&url, &ctx.config.user_agent).await
    };

    match verdict {
        Ok(verdict) if !verdict.allowed => {
            debug!("Disallowed by robots.txt, skipping {}", entry.url);
            ctx.store.mark_complete(&ctx.run_id, &entry.url)?;
            return Ok(Outcome::Skipped);
        }
        Ok(verdict) => {
            if ctx.limiter.set_crawl_delay(&domain, verdict.crawl_delay) {
                debug!("Crawl delay for {} is now {:?}", domain, verdict.crawl_delay);
            }
        }
        Err(FrontierError::RobotsFetch { domain, message }) => {
            if ctx.config.robots_fail_open {
                warn!(
                    "robots.txt unavailable for {} ({}), proceeding without restrictions",
                    domain, message
                );
            } else {
                let reason = format!("robots.txt unavailable: {}", message);
                return fail(&ctx, &entry, &reason, ctx.config.max_retries);
            }
        }
        Err(e) => return fail(&ctx, &entry, &e.to_string(), 0),
    }

    tokio::select! {
        _ = ctx.cancel.cancelled() => return Ok(Outcome::Abandoned),
        delay = ctx.limiter.wait(&domain) => {
            if !delay.is_zero() {
                trace!("Waited {:?} before {}", delay, entry.url);
            }
        }
    }

    debug!("Fetching {} (depth {})", entry.url, entry.depth);
    let page = match ctx
        .fetcher
        .fetch(&entry.url, ctx.config.fetch_timeout())
        .await
    {
        Ok(page) => page,
        Err(e) => return fail(&ctx, &entry, &e.to_string(), ctx.config.max_retries),
    };

    let mut discovered = 0;
    if ctx.scope.follows_links_from(entry.depth) {
        for link in ctx.extractor.extract_links(&page.html, &page.final_url) {
            let normalized = match normalize_url_with(&link, &ctx.config.tracking_params) {
                Ok(normalized) => normalized,
                Err(e) => {
                    trace!("Dropping link {}: {}", link, e);
                    continue;
                }
            };
            if !ctx.scope.admits_link(entry.depth, &normalized) {
                continue;
            }
            if ctx
                .store
                .enqueue(&ctx.run_id, &normalized, entry.depth + 1)?
            {
                discovered += 1;
            }
        }
    }

    ctx.store.mark_complete(&ctx.run_id, &entry.url)?;
    Ok(Outcome::Fetched { discovered })
}

/// Records a failed attempt; only store errors escape
fn fail(ctx: &RunContext, entry: &QueueEntry, reason: &str, max_retries: u32) -> Result<Outcome> {
    let status = ctx
        .store
        .mark_error(&ctx.run_id, &entry.url, reason, max_retries)?;

    if status.is_terminal() {
        warn!(
            "Giving up on {} after {} attempts: {}",
            entry.url,
            entry.retry_count + 1,
            reason
        );
    } else {
        debug!("Attempt {} failed for {}: {}", entry.retry_count + 1, entry.url, reason);
    }
    Ok(Outcome::Failed { status })
}
