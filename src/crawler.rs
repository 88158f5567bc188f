use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::{future::join_all, FutureExt};
use url::Url;

use crate::config::CrawlerConfig;
use crate::extract::{AnchorExtractor, ExtractError, LinkExtractor};
use crate::fetch::{FetchError, Fetcher, HttpFetcher};
use crate::frontier::Frontier;
use crate::gate::Gate;
use crate::limiter::RateLimiter;
use crate::scope::{ScopeFilter, UrlScope};

/// What a finished crawl looked like.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Every address ever recorded, crawled or not: seeds, admitted
    /// discoveries, and in-scope discoveries that arrived over budget.
    pub found: HashSet<Url>,
    /// Addresses whose pipeline ran to completion.
    pub crawled: HashSet<Url>,
    /// Budget units consumed, i.e. addresses that entered the frontier.
    pub admitted: usize,
    /// Addresses whose fetch or extraction failed. They consume budget
    /// and are never retried.
    pub failed: usize,
    pub elapsed: Duration,
    /// True when ctrl-c cut the run short.
    pub interrupted: bool,
}

impl CrawlReport {
    /// Discovered addresses in lexical order, for stable output.
    pub fn sorted_found(&self) -> Vec<&Url> {
        let mut found: Vec<&Url> = self.found.iter().collect();
        found.sort_by_key(|url| url.as_str());
        found
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Crawled: {} URLs", self.crawled.len())?;
        writeln!(f, "Found: {} URLs", self.found.len())?;
        write!(f, "Done in {:.2}s", self.elapsed.as_secs_f64())
    }
}

/// Link-following crawler: a frontier drained by a fixed pool of
/// workers, gated by a shared seen-set and a global admission budget.
///
/// The fetch, extraction and scope stages are pluggable; defaults are an
/// HTTP fetcher, an `<a href>` extractor and an unrestricted scope.
pub struct Crawler {
    conf: CrawlerConfig,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    scope: Arc<dyn ScopeFilter>,
}

impl Crawler {
    /// Builds a crawler with the default stages. Fails when the
    /// configuration doesn't hold up.
    pub fn new(conf: CrawlerConfig) -> Result<Self> {
        conf.validate()?;
        let fetcher = HttpFetcher::new(conf.user_agent.clone(), conf.request_timeout());
        Ok(Self {
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(AnchorExtractor),
            scope: Arc::new(UrlScope::default()),
            conf,
        })
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_scope(mut self, scope: Arc<dyn ScopeFilter>) -> Self {
        self.scope = scope;
        self
    }

    /// Crawls from `seeds` until the frontier drains, the budget cuts
    /// discovery short, or ctrl-c interrupts the run. Seeds are admitted
    /// as given, without going through the scope filter.
    pub async fn run<I, S>(&self, seeds: I) -> Result<CrawlReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let seeds = seeds
            .into_iter()
            .map(|s| {
                Url::parse(s.as_ref()).with_context(|| format!("invalid seed URL {:?}", s.as_ref()))
            })
            .collect::<Result<Vec<_>>>()?;

        let started = Instant::now();

        // Shared crawl state
        let frontier = Arc::new(Frontier::new());
        let gate = Arc::new(Gate::new(self.conf.limit, Arc::clone(&frontier)));
        let done = Arc::new(Mutex::new(HashSet::new()));
        let failed = Arc::new(AtomicUsize::new(0));

        let seeded = gate.admit(seeds);
        log::info!(
            "crawl starting: {} seed(s), budget {}, {} worker(s)",
            seeded.len(),
            self.conf.limit,
            self.conf.num_workers
        );

        // Workers
        let ctx = Arc::new(WorkerCtx {
            frontier: Arc::clone(&frontier),
            gate: Arc::clone(&gate),
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            scope: Arc::clone(&self.scope),
            limiter: RateLimiter::new(self.conf.throttle),
            done: Arc::clone(&done),
            failed: Arc::clone(&failed),
        });
        let workers: Vec<_> = (0..self.conf.num_workers)
            .map(|id| tokio::spawn(worker_loop(id, Arc::clone(&ctx))))
            .collect();

        // Drain, unless interrupted first
        let interrupted = if self.conf.handle_sigint {
            tokio::select! {
                _ = frontier.await_drained() => false,
                _ = tokio::signal::ctrl_c() => {
                    log::warn!("interrupted, stopping the crawl");
                    true
                }
            }
        } else {
            frontier.await_drained().await;
            false
        };

        frontier.close();
        for worker in join_all(workers).await {
            worker.context("crawl worker panicked")?;
        }

        let report = CrawlReport {
            found: gate.seen(),
            crawled: std::mem::take(&mut *done.lock().unwrap()),
            admitted: gate.admitted(),
            failed: failed.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
            interrupted,
        };
        log::info!(
            "crawl {}: {} crawled, {} found, {} failed in {:.2}s",
            if interrupted { "interrupted" } else { "finished" },
            report.crawled.len(),
            report.found.len(),
            report.failed,
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }
}

struct WorkerCtx {
    frontier: Arc<Frontier>,
    gate: Arc<Gate>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    scope: Arc<dyn ScopeFilter>,
    limiter: RateLimiter,
    done: Arc<Mutex<HashSet<Url>>>,
    failed: Arc<AtomicUsize>,
}

/// Pipeline failures are contained: they fail one address, not the run.
#[derive(Debug, thiserror::Error)]
enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

async fn worker_loop(id: usize, ctx: Arc<WorkerCtx>) {
    while let Some(url) = ctx.frontier.take().await {
        // Panics in a stage are contained like stage errors; the worker
        // keeps draining.
        match AssertUnwindSafe(process_one(&ctx, &url)).catch_unwind().await {
            Ok(Ok(())) => (),
            Ok(Err(e)) => {
                ctx.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("worker {id}: skipping {url}: {e}");
            }
            Err(_) => {
                ctx.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("worker {id}: skipping {url}: pipeline panicked");
            }
        }
        // Exactly once per taken address, success or not.
        ctx.frontier.mark_done();
    }
    log::debug!("worker {id}: stopped");
}

async fn process_one(ctx: &WorkerCtx, url: &Url) -> Result<(), PipelineError> {
    ctx.limiter.throttle().await;

    let page = ctx.fetcher.fetch(url).await?;
    // Resolve against the served address: redirects move the base.
    let candidates = ctx.extractor.extract(&page.url, &page.body)?;
    let links: Vec<Url> = candidates
        .iter()
        .filter_map(|candidate| ctx.scope.filter(&page.url, candidate))
        .collect();

    let accepted = ctx.gate.admit(links);
    if !accepted.is_empty() {
        log::debug!("{url}: queued {} new address(es)", accepted.len());
    }

    ctx.done.lock().unwrap().insert(url.clone());
    Ok(())
}
