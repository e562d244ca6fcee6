//! Worker pool orchestration
//!
//! One orchestrator runs per process. It opens the shared link graph and
//! queue databases, registers (or rejoins) the scan, seeds the page queue on
//! the very first run, and drives a pool of consumers for the role the
//! process was started with. Any number of page and link processes may run
//! against the same scan concurrently; all coordination goes through the
//! queues and the store.

use crate::config::Config;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::worker::{consume_loop, WorkerContext};
use crate::crawler::Role;
use crate::queue::{queue_name, QueueKind, SqliteQueue, WorkQueue};
use crate::scope::{ScanScope, ScopePolicy};
use crate::storage::{LinkGraphStore, SqliteStore};
use crate::Result;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// How often the orchestrator logs scan progress.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// Per-process orchestrator for one scan role
pub struct Orchestrator {
    ctx: WorkerContext,
    role: Role,
    workers: usize,
}

impl Orchestrator {
    /// Builds an orchestrator from configuration
    ///
    /// Registers the scan in the link graph database if this is the first
    /// process to run it; later processes rejoin the existing record. The
    /// scope patterns stored on the scan record are authoritative, so every
    /// process of a scan applies the same scope even if local config files
    /// have drifted.
    ///
    /// # Arguments
    ///
    /// * `config` - The loaded configuration
    /// * `config_hash` - Hash of the configuration file
    /// * `scan_name` - The scan this process participates in
    /// * `role` - Which queue this process consumes
    /// * `workers` - Number of concurrent consumers to run
    pub fn new(
        config: &Config,
        config_hash: &str,
        scan_name: &str,
        role: Role,
        workers: usize,
    ) -> Result<Self> {
        let mut store = SqliteStore::new(Path::new(&config.output.database_path))?;

        let scan = match store.get_scan(scan_name)? {
            Some(scan) => {
                if scan.config_hash != config_hash {
                    tracing::warn!(
                        "Configuration changed since scan '{}' was created; stored scope patterns still apply",
                        scan_name
                    );
                }
                tracing::info!("Rejoining scan '{}' (id {})", scan_name, scan.scan_id);
                scan
            }
            None => {
                tracing::info!("Registering new scan '{}'", scan_name);
                store.create_scan(
                    scan_name,
                    config.scan.description.as_deref(),
                    &config.scan.seed_url,
                    &config.scan.host_pattern,
                    &config.scan.path_pattern,
                    config_hash,
                )?
            }
        };

        let scope = ScanScope::new(&scan.host_pattern, &scan.path_pattern)?;
        let policy = ScopePolicy::from_config(&config.blacklist, &config.invalid_tokens)?;

        let queue_db = Path::new(&config.queue.database_path);
        let page_queue = SqliteQueue::open(
            queue_db,
            &queue_name(scan_name, QueueKind::Page),
            config.queue.lease_timeout_secs,
        )?;
        let link_queue = SqliteQueue::open(
            queue_db,
            &queue_name(scan_name, QueueKind::Link),
            config.queue.lease_timeout_secs,
        )?;

        let client = build_http_client(&config.http)?;

        let ctx = WorkerContext {
            scan,
            scope,
            policy,
            store: Arc::new(Mutex::new(store)),
            page_queue: Arc::new(page_queue),
            link_queue: Arc::new(link_queue),
            client,
            allowed_content_types: config.http.allowed_content_types.clone(),
        };

        Ok(Self { ctx, role, workers })
    }

    /// Seeds the page queue with the scan's seed URL on first run
    ///
    /// A scan that already has URLs in its graph, or messages in its page
    /// queue, is a resumed scan and is not reseeded. The queue check counts
    /// leased messages too: a seed that a sibling process has leased but not
    /// yet processed leaves no trace in the graph, and must not be seeded
    /// again.
    fn seed_if_needed(&self) -> Result<bool> {
        let known_urls = {
            let store = self.ctx.store.lock().unwrap();
            store.count_urls(self.ctx.scan.scan_id)?
        };

        if known_urls > 0 || self.ctx.page_queue.total()? > 0 {
            return Ok(false);
        }

        self.ctx
            .page_queue
            .push(self.ctx.scan.seed_url.as_bytes())?;
        tracing::info!("Seeded page queue with {}", self.ctx.scan.seed_url);
        Ok(true)
    }

    /// Runs the worker pool until interrupted
    ///
    /// Workers drain their queue continuously; an idle queue means waiting,
    /// not exiting, because the sibling role may still be producing. The
    /// pool shuts down cleanly on ctrl-c: in-flight messages finish, unacked
    /// leases are left to expire and be redelivered.
    pub async fn run(&self) -> Result<()> {
        if self.role == Role::Page {
            self.seed_if_needed()?;
        }

        tracing::info!(
            "Starting {} {} worker(s) for scan '{}'",
            self.workers,
            self.role,
            self.ctx.scan.name
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let kind = self.role.queue_kind();

        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let ctx = self.ctx.clone();
            let rx = shutdown_rx.clone();
            handles.push(tokio::spawn(async move {
                if let Err(e) = consume_loop(ctx, kind, rx).await {
                    tracing::error!("Worker {} aborted: {}", worker_id, e);
                }
            }));
        }

        let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    self.log_progress();
                }
            }
        }

        let _ = shutdown_tx.send(true);
        for handle in handles {
            let _ = handle.await;
        }

        self.log_progress();
        Ok(())
    }

    fn log_progress(&self) {
        let (urls, crawled, backlinks) = {
            let store = self.ctx.store.lock().unwrap();
            (
                store.count_urls(self.ctx.scan.scan_id).unwrap_or(0),
                store.count_crawled(self.ctx.scan.scan_id).unwrap_or(0),
                store.count_backlinks(self.ctx.scan.scan_id).unwrap_or(0),
            )
        };
        let page_depth = self.ctx.page_queue.len().unwrap_or(0);
        let link_depth = self.ctx.link_queue.len().unwrap_or(0);

        tracing::info!(
            "Scan '{}': {} URLs ({} crawled), {} backlinks, queues: {} pages / {} link batches",
            self.ctx.scan.name,
            urls,
            crawled,
            backlinks,
            page_depth,
            link_depth
        );
    }
}
