//! Queue consumers
//!
//! Two worker kinds drive a scan. Page workers lease URLs from the page
//! queue, fetch them, and publish the extracted links; link workers lease
//! link payloads, fold them into the graph as backlinks, and enqueue newly
//! discovered in-scope URLs back onto the page queue.
//!
//! Every handler is written to be replay-safe: a message redelivered after a
//! worker crash produces the same graph as the first delivery, because all
//! storage writes are idempotent and the message is acknowledged only after
//! they commit. Fetch failures are absorbed into the graph as error records;
//! only storage and queue failures abort a worker.

use crate::crawler::fetcher::{fetch_url, FetchOutcome};
use crate::crawler::parser::parse_html;
use crate::queue::{LinkPayload, QueueKind, SqliteQueue, WorkQueue};
use crate::scope::{ScanScope, ScopePolicy};
use crate::storage::{LinkGraphStore, ScanRecord, SqliteStore, UrlRecord, MAX_REDIRECT_HOPS};
use crate::url::{resolve, root_stem};
use crate::Result;
use reqwest::Client;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use url::Url;

/// How long an idle consumer sleeps before polling the queue again.
const IDLE_POLL: Duration = Duration::from_millis(500);

/// How often a consumer sweeps its queue for expired leases.
const REQUEUE_INTERVAL: Duration = Duration::from_secs(30);

/// Shared state handed to every worker of a scan
#[derive(Clone)]
pub struct WorkerContext {
    pub scan: ScanRecord,
    pub scope: ScanScope,
    pub policy: ScopePolicy,
    pub store: Arc<Mutex<SqliteStore>>,
    pub page_queue: Arc<SqliteQueue>,
    pub link_queue: Arc<SqliteQueue>,
    pub client: Client,
    pub allowed_content_types: Vec<String>,
}

impl WorkerContext {
    /// Looks a URL up in the graph, creating its record on first sight.
    fn get_or_create(&self, url: &Url) -> Result<(UrlRecord, bool)> {
        let host_in_scope = self.scope.host_in_scope(url);
        let stem = root_stem(url, host_in_scope);
        let mut store = self.store.lock().unwrap();
        Ok(store.get_or_create_url(self.scan.scan_id, url, &stem)?)
    }
}

/// Processes one message from the page queue
///
/// The payload is the canonical URL text. The URL is fetched and its outcome
/// (page, redirect, or transport error) is written to the graph; for parsed
/// pages the extracted links are published to the link queue.
pub async fn process_page_message(ctx: &WorkerContext, payload: &[u8]) -> Result<()> {
    let url_text = String::from_utf8_lossy(payload);
    let url = match Url::parse(&url_text) {
        Ok(url) => url,
        Err(e) => {
            // A payload that never parses will never parse; drop it.
            tracing::warn!("Dropping unparseable page message '{}': {}", url_text, e);
            return Ok(());
        }
    };

    let (record, _) = ctx.get_or_create(&url)?;

    // Redelivery of an already-processed URL is a no-op.
    if record.is_crawled {
        tracing::debug!("Skipping already-crawled URL: {}", url);
        return Ok(());
    }

    if ctx.policy.is_blacklisted(&url) {
        tracing::debug!("Blacklisted, not fetching: {}", url);
        let mut store = ctx.store.lock().unwrap();
        store.record_crawl(record.url_id, None, None, None, true)?;
        return Ok(());
    }

    let outcome = fetch_url(&ctx.client, &url, &ctx.allowed_content_types).await;

    match outcome {
        FetchOutcome::TransportError { error } => {
            tracing::warn!("Fetch failed for {}: {}", url, error);
            let mut store = ctx.store.lock().unwrap();
            store.record_error(record.url_id, &error)?;
        }

        FetchOutcome::Redirect {
            status_code,
            location,
        } => {
            handle_redirect(ctx, &url, &record, status_code, &location)?;
        }

        FetchOutcome::Page {
            status_code,
            content_type,
            body,
        } => {
            let parsed = body.as_deref().map(parse_html);
            let title = parsed.as_ref().and_then(|p| p.title.clone());

            {
                let mut store = ctx.store.lock().unwrap();
                store.record_crawl(
                    record.url_id,
                    Some(status_code),
                    content_type.as_deref(),
                    title.as_deref(),
                    false,
                )?;
            }

            // Links are only followed for pages inside the scan's scope.
            if let Some(parsed) = parsed {
                if ctx.scope.in_scope(&url) {
                    {
                        let mut store = ctx.store.lock().unwrap();
                        store.record_page_links(record.url_id, &parsed.raw_links)?;
                    }

                    let payload = LinkPayload {
                        url: url.to_string(),
                        links: parsed.raw_links,
                    };
                    ctx.link_queue.push(&serde_json::to_vec(&payload)?)?;
                }
            }

            tracing::debug!("Crawled {} ({})", url, status_code);
        }
    }

    Ok(())
}

/// Records a redirect edge and schedules its target.
fn handle_redirect(
    ctx: &WorkerContext,
    url: &Url,
    record: &UrlRecord,
    status_code: u16,
    location: &str,
) -> Result<()> {
    let target = match resolve(url, location) {
        Ok(target) => target,
        Err(skip) => {
            tracing::warn!("Unresolvable redirect target '{}' on {}: {}", location, url, skip);
            let mut store = ctx.store.lock().unwrap();
            store.record_error(
                record.url_id,
                &format!("unresolvable redirect target '{}': {}", location, skip),
            )?;
            return Ok(());
        }
    };

    // A hop that would push the chain past the bound stops here instead.
    let depth = {
        let store = ctx.store.lock().unwrap();
        store.redirect_chain_depth(record.url_id)?
    };
    if depth + 1 > MAX_REDIRECT_HOPS {
        tracing::warn!("Redirect chain limit reached at {}", url);
        let mut store = ctx.store.lock().unwrap();
        store.record_error(
            record.url_id,
            &format!("redirect chain exceeded {} hops", MAX_REDIRECT_HOPS),
        )?;
        return Ok(());
    }

    let (target_record, _) = ctx.get_or_create(&target)?;

    {
        let mut store = ctx.store.lock().unwrap();
        store.record_redirect(record.url_id, target_record.url_id, status_code)?;
    }

    if ctx.scope.in_scope(&target) && !target_record.is_crawled {
        ctx.page_queue.push(target.as_str().as_bytes())?;
    }

    tracing::debug!("Redirect {} -> {} ({})", url, target, status_code);
    Ok(())
}

/// Processes one message from the link queue
///
/// The payload carries a fetched page and its raw links. Each link is
/// resolved against the page, recorded as a backlink edge, and enqueued for
/// fetching if it is new and in scope. Off-scope targets are recorded and
/// closed out so they are never fetched.
pub fn process_link_message(ctx: &WorkerContext, payload: &[u8]) -> Result<()> {
    let payload: LinkPayload = match serde_json::from_slice(payload) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Dropping undecodable link message: {}", e);
            return Ok(());
        }
    };

    let source_url = match Url::parse(&payload.url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Dropping link message with bad source '{}': {}", payload.url, e);
            return Ok(());
        }
    };

    let (source_record, _) = ctx.get_or_create(&source_url)?;

    for raw in &payload.links {
        let target = match resolve(&source_url, raw) {
            Ok(target) => target,
            Err(skip) => {
                tracing::trace!("Skipping link '{}' on {}: {}", raw, source_url, skip);
                continue;
            }
        };

        let (target_record, created) = ctx.get_or_create(&target)?;

        {
            let mut store = ctx.store.lock().unwrap();
            store.record_backlink(target_record.url_id, source_record.url_id)?;
        }

        if ctx.policy.is_blacklisted(&target) {
            let mut store = ctx.store.lock().unwrap();
            store.record_crawl(target_record.url_id, None, None, None, true)?;
            continue;
        }

        if ctx.scope.in_scope(&target) {
            // Enqueue only on first discovery; replays and repeat sightings
            // must not multiply fetches.
            if created && !target_record.is_crawled {
                ctx.page_queue.push(target.as_str().as_bytes())?;
            }
        } else {
            // Off-scope URLs stay in the graph as leaf nodes.
            let mut store = ctx.store.lock().unwrap();
            store.record_crawl(target_record.url_id, None, None, None, false)?;
        }
    }

    Ok(())
}

/// Runs one consumer until shutdown is signalled
///
/// The loop leases one message at a time and acknowledges it only after the
/// handler commits. Expired leases of crashed siblings are swept back into
/// the queue periodically.
pub async fn consume_loop(
    ctx: WorkerContext,
    kind: QueueKind,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let queue = match kind {
        QueueKind::Page => ctx.page_queue.clone(),
        QueueKind::Link => ctx.link_queue.clone(),
    };

    let mut last_sweep = std::time::Instant::now();

    loop {
        if *shutdown.borrow() {
            return Ok(());
        }

        if last_sweep.elapsed() >= REQUEUE_INTERVAL {
            let recovered = queue.requeue_expired()?;
            if recovered > 0 {
                tracing::info!("Requeued {} expired {:?} leases", recovered, kind);
            }
            last_sweep = std::time::Instant::now();
        }

        let message = queue.lease()?;

        match message {
            Some(message) => {
                let result = match kind {
                    QueueKind::Page => process_page_message(&ctx, &message.payload).await,
                    QueueKind::Link => process_link_message(&ctx, &message.payload),
                };

                // Ack strictly after the handler's writes committed; on
                // failure the lease expires and the message is redelivered.
                result?;
                queue.ack(&message)?;
            }
            None => {
                tokio::select! {
                    _ = tokio::time::sleep(IDLE_POLL) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
    }
}
