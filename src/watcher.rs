//! Repository event watcher: polls the forge's public events feed and hands
//! batches of new, interesting events to a consumer.
//!
//! The watcher owns its state outright and runs as one tokio task. Each
//! iteration sleeps for the current poll interval, makes a conditional
//! request with the last `ETag`, keeps events newer than the watermark whose
//! kind is of interest, and advances the watermark to the newest event seen.
//! The watermark tracks feed timestamps rather than wall-clock time because
//! the feed lags behind real time.

use crate::forge::{EventKind, EventsFetch, ForgeApi, RepoEvent};

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Poll interval used when the server doesn't advise one.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// A batch of new events from one poll, in feed order.
pub type EventBatch = Vec<RepoEvent>;

/// Mutable state carried between polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherState {
    /// Events at or before this instant are considered handled.
    pub epoch: DateTime<Utc>,
    /// Caching token from the last non-cached response.
    pub etag: Option<String>,
    /// Seconds to sleep before the next poll.
    pub poll_interval_secs: u64,
}

pub struct RepoEventWatcher<F> {
    forge: Arc<F>,
    interested: HashSet<EventKind>,
    default_poll_interval_secs: u64,
    state: WatcherState,
}

impl<F: ForgeApi> RepoEventWatcher<F> {
    /// Create a watcher that treats everything up to `start_epoch` as seen.
    /// The first poll happens immediately.
    pub fn new(
        forge: Arc<F>,
        start_epoch: DateTime<Utc>,
        interested: impl IntoIterator<Item = EventKind>,
    ) -> Self {
        Self {
            forge,
            interested: interested.into_iter().collect(),
            default_poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            state: WatcherState {
                epoch: start_epoch,
                etag: None,
                poll_interval_secs: 0,
            },
        }
    }

    pub fn with_default_poll_interval(mut self, secs: u64) -> Self {
        self.default_poll_interval_secs = secs;
        self
    }

    pub fn state(&self) -> &WatcherState {
        &self.state
    }

    /// Run one fetch-and-filter iteration, returning the new events to emit.
    ///
    /// Never fails: an unchanged feed or a failed request yields an empty
    /// batch and leaves the watermark alone.
    pub async fn poll_once(&mut self) -> EventBatch {
        let page = match self.forge.list_events(self.state.etag.as_deref()).await {
            Ok(EventsFetch::Modified(page)) => page,
            Ok(EventsFetch::Unchanged { poll_interval }) => {
                tracing::debug!("repository events unchanged");
                self.state.poll_interval_secs =
                    poll_interval.unwrap_or(self.default_poll_interval_secs);
                return Vec::new();
            }
            Err(error) => {
                tracing::warn!(%error, "failed to list repository events");
                self.state.poll_interval_secs = self.default_poll_interval_secs;
                return Vec::new();
            }
        };

        self.state.etag = page.etag;
        self.state.poll_interval_secs = page
            .poll_interval
            .unwrap_or(self.default_poll_interval_secs);

        let epoch = self.state.epoch;
        // Entries the client could not decode still move the watermark.
        let mut newest = epoch.max(page.newest_created_at.unwrap_or(epoch));
        let mut batch = Vec::new();

        // No ordering is assumed; every event is compared against the
        // watermark from the start of this poll.
        for event in page.events {
            newest = newest.max(event.created_at);

            if event.created_at <= epoch {
                continue;
            }
            if !self.interested.contains(&event.kind) {
                tracing::debug!(event_id = %event.id, kind = %event.kind, "skipping uninteresting event");
                continue;
            }
            batch.push(event);
        }

        if newest > epoch {
            tracing::debug!(from = %epoch, to = %newest, "advancing event watermark");
        }
        self.state.epoch = newest;

        batch
    }

    /// Poll until `shutdown` flips to `true` or the receiver goes away.
    pub async fn run(
        mut self,
        batches: mpsc::UnboundedSender<EventBatch>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!(
            epoch = %self.state.epoch,
            kinds = ?self.interested,
            "repository event watcher started"
        );

        loop {
            let delay = Duration::from_secs(self.state.poll_interval_secs);
            tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => break,
                _ = tokio::time::sleep(delay) => {}
            }

            let batch = self.poll_once().await;
            if batch.is_empty() {
                continue;
            }

            tracing::info!(count = batch.len(), "new repository events");
            if batches.send(batch).is_err() {
                tracing::info!("event batch receiver dropped");
                break;
            }
        }

        tracing::info!("repository event watcher stopped");
    }

    /// Spawn [`run`](Self::run) on the runtime and return the batch stream.
    pub fn spawn(
        self,
        shutdown: watch::Receiver<bool>,
    ) -> (
        mpsc::UnboundedReceiver<EventBatch>,
        tokio::task::JoinHandle<()>,
    ) {
        let (batch_tx, batch_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(self.run(batch_tx, shutdown));
        (batch_rx, handle)
    }
}
