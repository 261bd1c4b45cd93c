//! Fire-and-forget cache population.
//!
//! Writes are handed to a background task and never awaited on the request
//! path. Failures are logged, counted and forwarded on a dedicated channel.

use std::{sync::Arc, time::Duration};

use metrics::counter;
use tokio::{
    sync::{mpsc, oneshot},
    task::{JoinError, JoinSet},
};
use tracing::{debug, warn};

use crate::application::repos::{CacheError, CacheStore};

use super::keys::CacheKey;

const SOURCE: &str = "cache::writer";
const METRIC_CACHE_WRITE_FAILED: &str = "film_search_cache_write_failed_total";

/// A cache write that did not land.
#[derive(Debug)]
pub struct WriteFailure {
    pub key: CacheKey,
    pub error: CacheError,
}

enum WriteCommand {
    Put { key: CacheKey, value: Vec<u8> },
    Flush(oneshot::Sender<()>),
}

/// Handle for submitting cache writes to the background writer task.
#[derive(Clone)]
pub struct CacheWriter {
    commands: mpsc::UnboundedSender<WriteCommand>,
}

impl CacheWriter {
    /// Start the writer task on the current runtime.
    ///
    /// Returns the handle and the receiving end of the failure channel. The
    /// receiver may be dropped; failures are still logged and counted.
    pub fn spawn(
        store: Arc<dyn CacheStore>,
        ttl: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<WriteFailure>) {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (failures, failure_feed) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(store, ttl, inbox, failures));
        (Self { commands }, failure_feed)
    }

    /// Queue a write and return immediately.
    pub fn submit(&self, key: CacheKey, value: Vec<u8>) {
        if let Err(err) = self.commands.send(WriteCommand::Put { key, value }) {
            if let WriteCommand::Put { key, .. } = err.0 {
                debug!(
                    target_module = SOURCE,
                    key = %key,
                    "cache writer stopped; dropping write"
                );
            }
        }
    }

    /// Wait until every write submitted before this call has completed.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.commands.send(WriteCommand::Flush(ack)).is_err() {
            return;
        }
        let _ = done.await;
    }
}

async fn run_writer(
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    mut inbox: mpsc::UnboundedReceiver<WriteCommand>,
    failures: mpsc::UnboundedSender<WriteFailure>,
) {
    let mut in_flight: JoinSet<Result<(), WriteFailure>> = JoinSet::new();

    loop {
        tokio::select! {
            command = inbox.recv() => match command {
                Some(WriteCommand::Put { key, value }) => {
                    let store = store.clone();
                    in_flight.spawn(async move {
                        store
                            .set(key.as_str(), value, ttl)
                            .await
                            .map_err(|error| WriteFailure { key, error })
                    });
                }
                Some(WriteCommand::Flush(ack)) => {
                    while let Some(joined) = in_flight.join_next().await {
                        report(joined, &failures);
                    }
                    let _ = ack.send(());
                }
                None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                report(joined, &failures);
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        report(joined, &failures);
    }
}

fn report(
    joined: Result<Result<(), WriteFailure>, JoinError>,
    failures: &mpsc::UnboundedSender<WriteFailure>,
) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(failure)) => {
            warn!(
                target_module = SOURCE,
                key = %failure.key,
                kind = failure.key.kind(),
                error = %failure.error,
                "cache write failed"
            );
            counter!(METRIC_CACHE_WRITE_FAILED, "kind" => failure.key.kind()).increment(1);
            let _ = failures.send(failure);
        }
        Err(err) => {
            warn!(target_module = SOURCE, error = %err, "cache write task aborted");
        }
    }
}
