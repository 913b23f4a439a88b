//! Fetch worker pool
//!
//! Each worker loops on the frontier queue, fetches the page it was handed and
//! reports the outcome on the result queue. Workers never look at the visited
//! set or the outstanding counter; they only move items between the queues.

use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::queue::{FetchOutcome, FrontierMessage, FrontierQueue, ResultItem, ResultSender};
use crate::url::CanonicalUrl;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Spawns `count` workers on the current tokio runtime
///
/// Every worker runs until it takes a [`FrontierMessage::Shutdown`] from the
/// frontier, so the caller must enqueue exactly one sentinel per worker.
/// Cancelling `halt` makes workers leave at once, abandoning any fetch in
/// flight without reporting it.
pub fn spawn_workers(
    count: usize,
    frontier: &FrontierQueue,
    results: &ResultSender,
    fetcher: Arc<dyn Fetcher>,
    halt: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|id| {
            let worker = run_worker(
                frontier.clone(),
                results.clone(),
                Arc::clone(&fetcher),
                halt.clone(),
            );
            tokio::spawn(worker.instrument(tracing::debug_span!("worker", id)))
        })
        .collect()
}

/// Worker loop: one result per consumed item, until shutdown
async fn run_worker(
    frontier: FrontierQueue,
    results: ResultSender,
    fetcher: Arc<dyn Fetcher>,
    halt: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = halt.cancelled() => break,
            message = frontier.take() => message,
        };

        let item = match message {
            Some(FrontierMessage::Fetch(item)) => item,
            Some(FrontierMessage::Shutdown) | None => break,
        };

        tracing::trace!("Fetching {} (depth {})", item.address, item.depth);

        let outcome = tokio::select! {
            biased;
            _ = halt.cancelled() => break,
            outcome = fetch_guarded(fetcher.as_ref(), &item.address) => outcome,
        };

        let reported = results.send(ResultItem {
            address: item.address,
            depth: item.depth,
            outcome,
        });
        if reported.is_err() {
            // Nobody is listening any more
            break;
        }
    }

    tracing::trace!("Worker shutting down");
}

/// Fetches one page, turning a panic in the fetcher into a failed outcome
async fn fetch_guarded(fetcher: &dyn Fetcher, address: &CanonicalUrl) -> FetchOutcome {
    match AssertUnwindSafe(fetcher.fetch(address)).catch_unwind().await {
        Ok(Ok(content)) => FetchOutcome::Content(content),
        Ok(Err(e)) => FetchOutcome::Failure(e),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!("Fetcher panicked on {}: {}", address, message);
            FetchOutcome::Failure(FetchError::Panicked(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::queue::{result_queue, Content, FrontierItem};
    use crate::url::canonicalize;
    use async_trait::async_trait;
    use std::time::Duration;

    struct EchoFetcher;

    #[async_trait]
    impl Fetcher for EchoFetcher {
        async fn fetch(&self, address: &CanonicalUrl) -> Result<Content, FetchError> {
            if address.as_str().ends_with("/missing") {
                Err(FetchError::Status(404))
            } else if address.as_str().ends_with("/explode") {
                panic!("parser blew up on {}", address);
            } else if address.as_str().ends_with("/hang") {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Content::new("late"))
            } else {
                Ok(Content::new(address.as_str()))
            }
        }
    }

    fn fetch_message(url: &str, depth: u32) -> FrontierMessage {
        FrontierMessage::Fetch(FrontierItem {
            address: canonicalize(url).unwrap(),
            depth,
        })
    }

    async fn join_all(handles: Vec<JoinHandle<()>>) {
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("worker ignored shutdown")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_one_result_per_item() {
        let frontier = FrontierQueue::new();
        let (results_tx, mut results) = result_queue();
        let halt = CancellationToken::new();
        let handles = spawn_workers(3, &frontier, &results_tx, Arc::new(EchoFetcher), &halt);

        frontier.put(fetch_message("https://example.com/a", 0));
        frontier.put(fetch_message("https://example.com/missing", 1));
        frontier.put(fetch_message("https://example.com/b", 1));

        let mut received = Vec::new();
        for _ in 0..3 {
            let item = tokio::time::timeout(Duration::from_secs(1), results.recv())
                .await
                .expect("worker did not report")
                .unwrap();
            received.push(item);
        }
        received.sort_by(|a, b| a.address.cmp(&b.address));

        assert_eq!(received[0].address.as_str(), "https://example.com/a");
        assert!(matches!(&received[0].outcome, FetchOutcome::Content(c) if c.body == "https://example.com/a"));
        assert_eq!(received[0].depth, 0);

        assert_eq!(received[2].address.as_str(), "https://example.com/missing");
        assert!(matches!(
            received[2].outcome,
            FetchOutcome::Failure(FetchError::Status(404))
        ));
        assert_eq!(received[2].depth, 1);

        for _ in 0..3 {
            frontier.put(FrontierMessage::Shutdown);
        }
        join_all(handles).await;
        assert!(results.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_consumes_one_sentinel_each() {
        let frontier = FrontierQueue::new();
        let (results_tx, _results) = result_queue();
        let halt = CancellationToken::new();
        let handles = spawn_workers(2, &frontier, &results_tx, Arc::new(EchoFetcher), &halt);

        frontier.put(FrontierMessage::Shutdown);
        frontier.put(FrontierMessage::Shutdown);
        frontier.put(FrontierMessage::Shutdown);

        join_all(handles).await;

        // The extra sentinel is left untouched
        assert_eq!(frontier.drain().await, vec![FrontierMessage::Shutdown]);
    }

    #[tokio::test]
    async fn test_panicking_fetcher_reported_as_failure() {
        let frontier = FrontierQueue::new();
        let (results_tx, mut results) = result_queue();
        let halt = CancellationToken::new();
        let handles = spawn_workers(1, &frontier, &results_tx, Arc::new(EchoFetcher), &halt);

        frontier.put(fetch_message("https://example.com/explode", 0));
        frontier.put(fetch_message("https://example.com/after", 0));

        let first = tokio::time::timeout(Duration::from_secs(1), results.recv())
            .await
            .expect("panic swallowed the result")
            .unwrap();
        assert_eq!(first.address.as_str(), "https://example.com/explode");
        assert!(matches!(
            &first.outcome,
            FetchOutcome::Failure(FetchError::Panicked(message)) if message.contains("parser blew up")
        ));

        // The same worker keeps serving the frontier
        let second = tokio::time::timeout(Duration::from_secs(1), results.recv())
            .await
            .expect("worker died after the panic")
            .unwrap();
        assert!(matches!(second.outcome, FetchOutcome::Content(_)));

        frontier.put(FrontierMessage::Shutdown);
        join_all(handles).await;
    }

    #[tokio::test]
    async fn test_halt_abandons_fetch_in_flight() {
        let frontier = FrontierQueue::new();
        let (results_tx, mut results) = result_queue();
        let halt = CancellationToken::new();
        let handles = spawn_workers(2, &frontier, &results_tx, Arc::new(EchoFetcher), &halt);

        frontier.put(fetch_message("https://example.com/hang", 0));
        tokio::time::sleep(Duration::from_millis(20)).await;

        halt.cancel();
        join_all(handles).await;
        assert!(results.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_worker_exits_when_results_dropped() {
        let frontier = FrontierQueue::new();
        let (results_tx, results) = result_queue();
        let halt = CancellationToken::new();
        let handles = spawn_workers(1, &frontier, &results_tx, Arc::new(EchoFetcher), &halt);
        drop(results);

        frontier.put(fetch_message("https://example.com/a", 0));
        join_all(handles).await;
    }
}
