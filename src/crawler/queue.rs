//! Unbounded work queues shared between the coordinator and the fetch workers
//!
//! The frontier queue carries [`FrontierMessage`]s from the coordinator to the
//! workers and the result queue carries [`ResultItem`]s back. These two queues
//! are the only state that crosses task boundaries.

use crate::crawler::fetcher::FetchError;
use crate::url::CanonicalUrl;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

/// Fetched page content handed to the action and to link discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    /// Decoded response body
    pub body: String,

    /// Content-Type header value, when the server sent one
    pub content_type: Option<String>,
}

impl Content {
    /// Creates content from a body with no known content type
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
        }
    }

    /// Returns the body as text
    pub fn as_str(&self) -> &str {
        &self.body
    }
}

/// A page waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    pub address: CanonicalUrl,
    pub depth: u32,
}

/// What travels on the frontier queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontierMessage {
    /// Fetch this page
    Fetch(FrontierItem),
    /// Exit the worker loop
    Shutdown,
}

/// Result of a single fetch
#[derive(Debug)]
pub enum FetchOutcome {
    Content(Content),
    Failure(FetchError),
}

/// A fetched (or failed) page on its way back to the coordinator
#[derive(Debug)]
pub struct ResultItem {
    pub address: CanonicalUrl,
    pub depth: u32,
    pub outcome: FetchOutcome,
}

/// Unbounded multi-producer, multi-consumer FIFO on a tokio channel
///
/// `put` never blocks. Takers share the receiving end behind an async mutex,
/// so the task parked in `take` is always the next one served. Cloning yields
/// another handle to the same queue.
pub struct WorkQueue<T> {
    tx: UnboundedSender<T>,
    rx: Arc<Mutex<UnboundedReceiver<T>>>,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Appends an item and wakes the waiting taker, if any
    pub fn put(&self, item: T) {
        // The queue keeps its own receiver, so the channel is never closed
        let _ = self.tx.send(item);
    }

    /// Removes the oldest item, waiting for one if the queue is empty
    ///
    /// Cancel safe: dropping the future never loses an item.
    pub async fn take(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }

    /// Removes and returns every queued item
    pub async fn drain(&self) -> Vec<T> {
        let mut rx = self.rx.lock().await;
        drain_receiver(&mut rx)
    }

    /// Like [`WorkQueue::drain`], but gives up if a taker holds the receiver
    pub fn try_drain(&self) -> Option<Vec<T>> {
        let mut rx = self.rx.try_lock().ok()?;
        Some(drain_receiver(&mut rx))
    }
}

fn drain_receiver<T>(rx: &mut UnboundedReceiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Ok(item) = rx.try_recv() {
        items.push(item);
    }
    items
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Queue of pages to fetch, shared by every worker
pub type FrontierQueue = WorkQueue<FrontierMessage>;

/// Worker side of the result queue
pub type ResultSender = UnboundedSender<ResultItem>;

/// Coordinator side of the result queue; it is the only consumer
pub type ResultReceiver = UnboundedReceiver<ResultItem>;

/// Creates the result queue
pub fn result_queue() -> (ResultSender, ResultReceiver) {
    mpsc::unbounded_channel()
}
