//! Shared work queue and visited set
//!
//! The frontier holds pending (URL, depth) items and the set of URLs already
//! claimed by a worker. Claiming a URL and counting it as in flight happen in
//! one critical section, and termination is decided under the same lock: the
//! crawl is over only when the queue is empty and no claimed item is still
//! being processed.

use std::collections::{HashSet, VecDeque};
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use url::Url;

/// A unit of crawl work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    /// Normalized URL
    pub url: Url,
    /// Link distance from the seed
    pub depth: u32,
}

impl FrontierItem {
    pub fn new(url: Url, depth: u32) -> Self {
        Self { url, depth }
    }
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<FrontierItem>,
    visited: HashSet<String>,
    in_flight: usize,
    cancelled: bool,
}

/// Concurrency-safe queue with single-claim semantics
#[derive(Debug)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
    max_depth: u32,
}

impl Frontier {
    /// Creates an empty frontier that drops items deeper than `max_depth`
    pub fn new(max_depth: u32) -> Self {
        Self {
            state: Mutex::new(FrontierState::default()),
            notify: Notify::new(),
            max_depth,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds work
    ///
    /// Returns false if the item was dropped: too deep, already visited, or the
    /// frontier is cancelled. Dropped items are not marked visited.
    pub fn push(&self, item: FrontierItem) -> bool {
        if item.depth > self.max_depth {
            tracing::trace!("Depth limit drops {} (depth {})", item.url, item.depth);
            return false;
        }

        {
            let mut state = self.lock();
            if state.cancelled || state.visited.contains(item.url.as_str()) {
                return false;
            }
            state.queue.push_back(item);
        }

        self.notify.notify_waiters();
        true
    }

    /// Atomically marks a URL visited
    ///
    /// Returns true iff the URL had not been claimed before; only then may the
    /// caller fetch it.
    pub fn try_claim(&self, url: &Url) -> bool {
        self.lock().visited.insert(url.as_str().to_string())
    }

    /// Takes the next unclaimed item, waiting while other workers may still add work
    ///
    /// Returns `None` once the frontier is cancelled, or when the queue is empty
    /// and nothing is in flight.
    pub async fn pop(self: &Arc<Self>) -> Option<ClaimedItem> {
        loop {
            // registered before checking, so a wakeup between check and await is not lost
            let notified = self.notify.notified();

            {
                let mut state = self.lock();
                if state.cancelled {
                    return None;
                }

                while let Some(item) = state.queue.pop_front() {
                    if state.visited.insert(item.url.as_str().to_string()) {
                        state.in_flight += 1;
                        return Some(ClaimedItem {
                            item,
                            frontier: Arc::clone(self),
                        });
                    }
                }

                if state.in_flight == 0 {
                    drop(state);
                    self.notify.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Stops the frontier: every current and future `pop` returns `None`
    pub fn cancel(&self) {
        {
            let mut state = self.lock();
            state.cancelled = true;
            state.queue.clear();
        }
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Resolves once the frontier has been cancelled
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of claimed items still being processed
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Number of URLs claimed so far
    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    fn release(&self) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.notify.notify_waiters();
    }
}

/// A claimed item; dropping it marks the item as processed
#[derive(Debug)]
pub struct ClaimedItem {
    item: FrontierItem,
    frontier: Arc<Frontier>,
}

impl Deref for ClaimedItem {
    type Target = FrontierItem;

    fn deref(&self) -> &FrontierItem {
        &self.item
    }
}

impl Drop for ClaimedItem {
    fn drop(&mut self) {
        self.frontier.release();
    }
}
