//! Crawl frontier and request pacing
//!
//! This module handles:
//! - The FIFO queue of discovered URLs (strict FIFO makes the traversal breadth-first)
//! - The visited set, written once per URL when it is enqueued
//! - Pacing: a fixed pause before every request after the first

use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// The normalized URL to fetch
    pub url: Url,

    /// Link distance from the seed (seeds are 0)
    pub depth: u32,

    /// Page the link was found on; `None` for seeds and sitemap entries
    pub discovered_from: Option<Url>,

    /// Index of the origin URL the entry's scope is checked against
    pub origin: usize,
}

/// Pending URLs plus the set of every URL ever enqueued
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a depth-0 entry; returns false if the URL was already seen
    pub fn push_seed(&mut self, url: Url, origin: usize) -> bool {
        self.push(FrontierEntry {
            url,
            depth: 0,
            discovered_from: None,
            origin,
        })
    }

    /// Enqueues an entry at the back of the queue
    ///
    /// # Returns
    ///
    /// * `true` - The URL was new and is now queued
    /// * `false` - The URL was already enqueued or fetched; nothing changed
    pub fn push(&mut self, entry: FrontierEntry) -> bool {
        if !self.visited.insert(entry.url.as_str().to_string()) {
            return false;
        }
        self.queue.push_back(entry);
        true
    }

    /// Removes and returns the earliest-enqueued entry
    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    /// Records a URL as seen without queueing it (e.g. a redirect target)
    pub fn mark_visited(&mut self, url: &Url) {
        self.visited.insert(url.as_str().to_string());
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    /// Number of entries still queued
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Enforces a fixed delay between consecutive requests
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    requests: u64,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, requests: 0 }
    }

    /// Waits until the next request may be sent
    ///
    /// The first call returns immediately; later calls sleep for the configured delay
    /// whatever the outcome of the previous request.
    ///
    /// # Returns
    ///
    /// `false` if the token was cancelled while waiting.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }

        if self.requests > 0 && !self.delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        self.requests += 1;
        true
    }
}
