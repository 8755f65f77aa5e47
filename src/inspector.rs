//! Crawl statistics shared between the engine and its observers.

use std::collections::HashSet;

use bytes::Bytes;
use parking_lot::Mutex;

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub bootstrap_nodes: Vec<String>,
    pub self_id: String,
    pub local_addr: String,

    pub sent_find_node: u64,

    pub received_ping: u64,
    pub received_find_node: u64,
    pub received_get_peers: u64,
    pub received_announce_peer: u64,

    pub received_responses: u64,
    pub received_errors: u64,
    pub expired_requests: u64,
    pub harvested_peers: u64,

    /// Transaction ids of queries still waiting for a reply.
    pub unreplied: HashSet<Bytes>,
}

/// Serialised access to [`Stats`].
///
/// Every read and write happens inside [`safe_do`](Inspector::safe_do), so
/// counters stay consistent no matter which task touches them.
#[derive(Debug, Default)]
pub struct Inspector {
    stats: Mutex<Stats>,
}

impl Inspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn safe_do<R>(&self, f: impl FnOnce(&mut Stats) -> R) -> R {
        f(&mut self.stats.lock())
    }

    pub fn snapshot(&self) -> Stats {
        self.safe_do(|stats| stats.clone())
    }
}
