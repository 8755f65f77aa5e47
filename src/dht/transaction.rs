use super::message::TransactionId;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Hands out transaction ids for outbound queries.
///
/// Ids are the big-endian bytes of a wrapping counter seeded at random, so a
/// restarted crawler does not accept replies meant for its predecessor.
#[derive(Debug)]
pub struct TransactionIds {
    next: u32,
}

impl TransactionIds {
    pub fn new() -> Self {
        Self::starting_at(rand::random())
    }

    pub fn starting_at(next: u32) -> Self {
        Self { next }
    }

    pub fn fetch_and_add(&mut self) -> TransactionId {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        Bytes::copy_from_slice(&id.to_be_bytes())
    }
}

impl Default for TransactionIds {
    fn default() -> Self {
        Self::new()
    }
}

/// What an outstanding query expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    FindNode,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::FindNode => "find_node",
        }
    }
}

#[derive(Debug)]
struct PendingEntry {
    kind: RequestKind,
    sent_at: Instant,
}

/// Outstanding queries keyed by transaction id.
///
/// An entry is consumed by the first reply or error carrying its id; any
/// later datagram with the same id finds nothing and is dropped.
#[derive(Debug, Default)]
pub struct PendingRequests {
    entries: HashMap<TransactionId, PendingEntry>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tid: TransactionId, kind: RequestKind, sent_at: Instant) {
        self.entries.insert(tid, PendingEntry { kind, sent_at });
    }

    pub fn take(&mut self, tid: &[u8]) -> Option<RequestKind> {
        self.entries.remove(tid).map(|entry| entry.kind)
    }

    pub fn contains(&self, tid: &[u8]) -> bool {
        self.entries.contains_key(tid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops entries sent more than `ttl` before `now` and returns their ids.
    pub fn expire(&mut self, now: Instant, ttl: Duration) -> Vec<TransactionId> {
        let mut expired = Vec::new();
        self.entries.retain(|tid, entry| {
            let live = now.saturating_duration_since(entry.sent_at) <= ttl;
            if !live {
                expired.push(tid.clone());
            }
            live
        });
        expired
    }
}
