//! Protocol constants and crawler defaults.
//!
//! Every value here is a default; the tunable ones can be overridden
//! through [`CrawlerConfig`](crate::CrawlerConfig).

use std::time::Duration;

// ============================================================================
// Network
// ============================================================================

/// Standard DHT service port
pub const DEFAULT_PORT: u16 = 6881;

/// Well-known routers used to enter the overlay
pub const BOOTSTRAP_NODES: &[&str] = &[
    "router.bittorrent.com:6881",
    "router.utorrent.com:6881",
    "dht.transmissionbt.com:6881",
];

/// Receive buffer for one inbound datagram. KRPC messages are small; larger
/// datagrams are truncated by the socket and then fail to decode.
pub const RECV_BUFFER_SIZE: usize = 2048;

// ============================================================================
// Crawl timing
// ============================================================================

/// Interval between bootstrap rejoins
pub const REJOIN_INTERVAL: Duration = Duration::from_secs(5);

/// Age after which an unanswered query is forgotten
pub const PENDING_TIMEOUT: Duration = Duration::from_secs(60);

/// Interval between statistics log lines in the binary
pub const STATS_INTERVAL: Duration = Duration::from_secs(60);

// ============================================================================
// Flow control
// ============================================================================

/// Discovery tokens available right after startup
pub const FLOW_INITIAL: usize = 16;

/// Capacity added per ramp tick
pub const FLOW_STEP: usize = 16;

/// Standing capacity once the ramp completes
pub const FLOW_CEILING: usize = 512;

/// Ramp tick; also the window over which capacity is granted
pub const FLOW_TICK: Duration = Duration::from_secs(1);

// ============================================================================
// Downstream sink
// ============================================================================

/// Harvested announces buffered before the crawler blocks on the consumer
pub const SINK_CAPACITY: usize = 1024;
