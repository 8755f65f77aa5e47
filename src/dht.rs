//! DHT crawling engine (BEP-5 KRPC over UDP).
//!
//! The crawler joins the overlay through a few bootstrap routers, then walks
//! it breadth-first: every `find_node` reply yields up to eight nodes, and
//! each node not seen before gets its own `find_node`. Inbound queries are
//! answered just enough to keep remote clients talking to us. `announce_peer`
//! queries are the product and are forwarded to a bounded sink as
//! [`MetaSource`] records.
//!
//! There is no routing table: replies to `find_node` and `get_peers` always
//! carry an empty node list.

mod crawler;
mod error;
mod message;
mod node;
mod pool;
mod transaction;
mod transport;

pub use crawler::{announced_addr, peers_token, Crawler, MetaSource};
pub use error::DhtError;
pub use message::{FindNodeResponse, Message, Method, QueryArgs, TransactionId, INFO_HASH_LEN};
pub use node::{CompactNode, NodeId, COMPACT_NODE_LEN, NODE_ID_LEN};
pub use pool::NodePool;
pub use transaction::{PendingRequests, RequestKind, TransactionIds};
pub use transport::{Datagram, Pipeline, Transport};
