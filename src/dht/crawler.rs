use super::error::DhtError;
use super::message::{FindNodeResponse, Message, Method, QueryArgs, TransactionId, INFO_HASH_LEN};
use super::node::NodeId;
use super::pool::NodePool;
use super::transaction::{PendingRequests, RequestKind, TransactionIds};
use super::transport::{Pipeline, Transport};
use crate::bencode::Value;
use crate::config::CrawlerConfig;
use crate::flow::FlowControl;
use crate::inspector::Inspector;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::lookup_host;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// An `(info-hash, peer)` pair learned from an inbound `announce_peer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaSource {
    pub info_hash: [u8; INFO_HASH_LEN],
    pub addr: SocketAddr,
}

/// Address a peer announced itself at. With `implied_port` the datagram's
/// source port wins over the declared one, which is often a LAN port.
pub fn announced_addr(from: SocketAddr, port: u16, implied_port: bool) -> SocketAddr {
    let port = if implied_port { from.port() } else { port };
    SocketAddr::new(from.ip(), port)
}

/// Token handed out in `get_peers` replies. It is never checked on a later
/// `announce_peer`; it only has to be present.
pub fn peers_token(info_hash: &[u8; INFO_HASH_LEN]) -> Bytes {
    Bytes::copy_from_slice(&info_hash[..2])
}

/// The crawling DHT node.
///
/// A `Crawler` owns all crawl state: the outstanding transactions and the
/// pool of contacted node ids. Only [`run`](Crawler::run) (or a test driving
/// [`dispatch`](Crawler::dispatch) directly) mutates it, one datagram or
/// timer event at a time. The flow controller and the inspector are the only
/// pieces shared with other tasks.
///
/// # Examples
///
/// ```no_run
/// use dht_crawler::{Crawler, CrawlerConfig, Inspector};
/// use std::sync::Arc;
/// use tokio::sync::mpsc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CrawlerConfig::default();
/// let (sink, mut records) = mpsc::channel(config.sink_capacity);
/// let crawler = Crawler::bind(config, Arc::new(Inspector::new()), sink).await?;
///
/// tokio::spawn(crawler.run());
///
/// while let Some(record) = records.recv().await {
///     println!("{} {}", hex::encode(record.info_hash), record.addr);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Crawler {
    id: NodeId,
    config: CrawlerConfig,
    transport: Transport,
    transactions: TransactionIds,
    pending: PendingRequests,
    seen: NodePool,
    flow: Arc<FlowControl>,
    inspector: Arc<Inspector>,
    sink: mpsc::Sender<MetaSource>,
}

impl Crawler {
    pub async fn bind(
        config: CrawlerConfig,
        inspector: Arc<Inspector>,
        sink: mpsc::Sender<MetaSource>,
    ) -> Result<Self, DhtError> {
        let transport = Transport::bind(config.listen_addr.as_str()).await?;
        let local_addr = transport.local_addr()?;
        let id = NodeId::generate();

        info!("DHT crawler bound to {} with id {}", local_addr, id);

        inspector.safe_do(|stats| {
            stats.bootstrap_nodes = config.bootstrap_nodes.clone();
            stats.self_id = id.to_string();
            stats.local_addr = local_addr.to_string();
        });

        Ok(Self {
            id,
            flow: FlowControl::new(config.flow.clone()),
            config,
            transport,
            transactions: TransactionIds::new(),
            pending: PendingRequests::new(),
            seen: NodePool::new(),
            inspector,
            sink,
        })
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DhtError> {
        self.transport.local_addr()
    }

    pub fn flow(&self) -> &Arc<FlowControl> {
        &self.flow
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, tid: &[u8]) -> bool {
        self.pending.contains(tid)
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn has_seen(&self, id: &NodeId) -> bool {
        self.seen.contains(id)
    }

    /// Joins the overlay and crawls until the socket fails.
    ///
    /// Reaching no bootstrap node at all is fatal here; later rejoins only
    /// log per-node failures.
    pub async fn run(mut self) -> Result<(), DhtError> {
        self.join().await?;

        let ramp = self.flow.spawn_ramp();
        let mut pipeline = self.transport.start_reader(self.config.recv_buffer_size);

        let result = self.serve(&mut pipeline).await;
        ramp.abort();
        result
    }

    async fn serve(&mut self, pipeline: &mut Pipeline) -> Result<(), DhtError> {
        let mut rejoin = interval(self.config.rejoin_interval());
        rejoin.set_missed_tick_behavior(MissedTickBehavior::Skip);
        rejoin.tick().await;

        loop {
            tokio::select! {
                datagram = pipeline.next() => {
                    let datagram = datagram?;
                    self.dispatch(datagram.payload(), datagram.from).await;
                    pipeline.release(datagram).await?;
                }
                _ = rejoin.tick() => {
                    // Each failing node was already logged by join.
                    let _ = self.join().await;
                    self.expire_pending();
                }
            }
        }
    }

    /// Sends `find_node(own id)` to every bootstrap node.
    ///
    /// Every node is attempted. Fails with the first error only when no
    /// node could be reached.
    pub async fn join(&mut self) -> Result<(), DhtError> {
        let mut first_error = None;
        let mut reached = 0;

        for node in self.config.bootstrap_nodes.clone() {
            let sent = match self.resolve(&node).await {
                Ok(addr) => self.send_find_node(addr, self.id, self.id).await,
                Err(e) => Err(e),
            };

            match sent {
                Ok(()) => reached += 1,
                Err(e) => {
                    warn!("failed to send find_node to bootstrap node {}: {}", node, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if reached == 0 => Err(e),
            _ => Ok(()),
        }
    }

    async fn resolve(&self, host: &str) -> Result<SocketAddr, DhtError> {
        let want_v4 = self.transport.local_addr()?.is_ipv4();
        let resolve_error = |reason: String| DhtError::Resolve {
            host: host.to_string(),
            reason,
        };

        lookup_host(host)
            .await
            .map_err(|e| resolve_error(e.to_string()))?
            .find(|addr| addr.is_ipv4() == want_v4)
            .ok_or_else(|| resolve_error("no address of the socket's family".into()))
    }

    /// Sends a `find_node` query and records it as pending once it is on
    /// the wire. A failed send leaves no pending entry behind.
    pub async fn send_find_node(
        &mut self,
        addr: SocketAddr,
        id: NodeId,
        target: NodeId,
    ) -> Result<(), DhtError> {
        let tid = self.transactions.fetch_and_add();
        let query = Message::find_node(tid.clone(), &id, &target);

        self.transport.send(&query.encode(), addr).await?;

        self.pending
            .insert(tid.clone(), RequestKind::FindNode, Instant::now());
        self.inspector.safe_do(|stats| {
            stats.sent_find_node += 1;
            stats.unreplied.insert(tid);
        });

        Ok(())
    }

    /// Handles one inbound datagram to completion.
    pub async fn dispatch(&mut self, data: &[u8], from: SocketAddr) {
        let message = match Message::parse(data) {
            Ok(message) => message,
            Err(DhtError::UnknownMessageType(kind)) => {
                warn!("unknown message type {:?} from {}", kind, from);
                return;
            }
            Err(e) => {
                trace!("dropping datagram from {}: {}", from, e);
                return;
            }
        };

        match message {
            Message::Query {
                transaction_id,
                method,
                args,
            } => {
                let args = match method {
                    Method::Unknown(_) => return,
                    _ => {
                        self.count_query(&method);
                        QueryArgs::parse(&method, &args)
                    }
                };

                match args {
                    Ok(args) => self.handle_query(transaction_id, args, from).await,
                    Err(e) => warn!("invalid {} query from {}: {}", method.as_str(), from, e),
                }
            }
            Message::Response {
                transaction_id,
                body,
            } => {
                let Some(kind) = self.resolve_pending(&transaction_id) else {
                    trace!("unmatched response from {}", from);
                    return;
                };
                self.inspector
                    .safe_do(|stats| stats.received_responses += 1);

                match kind {
                    RequestKind::FindNode => match FindNodeResponse::parse(&body) {
                        Ok(response) => self.crawl(response).await,
                        Err(e) => trace!(
                            "malformed {} response from {}: {}",
                            kind.as_str(),
                            from,
                            e
                        ),
                    },
                }
            }
            Message::Error {
                transaction_id,
                code,
                description,
            } => {
                if self.resolve_pending(&transaction_id).is_none() {
                    trace!("unmatched error from {}", from);
                    return;
                }
                self.inspector.safe_do(|stats| stats.received_errors += 1);
                trace!("error {} from {}: {}", code, from, description);
            }
        }
    }

    fn count_query(&self, method: &Method) {
        self.inspector.safe_do(|stats| match method {
            Method::Ping => stats.received_ping += 1,
            Method::FindNode => stats.received_find_node += 1,
            Method::GetPeers => stats.received_get_peers += 1,
            Method::AnnouncePeer => stats.received_announce_peer += 1,
            Method::Unknown(_) => {}
        });
    }

    async fn handle_query(&mut self, tid: TransactionId, args: QueryArgs, from: SocketAddr) {
        let id = Value::bytes(self.id.as_bytes());

        let reply = match args {
            QueryArgs::Ping { .. } => Message::response(tid, [("id", id)]),
            QueryArgs::FindNode { .. } => {
                Message::response(tid, [("id", id), ("nodes", Value::bytes(b""))])
            }
            QueryArgs::GetPeers { info_hash, .. } => Message::response(
                tid,
                [
                    ("id", id),
                    ("nodes", Value::bytes(b"")),
                    ("token", Value::Bytes(peers_token(&info_hash))),
                ],
            ),
            QueryArgs::AnnouncePeer {
                info_hash,
                port,
                implied_port,
                ..
            } => {
                let addr = announced_addr(from, port, implied_port);
                self.harvest(MetaSource { info_hash, addr }).await;
                Message::response(tid, [("id", id)])
            }
        };

        if let Err(e) = self.transport.send(&reply.encode(), from).await {
            warn!("failed to reply to {}: {}", from, e);
        }
    }

    async fn harvest(&self, record: MetaSource) {
        self.inspector.safe_do(|stats| stats.harvested_peers += 1);
        debug!(
            "announce for {} from {}",
            hex::encode(record.info_hash),
            record.addr
        );

        if self.sink.send(record).await.is_err() {
            warn!("announce sink closed, dropping record for {}", record.addr);
        }
    }

    /// Queries every node in the reply that has not been contacted yet,
    /// pacing each query on the flow controller.
    async fn crawl(&mut self, response: FindNodeResponse) {
        for node in response.nodes {
            if !self.seen.insert(node.id) {
                continue;
            }

            self.flow.wait_flow().await;

            let id = NodeId::blend(&node.id, &self.id);
            if let Err(e) = self
                .send_find_node(SocketAddr::V4(node.addr), id, node.id)
                .await
            {
                warn!("failed to send find_node to {}: {}", node.addr, e);
            }
        }
    }

    fn resolve_pending(&mut self, tid: &TransactionId) -> Option<RequestKind> {
        let kind = self.pending.take(tid)?;
        self.inspector.safe_do(|stats| stats.unreplied.remove(tid));
        Some(kind)
    }

    fn expire_pending(&mut self) {
        let expired = self
            .pending
            .expire(Instant::now(), self.config.pending_timeout());
        if expired.is_empty() {
            return;
        }

        debug!("expired {} unanswered queries", expired.len());
        self.inspector.safe_do(|stats| {
            stats.expired_requests += expired.len() as u64;
            for tid in &expired {
                stats.unreplied.remove(tid);
            }
        });
    }
}
