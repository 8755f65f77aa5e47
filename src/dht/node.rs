use super::error::DhtError;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

pub const NODE_ID_LEN: usize = 20;
pub const COMPACT_NODE_LEN: usize = 26;

/// Bytes of a crawl target's id kept at the front of a blended id.
const BLEND_TARGET_BYTES: usize = 5;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub [u8; NODE_ID_LEN]);

impl NodeId {
    pub fn generate() -> Self {
        Self(rand::random())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DhtError> {
        let id: [u8; NODE_ID_LEN] = bytes.try_into().map_err(|_| DhtError::InvalidNodeId)?;
        Ok(Self(id))
    }

    pub fn as_bytes(&self) -> &[u8; NODE_ID_LEN] {
        &self.0
    }

    /// Sender id used when crawling `target`: the tail of the target's id
    /// followed by the head of our own. Remote nodes file us next to
    /// themselves and answer with their own neighbourhood, while the shared
    /// prefix with `own` still identifies the crawler.
    pub fn blend(target: &NodeId, own: &NodeId) -> NodeId {
        let mut id = [0u8; NODE_ID_LEN];
        let (head, tail) = id.split_at_mut(BLEND_TARGET_BYTES);
        head.copy_from_slice(&target.0[NODE_ID_LEN - BLEND_TARGET_BYTES..]);
        tail.copy_from_slice(&own.0[..NODE_ID_LEN - BLEND_TARGET_BYTES]);
        NodeId(id)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}..)", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// A node learned from a `find_node` reply's compact node list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactNode {
    pub id: NodeId,
    pub addr: SocketAddrV4,
}

impl CompactNode {
    pub fn new(id: NodeId, addr: SocketAddrV4) -> Self {
        Self { id, addr }
    }

    pub fn from_compact(data: &[u8]) -> Option<Self> {
        if data.len() != COMPACT_NODE_LEN {
            return None;
        }

        let id = NodeId::from_bytes(&data[..NODE_ID_LEN]).ok()?;
        let ip = Ipv4Addr::new(data[20], data[21], data[22], data[23]);
        let port = u16::from_be_bytes([data[24], data[25]]);

        Some(Self::new(id, SocketAddrV4::new(ip, port)))
    }

    pub fn to_compact(&self) -> [u8; COMPACT_NODE_LEN] {
        let mut compact = [0u8; COMPACT_NODE_LEN];
        compact[..20].copy_from_slice(&self.id.0);
        compact[20..24].copy_from_slice(&self.addr.ip().octets());
        compact[24..].copy_from_slice(&self.addr.port().to_be_bytes());
        compact
    }

    /// Splits a packed node list. A length that is not a whole number of
    /// entries means the list is corrupt, and nothing from it is trusted.
    pub fn parse_list(data: &[u8]) -> Result<Vec<Self>, DhtError> {
        if data.len() % COMPACT_NODE_LEN != 0 {
            return Err(DhtError::invalid(format!(
                "compact node list of {} bytes",
                data.len()
            )));
        }

        Ok(data
            .chunks_exact(COMPACT_NODE_LEN)
            .filter_map(Self::from_compact)
            .collect())
    }
}
