use super::error::DhtError;
use super::node::{CompactNode, NodeId};
use crate::bencode::{decode, encode, Dict, Value};
use bytes::Bytes;

pub type TransactionId = Bytes;

pub const INFO_HASH_LEN: usize = 20;

/// KRPC query method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Ping,
    FindNode,
    GetPeers,
    AnnouncePeer,
    Unknown(String),
}

impl Method {
    pub fn from_name(name: &str) -> Self {
        match name {
            "ping" => Method::Ping,
            "find_node" => Method::FindNode,
            "get_peers" => Method::GetPeers,
            "announce_peer" => Method::AnnouncePeer,
            other => Method::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Ping => "ping",
            Method::FindNode => "find_node",
            Method::GetPeers => "get_peers",
            Method::AnnouncePeer => "announce_peer",
            Method::Unknown(name) => name,
        }
    }
}

/// A decoded KRPC datagram.
///
/// Parsing only checks the envelope (`t`, `y` and the per-kind payload
/// container). Arguments and result payloads are validated by
/// [`QueryArgs::parse`] and [`FindNodeResponse::parse`] once the receiver
/// knows what to expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Query {
        transaction_id: TransactionId,
        method: Method,
        args: Dict,
    },
    Response {
        transaction_id: TransactionId,
        body: Dict,
    },
    Error {
        transaction_id: TransactionId,
        code: i64,
        description: String,
    },
}

impl Message {
    pub fn find_node(transaction_id: TransactionId, id: &NodeId, target: &NodeId) -> Self {
        Message::Query {
            transaction_id,
            method: Method::FindNode,
            args: dict([
                ("id", Value::bytes(id.as_bytes())),
                ("target", Value::bytes(target.as_bytes())),
            ]),
        }
    }

    pub fn response<'a>(
        transaction_id: TransactionId,
        body: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Self {
        Message::Response {
            transaction_id,
            body: dict(body),
        }
    }

    pub fn transaction_id(&self) -> &TransactionId {
        match self {
            Message::Query { transaction_id, .. }
            | Message::Response { transaction_id, .. }
            | Message::Error { transaction_id, .. } => transaction_id,
        }
    }

    pub fn parse(data: &[u8]) -> Result<Self, DhtError> {
        let mut envelope = decode(data)?
            .into_dict()
            .ok_or_else(|| DhtError::invalid("expected dict"))?;

        let transaction_id = envelope
            .get(b"t".as_slice())
            .and_then(Value::as_bytes)
            .cloned()
            .ok_or_else(|| DhtError::invalid("missing transaction id"))?;

        let kind = envelope
            .get(b"y".as_slice())
            .and_then(Value::as_str)
            .ok_or_else(|| DhtError::invalid("missing message type"))?
            .to_string();

        match kind.as_str() {
            "q" => {
                let method = envelope
                    .get(b"q".as_slice())
                    .and_then(Value::as_str)
                    .map(Method::from_name)
                    .ok_or_else(|| DhtError::invalid("missing query method"))?;

                // A missing argument dict is reported by argument validation.
                let args = envelope
                    .remove(b"a".as_slice())
                    .and_then(Value::into_dict)
                    .unwrap_or_default();

                Ok(Message::Query {
                    transaction_id,
                    method,
                    args,
                })
            }
            "r" => {
                let body = envelope
                    .remove(b"r".as_slice())
                    .and_then(Value::into_dict)
                    .ok_or_else(|| DhtError::invalid("missing response dict"))?;

                Ok(Message::Response {
                    transaction_id,
                    body,
                })
            }
            "e" => {
                let error = envelope
                    .get(b"e".as_slice())
                    .and_then(Value::as_list)
                    .ok_or_else(|| DhtError::invalid("missing error list"))?;

                Ok(Message::Error {
                    transaction_id,
                    code: error.first().and_then(Value::as_integer).unwrap_or(0),
                    description: error
                        .get(1)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
            }
            _ => Err(DhtError::UnknownMessageType(kind)),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut envelope = Dict::new();
        envelope.insert(
            Bytes::from_static(b"t"),
            Value::Bytes(self.transaction_id().clone()),
        );

        match self {
            Message::Query { method, args, .. } => {
                envelope.insert(Bytes::from_static(b"y"), Value::from("q"));
                envelope.insert(Bytes::from_static(b"q"), Value::from(method.as_str()));
                envelope.insert(Bytes::from_static(b"a"), Value::Dict(args.clone()));
            }
            Message::Response { body, .. } => {
                envelope.insert(Bytes::from_static(b"y"), Value::from("r"));
                envelope.insert(Bytes::from_static(b"r"), Value::Dict(body.clone()));
            }
            Message::Error {
                code, description, ..
            } => {
                envelope.insert(Bytes::from_static(b"y"), Value::from("e"));
                envelope.insert(
                    Bytes::from_static(b"e"),
                    Value::List(vec![Value::Integer(*code), Value::from(description.as_str())]),
                );
            }
        }

        encode(&Value::Dict(envelope))
    }
}

/// Validated arguments of a supported inbound query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryArgs {
    Ping {
        id: NodeId,
    },
    FindNode {
        id: NodeId,
        target: NodeId,
    },
    GetPeers {
        id: NodeId,
        info_hash: [u8; INFO_HASH_LEN],
    },
    AnnouncePeer {
        id: NodeId,
        info_hash: [u8; INFO_HASH_LEN],
        port: u16,
        implied_port: bool,
        token: Bytes,
    },
}

impl QueryArgs {
    pub fn parse(method: &Method, args: &Dict) -> Result<Self, DhtError> {
        let id = node_id(args, b"id")?;

        match method {
            Method::Ping => Ok(QueryArgs::Ping { id }),
            Method::FindNode => Ok(QueryArgs::FindNode {
                id,
                target: node_id(args, b"target")?,
            }),
            Method::GetPeers => Ok(QueryArgs::GetPeers {
                id,
                info_hash: info_hash(args)?,
            }),
            Method::AnnouncePeer => {
                let info_hash = info_hash(args)?;

                let port = args
                    .get(b"port".as_slice())
                    .and_then(Value::as_integer)
                    .ok_or_else(|| DhtError::invalid("missing port"))?;
                let port = u16::try_from(port)
                    .map_err(|_| DhtError::invalid(format!("port {} out of range", port)))?;

                let implied_port = args
                    .get(b"implied_port".as_slice())
                    .and_then(Value::as_integer)
                    .is_some_and(|flag| flag != 0);

                let token = args
                    .get(b"token".as_slice())
                    .and_then(Value::as_bytes)
                    .cloned()
                    .ok_or_else(|| DhtError::invalid("missing token"))?;

                Ok(QueryArgs::AnnouncePeer {
                    id,
                    info_hash,
                    port,
                    implied_port,
                    token,
                })
            }
            Method::Unknown(name) => Err(DhtError::invalid(format!("unsupported query {}", name))),
        }
    }
}

/// Result payload of a `find_node` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindNodeResponse {
    pub id: NodeId,
    pub nodes: Vec<CompactNode>,
}

impl FindNodeResponse {
    pub fn parse(body: &Dict) -> Result<Self, DhtError> {
        let id = node_id(body, b"id")?;

        let nodes = body
            .get(b"nodes".as_slice())
            .and_then(Value::as_bytes)
            .ok_or_else(|| DhtError::invalid("missing nodes"))?;

        Ok(Self {
            id,
            nodes: CompactNode::parse_list(nodes)?,
        })
    }
}

fn dict<'a>(entries: impl IntoIterator<Item = (&'a str, Value)>) -> Dict {
    entries
        .into_iter()
        .map(|(key, value)| (Bytes::copy_from_slice(key.as_bytes()), value))
        .collect()
}

fn node_id(dict: &Dict, key: &[u8]) -> Result<NodeId, DhtError> {
    let bytes = dict.get(key).and_then(Value::as_bytes).ok_or_else(|| {
        DhtError::invalid(format!("missing {}", String::from_utf8_lossy(key)))
    })?;
    NodeId::from_bytes(bytes)
}

fn info_hash(args: &Dict) -> Result<[u8; INFO_HASH_LEN], DhtError> {
    args.get(b"info_hash".as_slice())
        .and_then(Value::as_bytes)
        .and_then(|b| <[u8; INFO_HASH_LEN]>::try_from(&b[..]).ok())
        .ok_or_else(|| DhtError::invalid("missing or malformed info_hash"))
}
