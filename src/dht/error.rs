use thiserror::Error;

#[derive(Debug, Error)]
pub enum DhtError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bencode error: {0}")]
    Bencode(#[from] crate::bencode::BencodeError),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("unknown message type: {0:?}")]
    UnknownMessageType(String),

    #[error("invalid node id length")]
    InvalidNodeId,

    #[error("failed to resolve {host}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("datagram pipeline closed")]
    PipelineClosed,
}

impl DhtError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        DhtError::InvalidMessage(reason.into())
    }
}
