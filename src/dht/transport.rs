use super::error::DhtError;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// The crawler's single UDP socket, used for every send and receive.
#[derive(Debug, Clone)]
pub struct Transport {
    socket: Arc<UdpSocket>,
}

impl Transport {
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, DhtError> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DhtError> {
        Ok(self.socket.local_addr()?)
    }

    /// Writes one datagram straight to the socket.
    pub async fn send(&self, data: &[u8], addr: SocketAddr) -> Result<(), DhtError> {
        self.socket.send_to(data, addr).await?;
        Ok(())
    }

    /// Spawns the reader task and returns the consuming end of the pipeline.
    ///
    /// The reader owns one buffer of `buffer_size` bytes. It receives a
    /// datagram into it, hands the buffer over, and does not touch the socket
    /// again until [`Pipeline::release`] gives the buffer back. At most one
    /// datagram is ever between the socket and the consumer.
    pub fn start_reader(&self, buffer_size: usize) -> Pipeline {
        let (datagram_tx, datagrams) = mpsc::channel(1);
        let (acks, ack_rx) = mpsc::channel(1);
        let reader = tokio::spawn(read_loop(
            self.socket.clone(),
            vec![0u8; buffer_size],
            ack_rx,
            datagram_tx,
        ));

        Pipeline {
            datagrams,
            acks,
            reader,
        }
    }
}

/// An inbound datagram, borrowing the reader's buffer until released.
#[derive(Debug)]
pub struct Datagram {
    buf: Vec<u8>,
    len: usize,
    pub from: SocketAddr,
}

impl Datagram {
    pub fn payload(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

pub struct Pipeline {
    datagrams: mpsc::Receiver<io::Result<Datagram>>,
    acks: mpsc::Sender<Vec<u8>>,
    reader: JoinHandle<()>,
}

impl Pipeline {
    /// Waits for the next datagram. A socket read error ends the pipeline
    /// and is returned here.
    pub async fn next(&mut self) -> Result<Datagram, DhtError> {
        match self.datagrams.recv().await {
            Some(datagram) => Ok(datagram?),
            None => Err(DhtError::PipelineClosed),
        }
    }

    /// Acknowledges a processed datagram, letting the reader receive again.
    pub async fn release(&self, datagram: Datagram) -> Result<(), DhtError> {
        self.acks
            .send(datagram.buf)
            .await
            .map_err(|_| DhtError::PipelineClosed)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(
    socket: Arc<UdpSocket>,
    mut buf: Vec<u8>,
    mut acks: mpsc::Receiver<Vec<u8>>,
    datagrams: mpsc::Sender<io::Result<Datagram>>,
) {
    loop {
        let received = socket.recv_from(&mut buf).await;
        let fatal = received.is_err();
        let item = received.map(|(len, from)| Datagram { buf, len, from });

        if datagrams.send(item).await.is_err() || fatal {
            break;
        }

        match acks.recv().await {
            Some(returned) => buf = returned,
            None => break,
        }
    }

    debug!("udp reader stopped");
}
