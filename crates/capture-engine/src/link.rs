//! Peer link shim.
//!
//! Narrow interface over whatever carries messages between the two booths.
//! The booth only needs four events and one outbound call; connection
//! negotiation and media delivery stay behind the trait.

use std::collections::VecDeque;
use std::net::SocketAddr;

use async_trait::async_trait;
use snapbooth_common::error::{BoothError, BoothResult};
use snapbooth_model::message::PeerMessage;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;

/// What a link reports to the booth.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// The data channel to `peer` is open.
    Connected { peer: String },
    Message(PeerMessage),
    /// The peer's media stream arrived; the booth starts fresh.
    StreamReceived { peer: String },
    /// The link is gone. Reported once; `recv` yields `None` afterwards.
    Closed,
}

#[async_trait]
pub trait PeerLink: Send {
    /// Deliver one message to the peer.
    async fn send(&mut self, message: &PeerMessage) -> BoothResult<()>;

    /// Next event, or `None` once the link has closed.
    ///
    /// Must be cancel-safe: the controller polls it inside `select!`.
    async fn recv(&mut self) -> Option<PeerEvent>;

    fn is_open(&self) -> bool;
}

/// In-process link; both ends live in the same runtime.
#[derive(Debug)]
pub struct ChannelLink {
    tx: mpsc::UnboundedSender<PeerEvent>,
    rx: mpsc::UnboundedReceiver<PeerEvent>,
    pending: VecDeque<PeerEvent>,
    open: bool,
}

impl ChannelLink {
    /// Two connected ends. Each starts with a `Connected` event queued.
    pub fn pair() -> (ChannelLink, ChannelLink) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        let end = |tx, rx, peer: &str| ChannelLink {
            tx,
            rx,
            pending: VecDeque::from([PeerEvent::Connected {
                peer: peer.to_string(),
            }]),
            open: true,
        };
        (end(b_tx, a_rx, "guest"), end(a_tx, b_rx, "host"))
    }

    /// Push an arbitrary event to the other end, e.g. a stream arrival.
    pub fn notify(&self, event: PeerEvent) -> BoothResult<()> {
        self.tx
            .send(event)
            .map_err(|_| BoothError::transport("peer end dropped"))
    }
}

#[async_trait]
impl PeerLink for ChannelLink {
    async fn send(&mut self, message: &PeerMessage) -> BoothResult<()> {
        self.notify(PeerEvent::Message(message.clone()))
    }

    async fn recv(&mut self) -> Option<PeerEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        if !self.open {
            return None;
        }
        match self.rx.recv().await {
            Some(event) => Some(event),
            None => {
                self.open = false;
                Some(PeerEvent::Closed)
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open && !self.tx.is_closed()
    }
}

/// Newline-delimited JSON messages over TCP.
#[derive(Debug)]
pub struct TcpLink {
    peer: SocketAddr,
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    pending: VecDeque<PeerEvent>,
    open: bool,
}

impl TcpLink {
    /// Bind `addr` and wait for one guest.
    pub async fn accept(addr: impl ToSocketAddrs) -> BoothResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| BoothError::transport(format!("bind failed: {e}")))?;
        Self::accept_on(&listener).await
    }

    /// Wait for one guest on an already bound listener.
    pub async fn accept_on(listener: &TcpListener) -> BoothResult<Self> {
        if let Ok(local) = listener.local_addr() {
            tracing::info!(%local, "Waiting for peer");
        }
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| BoothError::transport(format!("accept failed: {e}")))?;
        Ok(Self::from_stream(stream, peer))
    }

    /// Dial a waiting host.
    pub async fn connect(addr: impl ToSocketAddrs) -> BoothResult<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| BoothError::transport(format!("connect failed: {e}")))?;
        let peer = stream
            .peer_addr()
            .map_err(|e| BoothError::transport(format!("peer address unavailable: {e}")))?;
        Ok(Self::from_stream(stream, peer))
    }

    fn from_stream(stream: TcpStream, peer: SocketAddr) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "TCP_NODELAY not set");
        }
        tracing::info!(%peer, "Peer link established");
        let (read, writer) = stream.into_split();
        Self {
            peer,
            lines: BufReader::new(read).lines(),
            writer,
            pending: VecDeque::from([PeerEvent::Connected {
                peer: peer.to_string(),
            }]),
            open: true,
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn close(&mut self) -> Option<PeerEvent> {
        self.open = false;
        tracing::info!(peer = %self.peer, "Peer link closed");
        Some(PeerEvent::Closed)
    }
}

#[async_trait]
impl PeerLink for TcpLink {
    async fn send(&mut self, message: &PeerMessage) -> BoothResult<()> {
        if !self.open {
            return Err(BoothError::transport("link is closed"));
        }
        let mut line = message.to_json()?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| BoothError::transport(format!("send to {} failed: {e}", self.peer)))?;
        tracing::trace!(peer = %self.peer, %line, "Message sent");
        Ok(())
    }

    async fn recv(&mut self) -> Option<PeerEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        while self.open {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match PeerMessage::from_json(line) {
                        Ok(message) => return Some(PeerEvent::Message(message)),
                        Err(e) => {
                            tracing::warn!(peer = %self.peer, error = %e, %line, "Skipping malformed message");
                        }
                    }
                }
                Ok(None) => return self.close(),
                Err(e) => {
                    tracing::warn!(peer = %self.peer, error = %e, "Peer link read failed");
                    return self.close();
                }
            }
        }
        None
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use snapbooth_model::settings::SettingKey;

    use super::*;

    #[tokio::test]
    async fn channel_pair_starts_connected_and_carries_messages() {
        let (mut host, mut guest) = ChannelLink::pair();
        assert_eq!(
            host.recv().await,
            Some(PeerEvent::Connected {
                peer: "guest".into()
            })
        );
        assert!(matches!(guest.recv().await, Some(PeerEvent::Connected { .. })));

        host.send(&PeerMessage::ShotTrigger).await.unwrap();
        assert_eq!(
            guest.recv().await,
            Some(PeerEvent::Message(PeerMessage::ShotTrigger))
        );

        guest
            .send(&PeerMessage::settings(SettingKey::Filter, "sepia"))
            .await
            .unwrap();
        assert_eq!(
            host.recv().await,
            Some(PeerEvent::Message(PeerMessage::settings(SettingKey::Filter, "sepia")))
        );
    }

    #[tokio::test]
    async fn dropped_end_closes_once() {
        let (mut host, guest) = ChannelLink::pair();
        host.recv().await;
        drop(guest);

        assert_eq!(host.recv().await, Some(PeerEvent::Closed));
        assert_eq!(host.recv().await, None);
        assert!(!host.is_open());
        assert!(host.send(&PeerMessage::ShotTrigger).await.is_err());
    }
}
