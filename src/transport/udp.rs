use futures::{SinkExt, StreamExt};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::udp::UdpFramed;
use tracing::{debug, info, instrument, warn};

use crate::config::ProtocolConfig;
use crate::core::codec::FrameCodec;
use crate::error::{ProtocolError, Result};
use crate::protocol::fragmenter::Fragmenter;
use crate::protocol::message::Message;
use crate::protocol::session_table::SessionTable;
use crate::utils::metrics::{global_metrics, Timer};

/// A message queued for transmission by [`UdpTransport::run`].
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub destination: SocketAddr,
    pub session_id: u8,
    pub message: Message,
}

/// Segmented messaging over a UDP socket, one frame per datagram.
///
/// Useful for bridging radio gateways and for exercising the protocol on a
/// host. Endpoints are identified by their socket address.
pub struct UdpTransport {
    framed: UdpFramed<FrameCodec>,
    sessions: Arc<SessionTable<SocketAddr>>,
    fragmenter: Fragmenter,
    session_timeout: Duration,
    eviction_interval: Duration,
}

impl UdpTransport {
    /// Bind to `config.transport.bind_address`.
    #[instrument(skip(config), fields(bind_address = %config.transport.bind_address))]
    pub async fn bind(config: &ProtocolConfig) -> Result<Self> {
        let socket = UdpSocket::bind(&config.transport.bind_address).await?;
        Self::from_socket(socket, config)
    }

    /// Wrap an already bound socket.
    ///
    /// Fails with `ConfigError` when `config` does not validate, e.g. when a
    /// START frame of `frame_size` would not fit `max_packet_size`.
    pub fn from_socket(socket: UdpSocket, config: &ProtocolConfig) -> Result<Self> {
        config.validate_strict()?;
        let fragmenter = Fragmenter::new(config.session.frame_size)?;
        let codec = FrameCodec::with_max_packet_size(config.transport.max_packet_size);
        let local = socket.local_addr()?;
        info!(%local, frame_size = fragmenter.frame_size(), "UDP transport ready");

        Ok(Self {
            framed: UdpFramed::new(socket, codec),
            sessions: Arc::new(SessionTable::new(&config.session)),
            fragmenter,
            session_timeout: config.session.session_timeout,
            eviction_interval: config.session.eviction_interval,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.framed.get_ref().local_addr()?)
    }

    /// Shared handle to the inbound session table.
    pub fn sessions(&self) -> Arc<SessionTable<SocketAddr>> {
        Arc::clone(&self.sessions)
    }

    /// Fragment `message` and send every frame to `destination`.
    ///
    /// Returns the number of frames sent. No pacing or acknowledgment.
    #[instrument(skip(self, message), fields(bytes = message.len()))]
    pub async fn send_message(
        &mut self,
        destination: SocketAddr,
        session_id: u8,
        message: &Message,
    ) -> Result<usize> {
        let _timer = Timer::start("udp_send_message");
        let frames = self
            .fragmenter
            .fragment(message.header(), message.payload(), session_id)?;
        let count = frames.len();

        for frame in frames {
            self.framed.send((frame, destination)).await?;
        }

        debug!(%destination, session_id, frames = count, "Message sent");
        Ok(count)
    }

    /// Receive datagrams until some session completes.
    ///
    /// Undecodable and rejected frames are dropped. ICMP errors surfaced as
    /// connection reset or refused are skipped; any other socket error ends
    /// the call early.
    pub async fn recv_message(&mut self) -> Result<(SocketAddr, Message)> {
        loop {
            let Some(next) = self.framed.next().await else {
                return Err(ProtocolError::ConnectionClosed);
            };

            match next {
                Ok((frame, source)) => {
                    global_metrics().frames_decoded(1);
                    match self.sessions.dispatch_frame(&source, frame) {
                        Ok(Some(message)) => return Ok((source, message)),
                        // Rejections are logged by the session table.
                        Ok(None) | Err(_) => {}
                    }
                }
                Err(ProtocolError::Io(e)) if is_transient(&e) => {
                    warn!(error = %e, "Ignoring transient socket error");
                }
                Err(ProtocolError::Io(e)) => return Err(ProtocolError::Io(e)),
                Err(e) => {
                    global_metrics().frame_malformed();
                    warn!(error = %e, "Dropping undecodable datagram");
                }
            }
        }
    }

    /// Drive the socket until `shutdown_rx` fires or `inbound` is dropped.
    ///
    /// Sends queued outbound messages, forwards reassembled inbound messages,
    /// and sweeps stale sessions every `eviction_interval`.
    #[instrument(skip_all)]
    pub async fn run(
        mut self,
        inbound: mpsc::Sender<(SocketAddr, Message)>,
        mut outbound: mpsc::Receiver<OutboundMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) -> Result<()> {
        let period = self.eviction_interval.max(Duration::from_millis(1));
        let mut sweep = tokio::time::interval(period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutting down UDP transport");
                    return Ok(());
                }

                _ = sweep.tick() => {
                    if self.sessions.evict_stale(self.session_timeout)? > 0 {
                        global_metrics().log_metrics();
                    }
                }

                Some(out) = outbound.recv() => {
                    if let Err(e) = self
                        .send_message(out.destination, out.session_id, &out.message)
                        .await
                    {
                        warn!(destination = %out.destination, error = %e, "Failed to send message");
                    }
                }

                received = self.recv_message() => {
                    let (source, message) = received?;
                    if inbound.send((source, message)).await.is_err() {
                        info!("Inbound receiver dropped, stopping UDP transport");
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Errors a UDP socket reports for a single unreachable peer.
fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_peer_errors_are_transient() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionRefused)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::UnexpectedEof)));
    }
}
