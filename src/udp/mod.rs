//! Media socket of a voice session.

mod discovery;
pub mod error;

pub use self::discovery::{
    DISCOVERY_PACKET_LEN, DiscoverIpResult, discovery_request, parse_discovery_response,
};
pub use self::error::VoiceUdpError;

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::ReadBuf;
use tokio::net::UdpSocket;
use tracing::{debug, instrument, trace};

use self::error::VoiceUdpErrorType;

/// First byte of a keepalive datagram.
pub const KEEPALIVE_MARKER: u8 = 0xC9;

/// Size of a keepalive datagram: the marker plus a 64 bit counter.
pub const KEEPALIVE_LEN: usize = 9;

/// Lifecycle of a [`VoiceUdp`] socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UdpState {
    /// Connected to the voice server but the external address is unknown.
    Unbound,
    /// Discovery request was sent and the reply is pending.
    DiscoverySent,
    /// External address is known.
    Discovered,
    /// Voice packets are flowing in both directions.
    Streaming,
    /// The socket must not be used anymore.
    Closed,
}

#[must_use]
pub fn keepalive_datagram(counter: u64) -> [u8; KEEPALIVE_LEN] {
    let mut bytes = [0u8; KEEPALIVE_LEN];
    bytes[0] = KEEPALIVE_MARKER;
    bytes[1..].copy_from_slice(&counter.to_le_bytes());
    bytes
}

/// Wraps a UDP socket connected to the voice server.
///
/// The session tears down and rebuilds the socket on reconnect; this type
/// never reconnects on its own.
#[derive(Debug)]
pub struct VoiceUdp {
    keepalive_counter: u64,
    socket: Arc<UdpSocket>,
    state: UdpState,
}

impl VoiceUdp {
    /// Binds an ephemeral local port and connects it to the voice server.
    pub async fn connect(ip: IpAddr, port: u16) -> Result<Self, VoiceUdpError> {
        let local = match ip {
            IpAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            IpAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };

        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| VoiceUdpError::new(VoiceUdpErrorType::Connect, source))?;

        socket
            .connect((ip, port))
            .await
            .map_err(|source| VoiceUdpError::new(VoiceUdpErrorType::Connect, source))?;

        debug!(?ip, ?port, "connected voice UDP socket");
        Ok(Self {
            keepalive_counter: 0,
            socket: Arc::new(socket),
            state: UdpState::Unbound,
        })
    }

    #[must_use]
    pub const fn state(&self) -> UdpState {
        self.state
    }

    pub fn local_addr(&self) -> Result<SocketAddr, VoiceUdpError> {
        self.socket
            .local_addr()
            .map_err(|source| VoiceUdpError::new(VoiceUdpErrorType::Connect, source))
    }

    /// Asks the voice server which address and port it sees this socket
    /// from, so they can be announced with `SELECT_PROTOCOL`.
    ///
    /// Datagrams that are not a valid discovery response are skipped until
    /// `timeout` elapses.
    #[instrument(skip(self))]
    pub async fn discover(
        &mut self,
        ssrc: u32,
        timeout: Duration,
    ) -> Result<DiscoverIpResult, VoiceUdpError> {
        self.ensure_open()?;

        self.socket
            .send(&discovery_request(ssrc))
            .await
            .map_err(|source| VoiceUdpError::new(VoiceUdpErrorType::DiscoveringIp, source))?;
        self.state = UdpState::DiscoverySent;

        let socket = Arc::clone(&self.socket);
        let receive = async move {
            let mut buffer = [0u8; DISCOVERY_PACKET_LEN + 1];
            loop {
                let len = socket.recv(&mut buffer).await.map_err(|source| {
                    VoiceUdpError::new(VoiceUdpErrorType::DiscoveringIp, source)
                })?;

                match parse_discovery_response(&buffer[..len]) {
                    Ok(result) => break Ok(result),
                    Err(error) => trace!(?len, %error, "skipping datagram during discovery"),
                }
            }
        };

        let result = tokio::time::timeout(timeout, receive)
            .await
            .map_err(|source| VoiceUdpError::new(VoiceUdpErrorType::DiscoveryTimedOut, source))??;

        debug!(external.ip = ?result.address, external.port = result.port, "discovered external address");
        self.state = UdpState::Discovered;
        Ok(result)
    }

    /// Marks the socket as carrying voice traffic.
    pub(crate) fn start_streaming(&mut self) {
        if self.state != UdpState::Closed {
            self.state = UdpState::Streaming;
        }
    }

    /// Sends a keepalive datagram and advances the keepalive counter.
    ///
    /// The counter wraps around and is unrelated to the control channel
    /// heartbeat.
    pub fn send_keepalive(&mut self) -> Result<(), VoiceUdpError> {
        let counter = self.keepalive_counter;
        self.keepalive_counter = counter.wrapping_add(1);

        trace!(counter, "sending UDP keepalive");
        self.send(&keepalive_datagram(counter))
    }

    /// Sends a single datagram without waiting.
    ///
    /// A full socket buffer drops the datagram instead of blocking, which
    /// is the right trade for real-time audio.
    pub fn send(&self, datagram: &[u8]) -> Result<(), VoiceUdpError> {
        self.ensure_open()?;

        match self.socket.try_send(datagram) {
            Ok(_) => Ok(()),
            Err(error) if error.kind() == ErrorKind::WouldBlock => {
                trace!(len = datagram.len(), "UDP send buffer is full, dropping datagram");
                Ok(())
            }
            Err(source) => Err(VoiceUdpError::new(VoiceUdpErrorType::Sending, source)),
        }
    }

    /// Polls for the next datagram, returning its length in `buffer`.
    pub fn poll_recv(
        &self,
        cx: &mut Context<'_>,
        buffer: &mut [u8],
    ) -> Poll<Result<usize, VoiceUdpError>> {
        if self.state == UdpState::Closed {
            return Poll::Ready(Err(Self::closed()));
        }

        let mut buffer = ReadBuf::new(buffer);
        match self.socket.poll_recv(cx, &mut buffer) {
            Poll::Ready(Ok(())) => Poll::Ready(Ok(buffer.filled().len())),
            Poll::Ready(Err(source)) => Poll::Ready(Err(VoiceUdpError::new(
                VoiceUdpErrorType::Receiving,
                source,
            ))),
            Poll::Pending => Poll::Pending,
        }
    }

    /// Stops using the socket; it is released once every clone is dropped.
    pub fn close(&mut self) {
        self.state = UdpState::Closed;
    }

    fn ensure_open(&self) -> Result<(), VoiceUdpError> {
        if self.state == UdpState::Closed {
            Err(Self::closed())
        } else {
            Ok(())
        }
    }

    fn closed() -> VoiceUdpError {
        VoiceUdpError {
            kind: VoiceUdpErrorType::Closed,
            source: None,
        }
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::{KEEPALIVE_MARKER, UdpState, VoiceUdp, keepalive_datagram};
    use crate::udp::error::VoiceUdpErrorType;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tokio::net::UdpSocket;

    #[test]
    fn keepalive_layout() {
        assert_eq!(
            keepalive_datagram(0x0102),
            [KEEPALIVE_MARKER, 0x02, 0x01, 0, 0, 0, 0, 0, 0]
        );
    }

    #[tokio::test]
    async fn keepalive_counter_increments() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        let mut udp = VoiceUdp::connect(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
            .await
            .unwrap();
        udp.keepalive_counter = u64::MAX;
        udp.send_keepalive().unwrap();
        udp.send_keepalive().unwrap();

        let mut buffer = [0u8; 16];
        let len = server.recv(&mut buffer).await.unwrap();
        assert_eq!(&buffer[..len], &keepalive_datagram(u64::MAX));
        let len = server.recv(&mut buffer).await.unwrap();
        assert_eq!(&buffer[..len], &keepalive_datagram(0));
    }

    #[tokio::test]
    async fn discovery_times_out() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        let mut udp = VoiceUdp::connect(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
            .await
            .unwrap();
        let error = udp
            .discover(1, Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(error.kind(), VoiceUdpErrorType::DiscoveryTimedOut));
        assert_eq!(udp.state(), UdpState::DiscoverySent);
    }

    #[tokio::test]
    async fn closed_socket_rejects_sends() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        let mut udp = VoiceUdp::connect(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
            .await
            .unwrap();
        udp.close();

        assert!(matches!(
            udp.send(b"opus").unwrap_err().kind(),
            VoiceUdpErrorType::Closed
        ));
    }
}
