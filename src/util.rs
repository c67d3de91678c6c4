use std::pin::Pin;
use std::time::SystemTime;
use tokio::net::TcpStream;
use tokio_websockets::{MaybeTlsStream, WebSocketStream};

/// [`tokio_websockets`] connection to the voice gateway.
pub type WsConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Boxed `async` block with a `Debug` implementation, polled by hand from
/// the session's `poll_next`.
pub struct ConnectionFuture<T, E>(pub Pin<Box<dyn Future<Output = Result<T, E>> + Send>>);

impl<T, E> ConnectionFuture<T, E> {
    #[must_use]
    pub fn new<F: Future<Output = Result<T, E>> + Send + 'static>(future: F) -> Self {
        Self(Box::pin(future))
    }
}

impl<T, E> std::fmt::Debug for ConnectionFuture<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ConnectionFuture")
            .field(&"<async fn>")
            .finish()
    }
}

/// Milliseconds since the Unix epoch, as the heartbeat nonce expects.
#[must_use]
pub fn unix_millis() -> u64 {
    let millis = SystemTime::UNIX_EPOCH
        .elapsed()
        .unwrap_or_default()
        .as_millis();

    u64::try_from(millis).unwrap_or(u64::MAX)
}
