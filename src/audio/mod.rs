//! Boundary between the transport and audio producers or consumers.

mod encoder;

pub use self::encoder::{OpusEncoder, OpusEncoderError, OpusEncoderErrorType, STEREO_FRAME_LEN};

use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

/// Received packets buffered for a slow consumer before new ones are
/// dropped; ten seconds of a single stream.
pub(crate) const RECEIVE_QUEUE_LEN: usize = 500;

/// A decrypted Opus frame from a remote stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePacket {
    pub ssrc: u32,
    /// Resolved from speaking notifications; `None` until the first one
    /// for this SSRC arrived.
    pub user_id: Option<Id<UserMarker>>,
    pub sequence: u16,
    pub timestamp: u32,
    pub opus: Vec<u8>,
}

/// Receiving end of the audio a voice session decrypts.
///
/// Usable from both blocking and async code. Every clone receives a share
/// of the packets, not a copy.
#[derive(Debug, Clone)]
pub struct VoiceReceiver {
    inner: flume::Receiver<VoicePacket>,
}

impl VoiceReceiver {
    pub(crate) fn channel() -> (flume::Sender<VoicePacket>, Self) {
        let (tx, rx) = flume::bounded(RECEIVE_QUEUE_LEN);
        (tx, Self { inner: rx })
    }

    /// Blocks until a packet arrives; `None` once the session is gone.
    #[must_use]
    pub fn recv(&self) -> Option<VoicePacket> {
        self.inner.recv().ok()
    }

    pub async fn recv_async(&self) -> Option<VoicePacket> {
        self.inner.recv_async().await.ok()
    }

    #[must_use]
    pub fn try_recv(&self) -> Option<VoicePacket> {
        self.inner.try_recv().ok()
    }

    /// Number of packets waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Turns the receiver into a [`futures::Stream`] of packets.
    #[must_use]
    pub fn into_stream(self) -> flume::r#async::RecvStream<'static, VoicePacket> {
        self.inner.into_stream()
    }
}
