use phonic_types::payload::speaking::SpeakingFlags;
use tokio::sync::mpsc;
use twilight_model::gateway::CloseFrame;

/// Opus frames buffered ahead of the pacing timer; one second of audio.
pub(crate) const FRAME_QUEUE_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum VoiceCommand {
    Speaking(SpeakingFlags),
    Close(CloseFrame<'static>),
}

#[derive(Debug)]
pub(crate) struct MessageChannel {
    command_tx: mpsc::UnboundedSender<VoiceCommand>,
    pub(crate) command_rx: mpsc::UnboundedReceiver<VoiceCommand>,

    frame_tx: flume::Sender<Vec<u8>>,
    pub(crate) frame_rx: flume::Receiver<Vec<u8>>,
}

impl MessageChannel {
    #[must_use]
    pub fn new() -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = flume::bounded(FRAME_QUEUE_LEN);

        Self {
            command_tx,
            command_rx,
            frame_tx,
            frame_rx,
        }
    }

    #[must_use]
    pub fn sender(&self) -> VoiceClientSender {
        VoiceClientSender {
            command_tx: self.command_tx.clone(),
            frame_tx: self.frame_tx.clone(),
        }
    }
}

/// Handle to drive a voice session from other tasks or threads.
///
/// Commands are processed in order by the session's poll loop.
#[derive(Debug, Clone)]
pub struct VoiceClientSender {
    command_tx: mpsc::UnboundedSender<VoiceCommand>,
    frame_tx: flume::Sender<Vec<u8>>,
}

impl VoiceClientSender {
    /// Whether the associated session has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    /// Closes the session with the given frame. No reconnect follows.
    pub fn close(&self, frame: CloseFrame<'static>) -> Result<(), ChannelError> {
        self.command(VoiceCommand::Close(frame))
    }

    /// Announces the speaking state of this client's SSRC.
    ///
    /// Voice servers ignore audio from an SSRC that never announced
    /// itself, so send this before the first frame.
    pub fn speaking(&self, flags: SpeakingFlags) -> Result<(), ChannelError> {
        self.command(VoiceCommand::Speaking(flags))
    }

    /// Queues one Opus frame, waiting while the queue is full.
    ///
    /// The session sends one queued frame per tick of its pacing timer.
    pub async fn send_opus(&self, frame: Vec<u8>) -> Result<(), ChannelError> {
        self.frame_tx
            .send_async(frame)
            .await
            .map_err(|source| ChannelError {
                kind: ChannelErrorType::Closed,
                source: Some(Box::new(source)),
            })
    }

    /// Queues one Opus frame without waiting.
    pub fn try_send_opus(&self, frame: Vec<u8>) -> Result<(), ChannelError> {
        self.frame_tx.try_send(frame).map_err(|source| {
            let kind = match source {
                flume::TrySendError::Full(_) => ChannelErrorType::Full,
                flume::TrySendError::Disconnected(_) => ChannelErrorType::Closed,
            };
            ChannelError {
                kind,
                source: Some(Box::new(source)),
            }
        })
    }

    fn command(&self, command: VoiceCommand) -> Result<(), ChannelError> {
        self.command_tx.send(command).map_err(|source| ChannelError {
            kind: ChannelErrorType::Closed,
            source: Some(Box::new(source)),
        })
    }
}

#[derive(Debug)]
pub struct ChannelError {
    pub(crate) kind: ChannelErrorType,
    pub(crate) source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ChannelError {
    #[must_use]
    pub fn kind(&self) -> &ChannelErrorType {
        &self.kind
    }
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ChannelErrorType::Closed => f.write_str("tried sending over a closed channel"),
            ChannelErrorType::Full => f.write_str("outgoing frame queue is full"),
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ChannelErrorType {
    /// The session was dropped.
    Closed,

    /// [`FRAME_QUEUE_LEN`] frames are already waiting.
    Full,
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::{ChannelErrorType, FRAME_QUEUE_LEN, MessageChannel, VoiceClientSender, VoiceCommand};
    use phonic_types::payload::speaking::SpeakingFlags;
    use static_assertions::assert_impl_all;

    assert_impl_all!(VoiceClientSender: Clone, Send, Sync);

    #[test]
    fn commands_arrive_in_order() {
        let mut channel = MessageChannel::new();
        let sender = channel.sender();

        sender.speaking(SpeakingFlags::MICROPHONE).unwrap();
        sender.speaking(SpeakingFlags::empty()).unwrap();

        assert_eq!(
            channel.command_rx.try_recv().unwrap(),
            VoiceCommand::Speaking(SpeakingFlags::MICROPHONE)
        );
        assert_eq!(
            channel.command_rx.try_recv().unwrap(),
            VoiceCommand::Speaking(SpeakingFlags::empty())
        );
    }

    #[test]
    fn frame_queue_is_bounded() {
        let channel = MessageChannel::new();
        let sender = channel.sender();

        for _ in 0..FRAME_QUEUE_LEN {
            sender.try_send_opus(vec![0xF8, 0xFF, 0xFE]).unwrap();
        }
        let error = sender.try_send_opus(vec![1]).unwrap_err();
        assert!(matches!(error.kind(), ChannelErrorType::Full));
    }

    #[test]
    fn dropped_session_closes_sender() {
        let sender = MessageChannel::new().sender();
        assert!(sender.is_closed());
        assert!(matches!(
            sender.speaking(SpeakingFlags::MICROPHONE).unwrap_err().kind(),
            ChannelErrorType::Closed
        ));
    }
}
