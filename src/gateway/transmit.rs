use std::borrow::Cow;

use crate::crypto::{AeadError, VoiceGroupCrypto};
use crate::rtp::{self, SequenceClock};

/// An Opus frame of digital silence.
pub const SILENCE_FRAME: [u8; 3] = [0xF8, 0xFF, 0xFE];

/// Silence frames sent after the last queued frame so that receivers do
/// not interpolate across the gap.
pub const SILENCE_FRAMES: u8 = 5;

/// Outgoing half of a voice session: numbers, seals and frames packets.
#[derive(Debug)]
pub(crate) struct Transmitter {
    clock: SequenceClock,
    silence_left: u8,
    ssrc: u32,
}

impl Transmitter {
    #[must_use]
    pub fn new(ssrc: u32, clock: SequenceClock) -> Self {
        Self {
            clock,
            silence_left: 0,
            ssrc,
        }
    }

    /// Picks what to send on this pacing tick: the queued frame if there is
    /// one, a silence frame while the trailing silence lasts, or nothing.
    pub fn next_frame(&mut self, queued: Option<Vec<u8>>) -> Option<Cow<'static, [u8]>> {
        match queued {
            Some(frame) => {
                self.silence_left = SILENCE_FRAMES;
                Some(Cow::Owned(frame))
            }
            None if self.silence_left > 0 => {
                self.silence_left -= 1;
                Some(Cow::Borrowed(&SILENCE_FRAME))
            }
            None => None,
        }
    }

    /// Builds the encrypted datagram for one frame, advancing the clock.
    pub fn packet(&mut self, opus: &[u8], crypto: &mut VoiceGroupCrypto) -> Result<Vec<u8>, AeadError> {
        let (sequence, timestamp) = self.clock.next();
        let header = rtp::encode_header(sequence, timestamp, self.ssrc);
        let sealed = crypto.encrypt(opus, &header)?;
        Ok(rtp::encode_packet(&header, &sealed))
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::{SILENCE_FRAME, SILENCE_FRAMES, Transmitter};
    use crate::crypto::{EncryptMode, TransportSecrets, VoiceGroupCrypto};
    use crate::rtp::{self, SequenceClock};

    #[test]
    fn trailing_silence_after_queue_drains() {
        let mut transmitter = Transmitter::new(1, SequenceClock::new(0, 0));
        assert!(transmitter.next_frame(None).is_none());

        assert_eq!(
            transmitter.next_frame(Some(vec![1, 2, 3])).as_deref(),
            Some(&[1, 2, 3][..])
        );
        for _ in 0..SILENCE_FRAMES {
            assert_eq!(
                transmitter.next_frame(None).as_deref(),
                Some(&SILENCE_FRAME[..])
            );
        }
        assert!(transmitter.next_frame(None).is_none());
    }

    #[test]
    fn packets_are_gapless() {
        let mut crypto = VoiceGroupCrypto::new(&TransportSecrets {
            mode: EncryptMode::XChaCha20Poly1305,
            secret_key: [3; 32],
            ssrc: 77,
        });
        let mut transmitter = Transmitter::new(77, SequenceClock::new(u16::MAX, 0));

        let first = transmitter.packet(b"one", &mut crypto).unwrap();
        let second = transmitter.packet(b"two", &mut crypto).unwrap();

        let first = rtp::decode_packet(&first, &crypto).unwrap();
        let second = rtp::decode_packet(&second, &crypto).unwrap();
        assert_eq!((first.sequence, first.timestamp), (u16::MAX, 0));
        assert_eq!((second.sequence, second.timestamp), (0, 960));
        assert_eq!(second.ssrc, 77);
        assert_eq!(second.payload, b"two");
    }
}
