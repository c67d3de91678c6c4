use audiopus::coder::Encoder;
use audiopus::{Application, Bitrate, Channels, SampleRate};
use std::error::Error;
use std::fmt::Display;

use crate::rtp::clock::FRAME_SAMPLES;

/// Interleaved stereo samples in one 20 ms frame.
pub const STEREO_FRAME_LEN: usize = FRAME_SAMPLES as usize * 2;

/// Largest Opus packet the encoder may produce.
const MAX_PACKET_LEN: usize = 1275;

/// Encodes 48 kHz stereo PCM into the Opus frames a voice session sends.
pub struct OpusEncoder {
    inner: Encoder,
    buffer: Box<[u8; MAX_PACKET_LEN]>,
}

impl std::fmt::Debug for OpusEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpusEncoder").finish_non_exhaustive()
    }
}

impl OpusEncoder {
    pub fn new() -> Result<Self, OpusEncoderError> {
        let inner = Encoder::new(SampleRate::Hz48000, Channels::Stereo, Application::Audio)
            .map_err(|source| OpusEncoderError {
                kind: OpusEncoderErrorType::Creating,
                source: Some(Box::new(source)),
            })?;

        Ok(Self {
            inner,
            buffer: Box::new([0; MAX_PACKET_LEN]),
        })
    }

    pub fn set_bitrate(&mut self, bits_per_second: i32) -> Result<(), OpusEncoderError> {
        self.inner
            .set_bitrate(Bitrate::BitsPerSecond(bits_per_second))
            .map_err(|source| OpusEncoderError {
                kind: OpusEncoderErrorType::Configuring,
                source: Some(Box::new(source)),
            })
    }

    /// Encodes exactly one frame of interleaved samples.
    pub fn encode(&mut self, pcm: &[f32]) -> Result<Vec<u8>, OpusEncoderError> {
        if pcm.len() != STEREO_FRAME_LEN {
            return Err(OpusEncoderError {
                kind: OpusEncoderErrorType::FrameSize { len: pcm.len() },
                source: None,
            });
        }

        let len = self
            .inner
            .encode_float(pcm, &mut self.buffer[..])
            .map_err(|source| OpusEncoderError {
                kind: OpusEncoderErrorType::Encoding,
                source: Some(Box::new(source)),
            })?;

        Ok(self.buffer[..len].to_vec())
    }
}

#[derive(Debug)]
pub struct OpusEncoderError {
    pub(crate) kind: OpusEncoderErrorType,
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl OpusEncoderError {
    #[must_use]
    pub fn kind(&self) -> &OpusEncoderErrorType {
        &self.kind
    }
}

impl Display for OpusEncoderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            OpusEncoderErrorType::Creating => f.write_str("could not create Opus encoder"),
            OpusEncoderErrorType::Configuring => f.write_str("could not configure Opus encoder"),
            OpusEncoderErrorType::Encoding => f.write_str("could not encode PCM to Opus"),
            OpusEncoderErrorType::FrameSize { len } => {
                f.write_str("PCM frame must hold 1920 interleaved samples: len=")?;
                Display::fmt(len, f)
            }
        }
    }
}

impl Error for OpusEncoderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn Error + 'static))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OpusEncoderErrorType {
    Creating,
    Configuring,
    Encoding,
    /// Input was not exactly one 20 ms stereo frame.
    FrameSize { len: usize },
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::{OpusEncoder, OpusEncoderErrorType, STEREO_FRAME_LEN};

    #[test]
    fn encodes_one_frame() {
        let mut encoder = OpusEncoder::new().unwrap();
        let frame = encoder.encode(&[0.0; STEREO_FRAME_LEN]).unwrap();
        assert!(!frame.is_empty());
        assert!(frame.len() <= 1275);
    }

    #[test]
    fn rejects_partial_frames() {
        let mut encoder = OpusEncoder::new().unwrap();
        let error = encoder.encode(&[0.0; 960]).unwrap_err();
        assert_eq!(*error.kind(), OpusEncoderErrorType::FrameSize { len: 960 });
    }
}
