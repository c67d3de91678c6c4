/// Samples per channel in one 20 ms Opus frame at 48 kHz.
pub const FRAME_SAMPLES: u32 = 960;

/// Sequence number and timestamp source for outgoing packets.
///
/// Both counters wrap around instead of saturating. The clock advances by
/// exactly one frame per packet no matter how much wall time passed, so
/// receivers see a gap-free stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceClock {
    sequence: u16,
    timestamp: u32,
    frame_samples: u32,
}

impl SequenceClock {
    #[must_use]
    pub const fn new(sequence: u16, timestamp: u32) -> Self {
        Self {
            sequence,
            timestamp,
            frame_samples: FRAME_SAMPLES,
        }
    }

    /// Starts from random values, which is what receivers expect from a
    /// fresh RTP stream.
    #[must_use]
    pub fn random() -> Self {
        Self::new(fastrand::u16(..), fastrand::u32(..))
    }

    /// Overrides the number of samples a single frame advances the
    /// timestamp by.
    #[must_use]
    pub const fn with_frame_samples(mut self, frame_samples: u32) -> Self {
        self.frame_samples = frame_samples;
        self
    }

    #[must_use]
    pub const fn sequence(&self) -> u16 {
        self.sequence
    }

    #[must_use]
    pub const fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Returns the values for the next packet and advances the clock.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> (u16, u32) {
        let current = (self.sequence, self.timestamp);
        self.sequence = self.sequence.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(self.frame_samples);
        current
    }
}

#[cfg(test)]
mod tests {
    use super::{FRAME_SAMPLES, SequenceClock};

    #[test]
    fn sequence_wraps_to_zero() {
        let mut clock = SequenceClock::new(u16::MAX, 0);
        assert_eq!(clock.next(), (u16::MAX, 0));
        assert_eq!(clock.sequence(), 0);
    }

    #[test]
    fn full_sequence_cycle() {
        let mut clock = SequenceClock::new(1234, 0);
        for _ in 0..65536 {
            clock.next();
        }
        assert_eq!(clock.sequence(), 1234);
    }

    #[test]
    fn timestamp_wraps() {
        let mut clock = SequenceClock::new(0, u32::MAX);
        clock.next();
        assert_eq!(clock.timestamp(), 959);
    }

    #[test]
    fn custom_frame_size() {
        let mut clock = SequenceClock::new(0, 0).with_frame_samples(FRAME_SAMPLES / 2);
        clock.next();
        clock.next();
        assert_eq!(clock.timestamp(), FRAME_SAMPLES);
    }
}
