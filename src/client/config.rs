use std::time::Duration;

use crate::rtp::clock::FRAME_SAMPLES;

/// Tunables of a voice session.
///
/// The defaults match what Discord voice servers expect; most users only
/// ever change [`tls`] to talk to a local test server.
///
/// [`tls`]: VoiceConfig::tls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceConfig {
    /// Whether to connect to the voice gateway over `wss`.
    pub tls: bool,

    /// Wait before the single reconnect attempt after a recoverable close.
    pub reconnect_delay: Duration,

    /// How long to wait for the IP discovery response.
    pub discovery_timeout: Duration,

    /// Interval of UDP keepalives. Follows the heartbeat interval if unset.
    pub udp_keepalive_interval: Option<Duration>,

    /// Pacing of outgoing voice frames.
    pub frame_duration: Duration,

    /// RTP timestamp increment per frame.
    pub frame_samples: u32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            tls: true,
            reconnect_delay: Duration::from_secs(2),
            discovery_timeout: Duration::from_secs(5),
            udp_keepalive_interval: None,
            frame_duration: Duration::from_millis(20),
            frame_samples: FRAME_SAMPLES,
        }
    }
}

impl VoiceConfig {
    #[must_use]
    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    #[must_use]
    pub fn udp_keepalive_interval(mut self, interval: Duration) -> Self {
        self.udp_keepalive_interval = Some(interval);
        self
    }
}
