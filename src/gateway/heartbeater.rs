use std::borrow::Cow;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use phonic_types::payload::outgoing::Heartbeat;

use crate::util::unix_millis;

pub(crate) struct Heartbeater {
    /// Interval of how often the client must send heartbeats.
    pub(crate) interval: Interval,

    /// A list of latencies observed during the heartbeat process.
    latencies: VecDeque<Duration>,

    /// Last sequence number received from the server, echoed in every
    /// heartbeat.
    seq_ack: Option<u64>,

    /// When the unacknowledged heartbeat was sent, if any.
    sent: Option<Instant>,
}

// Older samples are dropped past this many.
const LATENCIES_MAX_LEN: usize = 1000;

impl Heartbeater {
    /// Starts ticking one `period` from now.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            interval,
            latencies: VecDeque::new(),
            seq_ack: None,
            sent: None,
        }
    }

    #[must_use]
    pub fn info(&self) -> HeartbeatInfo<'_> {
        HeartbeatInfo {
            latencies: Cow::Borrowed(&self.latencies),
            seq_ack: self.seq_ack,
        }
    }

    /// Whether a heartbeat is still waiting for its acknowledgement.
    #[must_use]
    pub const fn has_sent(&self) -> bool {
        self.sent.is_some()
    }

    /// Remembers the sequence number of a server message.
    pub fn record_seq(&mut self, seq: u64) {
        self.seq_ack = Some(self.seq_ack.map_or(seq, |current| current.max(seq)));
    }

    /// Builds the next heartbeat payload and marks it as sent.
    pub fn heartbeat(&mut self) -> Heartbeat {
        self.sent = Some(Instant::now());
        Heartbeat {
            t: unix_millis(),
            seq_ack: self.seq_ack,
        }
    }

    /// Records the acknowledgement of the pending heartbeat and returns the
    /// measured round trip.
    ///
    /// The latency is derived from the echoed send time when the server
    /// echoes one, and from the local send instant otherwise. Returns `None`
    /// when nothing was pending.
    pub fn acknowledged(&mut self, echoed: Option<u64>) -> Option<Duration> {
        let sent = self.sent.take()?;
        let latency = match echoed {
            Some(t) => Duration::from_millis(unix_millis().saturating_sub(t)),
            None => sent.elapsed(),
        };

        if self.latencies.len() == LATENCIES_MAX_LEN {
            self.latencies.pop_front();
        }
        self.latencies.push_back(latency);
        Some(latency)
    }
}

impl std::fmt::Debug for Heartbeater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heartbeater")
            .field("interval", &self.interval.period())
            .field("latencies", &self.latencies.len())
            .field("seq_ack", &self.seq_ack)
            .field("sent", &self.sent.is_some())
            .finish_non_exhaustive()
    }
}

/// Heartbeat statistics of the control connection at the time
/// [`VoiceGateway::heartbeat`] was called.
///
/// [`VoiceGateway::heartbeat`]: super::VoiceGateway::heartbeat
pub struct HeartbeatInfo<'a> {
    latencies: Cow<'a, VecDeque<Duration>>,
    seq_ack: Option<u64>,
}

impl std::fmt::Debug for HeartbeatInfo<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatInfo")
            .field("samples", &self.latencies.len())
            .field("seq_ack", &self.seq_ack)
            .finish_non_exhaustive()
    }
}

impl HeartbeatInfo<'_> {
    /// Clones the latencies into an owned [`HeartbeatInfo`].
    #[must_use]
    pub fn to_owned(&self) -> HeartbeatInfo<'static> {
        HeartbeatInfo {
            latencies: Cow::Owned(self.latencies.as_ref().clone()),
            seq_ack: self.seq_ack,
        }
    }

    /// Mean of the recorded latencies, `None` before the first
    /// acknowledgement.
    #[must_use]
    pub fn average(&self) -> Option<Duration> {
        let len = self.latencies.len().min(LATENCIES_MAX_LEN);

        // LATENCIES_MAX_LEN fits in a u32.
        #[allow(clippy::cast_possible_truncation)]
        self.latencies
            .iter()
            .fold(Duration::ZERO, |acc, entry| acc + *entry)
            .checked_div(len as u32)
    }

    pub fn latencies(&self) -> impl Iterator<Item = &Duration> {
        self.latencies.iter()
    }

    /// Latency of the most recent acknowledgement.
    #[must_use]
    pub fn recent(&self) -> Option<Duration> {
        self.latencies.back().copied()
    }

    /// Sequence number the next heartbeat will acknowledge.
    #[must_use]
    pub const fn seq_ack(&self) -> Option<u64> {
        self.seq_ack
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::{Duration, Heartbeater, LATENCIES_MAX_LEN};
    use crate::util::unix_millis;

    #[tokio::test]
    async fn should_stay_exactly_in_latencies_max_length() {
        let mut hbr = Heartbeater::new(Duration::from_secs(1));
        hbr.latencies.push_back(Duration::from_secs(1));

        (1..LATENCIES_MAX_LEN).for_each(|_| hbr.latencies.push_back(Duration::ZERO));
        hbr.heartbeat();
        hbr.acknowledged(Some(unix_millis() - 5));

        assert_eq!(hbr.latencies.len(), LATENCIES_MAX_LEN);
        assert_ne!(hbr.latencies[0], Duration::from_secs(1));
        assert_ne!(hbr.latencies[LATENCIES_MAX_LEN - 1], Duration::ZERO);
    }

    #[tokio::test]
    async fn latency_from_echoed_timestamp() {
        let mut hbr = Heartbeater::new(Duration::from_millis(5000));
        hbr.heartbeat();

        let latency = hbr.acknowledged(Some(unix_millis() - 150)).unwrap();
        assert!(latency >= Duration::from_millis(150), "{latency:?}");
        assert!(latency < Duration::from_millis(250), "{latency:?}");
        assert_eq!(hbr.info().recent(), Some(latency));
        assert!(!hbr.has_sent());
    }

    #[tokio::test]
    async fn unsolicited_ack_is_ignored() {
        let mut hbr = Heartbeater::new(Duration::from_secs(1));
        assert_eq!(hbr.acknowledged(Some(unix_millis())), None);
        assert_eq!(hbr.info().average(), None);
    }

    #[tokio::test]
    async fn heartbeat_echoes_highest_seq() {
        let mut hbr = Heartbeater::new(Duration::from_secs(1));
        assert_eq!(hbr.heartbeat().seq_ack, None);

        hbr.record_seq(7);
        hbr.record_seq(3);
        let heartbeat = hbr.heartbeat();
        assert_eq!(heartbeat.seq_ack, Some(7));
        assert!(heartbeat.t > 0);
        assert!(hbr.has_sent());
    }

    #[tokio::test]
    async fn average_of_samples() {
        let mut hbr = Heartbeater::new(Duration::from_secs(1));
        hbr.latencies.extend([Duration::from_millis(100), Duration::from_millis(300)]);
        assert_eq!(hbr.info().average(), Some(Duration::from_millis(200)));
        assert_eq!(hbr.info().to_owned().recent(), Some(Duration::from_millis(300)));
    }
}
