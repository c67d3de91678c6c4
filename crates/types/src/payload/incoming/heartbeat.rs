use serde::{Deserialize, Serialize};

// Voice Hello differs from the main gateway one: the interval may be a
// floating number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Hash, Serialize)]
pub struct Hello {
    /// Interval in milliseconds.
    #[serde(with = "crate::deserializers::millis_from_f64")]
    pub heartbeat_interval: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Hash, Serialize)]
pub struct HeartbeatAck {
    /// Unix timestamp in milliseconds echoed back from the heartbeat.
    #[serde(default)]
    pub t: Option<u64>,
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::{HeartbeatAck, Hello};

    #[test]
    fn hello_accepts_float_interval() {
        let hello: Hello = serde_json::from_str(r#"{"heartbeat_interval":13750.0}"#).unwrap();
        assert_eq!(hello.heartbeat_interval, 13750);

        let hello: Hello = serde_json::from_str(r#"{"heartbeat_interval":5000}"#).unwrap();
        assert_eq!(hello.heartbeat_interval, 5000);

        assert!(serde_json::from_str::<Hello>(r#"{"heartbeat_interval":-1.0}"#).is_err());
    }

    #[test]
    fn ack_without_timestamp() {
        let ack: HeartbeatAck = serde_json::from_str("{}").unwrap();
        assert_eq!(ack.t, None);

        let ack: HeartbeatAck = serde_json::from_str(r#"{"t":1501184119561}"#).unwrap();
        assert_eq!(ack.t, Some(1_501_184_119_561));
    }
}
