pub mod binary;
pub mod incoming;
pub mod outgoing;
pub mod speaking;

pub use self::speaking::Speaking;

use serde::Deserialize;
use serde::de::{DeserializeSeed, IgnoredAny, MapAccess, Unexpected};

use twilight_model::gateway::event::GatewayEventDeserializer;

#[allow(clippy::wildcard_imports)]
use self::incoming::*;
use crate::OpCode;

/// Any event the voice gateway may send to a client.
///
/// Each variant carries only the fields its opcode defines. Binary-framed
/// opcodes carry their raw payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    ClientConnect(ClientConnect),
    ClientDisconnect(ClientDisconnect),
    HeartbeatAck(HeartbeatAck),
    Hello(Hello),
    Ready(Ready),
    Resumed,
    SessionDescription(SessionDescription),
    Speaking(Speaking),
    PrepareTransition(PrepareTransition),
    ExecuteTransition(ExecuteTransition),
    PrepareEpoch(PrepareEpoch),
    MlsExternalSender(Vec<u8>),
    MlsProposals(Vec<u8>),
    MlsAnnounceCommitTransition(MlsTransitionMessage),
    MlsWelcome(MlsTransitionMessage),
}

impl Event {
    /// Opcode this event was received with.
    #[must_use]
    pub const fn opcode(&self) -> OpCode {
        match self {
            Self::ClientConnect(_) => OpCode::ClientConnect,
            Self::ClientDisconnect(_) => OpCode::ClientDisconnect,
            Self::HeartbeatAck(_) => OpCode::HeartbeatAck,
            Self::Hello(_) => OpCode::Hello,
            Self::Ready(_) => OpCode::Ready,
            Self::Resumed => OpCode::Resumed,
            Self::SessionDescription(_) => OpCode::SessionDescription,
            Self::Speaking(_) => OpCode::Speaking,
            Self::PrepareTransition(_) => OpCode::PrepareTransition,
            Self::ExecuteTransition(_) => OpCode::ExecuteTransition,
            Self::PrepareEpoch(_) => OpCode::PrepareEpoch,
            Self::MlsExternalSender(_) => OpCode::MlsExternalSender,
            Self::MlsProposals(_) => OpCode::MlsProposals,
            Self::MlsAnnounceCommitTransition(_) => OpCode::MlsAnnounceCommitTransition,
            Self::MlsWelcome(_) => OpCode::MlsWelcome,
        }
    }
}

/// [`Event`] together with the sequence number the server stamped it with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoiceGatewayEvent {
    pub seq: Option<u64>,
    pub event: Event,
}

pub struct VoiceGatewayEventDeserializer<'a>(GatewayEventDeserializer<'a>);

impl<'a> VoiceGatewayEventDeserializer<'a> {
    /// Create a new voice gateway deserializer from the gateway deserializer.
    #[must_use]
    pub fn new(deserializer: GatewayEventDeserializer<'a>) -> Self {
        Self(deserializer)
    }

    /// Create a deserializer with an owned event type.
    #[must_use]
    pub fn into_owned(self) -> VoiceGatewayEventDeserializer<'static> {
        VoiceGatewayEventDeserializer(self.0.into_owned())
    }
}

impl<'a> std::ops::Deref for VoiceGatewayEventDeserializer<'a> {
    type Target = GatewayEventDeserializer<'a>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(field_identifier, rename_all = "lowercase")]
enum Field {
    D,
    Op,
    Seq,
    #[serde(other)]
    Other,
}

static RECEIVABLE_OPCODES: &[&str] = &[
    "CLIENT_CONNECT",
    "CLIENT_DISCONNECT",
    "HEARTBEAT_ACK",
    "HELLO",
    "READY",
    "RESUMED",
    "SESSION_DESCRIPTION",
    "SPEAKING",
    "PREPARE_TRANSITION",
    "EXECUTE_TRANSITION",
    "PREPARE_EPOCH",
];

struct VoiceGatewayEventVisitor(u8);

impl VoiceGatewayEventVisitor {
    fn data<'de, V: MapAccess<'de>>(op: OpCode, map: &mut V) -> Result<Event, V::Error> {
        Ok(match op {
            OpCode::ClientConnect => Event::ClientConnect(map.next_value()?),
            OpCode::ClientDisconnect => Event::ClientDisconnect(map.next_value()?),
            OpCode::HeartbeatAck => Event::HeartbeatAck(map.next_value()?),
            OpCode::Hello => Event::Hello(map.next_value()?),
            OpCode::Ready => Event::Ready(map.next_value()?),
            OpCode::Resumed => {
                map.next_value::<IgnoredAny>()?;
                Event::Resumed
            }
            OpCode::SessionDescription => Event::SessionDescription(map.next_value()?),
            OpCode::Speaking => Event::Speaking(map.next_value()?),
            OpCode::PrepareTransition => Event::PrepareTransition(map.next_value()?),
            OpCode::ExecuteTransition => Event::ExecuteTransition(map.next_value()?),
            OpCode::PrepareEpoch => Event::PrepareEpoch(map.next_value()?),
            other => {
                let name = if other.is_binary() {
                    "binary opcode in a text frame"
                } else {
                    "client-only opcode"
                };
                return Err(serde::de::Error::unknown_variant(name, RECEIVABLE_OPCODES));
            }
        })
    }
}

impl<'de> serde::de::Visitor<'de> for VoiceGatewayEventVisitor {
    type Value = VoiceGatewayEvent;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("struct VoiceGatewayEvent")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let op = OpCode::from(self.0).ok_or_else(|| {
            let unexpected = Unexpected::Unsigned(u64::from(self.0));
            serde::de::Error::invalid_value(unexpected, &"an opcode")
        })?;

        let mut event = None;
        let mut seq = None;

        while let Some(key) = map.next_key::<Field>()? {
            match key {
                Field::D => event = Some(Self::data(op, &mut map)?),
                Field::Seq => seq = map.next_value::<Option<u64>>()?,
                Field::Op | Field::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        let event = match (event, op) {
            (Some(event), _) => event,
            (None, OpCode::Resumed) => Event::Resumed,
            (None, _) => return Err(serde::de::Error::missing_field("d")),
        };

        Ok(VoiceGatewayEvent { seq, event })
    }
}

impl<'de> DeserializeSeed<'de> for VoiceGatewayEventDeserializer<'_> {
    type Value = VoiceGatewayEvent;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        const FIELDS: &[&str] = &["op", "d", "seq"];

        deserializer.deserialize_struct(
            "VoiceGatewayEvent",
            FIELDS,
            VoiceGatewayEventVisitor(self.op()),
        )
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::{Event, VoiceGatewayEvent, VoiceGatewayEventDeserializer};
    use crate::payload::incoming::{Hello, PrepareTransition};
    use pretty_assertions::assert_eq;
    use serde::de::DeserializeSeed;
    use twilight_model::gateway::event::GatewayEventDeserializer;

    fn parse(json: &str) -> Result<VoiceGatewayEvent, serde_json::Error> {
        let deserializer = GatewayEventDeserializer::from_json(json).unwrap();
        let mut json = serde_json::Deserializer::from_str(json);
        VoiceGatewayEventDeserializer::new(deserializer).deserialize(&mut json)
    }

    #[test]
    fn hello_with_seq() {
        let event = parse(r#"{"op":8,"seq":3,"d":{"heartbeat_interval":5000.0}}"#).unwrap();
        assert_eq!(
            event,
            VoiceGatewayEvent {
                seq: Some(3),
                event: Event::Hello(Hello {
                    heartbeat_interval: 5000
                }),
            }
        );
    }

    #[test]
    fn data_before_opcode() {
        let event = parse(r#"{"d":{"transition_id":4,"protocol_version":0},"op":21}"#).unwrap();
        assert_eq!(
            event.event,
            Event::PrepareTransition(PrepareTransition {
                transition_id: 4,
                protocol_version: 0,
            })
        );
        assert_eq!(event.seq, None);
    }

    #[test]
    fn resumed_without_data() {
        let event = parse(r#"{"op":9,"d":null}"#).unwrap();
        assert_eq!(event.event, Event::Resumed);

        let event = parse(r#"{"op":9}"#).unwrap();
        assert_eq!(event.event, Event::Resumed);
    }

    #[test]
    fn rejects_client_only_opcodes() {
        assert!(parse(r#"{"op":0,"d":{}}"#).is_err());
        assert!(parse(r#"{"op":3,"d":{"t":1}}"#).is_err());
    }

    #[test]
    fn missing_data() {
        assert!(parse(r#"{"op":2,"seq":1}"#).is_err());
    }
}
