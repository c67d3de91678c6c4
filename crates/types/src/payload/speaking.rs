use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use twilight_model::id::{Id, marker::UserMarker};

/// Speaking state of an SSRC.
///
/// Outgoing payloads leave `user_id` empty; the server fills it in when
/// relaying somebody else's state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Hash, Serialize)]
pub struct Speaking {
    pub speaking: SpeakingFlags,
    pub ssrc: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Id<UserMarker>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u32>,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct SpeakingFlags: u8 {
        const MICROPHONE = 1 << 0;
        const SOUNDSHARE = 1 << 1;
        const PRIORITY = 1 << 2;
    }
}

impl<'de> Deserialize<'de> for SpeakingFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self::from_bits_truncate(u8::deserialize(deserializer)?))
    }
}

impl Serialize for SpeakingFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.bits())
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::{Speaking, SpeakingFlags};
    use serde::{Serialize, de::DeserializeOwned};
    use static_assertions::assert_impl_all;
    use std::{fmt::Debug, hash::Hash};
    use twilight_model::id::Id;

    assert_impl_all!(
        SpeakingFlags: Copy,
        Clone,
        Debug,
        DeserializeOwned,
        Eq,
        Hash,
        PartialEq,
        Send,
        Serialize,
        Sync,
    );

    #[test]
    fn outgoing_omits_user() {
        let payload = Speaking {
            speaking: SpeakingFlags::MICROPHONE,
            ssrc: 42,
            user_id: None,
            delay: Some(0),
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"speaking":1,"ssrc":42,"delay":0}"#);
    }

    #[test]
    fn incoming_truncates_unknown_bits() {
        let json = r#"{"user_id":"1234","ssrc":9,"speaking":9}"#;
        let payload: Speaking = serde_json::from_str(json).unwrap();

        assert_eq!(payload.user_id, Some(Id::new(1234)));
        assert_eq!(payload.speaking, SpeakingFlags::MICROPHONE);
        assert_eq!(payload.delay, None);
    }
}
