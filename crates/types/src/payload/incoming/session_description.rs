use serde::{Deserialize, Serialize};

use crate::RTP_KEY_LEN;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Hash, Serialize)]
pub struct SessionDescription {
    pub mode: String,
    pub secret_key: [u8; RTP_KEY_LEN],
    /// Group encryption protocol version the call starts with.
    #[serde(default)]
    pub dave_protocol_version: u16,
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::SessionDescription;

    #[test]
    fn secret_key_from_int_array() {
        let key = (0..32).map(|n| n.to_string()).collect::<Vec<_>>().join(",");
        let json = format!(r#"{{"mode":"aead_aes256_gcm_rtpsize","secret_key":[{key}]}}"#);

        let payload: SessionDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(payload.mode, "aead_aes256_gcm_rtpsize");
        assert_eq!(payload.secret_key[31], 31);
        assert_eq!(payload.dave_protocol_version, 0);
    }

    #[test]
    fn short_secret_key_is_rejected() {
        let json = r#"{"mode":"aead_aes256_gcm_rtpsize","secret_key":[1,2,3]}"#;
        assert!(serde_json::from_str::<SessionDescription>(json).is_err());
    }
}
