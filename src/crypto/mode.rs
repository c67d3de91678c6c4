use std::fmt::Display;
use std::str::FromStr;

use super::{AEAD_KEY_LEN, Aead, Aes256Gcm, XChaCha20Poly1305, XSalsa20Poly1305};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptMode {
    /// AEAD `AES256-GCM` (RTP Size) (Preferred)
    Aes256Gcm,
    /// AEAD `XChaCha20` Poly1305 (RTP Size) (Required)
    XChaCha20Poly1305,
    /// `XSalsa20` Poly1305 secretbox (Deprecated)
    XSalsa20Poly1305,
}

impl EncryptMode {
    /// Generates an [AEAD encryptor] based on the mode from a secret key.
    ///
    /// [AEAD encryptor]: Aead
    #[must_use]
    pub fn encryptor(&self, key: &[u8; AEAD_KEY_LEN]) -> Box<dyn Aead> {
        match self {
            Self::Aes256Gcm => Box::new(Aes256Gcm::new_sized(key)),
            Self::XChaCha20Poly1305 => Box::new(XChaCha20Poly1305::new_sized(key)),
            Self::XSalsa20Poly1305 => Box::new(XSalsa20Poly1305::new_sized(key)),
        }
    }
}

impl EncryptMode {
    /// Returns the best encryption mode based on the available modes
    /// given from the [ready payload].
    ///
    /// [ready payload]: phonic_types::payload::incoming::Ready
    #[must_use]
    pub fn negotiate<T: AsRef<str>>(available_modes: &[T]) -> Option<Self> {
        available_modes
            .iter()
            .filter_map(|mode| EncryptMode::from_str(mode.as_ref()).ok())
            .max_by_key(|mode| mode.priority())
    }

    /// Gets the required size of a nonce for a particular mode.
    #[must_use]
    pub const fn nonce_size(&self) -> usize {
        match self {
            Self::Aes256Gcm => super::aes256gcm::NONCE_LEN,
            Self::XChaCha20Poly1305 => super::xchacha20poly1305::NONCE_LEN,
            Self::XSalsa20Poly1305 => super::xsalsa20poly1305::NONCE_LEN,
        }
    }

    /// Number of nonce bytes appended after the authentication tag of
    /// every RTP datagram.
    #[must_use]
    pub const fn trailer_len(&self) -> usize {
        match self {
            Self::Aes256Gcm => 4,
            Self::XChaCha20Poly1305 | Self::XSalsa20Poly1305 => 0,
        }
    }

    /// Whether the RTP header is authenticated as associated data.
    #[must_use]
    pub const fn authenticates_header(&self) -> bool {
        !matches!(self, Self::XSalsa20Poly1305)
    }
}

impl EncryptMode {
    /// Returns the name of a mode as it will appear during negotiation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aead_aes256_gcm_rtpsize",
            Self::XChaCha20Poly1305 => "aead_xchacha20_poly1305_rtpsize",
            Self::XSalsa20Poly1305 => "xsalsa20_poly1305",
        }
    }

    /// Higher values are more preferred.
    #[must_use]
    const fn priority(self) -> u8 {
        match self {
            Self::Aes256Gcm => 2,
            Self::XChaCha20Poly1305 => 1,
            Self::XSalsa20Poly1305 => 0,
        }
    }
}

impl Display for EncryptMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEncryptMode {
    mode: String,
}

impl UnknownEncryptMode {
    #[must_use]
    pub fn mode(&self) -> &str {
        &self.mode
    }
}

impl std::fmt::Display for UnknownEncryptMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("unknown encrypt mode: ")?;
        std::fmt::Debug::fmt(&self.mode, f)
    }
}

impl std::error::Error for UnknownEncryptMode {}

impl FromStr for EncryptMode {
    type Err = UnknownEncryptMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aead_aes256_gcm_rtpsize" => Ok(Self::Aes256Gcm),
            "aead_xchacha20_poly1305_rtpsize" => Ok(Self::XChaCha20Poly1305),
            "xsalsa20_poly1305" => Ok(Self::XSalsa20Poly1305),
            _ => Err(UnknownEncryptMode {
                mode: s.to_string(),
            }),
        }
    }
}
