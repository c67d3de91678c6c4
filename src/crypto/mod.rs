use std::fmt::Debug;

pub mod aes256gcm;
pub mod mode;
pub mod xchacha20poly1305;
pub mod xsalsa20poly1305;

mod group;

pub use self::aes256gcm::Aes256Gcm;
pub use self::group::{SealedPayload, TransportSecrets, VoiceGroupCrypto};
pub use self::mode::EncryptMode;
pub use self::xchacha20poly1305::XChaCha20Poly1305;
pub use self::xsalsa20poly1305::XSalsa20Poly1305;

/// Secret key size to encrypt/decrypt voice packets
pub const AEAD_KEY_LEN: usize = phonic_types::RTP_KEY_LEN;

/// Size of the authentication tag every supported mode appends.
pub const TAG_LEN: usize = 16;

/// Algoritm-agnostic trait for encrypting and decrypting data,
/// independent of any specific crypto provider or algorithm.
///
/// Ciphertexts always carry the authentication tag at their end.
pub trait Aead: Debug + Sync + Send {
    fn mode(&self) -> EncryptMode;
    fn encrypt(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, AeadError>;
    fn decrypt(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, AeadError>;
}

pub struct AeadError {
    pub(crate) kind: AeadErrorType,
}

impl AeadError {
    #[must_use]
    pub fn kind(&self) -> &AeadErrorType {
        &self.kind
    }

    pub(crate) const fn unspecified() -> Self {
        Self {
            kind: AeadErrorType::Unspecified,
        }
    }

    pub(crate) fn check_nonce(nonce: &[u8], expected: usize) -> Result<(), Self> {
        if nonce.len() == expected {
            Ok(())
        } else {
            Err(Self {
                kind: AeadErrorType::InvalidNonceLength { expected },
            })
        }
    }
}

impl Debug for AeadError {
    #[cfg(not(test))]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeadError").finish_non_exhaustive()
    }

    #[cfg(test)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeadError")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for AeadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Kept opaque so a peer cannot learn why decryption failed.
        f.write_str("aead error")
    }
}

impl std::error::Error for AeadError {}

#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
#[non_exhaustive]
pub enum AeadErrorType {
    /// General AEAD error. Nothing too specific.
    Unspecified,

    /// Invalid nonce length.
    InvalidNonceLength { expected: usize },

    /// The mode does not authenticate associated data.
    AssociatedDataUnsupported,
}
