use std::fmt::Debug;

use super::{AEAD_KEY_LEN, Aead, AeadError, EncryptMode, TAG_LEN};

/// Keying material handed out by the session description.
///
/// A new set is issued for every session, so values from a previous
/// session must never be reused.
#[derive(Clone, PartialEq, Eq)]
pub struct TransportSecrets {
    pub mode: EncryptMode,
    pub secret_key: [u8; AEAD_KEY_LEN],
    pub ssrc: u32,
}

impl Debug for TransportSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSecrets")
            .field("mode", &self.mode)
            .field("secret_key", &"<redacted>")
            .field("ssrc", &self.ssrc)
            .finish()
    }
}

/// Output of [`VoiceGroupCrypto::encrypt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    /// Ciphertext followed by the authentication tag, or the tag first in
    /// the legacy secretbox mode.
    pub body: Vec<u8>,
    /// Nonce material the receiver needs, appended after `body`.
    pub trailer: Vec<u8>,
}

/// Builds mode-specific nonces and seals or opens voice payloads.
pub struct VoiceGroupCrypto {
    cipher: Box<dyn Aead>,
    mode: EncryptMode,
    nonce: u32,
}

impl Debug for VoiceGroupCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceGroupCrypto")
            .field("mode", &self.mode)
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}

impl VoiceGroupCrypto {
    #[must_use]
    pub fn new(secrets: &TransportSecrets) -> Self {
        Self {
            cipher: secrets.mode.encryptor(&secrets.secret_key),
            mode: secrets.mode,
            nonce: 0,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> EncryptMode {
        self.mode
    }

    /// Seals `plaintext` for a datagram starting with `header`.
    ///
    /// In AES-GCM mode every call consumes one value of the rolling nonce
    /// counter, which wraps around after `u32::MAX`.
    pub fn encrypt(&mut self, plaintext: &[u8], header: &[u8]) -> Result<SealedPayload, AeadError> {
        let trailer = match self.mode {
            EncryptMode::Aes256Gcm => {
                let counter = self.nonce;
                self.nonce = self.nonce.wrapping_add(1);
                counter.to_be_bytes().to_vec()
            }
            EncryptMode::XChaCha20Poly1305 | EncryptMode::XSalsa20Poly1305 => Vec::new(),
        };

        let nonce = self.nonce_for(header, &trailer)?;
        let body = self
            .cipher
            .encrypt(&nonce, self.associated_data(header), plaintext)?;

        Ok(SealedPayload { body, trailer })
    }

    /// Opens a payload split out of a received datagram.
    ///
    /// Failure is returned as a value; whether it deserves a log line is
    /// up to the caller.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        tag: &[u8],
        header: &[u8],
        nonce_material: &[u8],
    ) -> Result<Vec<u8>, AeadError> {
        if tag.len() != TAG_LEN {
            return Err(AeadError::unspecified());
        }

        let nonce = self.nonce_for(header, nonce_material)?;

        let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);

        self.cipher
            .decrypt(&nonce, self.associated_data(header), &sealed)
    }

    fn associated_data<'a>(&self, header: &'a [u8]) -> &'a [u8] {
        if self.mode.authenticates_header() {
            header
        } else {
            &[]
        }
    }

    fn nonce_for(&self, header: &[u8], nonce_material: &[u8]) -> Result<Vec<u8>, AeadError> {
        let mut nonce = vec![0u8; self.mode.nonce_size()];
        match self.mode {
            // 8 zero bytes followed by the big endian counter.
            EncryptMode::Aes256Gcm => {
                let counter: &[u8; 4] = nonce_material
                    .try_into()
                    .map_err(|_| AeadError::unspecified())?;
                nonce[8..].copy_from_slice(counter);
            }
            // Fixed RTP header followed by zero padding.
            EncryptMode::XChaCha20Poly1305 | EncryptMode::XSalsa20Poly1305 => {
                let fixed = header
                    .get(..crate::rtp::HEADER_LEN)
                    .ok_or_else(AeadError::unspecified)?;
                nonce[..fixed.len()].copy_from_slice(fixed);
            }
        }
        Ok(nonce)
    }
}
