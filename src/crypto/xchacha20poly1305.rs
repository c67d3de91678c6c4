//! `aead_xchacha20_poly1305_rtpsize`: the RTP header is authenticated
//! and the 24-byte nonce is the header counter, zero padded.
use super::{AEAD_KEY_LEN, Aead, AeadError, EncryptMode, TAG_LEN};
use chacha20poly1305::aead::{AeadInPlace, KeyInit};
use chacha20poly1305::{Tag, XChaCha20Poly1305 as Cipher, XNonce};
use std::fmt::Debug;

pub const NONCE_LEN: usize = 24;

pub struct XChaCha20Poly1305 {
    cipher: Cipher,
}

impl Debug for XChaCha20Poly1305 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XChaCha20Poly1305").finish_non_exhaustive()
    }
}

impl XChaCha20Poly1305 {
    #[must_use]
    pub fn new(key: &[u8]) -> Option<Self> {
        Cipher::new_from_slice(key).ok().map(|cipher| Self { cipher })
    }

    #[must_use]
    pub fn new_sized(key: &[u8; AEAD_KEY_LEN]) -> Self {
        Self {
            cipher: Cipher::new(key.into()),
        }
    }
}

impl Aead for XChaCha20Poly1305 {
    fn mode(&self) -> EncryptMode {
        EncryptMode::XChaCha20Poly1305
    }

    fn encrypt(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, AeadError> {
        AeadError::check_nonce(nonce, NONCE_LEN)?;

        let mut sealed = Vec::with_capacity(plaintext.len() + TAG_LEN);
        sealed.extend_from_slice(plaintext);

        let tag = self
            .cipher
            .encrypt_in_place_detached(XNonce::from_slice(nonce), aad, &mut sealed)
            .map_err(|_| AeadError::unspecified())?;

        sealed.extend_from_slice(&tag);
        Ok(sealed)
    }

    fn decrypt(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, AeadError> {
        AeadError::check_nonce(nonce, NONCE_LEN)?;

        let Some(body_len) = ciphertext.len().checked_sub(TAG_LEN) else {
            return Err(AeadError::unspecified());
        };
        let (body, tag) = ciphertext.split_at(body_len);

        let mut opened = body.to_vec();
        self.cipher
            .decrypt_in_place_detached(XNonce::from_slice(nonce), aad, &mut opened, Tag::from_slice(tag))
            .map_err(|_| AeadError::unspecified())?;

        Ok(opened)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::{Aead, XChaCha20Poly1305};
    use crate::crypto::AeadErrorType;

    // XChaCha20-Poly1305 of "Hello, World!" without associated data,
    // produced by an independent implementation.
    const KEY: &str = "fb5e9f96f291742023f321c7f4f967a2d90f4e7dadb2d9bd66774ad3ebb3ac5d";
    const NONCE: &str = "013bf700df8ad5e1fd9cbbefcb65e060d4e0b6e8a40865ec";
    const SEALED: &str = "cc1f35d59684ffed96687535cafaba8431ec674942f4c67edb39bca372";

    #[test]
    fn known_answer() {
        let cipher = XChaCha20Poly1305::new(&hex::decode(KEY).unwrap()).unwrap();
        let nonce = hex::decode(NONCE).unwrap();

        let sealed = cipher.encrypt(&nonce, &[], b"Hello, World!").unwrap();
        assert_eq!(hex::encode(&sealed), SEALED);
        assert_eq!(cipher.decrypt(&nonce, &[], &sealed).unwrap(), b"Hello, World!");
    }

    #[test]
    fn header_is_authenticated() {
        let cipher = XChaCha20Poly1305::new_sized(&[5; 32]);
        let nonce = [0; 24];
        let header = [0x80, 0x78, 0, 1, 0, 0, 3, 192, 0, 0, 0, 7];

        let sealed = cipher.encrypt(&nonce, &header, b"opus frame").unwrap();
        assert_eq!(cipher.decrypt(&nonce, &header, &sealed).unwrap(), b"opus frame");

        let mut other_header = header;
        other_header[3] = 2;
        assert!(cipher.decrypt(&nonce, &other_header, &sealed).is_err());

        let mut tampered = sealed;
        *tampered.last_mut().unwrap() ^= 1;
        assert!(cipher.decrypt(&nonce, &header, &tampered).is_err());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(XChaCha20Poly1305::new(&[0; 31]).is_none());

        let cipher = XChaCha20Poly1305::new_sized(&[5; 32]);
        let error = cipher.encrypt(&[0; 12], &[], b"x").unwrap_err();
        assert!(matches!(
            error.kind(),
            AeadErrorType::InvalidNonceLength { expected: 24 }
        ));
        assert!(cipher.decrypt(&[0; 24], &[], &[0; 15]).is_err());
    }
}
