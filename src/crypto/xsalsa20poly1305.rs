//! Deprecated single-user mode with secretbox semantics: there is no
//! associated data, only a 24-byte nonce, and the tag comes before the
//! ciphertext as in NaCl's `crypto_secretbox`.
use super::{AEAD_KEY_LEN, Aead, AeadError, AeadErrorType, EncryptMode, TAG_LEN};
use std::fmt::Debug;
use xsalsa20poly1305::aead::{AeadInPlace, KeyInit};
use xsalsa20poly1305::{Nonce, Tag, XSalsa20Poly1305 as Cipher};

pub const NONCE_LEN: usize = 24;

pub struct XSalsa20Poly1305 {
    cipher: Cipher,
}

impl Debug for XSalsa20Poly1305 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XSalsa20Poly1305").finish_non_exhaustive()
    }
}

impl XSalsa20Poly1305 {
    #[must_use]
    pub fn new(key: &[u8]) -> Option<Self> {
        let key: &[u8; AEAD_KEY_LEN] = key.try_into().ok()?;
        Some(Self::new_sized(key))
    }

    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn new_sized(key: &[u8; AEAD_KEY_LEN]) -> Self {
        Self {
            cipher: Cipher::new_from_slice(key).expect("key should have the size of AEAD_KEY_LEN"),
        }
    }

    fn check(nonce: &[u8], aad: &[u8]) -> Result<(), AeadError> {
        AeadError::check_nonce(nonce, NONCE_LEN)?;
        if aad.is_empty() {
            Ok(())
        } else {
            Err(AeadError {
                kind: AeadErrorType::AssociatedDataUnsupported,
            })
        }
    }
}

impl Aead for XSalsa20Poly1305 {
    fn mode(&self) -> EncryptMode {
        EncryptMode::XSalsa20Poly1305
    }

    fn encrypt(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, AeadError> {
        Self::check(nonce, aad)?;

        let mut sealed = vec![0; TAG_LEN];
        sealed.extend_from_slice(plaintext);

        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(nonce), &[], &mut sealed[TAG_LEN..])
            .map_err(|_| AeadError::unspecified())?;

        sealed[..TAG_LEN].copy_from_slice(&tag);
        Ok(sealed)
    }

    fn decrypt(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, AeadError> {
        Self::check(nonce, aad)?;

        if ciphertext.len() < TAG_LEN {
            return Err(AeadError::unspecified());
        }
        let (tag, body) = ciphertext.split_at(TAG_LEN);

        let mut buffer = body.to_vec();
        self.cipher
            .decrypt_in_place_detached(Nonce::from_slice(nonce), &[], &mut buffer, Tag::from_slice(tag))
            .map_err(|_| AeadError::unspecified())?;

        Ok(buffer)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::{Aead, Cipher, Nonce, Tag, XSalsa20Poly1305};
    use crate::crypto::AeadErrorType;
    use xsalsa20poly1305::aead::{AeadInPlace, KeyInit};

    const SECRET_KEY: [u8; 32] = [7; 32];

    #[test]
    fn seal_and_open() {
        let cipher = XSalsa20Poly1305::new_sized(&SECRET_KEY);
        let nonce = [3; 24];

        let sealed = cipher.encrypt(&nonce, &[], b"opus frame").unwrap();
        assert_eq!(sealed.len(), b"opus frame".len() + 16);
        assert_eq!(cipher.decrypt(&nonce, &[], &sealed).unwrap(), b"opus frame");

        let mut other_nonce = nonce;
        other_nonce[23] = 4;
        assert!(cipher.decrypt(&other_nonce, &[], &sealed).is_err());
    }

    #[test]
    fn tag_precedes_ciphertext() {
        let cipher = XSalsa20Poly1305::new_sized(&SECRET_KEY);
        let nonce = [3; 24];
        let sealed = cipher.encrypt(&nonce, &[], b"opus frame").unwrap();

        let (tag, body) = sealed.split_at(16);
        let mut opened = body.to_vec();
        Cipher::new_from_slice(&SECRET_KEY)
            .unwrap()
            .decrypt_in_place_detached(Nonce::from_slice(&nonce), &[], &mut opened, Tag::from_slice(tag))
            .unwrap();
        assert_eq!(opened, b"opus frame");

        assert!(cipher.decrypt(&nonce, &[], &sealed[..15]).is_err());
    }

    #[test]
    fn refuses_associated_data() {
        let cipher = XSalsa20Poly1305::new_sized(&SECRET_KEY);
        let error = cipher.encrypt(&[0; 24], b"header", b"x").unwrap_err();
        assert_eq!(*error.kind(), AeadErrorType::AssociatedDataUnsupported);
    }
}
