// ring falls back to a constant-time software implementation when the CPU
// lacks AES instructions.
use super::{AEAD_KEY_LEN, Aead, AeadError, EncryptMode, TAG_LEN};

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use std::fmt::Debug;

/// Nonce size for the particular encryption.
pub const NONCE_LEN: usize = 96 / 8;

pub struct Aes256Gcm {
    key: LessSafeKey,
}

impl Debug for Aes256Gcm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aes256Gcm").finish_non_exhaustive()
    }
}

impl Aes256Gcm {
    #[must_use]
    pub fn new(key: &[u8]) -> Option<Self> {
        let key: &[u8; AEAD_KEY_LEN] = key.try_into().ok()?;
        Some(Self::new_sized(key))
    }

    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn new_sized(key: &[u8; AEAD_KEY_LEN]) -> Self {
        let key = UnboundKey::new(&AES_256_GCM, key)
            .map(LessSafeKey::new)
            .expect("key size is in the correct AEAD key size");

        Self { key }
    }

    fn nonce(nonce: &[u8]) -> Result<Nonce, AeadError> {
        AeadError::check_nonce(nonce, NONCE_LEN)?;
        Nonce::try_assume_unique_for_key(nonce).map_err(|_| AeadError::unspecified())
    }
}

impl Aead for Aes256Gcm {
    fn mode(&self) -> EncryptMode {
        EncryptMode::Aes256Gcm
    }

    fn encrypt(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, AeadError> {
        let nonce = Self::nonce(nonce)?;

        let mut buffer = Vec::with_capacity(plaintext.len() + TAG_LEN);
        buffer.extend_from_slice(plaintext);

        self.key
            .seal_in_place_append_tag(nonce, Aad::from(aad), &mut buffer)
            .map_err(|_| AeadError::unspecified())?;

        Ok(buffer)
    }

    fn decrypt(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, AeadError> {
        let nonce = Self::nonce(nonce)?;
        if ciphertext.len() < TAG_LEN {
            return Err(AeadError::unspecified());
        }

        let mut buffer = ciphertext.to_vec();
        let len = self
            .key
            .open_in_place(nonce, Aad::from(aad), &mut buffer)
            .map_err(|_| AeadError::unspecified())?
            .len();

        buffer.truncate(len);
        Ok(buffer)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::{Aead, Aes256Gcm};
    use crate::crypto::AeadErrorType;

    const SECRET_KEY: &str = "fb5e9f96f291742023f321c7f4f967a2d90f4e7dadb2d9bd66774ad3ebb3ac5d";
    const NONCE: &str = "a9ecf2241430300505590fdf";

    // Generated with node.js (encoded with hex)
    //
    // const secretKey = Buffer.from("fb5e9f96f291742023f321c7f4f967a2d90f4e7dadb2d9bd66774ad3ebb3ac5d", "hex")
    // const nonce = Buffer.from("a9ecf2241430300505590fdf", "hex")
    //
    // crypto.createCipheriv("aes-256-gcm", secretKey, nonce)
    // cipher.setAAD(Buffer.from("", "hex"))
    //
    // Buffer.concat([cipher.update("Hello, World!"), cipher.final(), cipher.getAuthTag()]).toString("hex"))
    const CIPHERTEXT: &str = "85fd5ab2749514314a225e754dbba94bb84c0f9dd296d3234835ae73a0";

    #[test]
    fn test_decrypt() {
        let key = hex::decode(SECRET_KEY).unwrap();
        let nonce = hex::decode(NONCE).unwrap();
        let ciphertext = hex::decode(CIPHERTEXT).unwrap();

        let aes = Aes256Gcm::new(&key).unwrap();
        let plaintext = aes.decrypt(&nonce, &[], &ciphertext).unwrap();

        assert_eq!(plaintext, b"Hello, World!");
    }

    #[test]
    fn test_encrypt() {
        let key = hex::decode(SECRET_KEY).unwrap();
        let nonce = hex::decode(NONCE).unwrap();

        let aes = Aes256Gcm::new(&key).unwrap();
        let cipher = aes
            .encrypt(&nonce, &[], b"Hello, World!")
            .map(hex::encode)
            .unwrap();

        assert_eq!(cipher, CIPHERTEXT);
    }

    #[test]
    fn associated_data_is_authenticated() {
        let key = hex::decode(SECRET_KEY).unwrap();
        let nonce = hex::decode(NONCE).unwrap();

        let aes = Aes256Gcm::new(&key).unwrap();
        let sealed = aes.encrypt(&nonce, b"header", b"opus").unwrap();

        assert!(aes.decrypt(&nonce, b"header", &sealed).is_ok());
        assert!(aes.decrypt(&nonce, b"HEADER", &sealed).is_err());
    }

    #[test]
    fn rejects_bad_inputs() {
        let key = hex::decode(SECRET_KEY).unwrap();
        let aes = Aes256Gcm::new(&key).unwrap();

        let error = aes.encrypt(&[0; 24], &[], b"x").unwrap_err();
        assert_eq!(
            *error.kind(),
            AeadErrorType::InvalidNonceLength { expected: 12 }
        );
        assert!(aes.decrypt(&[0; 12], &[], &[0; 15]).is_err());
        assert!(Aes256Gcm::new(&[0; 16]).is_none());
    }
}
