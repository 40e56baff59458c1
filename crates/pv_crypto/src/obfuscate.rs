//! Deterministic authenticated obfuscation.
//!
//! Uses XChaCha20-Poly1305 with a synthetic nonce: HMAC-SHA256 of the
//! plaintext under a dedicated nonce key, truncated to 24 bytes. Encoding
//! the same plaintext under the same keys therefore yields byte-identical
//! output, which keeps obfuscated keys usable as lookup keys. Equal
//! plaintexts are observably equal on disk.
//!
//! Wire format, base64 URL-safe without padding:
//!   [ nonce (24 bytes) | ciphertext + tag ]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CryptoError;
use crate::kdf::{obfuscation_keys, ObfuscationKeys};

const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;
const AAD: &[u8] = b"pv-obfuscate-v1";

/// Deterministic keyed transform between plaintext strings and their
/// obfuscated on-disk representation. Stateless once constructed.
pub struct Obfuscator {
    keys: ObfuscationKeys,
}

impl Obfuscator {
    pub fn new(
        salt: &[u8],
        package_id: &str,
        device_id: &str,
        secret: &str,
    ) -> Result<Self, CryptoError> {
        Ok(Self {
            keys: obfuscation_keys(salt, package_id, device_id, secret)?,
        })
    }

    /// Obfuscate `plaintext`. Deterministic under fixed construction inputs.
    pub fn encode(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce_bytes = self.synthetic_nonce(plaintext.as_bytes());
        let nonce = XNonce::from_slice(&nonce_bytes);

        let cipher = XChaCha20Poly1305::new_from_slice(&self.keys.cipher_key)
            .map_err(|_| CryptoError::Encode)?;
        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: AAD,
                },
            )
            .map_err(|_| CryptoError::Encode)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    /// Reverse transform. Any corruption of the encoded text (bad base64,
    /// truncation, tag mismatch, invalid UTF-8) fails with
    /// [`CryptoError::Validation`], distinguishable from "no value".
    pub fn decode(&self, encoded: &str) -> Result<String, CryptoError> {
        let data = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| CryptoError::Validation)?;
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Validation);
        }
        let (nonce_bytes, ct) = data.split_at(NONCE_LEN);
        let nonce = XNonce::from_slice(nonce_bytes);

        let cipher = XChaCha20Poly1305::new_from_slice(&self.keys.cipher_key)
            .map_err(|_| CryptoError::Validation)?;
        let plaintext = cipher
            .decrypt(nonce, Payload { msg: ct, aad: AAD })
            .map_err(|_| CryptoError::Validation)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::Validation)
    }

    fn synthetic_nonce(&self, plaintext: &[u8]) -> [u8; NONCE_LEN] {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&self.keys.nonce_key)
            .expect("HMAC accepts any key length");
        mac.update(plaintext);
        let tag = mac.finalize().into_bytes();
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&tag[..NONCE_LEN]);
        nonce
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SALT: &[u8] = &[81, 2, 37, 13, 104, 22, 8, 55];

    fn obfuscator() -> Obfuscator {
        Obfuscator::new(SALT, "com.example.app", "device-1", "s3cret").unwrap()
    }

    #[test]
    fn round_trip() {
        let ob = obfuscator();
        let encoded = ob.encode("hello world").unwrap();
        assert_ne!(encoded, "hello world");
        assert_eq!(ob.decode(&encoded).unwrap(), "hello world");
    }

    #[test]
    fn round_trip_empty_and_unicode() {
        let ob = obfuscator();
        for s in ["", "héllo wörld", "日本語", "a\nb\tc"] {
            let encoded = ob.encode(s).unwrap();
            assert_eq!(ob.decode(&encoded).unwrap(), s);
        }
    }

    #[test]
    fn encode_is_deterministic() {
        let ob = obfuscator();
        assert_eq!(ob.encode("some key").unwrap(), ob.encode("some key").unwrap());
        assert_ne!(ob.encode("some key").unwrap(), ob.encode("other key").unwrap());
    }

    #[test]
    fn flipping_any_byte_fails_validation() {
        let ob = obfuscator();
        let encoded = ob.encode("tamper me").unwrap();
        let raw = URL_SAFE_NO_PAD.decode(&encoded).unwrap();
        for i in 0..raw.len() {
            let mut tampered = raw.clone();
            tampered[i] ^= 0x01;
            let reencoded = URL_SAFE_NO_PAD.encode(&tampered);
            assert!(
                matches!(ob.decode(&reencoded), Err(CryptoError::Validation)),
                "flip at byte {i} was not detected"
            );
        }
    }

    #[test]
    fn truncated_and_garbage_input_fail_validation() {
        let ob = obfuscator();
        assert!(matches!(ob.decode(""), Err(CryptoError::Validation)));
        assert!(matches!(ob.decode("AAAA"), Err(CryptoError::Validation)));
        assert!(matches!(
            ob.decode("not!valid!base64!"),
            Err(CryptoError::Validation)
        ));
    }

    #[test]
    fn other_device_cannot_decode() {
        let ob = obfuscator();
        let other = Obfuscator::new(SALT, "com.example.app", "device-2", "s3cret").unwrap();
        let encoded = ob.encode("bound to device-1").unwrap();
        assert!(matches!(other.decode(&encoded), Err(CryptoError::Validation)));
    }

    #[test]
    fn other_secret_cannot_decode() {
        let ob = obfuscator();
        let other = Obfuscator::new(SALT, "com.example.app", "device-1", "different").unwrap();
        let encoded = ob.encode("keyed by secret").unwrap();
        assert!(matches!(other.decode(&encoded), Err(CryptoError::Validation)));
    }

    proptest! {
        #[test]
        fn round_trip_printable_ascii(s in "[ -~]{0,128}") {
            let ob = obfuscator();
            let encoded = ob.encode(&s).unwrap();
            prop_assert_eq!(ob.decode(&encoded).unwrap(), s);
        }
    }
}
