//! Key derivation
//!
//! Derives the per-store obfuscation keys from the four binding inputs:
//! application salt, package identifier, device identifier and per-store
//! secret. The device identifier binds ciphertext to the installing
//! device, so copying the raw store elsewhere yields undecodable data.
//! Changing any input invalidates previously encoded values.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

use crate::error::CryptoError;

/// Cipher + nonce key material for one store. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct ObfuscationKeys {
    pub(crate) cipher_key: [u8; 32],
    pub(crate) nonce_key: [u8; 32],
}

/// Derive the key pair for (salt, package, device, secret). Deterministic:
/// the same inputs always produce the same keys.
pub fn obfuscation_keys(
    salt: &[u8],
    package_id: &str,
    device_id: &str,
    secret: &str,
) -> Result<ObfuscationKeys, CryptoError> {
    // Separator keeps ("ab", "c") and ("a", "bc") from deriving the same keys.
    let mut info = Vec::with_capacity(package_id.len() + device_id.len() + 1);
    info.extend_from_slice(package_id.as_bytes());
    info.push(0x1f);
    info.extend_from_slice(device_id.as_bytes());

    let hk = Hkdf::<Sha256>::new(Some(salt), secret.as_bytes());

    let mut cipher_key = [0u8; 32];
    hk.expand_multi_info(&[info.as_slice(), b"pv-cipher-key"], &mut cipher_key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let mut nonce_key = [0u8; 32];
    hk.expand_multi_info(&[info.as_slice(), b"pv-nonce-key"], &mut nonce_key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(ObfuscationKeys { cipher_key, nonce_key })
}
