use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Obfuscation failed")]
    Encode,

    #[error("Validation failed: authentication tag mismatch (possible tampering)")]
    Validation,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
}
