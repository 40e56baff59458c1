use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("No secret registered for store '{0}'; register one before first use")]
    MissingSecret(String),

    #[error("Store '{0}' was already resolved; secrets must be registered before first use")]
    SecretAfterResolve(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] pv_crypto::CryptoError),
}
