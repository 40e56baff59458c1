//! pv_crypto — PlayVault obfuscation primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize derived key material on drop.
//! - The transform is deliberately deterministic: obfuscated keys must
//!   remain usable as lookup keys, so equal plaintexts produce equal
//!   ciphertexts. This deters casual inspection of the stored data; it is
//!   not a confidentiality claim against an attacker who can run code on
//!   the device.
//!
//! # Module layout
//! - `kdf`       — HKDF derivation of per-store key material
//! - `obfuscate` — deterministic XChaCha20-Poly1305 encode/decode
//! - `error`     — unified error type

pub mod error;
pub mod kdf;
pub mod obfuscate;

pub use error::CryptoError;
pub use obfuscate::Obfuscator;
