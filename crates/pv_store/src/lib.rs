//! pv_store — obfuscated multi-store key-value persistence
//!
//! # Storage strategy
//! Each named store is one physical key-value table plus one deterministic
//! obfuscator keyed by (application salt, package id, device id, per-store
//! secret). Keys and values are obfuscated before they hit the table, so a
//! casual inspection of the file shows only base64 noise; the obfuscator's
//! determinism keeps obfuscated keys usable for exact lookup. Entries may
//! also be written under plaintext keys (value still obfuscated) when
//! pattern queries over keys are needed.
//!
//! # Corruption policy
//! A stored value that fails validation on read is reported as
//! [`Lookup::Corrupted`], never as an `Err`: a single tampered entry must
//! not take the caller down. Hard errors are reserved for configuration
//! mistakes (missing store secret) and physical-store failures.

pub mod error;
pub mod kv;
pub mod physical;
pub mod registry;
pub mod sqlite;

pub use error::StoreError;
pub use kv::{KvStorage, Lookup, StoreHandle};
pub use physical::{MemoryStore, PhysicalStore};
pub use registry::{StorageConfig, StoreRegistry, DEFAULT_STORE_NAME};
pub use sqlite::SqliteStore;
