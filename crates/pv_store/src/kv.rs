//! Key-value storage facade.
//!
//! Every operation routes through a resolved [`StoreHandle`]: obfuscate
//! the key (unless the caller chose a plaintext key), hit the physical
//! table, reverse the value transform on the way out. Value-level
//! corruption never surfaces as an `Err`; see [`Lookup`].

use std::sync::Arc;

use pv_crypto::Obfuscator;

use crate::error::StoreError;
use crate::physical::PhysicalStore;
use crate::registry::StoreRegistry;

/// Outcome of a single-value lookup. Corruption is distinguished from
/// absence so callers choose their own policy instead of the store
/// hard-coding "treat corruption as missing".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    Missing,
    Corrupted,
}

impl Lookup {
    /// The fail-soft reading: corruption collapses into absence.
    pub fn into_option(self) -> Option<String> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::Missing | Lookup::Corrupted => None,
        }
    }
}

/// One resolved store: obfuscator plus physical table. Immutable after
/// construction; share via `Arc`.
pub struct StoreHandle {
    name: String,
    obfuscator: Obfuscator,
    physical: Box<dyn PhysicalStore>,
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl StoreHandle {
    pub(crate) fn new(
        name: String,
        obfuscator: Obfuscator,
        physical: Box<dyn PhysicalStore>,
    ) -> Self {
        Self {
            name,
            obfuscator,
            physical,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch and decode the value for an obfuscated key.
    pub fn get(&self, key: &str) -> Result<Lookup, StoreError> {
        tracing::debug!(store = %self.name, key, "fetching value");
        let physical_key = self.obfuscator.encode(key)?;
        match self.physical.get_key_val(&physical_key)? {
            Some(raw) => Ok(self.decode_value(key, &raw)),
            None => Ok(Lookup::Missing),
        }
    }

    /// Obfuscate both key and value, then write.
    pub fn set(&self, key: &str, val: &str) -> Result<(), StoreError> {
        tracing::debug!(store = %self.name, key, "setting value");
        let physical_key = self.obfuscator.encode(key)?;
        let physical_val = self.obfuscator.encode(val)?;
        self.physical.set_key_val(&physical_key, &physical_val)
    }

    /// Remove the entry for an obfuscated key; no-op when absent.
    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        tracing::debug!(store = %self.name, key, "deleting value");
        let physical_key = self.obfuscator.encode(key)?;
        self.physical.delete_key_val(&physical_key)
    }

    /// Remove every entry of this store. Irreversible; meant for resets
    /// and tests.
    pub fn purge(&self) -> Result<(), StoreError> {
        tracing::debug!(store = %self.name, "purging store");
        self.physical.purge()
    }

    // ── Plaintext-key variants ───────────────────────────────────────────
    // The key is stored as given so pattern queries work against it; the
    // value is still obfuscated.

    pub fn get_for_plain_key(&self, key: &str) -> Result<Lookup, StoreError> {
        tracing::debug!(store = %self.name, key, "fetching value for plain key");
        match self.physical.get_key_val(key)? {
            Some(raw) => Ok(self.decode_value(key, &raw)),
            None => Ok(Lookup::Missing),
        }
    }

    pub fn set_for_plain_key(&self, key: &str, val: &str) -> Result<(), StoreError> {
        tracing::debug!(store = %self.name, key, "setting value for plain key");
        let physical_val = self.obfuscator.encode(val)?;
        self.physical.set_key_val(key, &physical_val)
    }

    pub fn delete_for_plain_key(&self, key: &str) -> Result<(), StoreError> {
        tracing::debug!(store = %self.name, key, "deleting value for plain key");
        self.physical.delete_key_val(key)
    }

    // ── Pattern queries (plaintext keys only) ────────────────────────────

    /// All matches for a `LIKE` pattern, values decoded individually.
    /// Entries whose values fail validation are dropped from the result,
    /// not surfaced as errors. `limit == 0` means unlimited; the limit
    /// applies before corrupted entries are dropped.
    pub fn get_plain_query_vals(
        &self,
        pattern: &str,
        limit: u64,
    ) -> Result<Vec<(String, String)>, StoreError> {
        tracing::debug!(store = %self.name, pattern, limit, "querying values");
        let rows = self.physical.get_query_vals(pattern, limit)?;
        let mut results = Vec::with_capacity(rows.len());
        for (key, raw) in rows {
            match self.obfuscator.decode(&raw) {
                Ok(val) => results.push((key, val)),
                Err(err) => {
                    tracing::error!(store = %self.name, key, %err, "dropping entry that failed validation");
                }
            }
        }
        tracing::debug!(store = %self.name, fetched = results.len(), "query finished");
        Ok(results)
    }

    /// First match for a pattern, or `None` (also on validation failure).
    pub fn get_plain_query_one(&self, pattern: &str) -> Result<Option<String>, StoreError> {
        tracing::debug!(store = %self.name, pattern, "querying one value");
        match self.physical.get_query_one(pattern)? {
            Some(raw) => match self.obfuscator.decode(&raw) {
                Ok(val) => Ok(Some(val)),
                Err(err) => {
                    tracing::error!(store = %self.name, %err, "query match failed validation");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Match count for a pattern; values are not transformed.
    pub fn get_plain_query_count(&self, pattern: &str) -> Result<u64, StoreError> {
        tracing::debug!(store = %self.name, pattern, "counting query matches");
        self.physical.get_query_count(pattern)
    }

    /// Enumerate the logical keys behind every obfuscated physical key.
    /// Keys that do not decode cleanly are skipped, not fatal.
    pub fn get_encrypted_keys(&self) -> Result<Vec<String>, StoreError> {
        tracing::debug!(store = %self.name, "fetching all keys");
        let mut keys = Vec::new();
        for physical_key in self.physical.get_all_keys()? {
            match self.obfuscator.decode(&physical_key) {
                Ok(key) => keys.push(key),
                Err(err) => {
                    tracing::debug!(store = %self.name, %err, "skipping key that failed validation");
                }
            }
        }
        Ok(keys)
    }

    fn decode_value(&self, key: &str, raw: &str) -> Lookup {
        match self.obfuscator.decode(raw) {
            Ok(val) => {
                tracing::debug!(store = %self.name, key, "fetched value");
                Lookup::Found(val)
            }
            Err(err) => {
                tracing::error!(store = %self.name, key, %err, "stored value failed validation");
                Lookup::Corrupted
            }
        }
    }
}

/// Public entry point: routes operations to the right store by name.
/// Cheap to clone; wraps the registry in an `Arc`.
#[derive(Clone)]
pub struct KvStorage {
    registry: Arc<StoreRegistry>,
}

impl KvStorage {
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    /// Resolve a store by name (`None` = default store).
    pub fn store(&self, name: Option<&str>) -> Result<Arc<StoreHandle>, StoreError> {
        self.registry.resolve(name)
    }

    pub fn key_prefix(&self) -> &str {
        self.registry.key_prefix()
    }

    // Default-store conveniences; the overwhelmingly common case.

    pub fn get(&self, key: &str) -> Result<Lookup, StoreError> {
        self.store(None)?.get(key)
    }

    pub fn set(&self, key: &str, val: &str) -> Result<(), StoreError> {
        self.store(None)?.set(key, val)
    }

    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.store(None)?.delete(key)
    }

    pub fn purge(&self) -> Result<(), StoreError> {
        self.store(None)?.purge()
    }
}
