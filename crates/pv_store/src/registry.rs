//! Store registry: maps a store name to its {obfuscator, physical store}
//! pair, constructing each at most once.
//!
//! The registry is an explicit, injectable object owned by the composing
//! application; there is no process-global instance. First resolution of a
//! name constructs the handle eagerly (obfuscator and physical store
//! together, under the registry lock) and caches it; the handle is
//! immutable afterwards, so later resolutions are plain map reads behind
//! the same lock.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use pv_crypto::Obfuscator;

use crate::error::StoreError;
use crate::kv::StoreHandle;
use crate::physical::{MemoryStore, PhysicalStore};
use crate::sqlite::SqliteStore;

/// Reserved name of the default store.
pub const DEFAULT_STORE_NAME: &str = "playvault.kv";

/// Process-wide storage configuration, fixed at construction time.
#[derive(Clone)]
pub struct StorageConfig {
    /// Application salt mixed into every derived key.
    pub obfuscation_salt: Vec<u8>,
    /// Application package identifier.
    pub package_id: String,
    /// Device identifier; binds stored values to the installing device.
    pub device_id: String,
    /// Secret for the default store.
    pub default_secret: String,
    /// Namespace prefix applied to derived keys (reward bookkeeping etc).
    pub key_prefix: String,
}

/// Constructs the physical table for a store name on first resolution.
pub type StoreOpener =
    dyn Fn(&str) -> Result<Box<dyn PhysicalStore>, StoreError> + Send + Sync;

pub struct StoreRegistry {
    config: StorageConfig,
    opener: Box<StoreOpener>,
    secrets: Mutex<HashMap<String, String>>,
    stores: Mutex<HashMap<String, Arc<StoreHandle>>>,
}

impl StoreRegistry {
    /// Registry whose stores live under `data_dir`, one SQLite file per
    /// store name.
    pub fn sqlite(config: StorageConfig, data_dir: PathBuf) -> Self {
        Self::with_opener(
            config,
            Box::new(move |name| {
                let file = data_dir.join(format!("{name}.db"));
                Ok(Box::new(SqliteStore::open(file)?) as Box<dyn PhysicalStore>)
            }),
        )
    }

    /// Registry over throwaway in-memory stores (tests, previews).
    pub fn in_memory(config: StorageConfig) -> Self {
        Self::with_opener(
            config,
            Box::new(|_| Ok(Box::new(MemoryStore::new()) as Box<dyn PhysicalStore>)),
        )
    }

    /// Registry over a caller-supplied physical-store factory.
    pub fn with_opener(config: StorageConfig, opener: Box<StoreOpener>) -> Self {
        Self {
            config,
            opener,
            secrets: Mutex::new(HashMap::new()),
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Register the secret for a named store. Must happen before the store
    /// is first resolved; there is no fallback secret for named stores.
    pub fn register_secret(&self, store_name: &str, secret: &str) -> Result<(), StoreError> {
        if self.stores.lock().contains_key(store_name) {
            tracing::error!(store = store_name, "secret registered after store was resolved");
            return Err(StoreError::SecretAfterResolve(store_name.to_string()));
        }
        self.secrets
            .lock()
            .insert(store_name.to_string(), secret.to_string());
        Ok(())
    }

    /// Resolve a store handle, constructing it on first use. `None` or an
    /// empty name resolves the default store.
    pub fn resolve(&self, store_name: Option<&str>) -> Result<Arc<StoreHandle>, StoreError> {
        let name = match store_name {
            Some(n) if !n.is_empty() => n,
            _ => DEFAULT_STORE_NAME,
        };

        let mut stores = self.stores.lock();
        if let Some(handle) = stores.get(name) {
            return Ok(Arc::clone(handle));
        }

        let secret = self.secret_for(name)?;
        let obfuscator = Obfuscator::new(
            &self.config.obfuscation_salt,
            &self.config.package_id,
            &self.config.device_id,
            &secret,
        )?;
        let physical = (self.opener)(name)?;
        let handle = Arc::new(StoreHandle::new(name.to_string(), obfuscator, physical));
        stores.insert(name.to_string(), Arc::clone(&handle));
        tracing::debug!(store = name, "constructed key-value store");
        Ok(handle)
    }

    fn secret_for(&self, name: &str) -> Result<String, StoreError> {
        if name == DEFAULT_STORE_NAME {
            return Ok(self.config.default_secret.clone());
        }
        self.secrets
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::MissingSecret(name.to_string()))
    }

    pub fn key_prefix(&self) -> &str {
        &self.config.key_prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> StorageConfig {
        StorageConfig {
            obfuscation_salt: vec![81, 2, 37, 13, 104, 22, 8, 55],
            package_id: "com.example.app".to_string(),
            device_id: "device-1".to_string(),
            default_secret: "default-secret".to_string(),
            key_prefix: "pv.".to_string(),
        }
    }

    #[test]
    fn empty_and_none_resolve_the_default_store() {
        let registry = StoreRegistry::in_memory(test_config());
        let a = registry.resolve(None).unwrap();
        let b = registry.resolve(Some("")).unwrap();
        let c = registry.resolve(Some(DEFAULT_STORE_NAME)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(a.name(), DEFAULT_STORE_NAME);
    }

    #[test]
    fn resolution_is_cached_per_name() {
        let registry = StoreRegistry::in_memory(test_config());
        registry.register_secret("scores", "s1").unwrap();
        let a = registry.resolve(Some("scores")).unwrap();
        let b = registry.resolve(Some("scores")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn named_store_without_secret_is_a_hard_error() {
        let registry = StoreRegistry::in_memory(test_config());
        let err = registry.resolve(Some("scores")).unwrap_err();
        assert!(matches!(err, StoreError::MissingSecret(name) if name == "scores"));
    }

    #[test]
    fn registering_a_secret_after_resolve_is_rejected() {
        let registry = StoreRegistry::in_memory(test_config());
        registry.register_secret("scores", "s1").unwrap();
        registry.resolve(Some("scores")).unwrap();
        let err = registry.register_secret("scores", "s2").unwrap_err();
        assert!(matches!(err, StoreError::SecretAfterResolve(name) if name == "scores"));
    }

    #[test]
    fn sqlite_registry_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::sqlite(test_config(), dir.path().to_path_buf());
        let store = registry.resolve(None).unwrap();
        store.set("balance", "100").unwrap();
        assert_eq!(
            store.get("balance").unwrap(),
            crate::kv::Lookup::Found("100".to_string())
        );
    }
}
