//! Physical row-store boundary.
//!
//! The registry treats the durable table as an opaque collaborator behind
//! the [`PhysicalStore`] trait. [`MemoryStore`] is the non-durable
//! implementation (tests, previews); [`crate::SqliteStore`] is the durable
//! one.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::StoreError;

/// One durable key -> value table. Pattern arguments use SQL `LIKE`
/// syntax: `%` matches any run of characters, `_` a single character,
/// ASCII case-insensitively.
pub trait PhysicalStore: Send + Sync {
    fn set_key_val(&self, key: &str, val: &str) -> Result<(), StoreError>;
    fn get_key_val(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn delete_key_val(&self, key: &str) -> Result<(), StoreError>;
    fn get_all_keys(&self) -> Result<Vec<String>, StoreError>;
    /// Matches in key order; `limit == 0` means unlimited.
    fn get_query_vals(
        &self,
        pattern: &str,
        limit: u64,
    ) -> Result<Vec<(String, String)>, StoreError>;
    fn get_query_one(&self, pattern: &str) -> Result<Option<String>, StoreError>;
    fn get_query_count(&self, pattern: &str) -> Result<u64, StoreError>;
    /// Remove every entry of the table.
    fn purge(&self) -> Result<(), StoreError>;
}

/// In-memory store. Keys iterate in lexicographic order, which keeps query
/// results stable.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PhysicalStore for MemoryStore {
    fn set_key_val(&self, key: &str, val: &str) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), val.to_string());
        Ok(())
    }

    fn get_key_val(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn delete_key_val(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn get_all_keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn get_query_vals(
        &self,
        pattern: &str,
        limit: u64,
    ) -> Result<Vec<(String, String)>, StoreError> {
        let entries = self.entries.read();
        let matches = entries
            .iter()
            .filter(|(k, _)| like_match(pattern, k))
            .map(|(k, v)| (k.clone(), v.clone()));
        Ok(if limit > 0 {
            matches.take(limit as usize).collect()
        } else {
            matches.collect()
        })
    }

    fn get_query_one(&self, pattern: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .read()
            .iter()
            .find(|(k, _)| like_match(pattern, k))
            .map(|(_, v)| v.clone()))
    }

    fn get_query_count(&self, pattern: &str) -> Result<u64, StoreError> {
        Ok(self
            .entries
            .read()
            .keys()
            .filter(|k| like_match(pattern, k))
            .count() as u64)
    }

    fn purge(&self) -> Result<(), StoreError> {
        self.entries.write().clear();
        Ok(())
    }
}

/// SQL `LIKE` matcher: `%` is any run, `_` a single character. ASCII
/// case-insensitive, matching SQLite's default LIKE behaviour so the two
/// physical stores agree.
pub(crate) fn like_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '_' || chars_eq(p[pi], t[ti])) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '%' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            // Backtrack: let the last '%' absorb one more character.
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '%' {
        pi += 1;
    }
    pi == p.len()
}

fn chars_eq(a: char, b: char) -> bool {
    a == b || (a.is_ascii() && b.is_ascii() && a.eq_ignore_ascii_case(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_match_wildcards() {
        assert!(like_match("abc", "abc"));
        assert!(like_match("a_c", "abc"));
        assert!(!like_match("a_c", "abbc"));
        assert!(like_match("a%c", "abbbc"));
        assert!(like_match("a%c", "ac"));
        assert!(like_match("%", ""));
        assert!(like_match("%", "anything"));
        assert!(like_match("rewards.%", "rewards.gold.timesGiven"));
        assert!(!like_match("rewards.%", "badges.gold"));
        assert!(like_match("%timesGiven", "rewards.gold.timesGiven"));
        assert!(like_match("%gold%", "rewards.gold.timesGiven"));
        assert!(!like_match("abc", "abcd"));
        assert!(!like_match("abcd", "abc"));
    }

    #[test]
    fn like_match_is_ascii_case_insensitive() {
        assert!(like_match("ABC", "abc"));
        assert!(like_match("%Given", "rewards.gold.timesgiven"));
    }

    #[test]
    fn memory_store_crud() {
        let store = MemoryStore::new();
        store.set_key_val("k1", "v1").unwrap();
        store.set_key_val("k1", "v2").unwrap();
        assert_eq!(store.get_key_val("k1").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.get_key_val("missing").unwrap(), None);

        store.delete_key_val("k1").unwrap();
        assert_eq!(store.get_key_val("k1").unwrap(), None);
        // Deleting an absent key is a no-op.
        store.delete_key_val("k1").unwrap();
    }

    #[test]
    fn memory_store_queries_respect_limit() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.set_key_val(&format!("item.{i}"), &format!("v{i}")).unwrap();
        }
        store.set_key_val("other", "x").unwrap();

        assert_eq!(store.get_query_count("item.%").unwrap(), 5);
        assert_eq!(store.get_query_vals("item.%", 2).unwrap().len(), 2);
        assert_eq!(store.get_query_vals("item.%", 0).unwrap().len(), 5);
        assert_eq!(
            store.get_query_one("item.%").unwrap().as_deref(),
            Some("v0")
        );
        assert_eq!(store.get_query_one("none.%").unwrap(), None);
    }

    #[test]
    fn memory_store_purge_clears_everything() {
        let store = MemoryStore::new();
        store.set_key_val("a", "1").unwrap();
        store.set_key_val("b", "2").unwrap();
        store.purge().unwrap();
        assert!(store.get_all_keys().unwrap().is_empty());
    }
}
