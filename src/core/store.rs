//! Key-value repository the handlers persist through.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Writes `value` only if `key` is unset. Returns whether it wrote.
    fn set_if_absent(&self, key: &str, value: &[u8]) -> Result<bool> {
        if self.exists(key)? {
            return Ok(false);
        }
        self.set(key, value)?;
        Ok(true)
    }

    /// Bumps a counter and returns the new value, starting at 1.
    fn increment(&self, key: &str) -> Result<u64> {
        let current: u64 = self.get_json(key)?.unwrap_or(0);
        let next = current + 1;
        self.set_json(key, &next)?;
        Ok(next)
    }

    /// Applies `edit` to the id list at `key` and saves it when `edit` returns
    /// true. Returns what `edit` returned.
    fn update_ids(&self, key: &str, edit: &mut dyn FnMut(&mut Vec<u64>) -> bool) -> Result<bool> {
        let mut ids: Vec<u64> = self.get_json(key)?.unwrap_or_default();
        if !edit(&mut ids) {
            return Ok(false);
        }
        self.set_json(key, &ids)?;
        Ok(true)
    }
}

pub trait JsonStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>;
    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()>;
}

impl<S: KvStore + ?Sized> JsonStore for S {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, &serde_json::to_vec(value)?)
    }
}

/// In-process store for the native server and tests.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.data
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn set_if_absent(&self, key: &str, value: &[u8]) -> Result<bool> {
        let mut data = self.lock()?;
        if data.contains_key(key) {
            return Ok(false);
        }
        data.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    fn increment(&self, key: &str) -> Result<u64> {
        let mut data = self.lock()?;
        let current: u64 = match data.get(key) {
            Some(bytes) => serde_json::from_slice(bytes)?,
            None => 0,
        };
        let next = current + 1;
        data.insert(key.to_string(), serde_json::to_vec(&next)?);
        Ok(next)
    }

    fn update_ids(&self, key: &str, edit: &mut dyn FnMut(&mut Vec<u64>) -> bool) -> Result<bool> {
        let mut data = self.lock()?;
        let mut ids: Vec<u64> = match data.get(key) {
            Some(bytes) => serde_json::from_slice(bytes)?,
            None => Vec::new(),
        };
        if !edit(&mut ids) {
            return Ok(false);
        }
        data.insert(key.to_string(), serde_json::to_vec(&ids)?);
        Ok(true)
    }
}

/// Spin's default key-value store. Spin offers no compare-and-set, so the
/// conditional writes, counters and id lists fall back to read-then-write.
#[cfg(target_arch = "wasm32")]
pub struct SpinStore {
    inner: spin_sdk::key_value::Store,
}

#[cfg(target_arch = "wasm32")]
impl SpinStore {
    pub fn open_default() -> Result<Self> {
        let inner = spin_sdk::key_value::Store::open_default()
            .map_err(|e| anyhow::anyhow!("failed to open KV store: {:?}", e))?;
        Ok(SpinStore { inner })
    }
}

#[cfg(target_arch = "wasm32")]
impl KvStore for SpinStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner
            .get(key)
            .map_err(|e| anyhow::anyhow!("kv get {}: {:?}", key, e))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.inner
            .set(key, value)
            .map_err(|e| anyhow::anyhow!("kv set {}: {:?}", key, e))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.inner
            .delete(key)
            .map_err(|e| anyhow::anyhow!("kv delete {}: {:?}", key, e))
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.inner
            .exists(key)
            .map_err(|e| anyhow::anyhow!("kv exists {}: {:?}", key, e))
    }
}

// === Id-list helpers ===

/// Loads a JSON list of ids, empty when the key is unset.
pub fn get_ids(store: &dyn KvStore, key: &str) -> Result<Vec<u64>> {
    Ok(store.get_json(key)?.unwrap_or_default())
}

/// Prepends `id` unless already present. Returns whether the list changed.
pub fn push_front_unique(store: &dyn KvStore, key: &str, id: u64) -> Result<bool> {
    store.update_ids(key, &mut |ids: &mut Vec<u64>| {
        if ids.contains(&id) {
            return false;
        }
        ids.insert(0, id);
        true
    })
}

/// Removes `id` if present. Returns whether the list changed.
pub fn remove_id(store: &dyn KvStore, key: &str, id: u64) -> Result<bool> {
    store.update_ids(key, &mut |ids: &mut Vec<u64>| {
        let before = ids.len();
        ids.retain(|existing| *existing != id);
        ids.len() != before
    })
}
