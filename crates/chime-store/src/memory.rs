//! In-memory device registry
//!
//! Same semantics as [`DeviceStore`](crate::DeviceStore) without a backing
//! file, suitable for testing collaborators and simulation environments.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::DeviceRegistry;
use crate::codec::{decode_members, encode_members};
use crate::error::{StoreError, StoreResult};
use crate::keys::{mint_device_key, mint_group_key};

#[derive(Debug, Default)]
struct Namespaces {
    /// Device key -> token
    devices: HashMap<String, String>,
    /// Group key -> encoded members
    groups: HashMap<String, Vec<u8>>,
}

/// In-memory implementation of [`DeviceRegistry`]
///
/// A single lock guards both namespaces, so a group write and its device
/// checks happen atomically.
#[derive(Debug)]
pub struct InMemoryDeviceStore {
    /// `None` once closed
    state: RwLock<Option<Namespaces>>,
}

impl Default for InMemoryDeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDeviceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Some(Namespaces::default())),
        }
    }

    /// Number of stored groups
    pub fn group_count(&self) -> StoreResult<usize> {
        let state = self.state.read();
        let ns = state.as_ref().ok_or(StoreError::Closed)?;
        Ok(ns.groups.len())
    }
}

impl DeviceRegistry for InMemoryDeviceStore {
    fn count_all(&self) -> StoreResult<usize> {
        let state = self.state.read();
        let ns = state.as_ref().ok_or(StoreError::Closed)?;
        Ok(ns.devices.len())
    }

    fn close(&self) -> StoreResult<()> {
        self.state.write().take().ok_or(StoreError::Closed)?;
        Ok(())
    }

    fn device_token(&self, key: &str) -> StoreResult<String> {
        let state = self.state.read();
        let ns = state.as_ref().ok_or(StoreError::Closed)?;
        trace!(key, "Fetching device token");
        ns.devices
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::device_not_found(key))
    }

    fn upsert_device_token(&self, key: &str, token: &str) -> StoreResult<String> {
        if token.is_empty() {
            return Err(StoreError::validation("device token is empty"));
        }

        let mut state = self.state.write();
        let ns = state.as_mut().ok_or(StoreError::Closed)?;

        let resolved = if !key.is_empty() && ns.devices.contains_key(key) {
            key.to_string()
        } else {
            loop {
                let candidate = mint_device_key();
                if !ns.devices.contains_key(&candidate) {
                    break candidate;
                }
            }
        };

        ns.devices.insert(resolved.clone(), token.to_string());
        debug!(key = %resolved, "Saved device token");
        Ok(resolved)
    }

    fn upsert_group(&self, group_key: &str, device_keys: &[String]) -> StoreResult<String> {
        if device_keys.is_empty() {
            return Err(StoreError::validation("device key list is empty"));
        }
        let value = encode_members(device_keys)?;

        let mut state = self.state.write();
        let ns = state.as_mut().ok_or(StoreError::Closed)?;

        if let Some(missing) = device_keys.iter().find(|k| !ns.devices.contains_key(*k)) {
            return Err(StoreError::device_not_found(missing.clone()));
        }

        let resolved = if !group_key.is_empty() && ns.groups.contains_key(group_key) {
            group_key.to_string()
        } else {
            loop {
                let candidate = mint_group_key();
                if !ns.groups.contains_key(&candidate) {
                    break candidate;
                }
            }
        };

        ns.groups.insert(resolved.clone(), value);
        debug!(group_key = %resolved, members = device_keys.len(), "Saved device group");
        Ok(resolved)
    }

    fn group_members(&self, group_key: &str) -> StoreResult<Vec<String>> {
        let state = self.state.read();
        let ns = state.as_ref().ok_or(StoreError::Closed)?;
        let bytes = ns
            .groups
            .get(group_key)
            .ok_or_else(|| StoreError::group_not_found(group_key))?;
        decode_members(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_register_and_update() {
        let store = InMemoryDeviceStore::new();

        let key = store.upsert_device_token("", "tok-1").unwrap();
        assert_eq!(store.upsert_device_token(&key, "tok-2").unwrap(), key);
        assert_eq!(store.device_token(&key).unwrap(), "tok-2");
        assert_eq!(store.count_all().unwrap(), 1);

        let other = store.upsert_device_token("unknown", "tok-3").unwrap();
        assert_ne!(other, "unknown");
        assert_eq!(store.count_all().unwrap(), 2);
    }

    #[test]
    fn test_group_all_or_nothing() {
        let store = InMemoryDeviceStore::new();
        let d1 = store.upsert_device_token("", "tok").unwrap();

        let err = store
            .upsert_group("", &[d1.clone(), "d2".to_string()])
            .unwrap_err();
        assert_eq!(err.missing_key(), Some("d2"));
        assert_eq!(store.group_count().unwrap(), 0);

        let group = store.upsert_group("", &[d1.clone()]).unwrap();
        assert_eq!(store.group_members(&group).unwrap(), vec![d1]);
    }

    #[test]
    fn test_validation() {
        let store = InMemoryDeviceStore::new();
        assert_eq!(
            store.upsert_group("G_x", &[]).unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            store.upsert_device_token("", "").unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_closed() {
        let store = InMemoryDeviceStore::new();
        store.close().unwrap();
        assert!(matches!(store.count_all(), Err(StoreError::Closed)));
        assert!(matches!(store.close(), Err(StoreError::Closed)));
    }
}
