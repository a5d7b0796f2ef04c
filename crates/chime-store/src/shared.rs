//! Process-wide store handle with exactly-once initialization

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::DeviceStoreConfig;
use crate::error::{InitError, StoreError, StoreResult};
use crate::persistent::DeviceStore;

/// Lazily initialized [`DeviceStore`] shared by every caller
///
/// The first successful [`initialize`](Self::initialize) opens the store;
/// later calls return the same handle and ignore their configuration. Can be
/// placed in a `static`:
///
/// ```rust,ignore
/// static STORE: SharedDeviceStore = SharedDeviceStore::new();
///
/// let store = STORE.initialize(&DeviceStoreConfig::with_data_dir("./data"))?;
/// ```
pub struct SharedDeviceStore {
    cell: OnceLock<Arc<DeviceStore>>,
    /// Serializes openers so the database is opened once
    init_lock: Mutex<Option<DeviceStoreConfig>>,
}

impl Default for SharedDeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedDeviceStore {
    /// Create an empty, uninitialized handle
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init_lock: Mutex::new(None),
        }
    }

    /// Open the store on first call, return the existing one afterwards
    ///
    /// A failed open leaves the handle uninitialized.
    pub fn initialize(&self, config: &DeviceStoreConfig) -> Result<Arc<DeviceStore>, InitError> {
        if let Some(store) = self.cell.get() {
            self.note_ignored(config);
            return Ok(store.clone());
        }

        let mut winner = self.init_lock.lock();
        if let Some(store) = self.cell.get() {
            drop(winner);
            self.note_ignored(config);
            return Ok(store.clone());
        }

        let store = Arc::new(DeviceStore::open(config)?);
        let store = self.cell.get_or_init(|| store).clone();
        *winner = Some(config.clone());
        Ok(store)
    }

    /// The initialized store
    pub fn get(&self) -> StoreResult<Arc<DeviceStore>> {
        self.cell.get().cloned().ok_or(StoreError::NotInitialized)
    }

    /// Whether [`initialize`](Self::initialize) has succeeded
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    fn note_ignored(&self, config: &DeviceStoreConfig) {
        match self.init_lock.lock().as_ref() {
            Some(winner) if winner != config => warn!(
                requested = %config.data_dir.display(),
                active = %winner.data_dir.display(),
                "Device store already initialized, ignoring new configuration"
            ),
            _ => debug!("Device store already initialized"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_get_before_initialize() {
        let shared = SharedDeviceStore::new();
        assert!(!shared.is_initialized());
        assert!(matches!(shared.get(), Err(StoreError::NotInitialized)));
    }

    #[test]
    fn test_first_caller_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let shared = SharedDeviceStore::new();

        let a = shared
            .initialize(&DeviceStoreConfig::with_data_dir(first.path()))
            .unwrap();
        let b = shared
            .initialize(&DeviceStoreConfig::with_data_dir(second.path().join("unused")))
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.path().starts_with(first.path()));
        assert!(!second.path().join("unused").exists());
        assert!(Arc::ptr_eq(&a, &shared.get().unwrap()));
    }

    #[test]
    fn test_concurrent_initialize_opens_once() {
        let temp = TempDir::new().unwrap();
        let shared = Arc::new(SharedDeviceStore::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                let dir = temp.path().join(format!("dir-{i}"));
                thread::spawn(move || shared.initialize(&DeviceStoreConfig::with_data_dir(dir)))
            })
            .collect();

        let stores: Vec<Arc<DeviceStore>> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();

        assert!(stores.iter().all(|s| Arc::ptr_eq(s, &stores[0])));
        let created = std::fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(created, 1);
    }

    #[test]
    fn test_failed_initialize_can_retry() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let shared = SharedDeviceStore::new();

        assert!(shared.initialize(&DeviceStoreConfig::with_data_dir(&blocker)).is_err());
        assert!(!shared.is_initialized());

        let store = shared
            .initialize(&DeviceStoreConfig::with_data_dir(temp.path().join("ok")))
            .unwrap();
        assert_eq!(store.count_all().unwrap(), 0);
    }
}
