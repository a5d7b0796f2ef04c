//! # Chime Store
//!
//! Device registration storage for Chime.
//!
//! Maps device keys to push tokens and group keys to ordered lists of
//! device keys, persisted in a single redb file with two namespaces
//! (`device` and `group`).
//!
//! ## Features
//!
//! - **DeviceRegistry trait**: The six store operations, synchronous and object-safe
//! - **DeviceStore**: redb-backed implementation for production
//! - **SharedDeviceStore**: Exactly-once, first-caller-wins initialization
//! - **InMemoryDeviceStore**: In-memory implementation for testing/simulation
//!
//! ## Example
//!
//! ```rust,ignore
//! use chime_store::{DeviceStore, DeviceStoreConfig};
//!
//! let store = DeviceStore::open(&DeviceStoreConfig::with_data_dir("./data"))?;
//!
//! // Register two devices; the store mints their keys
//! let k1 = store.upsert_device_token("", "tok-A")?;
//! let k2 = store.upsert_device_token("", "tok-B")?;
//!
//! // Group them
//! let group = store.upsert_group("", &[k1.clone(), k2.clone()])?;
//! assert_eq!(store.group_members(&group)?, vec![k1, k2]);
//!
//! store.close()?;
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod memory;
pub mod persistent;
pub mod shared;
mod tables;

// Re-exports
pub use config::DeviceStoreConfig;
pub use error::{ErrorKind, InitError, Namespace, StoreError, StoreResult};
pub use keys::GROUP_KEY_PREFIX;
pub use memory::InMemoryDeviceStore;
pub use persistent::DeviceStore;
pub use shared::SharedDeviceStore;

/// Device and group registration operations
///
/// Reads see a consistent snapshot; writes are serialized and atomic.
/// All methods block the calling thread.
pub trait DeviceRegistry: Send + Sync {
    /// Number of registered devices
    fn count_all(&self) -> StoreResult<usize>;

    /// Release the store
    ///
    /// Every later call, including another `close`, fails with
    /// [`StoreError::Closed`].
    fn close(&self) -> StoreResult<()>;

    /// Token stored for a device key
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the key is not registered.
    fn device_token(&self, key: &str) -> StoreResult<String>;

    /// Create or update a device token
    ///
    /// If `key` is empty or unknown a new key is minted; otherwise the token
    /// under `key` is overwritten. Returns the key the token is stored under,
    /// which the caller must hand back to the device.
    ///
    /// An empty token is refused rather than stored, so every registered key
    /// always carries a usable token. Earlier registration servers accepted
    /// empty tokens; this one deliberately does not.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] for an empty token; nothing is written
    /// - [`StoreError::Closed`] or [`StoreError::Storage`] if the transaction
    ///   cannot be established or committed
    fn upsert_device_token(&self, key: &str, token: &str) -> StoreResult<String>;

    /// Create or update a group of registered devices
    ///
    /// If `group_key` is empty or unknown a new `G_`-prefixed key is minted.
    /// The device keys are stored in the given order.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] if `device_keys` is empty
    /// - [`StoreError::NotFound`] naming the first unregistered device key;
    ///   nothing is written in that case
    fn upsert_group(&self, group_key: &str, device_keys: &[String]) -> StoreResult<String>;

    /// Device keys of a group, in stored order
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the group does not exist
    /// - [`StoreError::Decoding`] if the stored value is corrupt
    fn group_members(&self, group_key: &str) -> StoreResult<Vec<String>>;
}
