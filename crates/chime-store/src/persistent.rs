//! redb-backed device store
//!
//! Every operation runs inside exactly one redb transaction. Reads use
//! snapshot read transactions; upserts use a write transaction and are
//! serialized by redb's single-writer lock.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use redb::{Database, ReadableTable, ReadableTableMetadata};
use tracing::{debug, info, instrument, trace, warn};

use crate::DeviceRegistry;
use crate::codec::{decode_members, encode_members};
use crate::config::DeviceStoreConfig;
use crate::error::{InitError, StoreError, StoreResult};
use crate::keys::{mint_device_key, mint_group_key};
use crate::tables::{self, DEVICES, GROUPS};

/// Persistent device and group store
///
/// Holds the only handle to its database file. After [`close`](Self::close)
/// every operation fails with [`StoreError::Closed`].
pub struct DeviceStore {
    /// `None` once closed
    db: RwLock<Option<Database>>,
    path: PathBuf,
}

impl std::fmt::Debug for DeviceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStore")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl DeviceStore {
    /// Open or create the store
    ///
    /// Creates the data directory (owner-only) and database file if missing,
    /// and ensures both namespaces exist.
    #[instrument(skip(config), fields(dir = %config.data_dir.display()))]
    pub fn open(config: &DeviceStoreConfig) -> Result<Self, InitError> {
        let db = tables::open_database(config)?;
        let path = config.db_path();

        info!(path = %path.display(), "Opened device store");

        Ok(Self {
            db: RwLock::new(Some(db)),
            path,
        })
    }

    /// Path of the backing database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.db.read().is_none()
    }

    /// Number of stored groups
    pub fn group_count(&self) -> StoreResult<usize> {
        self.with_db(|db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(GROUPS)?;
            entry_count(table.len()?)
        })
    }

    /// Release the database file
    ///
    /// Waits for in-flight operations to finish.
    pub fn close(&self) -> StoreResult<()> {
        let db = self.db.write().take().ok_or(StoreError::Closed)?;
        drop(db);
        info!(path = %self.path.display(), "Closed device store");
        Ok(())
    }

    /// Number of registered devices
    pub fn count_all(&self) -> StoreResult<usize> {
        self.with_db(|db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(DEVICES)?;
            entry_count(table.len()?)
        })
    }

    /// Token stored for a device key
    pub fn device_token(&self, key: &str) -> StoreResult<String> {
        self.with_db(|db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(DEVICES)?;

            let token = table
                .get(key)?
                .map(|v| v.value().to_string())
                .ok_or_else(|| StoreError::device_not_found(key))?;

            trace!(key, "Fetched device token");
            Ok(token)
        })
    }

    /// Create or update a device token
    ///
    /// An empty or unknown `key` registers a new device under a freshly
    /// minted key. Returns the key the token is stored under.
    pub fn upsert_device_token(&self, key: &str, token: &str) -> StoreResult<String> {
        if token.is_empty() {
            return Err(StoreError::validation("device token is empty"));
        }

        self.with_db(|db| {
            let write_txn = db.begin_write()?;

            let (resolved, minted) = {
                let mut table = write_txn.open_table(DEVICES)?;

                let (resolved, minted) = if !key.is_empty() && table.get(key)?.is_some() {
                    (key.to_string(), false)
                } else {
                    let fresh = loop {
                        let candidate = mint_device_key();
                        if table.get(candidate.as_str())?.is_none() {
                            break candidate;
                        }
                    };
                    (fresh, true)
                };

                table.insert(resolved.as_str(), token)?;
                (resolved, minted)
            };

            write_txn.commit()?;

            debug!(key = %resolved, minted, "Saved device token");
            Ok(resolved)
        })
    }

    /// Create or update a group of devices
    ///
    /// Every device key must already be registered; otherwise nothing is
    /// written and the first missing key is reported. An empty or unknown
    /// `group_key` creates a new group under a freshly minted key.
    pub fn upsert_group(&self, group_key: &str, device_keys: &[String]) -> StoreResult<String> {
        if device_keys.is_empty() {
            return Err(StoreError::validation("device key list is empty"));
        }
        let value = encode_members(device_keys)?;

        self.with_db(|db| {
            let write_txn = db.begin_write()?;

            let missing = {
                let devices = write_txn.open_table(DEVICES)?;
                let mut missing = None;
                for device_key in device_keys {
                    if devices.get(device_key.as_str())?.is_none() {
                        missing = Some(device_key.clone());
                        break;
                    }
                }
                missing
            };

            if let Some(device_key) = missing {
                write_txn.abort()?;
                warn!(group_key, device_key = %device_key, "Rejected group with unknown device");
                return Err(StoreError::device_not_found(device_key));
            }

            let (resolved, minted) = {
                let mut groups = write_txn.open_table(GROUPS)?;

                let (resolved, minted) =
                    if !group_key.is_empty() && groups.get(group_key)?.is_some() {
                        (group_key.to_string(), false)
                    } else {
                        let fresh = loop {
                            let candidate = mint_group_key();
                            if groups.get(candidate.as_str())?.is_none() {
                                break candidate;
                            }
                        };
                        (fresh, true)
                    };

                groups.insert(resolved.as_str(), value.as_slice())?;
                (resolved, minted)
            };

            write_txn.commit()?;

            debug!(
                group_key = %resolved,
                minted,
                members = device_keys.len(),
                "Saved device group"
            );
            Ok(resolved)
        })
    }

    /// Ordered device keys of a group
    pub fn group_members(&self, group_key: &str) -> StoreResult<Vec<String>> {
        self.with_db(|db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(GROUPS)?;

            let members = match table.get(group_key)? {
                Some(value) => decode_members(value.value())?,
                None => return Err(StoreError::group_not_found(group_key)),
            };

            trace!(group_key, members = members.len(), "Fetched group members");
            Ok(members)
        })
    }

    /// Run `f` against the open database, holding off `close` meanwhile
    fn with_db<T>(&self, f: impl FnOnce(&Database) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StoreError::Closed)?;
        f(db)
    }
}

/// Table length as a `usize`, refusing to truncate
fn entry_count(len: u64) -> StoreResult<usize> {
    usize::try_from(len).map_err(|_| StoreError::storage(format!("{len} entries overflow usize")))
}

impl DeviceRegistry for DeviceStore {
    fn count_all(&self) -> StoreResult<usize> {
        DeviceStore::count_all(self)
    }

    fn close(&self) -> StoreResult<()> {
        DeviceStore::close(self)
    }

    fn device_token(&self, key: &str) -> StoreResult<String> {
        DeviceStore::device_token(self, key)
    }

    fn upsert_device_token(&self, key: &str, token: &str) -> StoreResult<String> {
        DeviceStore::upsert_device_token(self, key, token)
    }

    fn upsert_group(&self, group_key: &str, device_keys: &[String]) -> StoreResult<String> {
        DeviceStore::upsert_group(self, group_key, device_keys)
    }

    fn group_members(&self, group_key: &str) -> StoreResult<Vec<String>> {
        DeviceStore::group_members(self, group_key)
    }
}
