//! redb table definitions and database file preparation
//!
//! Each namespace is one redb table inside a single database file.

use std::fs::{DirBuilder, OpenOptions};
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use redb::{Database, TableDefinition};
use tracing::debug;

use crate::config::DeviceStoreConfig;
use crate::error::InitError;

// Key: device key, Value: device token
pub const DEVICES: TableDefinition<&str, &str> = TableDefinition::new("device");

// Key: group key, Value: encoded device key list (see codec)
pub const GROUPS: TableDefinition<&str, &[u8]> = TableDefinition::new("group");

/// Permissions of the data directory
#[cfg(unix)]
pub const DATA_DIR_MODE: u32 = 0o700;

/// Permissions of the database file
#[cfg(unix)]
pub const DB_FILE_MODE: u32 = 0o600;

/// Open the database described by `config`, creating everything missing
pub(crate) fn open_database(config: &DeviceStoreConfig) -> Result<Database, InitError> {
    ensure_data_dir(&config.data_dir)?;

    let path = config.db_path();
    ensure_db_file(&path)?;

    let db = Database::builder()
        .set_cache_size(config.cache_size)
        .create(&path)
        .map_err(|e| InitError::Database {
            path: path.clone(),
            message: e.to_string(),
        })?;

    init_tables(&db)?;
    Ok(db)
}

fn ensure_data_dir(dir: &Path) -> Result<(), InitError> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => return Err(InitError::NotADirectory(dir.to_path_buf())),
        Err(e) if e.kind() == IoErrorKind::NotFound => {}
        Err(source) => {
            return Err(InitError::DataDir {
                path: dir.to_path_buf(),
                source,
            });
        }
    }

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DATA_DIR_MODE);
    }

    builder.create(dir).map_err(|source| InitError::DataDir {
        path: dir.to_path_buf(),
        source,
    })?;

    debug!(dir = %dir.display(), "Created data directory");
    Ok(())
}

// redb initializes an empty file in place, so creating it here lets us pick
// the permissions.
fn ensure_db_file(path: &Path) -> Result<(), InitError> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(DB_FILE_MODE);
    }

    options
        .open(path)
        .map(drop)
        .map_err(|source| InitError::DatabaseFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Create both namespaces if they don't exist
fn init_tables(db: &Database) -> Result<(), InitError> {
    let write_txn = db
        .begin_write()
        .map_err(|e| InitError::Namespace(e.to_string()))?;

    write_txn
        .open_table(DEVICES)
        .map_err(|e| InitError::Namespace(e.to_string()))?;
    write_txn
        .open_table(GROUPS)
        .map_err(|e| InitError::Namespace(e.to_string()))?;

    write_txn
        .commit()
        .map_err(|e| InitError::Namespace(e.to_string()))?;

    debug!("Initialized device and group namespaces");
    Ok(())
}
