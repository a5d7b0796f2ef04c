//! Key minting
//!
//! Device keys are random v4 UUIDs encoded as unpadded URL-safe base64,
//! giving a 22 character identifier. Group keys are [`GROUP_KEY_PREFIX`]
//! followed by such an identifier.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use uuid::Uuid;

/// Prefix distinguishing group keys from device keys
pub const GROUP_KEY_PREFIX: &str = "G_";

/// Length of a minted device key
pub const SHORT_ID_LEN: usize = 22;

/// Mint a fresh device key
pub fn mint_device_key() -> String {
    URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
}

/// Mint a fresh group key
pub fn mint_group_key() -> String {
    format!("{GROUP_KEY_PREFIX}{}", mint_device_key())
}

/// Whether `key` has the shape of a minted group key
///
/// A minted device key may itself start with `G_`; the extra length of the
/// prefix is what tells the two apart.
pub fn is_group_key(key: &str) -> bool {
    key.len() == GROUP_KEY_PREFIX.len() + SHORT_ID_LEN && key.starts_with(GROUP_KEY_PREFIX)
}
