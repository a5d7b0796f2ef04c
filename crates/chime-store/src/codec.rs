//! Group membership encoding
//!
//! A stored group value is laid out as:
//!
//! ```text
//! byte 0   format version (GROUP_FORMAT_V1)
//! bytes 1.. varint(count), then for each device key varint(len) ++ UTF-8
//! ```
//!
//! Varints are unsigned LEB128. The payload after the version byte is the
//! postcard encoding of a sequence of strings.

use crate::error::{StoreError, StoreResult};

/// Current group encoding version
pub const GROUP_FORMAT_V1: u8 = 1;

/// Encode an ordered list of device keys
pub fn encode_members(device_keys: &[String]) -> StoreResult<Vec<u8>> {
    let payload = postcard::to_allocvec(device_keys)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(GROUP_FORMAT_V1);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode a stored group value
pub fn decode_members(bytes: &[u8]) -> StoreResult<Vec<String>> {
    let (version, payload) = bytes
        .split_first()
        .ok_or_else(|| StoreError::decoding("empty group value"))?;

    if *version != GROUP_FORMAT_V1 {
        return Err(StoreError::decoding(format!(
            "unsupported group encoding version {version}"
        )));
    }

    let (device_keys, rest): (Vec<String>, _) = postcard::take_from_bytes(payload)?;
    if !rest.is_empty() {
        return Err(StoreError::decoding(format!(
            "{} trailing bytes after group members",
            rest.len()
        )));
    }

    Ok(device_keys)
}
