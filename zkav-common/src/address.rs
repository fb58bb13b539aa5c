//! Textual addresses: `"bz"` followed by base58check of the versioned
//! compressed public key.

use crate::error::{Error, Result};
use crate::jubjub::PublicKey;

const ADDRESS_PREFIX: &str = "bz";
const ADDRESS_VERSION: u8 = 0x01;

/// Encode a public key as a `bz…` address.
pub fn encode_address(public: &PublicKey) -> String {
    let encoded = bs58::encode(public.to_bytes())
        .with_check_version(ADDRESS_VERSION)
        .into_string();
    format!("{ADDRESS_PREFIX}{encoded}")
}

/// Decode a `bz…` address back to the public key.
///
/// Rejects a missing prefix, a bad checksum, a wrong version byte, and any
/// payload that is not a curve point.
pub fn decode_address(address: &str) -> Result<PublicKey> {
    let body = address.strip_prefix(ADDRESS_PREFIX).ok_or_else(|| {
        Error::MalformedInput(format!("address missing '{ADDRESS_PREFIX}' prefix"))
    })?;
    let decoded = bs58::decode(body)
        .with_check(Some(ADDRESS_VERSION))
        .into_vec()
        .map_err(|e| Error::MalformedInput(format!("address decode failed: {e}")))?;
    // with_check keeps the version byte at the front
    if decoded.len() != 33 {
        return Err(Error::MalformedInput(format!(
            "address payload has {} bytes, expected 33",
            decoded.len()
        )));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded[1..]);
    PublicKey::from_bytes(&key_bytes)
}
