//! Blake3 hashing utilities for the ledger.
//!
//! Every `get_hash()` in the crate hashes a string and stores the digest as
//! 64 lowercase hex characters. [`Hash`] is the decoded 32-byte form used
//! when a digest has to be signed or verified.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named alias for a 32-byte(u8) array, used to represent a 256-bit hash.
pub type H256 = [u8; 32];

/// A wrapper type for H256 with Display and Debug formatting.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub H256);

impl Hash {
    /// The zero hash (all zeros).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &H256 {
        &self.0
    }

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..8])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Hash arbitrary data using Blake3.
pub fn hash(data: &[u8]) -> Hash {
    Hash(blake3::hash(data).into())
}

/// Hash a string and return the lowercase hex digest.
pub fn hash_hex(data: &str) -> String {
    hash(data.as_bytes()).to_hex()
}

/// Check that a hex digest starts with `difficulty` `'0'` characters.
pub fn meets_difficulty(hex_hash: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    hex_hash.len() >= difficulty && hex_hash.bytes().take(difficulty).all(|b| b == b'0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash_hex("hello world"), hash_hex("hello world"));
    }

    #[test]
    fn test_hash_different_inputs() {
        assert_ne!(hash_hex("hello"), hash_hex("world"));
    }

    #[test]
    fn test_hash_hex_is_lowercase_64_chars() {
        let digest = hash_hex("test data");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_hash_from_hex() {
        let h = hash(b"test data");
        let parsed = Hash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, parsed);
        assert!(Hash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_meets_difficulty() {
        assert!(meets_difficulty("00ab", 2));
        assert!(meets_difficulty("00ab", 0));
        assert!(!meets_difficulty("0a0b", 2));
        assert!(!meets_difficulty("00", 3));
    }
}
