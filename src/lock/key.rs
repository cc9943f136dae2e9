//! Owner keys.
//!
//! A key is 64 random bytes presented as 128 lowercase hex characters. It is
//! stored as-is and checked with a constant-time comparison.

use std::fmt;

use rand::Rng;
use subtle::ConstantTimeEq;

use crate::{FilelockError, Result};

/// Number of random bytes in a key.
pub const KEY_BYTES: usize = 64;

/// Length of a key's hex form.
pub const KEY_HEX_LEN: usize = KEY_BYTES * 2;

/// A well-formed owner key.
#[derive(Clone, PartialEq, Eq)]
pub struct OwnerKey(String);

impl OwnerKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_BYTES];
        rand::rng().fill(&mut bytes[..]);

        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Parse a client-supplied key.
    ///
    /// The key is taken exactly as given; an upper-case or padded copy of a
    /// stored key does not match it.
    pub fn parse(key: &str) -> Result<Self> {
        if key.len() != KEY_HEX_LEN {
            return Err(FilelockError::InvalidArgument(format!(
                "key must be {KEY_HEX_LEN} hex characters"
            )));
        }
        if !key.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(FilelockError::InvalidArgument(
                "key must be hexadecimal".to_string(),
            ));
        }

        Ok(Self(key.to_string()))
    }

    /// The hex form of the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a stored key without leaking where they differ.
    pub fn matches(&self, stored: &str) -> bool {
        self.0.as_bytes().ct_eq(stored.as_bytes()).into()
    }
}

impl fmt::Debug for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OwnerKey(..)")
    }
}
