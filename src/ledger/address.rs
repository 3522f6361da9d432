// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger account addresses.
//!
//! An address is the 32-byte Ed25519 public key of the account. Its text
//! form is 58 characters of unpadded base32: the key followed by the last
//! four bytes of its SHA-512/256 digest as a checksum.

use std::fmt;
use std::str::FromStr;

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512_256};

/// Length of the text form of an address.
pub const ADDRESS_LEN: usize = 58;

const CHECKSUM_LEN: usize = 4;

/// A ledger account address (raw public key bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    /// Wrap raw public key bytes.
    pub const fn new(public_key: [u8; 32]) -> Self {
        Self(public_key)
    }

    /// Raw public key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The all-zero address. Never a valid signer.
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    fn checksum(public_key: &[u8; 32]) -> [u8; CHECKSUM_LEN] {
        let digest = Sha512_256::digest(public_key);
        let mut sum = [0u8; CHECKSUM_LEN];
        sum.copy_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
        sum
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; 32 + CHECKSUM_LEN];
        buf[..32].copy_from_slice(&self.0);
        buf[32..].copy_from_slice(&Self::checksum(&self.0));
        f.write_str(&BASE32_NOPAD.encode(&buf))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// Errors produced when parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must be {ADDRESS_LEN} characters, got {0}")]
    Length(usize),

    #[error("address is not valid base32")]
    Encoding,

    #[error("address checksum mismatch")]
    Checksum,
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != ADDRESS_LEN {
            return Err(AddressError::Length(s.len()));
        }

        let decoded = BASE32_NOPAD
            .decode(s.as_bytes())
            .map_err(|_| AddressError::Encoding)?;
        if decoded.len() != 32 + CHECKSUM_LEN {
            return Err(AddressError::Encoding);
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&decoded[..32]);
        if decoded[32..] != Self::checksum(&key) {
            return Err(AddressError::Checksum);
        }

        Ok(Self(key))
    }
}

// Addresses travel as strings in JSON and as raw 32-byte bins in msgpack.
// The JSON form is used everywhere outside `transaction`, which serializes
// the raw bytes itself.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
