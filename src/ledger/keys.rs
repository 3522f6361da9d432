// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custody keypairs.
//!
//! Each custodied account owns one Ed25519 keypair. The service stores the
//! 32-byte seed and rebuilds the signer whenever a transaction has to be
//! signed. Seeds never leave the storage and orchestration layers.

use ed25519_zebra::{SigningKey, VerificationKey};
use rand::rngs::OsRng;

use super::address::Address;

/// Errors raised when restoring a keypair.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("seed must be 32 bytes, got {0}")]
    SeedLength(usize),

    #[error("seed is not valid hex")]
    SeedEncoding,
}

/// An Ed25519 signing key together with the address it controls.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
    address: Address,
}

impl Keypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::new(OsRng))
    }

    /// Restore a keypair from its 32-byte seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self, KeyError> {
        let seed: [u8; 32] = seed
            .try_into()
            .map_err(|_| KeyError::SeedLength(seed.len()))?;
        Ok(Self::from_signing_key(SigningKey::from(seed)))
    }

    /// Restore a keypair from a hex-encoded seed (64 characters).
    pub fn from_hex_seed(seed_hex: &str) -> Result<Self, KeyError> {
        let seed = hex::decode(seed_hex.trim()).map_err(|_| KeyError::SeedEncoding)?;
        Self::from_seed(&seed)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verification_key = VerificationKey::from(&signing_key);
        let public: [u8; 32] = verification_key.into();
        Self {
            signing_key,
            address: Address::new(public),
        }
    }

    /// The address controlled by this keypair.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The 32-byte seed, for persisting in the custody store.
    pub(crate) fn seed(&self) -> [u8; 32] {
        let mut seed = [0u8; 32];
        seed.copy_from_slice(self.signing_key.as_ref());
        seed
    }

    /// Sign an arbitrary message.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_zebra::Signature;

    #[test]
    fn seed_restores_same_address() {
        let original = Keypair::generate();
        let restored = Keypair::from_seed(&original.seed()).unwrap();
        assert_eq!(original.address(), restored.address());
    }

    #[test]
    fn hex_seed_restores_keypair() {
        let original = Keypair::generate();
        let encoded = hex::encode(original.seed());
        let restored = Keypair::from_hex_seed(&encoded).unwrap();
        assert_eq!(original.address(), restored.address());
    }

    #[test]
    fn rejects_short_seed() {
        assert_eq!(
            Keypair::from_seed(&[1u8; 16]).unwrap_err(),
            KeyError::SeedLength(16)
        );
        assert_eq!(
            Keypair::from_hex_seed("zz").unwrap_err(),
            KeyError::SeedEncoding
        );
    }

    #[test]
    fn signature_verifies_against_address() {
        let keypair = Keypair::from_seed(&[42u8; 32]).unwrap();
        let sig = keypair.sign(b"TXpayload");

        let vk = VerificationKey::try_from(*keypair.address().as_bytes()).unwrap();
        assert!(vk.verify(&Signature::from(sig), b"TXpayload").is_ok());
        assert!(vk.verify(&Signature::from(sig), b"TXother").is_err());
    }

    #[test]
    fn debug_hides_key_material() {
        let keypair = Keypair::from_seed(&[3u8; 32]).unwrap();
        let debug = format!("{keypair:?}");
        assert!(debug.contains("address"));
        assert!(!debug.contains("signing_key"));
    }
}
