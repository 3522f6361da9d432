// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential hashing (PBKDF2-HMAC-SHA256).
//!
//! Stored form: `pbkdf2-sha256$<iterations>$<salt b64>$<hash b64>`.

use std::num::NonZeroU32;

use base64ct::{Base64, Encoding};
use ring::{
    pbkdf2,
    rand::{SecureRandom, SystemRandom},
};

use super::AuthError;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};

/// Hash `credential` with a fresh random salt.
pub fn hash_credential(credential: &str) -> Result<String, AuthError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| AuthError::InternalError("random source unavailable".to_string()))?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        ITERATIONS,
        &salt,
        credential.as_bytes(),
        &mut hash,
    );

    Ok(format!(
        "{SCHEME}${}${}${}",
        ITERATIONS,
        Base64::encode_string(&salt),
        Base64::encode_string(&hash)
    ))
}

/// Check `credential` against a stored hash.
///
/// Unparseable stored values never verify.
pub fn verify_credential(credential: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    let Some(iterations) = iterations.parse().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (Base64::decode_vec(salt), Base64::decode_vec(hash)) else {
        return false;
    };

    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        credential.as_bytes(),
        &hash,
    )
    .is_ok()
}
