// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Nonce generation for the `nonce_str` anti-replay field.

use rand::distributions::Alphanumeric;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng};

use crate::error::{PayError, PayResult};

/// Nonce length used by every operation and checkout helper.
pub const NONCE_LENGTH: usize = 32;

/// Generate a token of exactly `length` characters from `[A-Za-z0-9]`.
///
/// A fresh CSPRNG is seeded from the operating system for every call. If the
/// OS source is unavailable the call fails with [`PayError::Entropy`] instead
/// of falling back to a weaker generator.
pub fn generate(length: usize) -> PayResult<String> {
    let rng = StdRng::from_rng(OsRng).map_err(|e| PayError::Entropy(e.to_string()))?;
    Ok(rng
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generates_exact_length_alphanumeric() {
        let nonce = generate(NONCE_LENGTH).unwrap();
        assert_eq!(nonce.len(), 32);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn honours_requested_length() {
        assert_eq!(generate(1).unwrap().len(), 1);
        assert_eq!(generate(16).unwrap().len(), 16);
        assert_eq!(generate(64).unwrap().len(), 64);
    }

    #[test]
    fn ten_thousand_nonces_do_not_collide() {
        let mut seen = HashSet::with_capacity(10_000);
        for _ in 0..10_000 {
            assert!(seen.insert(generate(NONCE_LENGTH).unwrap()));
        }
    }
}
