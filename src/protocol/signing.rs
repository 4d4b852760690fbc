// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical parameter signing.
//!
//! The gateway signs every envelope the same way, in both directions:
//!
//! 1. take every non-empty field except `sign`
//! 2. order the keys byte-wise ascending
//! 3. join them as `k1=v1&k2=v2&...&` and append `key=<secret>`
//! 4. MD5 the UTF-8 bytes and render the digest as uppercase hex
//!
//! Values are concatenated raw. A value containing `&` or `=` is not
//! URL-encoded, because the gateway does not encode them either.
//!
//! MD5 is mandated by the gateway's v2 protocol. It is not a choice this
//! crate would make for a new protocol.

use crate::models::ParameterSet;

/// Build the exact string that gets digested.
pub fn canonical_string(params: &ParameterSet, secret_key: &str) -> String {
    let mut canonical = String::new();
    // ParameterSet iterates in byte-wise key order.
    for (key, value) in params.signable() {
        canonical.push_str(key);
        canonical.push('=');
        canonical.push_str(value);
        canonical.push('&');
    }
    canonical.push_str("key=");
    canonical.push_str(secret_key);
    canonical
}

/// Compute the 32-character uppercase hex signature of `params`.
pub fn sign(params: &ParameterSet, secret_key: &str) -> String {
    let digest = md5::compute(canonical_string(params, secret_key).as_bytes());
    format!("{digest:X}")
}

/// Recompute the signature of `params` and compare it with `carried`.
pub fn verify(params: &ParameterSet, secret_key: &str, carried: &str) -> bool {
    sign(params, secret_key).as_bytes() == carried.as_bytes()
}
