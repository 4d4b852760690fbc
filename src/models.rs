// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Gateway Data Models
//!
//! This module defines the flat parameter set that every request and
//! response envelope carries, the gateway's operation modes, and the wire
//! field names the core itself reads or writes.
//!
//! ## Parameter Sets
//!
//! A [`ParameterSet`] maps field names to string values. Empty values mean
//! "absent": they are skipped when signing and when encoding the envelope.
//! Iteration is always in byte-wise key order, which is the canonical order
//! the signer needs.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PayError;

// =============================================================================
// Wire Field Names
// =============================================================================

/// Field names fixed by the upstream gateway contract.
pub mod fields {
    /// Reserved signature field, never part of its own signature.
    pub const SIGN: &str = "sign";
    pub const APP_ID: &str = "appid";
    pub const MCH_ID: &str = "mch_id";
    pub const NONCE_STR: &str = "nonce_str";
    pub const TRADE_TYPE: &str = "trade_type";
    pub const NOTIFY_URL: &str = "notify_url";
    pub const SPBILL_CREATE_IP: &str = "spbill_create_ip";

    pub const RETURN_CODE: &str = "return_code";
    pub const RETURN_MSG: &str = "return_msg";
    pub const RESULT_CODE: &str = "result_code";
    pub const ERR_CODE: &str = "err_code";
    pub const ERR_CODE_DES: &str = "err_code_des";

    pub const OUT_TRADE_NO: &str = "out_trade_no";
    pub const TRANSACTION_ID: &str = "transaction_id";
    pub const OPENID: &str = "openid";
    pub const PRODUCT_ID: &str = "product_id";
}

/// Literal status value the gateway uses for success.
pub const SUCCESS: &str = "SUCCESS";

/// Literal status value the gateway uses for failure.
pub const FAIL: &str = "FAIL";

// =============================================================================
// Parameter Set
// =============================================================================

/// Flat field-name to field-value mapping carried by one envelope.
///
/// # Example
///
/// ```
/// use wxpay_gateway::models::ParameterSet;
///
/// let params = ParameterSet::from([("out_trade_no", "1000000000000"), ("body", "test")]);
/// assert!(params.is_present("body"));
/// assert!(!params.is_present("total_fee"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, String>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// True when the field exists and is non-empty.
    pub fn is_present(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    /// Set `key` to `value` only if the field is missing or blank.
    pub fn fill_if_blank(&mut self, key: &str, value: &str) {
        if !self.is_present(key) {
            self.insert(key, value);
        }
    }

    /// Every entry, including empty ones, in byte-wise key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Non-empty entries in byte-wise key order.
    pub fn non_empty(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(_, v)| !v.is_empty())
    }

    /// Entries eligible for signing: non-empty and not the signature itself.
    pub fn signable(&self) -> impl Iterator<Item = (&str, &str)> {
        self.non_empty().filter(|(k, _)| *k != fields::SIGN)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for ParameterSet {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl From<HashMap<String, String>> for ParameterSet {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for ParameterSet {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl IntoIterator for ParameterSet {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// =============================================================================
// Trade Type
// =============================================================================

/// Operation mode sent as `trade_type` on order-creating operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    /// In-app browser payment; requires `openid`.
    Jsapi,
    /// QR-code payment; requires `product_id`.
    Native,
    /// Native mobile app payment.
    #[default]
    App,
    /// Mobile web (H5) payment.
    Mweb,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jsapi => "JSAPI",
            Self::Native => "NATIVE",
            Self::App => "APP",
            Self::Mweb => "MWEB",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeType {
    type Err = PayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "JSAPI" => Ok(Self::Jsapi),
            "NATIVE" => Ok(Self::Native),
            "APP" => Ok(Self::App),
            "MWEB" => Ok(Self::Mweb),
            other => Err(PayError::Config(format!("unknown trade type: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_is_byte_wise_ascending() {
        let params = ParameterSet::from([("b", "2"), ("a", "1"), ("A", "0"), ("_", "3")]);
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "_", "a", "b"]);
    }

    #[test]
    fn signable_skips_sign_and_empty_values() {
        let params = ParameterSet::from([
            ("body", "test"),
            ("sign", "ABC"),
            ("attach", ""),
            ("total_fee", "100"),
        ]);
        let keys: Vec<&str> = params.signable().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["body", "total_fee"]);
    }

    #[test]
    fn fill_if_blank_only_replaces_missing_or_empty() {
        let mut params = ParameterSet::from([("notify_url", ""), ("spbill_create_ip", "10.0.0.1")]);
        params.fill_if_blank("notify_url", "https://merchant.example.com/notify");
        params.fill_if_blank("spbill_create_ip", "127.0.0.1");
        params.fill_if_blank("device_info", "WEB");

        assert_eq!(
            params.get("notify_url"),
            Some("https://merchant.example.com/notify")
        );
        assert_eq!(params.get("spbill_create_ip"), Some("10.0.0.1"));
        assert_eq!(params.get("device_info"), Some("WEB"));
    }

    #[test]
    fn trade_type_parses_case_insensitively() {
        assert_eq!("jsapi".parse::<TradeType>().unwrap(), TradeType::Jsapi);
        assert_eq!(" NATIVE ".parse::<TradeType>().unwrap(), TradeType::Native);
        assert!("CARD".parse::<TradeType>().is_err());
        assert_eq!(TradeType::default().as_str(), "APP");
    }

    #[test]
    fn serializes_as_flat_json_object() {
        let params = ParameterSet::from([("b", "2"), ("a", "1")]);
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"a":"1","b":"2"}"#);
    }
}
