// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Parsed response envelopes.
//!
//! A [`ResponseRecord`] keeps every element of a response envelope as a
//! `(name, optional value)` pair, in document order. Flattening it back into
//! a [`ParameterSet`] for signature verification is done by one function
//! for every response shape, so the exclusion rules live in one place.
//!
//! The typed shapes ([`UnifiedOrderResponse`] and friends) declare which
//! result fields each operation returns and expose them as accessors over
//! the same record. The declared list is the accessor set only: fields the
//! gateway sends beyond it are kept, flattened and signature-checked, and
//! reported by [`ResponseShape::undeclared_fields`].

use crate::error::{PayError, PayResult};
use crate::models::{fields, ParameterSet, SUCCESS};

/// One parsed response envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseRecord {
    fields: Vec<(String, Option<String>)>,
}

impl ResponseRecord {
    /// Build a record from parsed elements. Empty strings are stored as
    /// absent.
    pub fn from_fields<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        Self {
            fields: entries
                .into_iter()
                .map(|(name, value)| (name, value.filter(|v| !v.is_empty())))
                .collect(),
        }
    }

    /// Value of the first element named `name`, if populated.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Every element in document order, populated or not.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    /// Top-level status code. Empty when the gateway did not send one.
    pub fn return_code(&self) -> &str {
        self.get(fields::RETURN_CODE).unwrap_or_default()
    }

    /// Human-readable status message.
    pub fn return_msg(&self) -> &str {
        self.get(fields::RETURN_MSG).unwrap_or_default()
    }

    /// Signature the gateway attached to this envelope.
    pub fn sign(&self) -> Option<&str> {
        self.get(fields::SIGN)
    }

    pub fn result_code(&self) -> Option<&str> {
        self.get(fields::RESULT_CODE)
    }

    pub fn err_code(&self) -> Option<&str> {
        self.get(fields::ERR_CODE)
    }

    pub fn err_code_des(&self) -> Option<&str> {
        self.get(fields::ERR_CODE_DES)
    }

    /// Whether the communication-level status is the success sentinel.
    pub fn is_success(&self) -> bool {
        self.return_code() == SUCCESS
    }

    /// Whether the business result is also the success sentinel.
    pub fn is_business_success(&self) -> bool {
        self.is_success() && self.result_code() == Some(SUCCESS)
    }

    /// Every populated field except `sign`, keyed by the exact element name.
    pub fn flatten(&self) -> ParameterSet {
        self.fields
            .iter()
            .filter(|(name, _)| name != fields::SIGN)
            .filter_map(|(name, value)| value.as_ref().map(|v| (name.clone(), v.clone())))
            .collect()
    }

    /// Check the fields every response must carry.
    ///
    /// `return_code` is always required. The signature is only required on
    /// success envelopes: the gateway answers rejected requests with an
    /// unsigned `return_code`/`return_msg` pair. `return_msg` itself is
    /// optional: pushed notifications routinely omit it, and a rejection
    /// without one reports its `return_code` as the message.
    pub(crate) fn check_mandatory(&self) -> PayResult<()> {
        if self.get(fields::RETURN_CODE).is_none() {
            return Err(PayError::Parse(format!(
                "missing mandatory field {}",
                fields::RETURN_CODE
            )));
        }
        if self.is_success() && self.sign().is_none() {
            return Err(PayError::Parse(format!(
                "missing mandatory field {}",
                fields::SIGN
            )));
        }
        Ok(())
    }
}

/// A typed view over a [`ResponseRecord`] for one operation.
pub trait ResponseShape: Sized {
    /// Result fields this operation declares, beyond the common ones.
    const FIELDS: &'static [&'static str];

    fn from_record(record: ResponseRecord) -> Self;

    fn record(&self) -> &ResponseRecord;

    fn into_record(self) -> ResponseRecord;

    /// Populated fields that neither [`COMMON_FIELDS`] nor [`Self::FIELDS`]
    /// declare, such as indexed refund entries. They are still covered by
    /// the signature, but have no typed accessor.
    fn undeclared_fields(&self) -> Vec<&str> {
        self.record()
            .entries()
            .filter(|(name, value)| {
                value.is_some() && !COMMON_FIELDS.contains(name) && !Self::FIELDS.contains(name)
            })
            .map(|(name, _)| name)
            .collect()
    }
}

/// Fields every response shape shares.
pub const COMMON_FIELDS: &[&str] = &[
    "return_code",
    "return_msg",
    "appid",
    "mch_id",
    "device_info",
    "nonce_str",
    "sign",
    "result_code",
    "err_code",
    "err_code_des",
];

macro_rules! response_shape {
    ($(#[$meta:meta])* $name:ident { $($field:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            record: ResponseRecord,
        }

        impl $name {
            $(
                pub fn $field(&self) -> Option<&str> {
                    self.record.get(stringify!($field))
                }
            )*
        }

        impl ResponseShape for $name {
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];

            fn from_record(record: ResponseRecord) -> Self {
                Self { record }
            }

            fn record(&self) -> &ResponseRecord {
                &self.record
            }

            fn into_record(self) -> ResponseRecord {
                self.record
            }
        }

        impl std::ops::Deref for $name {
            type Target = ResponseRecord;

            fn deref(&self) -> &ResponseRecord {
                &self.record
            }
        }
    };
}

response_shape! {
    /// Result of `unified_order`.
    UnifiedOrderResponse {
        trade_type,
        prepay_id,
        code_url,
        mweb_url,
    }
}

response_shape! {
    /// Result of `order_query`. Not signature-verified.
    OrderQueryResponse {
        openid,
        is_subscribe,
        trade_type,
        trade_state,
        bank_type,
        total_fee,
        settlement_total_fee,
        fee_type,
        cash_fee,
        cash_fee_type,
        coupon_fee,
        coupon_count,
        transaction_id,
        out_trade_no,
        attach,
        time_end,
        trade_state_desc,
    }
}

response_shape! {
    /// Result of `close_order`.
    CloseOrderResponse {
        result_msg,
    }
}

response_shape! {
    /// Result of `refund`.
    RefundResponse {
        transaction_id,
        out_trade_no,
        out_refund_no,
        refund_id,
        refund_fee,
        settlement_refund_fee,
        total_fee,
        settlement_total_fee,
        fee_type,
        cash_fee,
        cash_fee_type,
        cash_refund_fee,
        coupon_refund_fee,
        coupon_refund_count,
    }
}

response_shape! {
    /// Result of `refund_query`. Not signature-verified.
    ///
    /// Per-refund fields are indexed (`out_refund_no_0`, `refund_status_0`,
    /// ...) and are read with [`ResponseRecord::get`].
    RefundQueryResponse {
        transaction_id,
        out_trade_no,
        total_fee,
        settlement_total_fee,
        fee_type,
        cash_fee,
        refund_count,
    }
}

response_shape! {
    /// Payment result pushed by the gateway to the merchant's callback URL.
    NotifyResponse {
        openid,
        is_subscribe,
        trade_type,
        bank_type,
        total_fee,
        settlement_total_fee,
        fee_type,
        cash_fee,
        cash_fee_type,
        coupon_fee,
        coupon_count,
        transaction_id,
        out_trade_no,
        attach,
        time_end,
    }
}

response_shape! {
    /// Result of `micro_pay`.
    MicroPayResponse {
        openid,
        is_subscribe,
        trade_type,
        bank_type,
        fee_type,
        total_fee,
        settlement_total_fee,
        coupon_fee,
        cash_fee_type,
        cash_fee,
        transaction_id,
        out_trade_no,
        attach,
        time_end,
    }
}

response_shape! {
    /// Result of `reverse_order`.
    ReverseOrderResponse {
        recall,
    }
}
