// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operation descriptor table.
//!
//! Each outbound gateway operation is one [`Operation`] value: its endpoint
//! path, the fields the caller must supply, which defaults are filled from
//! the credential, and whether the response signature is verified. The
//! pipeline in [`super::client`] runs every operation through the same steps
//! driven by these descriptors.

use crate::config::GatewayCredential;
use crate::error::{PayError, PayResult};
use crate::models::{fields, ParameterSet, TradeType};

/// A caller-supplied field requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// The field must be present and non-empty.
    Field(&'static str),
    /// At least one of the fields must be present and non-empty.
    AnyOf(&'static [&'static str]),
    /// The field is required only when the credential uses `trade_type`.
    ForTradeType {
        trade_type: TradeType,
        field: &'static str,
    },
}

impl Requirement {
    fn check(
        &self,
        operation: &'static str,
        params: &ParameterSet,
        credential: &GatewayCredential,
    ) -> PayResult<()> {
        match self {
            Requirement::Field(field) if !params.is_present(field) => {
                Err(PayError::missing(operation, *field))
            }
            Requirement::AnyOf(group) if !group.iter().any(|f| params.is_present(f)) => {
                Err(PayError::missing(operation, group.join(" or ")))
            }
            Requirement::ForTradeType { trade_type, field }
                if credential.trade_type == *trade_type && !params.is_present(field) =>
            {
                Err(PayError::missing(
                    operation,
                    format!("{field} (trade_type {trade_type})"),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Whether an operation checks the response signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verify,
    /// The gateway convention for query operations: status only.
    StatusOnly,
}

/// Static description of one outbound gateway operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    /// Path appended to the gateway base URL.
    pub path: &'static str,
    pub required: &'static [Requirement],
    pub verification: Verification,
    /// Send the credential's `trade_type`.
    pub sends_trade_type: bool,
    /// Fill a blank `notify_url` from the credential.
    pub fills_notify_url: bool,
    /// Fill a blank `spbill_create_ip` from the credential.
    pub fills_client_ip: bool,
    /// The gateway gates this endpoint behind mutual TLS. Informational:
    /// the server enforces it, the client does not.
    pub mutual_tls: bool,
}

impl Operation {
    /// Check every caller requirement, in declaration order.
    pub fn validate(&self, params: &ParameterSet, credential: &GatewayCredential) -> PayResult<()> {
        self.required
            .iter()
            .try_for_each(|requirement| requirement.check(self.name, params, credential))
    }

    pub fn verifies_signature(&self) -> bool {
        self.verification == Verification::Verify
    }
}

const TRADE_IDS: &[&str] = &[fields::OUT_TRADE_NO, fields::TRANSACTION_ID];

const BASE: Operation = Operation {
    name: "",
    path: "",
    required: &[],
    verification: Verification::Verify,
    sends_trade_type: false,
    fills_notify_url: false,
    fills_client_ip: false,
    mutual_tls: false,
};

pub const UNIFIED_ORDER: Operation = Operation {
    name: "unified_order",
    path: "/pay/unifiedorder",
    required: &[
        Requirement::Field(fields::OUT_TRADE_NO),
        Requirement::Field("body"),
        Requirement::Field("total_fee"),
        Requirement::ForTradeType {
            trade_type: TradeType::Jsapi,
            field: fields::OPENID,
        },
        Requirement::ForTradeType {
            trade_type: TradeType::Native,
            field: fields::PRODUCT_ID,
        },
    ],
    sends_trade_type: true,
    fills_notify_url: true,
    fills_client_ip: true,
    ..BASE
};

pub const ORDER_QUERY: Operation = Operation {
    name: "order_query",
    path: "/pay/orderquery",
    required: &[Requirement::AnyOf(TRADE_IDS)],
    verification: Verification::StatusOnly,
    ..BASE
};

pub const CLOSE_ORDER: Operation = Operation {
    name: "close_order",
    path: "/pay/closeorder",
    required: &[Requirement::Field(fields::OUT_TRADE_NO)],
    ..BASE
};

pub const REFUND: Operation = Operation {
    name: "refund",
    path: "/secapi/pay/refund",
    required: &[
        Requirement::AnyOf(TRADE_IDS),
        Requirement::Field("out_refund_no"),
        Requirement::Field("total_fee"),
        Requirement::Field("refund_fee"),
        Requirement::Field("op_user_id"),
    ],
    mutual_tls: true,
    ..BASE
};

pub const REFUND_QUERY: Operation = Operation {
    name: "refund_query",
    path: "/pay/refundquery",
    required: &[Requirement::AnyOf(&[
        "out_refund_no",
        fields::OUT_TRADE_NO,
        fields::TRANSACTION_ID,
        "refund_id",
    ])],
    verification: Verification::StatusOnly,
    ..BASE
};

pub const MICRO_PAY: Operation = Operation {
    name: "micro_pay",
    path: "/pay/micropay",
    required: &[
        Requirement::Field(fields::OUT_TRADE_NO),
        Requirement::Field("body"),
        Requirement::Field("total_fee"),
        Requirement::Field("auth_code"),
    ],
    sends_trade_type: true,
    fills_client_ip: true,
    ..BASE
};

pub const REVERSE_ORDER: Operation = Operation {
    name: "reverse_order",
    path: "/secapi/pay/reverse",
    required: &[Requirement::AnyOf(TRADE_IDS)],
    mutual_tls: true,
    ..BASE
};

/// Every outbound operation.
pub const OPERATIONS: &[Operation] = &[
    UNIFIED_ORDER,
    ORDER_QUERY,
    CLOSE_ORDER,
    REFUND,
    REFUND_QUERY,
    MICRO_PAY,
    REVERSE_ORDER,
];

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> GatewayCredential {
        GatewayCredential::new("wx", "mch", "key")
    }

    #[test]
    fn only_queries_skip_verification() {
        let skipped: Vec<&str> = OPERATIONS
            .iter()
            .filter(|op| !op.verifies_signature())
            .map(|op| op.name)
            .collect();
        assert_eq!(skipped, vec!["order_query", "refund_query"]);
    }

    #[test]
    fn only_money_movement_uses_secure_paths() {
        for op in OPERATIONS {
            assert_eq!(op.mutual_tls, op.path.starts_with("/secapi/"), "{}", op.name);
        }
    }

    #[test]
    fn field_requirement_names_missing_field() {
        let params = ParameterSet::from([("out_trade_no", "1"), ("body", "test")]);
        match UNIFIED_ORDER.validate(&params, &credential()) {
            Err(PayError::Validation { operation, field }) => {
                assert_eq!(operation, "unified_order");
                assert_eq!(field, "total_fee");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let params = ParameterSet::from([("out_trade_no", "")]);
        assert!(CLOSE_ORDER.validate(&params, &credential()).is_err());
    }

    #[test]
    fn any_of_accepts_either_identifier() {
        let by_trade_no = ParameterSet::from([("out_trade_no", "1")]);
        let by_txn = ParameterSet::from([("transaction_id", "4200")]);
        assert!(ORDER_QUERY.validate(&by_trade_no, &credential()).is_ok());
        assert!(ORDER_QUERY.validate(&by_txn, &credential()).is_ok());

        let err = ORDER_QUERY
            .validate(&ParameterSet::new(), &credential())
            .unwrap_err();
        assert!(err.to_string().contains("out_trade_no or transaction_id"));
    }

    #[test]
    fn trade_type_requirements_follow_credential() {
        let params = ParameterSet::from([
            ("out_trade_no", "1"),
            ("body", "test"),
            ("total_fee", "100"),
        ]);
        assert!(UNIFIED_ORDER.validate(&params, &credential()).is_ok());

        let jsapi = credential().with_trade_type(TradeType::Jsapi);
        let err = UNIFIED_ORDER.validate(&params, &jsapi).unwrap_err();
        assert!(err.to_string().contains("openid"));

        let native = credential().with_trade_type(TradeType::Native);
        let err = UNIFIED_ORDER.validate(&params, &native).unwrap_err();
        assert!(err.to_string().contains("product_id"));
    }

    #[test]
    fn refund_requires_every_money_field() {
        let mut params = ParameterSet::from([
            ("transaction_id", "4200"),
            ("out_refund_no", "R1"),
            ("total_fee", "100"),
            ("refund_fee", "100"),
        ]);
        let err = REFUND.validate(&params, &credential()).unwrap_err();
        assert!(err.to_string().contains("op_user_id"));

        params.insert("op_user_id", "1317382401");
        assert!(REFUND.validate(&params, &credential()).is_ok());
    }
}
