// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! WxPay Gateway - Signed XML client for the merchant payment gateway
//!
//! This crate builds signed request envelopes for the gateway's merchant
//! API, sends them over HTTPS (mutual TLS for refund and reverse), and
//! verifies the signed envelopes that come back, including the payment
//! notifications the gateway pushes to the merchant.
//!
//! ## Modules
//!
//! - `models` - Parameter sets, trade types and wire field names
//! - `protocol` - Nonces, canonical MD5 signing, XML envelope codec
//! - `gateway` - Transport, operation table, pipeline, checkout helpers
//! - `config` - Merchant credential and TLS identity
//! - `api` - Notification intake HTTP handlers (Axum)
//!
//! ## Example
//!
//! ```no_run
//! use wxpay_gateway::{GatewayClient, GatewayCredential, ParameterSet};
//!
//! # async fn run() -> wxpay_gateway::PayResult<()> {
//! let credential = GatewayCredential::new("wx8a92954451ec0dfa", "1317382401", "secret")
//!     .with_notify_url("https://merchant.example.com/notify")
//!     .with_spbill_create_ip("203.0.113.7");
//!
//! let client = GatewayClient::new();
//! let order = client
//!     .unified_order(
//!         &credential,
//!         ParameterSet::from([
//!             ("out_trade_no", "1000000000000"),
//!             ("body", "test"),
//!             ("total_fee", "100"),
//!         ]),
//!     )
//!     .await?;
//! println!("prepay_id = {:?}", order.prepay_id());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod protocol;
pub mod state;

pub use config::{GatewayCredential, TlsIdentity};
pub use error::{PayError, PayResult};
pub use gateway::GatewayClient;
pub use models::{ParameterSet, TradeType};
