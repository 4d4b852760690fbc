// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway operations.
//!
//! This module provides:
//! - The HTTPS transport and its seam for tests
//! - The operation descriptor table
//! - The uniform request/response pipeline and notification intake
//! - Client-side checkout parameter builders

pub mod checkout;
pub mod client;
pub mod operations;
pub mod transport;

pub use checkout::{app_pay, jsapi_pay, jsapi_pay_params, JsapiPayParams};
pub use client::{notify_reply, receive_notify, GatewayClient};
pub use operations::{Operation, Requirement, Verification, OPERATIONS};
pub use transport::{GatewayTransport, HttpsTransport};
