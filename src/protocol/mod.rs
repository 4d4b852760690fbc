// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing-and-serialization protocol layer.
//!
//! This module provides:
//! - Nonce generation for the anti-replay field
//! - The canonical MD5 parameter signature
//! - The flat XML envelope codec
//! - Parsed response records and their typed shapes

pub mod codec;
pub mod nonce;
pub mod response;
pub mod signing;

pub use response::{
    CloseOrderResponse, MicroPayResponse, NotifyResponse, OrderQueryResponse, RefundQueryResponse,
    RefundResponse, ResponseRecord, ResponseShape, ReverseOrderResponse, UnifiedOrderResponse,
};
