// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway operation pipeline.
//!
//! Every outbound operation runs the same steps:
//!
//! 1. check the caller's required fields (no network call on failure)
//! 2. fill `notify_url` / `spbill_create_ip` defaults from the credential
//! 3. merge `appid`, `mch_id`, `trade_type` (where used) and a fresh nonce
//! 4. sign the merged set and insert `sign`
//! 5. encode and POST the envelope
//! 6. decode the response; a non-`SUCCESS` status is a gateway error
//! 7. verify the response signature, unless the operation is a query
//!
//! Status and signature are checked independently. A `SUCCESS` status with
//! a bad signature is a [`PayError::Signature`], never a success.

use tracing::{debug, info, warn};

use super::operations::{
    Operation, Verification, CLOSE_ORDER, MICRO_PAY, ORDER_QUERY, REFUND, REFUND_QUERY,
    REVERSE_ORDER, UNIFIED_ORDER,
};
use super::transport::{GatewayTransport, HttpsTransport};
use crate::config::{api_base_url_from_env, GatewayCredential, DEFAULT_API_BASE_URL};
use crate::error::{PayError, PayResult};
use crate::models::{fields, ParameterSet, FAIL, SUCCESS};
use crate::protocol::response::{
    CloseOrderResponse, MicroPayResponse, NotifyResponse, OrderQueryResponse, RefundQueryResponse,
    RefundResponse, ResponseShape, ReverseOrderResponse, UnifiedOrderResponse,
};
use crate::protocol::{codec, nonce, signing};

/// Client for the gateway's signed XML operations.
#[derive(Debug, Clone)]
pub struct GatewayClient<T = HttpsTransport> {
    transport: T,
    base_url: String,
}

impl GatewayClient<HttpsTransport> {
    /// Client for the production gateway over HTTPS.
    pub fn new() -> Self {
        Self::with_transport(HttpsTransport::new())
    }

    /// HTTPS client using `WXPAY_API_BASE_URL` when set.
    pub fn from_env() -> PayResult<Self> {
        Self::new().with_base_url(api_base_url_from_env())
    }
}

impl Default for GatewayClient<HttpsTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: GatewayTransport> GatewayClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Point the client at another gateway host (sandbox, mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> PayResult<Self> {
        let base_url = base_url.into();
        let parsed = url::Url::parse(&base_url)
            .map_err(|e| PayError::Config(format!("invalid gateway base URL {base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "https" | "http") {
            return Err(PayError::Config(format!(
                "gateway base URL must be http(s): {base_url}"
            )));
        }
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Full URL of an operation's endpoint.
    pub fn endpoint(&self, operation: &Operation) -> String {
        format!("{}{}", self.base_url, operation.path)
    }

    /// Run steps 1-4: validate, default, merge and sign.
    pub fn prepare(
        &self,
        operation: &Operation,
        credential: &GatewayCredential,
        mut params: ParameterSet,
    ) -> PayResult<ParameterSet> {
        operation.validate(&params, credential)?;

        if operation.fills_notify_url {
            params.fill_if_blank(fields::NOTIFY_URL, &credential.notify_url);
        }
        if operation.fills_client_ip {
            params.fill_if_blank(fields::SPBILL_CREATE_IP, &credential.spbill_create_ip);
        }

        params.insert(fields::APP_ID, credential.app_id.as_str());
        params.insert(fields::MCH_ID, credential.mch_id.as_str());
        if operation.sends_trade_type {
            params.insert(fields::TRADE_TYPE, credential.trade_type.as_str());
        }
        params.insert(fields::NONCE_STR, nonce::generate(nonce::NONCE_LENGTH)?);

        let signature = signing::sign(&params, credential.app_key());
        params.insert(fields::SIGN, signature);
        Ok(params)
    }

    /// Run one operation end to end.
    pub async fn execute<S: ResponseShape>(
        &self,
        operation: &Operation,
        credential: &GatewayCredential,
        params: ParameterSet,
    ) -> PayResult<S> {
        let params = self.prepare(operation, credential, params)?;
        let envelope = codec::encode(&params)?;
        let url = self.endpoint(operation);

        debug!(
            operation = operation.name,
            endpoint = %url,
            fields = params.len(),
            "sending gateway request"
        );

        let body = self
            .transport
            .post(
                &url,
                envelope,
                credential.tls_identity.as_ref(),
                credential.timeout,
            )
            .await?;

        let response = check_response::<S>(
            operation.name,
            operation.verification,
            credential.app_key(),
            &body,
        )?;

        let undeclared = response.undeclared_fields();
        if !undeclared.is_empty() {
            debug!(
                operation = operation.name,
                fields = ?undeclared,
                "response carries fields without accessors"
            );
        }

        info!(
            operation = operation.name,
            result_code = response.record().result_code().unwrap_or_default(),
            verified = operation.verifies_signature(),
            "gateway operation completed"
        );
        Ok(response)
    }

    /// Create a prepaid order. Requires `out_trade_no`, `body`, `total_fee`
    /// (plus `openid` for JSAPI and `product_id` for NATIVE).
    pub async fn unified_order(
        &self,
        credential: &GatewayCredential,
        params: ParameterSet,
    ) -> PayResult<UnifiedOrderResponse> {
        self.execute(&UNIFIED_ORDER, credential, params).await
    }

    /// Query an order by `out_trade_no` or `transaction_id`. The response
    /// signature is not verified.
    pub async fn order_query(
        &self,
        credential: &GatewayCredential,
        params: ParameterSet,
    ) -> PayResult<OrderQueryResponse> {
        self.execute(&ORDER_QUERY, credential, params).await
    }

    pub async fn close_order(
        &self,
        credential: &GatewayCredential,
        params: ParameterSet,
    ) -> PayResult<CloseOrderResponse> {
        self.execute(&CLOSE_ORDER, credential, params).await
    }

    /// Request a refund. The gateway requires the credential's TLS identity
    /// for this endpoint; the call is attempted either way.
    pub async fn refund(
        &self,
        credential: &GatewayCredential,
        params: ParameterSet,
    ) -> PayResult<RefundResponse> {
        self.execute(&REFUND, credential, params).await
    }

    /// Query refund status. The response signature is not verified.
    pub async fn refund_query(
        &self,
        credential: &GatewayCredential,
        params: ParameterSet,
    ) -> PayResult<RefundQueryResponse> {
        self.execute(&REFUND_QUERY, credential, params).await
    }

    /// Submit a payment-code (barcode) payment.
    pub async fn micro_pay(
        &self,
        credential: &GatewayCredential,
        params: ParameterSet,
    ) -> PayResult<MicroPayResponse> {
        self.execute(&MICRO_PAY, credential, params).await
    }

    /// Reverse an order. Mutual TLS, like `refund`.
    pub async fn reverse_order(
        &self,
        credential: &GatewayCredential,
        params: ParameterSet,
    ) -> PayResult<ReverseOrderResponse> {
        self.execute(&REVERSE_ORDER, credential, params).await
    }

    /// Verify a payment notification pushed by the gateway.
    pub fn notify(&self, credential: &GatewayCredential, body: &[u8]) -> PayResult<NotifyResponse> {
        receive_notify(credential, body)
    }
}

/// Verify a payment notification pushed by the gateway (steps 6 and 7 only).
pub fn receive_notify(credential: &GatewayCredential, body: &[u8]) -> PayResult<NotifyResponse> {
    check_response("notify", Verification::Verify, credential.app_key(), body)
}

/// Decode a response, check its status, and verify its signature if asked.
fn check_response<S: ResponseShape>(
    operation: &'static str,
    verification: Verification,
    secret_key: &str,
    body: &[u8],
) -> PayResult<S> {
    let response: S = codec::decode(body)?;
    let record = response.record();

    if !record.is_success() {
        let message = match record.return_msg() {
            "" => record.return_code().to_string(),
            msg => msg.to_string(),
        };
        warn!(
            operation,
            return_code = record.return_code(),
            error = %message,
            "gateway rejected request"
        );
        return Err(PayError::Gateway { message });
    }

    if verification == Verification::Verify {
        let carried = record.sign().unwrap_or_default();
        if !signing::verify(&codec::flatten(&response), secret_key, carried) {
            warn!(operation, "gateway response signature mismatch");
            return Err(PayError::Signature);
        }
    }

    Ok(response)
}

/// Envelope the merchant answers a notification with.
pub fn notify_reply(ok: bool, message: &str) -> PayResult<Vec<u8>> {
    let reply = ParameterSet::from([
        (fields::RETURN_CODE, if ok { SUCCESS } else { FAIL }),
        (fields::RETURN_MSG, message),
    ]);
    codec::encode(&reply)
}
