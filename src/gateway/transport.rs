// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTPS transport for gateway envelopes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::TlsIdentity;
use crate::error::{PayError, PayResult};

/// Sends one serialized envelope and returns the raw response body.
///
/// Implementations perform exactly one attempt. Retries, if wanted, belong
/// to the caller.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        identity: Option<&TlsIdentity>,
        timeout: Duration,
    ) -> PayResult<Vec<u8>>;
}

/// `reqwest` + `rustls` transport.
///
/// A client is built per call so each call gets its own connection, TLS
/// identity and deadline. The deadline covers connect, send and receive.
#[derive(Debug, Clone, Default)]
pub struct HttpsTransport;

impl HttpsTransport {
    pub fn new() -> Self {
        Self
    }

    fn client(identity: Option<&TlsIdentity>, timeout: Duration) -> PayResult<Client> {
        let mut builder = Client::builder().timeout(timeout).connect_timeout(timeout);
        if let Some(identity) = identity {
            builder = builder.identity(identity.identity()?);
            for root in identity.root_certificates()? {
                builder = builder.add_root_certificate(root);
            }
        }
        builder
            .build()
            .map_err(|e| PayError::Config(format!("failed to build HTTP client: {e}")))
    }
}

#[async_trait]
impl GatewayTransport for HttpsTransport {
    async fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        identity: Option<&TlsIdentity>,
        timeout: Duration,
    ) -> PayResult<Vec<u8>> {
        let client = Self::client(identity, timeout)?;

        debug!(
            url = %url,
            bytes = body.len(),
            mutual_tls = identity.is_some(),
            "posting gateway envelope"
        );

        let response = client
            .post(url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| PayError::Transport(format!("POST {url} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PayError::Transport(format!(
                "POST {url} returned {status}: {body}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PayError::Transport(format!("POST {url} body read failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_without_identity() {
        assert!(HttpsTransport::client(None, Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let transport = HttpsTransport::new();
        // Port 9 (discard) on loopback is closed on test hosts.
        let result = transport
            .post(
                "http://127.0.0.1:9/pay/orderquery",
                b"<xml></xml>".to_vec(),
                None,
                Duration::from_millis(500),
            )
            .await;
        assert!(matches!(result, Err(PayError::Transport(_))));
    }
}
