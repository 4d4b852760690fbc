// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Gateway Configuration
//!
//! This module defines the merchant credential every operation is called
//! with, the optional mutual-TLS identity, and the environment variables
//! both can be loaded from.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WXPAY_APP_ID` | Account identifier (`appid`) | Required |
//! | `WXPAY_MCH_ID` | Merchant identifier (`mch_id`) | Required |
//! | `WXPAY_APP_KEY` | Shared signing secret | Required |
//! | `WXPAY_NOTIFY_URL` | Default callback URL | empty |
//! | `WXPAY_SPBILL_CREATE_IP` | Default originating IP | empty |
//! | `WXPAY_TRADE_TYPE` | `JSAPI`, `NATIVE`, `APP` or `MWEB` | `APP` |
//! | `WXPAY_TIMEOUT_SECS` | Deadline for one gateway round trip | `6` |
//! | `WXPAY_TLS_CERT_PATH` | Client certificate (PEM) | unset |
//! | `WXPAY_TLS_KEY_PATH` | Client private key (PEM) | Required with cert |
//! | `WXPAY_TLS_ROOT_CA_PATH` | Trusted root bundle (PEM) | unset |
//! | `WXPAY_API_BASE_URL` | Gateway base URL | `https://api.mch.weixin.qq.com` |
//! | `HOST` | Notify service bind address | `0.0.0.0` |
//! | `PORT` | Notify service bind port | `8080` |
//! | `NOTIFY_TLS_CERT_PATH` | Notify service TLS certificate | unset (plain HTTP) |
//! | `NOTIFY_TLS_KEY_PATH` | Notify service TLS key | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{PayError, PayResult};
use crate::models::TradeType;

pub const APP_ID_ENV: &str = "WXPAY_APP_ID";
pub const MCH_ID_ENV: &str = "WXPAY_MCH_ID";
pub const APP_KEY_ENV: &str = "WXPAY_APP_KEY";
pub const NOTIFY_URL_ENV: &str = "WXPAY_NOTIFY_URL";
pub const SPBILL_CREATE_IP_ENV: &str = "WXPAY_SPBILL_CREATE_IP";
pub const TRADE_TYPE_ENV: &str = "WXPAY_TRADE_TYPE";
pub const TIMEOUT_SECS_ENV: &str = "WXPAY_TIMEOUT_SECS";
pub const TLS_CERT_PATH_ENV: &str = "WXPAY_TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "WXPAY_TLS_KEY_PATH";
pub const TLS_ROOT_CA_PATH_ENV: &str = "WXPAY_TLS_ROOT_CA_PATH";
pub const API_BASE_URL_ENV: &str = "WXPAY_API_BASE_URL";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const NOTIFY_TLS_CERT_PATH_ENV: &str = "NOTIFY_TLS_CERT_PATH";
pub const NOTIFY_TLS_KEY_PATH_ENV: &str = "NOTIFY_TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Production gateway host.
pub const DEFAULT_API_BASE_URL: &str = "https://api.mch.weixin.qq.com";

/// Deadline for one gateway round trip (connect + send + receive).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6);

// =============================================================================
// Mutual TLS Identity
// =============================================================================

/// Client certificate, private key and optional root bundle presented to the
/// gateway for refund and reverse calls.
///
/// PEM blocks are checked when the identity is built, so a broken identity
/// fails at configuration time rather than in the middle of a refund.
#[derive(Clone)]
pub struct TlsIdentity {
    identity_pem: Vec<u8>,
    root_ca_pem: Option<Vec<u8>>,
}

impl TlsIdentity {
    /// Build an identity from in-memory PEM data.
    pub fn from_pem(
        cert_pem: &[u8],
        key_pem: &[u8],
        root_ca_pem: Option<&[u8]>,
    ) -> PayResult<Self> {
        require_blocks(cert_pem, "client certificate", |tag| tag == "CERTIFICATE")?;
        require_blocks(key_pem, "client private key", |tag| {
            tag.ends_with("PRIVATE KEY")
        })?;
        if let Some(root) = root_ca_pem {
            require_blocks(root, "root CA bundle", |tag| tag == "CERTIFICATE")?;
        }

        let mut identity_pem = cert_pem.to_vec();
        if !identity_pem.ends_with(b"\n") {
            identity_pem.push(b'\n');
        }
        identity_pem.extend_from_slice(key_pem);

        let identity = Self {
            identity_pem,
            root_ca_pem: root_ca_pem.map(<[u8]>::to_vec),
        };
        identity.check()?;
        Ok(identity)
    }

    /// Load an identity from PEM files, in the order certificate, key,
    /// optional root CA.
    pub fn from_pem_files(
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
        root_ca_path: Option<&Path>,
    ) -> PayResult<Self> {
        let cert = read_file(cert_path.as_ref())?;
        let key = read_file(key_path.as_ref())?;
        let root = root_ca_path.map(read_file).transpose()?;
        Self::from_pem(&cert, &key, root.as_deref())
    }

    pub(crate) fn identity(&self) -> PayResult<reqwest::Identity> {
        reqwest::Identity::from_pem(&self.identity_pem)
            .map_err(|e| PayError::Config(format!("invalid client identity: {e}")))
    }

    pub(crate) fn root_certificates(&self) -> PayResult<Vec<reqwest::Certificate>> {
        let Some(root) = &self.root_ca_pem else {
            return Ok(Vec::new());
        };
        pem::parse_many(root)
            .map_err(|e| PayError::Config(format!("invalid root CA bundle: {e}")))?
            .iter()
            .map(|block| {
                reqwest::Certificate::from_der(block.contents())
                    .map_err(|e| PayError::Config(format!("invalid root certificate: {e}")))
            })
            .collect()
    }

    /// Build a throwaway TLS client from this identity.
    ///
    /// The private key is loaded into the TLS stack and every certificate,
    /// the client chain included, is parsed by adding it to a trust store.
    /// Splitting the PEM alone would accept blocks holding garbage DER.
    pub fn check(&self) -> PayResult<()> {
        let mut builder = reqwest::Client::builder().identity(self.identity()?);
        for cert in self.client_certificates()? {
            builder = builder.add_root_certificate(cert);
        }
        for root in self.root_certificates()? {
            builder = builder.add_root_certificate(root);
        }
        builder
            .build()
            .map(drop)
            .map_err(|e| PayError::Config(format!("client identity cannot be loaded: {e}")))
    }

    fn client_certificates(&self) -> PayResult<Vec<reqwest::Certificate>> {
        pem::parse_many(&self.identity_pem)
            .map_err(|e| PayError::Config(format!("invalid client identity: {e}")))?
            .iter()
            .filter(|block| block.tag() == "CERTIFICATE")
            .map(|block| {
                reqwest::Certificate::from_der(block.contents())
                    .map_err(|e| PayError::Config(format!("invalid client certificate: {e}")))
            })
            .collect()
    }

    pub fn has_root_ca(&self) -> bool {
        self.root_ca_pem.is_some()
    }
}

impl fmt::Debug for TlsIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsIdentity")
            .field("identity_pem", &"<redacted>")
            .field("root_ca", &self.has_root_ca())
            .finish()
    }
}

fn require_blocks(data: &[u8], what: &str, accept: impl Fn(&str) -> bool) -> PayResult<()> {
    let blocks =
        pem::parse_many(data).map_err(|e| PayError::Config(format!("{what} is not PEM: {e}")))?;
    if blocks.iter().any(|block| accept(block.tag())) {
        Ok(())
    } else {
        Err(PayError::Config(format!("{what} contains no usable PEM block")))
    }
}

fn read_file(path: &Path) -> PayResult<Vec<u8>> {
    fs::read(path).map_err(|e| PayError::Config(format!("failed to read {}: {e}", path.display())))
}

// =============================================================================
// Gateway Credential
// =============================================================================

/// Merchant account data every operation is called with.
///
/// Owned by the caller and passed by reference; the core never mutates it.
#[derive(Clone)]
pub struct GatewayCredential {
    /// Account identifier, sent as `appid`.
    pub app_id: String,
    /// Merchant identifier, sent as `mch_id`.
    pub mch_id: String,
    app_key: String,
    /// Callback URL used when the caller leaves `notify_url` blank.
    pub notify_url: String,
    /// Originating IP used when the caller leaves `spbill_create_ip` blank.
    pub spbill_create_ip: String,
    /// Operation mode sent as `trade_type`.
    pub trade_type: TradeType,
    /// Client identity for mutual-TLS operations.
    pub tls_identity: Option<TlsIdentity>,
    /// Deadline for one gateway round trip.
    pub timeout: Duration,
}

impl GatewayCredential {
    pub fn new(
        app_id: impl Into<String>,
        mch_id: impl Into<String>,
        app_key: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            mch_id: mch_id.into(),
            app_key: app_key.into(),
            notify_url: String::new(),
            spbill_create_ip: String::new(),
            trade_type: TradeType::default(),
            tls_identity: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_notify_url(mut self, url: impl Into<String>) -> Self {
        self.notify_url = url.into();
        self
    }

    pub fn with_spbill_create_ip(mut self, ip: impl Into<String>) -> Self {
        self.spbill_create_ip = ip.into();
        self
    }

    pub fn with_trade_type(mut self, trade_type: TradeType) -> Self {
        self.trade_type = trade_type;
        self
    }

    pub fn with_tls_identity(mut self, identity: TlsIdentity) -> Self {
        self.tls_identity = Some(identity);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The shared signing secret.
    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    /// Load the credential from the `WXPAY_*` environment variables.
    pub fn from_env() -> PayResult<Self> {
        let mut credential = Self::new(
            env_required(APP_ID_ENV)?,
            env_required(MCH_ID_ENV)?,
            env_required(APP_KEY_ENV)?,
        )
        .with_notify_url(env_optional(NOTIFY_URL_ENV).unwrap_or_default())
        .with_spbill_create_ip(env_optional(SPBILL_CREATE_IP_ENV).unwrap_or_default());

        if let Some(trade_type) = env_optional(TRADE_TYPE_ENV) {
            credential.trade_type = trade_type.parse()?;
        }

        if let Some(secs) = env_optional(TIMEOUT_SECS_ENV) {
            let secs: u64 = secs
                .parse()
                .map_err(|e| PayError::Config(format!("{TIMEOUT_SECS_ENV}: {e}")))?;
            credential.timeout = Duration::from_secs(secs);
        }

        if let Some(cert_path) = env_optional(TLS_CERT_PATH_ENV) {
            let key_path = env_required(TLS_KEY_PATH_ENV)?;
            let root_ca_path = env_optional(TLS_ROOT_CA_PATH_ENV);
            credential.tls_identity = Some(TlsIdentity::from_pem_files(
                cert_path,
                key_path,
                root_ca_path.as_deref().map(Path::new),
            )?);
        }

        Ok(credential)
    }
}

impl fmt::Debug for GatewayCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCredential")
            .field("app_id", &self.app_id)
            .field("mch_id", &self.mch_id)
            .field("app_key", &"<redacted>")
            .field("notify_url", &self.notify_url)
            .field("spbill_create_ip", &self.spbill_create_ip)
            .field("trade_type", &self.trade_type)
            .field("tls_identity", &self.tls_identity)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Gateway base URL from `WXPAY_API_BASE_URL`, or the production host.
pub fn api_base_url_from_env() -> String {
    env_or_default(API_BASE_URL_ENV, DEFAULT_API_BASE_URL)
}

pub(crate) fn env_required(name: &str) -> PayResult<String> {
    env_optional(name).ok_or_else(|| PayError::Config(format!("{name} is not set")))
}

pub(crate) fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn pem_block(tag: &str, contents: &[u8]) -> String {
        pem::encode(&pem::Pem::new(tag, contents.to_vec()))
    }

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn credential_defaults() {
        let credential = GatewayCredential::new("wx8a92954451ec0dfa", "1317382401", "secret");
        assert_eq!(credential.trade_type, TradeType::App);
        assert_eq!(credential.timeout, Duration::from_secs(6));
        assert!(credential.tls_identity.is_none());
        assert_eq!(credential.app_key(), "secret");
    }

    #[test]
    fn debug_output_redacts_secret() {
        let credential = GatewayCredential::new("wx", "mch", "y7c2743910e94b220b0048af87437881");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("y7c2743910e94b220b0048af87437881"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn builder_sets_optional_fields() {
        let credential = GatewayCredential::new("wx", "mch", "key")
            .with_notify_url("https://merchant.example.com/notify")
            .with_spbill_create_ip("10.0.0.8")
            .with_trade_type(TradeType::Native)
            .with_timeout(Duration::from_secs(2));
        assert_eq!(credential.notify_url, "https://merchant.example.com/notify");
        assert_eq!(credential.spbill_create_ip, "10.0.0.8");
        assert_eq!(credential.trade_type, TradeType::Native);
        assert_eq!(credential.timeout, Duration::from_secs(2));
    }

    const CLIENT_CERT: &str = include_str!("../tests/fixtures/apiclient_cert.pem");
    const CLIENT_KEY: &str = include_str!("../tests/fixtures/apiclient_key.pem");

    #[test]
    fn identity_loads_from_pem_files() {
        let cert = write_temp(CLIENT_CERT);
        let key = write_temp(CLIENT_KEY);
        // Self-signed, so it doubles as its own root.
        let root = write_temp(CLIENT_CERT);

        let identity =
            TlsIdentity::from_pem_files(cert.path(), key.path(), Some(root.path())).unwrap();
        assert!(identity.has_root_ca());
        assert_eq!(identity.root_certificates().unwrap().len(), 1);
        assert!(identity.check().is_ok());
        assert!(!format!("{identity:?}").contains("PRIVATE KEY"));
    }

    #[test]
    fn identity_without_root_has_no_extra_roots() {
        let identity =
            TlsIdentity::from_pem(CLIENT_CERT.as_bytes(), CLIENT_KEY.as_bytes(), None).unwrap();
        assert!(!identity.has_root_ca());
        assert!(identity.root_certificates().unwrap().is_empty());
    }

    #[test]
    fn identity_rejects_swapped_or_missing_blocks() {
        let swapped = TlsIdentity::from_pem(CLIENT_KEY.as_bytes(), CLIENT_CERT.as_bytes(), None);
        assert!(matches!(swapped, Err(PayError::Config(_))));

        let not_pem = TlsIdentity::from_pem(b"garbage", CLIENT_KEY.as_bytes(), None);
        assert!(matches!(not_pem, Err(PayError::Config(_))));
    }

    #[test]
    fn identity_rejects_garbage_der_at_load() {
        let cert = pem_block("CERTIFICATE", b"cert-der");
        let key = pem_block("PRIVATE KEY", b"key-der");

        let garbage_key = TlsIdentity::from_pem(CLIENT_CERT.as_bytes(), key.as_bytes(), None);
        assert!(matches!(garbage_key, Err(PayError::Config(_))));

        let garbage_cert = TlsIdentity::from_pem(cert.as_bytes(), CLIENT_KEY.as_bytes(), None);
        assert!(matches!(garbage_cert, Err(PayError::Config(_))));

        let garbage_root = TlsIdentity::from_pem(
            CLIENT_CERT.as_bytes(),
            CLIENT_KEY.as_bytes(),
            Some(cert.as_bytes()),
        );
        assert!(matches!(garbage_root, Err(PayError::Config(_))));
    }

    #[test]
    fn identity_reports_missing_file() {
        let result = TlsIdentity::from_pem_files(
            "/nonexistent/apiclient_cert.pem",
            "/nonexistent/apiclient_key.pem",
            None,
        );
        match result {
            Err(PayError::Config(msg)) => assert!(msg.contains("apiclient_cert.pem")),
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
