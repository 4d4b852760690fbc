// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, error::Error, net::SocketAddr, time::Duration};

use axum_server::tls_rustls::RustlsConfig;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wxpay_gateway::api::router;
use wxpay_gateway::config::{
    HOST_ENV, LOG_FORMAT_ENV, NOTIFY_TLS_CERT_PATH_ENV, NOTIFY_TLS_KEY_PATH_ENV, PORT_ENV,
};
use wxpay_gateway::state::AppState;
use wxpay_gateway::GatewayCredential;

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    init_tracing();

    if let Err(e) = run().await {
        error!(error = %e, "notify service failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match env::var(LOG_FORMAT_ENV).as_deref() {
        Ok("json") => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let credential = GatewayCredential::from_env()?;
    info!(
        app_id = %credential.app_id,
        mch_id = %credential.mch_id,
        trade_type = %credential.trade_type,
        mutual_tls = credential.tls_identity.is_some(),
        "loaded gateway credential"
    );

    let app = router(AppState::new(credential));

    let host = env::var(HOST_ENV).unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = match env::var(PORT_ENV) {
        Ok(port) => port.parse().map_err(|e| format!("{PORT_ENV}: {e}"))?,
        Err(_) => 8080,
    };
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| format!("invalid bind address {host}:{port}: {e}"))?;

    match (
        env::var(NOTIFY_TLS_CERT_PATH_ENV),
        env::var(NOTIFY_TLS_KEY_PATH_ENV),
    ) {
        (Ok(cert), Ok(key)) => {
            let tls_config = RustlsConfig::from_pem_file(&cert, &key).await?;
            let handle = axum_server::Handle::new();
            tokio::spawn({
                let handle = handle.clone();
                async move {
                    shutdown_signal().await;
                    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
                }
            });

            info!(%addr, "notify service listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        _ => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(%addr, "notify service listening on http (docs at /docs)");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    info!("notify service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}
