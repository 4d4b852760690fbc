// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::GatewayCredential;

/// Shared state of the notification intake service.
#[derive(Clone)]
pub struct AppState {
    /// Credential incoming notifications are verified against.
    pub credential: Arc<GatewayCredential>,
}

impl AppState {
    pub fn new(credential: GatewayCredential) -> Self {
        Self {
            credential: Arc::new(credential),
        }
    }
}
