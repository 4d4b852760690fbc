// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway client errors.
//!
//! Every failure of an operation call surfaces as one [`PayError`]. The core
//! never retries and never swallows an error: whatever happened is returned
//! to the immediate caller.

/// Common result alias for gateway operations.
pub type PayResult<T> = Result<T, PayError>;

#[derive(Debug, thiserror::Error)]
pub enum PayError {
    /// A caller-required field was missing or blank. No network call was made.
    #[error("{operation}: missing required field {field}")]
    Validation {
        operation: &'static str,
        field: String,
    },

    /// The gateway was reached (or attempted) but the exchange failed.
    #[error("gateway transport failed: {0}")]
    Transport(String),

    /// The response bytes were not a well-formed envelope.
    #[error("gateway response was invalid: {0}")]
    Parse(String),

    /// Well-formed response reporting a non-success status.
    #[error("gateway rejected the request: {message}")]
    Gateway { message: String },

    /// Business-success response whose signature did not verify.
    #[error("gateway response signature does not match")]
    Signature,

    /// The credential or TLS identity could not be built.
    #[error("gateway configuration missing or invalid: {0}")]
    Config(String),

    /// An outbound envelope or payload could not be serialized.
    #[error("failed to encode payload: {0}")]
    Encode(String),

    /// The OS randomness source failed while generating a nonce.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),
}

impl PayError {
    /// Stable snake_case code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            PayError::Validation { .. } => "validation_error",
            PayError::Transport(_) => "transport_error",
            PayError::Parse(_) => "parse_error",
            PayError::Gateway { .. } => "gateway_error",
            PayError::Signature => "signature_error",
            PayError::Config(_) => "config_error",
            PayError::Encode(_) => "encode_error",
            PayError::Entropy(_) => "entropy_error",
        }
    }

    /// Whether this error indicates a possibly tampered response or a secret
    /// mismatch. Callers must treat these more severely than a business
    /// rejection.
    pub fn is_tampering(&self) -> bool {
        matches!(self, PayError::Signature)
    }

    pub(crate) fn missing(operation: &'static str, field: impl Into<String>) -> Self {
        PayError::Validation {
            operation,
            field: field.into(),
        }
    }
}
