// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{error, info, warn};

use crate::gateway::client::{notify_reply, receive_notify};
use crate::state::AppState;

const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Payment notification intake.
///
/// Verifies the pushed envelope against the configured credential and
/// answers with a `SUCCESS` or `FAIL` reply envelope. A `FAIL` reply carries
/// only the error code; the detail stays in the log. The gateway re-sends
/// the notification until it receives `SUCCESS`.
#[utoipa::path(
    post,
    path = "/notify",
    tag = "Notify",
    request_body(content = String, description = "Signed XML notification envelope", content_type = "text/xml"),
    responses(
        (status = 200, description = "Reply envelope (SUCCESS or FAIL)", body = String, content_type = "text/xml"),
        (status = 500, description = "Reply could not be encoded")
    )
)]
pub async fn receive_notification(State(state): State<AppState>, body: Bytes) -> Response {
    let (ok, message) = match receive_notify(&state.credential, &body) {
        Ok(notification) => {
            info!(
                out_trade_no = notification.out_trade_no().unwrap_or_default(),
                transaction_id = notification.transaction_id().unwrap_or_default(),
                total_fee = notification.total_fee().unwrap_or_default(),
                result_code = notification.result_code().unwrap_or_default(),
                "payment notification verified"
            );
            (true, "OK")
        }
        Err(err) => {
            warn!(
                error_code = err.error_code(),
                tampering = err.is_tampering(),
                error = %err,
                "payment notification rejected"
            );
            (false, err.error_code())
        }
    };

    match notify_reply(ok, message) {
        Ok(reply) => ([(header::CONTENT_TYPE, XML_CONTENT_TYPE)], reply).into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode notification reply");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
