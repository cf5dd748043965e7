//! Boundary responses.
//!
//! # Responsibilities
//! - Map every [`GateError`] to a status, JSON body and headers
//! - Render contained faults as a generic 500 that closes the connection
//!
//! # Design Decisions
//! - Bodies are `{"error": "<message>"}` with a fixed public message
//! - Internal detail is logged, never returned

use axum::http::header::{CONNECTION, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::pipeline::containment::Fault;
use crate::security::error::GateError;

/// Message for any 500 the caller sees.
const INTERNAL_MESSAGE: &str = "the server encountered a problem and could not process your request";

/// JSON error envelope used by gates and handlers alike.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        match &self {
            GateError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error while gating request");
            }
            GateError::Wiring(fault) => {
                tracing::error!(error = %fault, "Pipeline wiring fault");
            }
            _ => {}
        }

        let mut response = error_response(self.status(), self.public_message());
        if matches!(self, GateError::InvalidCredential) {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        if self.closes_connection() {
            close_connection(&mut response);
        }
        response
    }
}

/// Render a contained fault.
pub fn fault_response(fault: &Fault) -> Response {
    tracing::error!(kind = fault.kind(), error = %fault, "Request fault contained");
    let mut response = error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE);
    close_connection(&mut response);
    response
}

fn close_connection(response: &mut Response) {
    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("close"));
}
