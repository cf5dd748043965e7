//! Route table and handlers.
//!
//! Every route, and the 404 fallback, is wrapped in its own pipeline so a
//! request meets exactly one rate limit check and one authentication.

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::http::response::error_response;
use crate::http::server::AppState;
use crate::pipeline::{run_pipeline, Gatekeeper};
use crate::security::authorization::Requirement;
use crate::security::error::GateError;
use crate::security::principal::{Principal, User};

/// Permission code guarding `GET /v1/me/permissions`.
pub const PERMISSIONS_READ: &str = "permissions:read";

/// Template rendered by the welcome mail.
pub const WELCOME_TEMPLATE: &str = "user_welcome.tmpl";

pub fn routes(state: AppState, gates: &Gatekeeper) -> Router {
    Router::new()
        .route(
            "/v1/healthcheck",
            get(healthcheck).layer(from_fn_with_state(gates.public(), run_pipeline)),
        )
        .route(
            "/v1/me",
            get(me).layer(from_fn_with_state(
                gates.require(Requirement::Authenticated),
                run_pipeline,
            )),
        )
        .route(
            "/v1/me/welcome",
            post(welcome).layer(from_fn_with_state(
                gates.require(Requirement::Activated),
                run_pipeline,
            )),
        )
        .route(
            "/v1/me/permissions",
            get(permissions).layer(from_fn_with_state(
                gates.require(Requirement::permission(PERMISSIONS_READ)),
                run_pipeline,
            )),
        )
        .fallback_service(
            any::<_, _, ()>(not_found).layer(from_fn_with_state(gates.public(), run_pipeline)),
        )
        .with_state(state)
}

async fn healthcheck(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "available",
        "system_info": {
            "environment": state.env.to_string(),
            "version": env!("CARGO_PKG_VERSION"),
        }
    }))
}

async fn me(principal: Principal) -> Result<Json<Value>, GateError> {
    let user = signed_in(&principal)?;
    Ok(Json(json!({ "user": user })))
}

/// Queue a welcome mail and answer before it is sent.
async fn welcome(State(state): State<AppState>, principal: Principal) -> Result<Response, GateError> {
    let user = signed_in(&principal)?.clone();
    let mailer = state.mailer.clone();

    state.tasks.spawn("welcome_mail", async move {
        let data = json!({ "userID": user.id, "name": user.name });
        if let Err(e) = mailer.send(&user.email, WELCOME_TEMPLATE, data).await {
            tracing::error!(user = %user.id, error = %e, "Failed to send welcome mail");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "a welcome email will be sent shortly" })),
    )
        .into_response())
}

async fn permissions(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Value>, GateError> {
    let user = signed_in(&principal)?;
    let granted = state
        .permissions
        .permissions_for(user.id)
        .await
        .map_err(GateError::internal)?;

    Ok(Json(json!({ "permissions": granted.iter().collect::<Vec<_>>() })))
}

async fn not_found() -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "the requested resource could not be found",
    )
}

/// The user behind a principal that already passed an authentication gate.
fn signed_in(principal: &Principal) -> Result<&User, GateError> {
    principal.user().ok_or(GateError::AuthenticationRequired)
}
