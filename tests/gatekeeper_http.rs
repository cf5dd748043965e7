//! End-to-end gating behaviour through the full router.

use std::sync::Arc;

use api_gatekeeper::config::GatekeeperConfig;
use api_gatekeeper::pipeline::{run_pipeline, Gatekeeper};
use api_gatekeeper::security::RateLimiterRegistry;
use api_gatekeeper::store::MemoryStore;
use axum::http::header::{CONNECTION, VARY, WWW_AUTHENTICATE};
use axum::http::{Method, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;

mod common;

use common::{bearer, get as get_from, json_body, send, Harness};

fn config() -> GatekeeperConfig {
    GatekeeperConfig::default()
}

fn unlimited() -> GatekeeperConfig {
    let mut config = config();
    config.limiter.enabled = false;
    config
}

#[tokio::test(start_paused = true)]
async fn fifth_instant_request_is_rate_limited() {
    let harness = Harness::new(config());
    let router = harness.server.router();

    let mut statuses = Vec::new();
    for _ in 0..5 {
        let response = get_from(&router, "10.0.0.1", "/v1/healthcheck", None).await;
        statuses.push(response.status());
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS,
        ]
    );

    let response = get_from(&router, "10.0.0.1", "/v1/healthcheck", None).await;
    assert!(response.headers().get(VARY).is_none());
    assert_eq!(json_body(response).await["error"], "rate limit exceeded");

    let other = get_from(&router, "10.0.0.2", "/v1/healthcheck", None).await;
    assert_eq!(other.status(), StatusCode::OK);
    assert_eq!(harness.server.limiter().tracked_clients(), 2);
}

#[tokio::test(start_paused = true)]
async fn tokens_refill_over_time() {
    let harness = Harness::new(config());
    let router = harness.server.router();

    for _ in 0..4 {
        get_from(&router, "10.0.0.1", "/v1/healthcheck", None).await;
    }
    let limited = get_from(&router, "10.0.0.1", "/v1/healthcheck", None).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

    tokio::time::advance(std::time::Duration::from_millis(500)).await;
    let refilled = get_from(&router, "10.0.0.1", "/v1/healthcheck", None).await;
    assert_eq!(refilled.status(), StatusCode::OK);
}

#[tokio::test]
async fn disabled_limiter_admits_everything() {
    let harness = Harness::new(unlimited());
    let router = harness.server.router();

    for _ in 0..20 {
        let response = get_from(&router, "10.0.0.1", "/v1/healthcheck", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(harness.server.limiter().tracked_clients(), 0);
}

#[tokio::test]
async fn anonymous_healthcheck_reports_environment() {
    let harness = Harness::new(unlimited());
    let router = harness.server.router();

    let response = get_from(&router, "10.0.0.1", "/v1/healthcheck", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[VARY], "Authorization");
    assert!(response.headers().contains_key("x-request-id"));
    let body = json_body(response).await;
    assert_eq!(body["status"], "available");
    assert_eq!(body["system_info"]["environment"], "development");
}

#[tokio::test]
async fn malformed_and_unknown_credentials_look_the_same() {
    let harness = Harness::new(unlimited());
    let router = harness.server.router();
    let basic = format!("Basic {}", harness.tokens.member);
    let unknown = bearer("ABCDEFGHIJKLMNOPQRSTUVWXYZ");

    for header in ["Bearer short", basic.as_str(), unknown.as_str(), "Bearer"] {
        let response = get_from(&router, "10.0.0.1", "/v1/healthcheck", Some(header)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "header {header:?}");
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");
        assert_eq!(response.headers()[VARY], "Authorization");
        assert_eq!(
            json_body(response).await["error"],
            "invalid or missing authentication token"
        );
    }
}

#[tokio::test]
async fn authenticated_route_requires_a_user() {
    let harness = Harness::new(unlimited());
    let router = harness.server.router();

    let anonymous = get_from(&router, "10.0.0.1", "/v1/me", None).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    assert!(anonymous.headers().get(WWW_AUTHENTICATE).is_none());

    let pending = get_from(&router, "10.0.0.1", "/v1/me", Some(&bearer(&harness.tokens.pending))).await;
    assert_eq!(pending.status(), StatusCode::OK);
    let body = json_body(pending).await;
    assert_eq!(body["user"]["email"], "linus@example.com");
    assert_eq!(body["user"]["activated"], false);
}

#[tokio::test]
async fn permission_route_checks_activation_first() {
    let harness = Harness::new(unlimited());
    let router = harness.server.router();
    let uri = "/v1/me/permissions";

    let anonymous = get_from(&router, "10.0.0.1", uri, None).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let pending = get_from(&router, "10.0.0.1", uri, Some(&bearer(&harness.tokens.pending))).await;
    assert_eq!(pending.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(pending).await["error"],
        "your user account must be activated to access this resource"
    );

    let member = get_from(&router, "10.0.0.1", uri, Some(&bearer(&harness.tokens.member))).await;
    assert_eq!(member.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(member).await["error"],
        "your user account doesn't have the necessary permissions to access this resource"
    );

    let admin = get_from(&router, "10.0.0.1", uri, Some(&bearer(&harness.tokens.admin))).await;
    assert_eq!(admin.status(), StatusCode::OK);
    assert_eq!(json_body(admin).await["permissions"][0], "permissions:read");
}

#[tokio::test]
async fn welcome_mail_is_sent_in_the_background() {
    let harness = Harness::new(unlimited());
    let router = harness.server.router();

    let pending = send(
        &router,
        "10.0.0.1",
        Method::POST,
        "/v1/me/welcome",
        Some(&bearer(&harness.tokens.pending)),
    )
    .await;
    assert_eq!(pending.status(), StatusCode::FORBIDDEN);

    let response = send(
        &router,
        "10.0.0.1",
        Method::POST,
        "/v1/me/welcome",
        Some(&bearer(&harness.tokens.member)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    harness.server.tasks().wait_idle().await;
    assert_eq!(
        harness.mailer.sent(),
        vec![("grace@example.com".to_string(), "user_welcome.tmpl".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn unknown_routes_are_gated_too() {
    let harness = Harness::new(config());
    let router = harness.server.router();

    let invalid = get_from(&router, "10.0.0.1", "/v1/nowhere", Some("Bearer nope")).await;
    assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);

    for _ in 0..3 {
        let response = get_from(&router, "10.0.0.1", "/v1/nowhere", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[VARY], "Authorization");
    }

    let limited = get_from(&router, "10.0.0.1", "/v1/nowhere", None).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().get(VARY).is_none());
}

#[tokio::test(start_paused = true)]
async fn trusted_proxy_headers_pick_the_client() {
    let mut config = config();
    config.listener.trust_proxy_headers = true;
    config.limiter.burst = 1;
    let harness = Harness::new(config);
    let router = harness.server.router();

    let request = |client: &'static str| {
        let router = router.clone();
        async move {
            let request = axum::http::Request::builder()
                .uri("/v1/healthcheck")
                .header("x-forwarded-for", format!("{client}, 10.0.0.254"))
                .body(axum::body::Body::empty())
                .unwrap();
            tower::ServiceExt::oneshot(
                router.layer(axum::extract::connect_info::MockConnectInfo(
                    "10.0.0.254:40000".parse::<std::net::SocketAddr>().unwrap(),
                )),
                request,
            )
            .await
            .unwrap()
            .status()
        }
    };

    assert_eq!(request("203.0.113.1").await, StatusCode::OK);
    assert_eq!(request("203.0.113.1").await, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(request("203.0.113.2").await, StatusCode::OK);
}

async fn exploding_handler() -> &'static str {
    panic!("handler exploded")
}

#[tokio::test]
async fn handler_panic_becomes_one_internal_response() {
    let store = Arc::new(MemoryStore::new());
    let gates = Gatekeeper::new(
        Arc::new(RateLimiterRegistry::new(&unlimited().limiter)),
        store.clone(),
        store,
        false,
    );
    let router = Router::new()
        .route(
            "/boom",
            get(exploding_handler).layer(from_fn_with_state(gates.public(), run_pipeline)),
        )
        .route(
            "/ok",
            get(|| async { "ok" }).layer(from_fn_with_state(gates.public(), run_pipeline)),
        );

    let response = get_from(&router, "10.0.0.1", "/boom", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()[CONNECTION], "close");
    assert_eq!(
        json_body(response).await["error"],
        "the server encountered a problem and could not process your request"
    );

    let survivor = get_from(&router, "10.0.0.1", "/ok", None).await;
    assert_eq!(survivor.status(), StatusCode::OK);
}
