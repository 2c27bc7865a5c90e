use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{admin, analysis, auth};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(admin::router())
                .merge(analysis::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::testing::fake_state;

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::ORIGIN, "http://frontend.test");
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn register_body(email: &str) -> Value {
        json!({
            "email": email,
            "password": "pw1",
            "name": "Ada Lovelace",
            "securityQuestion": "What was the name of your first pet?",
            "securityAnswer": "Rex"
        })
    }

    async fn verified_login(app: &Router, email: &str) -> String {
        let (status, body) =
            call(app, Method::POST, "/api/auth/register", None, Some(register_body(email))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let token = body["verificationToken"].as_str().unwrap().to_string();

        let (status, _) = call(
            app,
            Method::GET,
            &format!("/api/auth/verify?token={token}"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "pw1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_responds_with_cors() {
        let (state, _) = fake_state();
        let app = build_app(state);
        let req = Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, "http://frontend.test")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn preflight_is_answered() {
        let (state, _) = fake_state();
        let app = build_app(state);
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/auth/login")
            .header(header::ORIGIN, "http://frontend.test")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,authorization")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert!(res.status().is_success());
        assert!(res
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_HEADERS));
    }

    #[tokio::test]
    async fn register_verify_login_flow_over_http() {
        let (state, _) = fake_state();
        let app = build_app(state);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(register_body("a@example.com")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["emailSent"], true);
        assert_eq!(body["user"]["firstName"], "Ada");
        assert_eq!(body["user"]["verified"], false);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "a@example.com", "password": "pw1" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "not_verified");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(register_body("A@EXAMPLE.com")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "duplicate_email");

        let (status, body) =
            call(&app, Method::GET, "/api/auth/verify?token=bogus", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_token");

        let (status, body) = call(&app, Method::GET, "/api/auth/verify", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_token");

        let token = verified_login(&app, "b@example.com").await;
        let (status, body) = call(&app, Method::GET, "/api/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "b@example.com");
    }

    #[tokio::test]
    async fn wrong_password_is_401() {
        let (state, _) = fake_state();
        let app = build_app(state);
        verified_login(&app, "w@example.com").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "w@example.com", "password": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_credentials");
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let (state, _) = fake_state();
        let app = build_app(state);
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "x@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn password_reset_over_http() {
        let (state, _) = fake_state();
        let app = build_app(state);
        verified_login(&app, "r@example.com").await;

        let (status, body) = call(
            &app,
            Method::GET,
            "/api/auth/security-question?email=r@example.com",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["question"], "What was the name of your first pet?");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/request-reset",
            None,
            Some(json!({ "email": "r@example.com", "securityAnswer": "Wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "security_answer_mismatch");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/request-reset",
            None,
            Some(json!({ "email": "ghost@example.com", "securityAnswer": "Rex" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "user_not_found");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/request-reset",
            None,
            Some(json!({ "email": "r@example.com", "securityAnswer": "rex" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let reset = body["resetToken"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({ "token": reset, "newPassword": "fresh-pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "r@example.com", "password": "fresh-pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_routes_require_admin() {
        let (state, _) = fake_state();
        let app = build_app(state);

        let (status, body) = call(&app, Method::GET, "/api/admin/users", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthenticated");

        let token = verified_login(&app, "plain@example.com").await;
        let (status, body) = call(&app, Method::GET, "/api/admin/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
    }

    #[tokio::test]
    async fn admin_manages_users_over_http() {
        let (state, _) = fake_state();
        crate::admin::services::create_user(
            &state,
            crate::testing::registration("root@example.com", "rootpw"),
            true,
        )
        .await
        .unwrap();
        let app = build_app(state);

        let (_, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "root@example.com", "password": "rootpw" })),
        )
        .await;
        let admin = body["token"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/admin/create-user",
            Some(&admin),
            Some(json!({
                "firstName": "Grace",
                "lastName": "Hopper",
                "email": "grace@example.com",
                "password": "pw1",
                "securityQuestion": "What city were you born in?",
                "securityAnswer": "New York",
                "isAdmin": false
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["user"]["verified"], true);
        let grace_id = body["user"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(&app, Method::GET, "/api/admin/users", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let users = body["users"].as_array().unwrap();
        assert_eq!(users.len(), 2);
        for u in users {
            for field in [
                "id", "email", "firstName", "lastName", "verified", "isAdmin", "blocked",
                "createdAt",
            ] {
                assert!(u.get(field).is_some(), "missing {field}");
            }
        }

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/admin/toggle-status",
            Some(&admin),
            Some(json!({ "userId": grace_id, "blocked": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "grace@example.com", "password": "pw1" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "account_blocked");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/admin/verify-user",
            Some(&admin),
            Some(json!({ "email": "grace@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alreadyVerified"], true);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/admin/reset-password",
            Some(&admin),
            Some(json!({ "userId": grace_id, "newPassword": "pw2" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &app,
            Method::DELETE,
            &format!("/api/admin/users/{grace_id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            Method::DELETE,
            "/api/admin/users/not-a-uuid",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn analysis_save_and_history_over_http() {
        let (state, _) = fake_state();
        let app = build_app(state);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/analysis/save",
            None,
            Some(json!({ "title": "t", "content": "c", "analysisData": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let alice = verified_login(&app, "alice@example.com").await;
        let bob = verified_login(&app, "bob@example.com").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/analysis/save",
            Some(&alice),
            Some(json!({
                "title": "US 1234567",
                "content": "claims overview",
                "analysisData": { "score": 0.8 }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let id = body["analysis"]["id"].as_str().unwrap().to_string();

        let (status, body) =
            call(&app, Method::GET, "/api/analysis/history", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        let history = body["history"].as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["content"], "claims overview");
        assert_eq!(history[0]["analysisData"]["score"], 0.8);

        let (status, body) =
            call(&app, Method::GET, "/api/analysis/history", Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["history"].as_array().unwrap().is_empty());

        let (status, _) = call(
            &app,
            Method::GET,
            &format!("/api/analysis/{id}"),
            Some(&bob),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
