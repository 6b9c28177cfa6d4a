use std::net::SocketAddr;

use axum::{
    extract::DefaultBodyLimit,
    http::Uri,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Extension, Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::debug;

use crate::{
    config::AppConfig,
    error::ApiError,
    middleware::{param_pollution, rate_limit, sanitize, security, stamp, stamp::RequestTime},
    state::AppState,
    tours, users,
};

/// Assembles the request pipeline. Layer order is load-bearing: security
/// headers outermost, then logging, then (scoped to the API) rate limiting
/// ahead of body handling and sanitization, with the catch-all 404 and the
/// error responder at the end of the line.
pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .merge(users::router(state.clone()))
        .merge(tours::router(state.clone()))
        .route("/health", get(|| async { "ok" }))
        .layer(from_fn(param_pollution::dedupe_query_params))
        .layer(from_fn_with_state(state.clone(), sanitize::sanitize_request))
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .layer(from_fn_with_state(state.clone(), rate_limit::rate_limit));

    let mut app = Router::new()
        .nest("/api/v1", api)
        .nest_service("/public", ServeDir::new("public"))
        .fallback(fallback_404)
        .with_state(state.clone())
        .layer(from_fn(stamp::stamp_request_time))
        .layer(CorsLayer::permissive());

    if state.config.env.is_development() {
        app = app.layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        );
    }

    app.layer(from_fn(security::security_headers))
}

async fn fallback_404(stamp: Option<Extension<RequestTime>>, uri: Uri) -> ApiError {
    if let Some(Extension(RequestTime(at))) = stamp {
        debug!(at = %at, %uri, "unmatched route");
    }
    ApiError::not_found(format!("Can't find {uri} on this server"))
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        build_app(AppState::fake())
    }

    async fn body_json(res: axum::response::Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_reachable() {
        let res = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unmatched_path_gets_the_error_envelope() {
        let res = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/definitely/not/here")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        // Security headers ride along even on errors.
        assert_eq!(res.headers()["x-content-type-options"], "nosniff");
        let body = body_json(res).await;
        assert_eq!(body["status"], "fail");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("/definitely/not/here"));
    }

    #[tokio::test]
    async fn signup_validation_short_circuits_into_the_envelope() {
        let res = app()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/api/v1/users/signup")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"name":"A","email":"a@b.com","password":"secret123","passwordConfirm":"different1"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Passwords do not match");
    }

    #[tokio::test]
    async fn unknown_sort_key_is_a_validation_error() {
        let res = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/v1/tours?sort=evil")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn malformed_tour_id_reports_the_value() {
        let res = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/v1/tours/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert!(body["message"].as_str().unwrap().contains("not-a-uuid"));
    }

    #[tokio::test]
    async fn protected_route_without_token_is_401() {
        let res = app()
            .oneshot(
                HttpRequest::builder()
                    .method("PATCH")
                    .uri("/api/v1/users/updatePassword")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(res).await;
        assert_eq!(body["status"], "fail");
    }
}
