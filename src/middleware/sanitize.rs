use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use serde_json::Value;

use crate::{error::ApiError, state::AppState};

/// Buffers JSON request bodies (size-capped), drops operator-injection keys
/// and escapes script-injection characters, then hands the cleaned body on.
/// Non-JSON and malformed bodies pass through untouched; the extractors own
/// those rejections.
pub async fn sanitize_request(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let is_json = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);
    if !is_json {
        return Ok(next.run(req).await);
    }

    let limit = state.config.body_limit_bytes;
    let (mut parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| ApiError::validation("Request body exceeds size limit"))?;

    let bytes = match serde_json::from_slice::<Value>(&bytes) {
        Ok(mut value) => {
            scrub(&mut value);
            let cleaned = serde_json::to_vec(&value).map_err(|e| anyhow::Error::new(e))?;
            parts
                .headers
                .insert(header::CONTENT_LENGTH, HeaderValue::from(cleaned.len()));
            Bytes::from(cleaned)
        }
        Err(_) => bytes,
    };

    let req = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(req).await)
}

/// Recursive scrub: keys that smell like query operators are removed, string
/// values get angle brackets entity-escaped.
fn scrub(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let suspect: Vec<String> = map
                .keys()
                .filter(|k| k.starts_with('$') || k.contains('.'))
                .cloned()
                .collect();
            for key in suspect {
                map.remove(&key);
            }
            for (_, v) in map.iter_mut() {
                scrub(v);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                scrub(item);
            }
        }
        Value::String(s) => {
            if s.contains('<') || s.contains('>') {
                *s = s.replace('<', "&lt;").replace('>', "&gt;");
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::post,
        Json, Router,
    };
    use serde_json::json;
    use tower::ServiceExt;

    fn echo_app() -> Router {
        Router::new()
            .route("/echo", post(|Json(v): Json<Value>| async move { Json(v) }))
            .layer(middleware::from_fn_with_state(
                AppState::fake(),
                sanitize_request,
            ))
    }

    async fn roundtrip(body: Value) -> Value {
        let res = echo_app()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/echo")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn scrub_drops_operator_keys() {
        let mut v = json!({"email": {"$gt": ""}, "name": "ok", "a.b": 1});
        scrub(&mut v);
        assert_eq!(v, json!({"email": {}, "name": "ok"}));
    }

    #[test]
    fn scrub_escapes_angle_brackets_everywhere() {
        let mut v = json!({"name": "<script>alert(1)</script>", "tags": ["<b>"]});
        scrub(&mut v);
        assert_eq!(v["name"], "&lt;script&gt;alert(1)&lt;/script&gt;");
        assert_eq!(v["tags"][0], "&lt;b&gt;");
    }

    #[tokio::test]
    async fn middleware_cleans_the_body_handlers_see() {
        let echoed = roundtrip(json!({"$where": "1=1", "name": "<i>hi</i>"})).await;
        assert!(echoed.get("$where").is_none());
        assert_eq!(echoed["name"], "&lt;i&gt;hi&lt;/i&gt;");
    }

    #[tokio::test]
    async fn oversized_bodies_are_rejected_before_handlers() {
        let huge = "x".repeat(11 * 1024);
        let res = echo_app()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/echo")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "blob": huge }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
