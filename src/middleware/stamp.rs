use axum::{extract::Request, middleware::Next, response::Response};
use time::OffsetDateTime;

/// When the request entered the pipeline. Request-scoped; dropped with the
/// request.
#[derive(Debug, Clone, Copy)]
pub struct RequestTime(pub OffsetDateTime);

pub async fn stamp_request_time(mut req: Request, next: Next) -> Response {
    req.extensions_mut()
        .insert(RequestTime(OffsetDateTime::now_utc()));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body, http::Request as HttpRequest, middleware, routing::get, Extension, Router,
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn stamp_is_visible_downstream() {
        let app = Router::new()
            .route(
                "/",
                get(|Extension(RequestTime(at)): Extension<RequestTime>| async move {
                    at.unix_timestamp().to_string()
                }),
            )
            .layer(middleware::from_fn(stamp_request_time));
        let res = app
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), axum::http::StatusCode::OK);
    }
}
