use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{
    auth::jwt::JwtKeys,
    error::ApiError,
    state::AppState,
    users::model::{Role, User},
};

const NOT_LOGGED_IN: &str = "You are not logged in. Please log in to get access";

/// The protect guard. Verifies the bearer token, then re-resolves the user on
/// every request so a deactivated account fails even with a live token. The
/// resolved user rides the request extensions for downstream guards and
/// handlers.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())
        .ok_or_else(|| ApiError::not_authenticated(NOT_LOGGED_IN))?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify(token).map_err(|cause| {
        warn!(%cause, "bearer token rejected");
        ApiError::not_authenticated("Invalid or expired token. Please log in again")
    })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "token for nonexistent user");
            ApiError::not_authenticated("The user belonging to this token no longer exists")
        })?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Role gate. Chains after `authenticate`; a missing resolved user means the
/// chain was mis-ordered and reads as not-logged-in.
pub async fn restrict_to(
    allowed: &'static [Role],
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let role = req.extensions().get::<User>().map(|u| u.role);
    match role {
        None => Err(ApiError::not_authenticated(NOT_LOGGED_IN)),
        Some(role) if !allowed.contains(&role) => Err(ApiError::Forbidden),
        Some(_) => Ok(next.run(req).await),
    }
}

/// Handler-side access to the user resolved by `authenticate`.
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| ApiError::not_authenticated(NOT_LOGGED_IN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use time::OffsetDateTime;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "T".into(),
            email: "t@example.com".into(),
            password_hash: "hash".into(),
            role,
            active: true,
            password_reset_token_hash: None,
            password_reset_expires: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn guarded_router(role: Role, allowed: &'static [Role]) -> Router {
        Router::new()
            .route("/secure", get(|| async { "ok" }))
            .route_layer(middleware::from_fn(move |req: Request, next: Next| {
                restrict_to(allowed, req, next)
            }))
            // Stands in for authenticate: plants the resolved user.
            .layer(middleware::from_fn(move |mut req: Request, next: Next| {
                let user = test_user(role);
                async move {
                    req.extensions_mut().insert(user);
                    next.run(req).await
                }
            }))
    }

    #[test]
    fn extract_bearer_requires_scheme() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer(&headers).is_none());

        headers.insert(header::AUTHORIZATION, "Token abc".parse().unwrap());
        assert!(extract_bearer(&headers).is_none());

        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert!(extract_bearer(&headers).is_none());

        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(extract_bearer(&headers), Some("abc.def"));
    }

    #[tokio::test]
    async fn restrict_to_rejects_plain_user_with_403() {
        let app = guarded_router(Role::User, &[Role::Admin]);
        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/secure")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn restrict_to_passes_admin_through() {
        let app = guarded_router(Role::Admin, &[Role::Admin]);
        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/secure")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn restrict_to_without_resolved_user_is_401() {
        let app = Router::new()
            .route("/secure", get(|| async { "ok" }))
            .route_layer(middleware::from_fn(|req: Request, next: Next| {
                restrict_to(&[Role::Admin], req, next)
            }));
        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/secure")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn current_user_reads_the_planted_extension() {
        let req = HttpRequest::builder()
            .uri("/")
            .extension(test_user(Role::Guide))
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &())
            .await
            .expect("extracts");
        assert_eq!(user.role, Role::Guide);
    }
}
