use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::OnceCell;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::config::Environment;

/// Deployment mode the responder branches on. Set once at startup;
/// unit tests that never boot the app fall back to development.
static DEPLOY_ENV: OnceCell<Environment> = OnceCell::new();

pub fn set_environment(env: Environment) {
    let _ = DEPLOY_ENV.set(env);
}

fn current_environment() -> Environment {
    DEPLOY_ENV.get().copied().unwrap_or(Environment::Development)
}

/// Central error type. One case per taxonomy entry; every handler and guard
/// funnels into this and nothing else writes error responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotAuthenticated(String),

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Duplicate field value: {field}. Please use another value")]
    Conflict { field: String },

    #[error("Too many requests from this IP, please try again in an hour")]
    TooManyRequests,

    #[error("There was an error sending the email. Try again later")]
    EmailDispatch(#[source] anyhow::Error),

    #[error("Something went wrong")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        ApiError::NotAuthenticated(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotAuthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::EmailDispatch(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// `fail` for client errors, `error` for server errors.
    pub fn status_label(&self) -> &'static str {
        if self.status_code().is_client_error() {
            "fail"
        } else {
            "error"
        }
    }

    /// Operational errors are anticipated, user-facing failures whose message
    /// is safe to expose in production. Everything unclassified is not.
    pub fn is_operational(&self) -> bool {
        !matches!(self, ApiError::Internal(_))
    }

    /// Response envelope as a pure function of the error and deployment mode.
    pub fn body(&self, env: Environment) -> Value {
        if env.is_development() {
            return json!({
                "status": self.status_label(),
                "message": self.to_string(),
                "error": format!("{self:?}"),
            });
        }
        if self.is_operational() {
            json!({
                "status": self.status_label(),
                "message": self.to_string(),
            })
        } else {
            json!({
                "status": "error",
                "message": "Something went wrong",
            })
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::not_found("Resource not found"),
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                let field = db
                    .constraint()
                    .map(constraint_field)
                    .unwrap_or_else(|| "value".to_string());
                ApiError::Conflict { field }
            }
            other => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}

/// "users_email_key" -> "email"
fn constraint_field(constraint: &str) -> String {
    constraint
        .trim_end_matches("_key")
        .trim_end_matches("_idx")
        .rsplit('_')
        .next()
        .unwrap_or(constraint)
        .to_string()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if !self.is_operational() {
            // Full detail stays server-side regardless of mode.
            error!(error = ?self, "unhandled error");
        }
        let status = self.status_code();
        let body = self.body(current_environment());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ApiError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_authenticated("no").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::not_found("gone").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict {
                field: "email".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::TooManyRequests.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn development_body_carries_detail_for_any_error() {
        let err = ApiError::Internal(anyhow::anyhow!("boom"));
        let body = err.body(Environment::Development);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Something went wrong");
        assert!(body["error"].as_str().unwrap().contains("boom"));
    }

    #[test]
    fn production_body_exposes_operational_messages_only() {
        let err = ApiError::validation("Password too short");
        let body = err.body(Environment::Production);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Password too short");
        assert!(body.get("error").is_none());
    }

    #[test]
    fn production_body_hides_unclassified_detail() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused to 10.0.0.3"));
        let body = err.body(Environment::Production);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Something went wrong");
        assert!(body.get("error").is_none());
    }

    #[test]
    fn unique_violation_constraint_maps_to_field_name() {
        assert_eq!(constraint_field("users_email_key"), "email");
        assert_eq!(constraint_field("tours_name_key"), "name");
    }

    #[test]
    fn email_dispatch_is_operational() {
        let err = ApiError::EmailDispatch(anyhow::anyhow!("smtp timeout"));
        assert!(err.is_operational());
        let body = err.body(Environment::Production);
        assert_eq!(
            body["message"],
            "There was an error sending the email. Try again later"
        );
    }
}
