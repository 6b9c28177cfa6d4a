use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse,
            ResetPasswordRequest, SignupRequest, TokenResponse, UpdatePasswordRequest,
            UserEnvelope,
        },
        guards::CurrentUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        reset,
    },
    error::ApiError,
    state::AppState,
    users::model::{Role, User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_new_password(password: &str, confirm: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::validation("Password must be at least 8 characters"));
    }
    if password != confirm {
        return Err(ApiError::validation("Passwords do not match"));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Please tell us your name"));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "signup with invalid email");
        return Err(ApiError::validation("Please provide a valid email"));
    }
    validate_new_password(&payload.password, &payload.password_confirm)?;

    let role = match payload.role {
        Some(raw) => Role::try_from(raw).map_err(|e| ApiError::validation(e.to_string()))?,
        None => Role::User,
    };

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, payload.name.trim(), &payload.email, &hash, role).await?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user signed up");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            status: "success",
            token,
            data: UserEnvelope { user },
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Please provide email and password"));
    }

    // One generic answer for both unknown email and wrong password.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(user) => user,
        None => {
            warn!(email = %payload.email, "login with unknown email");
            return Err(ApiError::not_authenticated("Incorrect email or password"));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::not_authenticated("Incorrect email or password"));
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = %user.id, "user logged in");

    Ok(Json(TokenResponse {
        status: "success",
        token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::not_found("There is no user with that email address"))?;

    let token = reset::generate();
    User::set_reset_token(&state.db, user.id, &token.hash, token.expires).await?;

    let reset_url = format!(
        "{}/api/v1/users/resetPassword/{}",
        state.config.public_base_url, token.raw
    );
    let text = format!(
        "Forgot your password? Submit a PATCH request with your new password and \
         passwordConfirm to: {reset_url}\nIf you didn't forget your password, \
         please ignore this email."
    );

    if let Err(cause) = state
        .mailer
        .send(&user.email, "Your password reset token (valid for 10 min)", &text)
        .await
    {
        // The token must not stay redeemable when the email never went out.
        if let Err(e) = User::clear_reset_token(&state.db, user.id).await {
            error!(error = %e, user_id = %user.id, "failed to roll back reset token");
        }
        error!(error = %cause, user_id = %user.id, "reset email dispatch failed");
        return Err(ApiError::EmailDispatch(cause));
    }

    info!(user_id = %user.id, "reset token emailed");
    Ok(Json(MessageResponse {
        status: "success",
        message: "Token sent to email",
    }))
}

#[instrument(skip(state, payload, token))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    const INVALID: &str = "Token is invalid or has expired";

    let presented_hash = reset::hash_token(&token);
    let mut user = User::find_by_reset_hash(&state.db, &presented_hash)
        .await?
        .ok_or_else(|| ApiError::validation(INVALID))?;

    let mut stored_hash = user.password_reset_token_hash.take();
    let mut stored_expires = user.password_reset_expires.take();
    if !reset::consume(
        &token,
        &mut stored_hash,
        &mut stored_expires,
        OffsetDateTime::now_utc(),
    ) {
        return Err(ApiError::validation(INVALID));
    }

    validate_new_password(&payload.password, &payload.password_confirm)?;

    let hash = hash_password(&payload.password)?;
    // Persists the new hash and clears the consumed token in one statement.
    let user = User::update_password(&state.db, user.id, &hash).await?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = %user.id, "password reset completed");

    Ok(Json(AuthResponse {
        status: "success",
        token,
        data: UserEnvelope { user },
    }))
}

#[instrument(skip(state, current, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if !verify_password(&payload.password_current, &current.password_hash)? {
        warn!(user_id = %current.id, "password change with wrong current password");
        return Err(ApiError::not_authenticated("Your current password is wrong"));
    }

    validate_new_password(&payload.password, &payload.password_confirm)?;

    let hash = hash_password(&payload.password)?;
    let user = User::update_password(&state.db, current.id, &hash).await?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = %user.id, "password updated");

    Ok(Json(AuthResponse {
        status: "success",
        token,
        data: UserEnvelope { user },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a @b.com"));
        assert!(!is_valid_email("a@b"));
    }

    #[test]
    fn new_password_rules() {
        assert!(validate_new_password("secret123", "secret123").is_ok());
        assert!(validate_new_password("short", "short").is_err());
        assert!(validate_new_password("secret123", "secret124").is_err());
    }
}
