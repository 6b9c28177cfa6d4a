use serde::{Deserialize, Serialize};

use crate::users::model::User;

/// Signup body. `role` arrives as a plain string and is parsed against the
/// fixed role set so unknown values surface as a validation error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub password_current: String,
    pub password: String,
    pub password_confirm: String,
}

/// Returned wherever a fresh token comes with the user (signup, reset,
/// password change).
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub status: &'static str,
    pub token: String,
    pub data: UserEnvelope,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: User,
}

/// Login only hands back the token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub status: &'static str,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: &'static str,
}
