use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, instrument, warn};

use crate::{
    auth::{guards::CurrentUser, handlers::is_valid_email},
    error::ApiError,
    state::AppState,
    users::{
        dto::{UpdateMeRequest, UserEnvelope, UserResponse, UsersEnvelope, UsersListResponse},
        model::User,
    },
};

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersListResponse>, ApiError> {
    let users = User::list(&state.db).await?;
    Ok(Json(UsersListResponse {
        status: "success",
        results: users.len(),
        data: UsersEnvelope { users },
    }))
}

#[instrument(skip(state, current, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Json(mut payload): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if payload.password.is_some() || payload.password_confirm.is_some() {
        return Err(ApiError::validation(
            "This route is not for password updates. Please use /updatePassword",
        ));
    }

    if let Some(email) = payload.email.as_mut() {
        *email = email.trim().to_lowercase();
        if !is_valid_email(email) {
            warn!(user_id = %current.id, "profile update with invalid email");
            return Err(ApiError::validation("Please provide a valid email"));
        }
    }

    let user = User::update_profile(
        &state.db,
        current.id,
        payload.name.as_deref(),
        payload.email.as_deref(),
    )
    .await?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(UserResponse {
        status: "success",
        data: UserEnvelope { user },
    }))
}

#[instrument(skip(state, current))]
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<StatusCode, ApiError> {
    User::deactivate(&state.db, current.id).await?;
    info!(user_id = %current.id, "account deactivated");
    Ok(StatusCode::NO_CONTENT)
}
