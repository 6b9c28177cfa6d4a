use serde::{Deserialize, Serialize};

use crate::users::model::User;

/// Profile update body. Password fields are declared so their presence can be
/// rejected explicitly instead of silently dropped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub status: &'static str,
    pub data: UserEnvelope,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UsersListResponse {
    pub status: &'static str,
    pub results: usize,
    pub data: UsersEnvelope,
}

#[derive(Debug, Serialize)]
pub struct UsersEnvelope {
    pub users: Vec<User>,
}
