use serde::{Deserialize, Serialize};

use crate::users::repo::Role;

/// Request body for the combined login-or-register endpoint.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub id: Option<String>,
    pub password: Option<String>,
}

/// Request body for explicit account creation from the admin console.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub id: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Partial update: only the balance and stat counters may change.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub credit: Option<i64>,
    pub total_bet: Option<i64>,
    pub total_win: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub id: String,
}
