use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use crate::state::AppState;
use crate::users::dto::{CreateUserRequest, DeleteResponse, LoginRequest, UpdateUserRequest};
use crate::users::repo::{Role, User, UserChanges, OCEAN_MASTER_ID};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/users", post(create_user))
        .route("/users/:id", patch(update_user).delete(delete_user))
}

type ApiError = (StatusCode, Json<Value>);

fn store_error(e: anyhow::Error) -> ApiError {
    error!(error = %e, "store operation failed");
    (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() })))
}

fn bad_request(msg: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg })))
}

fn unauthorized(msg: &str) -> ApiError {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": msg })))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, User>>, ApiError> {
    let users = User::list_all(&state.db).await.map_err(store_error)?;
    Ok(Json(users.into_iter().map(|u| (u.id.clone(), u)).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Option<User>>, ApiError> {
    let user = User::find_by_id(&state.db, &id).await.map_err(store_error)?;
    Ok(Json(user))
}

/// Login doubles as registration: an unknown id is enrolled on the spot
/// with a zeroed account.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<User>, ApiError> {
    let (Some(id), Some(password)) = (payload.id, payload.password) else {
        return Err(bad_request("ID and Password required"));
    };

    match User::find_by_id(&state.db, &id).await.map_err(store_error)? {
        Some(user) if user.password == password => {
            info!(%id, "diver logged in");
            Ok(Json(user))
        }
        Some(_) => {
            warn!(%id, "login with invalid password");
            Err(unauthorized("Invalid password"))
        }
        None => {
            let user = User::create(&state.db, &id, &password, Role::User)
                .await
                .map_err(store_error)?;
            info!(%id, "diver auto-registered");
            Ok(Json(user))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let (Some(id), Some(password)) = (payload.id, payload.password) else {
        return Err(bad_request("ID and Password required"));
    };

    if User::find_by_id(&state.db, &id)
        .await
        .map_err(store_error)?
        .is_some()
    {
        warn!(%id, "id already enlisted");
        return Err(bad_request("User already exists"));
    }

    let role = payload.role.unwrap_or(Role::User);
    let user = User::create(&state.db, &id, &password, role)
        .await
        .map_err(store_error)?;

    info!(%id, ?role, "diver enlisted");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    let changes = UserChanges {
        credit: payload.credit,
        total_bet: payload.total_bet,
        total_win: payload.total_win,
    };

    if changes.is_empty() {
        return Ok(Json(json!({ "message": "No changes" })));
    }

    let user = User::update_fields(&state.db, &id, &changes)
        .await
        .map_err(store_error)?;
    info!(%id, ?changes, "diver updated");
    Ok(Json(json!(user)))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if id == OCEAN_MASTER_ID {
        warn!(%id, "refused to delete the protected account");
        return Err(unauthorized("Cannot delete the Ocean Master"));
    }

    let removed = User::delete(&state.db, &id).await.map_err(store_error)?;
    info!(%id, removed, "diver purged");
    Ok(Json(DeleteResponse {
        message: "Diver purged from the abyss".into(),
        id,
    }))
}
