use crate::{
    AppState,
    db::UserExt,
    dtos::{FilterUserDto, RegisterUserDto, UserListResponseDto},
    error::{ErrorMessage, HttpError},
    middleware::{JwtAuthContext, auth, role_check},
    models::UserRole,
    policy,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get},
};
use tracing::instrument;

use super::auth::register;

/// Router for admin-only user administration. The whole router sits behind
/// `auth` plus an Admin role check.
pub fn admin_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(get_users).post(create_user))
        .route("/users/{user_id}", delete(delete_user))
        .layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
        .layer(middleware::from_fn_with_state(app_state, auth))
}

/// List every account with id, username and role.
#[instrument(skip(app_state))]
pub async fn get_users(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let users = app_state.db_client.get_users().await.map_err(|e| {
        tracing::error!("DB error, getting users: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let user_count = app_state.db_client.get_user_count().await.map_err(|e| {
        tracing::error!("DB error, getting user count: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    tracing::info!("get_users successful");
    Ok(Json(UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(&users),
        results: user_count,
    }))
}

/// Create an account on behalf of a user; same rules as self-registration.
#[instrument(skip(app_state, body), fields(username = %body.username))]
pub async fn create_user(
    State(app_state): State<AppState>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    register(State(app_state), Json(body)).await
}

/// Delete an account, guarded against self-deletion, removing the last
/// admin, and orphaning dependent rows.
#[instrument(skip(app_state, jwt), fields(admin = %jwt.user.username, target = user_id))]
pub async fn delete_user(
    Path(user_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    let target = app_state
        .db_client
        .get_user_by_id(user_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("User not found".to_string()))?;

    let other_admins = app_state
        .db_client
        .count_other_admins(user_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting admins: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let has_dependents = app_state
        .db_client
        .user_has_dependents(user_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking user dependents: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    policy::user_deletion_guard(
        jwt.user.id,
        target.id,
        target.role,
        other_admins,
        has_dependents,
    )?;

    app_state
        .db_client
        .delete_user(user_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!("delete_user successful");
    Ok(StatusCode::NO_CONTENT)
}
