use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    db::UserExt,
    error::{ErrorMessage, HttpError},
    models::{User, UserRole},
    utils::token,
};

/// Authenticated identity inserted into request extensions by `auth`.
///
/// Handlers extract it with `Extension(jwt): Extension<JwtAuthContext>`
/// and read the actor's id and role from `jwt.user`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtAuthContext {
    pub user: User,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| {
            auth_value
                .strip_prefix("Bearer ")
                .map(|token| token.to_owned())
        })
}

/// Authentication middleware.
///
/// Extracts the bearer token, validates the JWT, and re-loads the user row
/// so a token for a deleted account stops working immediately. On success
/// the identity is attached to the request for downstream handlers.
///
/// # Errors
/// 401 if no token is provided, the token is invalid or expired, or the
/// user no longer exists.
pub async fn auth(
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let claims = token::decode_token(token, app_state.env.jwt_secret.as_bytes())
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let user_id = claims
        .sub
        .parse::<i32>()
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let user = app_state
        .db_client
        .get_user_by_id(user_id)
        .await
        .map_err(|_| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    let user =
        user.ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    req.extensions_mut().insert(JwtAuthContext { user });

    Ok(next.run(req).await)
}

/// Role-based access control middleware, layered after `auth`.
///
/// # Errors
/// 401 if `auth` did not run; 403 if the user's role is not in
/// `required_roles`.
pub async fn role_check(
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse, HttpError> {
    let jwt = req
        .extensions()
        .get::<JwtAuthContext>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))?;

    if !required_roles.contains(&jwt.user.role) {
        return Err(HttpError::new(
            ErrorMessage::PermissionDenied.to_string(),
            StatusCode::FORBIDDEN,
        ));
    }

    Ok(next.run(req).await)
}

/// Best-effort identity for public read paths (product detail visibility).
///
/// Returns `Some((id, role))` when a valid bearer token for an existing
/// user is present, `None` otherwise. Never fails the request: an
/// anonymous or badly-authenticated caller simply gets the public view.
pub async fn maybe_identity(
    headers: &HeaderMap,
    app_state: &AppState,
) -> Option<(i32, UserRole)> {
    let token = bearer_token(headers)?;
    let claims = token::decode_token(token, app_state.env.jwt_secret.as_bytes()).ok()?;
    let user_id = claims.sub.parse::<i32>().ok()?;
    let user = app_state.db_client.get_user_by_id(user_id).await.ok()??;
    Some((user.id, user.role))
}
