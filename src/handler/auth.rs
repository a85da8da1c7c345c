use crate::{
    AppState,
    db::UserExt,
    dtos::{LoginResponseDto, LoginUserDto, MeResponseDto, RegisterUserDto, Response},
    error::{ErrorMessage, HttpError},
    middleware::{JwtAuthContext, auth},
    models::UserRole,
    utils::{password, token},
};
use axum::{
    Extension, Json, Router, extract::State, http::StatusCode, middleware,
    response::IntoResponse, routing::{get, post},
};
use tracing::instrument;
use validator::Validate;

/// Router for authentication endpoints.
pub fn auth_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route(
            "/me",
            get(me).route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Register a new account with one of the four roles.
#[instrument(skip(app_state, body), fields(username = %body.username))]
pub async fn register(
    State(app_state): State<AppState>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid register input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    // validate() already vetted the role string.
    let role = UserRole::parse(&body.role)
        .ok_or_else(|| HttpError::bad_request("Invalid role".to_string()))?;

    let hash_password = password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(e.to_string())
    })?;

    let result = app_state
        .db_client
        .save_user(body.username.trim(), &hash_password, role)
        .await;

    match result {
        Ok(user) => {
            tracing::info!(username = %user.username, role = %user.role.to_str(), "Register successful");
            Ok((
                StatusCode::CREATED,
                Json(Response {
                    status: "success",
                    message: "Account created successfully".to_string(),
                }),
            ))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            tracing::error!("DB error, saving user, unique violation: {}", db_err);
            Err(HttpError::conflict("Username is already taken".to_string()))
        }
        Err(e) => {
            tracing::error!("DB error, saving user: {}", e);
            Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ))
        }
    }
}

/// Exchange credentials for a bearer token carrying id, username and role.
#[instrument(skip(app_state, body), fields(username = %body.username))]
pub async fn login(
    State(app_state): State<AppState>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid login input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    // One failure message for unknown user and wrong password alike.
    let invalid = || HttpError::unauthorized("Invalid username or password".to_string());

    let user = app_state
        .db_client
        .get_user_by_username(&body.username)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| {
            tracing::error!("User not found");
            invalid()
        })?;

    let password_matched = password::compare(&body.password, &user.password).map_err(|e| {
        tracing::error!("Password comparison error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    if !password_matched {
        tracing::error!("Password mismatch");
        return Err(invalid());
    }

    let token = token::create_token(
        user.id,
        &user.username,
        user.role,
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    tracing::info!(username = %user.username, "Login successful");
    Ok(Json(LoginResponseDto {
        status: "success".to_string(),
        token,
    }))
}

/// Identity of the calling user, as resolved from the bearer token.
#[instrument(skip(jwt), fields(username = %jwt.user.username))]
pub async fn me(
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(MeResponseDto {
        status: "success".to_string(),
        username: jwt.user.username,
        role: jwt.user.role.to_str().to_string(),
    }))
}
