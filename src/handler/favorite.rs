use crate::{
    AppState,
    db::{FavoriteExt, ProductExt},
    dtos::{FavoriteIdsResponseDto, ProductDto, ProductListResponseDto},
    error::{ErrorMessage, HttpError},
    middleware::{JwtAuthContext, auth, role_check},
    models::UserRole,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::instrument;

/// Router for a client's favorites list. Client-only throughout.
pub fn favorite_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/ids", get(favorite_ids))
        .route("/", get(favorite_products))
        .route("/{product_id}", post(add_favorite).delete(remove_favorite))
        .layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Client])
        }))
        .layer(middleware::from_fn_with_state(app_state, auth))
}

/// Just the product ids, for marking hearts in the catalog UI.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn favorite_ids(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    let ids = app_state
        .db_client
        .favorite_ids(jwt.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing favorite ids: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(FavoriteIdsResponseDto {
        status: "success".to_string(),
        data: ids,
    }))
}

/// The caller's favorited products, most recently added first.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn favorite_products(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    let products = app_state
        .db_client
        .favorite_products(jwt.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing favorite products: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(ProductListResponseDto {
        status: "success".to_string(),
        data: ProductDto::from_models(&products),
    }))
}

/// Add a product to favorites. Re-adding is a no-op.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn add_favorite(
    Path(product_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    let exists = app_state
        .db_client
        .product_exists(product_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking product: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;
    if !exists {
        return Err(HttpError::not_found("Product not found".to_string()));
    }

    app_state
        .db_client
        .add_favorite(jwt.user.id, product_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, adding favorite: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(product_id, "add_favorite successful");
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a product from favorites. Removing an absent entry is a no-op.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn remove_favorite(
    Path(product_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .remove_favorite(jwt.user.id, product_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, removing favorite: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(product_id, "remove_favorite successful");
    Ok(StatusCode::NO_CONTENT)
}
