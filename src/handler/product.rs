use crate::{
    AppState,
    db::{ProductExt, ProductFilter},
    dtos::{
        InputProductDto, PendingCountResponseDto, ProductDto, ProductListResponseDto,
        ProductQueryDto, SingleProductResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JwtAuthContext, auth, maybe_identity, role_check},
    models::UserRole,
    policy,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use tracing::instrument;
use validator::Validate;

/// Router for the product catalog, artisan product management, and admin
/// moderation.
pub fn product_handler(app_state: AppState) -> Router<AppState> {
    let artisan = |req, next| role_check(req, next, vec![UserRole::Artisan]);
    let admin = |req, next| role_check(req, next, vec![UserRole::Admin]);

    Router::new()
        // Public catalog. Detail resolves an optional identity itself so
        // owners and admins can see unapproved products.
        .route("/", get(list_products))
        .route("/{product_id}", get(get_product))
        // Artisan management
        .route(
            "/mine",
            get(my_products)
                .route_layer(middleware::from_fn(artisan))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/",
            post(create_product)
                .route_layer(middleware::from_fn(artisan))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{product_id}",
            put(update_product)
                .delete(delete_product)
                .route_layer(middleware::from_fn(artisan))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        // Admin moderation
        .route(
            "/admin/pending",
            get(pending_products)
                .route_layer(middleware::from_fn(admin))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/pending/count",
            get(pending_count)
                .route_layer(middleware::from_fn(admin))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/admin/{product_id}/approve",
            put(approve_product)
                .route_layer(middleware::from_fn(admin))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/admin/{product_id}",
            delete(admin_delete_product)
                .route_layer(middleware::from_fn(admin))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Public catalog: approved products only, with substring/price/artisan
/// filters, sort, and skip/take pagination (take clamped to [1,100]).
#[instrument(skip(app_state))]
pub async fn list_products(
    Query(query_params): Query<ProductQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid list_products input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let filter = ProductFilter {
        q: query_params.q,
        min_price: query_params.min_price,
        max_price: query_params.max_price,
        artisan_id: query_params.artisan_id,
        sort: query_params.sort.unwrap_or_else(|| "recent".to_string()),
        skip: query_params.skip.unwrap_or(0).max(0),
        take: query_params.take.unwrap_or(50).clamp(1, 100),
    };

    let products = app_state
        .db_client
        .list_approved_products(&filter)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing products: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!("list_products successful");
    Ok(Json(ProductListResponseDto {
        status: "success".to_string(),
        data: ProductDto::from_models(&products),
    }))
}

/// Public product detail. An unapproved product reads as 404 unless the
/// caller is the owning artisan or an admin.
#[instrument(skip(app_state, headers))]
pub async fn get_product(
    Path(product_id): Path<i32>,
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let product = app_state
        .db_client
        .get_product(product_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting product: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Product not found".to_string()))?;

    let actor = maybe_identity(&headers, &app_state).await;
    if !policy::can_view_product(&product, actor) {
        return Err(HttpError::not_found("Product not found".to_string()));
    }

    tracing::info!("get_product successful");
    Ok(Json(SingleProductResponseDto {
        status: "success".to_string(),
        data: ProductDto::from_model(&product),
    }))
}

/// The calling artisan's own products, approved or not.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn my_products(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    let products = app_state
        .db_client
        .get_products_by_artisan(jwt.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting artisan products: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!("my_products successful");
    Ok(Json(ProductListResponseDto {
        status: "success".to_string(),
        data: ProductDto::from_models(&products),
    }))
}

/// Create a product owned by the caller. It starts unapproved and stays
/// out of the public catalog until an admin approves it.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn create_product(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
    Json(body): Json<InputProductDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_product input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let product = app_state
        .db_client
        .create_product(
            jwt.user.id,
            &body.title,
            body.description.as_deref(),
            body.price,
            body.image_url.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, creating product: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(product_id = product.id, "create_product successful");
    Ok((
        StatusCode::CREATED,
        Json(SingleProductResponseDto {
            status: "success".to_string(),
            data: ProductDto::from_model(&product),
        }),
    ))
}

/// Update one of the caller's products.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn update_product(
    Path(product_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
    Json(body): Json<InputProductDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_product input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let product = app_state
        .db_client
        .get_product(product_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting product: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Product not found".to_string()))?;

    if product.artisan_id != jwt.user.id {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let updated = app_state
        .db_client
        .update_product(
            product_id,
            &body.title,
            body.description.as_deref(),
            body.price,
            body.image_url.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating product: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(product_id, "update_product successful");
    Ok(Json(SingleProductResponseDto {
        status: "success".to_string(),
        data: ProductDto::from_model(&updated),
    }))
}

/// Delete one of the caller's products. Dependent orders cascade.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn delete_product(
    Path(product_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    let product = app_state
        .db_client
        .get_product(product_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting product: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Product not found".to_string()))?;

    if product.artisan_id != jwt.user.id {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    app_state
        .db_client
        .delete_product(product_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting product: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(product_id, "delete_product successful");
    Ok(StatusCode::NO_CONTENT)
}

/// Products awaiting moderation, newest first.
#[instrument(skip(app_state))]
pub async fn pending_products(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let products = app_state.db_client.pending_products().await.map_err(|e| {
        tracing::error!("DB error, getting pending products: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    tracing::info!("pending_products successful");
    Ok(Json(ProductListResponseDto {
        status: "success".to_string(),
        data: ProductDto::from_models(&products),
    }))
}

/// Moderation queue size, for the admin badge counter.
#[instrument(skip(app_state))]
pub async fn pending_count(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let count = app_state
        .db_client
        .pending_product_count()
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting pending products: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(PendingCountResponseDto {
        status: "success".to_string(),
        count,
    }))
}

/// Approve a product, making it publicly visible. One-way: there is no
/// unapprove operation.
#[instrument(skip(app_state))]
pub async fn approve_product(
    Path(product_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let product = app_state
        .db_client
        .approve_product(product_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Product not found".to_string()),
            e => {
                tracing::error!("DB error, approving product: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(product_id, "approve_product successful");
    Ok(Json(SingleProductResponseDto {
        status: "success".to_string(),
        data: ProductDto::from_model(&product),
    }))
}

/// Admin removal of any product, regardless of owner.
#[instrument(skip(app_state))]
pub async fn admin_delete_product(
    Path(product_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_product(product_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Product not found".to_string()),
            e => {
                tracing::error!("DB error, deleting product: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(product_id, "admin_delete_product successful");
    Ok(StatusCode::NO_CONTENT)
}
