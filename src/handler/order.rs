use crate::{
    AppState,
    db::{OrderExt, ProductExt},
    dtos::{
        CreateOrderDto, EarningsQueryDto, EarningsResponseDto, OrderListResponseDto,
        SingleOrderResponseDto, UpdateStatusDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JwtAuthContext, auth, role_check},
    models::{OrderStatus, UserRole},
    policy,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tracing::instrument;
use validator::Validate;

/// Router for the order lifecycle. Every route requires a signed-in user;
/// per-route role checks narrow it down further.
pub fn order_handler(app_state: AppState) -> Router<AppState> {
    let client = |req, next| role_check(req, next, vec![UserRole::Client]);
    let artisan = |req, next| role_check(req, next, vec![UserRole::Artisan]);
    let admin = |req, next| role_check(req, next, vec![UserRole::Admin]);
    let delivery = |req, next| role_check(req, next, vec![UserRole::DeliveryPartner]);

    Router::new()
        .route("/", post(create_order).route_layer(middleware::from_fn(client)))
        .route("/", get(all_orders).route_layer(middleware::from_fn(admin)))
        .route("/mine", get(my_orders).route_layer(middleware::from_fn(client)))
        .route(
            "/artisan",
            get(artisan_orders).route_layer(middleware::from_fn(artisan)),
        )
        .route(
            "/artisan/earnings",
            get(artisan_earnings).route_layer(middleware::from_fn(artisan)),
        )
        .route(
            "/delivery",
            get(my_deliveries).route_layer(middleware::from_fn(delivery)),
        )
        .route(
            "/delivery/available",
            get(available_deliveries).route_layer(middleware::from_fn(delivery)),
        )
        .route(
            "/{order_id}/assign-self",
            put(claim_delivery).route_layer(middleware::from_fn(delivery)),
        )
        .route(
            "/{order_id}/status",
            put(update_status).route_layer(middleware::from_fn(artisan)),
        )
        .route(
            "/delivery/{order_id}/status",
            put(update_status).route_layer(middleware::from_fn(delivery)),
        )
        .route("/{order_id}", get(get_order))
        .layer(middleware::from_fn_with_state(app_state, auth))
}

/// Place an order for an approved product. The owning artisan is
/// snapshotted onto the order so later ownership transfers of the
/// product do not reroute it.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn create_order(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
    Json(body): Json<CreateOrderDto>,
) -> Result<impl IntoResponse, HttpError> {
    let product = app_state
        .db_client
        .get_product(body.product_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting product: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Product not found".to_string()))?;

    // Unapproved products are invisible to clients, so ordering one
    // reads the same as ordering a missing product.
    if !product.is_approved {
        return Err(HttpError::not_found("Product not found".to_string()));
    }

    let order = app_state
        .db_client
        .create_order(product.id, jwt.user.id, product.artisan_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, creating order: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let details = app_state
        .db_client
        .get_order_details(order.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting order details: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::server_error(ErrorMessage::ServerError.to_string()))?;

    tracing::info!(order_id = order.id, "create_order successful");
    Ok((
        StatusCode::CREATED,
        Json(SingleOrderResponseDto {
            status: "success".to_string(),
            data: details,
        }),
    ))
}

/// Every order in the system, for the admin dashboard.
#[instrument(skip(app_state))]
pub async fn all_orders(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let orders = app_state.db_client.all_orders().await.map_err(|e| {
        tracing::error!("DB error, listing orders: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    Ok(Json(OrderListResponseDto {
        status: "success".to_string(),
        data: orders,
    }))
}

/// The calling client's order history.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn my_orders(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    let orders = app_state
        .db_client
        .orders_for_client(jwt.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing client orders: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(OrderListResponseDto {
        status: "success".to_string(),
        data: orders,
    }))
}

/// Orders routed to the calling artisan.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn artisan_orders(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    let orders = app_state
        .db_client
        .orders_for_artisan(jwt.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing artisan orders: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(OrderListResponseDto {
        status: "success".to_string(),
        data: orders,
    }))
}

/// Sum of product prices over the calling artisan's delivered orders,
/// optionally windowed with `from`/`to`.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn artisan_earnings(
    Query(query_params): Query<EarningsQueryDto>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    let (total, orders_count) = app_state
        .db_client
        .artisan_earnings(jwt.user.id, query_params.from, query_params.to)
        .await
        .map_err(|e| {
            tracing::error!("DB error, computing earnings: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(EarningsResponseDto {
        status: "success".to_string(),
        total,
        orders_count,
        from: query_params.from,
        to: query_params.to,
    }))
}

/// Shipped or picked-up orders not yet claimed by any delivery partner.
#[instrument(skip(app_state))]
pub async fn available_deliveries(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let orders = app_state
        .db_client
        .available_delivery_orders()
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing available deliveries: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(OrderListResponseDto {
        status: "success".to_string(),
        data: orders,
    }))
}

/// Orders the calling delivery partner has claimed.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn my_deliveries(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    let orders = app_state
        .db_client
        .orders_for_delivery_partner(jwt.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing deliveries: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(OrderListResponseDto {
        status: "success".to_string(),
        data: orders,
    }))
}

/// Claim an unassigned shipment. Idempotent for the partner who already
/// holds it; claiming does not advance the status.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn claim_delivery(
    Path(order_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .db_client
        .get_order(order_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting order: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Order not found".to_string()))?;

    policy::claim_delivery(&order, jwt.user.id)?;

    app_state
        .db_client
        .assign_delivery_partner(order_id, jwt.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, assigning delivery partner: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let details = app_state
        .db_client
        .get_order_details(order_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting order details: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::server_error(ErrorMessage::ServerError.to_string()))?;

    tracing::info!(order_id, "claim_delivery successful");
    Ok(Json(SingleOrderResponseDto {
        status: "success".to_string(),
        data: details,
    }))
}

/// Order detail, visible to its client, artisan, assigned delivery
/// partner, and admins.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn get_order(
    Path(order_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .db_client
        .get_order(order_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting order: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Order not found".to_string()))?;

    if !policy::can_view_order(&order, jwt.user.id, jwt.user.role) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let details = app_state
        .db_client
        .get_order_details(order_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting order details: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::server_error(ErrorMessage::ServerError.to_string()))?;

    Ok(Json(SingleOrderResponseDto {
        status: "success".to_string(),
        data: details,
    }))
}

/// Advance an order's status. Each role may only set statuses from its
/// own vocabulary, only on orders it is attached to, and never backward.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn update_status(
    Path(order_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
    Json(body): Json<UpdateStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_status input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let requested = OrderStatus::parse(&body.status)
        .ok_or_else(|| HttpError::bad_request(format!("Unknown order status: {}", body.status)))?;

    let order = app_state
        .db_client
        .get_order(order_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting order: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Order not found".to_string()))?;

    policy::order_transition(&order, requested, jwt.user.id, jwt.user.role)?;

    app_state
        .db_client
        .set_order_status(order_id, requested)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating order status: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let details = app_state
        .db_client
        .get_order_details(order_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting order details: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::server_error(ErrorMessage::ServerError.to_string()))?;

    tracing::info!(order_id, status = %requested.to_str(), "update_status successful");
    Ok(Json(SingleOrderResponseDto {
        status: "success".to_string(),
        data: details,
    }))
}
