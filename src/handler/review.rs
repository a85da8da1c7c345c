use crate::{
    AppState,
    db::{OrderExt, ProductExt, ReviewExt},
    dtos::{
        ArtisanResponseDto, ArtisanReviewListResponseDto, CreateReviewDto, ReviewDto,
        ReviewListResponseDto, SingleReviewResponseDto,
    },
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
    routing::{get, post, put},
};
use tracing::instrument;
use validator::Validate;

/// Router for product reviews and artisan responses.
pub fn review_handler(app_state: AppState) -> Router<AppState> {
    let client = |req, next| role_check(req, next, vec![UserRole::Client]);
    let artisan = |req, next| role_check(req, next, vec![UserRole::Artisan]);

    Router::new()
        .route("/product/{product_id}", get(product_reviews))
        .route(
            "/",
            post(create_review)
                .route_layer(middleware::from_fn(client))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/artisan",
            get(artisan_reviews)
                .route_layer(middleware::from_fn(artisan))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{review_id}/response",
            post(add_response)
                .delete(clear_response)
                .route_layer(middleware::from_fn(artisan))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{review_id}/response/upsert",
            put(upsert_response)
                .route_layer(middleware::from_fn(artisan))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Public list of reviews for a product, newest first.
#[instrument(skip(app_state))]
pub async fn product_reviews(
    Path(product_id): Path<i32>,
    State(app_state): State<AppState>,
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

    let reviews = app_state
        .db_client
        .reviews_for_product(product_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing reviews: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(ReviewListResponseDto {
        status: "success".to_string(),
        data: ReviewDto::from_models(&reviews),
    }))
}

/// Leave a review. The caller must have a delivered order for the
/// product and at most one review per product is allowed.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn create_review(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
    Json(body): Json<CreateReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_review input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let exists = app_state
        .db_client
        .product_exists(body.product_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking product: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;
    if !exists {
        return Err(HttpError::not_found("Product not found".to_string()));
    }

    let has_delivered = app_state
        .db_client
        .has_delivered_order(jwt.user.id, body.product_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking delivered orders: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let already_reviewed = app_state
        .db_client
        .review_exists(jwt.user.id, body.product_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking existing review: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    policy::review_eligibility(body.rating, has_delivered, already_reviewed)?;

    let review = app_state
        .db_client
        .create_review(
            body.product_id,
            jwt.user.id,
            body.rating,
            body.comment.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, creating review: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(review_id = review.id, "create_review successful");
    Ok((
        StatusCode::CREATED,
        Json(SingleReviewResponseDto {
            status: "success".to_string(),
            data: ReviewDto::from_model(&review),
        }),
    ))
}

/// All reviews across the calling artisan's products, with product
/// titles and reviewer names for the dashboard.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn artisan_reviews(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    let reviews = app_state
        .db_client
        .reviews_for_artisan(jwt.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing artisan reviews: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(ArtisanReviewListResponseDto {
        status: "success".to_string(),
        data: reviews,
    }))
}

/// Load the review and verify the caller owns the reviewed product.
async fn load_owned_review(
    app_state: &AppState,
    review_id: i32,
    artisan_id: i32,
) -> Result<crate::models::Review, HttpError> {
    let review = app_state
        .db_client
        .get_review(review_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting review: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Review not found".to_string()))?;

    let product = app_state
        .db_client
        .get_product(review.product_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting product: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Product not found".to_string()))?;

    if product.artisan_id != artisan_id {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }
    Ok(review)
}

/// Add a first response to a review of one of the caller's products.
/// Answering an already-answered review conflicts; use the upsert route
/// to replace.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn add_response(
    Path(review_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
    Json(body): Json<ArtisanResponseDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid add_response input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let review = load_owned_review(&app_state, review_id, jwt.user.id).await?;
    if review.artisan_response.is_some() {
        return Err(HttpError::conflict(
            "This review already has a response".to_string(),
        ));
    }

    let review = app_state
        .db_client
        .set_artisan_response(review_id, &body.response)
        .await
        .map_err(|e| {
            tracing::error!("DB error, setting artisan response: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(review_id, "add_response successful");
    Ok((
        StatusCode::CREATED,
        Json(SingleReviewResponseDto {
            status: "success".to_string(),
            data: ReviewDto::from_model(&review),
        }),
    ))
}

/// Create or replace the artisan's response in one call.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn upsert_response(
    Path(review_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
    Json(body): Json<ArtisanResponseDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid upsert_response input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    load_owned_review(&app_state, review_id, jwt.user.id).await?;

    let review = app_state
        .db_client
        .set_artisan_response(review_id, &body.response)
        .await
        .map_err(|e| {
            tracing::error!("DB error, setting artisan response: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(review_id, "upsert_response successful");
    Ok(Json(SingleReviewResponseDto {
        status: "success".to_string(),
        data: ReviewDto::from_model(&review),
    }))
}

/// Remove the artisan's response from a review.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn clear_response(
    Path(review_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JwtAuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    let review = load_owned_review(&app_state, review_id, jwt.user.id).await?;
    if review.artisan_response.is_none() {
        return Err(HttpError::bad_request(
            "This review has no response to remove".to_string(),
        ));
    }

    let review = app_state
        .db_client
        .clear_artisan_response(review_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, clearing artisan response: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(review_id, "clear_response successful");
    Ok(Json(SingleReviewResponseDto {
        status: "success".to_string(),
        data: ReviewDto::from_model(&review),
    }))
}
