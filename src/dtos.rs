use crate::models::{OrderStatus, Product, Review, User, UserRole};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

// DTOs define the wire shapes exchanged with the Angular client. They are
// separate from database models so the API controls exactly what leaves
// the server (camelCase names, no password hashes).

// ============================================================================
// Authentication DTOs
// ============================================================================

/// Registration / admin user-creation request.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(custom(function = "validate_role"))]
    pub role: String,
}

fn validate_role(role: &str) -> Result<(), validator::ValidationError> {
    match UserRole::parse(role) {
        Some(_) => Ok(()),
        None => Err(validator::ValidationError::new("invalid_role")),
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponseDto {
    pub status: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponseDto {
    pub status: String,
    pub username: String,
    pub role: String,
}

// ============================================================================
// User administration DTOs
// ============================================================================

/// User data exposed to admins; the password hash never leaves the server.
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: i32,
    pub username: String,
    pub role: String,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id,
            username: user.username.to_owned(),
            role: user.role.to_str().to_string(),
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub users: Vec<FilterUserDto>,
    pub results: i64,
}

/// Generic success response.
#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

// ============================================================================
// Product DTOs
// ============================================================================

/// Catalog query: substring filter, price bounds, artisan filter, sort and
/// skip/take pagination. `take` is clamped to [1,100] in the handler.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductQueryDto {
    #[validate(length(min = 1))]
    pub q: Option<String>,

    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub artisan_id: Option<i32>,

    #[validate(custom(function = "validate_sort"))]
    pub sort: Option<String>,

    #[validate(range(min = 0))]
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

fn validate_sort(sort: &str) -> Result<(), validator::ValidationError> {
    match sort {
        "recent" | "priceAsc" | "priceDesc" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_sort")),
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InputProductDto {
    #[validate(length(min = 1, message = "Title is required."))]
    pub title: String,

    pub description: Option<String>,

    pub price: Decimal,

    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub artisan_id: i32,
    pub is_approved: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl ProductDto {
    pub fn from_model(product: &Product) -> Self {
        ProductDto {
            id: product.id,
            title: product.title.to_owned(),
            description: product.description.to_owned(),
            price: product.price,
            image_url: product.image_url.to_owned(),
            artisan_id: product.artisan_id,
            is_approved: product.is_approved,
            created_at: product.created_at,
        }
    }

    pub fn from_models(products: &[Product]) -> Vec<ProductDto> {
        products.iter().map(ProductDto::from_model).collect()
    }
}

#[derive(Debug, Serialize)]
pub struct ProductListResponseDto {
    pub status: String,
    pub data: Vec<ProductDto>,
}

#[derive(Debug, Serialize)]
pub struct SingleProductResponseDto {
    pub status: String,
    pub data: ProductDto,
}

#[derive(Debug, Serialize)]
pub struct PendingCountResponseDto {
    pub status: String,
    pub count: i64,
}

// ============================================================================
// Order DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderDto {
    #[validate(range(min = 1, message = "productId is required"))]
    pub product_id: i32,
}

/// Requested status as a raw string; membership in the role vocabulary is
/// a policy concern, not a deserialization concern.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusDto {
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

/// Order row joined with the product and party names the client renders.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailsDto {
    pub id: i32,
    pub product_id: i32,
    pub client_id: i32,
    pub artisan_id: i32,
    pub delivery_partner_id: Option<i32>,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub product_title: String,
    pub product_price: Decimal,
    pub product_image_url: Option<String>,
    pub client_username: String,
    pub artisan_username: String,
}

#[derive(Debug, Serialize)]
pub struct OrderListResponseDto {
    pub status: String,
    pub data: Vec<OrderDetailsDto>,
}

#[derive(Debug, Serialize)]
pub struct SingleOrderResponseDto {
    pub status: String,
    pub data: OrderDetailsDto,
}

#[derive(Debug, Deserialize)]
pub struct EarningsQueryDto {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Artisan earnings over Delivered orders in the requested window.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsResponseDto {
    pub status: String,
    pub total: Decimal,
    pub orders_count: i64,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// ============================================================================
// Review DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewDto {
    #[validate(range(min = 1, message = "productId is required"))]
    pub product_id: i32,

    pub rating: i32,

    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDto {
    pub id: i32,
    pub product_id: i32,
    pub client_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub artisan_response: Option<String>,
    pub artisan_response_date: Option<DateTime<Utc>>,
}

impl ReviewDto {
    pub fn from_model(review: &Review) -> Self {
        ReviewDto {
            id: review.id,
            product_id: review.product_id,
            client_id: review.client_id,
            rating: review.rating,
            comment: review.comment.to_owned(),
            created_at: review.created_at,
            artisan_response: review.artisan_response.to_owned(),
            artisan_response_date: review.artisan_response_date,
        }
    }

    pub fn from_models(reviews: &[Review]) -> Vec<ReviewDto> {
        reviews.iter().map(ReviewDto::from_model).collect()
    }
}

/// Review of one of the artisan's products, joined with the product title
/// and the reviewing client's username.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ArtisanReviewDto {
    pub id: i32,
    pub product_id: i32,
    pub client_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub artisan_response: Option<String>,
    pub artisan_response_date: Option<DateTime<Utc>>,
    pub product_title: String,
    pub client_username: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewListResponseDto {
    pub status: String,
    pub data: Vec<ReviewDto>,
}

#[derive(Debug, Serialize)]
pub struct SingleReviewResponseDto {
    pub status: String,
    pub data: ReviewDto,
}

#[derive(Debug, Serialize)]
pub struct ArtisanReviewListResponseDto {
    pub status: String,
    pub data: Vec<ArtisanReviewDto>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ArtisanResponseDto {
    #[validate(length(min = 1, message = "Response is required"))]
    pub response: String,
}

// ============================================================================
// Favorite & upload DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FavoriteIdsResponseDto {
    pub status: String,
    pub data: Vec<i32>,
}

#[derive(Serialize)]
pub struct UploadResponseDto {
    pub status: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_dto_rejects_unknown_role() {
        let dto = RegisterUserDto {
            username: "marie".to_string(),
            password: "secret1".to_string(),
            role: "Superuser".to_string(),
        };
        assert!(dto.validate().is_err());

        let dto = RegisterUserDto {
            role: "DeliveryPartner".to_string(),
            ..dto
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn product_query_rejects_unknown_sort() {
        let query: ProductQueryDto =
            serde_json::from_str(r#"{"sort": "cheapestFirst"}"#).unwrap();
        assert!(query.validate().is_err());

        let query: ProductQueryDto = serde_json::from_str(r#"{"sort": "priceAsc"}"#).unwrap();
        assert!(query.validate().is_ok());
    }
}
